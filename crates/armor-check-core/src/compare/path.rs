use super::policy::PolicyError;

pub const DEFAULT_PATH_TAIL_SEGMENTS: usize = 7;

/// Keeps the last `tail_segments` `/`-delimited segments of `path`.
///
/// Paths with fewer segments come back unchanged. Trailing separators are
/// dropped before the tail is taken, so `a/b/c/` and `a/b/c` share a tail. A
/// leading `/` counts as an empty first segment, which keeps a short absolute
/// path identical to its input.
pub fn normalize_path(path: &str, tail_segments: usize) -> Result<String, PolicyError> {
    if tail_segments == 0 {
        return Err(PolicyError::InvalidTailSegments {
            value: tail_segments as i64,
        });
    }
    Ok(path_tail(path, tail_segments).to_string())
}

pub(crate) fn path_tail(path: &str, tail_segments: usize) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return path;
    }

    let segment_count = trimmed.split('/').count();
    if segment_count < tail_segments {
        return path;
    }

    let mut remaining = tail_segments;
    for (index, byte) in trimmed.bytes().enumerate().rev() {
        if byte == b'/' {
            remaining -= 1;
            if remaining == 0 {
                return &trimmed[index + 1..];
            }
        }
    }
    trimmed
}
