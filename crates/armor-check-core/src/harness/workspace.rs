use std::path::{Path, PathBuf};

/// Walks from `start` towards the filesystem root and returns the first
/// directory containing `marker`. The process working directory is never
/// changed.
pub fn find_upward(start: &Path, marker: impl AsRef<Path>) -> Option<PathBuf> {
    let marker = marker.as_ref();
    start
        .ancestors()
        .find(|candidate| candidate.join(marker).exists())
        .map(Path::to_path_buf)
}

/// Like [`find_upward`], but returns the path of the marker itself.
pub fn find_marker_upward(start: &Path, marker: impl AsRef<Path>) -> Option<PathBuf> {
    let marker = marker.as_ref();
    find_upward(start, marker).map(|root| root.join(marker))
}

pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

pub(crate) fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
