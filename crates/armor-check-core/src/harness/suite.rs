use super::manifest::OpaqueSuite;
use super::tool::status_text;
use super::workspace::display_path;
use serde::Serialize;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub suite_id: String,
    pub executable: String,
    pub passed: bool,
    pub reason: Option<String>,
}

/// Runs an opaque test executable; only its exit status is inspected.
pub fn run_suite(suite: &OpaqueSuite, executable: &Path) -> SuiteReport {
    let span = tracing::info_span!("suite", id = %suite.id);
    let _guard = span.enter();

    let reason = match Command::new(executable).output() {
        Ok(output) if output.status.success() => {
            tracing::debug!(
                stdout = %String::from_utf8_lossy(&output.stdout),
                "suite passed"
            );
            None
        }
        Ok(output) => {
            tracing::warn!(status = %status_text(output.status), "suite failed");
            Some(format!("suite exited with {}", status_text(output.status)))
        }
        Err(source) => Some(format!(
            "failed to execute suite '{}': {}",
            executable.display(),
            source
        )),
    };

    SuiteReport {
        suite_id: suite.id.clone(),
        executable: display_path(executable),
        passed: reason.is_none(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::run_suite;
    use crate::harness::manifest::OpaqueSuite;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn suite(executable: PathBuf) -> OpaqueSuite {
        OpaqueSuite {
            id: "common_unit".to_string(),
            executable,
        }
    }

    #[test]
    fn missing_executable_fails_with_reason() {
        let temp = TempDir::new().expect("tempdir should be created");
        let executable = temp.path().join("common_unit_tests");
        let report = run_suite(&suite(executable.clone()), &executable);
        assert!(!report.passed);
        assert!(
            report
                .reason
                .as_deref()
                .is_some_and(|reason| reason.starts_with("failed to execute suite"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_decides_the_verdict() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().expect("tempdir should be created");
        for (name, code, passed) in [("ok", 0, true), ("broken", 1, false)] {
            let executable = temp.path().join(name);
            fs::write(&executable, format!("#!/bin/sh\necho '[  PASSED  ]'\nexit {}\n", code))
                .expect("suite script should be written");
            fs::set_permissions(&executable, fs::Permissions::from_mode(0o755))
                .expect("suite script should be executable");

            let report = run_suite(&suite(executable.clone()), &executable);
            assert_eq!(report.passed, passed, "suite {}", name);
            if !passed {
                assert_eq!(report.reason.as_deref(), Some("suite exited with exit code 1"));
            }
        }
    }
}
