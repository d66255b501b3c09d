use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type HarnessResult<T> = Result<T, HarnessError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HarnessErrorCategory {
    Success,
    InvalidConfiguration,
    SchemaMismatch,
    ContentMismatch,
    ExternalToolFailure,
    IoSystemError,
    InternalError,
}

impl HarnessErrorCategory {
    pub const fn exit_status(self) -> ExitStatusMapping {
        match self {
            Self::Success => ExitStatusMapping {
                exit_code: 0,
                rust_category: "Success",
                verdict: "PASS",
            },
            Self::SchemaMismatch => ExitStatusMapping {
                exit_code: 1,
                rust_category: "SchemaMismatch",
                verdict: "FAIL",
            },
            Self::ContentMismatch => ExitStatusMapping {
                exit_code: 1,
                rust_category: "ContentMismatch",
                verdict: "FAIL",
            },
            Self::InvalidConfiguration => ExitStatusMapping {
                exit_code: 2,
                rust_category: "InvalidConfiguration",
                verdict: "CONFIG_FATAL",
            },
            Self::IoSystemError => ExitStatusMapping {
                exit_code: 3,
                rust_category: "IoSystemError",
                verdict: "IO_FATAL",
            },
            Self::ExternalToolFailure => ExitStatusMapping {
                exit_code: 4,
                rust_category: "ExternalToolFailure",
                verdict: "TOOL_FATAL",
            },
            Self::InternalError => ExitStatusMapping {
                exit_code: 5,
                rust_category: "InternalError",
                verdict: "SYS_FATAL",
            },
        }
    }

    pub const fn exit_code(self) -> i32 {
        self.exit_status().exit_code
    }

    pub const fn rust_category(self) -> &'static str {
        self.exit_status().rust_category
    }

    /// Mismatches fail the test; everything else except `Success` aborts it.
    pub const fn is_fatal(self) -> bool {
        !matches!(
            self,
            Self::Success | Self::SchemaMismatch | Self::ContentMismatch
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatusMapping {
    pub exit_code: i32,
    pub rust_category: &'static str,
    pub verdict: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessError {
    category: HarnessErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl HarnessError {
    pub fn new(
        category: HarnessErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn invalid_configuration(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(
            HarnessErrorCategory::InvalidConfiguration,
            placeholder,
            message,
        )
    }

    pub fn schema_mismatch(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(HarnessErrorCategory::SchemaMismatch, placeholder, message)
    }

    pub fn external_tool(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(
            HarnessErrorCategory::ExternalToolFailure,
            placeholder,
            message,
        )
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(HarnessErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(HarnessErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> HarnessErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category.is_fatal() {
            "ERROR"
        } else {
            "FAIL"
        };
        format!("{}: [{}] {}", severity, self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl Display for HarnessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.rust_category(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for HarnessError {}
