use std::error::Error;
use std::fmt::{Display, Formatter};

pub type HarnessResult<T> = Result<T, HarnessError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HarnessErrorCategory {
    ConfigError,
    IoError,
    ExternalToolError,
}

impl HarnessErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::ConfigError => 2,
            Self::IoError => 3,
            Self::ExternalToolError => 4,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ConfigError => "ConfigError",
            Self::IoError => "IoError",
            Self::ExternalToolError => "ExternalToolError",
        }
    }
}

/// Categorized failure surfaced at the harness boundary. Comparison
/// mismatches are never represented here; they are report data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessError {
    category: HarnessErrorCategory,
    code: &'static str,
    message: String,
}

impl HarnessError {
    pub fn new(
        category: HarnessErrorCategory,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code,
            message: message.into(),
        }
    }

    pub fn config(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(HarnessErrorCategory::ConfigError, code, message)
    }

    pub fn io_system(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(HarnessErrorCategory::IoError, code, message)
    }

    pub fn external_tool(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(HarnessErrorCategory::ExternalToolError, code, message)
    }

    pub const fn category(&self) -> HarnessErrorCategory {
        self.category
    }

    pub const fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.code, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for HarnessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.label(),
            self.code,
            self.message
        )
    }
}

impl Error for HarnessError {}
