use crate::domain::HarnessError;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

/// One external tool invocation: program, arguments, and an explicit
/// working directory instead of any process-wide chdir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
}

impl ExecRequest {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Lossy single-line rendering for logs.
    pub fn display_line(&self) -> String {
        let mut line = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    /// None when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured stdout followed by captured stderr.
    pub combined_output: String,
}

impl ExecOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Last line of the combined output that carries any non-whitespace
    /// content.
    pub fn final_line(&self) -> Option<&str> {
        self.combined_output
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
    }
}

/// Capability seam for running opaque external processes, so the driver
/// and comparator can be exercised with scripted executors.
pub trait ToolExecutor {
    fn run(&self, request: &ExecRequest) -> Result<ExecOutcome, ExecError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl ToolExecutor for SystemExecutor {
    fn run(&self, request: &ExecRequest) -> Result<ExecOutcome, ExecError> {
        let mut command = Command::new(&request.program);
        command.args(&request.args);
        if let Some(working_dir) = &request.working_dir {
            command.current_dir(working_dir);
        }

        let output = command.output().map_err(|source| ExecError::Launch {
            program: request.program.clone(),
            source,
        })?;

        let mut combined_output = String::from_utf8_lossy(&output.stdout).into_owned();
        combined_output.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(ExecOutcome {
            exit_code: output.status.code(),
            combined_output,
        })
    }
}

/// Resolves an executable name against the `PATH` environment variable.
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    let search_paths = std::env::var_os("PATH")?;
    std::env::split_paths(&search_paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to launch '{}': {source}", program.to_string_lossy())]
    Launch {
        program: OsString,
        source: std::io::Error,
    },
}

impl From<ExecError> for HarnessError {
    fn from(error: ExecError) -> Self {
        HarnessError::external_tool("TOOL.LAUNCH", error.to_string())
    }
}
