use crate::domain::{HarnessError, ARTIFACT_SUBDIRS};
use crate::exec::{find_in_path, ExecError, ExecOutcome, ExecRequest, ToolExecutor};
use globset::{Glob, GlobMatcher};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

pub const FITS_COMPARATOR: &str = "fdiff";
pub const GENERIC_COMPARATOR: &str = "diff";

/// fdiff prints this on its final line when two FITS files agree.
pub const FITS_MATCH_NEEDLE: &str = " 0 differences were found";

const FITS_PATTERNS: [&str; 2] = ["*.fits", "*.fits.gz"];
const DETAIL_TAIL_LINES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonTool {
    Fits,
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOutcome {
    Match,
    Mismatch,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileComparison {
    pub subdir: String,
    pub file_name: String,
    pub tool: ComparisonTool,
    pub outcome: ComparisonOutcome,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareReport {
    pub generated_at_unix_seconds: u64,
    pub passed: bool,
    pub reference_root: String,
    pub target_root: String,
    pub file_count: usize,
    pub failed_count: usize,
    pub comparisons: Vec<FileComparison>,
}

impl CompareReport {
    /// Basenames of the mismatching files, in comparison order.
    pub fn failed_file_names(&self) -> Vec<&str> {
        self.comparisons
            .iter()
            .filter(|comparison| comparison.outcome == ComparisonOutcome::Mismatch)
            .map(|comparison| comparison.file_name.as_str())
            .collect()
    }
}

/// Walks a reference tree's `output/` and `work/` subdirectories and
/// compares each file against its same-named counterpart in the target
/// tree. FITS files go through a dedicated comparator when one is on
/// the search path; everything else (including FITS files when the
/// dedicated tool is absent) goes through a generic line diff. A
/// missing target file makes the diff tool emit output, so it surfaces
/// as an ordinary mismatch rather than a separate state.
pub struct Comparator {
    fits_tool: Option<OsString>,
    fits_matchers: Vec<GlobMatcher>,
}

impl Comparator {
    pub fn new() -> Result<Self, CompareError> {
        Self::with_fits_tool(find_in_path(FITS_COMPARATOR).map(PathBuf::into_os_string))
    }

    pub fn with_fits_tool(fits_tool: Option<OsString>) -> Result<Self, CompareError> {
        let mut fits_matchers = Vec::with_capacity(FITS_PATTERNS.len());
        for pattern in FITS_PATTERNS {
            let matcher = Glob::new(pattern)
                .map_err(|source| CompareError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })?
                .compile_matcher();
            fits_matchers.push(matcher);
        }
        Ok(Self {
            fits_tool,
            fits_matchers,
        })
    }

    pub fn compare(
        &self,
        reference_root: &Path,
        target_root: &Path,
        executor: &dyn ToolExecutor,
    ) -> Result<CompareReport, CompareError> {
        let mut comparisons = Vec::new();
        for subdir in ARTIFACT_SUBDIRS {
            let reference_dir = reference_root.join(subdir);
            for file_name in list_reference_files(&reference_dir)? {
                let reference_path = reference_dir.join(&file_name);
                let target_path = target_root.join(subdir).join(&file_name);
                let comparison = self.compare_file(
                    subdir,
                    &file_name,
                    &reference_path,
                    &target_path,
                    executor,
                )?;
                comparisons.push(comparison);
            }
        }

        let file_count = comparisons.len();
        let failed_count = comparisons
            .iter()
            .filter(|comparison| comparison.outcome == ComparisonOutcome::Mismatch)
            .count();
        Ok(CompareReport {
            generated_at_unix_seconds: current_unix_timestamp_seconds(),
            passed: failed_count == 0,
            reference_root: normalize_path(reference_root),
            target_root: normalize_path(target_root),
            file_count,
            failed_count,
            comparisons,
        })
    }

    fn compare_file(
        &self,
        subdir: &str,
        file_name: &str,
        reference_path: &Path,
        target_path: &Path,
        executor: &dyn ToolExecutor,
    ) -> Result<FileComparison, CompareError> {
        let (tool, program) = match &self.fits_tool {
            Some(fits_tool) if self.is_fits_name(file_name) => {
                (ComparisonTool::Fits, fits_tool.clone())
            }
            _ => (ComparisonTool::Generic, OsString::from(GENERIC_COMPARATOR)),
        };

        let request = ExecRequest::new(program).arg(reference_path).arg(target_path);
        debug!("comparing {subdir}/{file_name}: {}", request.display_line());
        let output = executor.run(&request)?;

        let (outcome, detail) = match tool {
            ComparisonTool::Fits => evaluate_fits(&output),
            ComparisonTool::Generic => evaluate_generic(&output),
        };
        if outcome == ComparisonOutcome::Mismatch {
            debug!(
                "mismatch in {subdir}/{file_name}: {}",
                detail.as_deref().unwrap_or("no comparison output")
            );
        }

        Ok(FileComparison {
            subdir: subdir.to_string(),
            file_name: file_name.to_string(),
            tool,
            outcome,
            detail,
        })
    }

    fn is_fits_name(&self, file_name: &str) -> bool {
        self.fits_matchers
            .iter()
            .any(|matcher| matcher.is_match(file_name))
    }
}

fn evaluate_fits(output: &ExecOutcome) -> (ComparisonOutcome, Option<String>) {
    let final_line = output.final_line().unwrap_or("");
    if final_line.contains(FITS_MATCH_NEEDLE) {
        (ComparisonOutcome::Match, None)
    } else {
        (ComparisonOutcome::Mismatch, Some(final_line.trim().to_string()))
    }
}

fn evaluate_generic(output: &ExecOutcome) -> (ComparisonOutcome, Option<String>) {
    if output.combined_output.is_empty() {
        (ComparisonOutcome::Match, None)
    } else {
        (
            ComparisonOutcome::Mismatch,
            Some(output_tail(&output.combined_output)),
        )
    }
}

fn output_tail(output: &str) -> String {
    let lines: Vec<&str> = output.lines().collect();
    let start = lines.len().saturating_sub(DETAIL_TAIL_LINES);
    lines[start..].join("\n")
}

/// Basenames of the plain files directly under `reference_dir`, in
/// lexicographic order. A directory that does not exist reads as empty.
fn list_reference_files(reference_dir: &Path) -> Result<Vec<String>, CompareError> {
    let entries = match fs::read_dir(reference_dir) {
        Ok(entries) => entries,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(CompareError::ReadReference {
                path: reference_dir.to_path_buf(),
                source,
            });
        }
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| CompareError::ReadReference {
            path: reference_dir.to_path_buf(),
            source,
        })?;
        if entry.path().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

pub fn write_report_file(report_path: &Path, report: &CompareReport) -> Result<(), CompareError> {
    if let Some(parent_dir) = report_path.parent() {
        fs::create_dir_all(parent_dir).map_err(|source| CompareError::ReportDirectory {
            path: parent_dir.to_path_buf(),
            source,
        })?;
    }

    let report_json =
        serde_json::to_string_pretty(report).map_err(|source| CompareError::SerializeReport {
            source,
        })?;
    fs::write(report_path, report_json).map_err(|source| CompareError::WriteReport {
        path: report_path.to_path_buf(),
        source,
    })
}

fn current_unix_timestamp_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    #[error("invalid comparison pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: globset::Error,
    },
    #[error("failed to read reference directory '{}': {source}", path.display())]
    ReadReference {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Invoke(#[from] ExecError),
    #[error("failed to create report directory '{}': {source}", path.display())]
    ReportDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize comparison report: {source}")]
    SerializeReport { source: serde_json::Error },
    #[error("failed to write comparison report '{}': {source}", path.display())]
    WriteReport {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<CompareError> for HarnessError {
    fn from(error: CompareError) -> Self {
        let message = error.to_string();
        match error {
            CompareError::InvalidPattern { .. } => {
                HarnessError::config("CONFIG.COMPARE_PATTERN", message)
            }
            CompareError::ReadReference { .. } => {
                HarnessError::io_system("IO.REFERENCE_READ", message)
            }
            CompareError::Invoke(source) => HarnessError::from(source),
            CompareError::ReportDirectory { .. }
            | CompareError::SerializeReport { .. }
            | CompareError::WriteReport { .. } => {
                HarnessError::io_system("IO.REPORT_WRITE", message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Comparator, ComparisonOutcome, ComparisonTool, write_report_file, FITS_MATCH_NEEDLE,
        GENERIC_COMPARATOR,
    };
    use crate::exec::{find_in_path, ExecError, ExecOutcome, ExecRequest, SystemExecutor,
        ToolExecutor};
    use serde_json::Value;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::ffi::OsString;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct ScriptedExecutor {
        requests: RefCell<Vec<ExecRequest>>,
        outcomes: RefCell<VecDeque<ExecOutcome>>,
    }

    impl ScriptedExecutor {
        fn new(outputs: Vec<&str>) -> Self {
            let outcomes = outputs
                .into_iter()
                .map(|output| ExecOutcome {
                    exit_code: Some(if output.is_empty() { 0 } else { 1 }),
                    combined_output: output.to_string(),
                })
                .collect();
            Self {
                requests: RefCell::new(Vec::new()),
                outcomes: RefCell::new(outcomes),
            }
        }
    }

    impl ToolExecutor for ScriptedExecutor {
        fn run(&self, request: &ExecRequest) -> Result<ExecOutcome, ExecError> {
            self.requests.borrow_mut().push(request.clone());
            Ok(self.outcomes.borrow_mut().pop_front().unwrap_or(ExecOutcome {
                exit_code: Some(0),
                combined_output: String::new(),
            }))
        }
    }

    fn write_file(dir: &Path, relative_path: &str, contents: &str) -> PathBuf {
        let path = dir.join(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dir");
        }
        fs::write(&path, contents).expect("write test file");
        path
    }

    fn fits_comparator() -> Comparator {
        Comparator::with_fits_tool(Some(OsString::from("fdiff"))).expect("comparator")
    }

    #[test]
    fn fits_files_match_when_the_final_line_reports_zero_differences() {
        let reference = TempDir::new().expect("reference dir");
        let target = TempDir::new().expect("target dir");
        write_file(reference.path(), "output/img.fits", "");

        let executor = ScriptedExecutor::new(vec![
            "comparing headers\ncomparing data\n 0 differences were found\n",
        ]);
        let report = fits_comparator()
            .compare(reference.path(), target.path(), &executor)
            .expect("compare");

        assert!(report.passed);
        assert_eq!(report.file_count, 1);
        assert_eq!(report.comparisons[0].tool, ComparisonTool::Fits);
        assert_eq!(report.comparisons[0].outcome, ComparisonOutcome::Match);

        let requests = executor.requests.borrow();
        assert_eq!(requests[0].program, OsString::from("fdiff"));
    }

    #[test]
    fn fits_output_without_the_zero_difference_line_is_a_mismatch() {
        let reference = TempDir::new().expect("reference dir");
        let target = TempDir::new().expect("target dir");
        write_file(reference.path(), "output/img.fits.gz", "");

        let executor = ScriptedExecutor::new(vec![
            "comparing data\n 3 differences were found\n",
        ]);
        let report = fits_comparator()
            .compare(reference.path(), target.path(), &executor)
            .expect("compare");

        assert!(!report.passed);
        assert_eq!(report.failed_count, 1);
        assert_eq!(report.failed_file_names(), vec!["img.fits.gz"]);
        assert_eq!(
            report.comparisons[0].detail.as_deref(),
            Some("3 differences were found")
        );
    }

    #[test]
    fn a_trailing_blank_line_does_not_hide_the_fits_verdict() {
        let outcome = ExecOutcome {
            exit_code: Some(0),
            combined_output: format!("header block\n{FITS_MATCH_NEEDLE}\n\n"),
        };
        let (verdict, _) = super::evaluate_fits(&outcome);
        assert_eq!(verdict, ComparisonOutcome::Match);
    }

    #[test]
    fn generic_diff_matches_only_on_empty_output() {
        let reference = TempDir::new().expect("reference dir");
        let target = TempDir::new().expect("target dir");
        write_file(reference.path(), "work/run.log", "lines");

        let executor = ScriptedExecutor::new(vec![""]);
        let report = fits_comparator()
            .compare(reference.path(), target.path(), &executor)
            .expect("compare");

        assert!(report.passed);
        assert_eq!(report.comparisons[0].tool, ComparisonTool::Generic);
    }

    #[test]
    fn a_missing_target_file_reads_as_a_plain_mismatch() {
        let reference = TempDir::new().expect("reference dir");
        let target = TempDir::new().expect("target dir");
        write_file(reference.path(), "output/log.txt", "OK");

        let executor = ScriptedExecutor::new(vec![
            "diff: target/output/log.txt: No such file or directory\n",
        ]);
        let report = fits_comparator()
            .compare(reference.path(), target.path(), &executor)
            .expect("compare");

        assert!(!report.passed);
        assert_eq!(report.failed_file_names(), vec!["log.txt"]);
        assert_eq!(report.comparisons[0].outcome, ComparisonOutcome::Mismatch);
    }

    #[test]
    fn fits_files_fall_back_to_the_generic_diff_without_a_fits_tool() {
        let reference = TempDir::new().expect("reference dir");
        let target = TempDir::new().expect("target dir");
        write_file(reference.path(), "output/img.fits", "");

        let executor = ScriptedExecutor::new(vec![""]);
        let comparator = Comparator::with_fits_tool(None).expect("comparator");
        let report = comparator
            .compare(reference.path(), target.path(), &executor)
            .expect("compare");

        assert_eq!(report.comparisons[0].tool, ComparisonTool::Generic);
        let requests = executor.requests.borrow();
        assert_eq!(requests[0].program, OsString::from(GENERIC_COMPARATOR));
    }

    #[test]
    fn reference_files_are_compared_in_subdir_then_name_order() {
        let reference = TempDir::new().expect("reference dir");
        let target = TempDir::new().expect("target dir");
        write_file(reference.path(), "output/b.txt", "");
        write_file(reference.path(), "output/a.txt", "");
        write_file(reference.path(), "work/c.txt", "");

        let executor = ScriptedExecutor::new(vec![]);
        let report = fits_comparator()
            .compare(reference.path(), target.path(), &executor)
            .expect("compare");

        let order: Vec<(String, String)> = report
            .comparisons
            .iter()
            .map(|comparison| (comparison.subdir.clone(), comparison.file_name.clone()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("output".to_string(), "a.txt".to_string()),
                ("output".to_string(), "b.txt".to_string()),
                ("work".to_string(), "c.txt".to_string()),
            ]
        );
    }

    #[test]
    fn an_empty_reference_tree_passes_with_no_comparisons() {
        let reference = TempDir::new().expect("reference dir");
        let target = TempDir::new().expect("target dir");

        let executor = ScriptedExecutor::new(vec![]);
        let report = fits_comparator()
            .compare(reference.path(), target.path(), &executor)
            .expect("compare");

        assert!(report.passed);
        assert_eq!(report.file_count, 0);
        assert!(executor.requests.borrow().is_empty());
    }

    #[test]
    fn comparing_a_tree_against_itself_yields_zero_mismatches() {
        if find_in_path(GENERIC_COMPARATOR).is_none() {
            eprintln!("skipping: no '{GENERIC_COMPARATOR}' on the search path");
            return;
        }

        let reference = TempDir::new().expect("reference dir");
        write_file(reference.path(), "output/catalog.txt", "object 0 10.0\n");
        write_file(reference.path(), "work/run.log", "done\n");

        let comparator = Comparator::with_fits_tool(None).expect("comparator");
        let report = comparator
            .compare(reference.path(), reference.path(), &SystemExecutor)
            .expect("compare");

        assert!(report.passed);
        assert_eq!(report.file_count, 2);
    }

    #[test]
    fn trailing_whitespace_is_significant_to_the_generic_diff() {
        if find_in_path(GENERIC_COMPARATOR).is_none() {
            eprintln!("skipping: no '{GENERIC_COMPARATOR}' on the search path");
            return;
        }

        let reference = TempDir::new().expect("reference dir");
        let target = TempDir::new().expect("target dir");
        write_file(reference.path(), "output/log.txt", "alpha\n");
        write_file(target.path(), "output/log.txt", "alpha \n");

        let comparator = Comparator::with_fits_tool(None).expect("comparator");
        let report = comparator
            .compare(reference.path(), target.path(), &SystemExecutor)
            .expect("compare");

        assert_eq!(report.failed_file_names(), vec!["log.txt"]);
    }

    #[test]
    fn report_files_serialize_with_stable_field_names() {
        let reference = TempDir::new().expect("reference dir");
        let target = TempDir::new().expect("target dir");
        let report_dir = TempDir::new().expect("report dir");
        write_file(reference.path(), "output/log.txt", "OK");

        let executor = ScriptedExecutor::new(vec!["1c1\n< OK\n---\n> KO\n"]);
        let report = fits_comparator()
            .compare(reference.path(), target.path(), &executor)
            .expect("compare");

        let report_path = report_dir.path().join("reports/compare.json");
        write_report_file(&report_path, &report).expect("write report");

        let raw = fs::read_to_string(&report_path).expect("read report");
        let value: Value = serde_json::from_str(&raw).expect("parse report");
        assert_eq!(value["passed"], Value::Bool(false));
        assert_eq!(value["file_count"], Value::from(1));
        assert_eq!(value["failed_count"], Value::from(1));
        assert_eq!(value["comparisons"][0]["file_name"], Value::from("log.txt"));
        assert_eq!(value["comparisons"][0]["tool"], Value::from("generic"));
        assert_eq!(value["comparisons"][0]["outcome"], Value::from("mismatch"));
    }
}
