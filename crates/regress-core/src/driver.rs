use crate::domain::SensorId;
use crate::exec::{ExecError, ExecRequest, ToolExecutor};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const SIMULATOR_PROGRAM: &str = "./phosim";
pub const BACKGROUND_CONFIG: &str = "examples/nobackground";
pub const DEFAULT_TELESCOPE: &str = "lsst";

/// Filesystem layout of a simulator installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatorInstall {
    root: PathBuf,
}

impl SimulatorInstall {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout_path(&self, telescope: &str) -> PathBuf {
        self.root
            .join("data")
            .join(telescope)
            .join("focalplanelayout.txt")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root.join("work")
    }
}

/// Runs the simulator once per sampled sensor, strictly sequentially.
/// `catalog_path` should be absolute so it resolves from the install
/// root, which is passed to the executor as the working directory. A
/// non-zero exit is logged and skipped over; the comparator notices any
/// missing or divergent outputs downstream. A launch failure aborts: the
/// executable would be equally absent for every remaining sensor.
pub fn run_all(
    catalog_path: &Path,
    sensor_ids: &[SensorId],
    install: &SimulatorInstall,
    executor: &dyn ToolExecutor,
) -> Result<(), ExecError> {
    for sensor in sensor_ids {
        let request = ExecRequest::new(SIMULATOR_PROGRAM)
            .arg(catalog_path)
            .arg("-s")
            .arg(sensor.as_str())
            .arg("-c")
            .arg(BACKGROUND_CONFIG)
            .current_dir(install.root());
        debug!("invoking simulator: {}", request.display_line());

        let outcome = executor.run(&request)?;
        if !outcome.success() {
            warn!(
                "simulator run for sensor {} finished with exit code {:?}",
                sensor, outcome.exit_code
            );
        }
    }
    Ok(())
}
