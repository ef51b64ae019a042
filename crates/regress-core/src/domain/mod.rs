pub mod errors;

pub use errors::{HarnessError, HarnessErrorCategory, HarnessResult};

use std::fmt::{Display, Formatter};

/// Subdirectories of a simulator install (and of a collected tree) that
/// hold run artifacts, in traversal order.
pub const ARTIFACT_SUBDIRS: [&str; 2] = ["output", "work"];

const CORNER_MARKER: &str = "_C";

/// Focal plane sensor identifier with the structural convention
/// `<RAFT>_<SENSOR>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SensorId(String);

impl SensorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raft prefix before the first underscore; the whole id when there
    /// is no underscore.
    pub fn raft(&self) -> &str {
        self.0.split('_').next().unwrap_or(&self.0)
    }

    /// Whether this sensor sits on a corner raft. Corner rafts carry
    /// guide/wavefront hardware and are excluded raft-wide from the
    /// science pool.
    pub fn is_corner(&self) -> bool {
        self.0.contains(CORNER_MARKER)
    }
}

impl Display for SensorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One generated point source. All records of a generation run share the
/// same magnitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarRecord {
    pub ra_deg: f64,
    pub dec_deg: f64,
    pub magnitude: f64,
}
