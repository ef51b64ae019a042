use crate::catalog::{CatalogError, CatalogSpec};
use crate::domain::{HarnessError, StarRecord};
use rand::Rng;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const RA_CENTER_KEY: &str = "Unrefracted_RA_deg";
pub const DEC_CENTER_KEY: &str = "Unrefracted_Dec_deg";

/// Calibration point of the inverse Pogson mapping: this many incident
/// photons correspond to magnitude 20.
pub const REFERENCE_PHOTON_COUNT: f64 = 507_967.0;
pub const REFERENCE_MAGNITUDE: f64 = 20.0;

const REGION_FILE_HEADER: &str = "# Region file format: DS9 version 4.1\n\
global color=green dashlist=8 3 width=1 font=\"helvetica 10 normal roman\" \
select=1 highlite=1 dash=0 fixed=0 edit=1 move=1 delete=1 include=1 source=1\n";

/// Approximate apparent magnitude as a function of incident photon count.
pub fn magnitude(photon_count: f64) -> f64 {
    REFERENCE_MAGNITUDE - 2.5 * (photon_count / REFERENCE_PHOTON_COUNT).log10()
}

/// Square sky window the generated stars fall in. No spherical-geometry
/// correction; fields of view are a few degrees at most.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldWindow {
    pub center_ra_deg: f64,
    pub center_dec_deg: f64,
    pub fov_deg: f64,
}

impl FieldWindow {
    pub fn from_catalog(catalog: &CatalogSpec, fov_deg: f64) -> Result<Self, CatalogError> {
        Ok(Self {
            center_ra_deg: catalog.float_value(RA_CENTER_KEY)?,
            center_dec_deg: catalog.float_value(DEC_CENTER_KEY)?,
            fov_deg,
        })
    }

    pub fn ra_range(&self) -> (f64, f64) {
        let half = self.fov_deg / 2.0;
        (self.center_ra_deg - half, self.center_ra_deg + half)
    }

    pub fn dec_range(&self) -> (f64, f64) {
        let half = self.fov_deg / 2.0;
        (self.center_dec_deg - half, self.center_dec_deg + half)
    }
}

/// Draws `star_count` stars uniformly over the window, all sharing the
/// magnitude derived from `photon_count`. All right ascensions are drawn
/// before all declinations, from the one supplied stream, and the result
/// is sorted by declination ascending to make visual catalog inspection
/// easier.
pub fn generate_stars(
    window: &FieldWindow,
    star_count: usize,
    photon_count: f64,
    rng: &mut impl Rng,
) -> Vec<StarRecord> {
    let (ra_min, ra_max) = window.ra_range();
    let (dec_min, dec_max) = window.dec_range();

    let ras: Vec<f64> = (0..star_count)
        .map(|_| rng.gen_range(ra_min..=ra_max))
        .collect();
    let decs: Vec<f64> = (0..star_count)
        .map(|_| rng.gen_range(dec_min..=dec_max))
        .collect();

    let shared_magnitude = magnitude(photon_count);
    let mut records: Vec<StarRecord> = ras
        .into_iter()
        .zip(decs)
        .map(|(ra_deg, dec_deg)| StarRecord {
            ra_deg,
            dec_deg,
            magnitude: shared_magnitude,
        })
        .collect();
    records.sort_by(|a, b| a.dec_deg.total_cmp(&b.dec_deg));
    records
}

/// Catalog entry for a star with a flat SED.
pub fn catalog_line(record: &StarRecord) -> String {
    format!(
        "object 0 {:.5} {:.5} {:.2} ../sky/sed_flat.txt 0 0 0 0 0 0 star none none",
        record.ra_deg, record.dec_deg, record.magnitude
    )
}

/// Copies the template verbatim to `out_path`, then appends one record
/// line per star.
pub fn write_catalog(
    template_path: &Path,
    out_path: &Path,
    records: &[StarRecord],
) -> Result<(), StarFieldError> {
    fs::copy(template_path, out_path).map_err(|source| StarFieldError::CopyTemplate {
        from: template_path.to_path_buf(),
        to: out_path.to_path_buf(),
        source,
    })?;

    let mut appended = String::new();
    for record in records {
        appended.push_str(&catalog_line(record));
        appended.push('\n');
    }

    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(out_path)
        .map_err(|source| StarFieldError::AppendRecords {
            path: out_path.to_path_buf(),
            source,
        })?;
    file.write_all(appended.as_bytes())
        .map_err(|source| StarFieldError::AppendRecords {
            path: out_path.to_path_buf(),
            source,
        })
}

/// DS9 region file marking every generated star, for eyeballing a run in
/// an image viewer.
pub fn region_file_contents(records: &[StarRecord]) -> String {
    let mut contents = String::from(REGION_FILE_HEADER);
    contents.push_str("fk5\n");
    for record in records {
        contents.push_str(&format!(
            "point({:.6},{:.6}) # point=circle\n",
            record.ra_deg, record.dec_deg
        ));
    }
    contents
}

pub fn write_region_file(out_path: &Path, records: &[StarRecord]) -> Result<(), StarFieldError> {
    fs::write(out_path, region_file_contents(records)).map_err(|source| {
        StarFieldError::WriteRegion {
            path: out_path.to_path_buf(),
            source,
        }
    })
}

#[derive(Debug, thiserror::Error)]
pub enum StarFieldError {
    #[error("failed to copy catalog template '{}' to '{}': {source}", from.display(), to.display())]
    CopyTemplate {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to append star records to '{}': {source}", path.display())]
    AppendRecords {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write region file '{}': {source}", path.display())]
    WriteRegion {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<StarFieldError> for HarnessError {
    fn from(error: StarFieldError) -> Self {
        let message = error.to_string();
        match error {
            StarFieldError::CopyTemplate { .. } | StarFieldError::AppendRecords { .. } => {
                HarnessError::io_system("IO.CATALOG_WRITE", message)
            }
            StarFieldError::WriteRegion { .. } => {
                HarnessError::io_system("IO.REGION_WRITE", message)
            }
        }
    }
}
