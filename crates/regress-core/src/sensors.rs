use crate::domain::{HarnessError, SensorId};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// How the sensor subset is drawn from the science pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleMode {
    /// Independent uniform index draws; the same sensor can be picked
    /// more than once and duplicates are kept.
    #[default]
    WithReplacement,
    /// Every picked sensor is distinct; requires k <= pool size.
    Distinct,
}

/// Loads the science sensors from a focal plane layout file. Lines
/// starting with `#` are comments; the first whitespace token of each
/// record is the sensor id. Any raft owning a sensor with the corner
/// marker is excluded wholesale.
pub fn load_science_sensors(layout_path: &Path) -> Result<Vec<SensorId>, SensorError> {
    let content = fs::read_to_string(layout_path).map_err(|source| SensorError::ReadLayout {
        path: layout_path.to_path_buf(),
        source,
    })?;

    let mut sensors = Vec::new();
    let mut corner_rafts: HashSet<String> = HashSet::new();
    for line in content.lines() {
        if line.starts_with('#') {
            continue;
        }
        let Some(sensor_id) = line.split_whitespace().next() else {
            continue;
        };
        let sensor = SensorId::new(sensor_id);
        if sensor.is_corner() {
            corner_rafts.insert(sensor.raft().to_string());
        }
        sensors.push(sensor);
    }

    sensors.retain(|sensor| !corner_rafts.contains(sensor.raft()));
    Ok(sensors)
}

/// Draws `k` sensors from the pool and returns them sorted
/// lexicographically, independent of draw order.
pub fn sample(
    pool: &[SensorId],
    k: usize,
    rng: &mut impl Rng,
    mode: SampleMode,
) -> Result<Vec<SensorId>, SensorError> {
    if k == 0 {
        return Ok(Vec::new());
    }
    if pool.is_empty() {
        return Err(SensorError::EmptyPool);
    }

    let mut picked: Vec<SensorId> = match mode {
        SampleMode::WithReplacement => (0..k)
            .map(|_| pool[rng.gen_range(0..pool.len())].clone())
            .collect(),
        SampleMode::Distinct => {
            if k > pool.len() {
                return Err(SensorError::SampleTooLarge {
                    requested: k,
                    available: pool.len(),
                });
            }
            pool.choose_multiple(rng, k).cloned().collect()
        }
    };
    picked.sort();
    Ok(picked)
}

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("failed to read focal plane layout '{}': {source}", path.display())]
    ReadLayout {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot sample sensors from an empty science pool")]
    EmptyPool,
    #[error("cannot sample {requested} distinct sensors from a pool of {available}")]
    SampleTooLarge { requested: usize, available: usize },
}

impl From<SensorError> for HarnessError {
    fn from(error: SensorError) -> Self {
        let message = error.to_string();
        match error {
            SensorError::ReadLayout { .. } => HarnessError::io_system("IO.LAYOUT_READ", message),
            SensorError::EmptyPool | SensorError::SampleTooLarge { .. } => {
                HarnessError::config("CONFIG.SENSOR_SAMPLE", message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{load_science_sensors, sample, SampleMode, SensorError};
    use crate::domain::SensorId;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn write_layout(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("focalplanelayout.txt");
        fs::write(&path, contents).expect("write layout file");
        path
    }

    fn pool_of(ids: &[&str]) -> Vec<SensorId> {
        ids.iter().copied().map(SensorId::new).collect()
    }

    #[test]
    fn layout_parsing_skips_comments_and_blank_lines() {
        let temp = TempDir::new().expect("create temp dir");
        let path = write_layout(
            temp.path(),
            "# focal plane layout\nR01_S00 0.0 0.0 ccd\n\nR22_S11 1.0 1.0 ccd\n",
        );

        let sensors = load_science_sensors(&path).expect("load layout");
        let rendered: Vec<&str> = sensors.iter().map(SensorId::as_str).collect();
        assert_eq!(rendered, ["R01_S00", "R22_S11"]);
    }

    #[test]
    fn corner_marker_excludes_the_entire_owning_raft() {
        let temp = TempDir::new().expect("create temp dir");
        let path = write_layout(
            temp.path(),
            "R00_S22 0.0 0.0 ccd\nR00_C11 0.0 0.0 guide\nR01_S00 0.0 0.0 ccd\nR44_C00 0.0 0.0 guide\nR22_S11 0.0 0.0 ccd\n",
        );

        let sensors = load_science_sensors(&path).expect("load layout");
        let rendered: Vec<&str> = sensors.iter().map(SensorId::as_str).collect();
        assert_eq!(rendered, ["R01_S00", "R22_S11"]);
    }

    #[test]
    fn corner_sensor_after_science_sibling_still_excludes_the_raft() {
        let temp = TempDir::new().expect("create temp dir");
        let path = write_layout(temp.path(), "R40_S10 0.0 0.0 ccd\nR40_C22 0.0 0.0 guide\n");

        let sensors = load_science_sensors(&path).expect("load layout");
        assert!(sensors.is_empty());
    }

    #[test]
    fn missing_layout_file_is_an_error() {
        let temp = TempDir::new().expect("create temp dir");
        let error = load_science_sensors(&temp.path().join("focalplanelayout.txt"))
            .expect_err("load should fail");
        assert!(matches!(error, SensorError::ReadLayout { .. }));
    }

    #[test]
    fn sampling_is_deterministic_for_a_fixed_seed() {
        let pool = pool_of(&["R01_S00", "R01_S01", "R10_S02", "R22_S11", "R30_S20"]);
        let first = sample(&pool, 3, &mut StdRng::seed_from_u64(7), SampleMode::default())
            .expect("sample");
        let second = sample(&pool, 3, &mut StdRng::seed_from_u64(7), SampleMode::default())
            .expect("sample");
        assert_eq!(first, second);
    }

    #[test]
    fn sampled_sensors_are_sorted_lexicographically() {
        let pool = pool_of(&["R30_S20", "R01_S00", "R22_S11", "R10_S02"]);
        let mut rng = StdRng::seed_from_u64(11);
        let picked = sample(&pool, 4, &mut rng, SampleMode::Distinct).expect("sample");
        for pair in picked.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn with_replacement_sampling_can_repeat_a_sensor() {
        let pool = pool_of(&["R01_S00"]);
        let mut rng = StdRng::seed_from_u64(1);
        let picked = sample(&pool, 3, &mut rng, SampleMode::WithReplacement).expect("sample");
        assert_eq!(picked, pool_of(&["R01_S00", "R01_S00", "R01_S00"]));
    }

    #[test]
    fn distinct_sampling_never_repeats_and_bounds_the_request() {
        let pool = pool_of(&["R01_S00", "R10_S02", "R22_S11"]);
        let mut rng = StdRng::seed_from_u64(5);

        let picked = sample(&pool, 3, &mut rng, SampleMode::Distinct).expect("sample");
        assert_eq!(picked, pool_of(&["R01_S00", "R10_S02", "R22_S11"]));

        let error =
            sample(&pool, 4, &mut rng, SampleMode::Distinct).expect_err("oversized request");
        assert!(matches!(
            error,
            SensorError::SampleTooLarge {
                requested: 4,
                available: 3
            }
        ));
    }

    #[test]
    fn an_empty_pool_rejects_any_positive_request() {
        let mut rng = StdRng::seed_from_u64(2);
        let error =
            sample(&[], 1, &mut rng, SampleMode::WithReplacement).expect_err("empty pool");
        assert!(matches!(error, SensorError::EmptyPool));

        let picked = sample(&[], 0, &mut rng, SampleMode::WithReplacement).expect("k = 0");
        assert!(picked.is_empty());
    }
}
