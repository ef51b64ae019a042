use super::CliError;
use super::helpers::*;
use anyhow::Context;
use rand::SeedableRng;
use rand::rngs::StdRng;
use regress_core::catalog::CatalogSpec;
use regress_core::collector::collect_outputs;
use regress_core::comparator::{Comparator, write_report_file};
use regress_core::domain::SensorId;
use regress_core::driver::{DEFAULT_TELESCOPE, SimulatorInstall, run_all};
use regress_core::exec::SystemExecutor;
use regress_core::sensors::{SampleMode, load_science_sensors, sample};
use regress_core::starfield::{FieldWindow, generate_stars, write_catalog, write_region_file};
use std::path::PathBuf;
use tracing::info;

#[derive(clap::Args)]
pub(super) struct RunArgs {
    /// Destination directory for copies of the simulator output
    dest_dir: PathBuf,

    /// Catalog template holding the simulator configuration parameters,
    /// resolved against the install root unless absolute
    #[arg(long, default_value = "data/default_instcat")]
    default_instcat: PathBuf,

    /// Filename for the generated instance catalog
    #[arg(long, default_value = "instcat_regression_test")]
    catalog: PathBuf,

    /// Number of sensors to simulate
    #[arg(short = 'n', long, default_value_t = 5)]
    nsensors: usize,

    /// Field of view size (degrees)
    #[arg(long, default_value_t = 3.5)]
    fov: f64,

    /// Number of stars to generate in the focal plane
    #[arg(long, default_value_t = 1000)]
    nstars: usize,

    /// Nominal number of incident photons per star
    #[arg(long, default_value_t = 100_000)]
    count: u64,

    /// Random number seed
    #[arg(long, default_value_t = 481041)]
    seed: u64,

    /// Simulator install directory; defaults to $PHOSIMDIR
    #[arg(long)]
    phosim_dir: Option<PathBuf>,

    /// Sample sensors without repeats instead of with replacement
    #[arg(long)]
    distinct_sensors: bool,

    /// Verbosity flag
    #[arg(short, long)]
    verbose: bool,
}

#[derive(clap::Args)]
pub(super) struct CompareArgs {
    /// Directory of target data for comparison to reference data
    target_dir: PathBuf,

    /// Directory of reference data
    #[arg(short = 'r', long, default_value = "reference_data")]
    reference_dir: PathBuf,

    /// JSON report output path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Verbosity flag
    #[arg(short, long)]
    verbose: bool,
}

pub(super) fn run_command(args: RunArgs) -> Result<i32, CliError> {
    init_tracing(args.verbose);

    let install = SimulatorInstall::new(resolve_install_dir(args.phosim_dir.clone())?);
    let template_path = resolve_install_path(install.root(), &args.default_instcat);

    let spec = CatalogSpec::load(&template_path).map_err(harness)?;
    let window = FieldWindow::from_catalog(&spec, args.fov).map_err(harness)?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let stars = generate_stars(&window, args.nstars, args.count as f64, &mut rng);

    // The simulator runs with the install root as its working directory,
    // so it needs an absolute path back to the catalog.
    let catalog_path = std::path::absolute(&args.catalog)
        .with_context(|| format!("failed to resolve catalog path '{}'", args.catalog.display()))?;
    write_catalog(&template_path, &catalog_path, &stars).map_err(harness)?;
    write_region_file(&install.output_dir().join("ds9.reg"), &stars).map_err(harness)?;
    info!(
        "wrote {} stars to catalog '{}'",
        stars.len(),
        catalog_path.display()
    );

    let science =
        load_science_sensors(&install.layout_path(DEFAULT_TELESCOPE)).map_err(harness)?;
    let mode = if args.distinct_sensors {
        SampleMode::Distinct
    } else {
        SampleMode::WithReplacement
    };
    let sensors = sample(&science, args.nsensors, &mut rng, mode).map_err(harness)?;
    let sensor_names: Vec<&str> = sensors.iter().map(SensorId::as_str).collect();
    info!(
        "sampled {} of {} science sensors: {}",
        sensors.len(),
        science.len(),
        sensor_names.join(" ")
    );

    run_all(&catalog_path, &sensors, &install, &SystemExecutor).map_err(harness)?;
    collect_outputs(&install, &args.dest_dir).map_err(harness)?;
    info!(
        "collected simulator outputs into '{}'",
        args.dest_dir.display()
    );

    Ok(0)
}

pub(super) fn compare_command(args: CompareArgs) -> Result<i32, CliError> {
    init_tracing(args.verbose);

    let comparator = Comparator::new().map_err(harness)?;
    let report = comparator
        .compare(&args.reference_dir, &args.target_dir, &SystemExecutor)
        .map_err(harness)?;

    if let Some(report_path) = &args.report {
        write_report_file(report_path, &report).map_err(harness)?;
        info!("wrote comparison report to '{}'", report_path.display());
    }

    let failed = report.failed_file_names();
    if failed.is_empty() {
        info!("compared {} files, all matched", report.file_count);
        return Ok(0);
    }

    println!("Failed comparisons:");
    for name in failed {
        println!("{name}");
    }
    Ok(1)
}
