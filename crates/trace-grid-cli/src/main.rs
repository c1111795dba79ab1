//! CLI tool that aligns a directory of simulation trace logs into one CSV.

mod error;
mod summary;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use snafu::{ResultExt, ensure};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trace_grid_core::{
    Pipeline, PipelineConfig, Resolution, StreamCatalog,
    fill::FillMode,
    loader::TraceDirLoader,
    output::{write_csv_file, write_report_json},
};

use crate::error::{
    CatalogSnafu, CliResult, InvalidResolutionSnafu, LoadConfigSnafu, OutputSnafu, PipelineSnafu,
    TraceDirMissingSnafu, TraceDirNotDirSnafu,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FillArg {
    Uniform,
    ByKind,
}

impl From<FillArg> for FillMode {
    fn from(v: FillArg) -> Self {
        match v {
            FillArg::Uniform => FillMode::Uniform,
            FillArg::ByKind => FillMode::ByKind,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Align every trace in a directory onto one time grid and write CSV
    Build {
        #[arg(long = "trace-dir")]
        trace_dir: PathBuf,

        #[arg(long)]
        output: PathBuf,

        /// Grid spacing, e.g. 1ms, 500us, 0.01 (seconds). Overrides the config.
        #[arg(long)]
        resolution: Option<String>,

        /// How gaps are filled. Overrides the config.
        #[arg(long, value_enum)]
        fill: Option<FillArg>,

        /// JSON pipeline config
        #[arg(long)]
        config: Option<PathBuf>,

        /// Aggregate streams in parallel
        #[arg(long, default_value_t = false)]
        parallel: bool,

        /// Print per-stream coverage and non-zero column counts
        #[arg(long, default_value_t = false)]
        summary: bool,

        /// Also write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// List the streams and derived metrics of the default catalog
    Streams,
}

#[derive(Debug, Parser)]
#[command(name = "tracegrid", version, about = "Align simulation trace logs onto a uniform time grid")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,

    /// Log level (trace, debug, info, warn, error); RUST_LOG wins when set
    #[arg(short = 'l', long, default_value = "warn", global = true)]
    log_level: String,
}

struct BuildArgs {
    trace_dir: PathBuf,
    output: PathBuf,
    resolution: Option<String>,
    fill: Option<FillArg>,
    config: Option<PathBuf>,
    parallel: bool,
    summary: bool,
    report: Option<PathBuf>,
}

fn parse_resolution(spec: &str) -> CliResult<Resolution> {
    spec.parse::<Resolution>().context(InvalidResolutionSnafu {
        spec: spec.to_string(),
    })
}

fn check_trace_dir(dir: &Path) -> CliResult<()> {
    let path = dir.display().to_string();
    let meta = std::fs::metadata(dir).context(TraceDirMissingSnafu { path: &path })?;
    ensure!(meta.is_dir(), TraceDirNotDirSnafu { path });
    Ok(())
}

fn resolve_config(args: &BuildArgs) -> CliResult<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_path(path).context(LoadConfigSnafu)?,
        None => PipelineConfig::default(),
    };
    if let Some(spec) = &args.resolution {
        config.resolution = parse_resolution(spec)?;
    }
    if let Some(fill) = args.fill {
        config.fill.mode = fill.into();
    }
    if args.parallel {
        config.parallel = true;
    }
    Ok(config)
}

fn cmd_build(args: BuildArgs) -> CliResult<()> {
    check_trace_dir(&args.trace_dir)?;
    let config = resolve_config(&args)?;
    let trace_dir = args.trace_dir.display().to_string();

    let start = Instant::now();
    let pipeline = Pipeline::nr(config).context(PipelineSnafu {
        trace_dir: &trace_dir,
    })?;
    let dataset = pipeline
        .run(&TraceDirLoader::new(&args.trace_dir))
        .context(PipelineSnafu {
            trace_dir: &trace_dir,
        })?;
    let batch = dataset.to_record_batch().context(PipelineSnafu {
        trace_dir: &trace_dir,
    })?;

    write_csv_file(&args.output, &batch).context(OutputSnafu {
        path: args.output.display().to_string(),
    })?;

    let grid = dataset.grid();
    println!(
        "Wrote {} rows x {} columns to {}",
        batch.num_rows(),
        batch.num_columns(),
        args.output.display()
    );
    println!(
        "Time range {:.6}s .. {:.6}s at {}; {}/{} streams loaded in {:.3}s",
        grid.t_min(),
        grid.t_max(),
        grid.resolution(),
        dataset.report().loaded_streams(),
        pipeline.catalog().streams().len(),
        start.elapsed().as_secs_f64()
    );

    if let Some(path) = &args.report {
        write_report_json(path, dataset.report()).context(OutputSnafu {
            path: path.display().to_string(),
        })?;
        println!("Wrote report to {}", path.display());
    }

    if args.summary {
        println!("{}", summary::render_report(dataset.report()));
        println!("{}", summary::render_nonzero(dataset.report()));
    }

    Ok(())
}

fn cmd_streams() -> CliResult<()> {
    let catalog = StreamCatalog::nr_default().context(CatalogSnafu)?;
    println!("{}", summary::render_catalog(&catalog));
    Ok(())
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.cmd {
        Command::Build {
            trace_dir,
            output,
            resolution,
            fill,
            config,
            parallel,
            summary,
            report,
        } => cmd_build(BuildArgs {
            trace_dir,
            output,
            resolution,
            fill,
            config,
            parallel,
            summary,
            report,
        }),

        Command::Streams => cmd_streams(),
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
