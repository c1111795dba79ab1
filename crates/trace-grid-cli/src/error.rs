use trace_grid_core::{
    CatalogError, ConfigError, ParseResolutionError, PipelineError, output::OutputError,
};

use snafu::Snafu;

pub type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display("Invalid --resolution '{spec}': {source}"))]
    InvalidResolution {
        spec: String,
        source: ParseResolutionError,
    },

    #[snafu(display("Failed to load config: {source}"))]
    LoadConfig { source: ConfigError },

    #[snafu(display("Trace directory not found or not accessible: {path}"))]
    TraceDirMissing {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("Trace path is not a directory: {path}"))]
    TraceDirNotDir { path: String },

    #[snafu(display("Invalid stream catalog: {source}"))]
    Catalog { source: CatalogError },

    #[snafu(display(
        "Failed to build dataset from {trace_dir}. \
         Ensure the directory holds at least one readable trace file."
    ))]
    Pipeline {
        trace_dir: String,
        source: PipelineError,
    },

    #[snafu(display("Failed to write {path}: {source}"))]
    Output { path: String, source: OutputError },
}
