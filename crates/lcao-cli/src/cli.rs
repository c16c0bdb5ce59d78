use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "LCAONet CLI - Predict properties of molecules and crystals with an orbital-interaction message-passing network.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Predict per-structure properties for every frame of an extended XYZ file.
    Predict(PredictArgs),
    /// Summarise the neighbour graphs and triplets built for each frame.
    Inspect(InspectArgs),
}

/// Arguments for the `predict` subcommand.
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Path to the input structure file (extended XYZ, one or more frames).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the CSV predictions. Printed to stdout when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Path to a model configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override `model.cutoff` from the config file.
    #[arg(long, value_name = "FLOAT")]
    pub cutoff: Option<f64>,

    /// Override `prediction.batch-size` from the config file.
    #[arg(short, long, value_name = "INT")]
    pub batch_size: Option<usize>,

    /// Override `model.seed` from the config file.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Override `model.atomref` with a per-element reference CSV file.
    #[arg(long, value_name = "PATH")]
    pub atomref: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S model.hidden-dim=64
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to the input structure file (extended XYZ, one or more frames).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Neighbour-list radius in Angstroms.
    #[arg(long, required = true, value_name = "FLOAT")]
    pub cutoff: f64,

    /// Path for the CSV summary. Printed to stdout when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}
