//! neurorsa: RDM, DNN feature and ROI signal extraction.
//!
//! This is the CLI binary entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use neurorsa::config::{DEFAULT_HIST_BINS, DEFAULT_METRIC, DEFAULT_PCA_COMPONENTS};
use neurorsa::feature::FeatureMethod;
use neurorsa::rdm::{IterAxis, Metric};
use neurorsa::roi::RoiMethod;
use neurorsa::runtime::{
    run_feature, run_rdm, run_roi, ActivationFilter, FeatureConfig, RdmConfig, RoiConfig,
};
use tracing_subscriber::EnvFilter;

/// neurorsa analysis CLI.
#[derive(Parser, Debug)]
#[command(
    name = "neurorsa",
    about = "RDMs, DNN features and ROI signals for brain/DNN comparison",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Representational dissimilarity matrices from DNN activations.
    Rdm(RdmArgs),
    /// Histogram / power-spectrum / PCA features from DNN activations.
    Feature(FeatureArgs),
    /// Region-of-interest signals from brain volumes.
    Roi(RoiArgs),
}

/// Activation input and layer/channel/location filters.
#[derive(Args, Debug)]
struct ActivationArgs {
    /// Activation container.
    #[arg(long)]
    act: PathBuf,

    /// Layer names to process.
    #[arg(long, num_args = 1.., conflicts_with = "dmask")]
    layer: Vec<String>,

    /// Channel numbers (1-based) within the given layers.
    #[arg(long, num_args = 1.., requires = "layer")]
    chn: Option<Vec<usize>>,

    /// DNN mask file selecting layers, channels and locations.
    #[arg(long)]
    dmask: Option<PathBuf>,

    /// Iteration axis: channel or row_col. Whole layer when omitted.
    #[arg(long)]
    iteraxis: Option<IterAxis>,
}

impl ActivationArgs {
    fn filter(&self) -> ActivationFilter {
        ActivationFilter {
            layers: self.layer.clone(),
            channels: self.chn.clone(),
            dmask: self.dmask.clone(),
        }
    }
}

#[derive(Args, Debug)]
struct RdmArgs {
    #[command(flatten)]
    input: ActivationArgs,

    /// Stimulus category file; RDMs are computed between category means.
    #[arg(long)]
    cate: Option<PathBuf>,

    /// Distance metric.
    #[arg(long, default_value = DEFAULT_METRIC)]
    metric: Metric,

    /// Z-score each stimulus pattern before computing distances.
    #[arg(long, default_value_t = false)]
    zscore: bool,

    /// Output file, conventionally *.rdm.bin.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct FeatureArgs {
    #[command(flatten)]
    input: ActivationArgs,

    /// Feature method: hist, psd or pca.
    #[arg(long, default_value = "hist")]
    method: String,

    /// Histogram bin count.
    #[arg(long, default_value_t = DEFAULT_HIST_BINS)]
    bins: usize,

    /// Number of principal components.
    #[arg(long, default_value_t = DEFAULT_PCA_COMPONENTS)]
    n_components: usize,

    /// Output file, conventionally *.act.bin.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct RoiArgs {
    /// Brain image container.
    #[arg(long)]
    image: PathBuf,

    /// Label mask container.
    #[arg(long)]
    mask: PathBuf,

    /// Aggregation: mean, max, min, std or median.
    #[arg(long, default_value = "mean")]
    method: RoiMethod,

    /// Labels to extract. All labels in the mask when omitted.
    #[arg(long, num_args = 1..)]
    label: Vec<i32>,

    /// Output file, conventionally *.roi.bin.
    #[arg(long)]
    out: PathBuf,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Rdm(args) => {
            let config = RdmConfig {
                filter: args.input.filter(),
                act: args.input.act,
                iteraxis: args.input.iteraxis.unwrap_or_default(),
                cate: args.cate,
                metric: args.metric,
                zscore: args.zscore,
                out: args.out,
            };
            tracing::debug!("{:?}", config);
            run_rdm(&config)?;
        }
        Command::Feature(args) => {
            let method = FeatureMethod::from_name(&args.method, args.bins, args.n_components)?;
            let config = FeatureConfig {
                filter: args.input.filter(),
                act: args.input.act,
                iteraxis: args.input.iteraxis.unwrap_or_default(),
                method,
                out: args.out,
            };
            tracing::debug!("{:?}", config);
            run_feature(&config)?;
        }
        Command::Roi(args) => {
            let config = RoiConfig {
                image: args.image,
                mask: args.mask,
                method: args.method,
                labels: args.label,
                out: args.out,
            };
            tracing::debug!("{:?}", config);
            run_roi(&config)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!("neurorsa v{}", env!("CARGO_PKG_VERSION"));

    match run(cli) {
        Ok(()) => {
            tracing::info!("Done.");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {:?}", err);
            ExitCode::FAILURE
        }
    }
}
