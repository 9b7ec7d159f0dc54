//! psg_load - load a polysomnography dataset into memory
//!
//! Resolves the data directory from the Croissant descriptor, then loads the
//! signals, analysis files and questionnaires of the selected samples.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use psg_importer::dataset::DEFAULT_METADATA_FILE;
use psg_importer::{
    list_sample_ids, load_analysis_and_yaml_files, load_signals, DatasetMetadata,
    ANALYSIS_DATA_FILES, YAML_DATA_FILES,
};

/// Load data samples.
#[derive(Parser)]
#[command(name = "psg_load")]
#[command(version)]
#[command(about = "Load data samples.", long_about = None)]
struct Cli {
    /// List of sample IDs to load (default: every sample directory)
    #[arg(long = "sample_ids", num_args = 0..)]
    sample_ids: Vec<String>,

    /// List of analysis data files to load (default: full catalog)
    #[arg(long = "analysis_data_files", num_args = 0..)]
    analysis_data_files: Vec<String>,

    /// List of YAML data files to load (default: full catalog)
    #[arg(long = "yaml_data_files", num_args = 0..)]
    yaml_data_files: Vec<String>,

    /// Croissant dataset descriptor
    #[arg(long, default_value = DEFAULT_METADATA_FILE)]
    metadata: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let metadata = DatasetMetadata::from_path(&cli.metadata)
        .with_context(|| format!("reading dataset metadata {}", cli.metadata.display()))?;
    let base_path = metadata.resolve_base_path();
    log::info!("Dataset root: {}", base_path.display());

    let sample_ids = if cli.sample_ids.is_empty() {
        list_sample_ids(&base_path)
            .with_context(|| format!("listing samples in {}", base_path.display()))?
    } else {
        cli.sample_ids
    };
    let analysis_data_files = or_catalog(cli.analysis_data_files, &ANALYSIS_DATA_FILES);
    let yaml_data_files = or_catalog(cli.yaml_data_files, &YAML_DATA_FILES);

    let signals = load_signals(&base_path, &sample_ids).context("loading signals")?;
    log::info!("Loaded {} signals.", signals.len());

    let (analysis_data, yaml_data) = load_analysis_and_yaml_files(
        &base_path,
        &sample_ids,
        &analysis_data_files,
        &yaml_data_files,
    )
    .context("loading analysis and yaml files")?;
    log::info!("Loaded analysis data for {} samples.", analysis_data.len());
    log::info!("Loaded YAML data for {} samples.", yaml_data.len());

    Ok(())
}

/// Falls back to the built-in catalog when no names were given.
fn or_catalog(names: Vec<String>, catalog: &[&str]) -> Vec<String> {
    if names.is_empty() {
        catalog.iter().map(|s| s.to_string()).collect()
    } else {
        names
    }
}
