//! Command line driver for the normalization pipeline.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use medscan_core::{LocalTerminologyIndex, MedicineNormalizer, NormalizerConfig, RawMedicineEntry};
use medscan_extract::{parse_extraction_output, ExtractedMedicine};

#[derive(Parser, Debug)]
#[command(name = "medscan")]
#[command(about = "Normalize prescription medicine names to standardized generics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file (MEDSCAN_* environment variables override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize extraction model output (JSON with a "medicines" array)
    Normalize {
        /// Regional medicine dataset (JSON array of {name, dosageForms?})
        #[arg(long)]
        dataset: PathBuf,

        /// Extraction output file; reads stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,

        /// Skip the remote terminology service
        #[arg(long)]
        offline: bool,
    },
    /// Normalize medicine names given on the command line
    Lookup {
        #[arg(long)]
        dataset: PathBuf,

        #[arg(required = true)]
        names: Vec<String>,

        #[arg(long)]
        offline: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("medscan=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = NormalizerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let output = match cli.command {
        Commands::Normalize {
            dataset,
            input,
            offline,
        } => {
            let normalizer = build_normalizer(&config, &dataset, offline)?;
            let text = read_input(input.as_deref())?;
            let entries = entries_from_extraction(&text)?;
            serde_json::to_string_pretty(&normalizer.resolve_batch(entries))?
        }
        Commands::Lookup {
            dataset,
            names,
            offline,
        } => {
            let normalizer = build_normalizer(&config, &dataset, offline)?;
            let entries: Vec<RawMedicineEntry> = names.into_iter().map(RawMedicineEntry::from).collect();
            serde_json::to_string_pretty(&normalizer.normalize_batch(&entries))?
        }
    };

    println!("{output}");
    Ok(())
}

fn build_normalizer(config: &NormalizerConfig, dataset: &Path, offline: bool) -> Result<MedicineNormalizer> {
    let index = LocalTerminologyIndex::load(dataset, config.match_threshold)
        .with_context(|| format!("Failed to load dataset {}", dataset.display()))?;
    let index = Arc::new(index);

    let normalizer = if offline {
        MedicineNormalizer::local_only(index, config.max_concurrency)?
    } else {
        MedicineNormalizer::from_config(config, index)?
    };
    tracing::info!(tiers = ?normalizer.tiers(), "Normalizer ready");
    Ok(normalizer)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

fn entries_from_extraction(text: &str) -> Result<Vec<RawMedicineEntry>> {
    let output = parse_extraction_output(text).context("Invalid extraction output")?;
    Ok(output.medicines.into_iter().map(to_raw_entry).collect())
}

fn to_raw_entry(medicine: ExtractedMedicine) -> RawMedicineEntry {
    RawMedicineEntry {
        frequency: medicine.readable_frequency(),
        name: medicine.name,
        dosage: medicine.dosage,
        notes: medicine.notes,
        confidence: medicine.confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use medscan_core::MatchSource;
    use std::io::Write;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_lookup_args() {
        let cli = Cli::parse_from(["medscan", "lookup", "--dataset", "nlem.json", "--offline", "Dolo 650", "Pan 40"]);
        match cli.command {
            Commands::Lookup { names, offline, .. } => {
                assert!(offline);
                assert_eq!(names, vec!["Dolo 650", "Pan 40"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_entries_from_extraction() {
        let text = r#"Sure: {"medicines":[{"name":"Paracetemol 500","dosage":"500 mg","frequency":"TDS","confidence":0.82},{"name":" ","confidence":0.1}]}"#;
        let entries = entries_from_extraction(text).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Paracetemol 500");
        assert_eq!(entries[0].frequency, "three times daily");
        assert_eq!(entries[0].confidence, 0.82);
    }

    #[test]
    fn test_offline_pipeline_from_files() {
        let mut dataset = tempfile::NamedTempFile::new().unwrap();
        write!(dataset, r#"[{{"name":"Paracetamol","dosageForms":["Tablet 500 mg"]}}]"#).unwrap();

        let normalizer = build_normalizer(&NormalizerConfig::default(), dataset.path(), true).unwrap();
        assert_eq!(normalizer.tiers(), vec!["local"]);

        let entries = entries_from_extraction(r#"{"medicines":[{"name":"Paracetemol 500","confidence":0.9}]}"#).unwrap();
        let resolved = normalizer.resolve_batch(entries);
        assert_eq!(resolved[0].normalization.source, MatchSource::Local);
    }

    #[test]
    fn test_missing_dataset_is_error() {
        let result = build_normalizer(&NormalizerConfig::default(), Path::new("/nonexistent/nlem.json"), true);
        assert!(result.is_err());
    }
}
