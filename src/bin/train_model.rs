use std::error::Error;
use std::path::Path;
use symptom_core::config::{self, EngineConfig};
use symptom_core::dataset::SymptomDataset;
use symptom_core::persistence::save_bundle;
use symptom_core::training::train_bundle;
use tracing_subscriber::EnvFilter;

/// Trains the disease classifier from the configured dataset and writes the
/// model bundle. Usage: `train_model [config.json]`.
fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(Path::new(&path))?,
        None => EngineConfig::default(),
    }
    .apply_env_overrides();

    let dataset = SymptomDataset::load(&config.data.dataset)?;
    let bundle = train_bundle(&dataset, &config.forest, &config.training).map_err(|e| {
        tracing::error!(error = %e, "Training failed");
        e
    })?;
    save_bundle(&bundle, &config.model_path)?;

    let report = &bundle.report;
    println!("Model written to {}", config.model_path.display());
    println!(
        "  records used: {} of {} (train {}, holdout {})",
        report.records_used, report.records_total, report.train_samples, report.holdout_samples
    );
    match report.holdout_accuracy {
        Some(acc) => println!("  holdout accuracy: {:.2}%", acc * 100.0),
        None => println!("  holdout accuracy: n/a"),
    }
    Ok(())
}
