use crossterm::style::Stylize;
use std::error::Error;
use std::io::{stdin, stdout, BufRead, Write};
use std::path::Path;
use symptom_core::config::{self, EngineConfig, APP_NAME, APP_VERSION};
use symptom_core::{PredictionEngine, PredictionResult, Recognition};
use tracing_subscriber::EnvFilter;

struct Session {
    top_k: usize,
    json: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let loaded = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(Path::new(&path)),
        None => Ok(EngineConfig::default()),
    };
    let filter = loaded
        .as_ref()
        .map(|c| c.log_filter.clone())
        .unwrap_or_else(|_| config::default_log_filter());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let config = loaded
        .map_err(|e| {
            tracing::error!(error = %e, "Could not read configuration");
            e
        })?
        .apply_env_overrides();

    tracing::info!("{} starting v{}", APP_NAME, APP_VERSION);
    let engine = PredictionEngine::from_config(&config).map_err(|e| {
        tracing::error!(error = %e, "Engine initialization failed");
        e
    })?;

    let mut session = Session {
        top_k: engine.default_top_k(),
        json: false,
    };
    print_banner();

    let mut out = stdout();
    write!(out, "{} ", ">".cyan())?;
    out.flush()?;
    for line in stdin().lock().lines() {
        let line = line?;
        let cmd = line.trim();
        match cmd {
            "exit" | "quit" => break,
            "" => {}
            ":json" => {
                session.json = !session.json;
                println!("JSON output {}", if session.json { "on" } else { "off" });
            }
            ":symptoms" => print_symptoms(&engine),
            s if s.starts_with(":top") => match s[4..].trim().parse::<usize>() {
                Ok(n) if n > 0 => {
                    session.top_k = n;
                    println!("Showing top {n} predictions");
                }
                _ => println!("{}", "Usage: :top N (N >= 1)".yellow()),
            },
            text => match engine.predict_from_text(text, session.top_k) {
                Ok(result) if session.json => println!("{}", serde_json::to_string_pretty(&result)?),
                Ok(result) => print_result(&result),
                Err(e) => println!("{}", e.to_string().red()),
            },
        }
        write!(out, "{} ", ">".cyan())?;
        out.flush()?;
    }
    Ok(())
}

fn print_banner() {
    println!("{}", format!("{APP_NAME} v{APP_VERSION}").bold());
    println!("---------------------------------------------------------------");
    println!("Describe your symptoms, e.g. 'I have fever, chills and a headache'.");
    println!("Commands: ':top N', ':json', ':symptoms', 'exit'.");
    println!(
        "{}\n",
        "This tool is not a diagnosis. Consult a medical professional.".dark_grey()
    );
}

fn print_symptoms(engine: &PredictionEngine) {
    let names: Vec<String> = engine
        .vocabulary()
        .names()
        .iter()
        .map(|n| n.replace('_', " "))
        .collect();
    println!("{} known symptoms:", names.len());
    for chunk in names.chunks(4) {
        println!("  {}", chunk.join(", "));
    }
}

fn print_result(result: &PredictionResult) {
    match result.recognition {
        Recognition::EmptyInput => {
            println!("{}", "Please describe at least one symptom.".yellow());
            return;
        }
        Recognition::Unrecognized if result.predictions.is_empty() => {
            println!(
                "{}",
                "No symptoms recognized. Try ':symptoms' to see what I understand.".yellow()
            );
            return;
        }
        _ => {}
    }

    if !result.detected_symptoms.is_empty() {
        let shown: Vec<String> = result.detected_symptoms.iter().map(|s| s.replace('_', " ")).collect();
        println!("Detected: {}", shown.join(", ").green());
    }
    for (i, p) in result.predictions.iter().enumerate() {
        println!(
            "\n{}. {} {} ({})",
            i + 1,
            p.disease.as_str().bold(),
            format!("{:.1}%", p.confidence * 100.0).cyan(),
            p.band.label()
        );
        println!("   {}", p.description_text());
        if p.symptom_match.matched > 0 {
            println!(
                "   {}",
                format!(
                    "Matches {} of your symptoms ({:.0}% of its known symptoms)",
                    p.symptom_match.matched,
                    p.symptom_match.coverage * 100.0
                )
                .dark_grey()
            );
        }
        if !p.precautions.is_empty() {
            println!("   Precautions:");
            for precaution in &p.precautions {
                println!("     - {precaution}");
            }
        }
    }
    println!();
}
