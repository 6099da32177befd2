//! Developer utility to retrain the urgency model from a complaint database
//! and report holdout quality.

use std::path::PathBuf;

use civic_triage::app_dirs;
use civic_triage::complaints::store::{ComplaintStore, SqliteComplaintStore};
use civic_triage::complaints::Urgency;
use civic_triage::engine::TriageEngine;
use civic_triage::logging;
use civic_triage::ml::metrics::ConfusionMatrix;
use civic_triage::model_store::FsModelStore;

fn main() {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let complaints = SqliteComplaintStore::open(&options.db_path).map_err(|err| err.to_string())?;
    let model_dir = match &options.model_dir {
        Some(dir) => dir.clone(),
        None => app_dirs::model_dir().map_err(|err| err.to_string())?,
    };

    let labeled = complaints.labeled_examples().map_err(|err| err.to_string())?;
    let total = complaints.total_count().map_err(|err| err.to_string())?;
    println!(
        "complaints on record: {total} ({} labeled for training)",
        labeled.len()
    );

    let models = FsModelStore::new(&model_dir).map_err(|err| err.to_string())?;
    let engine = TriageEngine::new(models, complaints);
    let retrained = engine.retrain().map_err(|err| err.to_string())?;
    if !retrained {
        return Err("Not enough data to retrain".to_string());
    }

    let info = engine.model_info();
    println!(
        "retrained: samples={} real={} accuracy={:.3} version={}",
        info.provenance.total_samples,
        info.provenance.real_sample_count,
        info.provenance.accuracy,
        info.provenance.version
    );

    // Resubstitution report over the labeled complaints, tier by tier.
    if !labeled.is_empty() {
        let mut cm = ConfusionMatrix::new(Urgency::ALL.len());
        for example in &labeled {
            let predicted = engine.predict_urgency(&example.description, example.category);
            cm.add(example.urgency.class_index(), predicted.class_index());
        }
        println!("labeled-complaint agreement: {:.3}", cm.accuracy());
        for (tier, (precision, recall, support)) in Urgency::ALL.iter().zip(cm.per_class()) {
            println!(
                "  {tier:<6} precision={precision:.3} recall={recall:.3} support={support}"
            );
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    db_path: PathBuf,
    model_dir: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut db_path: Option<PathBuf> = None;
    let mut model_dir: Option<PathBuf> = None;
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--db" => {
                let value = iter.next().ok_or("--db requires a path")?;
                db_path = Some(PathBuf::from(value));
            }
            "--model-dir" => {
                let value = iter.next().ok_or("--model-dir requires a path")?;
                model_dir = Some(PathBuf::from(value));
            }
            "--help" | "-h" => {
                return Err(usage());
            }
            other => {
                return Err(format!("Unknown argument: {other}\n{}", usage()));
            }
        }
    }
    Ok(CliOptions {
        db_path: db_path.ok_or_else(usage)?,
        model_dir,
    })
}

fn usage() -> String {
    "Usage: civic-triage-train --db <complaints.db> [--model-dir <dir>]".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_args_requires_db() {
        assert!(parse_args(vec![]).is_err());
        let options = parse_args(vec!["--db".into(), "db/complaints.db".into()]).unwrap();
        assert_eq!(options.db_path, PathBuf::from("db/complaints.db"));
        assert!(options.model_dir.is_none());
    }

    #[test]
    fn parse_args_rejects_unknown_flags() {
        assert!(parse_args(vec!["--verbose".into()]).is_err());
    }
}
