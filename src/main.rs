//! Demo entry point: bootstrap the urgency model and classify sample
//! complaints, mirroring what the portal does on submission.

use civic_triage::app_dirs;
use civic_triage::complaints::Category;
use civic_triage::complaints::store::MemoryComplaintStore;
use civic_triage::engine::TriageEngine;
use civic_triage::logging;
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
    let model_dir = app_dirs::model_dir().map_err(|err| err.to_string())?;
    let models = FsModelStore::new(&model_dir).map_err(|err| err.to_string())?;
    let engine = TriageEngine::new(models, MemoryComplaintStore::new());

    let samples = [
        (
            "Water pipe burst flooding the entire street emergency help needed",
            Category::WaterSupply,
        ),
        (
            "Streetlight not working need replacement bulb",
            Category::StreetlightElectricity,
        ),
        (
            "Small pothole causing minor inconvenience",
            Category::RoadsPotholes,
        ),
        (
            "Garbage overflow health hazard disease rats",
            Category::GarbageWaste,
        ),
        (
            "Tree fallen blocking road dangerous emergency",
            Category::TreeFall,
        ),
    ];

    for (description, category) in samples {
        let urgency = engine.predict_urgency(description, category);
        let window = engine.predict_resolution_time(description, category, urgency);
        println!("{description}");
        println!("  category: {category}");
        println!("  urgency:  {urgency}");
        println!("  expected resolution: {window}");
    }

    let info = engine.model_info();
    println!(
        "model: exists={} type={:?} samples={} accuracy={:.3}",
        info.model_exists,
        info.provenance.training_type,
        info.provenance.total_samples,
        info.provenance.accuracy
    );
    Ok(())
}
