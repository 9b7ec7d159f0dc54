use psg_importer::{load_analysis_and_yaml_files, load_record, ANALYSIS_DATA_FILES, YAML_DATA_FILES};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    // Load one sample's waveform record
    let record = load_record("data/S1/PSG/S1")?;

    println!("Record: {}", record.record_name);
    println!("Sample rate: {} Hz", record.sampling_frequency);
    println!("Duration: {:.1} seconds", record.duration());

    // Channels come back sorted by name
    println!("\nChannels ({}):", record.num_channels());
    for (name, samples) in record.iter().take(5) {
        let units = record.units(name).unwrap_or("");
        match samples.first() {
            Some(first) => println!("  {}: {} samples, first {} {}", name, samples.len(), first, units),
            None => println!("  {}: no samples", name),
        }
    }
    if record.num_channels() > 5 {
        println!("  ... and {} more", record.num_channels() - 5);
    }

    // Analysis and questionnaire files; missing ones come back as None
    let (analysis, yaml) =
        load_analysis_and_yaml_files("data", &["S1"], &ANALYSIS_DATA_FILES, &YAML_DATA_FILES)?;

    let present = analysis["S1"].values().filter(|f| f.is_some()).count();
    println!("\nAnalysis files: {}/{} present", present, ANALYSIS_DATA_FILES.len());
    if let Some(Some(profile)) = analysis["S1"].get("Schlafprofil.txt") {
        println!("Sleep profile: {} epochs", profile.len());
    }

    let answered = yaml["S1"].values().filter(|d| d.is_some()).count();
    println!("Questionnaires: {}/{} present", answered, YAML_DATA_FILES.len());

    Ok(())
}
