#![allow(dead_code)]

use std::fs;
use std::path::Path;

/// Writes a single-file, format 16 WFDB record at `<base>/<id>/PSG/<id>`.
///
/// Gain 1 and baseline 0, so physical values equal the digital ones.
pub fn write_record(base: &Path, sample_id: &str, fs: u32, channels: &[(&str, &[i16])]) {
    let dir = base.join(sample_id).join("PSG");
    fs::create_dir_all(&dir).unwrap();

    let num_samples = channels.first().map_or(0, |(_, s)| s.len());
    let mut header = format!("{} {} {} {}\n", sample_id, channels.len(), fs, num_samples);
    for (name, samples) in channels {
        let checksum = samples.iter().fold(0i16, |acc, &s| acc.wrapping_add(s));
        let initial = samples.first().copied().unwrap_or(0);
        header.push_str(&format!(
            "{}.dat 16 1(0)/uV 16 0 {} {} 0 {}\n",
            sample_id, initial, checksum, name
        ));
    }
    fs::write(dir.join(format!("{}.hea", sample_id)), header).unwrap();

    let mut data = Vec::with_capacity(num_samples * channels.len() * 2);
    for t in 0..num_samples {
        for (_, samples) in channels {
            data.extend_from_slice(&samples[t].to_le_bytes());
        }
    }
    fs::write(dir.join(format!("{}.dat", sample_id)), data).unwrap();
}

/// Writes a scoring-software style event file.
pub fn write_analysis_file(base: &Path, sample_id: &str, file_name: &str, body: &str) {
    let dir = base.join(sample_id).join("PSG").join("Analysedaten");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file_name), body).unwrap();
}

pub fn write_yaml_file(base: &Path, sample_id: &str, file_name: &str, body: &str) {
    let dir = base.join(sample_id).join("YAML");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file_name), body).unwrap();
}

pub const EVENTS: &str = "Signal ID: Test\nRate: 30 s\n\n22:01:30,000; Wake\n22:02:00,000; N1\n";
