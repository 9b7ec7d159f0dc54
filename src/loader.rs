use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::events::read_event_file;
use crate::normalize::normalize_record;
use crate::questionnaire::read_questionnaire;
use crate::reader::read_record;
use crate::types::{EventFile, PsgError, SignalRecord};

/// Analysis-event files exported for every recording.
pub const ANALYSIS_DATA_FILES: [&str; 42] = [
    "AF.txt",
    "Akt.txt",
    "Alpha+Beta FFT.txt",
    "Autonome Arousal.txt",
    "Average Frequency Value.txt",
    "CAP.txt",
    "Cheyne Stokes.txt",
    "Delta FFT.txt",
    "Diastol PTT.txt",
    "Effort Ext1 Anstieg.txt",
    "Effort Ext1 Events.txt",
    "Effort Ext2 Anstieg.txt",
    "Effort Ext2 Events.txt",
    "Flow Events.txt",
    "HRV HF.txt",
    "HRV LF.txt",
    "Herzfrequenz Kurve.txt",
    "Integral EMG.txt",
    "Kardio Events.txt",
    "Klassifizierte Arousal.txt",
    "Klassifizierte PTT.txt",
    "Körperlage.txt",
    "Licht.txt",
    "Marker.txt",
    "Obstruktion.txt",
    "PLM Events.txt",
    "PTT Raw.txt",
    "Phasenw. Events.txt",
    "Phasenwinkel.txt",
    "REM Prüfung.txt",
    "REM.txt",
    "RR-Intervall.txt",
    "SVB.txt",
    "Schlaf Profil Sicherheit.txt",
    "Schlafprofil.txt",
    "Schnarchen Events.txt",
    "Sigma FFT.txt",
    "SpO2 Events.txt",
    "SpO2.txt",
    "Spindel  K.txt",
    "Spindelfrequenz.txt",
    "Systol. PTT.txt",
];

/// Questionnaire documents stored per subject.
pub const YAML_DATA_FILES: [&str; 10] = [
    "allgemeiner_schlaffragebogen_1.yml",
    "allgemeiner_schlaffragebogen_1_2.yml",
    "arztbrief_1.yml",
    "epworth_sleepiness_scale.yml",
    "psqi_fragebogen_1.yml",
    "psqi_fragebogen_2.yml",
    "psqi_fragebogen_3.yml",
    "psqi_fragebogen_4.yml",
    "restless_legs_fragebogen.yml",
    "scorer.yml",
];

const PSG_DIR: &str = "PSG";
const ANALYSIS_DIR: &str = "Analysedaten";
const YAML_DIR: &str = "YAML";

/// Signal records keyed by record name.
pub type SignalData = BTreeMap<String, SignalRecord>;
/// Sample ID -> analysis file name -> parsed events (`None` if missing).
pub type AnalysisData = BTreeMap<String, BTreeMap<String, Option<EventFile>>>;
/// Sample ID -> YAML file name -> parsed document (`None` if missing).
pub type QuestionnaireData = BTreeMap<String, BTreeMap<String, Option<Value>>>;

/// Path of the waveform record of a sample: `<base>/<id>/PSG/<id>`.
pub fn record_path(base_path: &Path, sample_id: &str) -> PathBuf {
    base_path.join(sample_id).join(PSG_DIR).join(sample_id)
}

/// Path of an analysis file: `<base>/<id>/PSG/Analysedaten/<name>`.
pub fn analysis_path(base_path: &Path, sample_id: &str, file_name: &str) -> PathBuf {
    base_path
        .join(sample_id)
        .join(PSG_DIR)
        .join(ANALYSIS_DIR)
        .join(file_name)
}

/// Path of a questionnaire file: `<base>/<id>/YAML/<name>`.
pub fn yaml_path(base_path: &Path, sample_id: &str, file_name: &str) -> PathBuf {
    base_path.join(sample_id).join(YAML_DIR).join(file_name)
}

/// Loads and normalizes the waveform record of every sample.
///
/// Records are keyed by the record name stored in their header. The first
/// record that cannot be read aborts the whole load.
pub fn load_signals<P, S>(base_path: P, sample_ids: &[S]) -> Result<SignalData, PsgError>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let base_path = base_path.as_ref();
    let mut signal_data = SignalData::new();

    for (i, sample_id) in sample_ids.iter().enumerate() {
        let sample_id = sample_id.as_ref();
        log::info!(
            "Loading signals {}/{}: {}",
            i + 1,
            sample_ids.len(),
            sample_id
        );

        let record = read_record(record_path(base_path, sample_id))?;
        let normalized = normalize_record(&record)?;
        signal_data.insert(normalized.record_name.clone(), normalized);
    }

    Ok(signal_data)
}

/// Loads analysis-event files and questionnaires for every sample.
///
/// Each (sample, file) pair gets an entry. A missing file is stored as `None`
/// and logged as a warning; any other failure, such as malformed content,
/// aborts the load.
pub fn load_analysis_and_yaml_files<P, S, A, Y>(
    base_path: P,
    sample_ids: &[S],
    analysis_data_files: &[A],
    yaml_data_files: &[Y],
) -> Result<(AnalysisData, QuestionnaireData), PsgError>
where
    P: AsRef<Path>,
    S: AsRef<str>,
    A: AsRef<str>,
    Y: AsRef<str>,
{
    let base_path = base_path.as_ref();
    let mut analysis_data = AnalysisData::new();
    let mut yaml_data = QuestionnaireData::new();

    log::info!(
        "Loading {} yaml files and {} analysis files.",
        yaml_data_files.len(),
        analysis_data_files.len()
    );

    for (i, sample_id) in sample_ids.iter().enumerate() {
        let sample_id = sample_id.as_ref();
        log::info!(
            "Loading analysis and yaml files {}/{}: {}",
            i + 1,
            sample_ids.len(),
            sample_id
        );

        let mut analyses = BTreeMap::new();
        for file_name in analysis_data_files {
            let file_name = file_name.as_ref();
            let path = analysis_path(base_path, sample_id, file_name);
            let events = read_or_skip(path, sample_id, file_name, read_event_file)?;
            analyses.insert(file_name.to_string(), events);
        }

        let mut documents = BTreeMap::new();
        for file_name in yaml_data_files {
            let file_name = file_name.as_ref();
            let path = yaml_path(base_path, sample_id, file_name);
            let document = read_or_skip(path, sample_id, file_name, read_questionnaire)?;
            documents.insert(file_name.to_string(), document);
        }

        analysis_data.insert(sample_id.to_string(), analyses);
        yaml_data.insert(sample_id.to_string(), documents);
    }

    Ok((analysis_data, yaml_data))
}

/// Runs `read`, turning only [`PsgError::FileNotFound`] into `Ok(None)`.
fn read_or_skip<T>(
    path: PathBuf,
    sample_id: &str,
    file_name: &str,
    read: impl FnOnce(PathBuf) -> Result<T, PsgError>,
) -> Result<Option<T>, PsgError> {
    match read(path) {
        Ok(value) => Ok(Some(value)),
        Err(PsgError::FileNotFound(_)) => {
            log::warn!(
                "File {} from sample {} not found. Leaving it empty.",
                file_name,
                sample_id
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
