mod events;
mod normalize;
mod questionnaire;
mod reader;
pub mod dataset;
pub mod loader;
pub mod types;

use std::path::Path;

// Re-export types
pub use dataset::{list_sample_ids, DatasetMetadata};
pub use events::read_event_file;
pub use loader::{
    load_analysis_and_yaml_files, load_signals, AnalysisData, QuestionnaireData, SignalData,
    ANALYSIS_DATA_FILES, YAML_DATA_FILES,
};
pub use normalize::{normalize_channels, normalize_record};
pub use questionnaire::read_questionnaire;
pub use reader::read_record;
pub use types::*;

/// Loads a WFDB record and returns its channels sorted by name
///
/// # Examples
///
/// ```no_run
/// use psg_importer::load_record;
///
/// let result = load_record("data/S1/PSG/S1");
/// match result {
///     Ok(record) => println!("Sample rate: {} Hz", record.sampling_frequency),
///     Err(e) => println!("Error loading record: {}", e),
/// }
/// ```
pub fn load_record<P: AsRef<Path>>(record_path: P) -> Result<SignalRecord, PsgError> {
    let record = reader::read_record(record_path)?;
    normalize::normalize_record(&record)
}
