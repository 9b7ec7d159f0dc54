use ndarray::{Array2, ArrayView1, Axis};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Record line of a WFDB header file.
///
/// Describes the record as a whole: its name, how many signals it holds and
/// how fast they were sampled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordHeader {
    /// Record name (normally identical to the sample ID)
    pub record_name: String,
    /// Number of signals declared on the record line
    pub num_signals: usize,
    /// Sampling frequency in Hz (WFDB default: 250)
    pub sampling_frequency: f64,
    /// Counter frequency, if one was declared
    pub counter_frequency: Option<f64>,
    /// Counter value of the first sample
    pub base_counter: Option<f64>,
    /// Number of samples per signal, if declared
    pub num_samples: Option<usize>,
    /// Start time as written in the header (`HH:MM:SS`)
    pub base_time: Option<String>,
    /// Start date as written in the header (`DD/MM/YYYY`)
    pub base_date: Option<String>,
    /// Free-text comment lines (without the leading `#`)
    pub comments: Vec<String>,
}

/// One signal line of a WFDB header file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalSpec {
    /// Name of the signal file, relative to the header's directory
    pub file_name: String,
    /// Storage format code (8, 16, 61, 80, 160, 212, 24 or 32)
    pub format: u16,
    /// Samples per frame
    pub samples_per_frame: usize,
    /// Skew in frames
    pub skew: i64,
    /// Byte offset of the first sample in the signal file
    pub byte_offset: u64,
    /// ADC units per physical unit
    pub adc_gain: f64,
    /// Digital value corresponding to 0 physical units
    pub baseline: i32,
    /// Physical units (e.g. "mV", "uV", "%")
    pub units: String,
    /// ADC resolution in bits
    pub adc_resolution: u32,
    /// ADC zero value
    pub adc_zero: i32,
    /// Value of the first sample
    pub initial_value: i32,
    /// 16-bit checksum of all samples, if declared
    pub checksum: Option<i32>,
    /// Block size (0 for ordinary files)
    pub block_size: usize,
    /// Signal description, used as the channel name
    pub description: String,
}

/// A WFDB record as stored on disk, in physical units.
///
/// Channels keep the order of the signal lines in the header file.
#[derive(Debug, Clone)]
pub struct WfdbRecord {
    /// Record line
    pub header: RecordHeader,
    /// Signal lines, in header order
    pub signals: Vec<SignalSpec>,
    /// Physical samples
    /// - Shape: [num_channels, num_samples]
    pub p_signal: Array2<f64>,
}

impl WfdbRecord {
    /// Channel names in header order.
    pub fn channel_names(&self) -> Vec<String> {
        self.signals.iter().map(|s| s.description.clone()).collect()
    }

    /// Channel units in header order.
    pub fn channel_units(&self) -> Vec<String> {
        self.signals.iter().map(|s| s.units.clone()).collect()
    }

    /// Number of samples per channel.
    pub fn num_samples(&self) -> usize {
        self.p_signal.shape()[1]
    }
}

/// Canonical signal data for one sample: every channel keyed by name, in
/// lexicographic name order.
///
/// The original channel order of the recording is discarded; two recordings
/// holding the same channels in different physical orders yield identical
/// records.
///
/// # Examples
///
/// ```no_run
/// use psg_importer::load_record;
///
/// let record = load_record("data/S1/PSG/S1").unwrap();
/// for (name, samples) in record.iter() {
///     println!("{}: {} samples", name, samples.len());
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRecord {
    /// Record name from the header
    pub record_name: String,
    /// Sampling frequency in Hz
    pub sampling_frequency: f64,
    /// Channel names, sorted
    pub channel_names: Vec<String>,
    /// Units of each channel, aligned with `channel_names`
    pub channel_units: Vec<String>,
    /// Channel data; row `i` belongs to `channel_names[i]`
    /// - Shape: [num_channels, num_samples]
    pub data: Array2<f64>,
}

impl SignalRecord {
    /// Returns the samples of the named channel.
    ///
    /// If a name occurs more than once, the last row carrying it wins.
    pub fn channel(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.channel_names
            .iter()
            .rposition(|n| n == name)
            .map(|i| self.data.index_axis(Axis(0), i))
    }

    /// Returns the units of the named channel.
    pub fn units(&self, name: &str) -> Option<&str> {
        self.channel_names
            .iter()
            .rposition(|n| n == name)
            .map(|i| self.channel_units[i].as_str())
    }

    /// Iterates over `(name, samples)` pairs in sorted name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ArrayView1<'_, f64>)> {
        self.channel_names
            .iter()
            .map(String::as_str)
            .zip(self.data.axis_iter(Axis(0)))
    }

    pub fn num_channels(&self) -> usize {
        self.channel_names.len()
    }

    pub fn num_samples(&self) -> usize {
        self.data.shape()[1]
    }

    /// Returns the duration of the recording in seconds.
    ///
    /// Returns 0.0 when the sampling frequency is not positive.
    pub fn duration(&self) -> f64 {
        if self.sampling_frequency > 0.0 {
            self.num_samples() as f64 / self.sampling_frequency
        } else {
            0.0
        }
    }
}

/// One line of an analysis-event file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Start time stamp as written in the file
    pub onset: String,
    /// End time stamp, for `start-end` spans
    pub offset: Option<String>,
    /// Remaining `;`-separated fields, trimmed
    pub values: Vec<String>,
}

/// Parsed analysis-event file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventFile {
    /// `Key: Value` header entries, in file order
    pub header: Vec<(String, String)>,
    /// Events, in file order
    pub events: Vec<Event>,
}

impl EventFile {
    /// Returns the value of the first header entry named `key`.
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.header
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Errors raised while importing a dataset.
///
/// Only [`PsgError::FileNotFound`] is tolerated by the analysis/questionnaire
/// loader; every other variant aborts the run.
#[derive(Debug, Error)]
pub enum PsgError {
    /// An expected input file does not exist
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The WFDB header could not be parsed
    #[error("Invalid header {}: {message}", .path.display())]
    Header { path: PathBuf, message: String },

    /// The record uses a feature this importer does not read
    #[error("Unsupported record feature: {0}")]
    Unsupported(String),

    /// A signal file holds fewer samples than its header declares
    #[error("Signal file {} is truncated: expected {expected} samples, found {found}", .path.display())]
    Truncated {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    /// Channel names and signal rows disagree in number
    #[error("Channel mismatch: {names} names for {rows} signal rows")]
    ChannelMismatch { names: usize, rows: usize },

    /// A text file exists but its content cannot be parsed
    #[error("Malformed file {} at line {line}: {message}", .path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Invalid YAML content
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid JSON content
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid dataset metadata
    #[error("Invalid dataset metadata: {0}")]
    Metadata(String),

    /// An I/O error occurred during file reading
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl PsgError {
    /// Maps an I/O error from opening `path`, turning "not found" into
    /// [`PsgError::FileNotFound`].
    pub(crate) fn from_open(error: io::Error, path: impl Into<PathBuf>) -> Self {
        if error.kind() == io::ErrorKind::NotFound {
            PsgError::FileNotFound(path.into())
        } else {
            PsgError::Io(error)
        }
    }
}
