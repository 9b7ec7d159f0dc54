use serde_yaml::Value;
use std::fs;
use std::path::Path;

use crate::types::PsgError;

/// Reads a questionnaire YAML document.
///
/// Returns [`PsgError::FileNotFound`] for a missing file and
/// [`PsgError::Yaml`] when the content is not valid YAML.
pub fn read_questionnaire<P: AsRef<Path>>(path: P) -> Result<Value, PsgError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| PsgError::from_open(e, path))?;
    Ok(serde_yaml::from_str(&text)?)
}
