use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::PsgError;

/// Default name of the dataset descriptor.
pub const DEFAULT_METADATA_FILE: &str = "croissant.json";

/// The parts of a Croissant JSON-LD dataset descriptor this importer reads.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetMetadata {
    /// Dataset name
    #[serde(default)]
    pub name: Option<String>,
    /// Free-text description
    #[serde(default)]
    pub description: Option<String>,
    /// Location of the data directory
    pub url: String,
    /// Directory containing the descriptor; relative URLs resolve against it
    #[serde(skip)]
    pub location: PathBuf,
}

impl DatasetMetadata {
    /// Loads a descriptor from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PsgError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| PsgError::from_open(e, path))?;
        let mut metadata: DatasetMetadata = serde_json::from_str(&text)?;

        if metadata.url.trim().is_empty() {
            return Err(PsgError::Metadata(format!(
                "{} has an empty url",
                path.display()
            )));
        }

        metadata.location = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(metadata)
    }

    /// Resolves the data directory, relative to the descriptor's location.
    pub fn resolve_base_path(&self) -> PathBuf {
        let url = self.url.strip_prefix("file://").unwrap_or(&self.url);
        self.location.join(url)
    }
}

/// Lists the sample IDs under `base_path`: the names of its sub-directories,
/// sorted, hidden entries skipped.
pub fn list_sample_ids<P: AsRef<Path>>(base_path: P) -> Result<Vec<String>, PsgError> {
    let base_path = base_path.as_ref();
    let entries = fs::read_dir(base_path).map_err(|e| PsgError::from_open(e, base_path))?;

    let mut sample_ids = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with('.') {
            sample_ids.push(name);
        }
    }

    sample_ids.sort();
    Ok(sample_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolves_relative_url_against_descriptor_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_METADATA_FILE);
        fs::write(
            &path,
            r#"{"@context": {"@vocab": "https://schema.org/"}, "@type": "sc:Dataset", "name": "PSG", "url": "data"}"#,
        )
        .unwrap();

        let metadata = DatasetMetadata::from_path(&path).unwrap();
        assert_eq!(metadata.name.as_deref(), Some("PSG"));
        assert_eq!(metadata.resolve_base_path(), dir.path().join("data"));
    }

    #[test]
    fn absolute_url_is_kept() {
        let metadata = DatasetMetadata {
            name: None,
            description: None,
            url: "file:///srv/psg".to_string(),
            location: PathBuf::from("/home/user"),
        };
        assert_eq!(metadata.resolve_base_path(), PathBuf::from("/srv/psg"));
    }

    #[test]
    fn missing_url_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_METADATA_FILE);
        fs::write(&path, r#"{"name": "PSG"}"#).unwrap();

        assert!(matches!(
            DatasetMetadata::from_path(&path),
            Err(PsgError::Json(_))
        ));
    }

    #[test]
    fn lists_only_visible_directories_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["S2", "S1", ".cache"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("README.txt"), "").unwrap();

        assert_eq!(
            list_sample_ids(dir.path()).unwrap(),
            vec!["S1".to_string(), "S2".to_string()]
        );
    }
}
