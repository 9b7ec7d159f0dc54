use std::fs;
use std::path::Path;

use crate::types::{Event, EventFile, PsgError};

/// Reads an analysis-event text file exported by the scoring software.
///
/// The file starts with `Key: Value` header lines (signal ID, start time,
/// unit, rate...) followed by one event per line, fields separated by `;`:
///
/// ```text
/// Signal ID: SchlafProfil\profil
/// Rate: 30 s
///
/// 22:01:30,000; Wake
/// 22:02:00,000-22:02:15,000; 15;Hypopnoe
/// ```
///
/// # Errors
///
/// [`PsgError::FileNotFound`] if the file does not exist, and
/// [`PsgError::Malformed`] for an event line without a `;` separator.
pub fn read_event_file<P: AsRef<Path>>(path: P) -> Result<EventFile, PsgError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| PsgError::from_open(e, path))?;
    parse_event_text(&decode_text(&bytes), path)
}

/// Decodes UTF-8 (BOM stripped), falling back to Latin-1 for
/// Windows-encoded exports.
fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

pub(crate) fn parse_event_text(text: &str, path: &Path) -> Result<EventFile, PsgError> {
    let mut file = EventFile::default();
    let mut in_header = true;

    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            in_header = false;
            continue;
        }

        if in_header {
            if let Some(entry) = parse_header_line(line) {
                file.header.push(entry);
                continue;
            }
            in_header = false;
        }

        file.events.push(parse_event_line(line).ok_or_else(|| PsgError::Malformed {
            path: path.to_path_buf(),
            line: index + 1,
            message: format!("expected ';'-separated event, found '{}'", line),
        })?);
    }

    Ok(file)
}

/// `Key: Value` where the key does not start with a digit (time stamps
/// contain colons too) and holds no `;`.
fn parse_header_line(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() || key.starts_with(|c: char| c.is_ascii_digit()) || key.contains(';') {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

fn parse_event_line(line: &str) -> Option<Event> {
    if !line.contains(';') {
        return None;
    }

    let mut fields = line.split(';').map(str::trim);
    let time = fields.next()?;
    let (onset, offset) = match split_time_span(time) {
        Some((start, end)) => (start.to_string(), Some(end.to_string())),
        None => (time.to_string(), None),
    };

    Some(Event {
        onset,
        offset,
        values: fields.filter(|f| !f.is_empty()).map(str::to_string).collect(),
    })
}

/// Splits `start-end` at the first `-` whose both sides are time stamps, so
/// dashes inside ISO dates (`2022-01-17 22:01`) are left alone.
fn split_time_span(time: &str) -> Option<(&str, &str)> {
    time.match_indices('-').find_map(|(i, _)| {
        let (start, end) = (time[..i].trim(), time[i + 1..].trim());
        (looks_like_time(start) && looks_like_time(end)).then_some((start, end))
    })
}

fn looks_like_time(s: &str) -> bool {
    s.starts_with(|c: char| c.is_ascii_digit()) && s.contains(':')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SLEEP_PROFILE: &str = "Signal ID: SchlafProfil\\profil\r\n\
Start Time: 17.01.2022 22:01:30\r\n\
Unit:\r\n\
Signal Type: Discret\r\n\
Rate: 30 s\r\n\
\r\n\
22:01:30,000; Wake\r\n\
22:02:00,000; N1\r\n";

    #[test]
    fn parses_header_and_events() {
        let file = parse_event_text(SLEEP_PROFILE, Path::new("Schlafprofil.txt")).unwrap();

        assert_eq!(file.header.len(), 5);
        assert_eq!(file.header_value("Rate"), Some("30 s"));
        assert_eq!(file.header_value("Unit"), Some(""));
        assert_eq!(file.header_value("Start Time"), Some("17.01.2022 22:01:30"));
        assert_eq!(
            file.events,
            vec![
                Event {
                    onset: "22:01:30,000".to_string(),
                    offset: None,
                    values: vec!["Wake".to_string()],
                },
                Event {
                    onset: "22:02:00,000".to_string(),
                    offset: None,
                    values: vec!["N1".to_string()],
                },
            ]
        );
    }

    #[test]
    fn splits_event_spans() {
        let file = parse_event_text(
            "22:10:04,500-22:10:19,000; 15;Hypopnoe\n",
            Path::new("Flow Events.txt"),
        )
        .unwrap();

        assert!(file.header.is_empty());
        let event = &file.events[0];
        assert_eq!(event.onset, "22:10:04,500");
        assert_eq!(event.offset.as_deref(), Some("22:10:19,000"));
        assert_eq!(event.values, vec!["15".to_string(), "Hypopnoe".to_string()]);
    }

    #[test]
    fn dashes_inside_dates_do_not_split_the_time() {
        let file = parse_event_text(
            "2022-01-17 22:01:30; Wake\n2022-01-17 22:02:00-2022-01-17 22:02:10; 10;Arousal\n",
            Path::new("Marker.txt"),
        )
        .unwrap();

        assert_eq!(file.events[0].onset, "2022-01-17 22:01:30");
        assert_eq!(file.events[0].offset, None);
        assert_eq!(file.events[1].onset, "2022-01-17 22:02:00");
        assert_eq!(file.events[1].offset.as_deref(), Some("2022-01-17 22:02:10"));
    }

    #[test]
    fn header_only_file_has_no_events() {
        let file = parse_event_text("Signal ID: Marker\n\n", Path::new("Marker.txt")).unwrap();
        assert!(file.is_empty());
    }

    #[test]
    fn event_line_without_separator_is_malformed() {
        let err = parse_event_text("Rate: 1 s\n\n22:00:00,000; 1\ngarbage\n", Path::new("x.txt"))
            .unwrap_err();
        match err {
            PsgError::Malformed { line, .. } => assert_eq!(line, 4),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn decodes_latin1_fallback() {
        assert_eq!(decode_text(b"K\xf6rperlage"), "Körperlage");
        assert_eq!(decode_text("\u{feff}Körperlage".as_bytes()), "Körperlage");
    }
}
