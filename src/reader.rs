use byteorder::{BigEndian, ByteOrder, LittleEndian};
use ndarray::Array2;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use crate::types::*;

// WFDB header defaults
const DEFAULT_SAMPLING_FREQUENCY: f64 = 250.0;
const DEFAULT_ADC_GAIN: f64 = 200.0;
const DEFAULT_UNITS: &str = "mV";
const READ_BUFFER_CAPACITY: usize = 65536;

/// Storage formats this reader decodes.
const SUPPORTED_FORMATS: [u16; 8] = [8, 16, 24, 32, 61, 80, 160, 212];

/// Reads a WFDB record and converts it to physical units.
///
/// `record_path` is the record path without extension: the header is read
/// from `<record_path>.hea` and signal files are resolved relative to the
/// header's directory.
///
/// # Errors
///
/// Returns [`PsgError::FileNotFound`] when the header is missing and fails on
/// malformed headers, unsupported formats and truncated signal files. Nothing
/// is recovered here.
pub fn read_record<P: AsRef<Path>>(record_path: P) -> Result<WfdbRecord, PsgError> {
    let tic = Instant::now();

    let header_path = header_path_for(record_path.as_ref());
    let file = File::open(&header_path).map_err(|e| PsgError::from_open(e, &header_path))?;
    let mut text = Vec::new();
    BufReader::new(file).read_to_end(&mut text)?;

    let (header, signals) = parse_header(&String::from_utf8_lossy(&text), &header_path)?;

    log::debug!(
        "Reading WFDB record {}: {} signals at {} Hz",
        header.record_name,
        header.num_signals,
        header.sampling_frequency
    );

    let directory = header_path.parent().unwrap_or_else(|| Path::new("."));
    let d_signal = read_digital_signals(directory, &header, &signals)?;

    if header.num_samples.is_some() {
        verify_checksums(&header, &signals, &d_signal);
    }

    let p_signal = digital_to_physical(&d_signal, &signals);

    log::debug!(
        "Done! Read {} in {:.2} seconds",
        header.record_name,
        tic.elapsed().as_secs_f64()
    );

    Ok(WfdbRecord {
        header,
        signals,
        p_signal,
    })
}

/// Appends `.hea` to the record path. Record names may contain dots, so the
/// extension is appended rather than replaced.
fn header_path_for(record_path: &Path) -> PathBuf {
    let mut name = OsString::from(record_path.as_os_str());
    name.push(".hea");
    PathBuf::from(name)
}

/// Parses the text of a header file into the record line and signal lines.
pub(crate) fn parse_header(
    text: &str,
    path: &Path,
) -> Result<(RecordHeader, Vec<SignalSpec>), PsgError> {
    let mut comments = Vec::new();
    let mut content_lines = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('#') {
            comments.push(comment.trim().to_string());
        } else {
            content_lines.push(line);
        }
    }

    let record_line = content_lines
        .first()
        .ok_or_else(|| header_error(path, "no record line"))?;
    let mut header = parse_record_line(record_line, path)?;

    let signal_lines = &content_lines[1..];
    if signal_lines.len() < header.num_signals {
        return Err(header_error(
            path,
            format!(
                "record declares {} signals but only {} signal lines follow",
                header.num_signals,
                signal_lines.len()
            ),
        ));
    }

    let signals = signal_lines[..header.num_signals]
        .iter()
        .enumerate()
        .map(|(i, line)| parse_signal_line(line, i, &header.record_name, path))
        .collect::<Result<Vec<_>, _>>()?;

    header.comments = comments;
    Ok((header, signals))
}

/// Helper function to parse the record line
fn parse_record_line(line: &str, path: &Path) -> Result<RecordHeader, PsgError> {
    let mut fields = line.split_whitespace();

    let name_field = fields
        .next()
        .ok_or_else(|| header_error(path, "empty record line"))?;
    if name_field.contains('/') {
        return Err(PsgError::Unsupported(format!(
            "multi-segment record {}",
            name_field
        )));
    }

    let num_signals = match fields.next() {
        Some(field) => field
            .parse::<usize>()
            .map_err(|_| header_error(path, format!("invalid signal count '{}'", field)))?,
        None => 0,
    };

    let mut header = RecordHeader {
        record_name: name_field.to_string(),
        num_signals,
        sampling_frequency: DEFAULT_SAMPLING_FREQUENCY,
        counter_frequency: None,
        base_counter: None,
        num_samples: None,
        base_time: None,
        base_date: None,
        comments: Vec::new(),
    };

    if let Some(field) = fields.next() {
        read_frequency_field(field, path, &mut header)?;
    }

    if let Some(field) = fields.next() {
        header.num_samples = Some(
            field
                .parse::<usize>()
                .map_err(|_| header_error(path, format!("invalid sample count '{}'", field)))?,
        );
    }

    header.base_time = fields.next().map(str::to_string);
    header.base_date = fields.next().map(str::to_string);

    Ok(header)
}

/// Helper function to read `fs[/counter_frequency[(base_counter)]]`
fn read_frequency_field(
    field: &str,
    path: &Path,
    header: &mut RecordHeader,
) -> Result<(), PsgError> {
    let invalid = || header_error(path, format!("invalid sampling frequency '{}'", field));

    let (fs, counter) = match field.split_once('/') {
        Some((fs, counter)) => (fs, Some(counter)),
        None => (field, None),
    };
    header.sampling_frequency = fs.parse::<f64>().map_err(|_| invalid())?;

    if let Some(counter) = counter {
        let (frequency, base) = match counter.split_once('(') {
            Some((frequency, base)) => (frequency, Some(base.trim_end_matches(')'))),
            None => (counter, None),
        };
        header.counter_frequency = Some(frequency.parse::<f64>().map_err(|_| invalid())?);
        header.base_counter = base
            .map(|b| b.parse::<f64>().map_err(|_| invalid()))
            .transpose()?;
    }

    Ok(())
}

/// Helper function to parse one signal line
fn parse_signal_line(
    line: &str,
    index: usize,
    record_name: &str,
    path: &Path,
) -> Result<SignalSpec, PsgError> {
    let (fields, description) = split_fields(line, 8);
    let field = |i: usize| fields.get(i).copied();

    let file_name = field(0)
        .ok_or_else(|| header_error(path, format!("empty signal line {}", index)))?;
    let format_field = field(1)
        .ok_or_else(|| header_error(path, format!("signal {} has no format", index)))?;
    let (format, samples_per_frame, skew, byte_offset) = parse_format_field(format_field)
        .ok_or_else(|| {
            header_error(
                path,
                format!("invalid format field '{}' for signal {}", format_field, index),
            )
        })?;

    let (adc_gain, baseline, units) = match field(2) {
        Some(gain_field) => parse_gain_field(gain_field).ok_or_else(|| {
            header_error(
                path,
                format!("invalid gain field '{}' for signal {}", gain_field, index),
            )
        })?,
        None => (0.0, None, None),
    };

    let adc_resolution = parse_field::<u32>(field(3), "ADC resolution", index, path)?
        .filter(|&r| r > 0)
        .unwrap_or_else(|| default_resolution(format));
    let adc_zero = parse_field::<i32>(field(4), "ADC zero", index, path)?.unwrap_or(0);
    let initial_value =
        parse_field::<i32>(field(5), "initial value", index, path)?.unwrap_or(adc_zero);
    let checksum = parse_field::<i32>(field(6), "checksum", index, path)?;
    let block_size = parse_field::<usize>(field(7), "block size", index, path)?.unwrap_or(0);

    Ok(SignalSpec {
        file_name: file_name.to_string(),
        format,
        samples_per_frame,
        skew,
        byte_offset,
        adc_gain: if adc_gain == 0.0 { DEFAULT_ADC_GAIN } else { adc_gain },
        baseline: baseline.unwrap_or(adc_zero),
        units: units.unwrap_or_else(|| DEFAULT_UNITS.to_string()),
        adc_resolution,
        adc_zero,
        initial_value,
        checksum,
        block_size,
        description: description
            .map(str::to_string)
            .unwrap_or_else(|| format!("record {}, signal {}", record_name, index)),
    })
}

/// Helper function to parse an optional integer field of a signal line
fn parse_field<T: FromStr>(
    value: Option<&str>,
    name: &str,
    index: usize,
    path: &Path,
) -> Result<Option<T>, PsgError> {
    value
        .map(|v| {
            v.parse::<T>().map_err(|_| {
                header_error(
                    path,
                    format!("invalid {} '{}' for signal {}", name, v, index),
                )
            })
        })
        .transpose()
}

/// Splits off up to `count` whitespace-separated fields and returns the rest of
/// the line (trimmed, if non-empty) as a free-text tail.
fn split_fields(line: &str, count: usize) -> (Vec<&str>, Option<&str>) {
    let mut fields = Vec::with_capacity(count);
    let mut rest = line.trim_start();

    while fields.len() < count && !rest.is_empty() {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        fields.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }

    let rest = rest.trim_end();
    (fields, (!rest.is_empty()).then_some(rest))
}

/// Parses `format[xsamples_per_frame][:skew][+byte_offset]`.
fn parse_format_field(field: &str) -> Option<(u16, usize, i64, u64)> {
    let (format, mut rest) = split_leading_digits(field);
    let format = format.parse::<u16>().ok()?;
    let mut samples_per_frame = 1;
    let mut skew = 0;
    let mut byte_offset = 0;

    while let Some(marker) = rest.chars().next() {
        let (value, tail) = split_leading_digits(&rest[marker.len_utf8()..]);
        match marker {
            'x' => samples_per_frame = value.parse().ok()?,
            ':' => skew = value.parse().ok()?,
            '+' => byte_offset = value.parse().ok()?,
            _ => return None,
        }
        rest = tail;
    }

    Some((format, samples_per_frame, skew, byte_offset))
}

/// Parses `gain[(baseline)][/units]`.
fn parse_gain_field(field: &str) -> Option<(f64, Option<i32>, Option<String>)> {
    let (gain_part, units) = match field.split_once('/') {
        Some((gain, units)) => (gain, Some(units.to_string())),
        None => (field, None),
    };

    let (gain, baseline) = match gain_part.split_once('(') {
        Some((gain, baseline)) => {
            let baseline = baseline.strip_suffix(')')?.parse::<i32>().ok()?;
            (gain, Some(baseline))
        }
        None => (gain_part, None),
    };

    Some((gain.parse::<f64>().ok()?, baseline, units))
}

fn split_leading_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn default_resolution(format: u16) -> u32 {
    match format {
        8 | 80 => 8,
        212 => 12,
        24 => 24,
        32 => 32,
        _ => 16,
    }
}

/// Digital value WFDB reserves for "no sample" in each format.
fn invalid_sample_value(format: u16) -> i32 {
    match format {
        8 | 80 => -128,
        212 => -2048,
        24 => -8_388_608,
        32 => i32::MIN,
        _ => -32768,
    }
}

fn header_error(path: &Path, message: impl Into<String>) -> PsgError {
    PsgError::Header {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

/// Reads all signal files of the record into a digital sample matrix.
///
/// Signals stored in the same file are interleaved frame by frame, in the
/// order their lines appear in the header.
fn read_digital_signals(
    directory: &Path,
    header: &RecordHeader,
    signals: &[SignalSpec],
) -> Result<Array2<i32>, PsgError> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    for (i, signal) in signals.iter().enumerate() {
        if signal.samples_per_frame != 1 {
            return Err(PsgError::Unsupported(format!(
                "signal '{}' has {} samples per frame",
                signal.description, signal.samples_per_frame
            )));
        }
        if signal.skew != 0 {
            return Err(PsgError::Unsupported(format!(
                "signal '{}' has skew {}",
                signal.description, signal.skew
            )));
        }
        match groups.iter_mut().find(|(name, _)| *name == signal.file_name) {
            Some((_, members)) => members.push(i),
            None => groups.push((signal.file_name.clone(), vec![i])),
        }
    }

    let mut streams = Vec::with_capacity(groups.len());
    for (file_name, members) in &groups {
        let stream = read_signal_file(directory, file_name, members, signals)?;
        streams.push(stream);
    }

    let frames = |stream: &Vec<i32>, members: &Vec<usize>| stream.len() / members.len();
    let num_samples = match header.num_samples {
        Some(n) => n,
        None => groups
            .iter()
            .zip(&streams)
            .map(|((_, members), stream)| frames(stream, members))
            .min()
            .unwrap_or(0),
    };

    // Check every file before allocating: the header count may be corrupt
    for ((file_name, members), stream) in groups.iter().zip(&streams) {
        let available = frames(stream, members);
        if available < num_samples {
            return Err(PsgError::Truncated {
                path: directory.join(file_name),
                expected: num_samples,
                found: available,
            });
        }
    }

    let mut d_signal = Array2::<i32>::zeros((signals.len(), num_samples));
    for ((_, members), stream) in groups.iter().zip(&streams) {
        let width = members.len();
        for (k, &signal_index) in members.iter().enumerate() {
            for t in 0..num_samples {
                d_signal[[signal_index, t]] = stream[t * width + k];
            }
        }
    }

    Ok(d_signal)
}

/// Helper function to read and decode one signal file
fn read_signal_file(
    directory: &Path,
    file_name: &str,
    members: &[usize],
    signals: &[SignalSpec],
) -> Result<Vec<i32>, PsgError> {
    let first = &signals[members[0]];
    if file_name == "-" {
        return Err(PsgError::Unsupported(
            "signals read from standard input".to_string(),
        ));
    }
    if !SUPPORTED_FORMATS.contains(&first.format) {
        return Err(PsgError::Unsupported(format!(
            "signal format {} in {}",
            first.format, file_name
        )));
    }
    if let Some(other) = members.iter().find(|&&i| signals[i].format != first.format) {
        return Err(PsgError::Unsupported(format!(
            "mixed formats {} and {} in {}",
            first.format, signals[*other].format, file_name
        )));
    }

    let path = directory.join(file_name);
    let file = File::open(&path).map_err(|e| PsgError::from_open(e, &path))?;
    let mut reader = BufReader::with_capacity(READ_BUFFER_CAPACITY, file);
    reader.seek(SeekFrom::Start(first.byte_offset))?;

    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let initial_values: Vec<i32> = members.iter().map(|&i| signals[i].initial_value).collect();
    Ok(decode_samples(first.format, &bytes, &initial_values))
}

/// Decodes a byte stream into digital samples in stream order.
///
/// `initial_values` holds one entry per interleaved signal and is only used
/// by the first-difference format 8.
pub(crate) fn decode_samples(format: u16, bytes: &[u8], initial_values: &[i32]) -> Vec<i32> {
    match format {
        8 => {
            let width = initial_values.len().max(1);
            let mut current: Vec<i32> = initial_values.to_vec();
            current.resize(width, 0);
            bytes
                .iter()
                .enumerate()
                .map(|(k, &b)| {
                    let slot = &mut current[k % width];
                    *slot = slot.wrapping_add(b as i8 as i32);
                    *slot
                })
                .collect()
        }
        16 => bytes
            .chunks_exact(2)
            .map(|c| LittleEndian::read_i16(c) as i32)
            .collect(),
        61 => bytes
            .chunks_exact(2)
            .map(|c| BigEndian::read_i16(c) as i32)
            .collect(),
        80 => bytes.iter().map(|&b| b as i32 - 128).collect(),
        160 => bytes
            .chunks_exact(2)
            .map(|c| LittleEndian::read_u16(c) as i32 - 32768)
            .collect(),
        212 => decode_format_212(bytes),
        24 => bytes
            .chunks_exact(3)
            .map(|c| LittleEndian::read_i24(c))
            .collect(),
        32 => bytes
            .chunks_exact(4)
            .map(|c| LittleEndian::read_i32(c))
            .collect(),
        _ => Vec::new(),
    }
}

/// Format 212 packs two 12-bit samples into three bytes.
fn decode_format_212(bytes: &[u8]) -> Vec<i32> {
    let mut samples = Vec::with_capacity(bytes.len() * 2 / 3 + 1);
    let mut chunks = bytes.chunks_exact(3);

    for c in &mut chunks {
        let first = c[0] as i32 | ((c[1] as i32 & 0x0f) << 8);
        let second = c[2] as i32 | ((c[1] as i32 & 0xf0) << 4);
        samples.push(sign_extend_12(first));
        samples.push(sign_extend_12(second));
    }

    // An odd sample count leaves a two-byte tail holding one sample
    if let [b0, b1] = chunks.remainder() {
        samples.push(sign_extend_12(*b0 as i32 | ((*b1 as i32 & 0x0f) << 8)));
    }

    samples
}

fn sign_extend_12(value: i32) -> i32 {
    if value > 2047 {
        value - 4096
    } else {
        value
    }
}

/// Compares declared checksums with the samples read; mismatches are logged.
fn verify_checksums(header: &RecordHeader, signals: &[SignalSpec], d_signal: &Array2<i32>) {
    for (signal, row) in signals.iter().zip(d_signal.rows()) {
        let Some(declared) = signal.checksum else {
            continue;
        };
        let sum: i64 = row.iter().map(|&v| v as i64).sum();
        if to_checksum(sum) != to_checksum(declared as i64) {
            log::warn!(
                "Checksum mismatch in record {}, signal '{}': header {}, data {}",
                header.record_name,
                signal.description,
                to_checksum(declared as i64),
                to_checksum(sum)
            );
        }
    }
}

/// Reduces a sum to the 16-bit signed value WFDB stores.
fn to_checksum(value: i64) -> i16 {
    (value & 0xffff) as u16 as i16
}

/// Converts digital samples to physical units: `(d - baseline) / gain`.
/// Invalid-sample sentinels become NaN.
fn digital_to_physical(d_signal: &Array2<i32>, signals: &[SignalSpec]) -> Array2<f64> {
    let mut p_signal = Array2::<f64>::zeros(d_signal.raw_dim());

    for ((signal, d_row), mut p_row) in signals
        .iter()
        .zip(d_signal.rows())
        .zip(p_signal.rows_mut())
    {
        let invalid = invalid_sample_value(signal.format);
        for (p, &d) in p_row.iter_mut().zip(d_row.iter()) {
            *p = if d == invalid {
                f64::NAN
            } else {
                (d as f64 - signal.baseline as f64) / signal.adc_gain
            };
        }
    }

    p_signal
}
