use ndarray::{Array2, Axis};

use crate::types::{PsgError, SignalRecord, WfdbRecord};

/// Builds the canonical [`SignalRecord`] from channels in on-disk order.
///
/// Computes the permutation that sorts `names` lexicographically (byte-wise,
/// case-sensitive) and applies it to the names, the units and the rows of
/// `signals`. Row contents are not touched. The sort is stable, so duplicate
/// names keep their relative on-disk order.
///
/// # Arguments
///
/// * `names` - Channel names; `names[i]` labels row `i` of `signals`
/// * `units` - Channel units, aligned with `names` (may be empty)
/// * `signals` - Samples with shape [num_channels, num_samples]
pub fn normalize_channels(
    record_name: &str,
    sampling_frequency: f64,
    names: &[String],
    units: &[String],
    signals: &Array2<f64>,
) -> Result<SignalRecord, PsgError> {
    let rows = signals.shape()[0];
    if names.len() != rows {
        return Err(PsgError::ChannelMismatch {
            names: names.len(),
            rows,
        });
    }

    let order = sort_permutation(names);

    let channel_names: Vec<String> = order.iter().map(|&i| names[i].clone()).collect();
    let channel_units: Vec<String> = if units.len() == names.len() {
        order.iter().map(|&i| units[i].clone()).collect()
    } else {
        vec![String::new(); names.len()]
    };

    if let Some(duplicate) = channel_names.windows(2).find(|w| w[0] == w[1]) {
        log::warn!(
            "Record {} has duplicate channel name '{}'; lookups return the last row",
            record_name,
            duplicate[0]
        );
    }

    Ok(SignalRecord {
        record_name: record_name.to_string(),
        sampling_frequency,
        channel_names,
        channel_units,
        data: signals.select(Axis(0), &order),
    })
}

/// Normalizes a record read by the channel reader.
pub fn normalize_record(record: &WfdbRecord) -> Result<SignalRecord, PsgError> {
    normalize_channels(
        &record.header.record_name,
        record.header.sampling_frequency,
        &record.channel_names(),
        &record.channel_units(),
        &record.p_signal,
    )
}

/// Indices that sort `names`, like an argsort.
fn sort_permutation(names: &[String]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..names.len()).collect();
    order.sort_by(|&a, &b| names[a].as_bytes().cmp(names[b].as_bytes()));
    order
}
