mod common;

use common::write_record;
use pretty_assertions::assert_eq;
use psg_importer::{load_record, load_signals, read_record, PsgError};
use std::fs;

#[test]
fn channels_are_sorted_by_name_with_their_rows() {
    let dir = tempfile::tempdir().unwrap();
    write_record(
        dir.path(),
        "S1",
        256,
        &[("C3", &[1, 2]), ("A1", &[3, 4]), ("B2", &[5, 6])],
    );

    let signals = load_signals(dir.path(), &["S1"]).unwrap();
    let record = &signals["S1"];

    let keys: Vec<&str> = record.iter().map(|(name, _)| name).collect();
    assert_eq!(keys, vec!["A1", "B2", "C3"]);
    assert_eq!(record.channel("A1").unwrap().to_vec(), vec![3.0, 4.0]);
    assert_eq!(record.channel("B2").unwrap().to_vec(), vec![5.0, 6.0]);
    assert_eq!(record.channel("C3").unwrap().to_vec(), vec![1.0, 2.0]);
    assert_eq!(record.units("C3"), Some("uV"));
    assert_eq!(record.sampling_frequency, 256.0);
}

#[test]
fn physical_channel_order_does_not_matter() {
    let dir = tempfile::tempdir().unwrap();
    write_record(dir.path(), "S1", 128, &[("EMG", &[7, 8, 9]), ("ECG", &[1, 2, 3])]);
    write_record(dir.path(), "S2", 128, &[("ECG", &[1, 2, 3]), ("EMG", &[7, 8, 9])]);

    let signals = load_signals(dir.path(), &["S1", "S2"]).unwrap();
    assert_eq!(signals["S1"].channel_names, signals["S2"].channel_names);
    assert_eq!(signals["S1"].data, signals["S2"].data);
}

#[test]
fn loading_twice_is_identical() {
    let dir = tempfile::tempdir().unwrap();
    write_record(dir.path(), "S1", 100, &[("Pleth", &[5, -5]), ("Flow", &[0, 1])]);

    let path = dir.path().join("S1").join("PSG").join("S1");
    assert_eq!(load_record(&path).unwrap(), load_record(&path).unwrap());
}

#[test]
fn reads_signals_from_separate_files() {
    let dir = tempfile::tempdir().unwrap();
    let psg = dir.path().join("S1").join("PSG");
    fs::create_dir_all(&psg).unwrap();
    fs::write(
        psg.join("S1.hea"),
        "S1 2 200 2\nS1_a.dat 212 10(0)/mV 12 0 0 0 0 SpO2\nS1_b.dat 80 2(0)/% 8 0 0 0 0 Flow\n",
    )
    .unwrap();
    // 212: samples 100 and -1
    fs::write(psg.join("S1_a.dat"), [100u8, 0xf0, 0xff]).unwrap();
    // 80: samples 4 and -128 (invalid)
    fs::write(psg.join("S1_b.dat"), [132u8, 0]).unwrap();

    let record = read_record(psg.join("S1")).unwrap();
    assert_eq!(record.channel_names(), vec!["SpO2", "Flow"]);
    assert_eq!(record.p_signal[[0, 0]], 10.0);
    assert_eq!(record.p_signal[[0, 1]], -0.1);
    assert_eq!(record.p_signal[[1, 0]], 2.0);
    assert!(record.p_signal[[1, 1]].is_nan());
}

#[test]
fn sample_count_comes_from_file_length_when_not_declared() {
    let dir = tempfile::tempdir().unwrap();
    let psg = dir.path().join("S1").join("PSG");
    fs::create_dir_all(&psg).unwrap();
    fs::write(psg.join("S1.hea"), "S1 1 50\nS1.dat 16 1 16 0 0 0 0 Snore\n").unwrap();
    fs::write(psg.join("S1.dat"), [1u8, 0, 2, 0, 3, 0]).unwrap();

    let record = load_record(psg.join("S1")).unwrap();
    assert_eq!(record.num_samples(), 3);
    assert_eq!(record.duration(), 0.06);
}

#[test]
fn truncated_record_aborts_the_load() {
    let dir = tempfile::tempdir().unwrap();
    write_record(dir.path(), "S1", 256, &[("C3", &[1, 2, 3, 4])]);
    write_record(dir.path(), "S2", 256, &[("C3", &[1, 2, 3, 4])]);
    let dat = dir.path().join("S1").join("PSG").join("S1.dat");
    fs::write(&dat, [1u8, 0]).unwrap();

    let err = load_signals(dir.path(), &["S1", "S2"]).unwrap_err();
    assert!(matches!(
        err,
        PsgError::Truncated {
            expected: 4,
            found: 1,
            ..
        }
    ));
}

#[test]
fn corrupt_header_aborts_the_load() {
    let dir = tempfile::tempdir().unwrap();
    let psg = dir.path().join("S1").join("PSG");
    fs::create_dir_all(&psg).unwrap();
    fs::write(psg.join("S1.hea"), "S1 two 256\n").unwrap();

    let err = load_signals(dir.path(), &["S1"]).unwrap_err();
    assert!(matches!(err, PsgError::Header { .. }));
}

#[test]
fn missing_record_is_not_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_signals(dir.path(), &["S9"]).unwrap_err();
    assert!(matches!(err, PsgError::FileNotFound(_)));
}

#[test]
fn unsupported_format_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let psg = dir.path().join("S1").join("PSG");
    fs::create_dir_all(&psg).unwrap();
    fs::write(psg.join("S1.hea"), "S1 1 256 1\nS1.dat 310 1 16 0 0 0 0 EEG\n").unwrap();
    fs::write(psg.join("S1.dat"), [0u8; 4]).unwrap();

    assert!(matches!(
        load_record(psg.join("S1")),
        Err(PsgError::Unsupported(_))
    ));
}

#[test]
fn oversized_sample_count_is_reported_as_truncation() {
    let dir = tempfile::tempdir().unwrap();
    let psg = dir.path().join("S1").join("PSG");
    fs::create_dir_all(&psg).unwrap();
    fs::write(psg.join("S1.dat"), [1u8, 0, 2, 0]).unwrap();

    for declared in ["1099511627776", "18446744073709551615"] {
        fs::write(
            psg.join("S1.hea"),
            format!("S1 1 256 {}\nS1.dat 16 1 16 0 0 0 0 EEG\n", declared),
        )
        .unwrap();

        let err = load_signals(dir.path(), &["S1"]).unwrap_err();
        assert!(
            matches!(err, PsgError::Truncated { found: 2, .. }),
            "unexpected error for {}: {}",
            declared,
            err
        );
    }
}
