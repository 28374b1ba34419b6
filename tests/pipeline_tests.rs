use std::fs;
use std::path::PathBuf;

use surface_datagen::{
    run_partition, run_partition_with, GeneratorConfig, HestonPricer, ModelKind, ModelParams,
    RBergomiParams,
};
use tempfile::TempDir;

use test_utils::{
    read_csv, reference_heston_params, write_input_csv, RejectStrike, ScriptedPricer,
    MATURITY_COLUMN, STRIKE_COLUMN,
};

fn config_for(dir: &TempDir, input: PathBuf, part_id: usize, size: usize) -> GeneratorConfig {
    let mut config = GeneratorConfig::heston();
    config.paths.input = input;
    config.paths.output_dir = Some(dir.path().join("out"));
    config.partition.id = part_id;
    config.partition.size = size;
    config.progress_interval = 0;
    config.seed = Some(5);
    config
}

#[test]
fn test_exhausted_row_is_dropped_and_inputs_pass_through() {
    let dir = TempDir::new().unwrap();
    let input = write_input_csv(dir.path(), &[(0.9, 0.25), (1.0, 0.5), (1.1, 1.0)]);
    let config = config_for(&dir, input, 0, 3);

    let summary = run_partition_with(
        &config,
        reference_heston_params,
        RejectStrike {
            strike: 1.0,
            iv: 0.2,
        },
    )
    .unwrap();

    assert_eq!(summary.rows_loaded, 3);
    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.rows_exhausted, 1);
    assert_eq!(summary.rows_missing_input, 0);
    assert_eq!(summary.output_path, dir.path().join("out/labled_data_all_0.csv"));

    let (header, rows) = read_csv(&summary.output_path);
    assert_eq!(
        header,
        vec![
            STRIKE_COLUMN,
            MATURITY_COLUMN,
            "Bucket",
            "lambda",
            "vbar",
            "eta",
            "rho",
            "v0",
            "iv"
        ]
    );
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][..3], &["0.9", "0.25", "b0"]);
    assert_eq!(&rows[1][..3], &["1.1", "1", "b2"]);

    let expected_params: Vec<String> = reference_heston_params()
        .values()
        .iter()
        .map(|v| v.to_string())
        .collect();
    for row in &rows {
        assert_eq!(&row[3..8], expected_params.as_slice());
        let iv: f64 = row[8].parse().unwrap();
        assert_eq!(iv, 0.2);
    }
}

#[test]
fn test_partitions_cover_the_file_without_overlap() {
    let dir = TempDir::new().unwrap();
    let rows: Vec<(f64, f64)> = (0..250).map(|i| (0.8 + i as f64 * 1e-3, 0.5)).collect();
    let input = write_input_csv(dir.path(), &rows);

    let mut buckets = Vec::new();
    for (part_id, expected) in [(0, 100), (1, 100), (2, 50)] {
        let config = config_for(&dir, input.clone(), part_id, 100);
        let summary =
            run_partition_with(&config, reference_heston_params, ScriptedPricer::valid_on(1, 0.3))
                .unwrap();
        assert_eq!(summary.range, part_id * 100..(part_id + 1) * 100);
        assert_eq!(summary.rows_loaded, expected);
        assert_eq!(summary.rows_written, expected);

        let (_, written) = read_csv(&summary.output_path);
        buckets.extend(written.into_iter().map(|row| row[2].clone()));
    }

    let expected: Vec<String> = (0..250).map(|i| format!("b{}", i)).collect();
    assert_eq!(buckets, expected);
}

#[test]
fn test_partition_past_end_writes_header_only() {
    let dir = TempDir::new().unwrap();
    let input = write_input_csv(dir.path(), &[(1.0, 0.5), (1.1, 0.5)]);
    let config = config_for(&dir, input, 4, 10);

    let summary =
        run_partition_with(&config, reference_heston_params, ScriptedPricer::valid_on(1, 0.3))
            .unwrap();

    assert_eq!(summary.rows_loaded, 0);
    assert_eq!(summary.rows_written, 0);
    let (header, rows) = read_csv(&summary.output_path);
    assert_eq!(header.last().map(String::as_str), Some("iv"));
    assert!(rows.is_empty());
}

#[test]
fn test_rows_with_missing_values_are_skipped() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("strike_maturity.csv");
    fs::write(
        &input,
        format!(
            ",{},{}\n0,1.0,0.5\n1,,0.5\n2,1.1,NaN\n3,0.9,0.25\n",
            STRIKE_COLUMN, MATURITY_COLUMN
        ),
    )
    .unwrap();
    let config = config_for(&dir, input, 0, 10);

    let summary =
        run_partition_with(&config, reference_heston_params, ScriptedPricer::valid_on(1, 0.3))
            .unwrap();

    assert_eq!(summary.rows_loaded, 4);
    assert_eq!(summary.rows_missing_input, 2);
    assert_eq!(summary.rows_written, 2);
    let (_, rows) = read_csv(&summary.output_path);
    assert_eq!(rows[0][0], "1.0");
    assert_eq!(rows[1][0], "0.9");
}

#[test]
fn test_missing_column_is_an_error() {
    let dir = TempDir::new().unwrap();
    let input = write_input_csv(dir.path(), &[(1.0, 0.5)]);
    let mut config = config_for(&dir, input, 0, 10);
    config.columns.strike = "Strike".to_string();

    let err = run_partition_with(&config, reference_heston_params, ScriptedPricer::valid_on(1, 0.3))
        .unwrap_err();
    assert!(err.to_string().contains("Strike"));
}

#[test]
fn test_missing_input_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir, dir.path().join("absent.csv"), 0, 10);
    assert!(run_partition(&config).is_err());
}

#[test]
fn test_heston_reference_contract_end_to_end() {
    let dir = TempDir::new().unwrap();
    let input = write_input_csv(dir.path(), &[(1.05, 0.5)]);
    let config = config_for(&dir, input, 0, 10);

    let summary =
        run_partition_with(&config, reference_heston_params, HestonPricer::default()).unwrap();
    assert_eq!(summary.rows_written, 1);

    let (_, rows) = read_csv(&summary.output_path);
    let iv: f64 = rows[0][8].parse().unwrap();
    assert!((0.10..=0.60).contains(&iv), "iv {}", iv);
}

#[test]
fn test_heston_partition_with_sampled_parameters() {
    let dir = TempDir::new().unwrap();
    let input = write_input_csv(dir.path(), &[(0.95, 0.5), (1.0, 1.0), (1.05, 1.5)]);
    let config = config_for(&dir, input, 0, 10);

    let summary = run_partition(&config).unwrap();
    assert_eq!(summary.rows_loaded, 3);
    assert_eq!(summary.rows_written + summary.rows_exhausted, 3);

    let (_, rows) = read_csv(&summary.output_path);
    for row in rows {
        let iv: f64 = row[8].parse().unwrap();
        assert!(iv.is_finite() && iv > 0.0);
    }
}

#[test]
fn test_rbergomi_smoke_run_is_reproducible() {
    let dir = TempDir::new().unwrap();
    let input = write_input_csv(dir.path(), &[(0.9, 0.25), (1.0, 0.5), (1.1, 1.0)]);

    let mut config = GeneratorConfig::smoke();
    config.paths.input = input;
    assert_eq!(config.model, ModelKind::Rbergomi);

    config.paths.output_dir = Some(dir.path().join("a"));
    let first = run_partition(&config).unwrap();
    config.paths.output_dir = Some(dir.path().join("b"));
    let second = run_partition(&config).unwrap();

    assert_eq!(first.rows_written + first.rows_exhausted, 3);
    let (header, rows_a) = read_csv(&first.output_path);
    let (_, rows_b) = read_csv(&second.output_path);
    assert_eq!(rows_a, rows_b);

    let iv_col = header.len() - 1;
    assert_eq!(
        &header[3..iv_col],
        RBergomiParams::column_names()
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .as_slice()
    );
    for row in rows_a {
        let iv: f64 = row[iv_col].parse().unwrap();
        assert!(iv.is_finite());
        let h: f64 = row[3].parse().unwrap();
        assert!(h > 0.0 && h <= 0.5);
    }
}
