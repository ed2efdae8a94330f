//! Integration tests for the missing-measurement sweep: degradation curves,
//! persistence of parameters and result tables, and conflict detection.

use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use trajrec::{run_sweep, Config, Outcome, SolverKind, SweepError, SweepParameters, SweepResults};

fn small_parameters() -> SweepParameters {
    SweepParameters {
        solver: SolverKind::RightInverse,
        ..SweepParameters::new(vec![3], vec![3], vec![4], 15)
    }
}

fn result_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("result_"))
        .collect();
    names.sort();
    names
}

/// Success rate drops as measurements go missing.
#[test]
fn test_right_inverse_degradation() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();

    let params = small_parameters();
    let mut rng = StdRng::seed_from_u64(1);
    let results = run_sweep(Config::Inline(params.clone()), None, &mut rng).unwrap();
    let table = &results.table;
    assert_eq!(table.shape(), (1, 12));
    assert!(results.parameters.time.is_none());

    let rates: Vec<f64> = (0..12)
        .map(|m| {
            let total = table.total(0, m).unwrap();
            assert_eq!(total as usize, params.n_its, "every cell visited n_its times");
            table.get(0, m, Outcome::Success).unwrap() as f64 / total as f64
        })
        .collect();
    println!("success rates by missing count: {rates:?}");

    // 12 measurements for 11 unknowns
    assert_eq!(rates[0], 1.0);
    // fewer measurements than coefficients
    assert_eq!(rates[11], 0.0);
    let first: f64 = rates[..6].iter().sum();
    let second: f64 = rates[6..].iter().sum();
    assert!(first > second, "first half {first}, second half {second}");
    assert_eq!(table.outcome_total(Outcome::AccuracyError), 0);
}

/// Parameters and tables written by one run are read back identically, and
/// a second run into the same directory is summed with the first.
#[test]
fn test_results_persist_and_accumulate() {
    let dir = tempfile::tempdir().unwrap();
    let params = SweepParameters {
        n_its: 3,
        ..small_parameters()
    };

    let first = run_sweep(
        Config::Inline(params.clone()),
        Some(dir.path()),
        &mut StdRng::seed_from_u64(2),
    )
    .unwrap();
    assert!(first.parameters.time.is_some());
    assert_eq!(
        result_files(dir.path()),
        vec![
            "result_num-not-accurate_0.csv",
            "result_num-not-solved_0.csv",
            "result_successes_0.csv",
        ]
    );

    let loaded = SweepResults::load(dir.path()).unwrap();
    assert!(loaded.parameters.time.is_some());
    assert!(loaded.parameters.differing_fields(&params).unwrap().is_empty());
    assert_eq!(loaded.table, first.table);

    // same configuration, read from the directory itself
    let second = run_sweep(
        Config::FromFile(dir.path().to_path_buf()),
        Some(dir.path()),
        &mut StdRng::seed_from_u64(3),
    )
    .unwrap();
    assert_eq!(result_files(dir.path()).len(), 6);
    assert!(result_files(dir.path()).contains(&"result_successes_1.csv".to_string()));

    let summed = SweepResults::load(dir.path()).unwrap();
    let mut expected = first.table.clone();
    expected.merge(&second.table).unwrap();
    assert_eq!(summed.table, expected);
    assert_eq!(summed.table.total(0, 0).unwrap(), 6);
}

/// A run whose parameters differ from the stored ones is refused before it
/// solves or writes anything.
#[test]
fn test_conflicting_parameters_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let params = SweepParameters {
        n_its: 1,
        ..small_parameters()
    };
    run_sweep(
        Config::Inline(params.clone()),
        Some(dir.path()),
        &mut StdRng::seed_from_u64(4),
    )
    .unwrap();
    let stored = fs::read_to_string(dir.path().join("parameters.json")).unwrap();
    let files = result_files(dir.path());

    let changed = SweepParameters {
        anchors: vec![4],
        ..params
    };
    let err = run_sweep(Config::Inline(changed), Some(dir.path()), &mut StdRng::seed_from_u64(5))
        .unwrap_err();
    match &err {
        SweepError::ConfigConflict { detail, .. } => {
            assert!(detail.contains("anchors"), "{detail}");
            assert!(!detail.contains("positions"), "{detail}");
        }
        other => panic!("expected a conflict, got {other}"),
    }

    assert_eq!(result_files(dir.path()), files);
    assert_eq!(fs::read_to_string(dir.path().join("parameters.json")).unwrap(), stored);
}

#[test]
fn test_invalid_grid_rejected() {
    let params = SweepParameters::new(vec![3], vec![3], vec![], 1);
    let err = run_sweep(Config::Inline(params), None, &mut StdRng::seed_from_u64(6)).unwrap_err();
    assert!(matches!(err, SweepError::Input(_)), "{err}");
}

/// A tiny sweep through the relaxation solver fills every cell.
#[test]
fn test_semidefinite_sweep_runs() {
    let params = SweepParameters {
        solver: SolverKind::SemidefiniteRelaxation,
        ..SweepParameters::new(vec![2], vec![3], vec![3], 1)
    };
    let results = run_sweep(Config::Inline(params), None, &mut StdRng::seed_from_u64(7)).unwrap();
    let (rows, cols) = results.table.shape();
    assert_eq!((rows, cols), (1, 9));
    for m in 0..cols {
        assert_eq!(results.table.total(0, m).unwrap(), 1);
    }
    assert_eq!(results.table.get(0, 0, Outcome::Success).unwrap(), 1);
}
