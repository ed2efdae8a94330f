//! Persistence of sweep parameters (JSON) and outcome tables (CSV).
//!
//! Layout of an output directory:
//!
//! ```text
//! parameters.json
//! result_successes_0.csv
//! result_num-not-solved_0.csv
//! result_num-not-accurate_0.csv
//! result_successes_1.csv        <- a later run into the same directory
//! ...
//! ```
//!
//! Result files are never overwritten: each save takes the first unused
//! numeric suffix. Reading sums every file with the same key.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use nalgebra::DMatrix;
use tracing::{info, warn};

use super::table::OutcomeTable;
use super::SweepParameters;
use crate::error::SweepError;
use crate::solver::Outcome;

pub const PARAMETERS_FILE: &str = "parameters.json";
const RESULT_PREFIX: &str = "result_";

pub fn parameters_path(dir: &Path) -> PathBuf {
    dir.join(PARAMETERS_FILE)
}

/// Write `parameters` to `dir/parameters.json`, creating `dir` if needed.
pub fn save_parameters(dir: &Path, parameters: &SweepParameters) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = parameters_path(dir);
    let json = serde_json::to_string_pretty(parameters)?;
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    info!("Saved parameters to {}", path.display());
    Ok(path)
}

/// Read a parameter file.
pub fn load_parameters(path: &Path) -> anyhow::Result<SweepParameters> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let parameters: SweepParameters =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    info!("Loaded parameters from {}", path.display());
    Ok(parameters)
}

/// Fail with [`SweepError::ConfigConflict`] if `dir` already holds parameters
/// that differ from `parameters` in anything but the timestamp.
pub fn check_parameters(dir: &Path, parameters: &SweepParameters) -> Result<(), SweepError> {
    let path = parameters_path(dir);
    if !path.exists() {
        info!("No parameter file in {}", dir.display());
        return Ok(());
    }
    let stored = load_parameters(&path)?;
    let differing = stored.differing_fields(parameters)?;
    if differing.is_empty() {
        Ok(())
    } else {
        Err(SweepError::ConfigConflict {
            path,
            detail: format!("differing fields: {}", differing.join(", ")),
        })
    }
}

fn result_path(dir: &Path, key: &str, n: usize) -> PathBuf {
    dir.join(format!("{RESULT_PREFIX}{key}_{n}.csv"))
}

fn write_matrix(path: &Path, matrix: &DMatrix<f64>) -> anyhow::Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    for row in matrix.row_iter() {
        wtr.write_record(row.iter().map(|v| format!("{v:e}")))?;
    }
    wtr.flush()?;
    Ok(())
}

fn read_matrix(path: &Path) -> anyhow::Result<DMatrix<f64>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut values = Vec::new();
    let mut cols = None;
    let mut rows = 0;
    for record in rdr.records() {
        let record = record?;
        match cols {
            None => cols = Some(record.len()),
            Some(c) if c != record.len() => {
                bail!("{}: ragged row {} ({} != {} columns)", path.display(), rows, record.len(), c)
            }
            Some(_) => {}
        }
        for field in record.iter() {
            let v: f64 = field
                .parse()
                .with_context(|| format!("{}: bad number '{}'", path.display(), field))?;
            // unvisited cells may have been written as nan
            values.push(if v.is_nan() { 0.0 } else { v });
        }
        rows += 1;
    }
    Ok(DMatrix::from_row_slice(rows, cols.unwrap_or(0), &values))
}

/// Write one CSV per outcome with the first free numeric suffix.
pub fn save_results(dir: &Path, table: &OutcomeTable) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut written = Vec::with_capacity(Outcome::ALL.len());
    for outcome in Outcome::ALL {
        let mut n = 0;
        while result_path(dir, outcome.key(), n).exists() {
            n += 1;
        }
        let path = result_path(dir, outcome.key(), n);
        write_matrix(&path, &table.matrix(outcome))
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Saved {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// Key of a result file name: the second-to-last `_`-separated token.
fn result_key(file_name: &str) -> Option<&str> {
    let stem = file_name.strip_prefix(RESULT_PREFIX)?.strip_suffix(".csv")?;
    let mut tokens = stem.rsplit('_');
    tokens.next()?;
    tokens.next()
}

/// Read and sum every result file in `dir`, per outcome.
pub fn read_results(dir: &Path) -> anyhow::Result<BTreeMap<Outcome, DMatrix<f64>>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .map(|e| e.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    entries.sort();

    let mut results: BTreeMap<Outcome, DMatrix<f64>> = BTreeMap::new();
    for path in entries.iter().filter(|p| p.is_file()) {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(key) = result_key(name) else {
            continue;
        };
        let Some(outcome) = Outcome::from_key(key) else {
            warn!("Skipping {}: unknown result key '{}'", path.display(), key);
            continue;
        };
        let matrix = read_matrix(path)?;
        info!("Read {} ({}x{})", path.display(), matrix.nrows(), matrix.ncols());
        match results.get_mut(&outcome) {
            Some(acc) => {
                if acc.shape() != matrix.shape() {
                    bail!(
                        "{}: shape {:?} does not match earlier {} files {:?}",
                        path.display(),
                        matrix.shape(),
                        key,
                        acc.shape()
                    );
                }
                *acc += matrix;
            }
            None => {
                results.insert(outcome, matrix);
            }
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_second_to_last_token() {
        assert_eq!(result_key("result_successes_0.csv"), Some("successes"));
        assert_eq!(result_key("result_num-not-solved_12.csv"), Some("num-not-solved"));
        assert_eq!(result_key("parameters.json"), None);
        assert_eq!(result_key("result_3.csv"), None);
    }

    #[test]
    fn matrix_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.csv");
        let m = DMatrix::from_row_slice(2, 3, &[0.0, 1.0, 2.5, 3.0, 1e-7, 42.0]);
        write_matrix(&path, &m).unwrap();
        let back = read_matrix(&path).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn numpy_style_nan_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result_successes_0.csv");
        fs::write(
            &path,
            "1.000000000000000000e+00,nan\nnan,2.000000000000000000e+00\n",
        )
        .unwrap();
        let m = read_matrix(&path).unwrap();
        assert_eq!(m, DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 2.0]));
    }

    #[test]
    fn repeated_saves_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = OutcomeTable::new(2, 3);
        table.increment(0, 1, Outcome::Success).unwrap();
        table.increment(1, 2, Outcome::SolverError).unwrap();

        let first = save_results(dir.path(), &table).unwrap();
        let second = save_results(dir.path(), &table).unwrap();
        assert!(first[0].ends_with("result_successes_0.csv"));
        assert!(second[0].ends_with("result_successes_1.csv"));

        // stray files are ignored or skipped
        fs::write(dir.path().join("result_bogus_0.csv"), "1,2,3\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        let results = read_results(dir.path()).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[&Outcome::Success][(0, 1)], 2.0);
        assert_eq!(results[&Outcome::SolverError][(1, 2)], 2.0);
        assert_eq!(results[&Outcome::AccuracyError].sum(), 0.0);
    }
}
