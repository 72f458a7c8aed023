//! Pickle writers for benchmark traces and learning curves.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_pickle::SerOptions;

use crate::error::OutputError;
use crate::trainer::Experience;

/// `<dir>/<exp_name>.pkl`
pub fn benchmark_path(dir: &Path, exp_name: &str) -> PathBuf {
    dir.join(format!("{exp_name}.pkl"))
}

/// `<dir>/<exp_name>_rewards.pkl` and `<dir>/<exp_name>_agrewards.pkl`
pub fn curve_paths(dir: &Path, exp_name: &str) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("{exp_name}_rewards.pkl")),
        dir.join(format!("{exp_name}_agrewards.pkl")),
    )
}

fn create(path: &Path) -> Result<BufWriter<File>, OutputError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| OutputError::Write {
            path: path.to_path_buf(),
            source,
        })
}

fn dump<W: Write, T: Serialize>(
    writer: &mut W,
    value: &T,
    path: &Path,
) -> Result<(), OutputError> {
    serde_pickle::to_writer(writer, value, SerOptions::new()).map_err(|source| {
        OutputError::Pickle {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn finish(mut writer: BufWriter<File>, path: &Path) -> Result<(), OutputError> {
    writer.flush().map_err(|source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the closed benchmark episodes, followed by one pickled replay
/// storage per trainer when `replays` is given.
pub fn write_benchmark<I: Serialize>(
    path: &Path,
    episodes: &[Vec<Vec<I>>],
    replays: Option<&[&[Experience]]>,
) -> Result<(), OutputError> {
    let mut writer = create(path)?;
    dump(&mut writer, &episodes, path)?;
    for storage in replays.unwrap_or_default() {
        dump(&mut writer, storage, path)?;
    }
    finish(writer, path)
}

/// Write one numeric sequence as a single pickle.
pub fn write_curve(path: &Path, values: &[f64]) -> Result<(), OutputError> {
    let mut writer = create(path)?;
    dump(&mut writer, &values, path)?;
    finish(writer, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_pickle::{DeOptions, Value};

    #[test]
    fn test_paths() {
        let dir = Path::new("./learning_curves");
        assert_eq!(
            benchmark_path(Path::new("bench"), "exp"),
            PathBuf::from("bench/exp.pkl")
        );
        let (rewards, agrewards) = curve_paths(dir, "exp");
        assert_eq!(rewards, dir.join("exp_rewards.pkl"));
        assert_eq!(agrewards, dir.join("exp_agrewards.pkl"));
    }

    #[test]
    fn test_curve_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.pkl");
        write_curve(&path, &[1.5, -2.0]).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let values: Vec<f64> = serde_pickle::from_slice(&bytes, DeOptions::new()).unwrap();
        assert_eq!(values, vec![1.5, -2.0]);
    }

    #[test]
    fn test_benchmark_trace_structure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.pkl");
        let episodes = vec![vec![vec![1u32, 2], vec![3, 4]]];
        write_benchmark(&path, &episodes, None).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let value = serde_pickle::value_from_slice(&bytes, DeOptions::new()).unwrap();
        match value {
            Value::List(eps) => {
                assert_eq!(eps.len(), 1);
                assert!(matches!(&eps[0], Value::List(agents) if agents.len() == 2));
            }
            other => panic!("expected a list, got {other:?}"),
        }
    }

    #[test]
    fn test_benchmark_with_replays_appends_pickles() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.pkl");
        let with_replay = dir.path().join("replay.pkl");
        let episodes: Vec<Vec<Vec<u32>>> = vec![vec![vec![1]]];
        let storage = vec![Experience {
            obs: vec![0.0],
            action: vec![1.0],
            reward: 1.0,
            next_obs: vec![0.0],
            done: false,
        }];
        let replays: Vec<&[Experience]> = vec![&storage];

        write_benchmark(&plain, &episodes, None).unwrap();
        write_benchmark(&with_replay, &episodes, Some(&replays)).unwrap();

        let plain_len = std::fs::metadata(&plain).unwrap().len();
        let replay_len = std::fs::metadata(&with_replay).unwrap().len();
        assert!(replay_len > plain_len);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("c.pkl");
        let err = write_curve(&path, &[1.0]).unwrap_err();
        assert!(matches!(err, OutputError::Write { .. }));
    }
}
