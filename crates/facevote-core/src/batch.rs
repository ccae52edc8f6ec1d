//! Directory-level scoring.
//!
//! The image root holds one sub-directory per batch (an election year). Each
//! batch becomes `{root}/{batch}_scores.csv`. A photo that fails for any
//! reason is logged and left out; a batch never aborts on a single image.

use crate::imageio::has_standard_extension;
use crate::scorer::DualScorer;
use crate::types::ScoreRecord;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Outcome of one batch.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub batch: String,
    pub output: PathBuf,
    pub scored: usize,
    pub skipped: usize,
}

/// Photos in `dir`, one per candidate ID, in ID order.
///
/// When a converted `.jpg` sits next to its original, the standard-format
/// file is the one kept. Unreadable entries are logged and skipped.
pub fn candidate_photos(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let entries = std::fs::read_dir(dir).map_err(|source| BatchError::Io { path: dir.to_path_buf(), source })?;
    let mut by_id: BTreeMap<String, PathBuf> = BTreeMap::new();

    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        match by_id.get(&stem) {
            Some(existing) if has_standard_extension(existing) => {}
            _ => {
                by_id.insert(stem, path);
            }
        }
    }

    Ok(by_id.into_values().collect())
}

/// Score every photo in `dir`, skipping failures.
pub fn score_directory(scorer: &mut DualScorer, dir: &Path) -> Result<(Vec<ScoreRecord>, usize), BatchError> {
    let mut records = Vec::new();
    let mut skipped = 0;

    for path in candidate_photos(dir)? {
        match scorer.score_file(&path) {
            Ok(record) => {
                tracing::debug!(
                    id = %record.id,
                    score = record.score,
                    score_cnn = record.score_cnn,
                    "scored photo"
                );
                records.push(record);
            }
            Err(e) => {
                skipped += 1;
                tracing::warn!(path = %path.display(), error = %e, "skipping photo");
            }
        }
    }

    Ok((records, skipped))
}

/// Write records as `ID,score,score_CNN`.
pub fn write_scores(path: &Path, records: &[ScoreRecord]) -> Result<(), BatchError> {
    let csv_err = |source| BatchError::Csv { path: path.to_path_buf(), source };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    if records.is_empty() {
        writer
            .write_record(["ID", "score", "score_CNN"])
            .map_err(csv_err)?;
    }
    for record in records {
        writer.serialize(record).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| BatchError::Io { path: path.to_path_buf(), source })?;
    Ok(())
}

/// Read a scores file written by [`write_scores`].
pub fn read_scores(path: &Path) -> Result<Vec<ScoreRecord>, BatchError> {
    let csv_err = |source| BatchError::Csv { path: path.to_path_buf(), source };
    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    reader
        .deserialize()
        .collect::<Result<Vec<ScoreRecord>, _>>()
        .map_err(csv_err)
}

/// Score every batch directory under `root`, in name order.
///
/// A batch that cannot be listed or written is logged and left out of the
/// summaries; later batches still run.
pub fn score_root(scorer: &mut DualScorer, root: &Path) -> Result<Vec<BatchSummary>, BatchError> {
    let io_err = |source| BatchError::Io { path: root.to_path_buf(), source };
    let mut batches: Vec<PathBuf> = std::fs::read_dir(root)
        .map_err(io_err)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    batches.sort();

    let mut summaries = Vec::with_capacity(batches.len());
    for dir in batches {
        let batch = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::info!(batch = %batch, "scoring batch");

        let (records, skipped) = match score_directory(scorer, &dir) {
            Ok(scored) => scored,
            Err(e) => {
                tracing::warn!(batch = %batch, error = %e, "skipping batch");
                continue;
            }
        };
        let output = root.join(format!("{batch}_scores.csv"));
        if let Err(e) = write_scores(&output, &records) {
            tracing::warn!(batch = %batch, error = %e, "failed to write batch scores");
            continue;
        }

        tracing::info!(
            batch = %batch,
            scored = records.len(),
            skipped,
            output = %output.display(),
            "batch complete"
        );
        summaries.push(BatchSummary {
            batch,
            output,
            scored: records.len(),
            skipped,
        });
    }

    Ok(summaries)
}
