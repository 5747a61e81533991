//! One-shot import of dataset dump files into the document store.

use anyhow::Context;
use crate::{
    errors::ImportError,
    identity,
    record,
    store::Store,
    Result,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

/// File extension of dataset dump files.
pub const DATA_FILE_EXT: &str = "js";

/// Dataset names that are never imported.
pub const RESERVED_DATASETS: &[&str] = &["manifest"];

#[derive(Clone, Debug)]
pub struct Options {
    /// Directory scanned (non-recursively) for dump files.
    pub data_dir: PathBuf,

    /// Treat a dataset as already imported when its file record count equals
    /// the collection's document count.
    pub skip_on_count: bool,

    /// Show a per-record progress bar on stderr.
    pub progress: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct ImportResult {
    pub datasets: Vec<DatasetOutcome>,
    pub inserted_total: u64,
    pub duration_secs: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct DatasetOutcome {
    pub dataset: String,
    pub action: DatasetAction,
    pub records_in_file: u64,
    pub existing: u64,
    pub inserted: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetAction {
    Imported,
    SkippedReserved,
    SkippedEmpty,
    SkippedUpToDate,
}

/// Import every dump file in `opts.data_dir`, one dataset at a time.
pub fn import_dir(store: &Store, opts: &Options) -> Result<ImportResult> {
    let start = Instant::now();

    let mut datasets = Vec::new();
    for path in data_file_paths(&opts.data_dir)? {
        let Some(dataset) = dataset_name(&path) else {
            tracing::warn!(path = %path.display(),
                           "skipping file with no usable dataset name");
            continue;
        };

        let outcome = import_file(store, &dataset, &path, opts)
            .with_context(|| format!("while importing dataset '{dataset}' \
                                      from '{path}'", path = path.display()))?;
        datasets.push(outcome);
    }

    let res = ImportResult {
        inserted_total: datasets.iter().map(|d| d.inserted).sum(),
        duration_secs: start.elapsed().as_secs_f64(),
        datasets,
    };

    tracing::info!(datasets_len = res.datasets.len(),
                   inserted_total = res.inserted_total,
                   duration_secs = res.duration_secs,
                   "Import done");

    Ok(res)
}

/// Import one dataset's dump file into its collection.
///
/// Idempotent on identity value equality: records whose identity value is
/// already present are skipped, never updated or merged.
pub fn import_file(
    store: &Store,
    dataset: &str,
    path: &Path,
    opts: &Options,
) -> Result<DatasetOutcome> {
    if RESERVED_DATASETS.contains(&dataset) {
        tracing::info!(dataset, "skipping reserved dataset");
        return Ok(outcome(dataset, DatasetAction::SkippedReserved, 0, 0, 0));
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("while reading '{path}'", path = path.display()))?;
    let records = record::parse_dump(&raw)?;
    let records_in_file = records.len() as u64;

    if records.is_empty() {
        tracing::info!(dataset, path = %path.display(), "no records found in file");
        return Ok(outcome(dataset, DatasetAction::SkippedEmpty, 0, 0, 0));
    }

    let collection = store.collection(dataset)?;
    let existing = collection.count_all()?;

    if opts.skip_on_count && records_in_file == existing {
        tracing::info!(dataset, existing,
                       "record count matches document count, skipping import");
        return Ok(outcome(dataset, DatasetAction::SkippedUpToDate,
                          records_in_file, existing, 0));
    }

    tracing::info!(dataset,
                   records_in_file,
                   existing,
                   path = %path.display(),
                   "importing dataset");

    let spec = identity::resolve(dataset, &records[0]);
    tracing::debug!(dataset,
                    type_tag = spec.type_tag.as_str(),
                    field = spec.field.as_str(),
                    synthesized = spec.synthesized,
                    "resolved identity strategy");

    let progress = if opts.progress {
        ProgressBar::new(records_in_file)
    } else {
        ProgressBar::hidden()
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
                       {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"));
    progress.set_message(format!("importing {dataset}"));

    let mut inserted = 0_u64;

    for (index, mut rec) in records.into_iter().enumerate() {
        if rec.type_tag != spec.type_tag {
            return Err(ImportError::TypeTagMismatch {
                index,
                expected: spec.type_tag.clone(),
                found: rec.type_tag.clone(),
            }.into());
        }

        let identity_value = if spec.synthesized {
            let value = Value::String(identity::new_identity());
            rec.fields.insert(spec.field.clone(), value.clone());
            value
        } else {
            rec.fields.get(&spec.field)
                      .cloned()
                      .ok_or_else(|| ImportError::MissingIdentityField {
                          index,
                          field: spec.field.clone(),
                      })?
        };

        if collection.count_by_field(&spec.field, &identity_value)? == 0 {
            collection.insert_one(&rec.fields)?;
            inserted += 1;
        }

        progress.inc(1);
    }

    progress.finish_and_clear();

    tracing::info!(dataset, inserted, records_in_file, "dataset import done");

    Ok(outcome(dataset, DatasetAction::Imported, records_in_file, existing, inserted))
}

/// Paths of the dump files directly inside `data_dir`, sorted.
pub fn data_file_paths(data_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    let entries = fs::read_dir(data_dir)
        .with_context(|| format!("while scanning data dir '{dir}'",
                                 dir = data_dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) == Some(DATA_FILE_EXT) {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

/// Dataset named by a dump file: the base name up to the first `.`.
///
/// `tweets.js` and `tweets.part0.js` both name the dataset `tweets`.
pub fn dataset_name(path: &Path) -> Option<String> {
    let stem = path.file_name()?.to_str()?.split('.').next()?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.to_string())
}

fn outcome(
    dataset: &str,
    action: DatasetAction,
    records_in_file: u64,
    existing: u64,
    inserted: u64,
) -> DatasetOutcome {
    DatasetOutcome {
        dataset: dataset.to_string(),
        action,
        records_in_file,
        existing,
        inserted,
    }
}
