//! Bulk import from dictionary CSV exports
//!
//! Exports carry one row per sense with the columns `어휘` (headword),
//! `품사` (part of speech) and `뜻풀이` (definition). Only nouns are kept.
//! Rows run through the same normalizer and retrying insert as the crawl, so an
//! import and a crawl can fill the same database in any order.

use crate::clock::Clock;
use crate::hangul::{normalize_entry, Consonant};
use crate::retry::RetryPolicy;
use crate::storage::{insert_with_retry, DictionaryStore, InsertOutcome};
use crate::{HarvestError, Result};
use csv::StringRecord;
use std::path::{Path, PathBuf};

const WORD_COLUMN: &str = "어휘";
const POS_COLUMN: &str = "품사";
const DEFINITION_COLUMN: &str = "뜻풀이";

/// Part-of-speech tag marking a noun sense
const NOUN_TAG: &str = "「명사」";

const PROGRESS_EVERY: u64 = 1000;

/// Counts for one imported file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub path: PathBuf,

    /// Data rows read, nouns or not
    pub rows: u64,

    /// Rows tagged as nouns
    pub nouns: u64,

    pub inserted: u64,
    pub duplicates: u64,

    /// Nouns the normalizer dropped
    pub rejected: u64,

    /// Unreadable rows and rows missing a word or definition
    pub skipped: u64,

    /// Inserts that still failed after retrying
    pub failures: u64,

    /// Set when the file lacks the part-of-speech column and was not read
    pub missing_pos_column: bool,

    /// Stored nouns (inserted or duplicate) per initial consonant
    pub by_consonant: [u64; Consonant::COUNT],
}

/// Totals over a directory import
#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    pub files: Vec<ImportReport>,

    /// Files that could not be opened or parsed at all
    pub failed_files: Vec<PathBuf>,
}

impl ImportSummary {
    pub fn inserted(&self) -> u64 {
        self.files.iter().map(|f| f.inserted).sum()
    }

    pub fn duplicates(&self) -> u64 {
        self.files.iter().map(|f| f.duplicates).sum()
    }

    pub fn rejected(&self) -> u64 {
        self.files.iter().map(|f| f.rejected).sum()
    }

    pub fn failures(&self) -> u64 {
        self.files.iter().map(|f| f.failures).sum()
    }
}

/// Removes homograph numbering such as `가(01)` → `가`
pub fn strip_homograph_marks(word: &str) -> String {
    word.chars()
        .filter(|c| !c.is_ascii_digit() && *c != '(' && *c != ')')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Lists the `*.csv` files in a directory, sorted by name
pub fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Imports every CSV file in `dir`
///
/// A file that cannot be read is logged and recorded in `failed_files`; the
/// remaining files are still imported.
pub async fn import_directory<S, C>(
    store: &mut S,
    dir: &Path,
    policy: &RetryPolicy,
    clock: &C,
) -> Result<ImportSummary>
where
    S: DictionaryStore + ?Sized,
    C: Clock,
{
    let files = csv_files(dir)?;
    let mut summary = ImportSummary::default();

    if files.is_empty() {
        tracing::warn!(dir = %dir.display(), "No CSV files found");
        return Ok(summary);
    }
    tracing::info!(dir = %dir.display(), files = files.len(), "Starting CSV import");

    let total = files.len();
    for (i, path) in files.into_iter().enumerate() {
        tracing::info!("Processing file {}/{}: {}", i + 1, total, path.display());
        match import_file(store, &path, policy, clock).await {
            Ok(report) => summary.files.push(report),
            Err(e) => {
                tracing::error!(file = %path.display(), error = %e, "Failed to import file");
                summary.failed_files.push(path);
            }
        }
    }

    tracing::info!(
        files = summary.files.len(),
        failed = summary.failed_files.len(),
        inserted = summary.inserted(),
        duplicates = summary.duplicates(),
        "CSV import finished"
    );
    Ok(summary)
}

/// Column positions resolved from the header row
struct Columns {
    word: usize,
    pos: usize,
    definition: usize,
}

impl Columns {
    /// Returns `Ok(None)` when the part-of-speech column is missing
    fn resolve(headers: &StringRecord, path: &Path) -> Result<Option<Self>> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
        };

        let Some(pos) = find(POS_COLUMN) else {
            return Ok(None);
        };
        let missing = |name: &str| HarvestError::Csv {
            path: path.display().to_string(),
            source: csv::Error::from(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("missing column {}", name),
            )),
        };
        let word = find(WORD_COLUMN).ok_or_else(|| missing(WORD_COLUMN))?;
        let definition = find(DEFINITION_COLUMN).ok_or_else(|| missing(DEFINITION_COLUMN))?;

        Ok(Some(Self {
            word,
            pos,
            definition,
        }))
    }
}

/// Imports the nouns from one CSV file
pub async fn import_file<S, C>(
    store: &mut S,
    path: &Path,
    policy: &RetryPolicy,
    clock: &C,
) -> Result<ImportReport>
where
    S: DictionaryStore + ?Sized,
    C: Clock,
{
    let csv_error = |source: csv::Error| HarvestError::Csv {
        path: path.display().to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;
    let headers = reader.headers().map_err(csv_error)?.clone();

    let mut report = ImportReport {
        path: path.to_path_buf(),
        ..ImportReport::default()
    };

    let Some(columns) = Columns::resolve(&headers, path)? else {
        tracing::error!(file = %path.display(), "'{}' column not found, skipping file", POS_COLUMN);
        report.missing_pos_column = true;
        return Ok(report);
    };

    for (index, record) in reader.records().enumerate() {
        report.rows += 1;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(
                    file = %path.display(),
                    row = index + 1,
                    error = %e,
                    "Unreadable row"
                );
                report.skipped += 1;
                continue;
            }
        };

        let pos = record.get(columns.pos).unwrap_or_default();
        if !pos.contains(NOUN_TAG) {
            continue;
        }
        report.nouns += 1;

        let word = record.get(columns.word).unwrap_or_default().trim();
        let definition = record.get(columns.definition).unwrap_or_default().trim();
        if word.is_empty() || definition.is_empty() {
            report.skipped += 1;
        } else {
            store_row(store, word, definition, policy, clock, &mut report).await;
        }

        if report.nouns % PROGRESS_EVERY == 0 {
            tracing::info!(
                file = %path.display(),
                nouns = report.nouns,
                rows = report.rows,
                "Import progress"
            );
        }
    }

    let tallies: Vec<String> = Consonant::ALL
        .iter()
        .zip(report.by_consonant)
        .filter(|(_, count)| *count > 0)
        .map(|(consonant, count)| format!("{}:{}", consonant, count))
        .collect();
    tracing::info!(
        file = %path.display(),
        by_consonant = %tallies.join(" "),
        "Nouns per initial consonant"
    );
    tracing::info!(
        file = %path.display(),
        rows = report.rows,
        nouns = report.nouns,
        inserted = report.inserted,
        duplicates = report.duplicates,
        rejected = report.rejected,
        skipped = report.skipped,
        failures = report.failures,
        "Finished file"
    );
    Ok(report)
}

async fn store_row<S, C>(
    store: &mut S,
    word: &str,
    definition: &str,
    policy: &RetryPolicy,
    clock: &C,
    report: &mut ImportReport,
) where
    S: DictionaryStore + ?Sized,
    C: Clock,
{
    let normalized = match normalize_entry(&strip_homograph_marks(word), definition) {
        Ok(normalized) => normalized,
        Err(reason) => {
            tracing::debug!(word, %reason, "Rejected word");
            report.rejected += 1;
            return;
        }
    };

    match insert_with_retry(store, &normalized, policy, clock).await {
        Ok(outcome) => {
            report.by_consonant[normalized.consonant.index()] += 1;
            match outcome {
                InsertOutcome::Inserted => {
                    tracing::debug!(word = %normalized.word, "Inserted");
                    report.inserted += 1;
                }
                InsertOutcome::Duplicate => {
                    tracing::debug!(word = %normalized.word, "Skipped duplicate");
                    report.duplicates += 1;
                }
            }
        }
        Err(failure) => {
            tracing::error!(
                word = %normalized.word,
                attempts = failure.attempts,
                error = %failure.error,
                "Failed to store word"
            );
            report.failures += 1;
        }
    }
}
