use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, info};

use crate::app::{ProgressEvent, ProgressSink};
use crate::cache::{CacheMode, CacheState, TimeCache, TimeSnapshot};
use crate::domain::SourceKind;
use crate::error::AssembleError;
use crate::resolver::FilenamePattern;
use crate::table::{Cell, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSource {
    Cache,
    Computed,
}

#[derive(Debug, Clone)]
pub struct TimeOutcome {
    pub samples: TimeSnapshot,
    pub source: TimeSource,
}

pub struct TimeAggregator {
    pattern: FilenamePattern,
    cache: TimeCache,
    mode: CacheMode,
}

impl TimeAggregator {
    pub fn new(pattern: FilenamePattern, cache: TimeCache, mode: CacheMode) -> Self {
        Self {
            pattern,
            cache,
            mode,
        }
    }

    /// Returns the cached snapshot when one exists and caching is on;
    /// otherwise parses every file and overwrites the snapshot. With no
    /// input files nothing is written, so an empty run never poisons the cache.
    pub fn read_all(
        &self,
        paths: &[Utf8PathBuf],
        sink: &dyn ProgressSink,
    ) -> Result<TimeOutcome, AssembleError> {
        if self.mode == CacheMode::Use {
            if let CacheState::Valid(samples) = self.cache.load()? {
                info!(path = %self.cache.path(), samples = samples.0.len(), "using time cache");
                return Ok(TimeOutcome {
                    samples,
                    source: TimeSource::Cache,
                });
            }
        }
        if paths.is_empty() {
            debug!("no time files given, leaving cache untouched");
            return Ok(TimeOutcome {
                samples: TimeSnapshot::default(),
                source: TimeSource::Computed,
            });
        }
        info!("no usable time cache, recomputing");

        let resolved = self.pattern.resolve_all(paths)?;
        let total = resolved.len();
        let mut samples = TimeSnapshot::default();
        for (done, (path, name)) in resolved.into_iter().enumerate() {
            debug!(%path, sample = %name.sample_id, "reading time file");
            let table = read_time_file(&path)?;
            samples.0.insert(name.sample_id, table);
            sink.event(ProgressEvent::file(SourceKind::Time, done + 1, total, &path));
        }

        self.cache.store(&samples)?;
        Ok(TimeOutcome {
            samples,
            source: TimeSource::Computed,
        })
    }
}

pub fn read_time_file(path: &Utf8Path) -> Result<Table, AssembleError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|err| AssembleError::Filesystem(format!("read {path}: {err}")))?;
    parse_time_records(&content).map_err(|reason| AssembleError::format(path, reason))
}

/// The first line is a caption; the second holds the time series as a row
/// and becomes the `time` column. Each further line becomes one column named
/// by its zero-based position.
pub fn parse_time_records(content: &str) -> Result<Table, String> {
    let mut lines = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .skip(1);
    let header = lines
        .next()
        .ok_or_else(|| "missing time header line".to_string())?;

    let time = header
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(Cell::Number)
                .ok_or_else(|| format!("time value {token:?} is not numeric"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut table = Table::new(time.len());
    table
        .push_column("time", time)
        .map_err(|_| "time column length mismatch".to_string())?;

    for (index, line) in lines.enumerate() {
        let mut values = line.split_whitespace().map(Cell::parse).collect::<Vec<_>>();
        if values.len() > table.row_count() {
            return Err(format!(
                "record {index} has {} values, header has {}",
                values.len(),
                table.row_count()
            ));
        }
        values.resize(table.row_count(), Cell::Number(0.0));
        table
            .push_column(&index.to_string(), values)
            .map_err(|_| format!("record {index} could not be added"))?;
    }

    Ok(table)
}
