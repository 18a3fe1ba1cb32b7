use std::collections::BTreeMap;
use std::fs;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::info;

use crate::behavior::{BehaviorAggregator, BehaviorData, BehaviorSummary};
use crate::cache::{CacheMode, TimeCache};
use crate::config::{InputLists, ResolvedConfig};
use crate::domain::{SampleId, SourceKind};
use crate::error::AssembleError;
use crate::light::{LightData, LightMicroscopyMerger};
use crate::table::Table;
use crate::time::{TimeAggregator, TimeOutcome, TimeSource};

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub source: Option<SourceKind>,
    pub message: String,
    pub done: usize,
    pub total: usize,
    pub elapsed: Option<Duration>,
}

impl ProgressEvent {
    pub fn file(source: SourceKind, done: usize, total: usize, path: &Utf8Path) -> Self {
        Self {
            source: Some(source),
            message: path.file_name().unwrap_or(path.as_str()).to_string(),
            done,
            total,
            elapsed: None,
        }
    }

    pub fn phase(message: impl Into<String>, elapsed: Option<Duration>) -> Self {
        Self {
            source: None,
            message: message.into(),
            done: 0,
            total: 0,
            elapsed,
        }
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn event(&self, _event: ProgressEvent) {}
}

/// Input file lists per source, in any order.
#[derive(Debug, Clone, Default)]
pub struct SourceInputs {
    pub behavior: Vec<Utf8PathBuf>,
    pub light: Vec<Utf8PathBuf>,
    pub time: Vec<Utf8PathBuf>,
}

impl SourceInputs {
    /// Expands directories one level deep to files with the source's extension.
    pub fn from_lists(lists: &InputLists) -> Result<Self, AssembleError> {
        Ok(Self {
            behavior: expand_inputs(&lists.behavior, SourceKind::Behavior)?,
            light: expand_inputs(&lists.light, SourceKind::LightMicroscopy)?,
            time: expand_inputs(&lists.time, SourceKind::Time)?,
        })
    }
}

pub fn expand_inputs(
    entries: &[String],
    kind: SourceKind,
) -> Result<Vec<Utf8PathBuf>, AssembleError> {
    let mut files = Vec::new();
    for entry in entries {
        let path = Utf8PathBuf::from(entry);
        if !path.as_std_path().is_dir() {
            files.push(path);
            continue;
        }
        let listing = path
            .read_dir_utf8()
            .map_err(|err| AssembleError::Filesystem(format!("read dir {path}: {err}")))?;
        for item in listing {
            let item = item.map_err(|err| AssembleError::Filesystem(err.to_string()))?;
            let child = item.path();
            if child.is_file() && child.extension() == Some(kind.extension()) {
                files.push(child.to_path_buf());
            }
        }
    }
    files.sort();
    Ok(files)
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub behavior: BehaviorData,
    pub light: LightData,
    pub time: TimeOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssembleSummary {
    pub assembled_at: String,
    pub behavior: SourceSummary,
    pub behavior_counts: BehaviorSummary,
    pub behavior_overwritten: Vec<SampleId>,
    pub light: SourceSummary,
    pub time: SourceSummary,
    pub time_source: TimeSource,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub samples: Vec<SampleTableSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleTableSummary {
    pub sample_id: SampleId,
    pub rows: usize,
    pub columns: Vec<String>,
}

impl SourceSummary {
    fn from_samples(samples: &BTreeMap<SampleId, Table>) -> Self {
        Self {
            samples: samples
                .iter()
                .map(|(sample_id, table)| SampleTableSummary {
                    sample_id: sample_id.clone(),
                    rows: table.row_count(),
                    columns: table.column_names().into_iter().map(String::from).collect(),
                })
                .collect(),
        }
    }
}

impl Dataset {
    pub fn summary(&self) -> AssembleSummary {
        AssembleSummary {
            assembled_at: chrono::Utc::now().to_rfc3339(),
            behavior: SourceSummary::from_samples(&self.behavior.samples),
            behavior_counts: self.behavior.summary(),
            behavior_overwritten: self.behavior.overwritten.clone(),
            light: SourceSummary::from_samples(&self.light.samples),
            time: SourceSummary::from_samples(&self.time.samples.0),
            time_source: self.time.source,
        }
    }

    /// Writes `<dir>/<source>/<sample_id>.csv` per table plus the behavior report.
    pub fn export(&self, dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, AssembleError> {
        let mut written = Vec::new();
        let groups = [
            (SourceKind::Behavior, &self.behavior.samples),
            (SourceKind::LightMicroscopy, &self.light.samples),
            (SourceKind::Time, &self.time.samples.0),
        ];
        for (kind, samples) in groups {
            let target = dir.join(kind.to_string());
            fs::create_dir_all(target.as_std_path())
                .map_err(|err| AssembleError::Filesystem(format!("create {target}: {err}")))?;
            for (sample_id, table) in samples {
                let path = target.join(format!("{sample_id}.csv"));
                table.write_csv(&path, b',')?;
                written.push(path);
            }
        }
        let report = dir.join("behavior_report.csv");
        self.behavior.report.write_csv(&report, b',')?;
        written.push(report);
        Ok(written)
    }
}

#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub cache_mode: CacheMode,
}

pub struct Assembler {
    behavior: BehaviorAggregator,
    light: LightMicroscopyMerger,
    time: TimeAggregator,
}

impl Assembler {
    pub fn new(config: &ResolvedConfig, options: AssembleOptions) -> Self {
        let patterns = config.patterns.clone();
        Self {
            behavior: BehaviorAggregator::new(patterns.behavior),
            light: LightMicroscopyMerger::new(patterns.light),
            time: TimeAggregator::new(
                patterns.time,
                TimeCache::new(config.cache_path.clone()),
                options.cache_mode,
            ),
        }
    }

    /// Runs behavior, light and time in turn; the first failure aborts the run.
    pub fn assemble(
        &self,
        inputs: &SourceInputs,
        sink: &dyn ProgressSink,
    ) -> Result<Dataset, AssembleError> {
        let started = Instant::now();

        sink.event(ProgressEvent::phase("reading behavior data", None));
        let behavior = self.behavior.read_all(&inputs.behavior, sink)?;

        sink.event(ProgressEvent::phase("reading light data", Some(started.elapsed())));
        let light = self.light.read_all(&inputs.light, sink)?;

        sink.event(ProgressEvent::phase("reading time data", Some(started.elapsed())));
        let time = self.time.read_all(&inputs.time, sink)?;

        info!(
            behavior = behavior.samples.len(),
            light = light.samples.len(),
            time = time.samples.0.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dataset assembled"
        );
        sink.event(ProgressEvent::phase("done", Some(started.elapsed())));

        Ok(Dataset {
            behavior,
            light,
            time,
        })
    }
}
