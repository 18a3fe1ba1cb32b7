use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::app::{ProgressEvent, ProgressSink};
use crate::domain::{SampleId, SourceKind};
use crate::error::AssembleError;
use crate::resolver::FilenamePattern;
use crate::table::{Cell, Table};

#[derive(Debug, Clone, Default)]
pub struct BehaviorData {
    pub samples: BTreeMap<SampleId, Table>,
    /// Every per-sample table stacked row-wise; only used for summary counts.
    pub report: Table,
    /// Sample ids that were replaced by a later file.
    pub overwritten: Vec<SampleId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehaviorSummary {
    pub rows: usize,
    pub counts: Vec<BehaviorCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehaviorCount {
    pub column: String,
    pub positive: usize,
}

impl BehaviorData {
    pub fn summary(&self) -> BehaviorSummary {
        BehaviorSummary {
            rows: self.report.row_count(),
            counts: self
                .report
                .count_equal(1.0)
                .into_iter()
                .filter(|(column, _)| column != "sample_id" && column != "exp_id")
                .map(|(column, positive)| BehaviorCount { column, positive })
                .collect(),
        }
    }
}

pub struct BehaviorAggregator {
    pattern: FilenamePattern,
}

impl BehaviorAggregator {
    pub fn new(pattern: FilenamePattern) -> Self {
        Self { pattern }
    }

    pub fn read_all(
        &self,
        paths: &[Utf8PathBuf],
        sink: &dyn ProgressSink,
    ) -> Result<BehaviorData, AssembleError> {
        let resolved = self.pattern.resolve_all(paths)?;
        let total = resolved.len();
        let mut data = BehaviorData::default();

        for (done, (path, name)) in resolved.into_iter().enumerate() {
            debug!(%path, sample = %name.sample_id, "reading behavior file");
            let mut table = Table::read_source(&path, self.pattern.kind())?;
            table.push_constant("sample_id", Cell::from(name.sample_id.as_str()));
            table.push_constant("exp_id", Cell::from(name.exp_tag.as_str()));

            if data.samples.insert(name.sample_id.clone(), table).is_some() {
                warn!(%path, sample = %name.sample_id, "duplicate behavior sample, keeping later file");
                data.overwritten.push(name.sample_id);
            }
            sink.event(ProgressEvent::file(SourceKind::Behavior, done + 1, total, &path));
        }

        data.report = Table::concat(data.samples.values());
        let summary = data.summary();
        let counts = summary
            .counts
            .iter()
            .map(|count| format!("{}={}", count.column, count.positive))
            .collect::<Vec<_>>()
            .join(", ");
        info!(samples = data.samples.len(), rows = summary.rows, "behavior counts: {counts}");

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use assert_matches::assert_matches;
    use camino::Utf8Path;

    use super::*;
    use crate::app::NullProgress;

    fn write(dir: &Utf8Path, name: &str, content: &str) -> Utf8PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn aggregator() -> BehaviorAggregator {
        BehaviorAggregator::new(FilenamePattern::for_source(SourceKind::Behavior))
    }

    #[test]
    fn reads_and_tags_behavior() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(temp.path()).unwrap();
        let path = write(dir, "23-05-01L3-behavior-cl.csv", "crawl;bend\n1;0\n0;\n1;1\n");

        let data = aggregator().read_all(&[path], &NullProgress).unwrap();
        let table = &data.samples[&"23-05-01L3-cl".parse::<SampleId>().unwrap()];
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_names(), vec!["crawl", "bend", "sample_id", "exp_id"]);
        assert!(table.column("exp_id").unwrap().values.iter().all(|v| *v == Cell::from("cl")));
        assert_eq!(table.column("bend").unwrap().values[1], Cell::Number(0.0));

        let summary = data.summary();
        assert_eq!(summary.rows, 3);
        assert_eq!(
            summary.counts,
            vec![
                BehaviorCount { column: "crawl".to_string(), positive: 2 },
                BehaviorCount { column: "bend".to_string(), positive: 1 },
            ]
        );
    }

    #[test]
    fn duplicate_sample_last_file_wins() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(temp.path()).unwrap();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::create_dir_all(root.join("b")).unwrap();
        let later = write(&root.join("b"), "23-05-01L3-behavior-cl.csv", "crawl\n1\n1\n");
        let earlier = write(&root.join("a"), "23-05-01L3-behavior-cl.csv", "crawl\n0\n");

        let data = aggregator().read_all(&[later, earlier], &NullProgress).unwrap();
        assert_eq!(data.samples.len(), 1);
        assert_eq!(data.overwritten.len(), 1);
        let table = data.samples.values().next().unwrap();
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn bad_name_aborts_before_reading() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(temp.path()).unwrap();
        let good = write(dir, "23-05-01L3-behavior-cl.csv", "crawl\n1\n");
        let bad = dir.join("23-05-01L3-behaviour-cl.csv");

        let err = aggregator().read_all(&[good, bad], &NullProgress).unwrap_err();
        assert_matches!(err, AssembleError::Format { .. });
    }
}
