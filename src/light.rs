use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use crate::app::{ProgressEvent, ProgressSink};
use crate::domain::{SampleId, SourceKind};
use crate::error::AssembleError;
use crate::resolver::FilenamePattern;
use crate::table::{Cell, RowCountMismatch, Table};

#[derive(Debug, Clone, Default)]
pub struct LightData {
    pub samples: BTreeMap<SampleId, Table>,
}

struct SampleBucket {
    exp_id: String,
    cells: Vec<(Utf8PathBuf, Table)>,
}

pub struct LightMicroscopyMerger {
    pattern: FilenamePattern,
}

impl LightMicroscopyMerger {
    pub fn new(pattern: FilenamePattern) -> Self {
        Self { pattern }
    }

    pub fn read_all(
        &self,
        paths: &[Utf8PathBuf],
        sink: &dyn ProgressSink,
    ) -> Result<LightData, AssembleError> {
        let resolved = self.pattern.resolve_all(paths)?;
        let total = resolved.len();
        let mut buckets: BTreeMap<SampleId, SampleBucket> = BTreeMap::new();

        for (done, (path, name)) in resolved.into_iter().enumerate() {
            let cell_id = name
                .unit
                .ok_or_else(|| AssembleError::format(&path, "missing cell id"))?;
            debug!(%path, sample = %name.sample_id, cell = %cell_id, "reading light file");

            let mut table = Table::read_source(&path, self.pattern.kind())?;
            table.prefix_columns(&cell_id);

            let bucket = buckets
                .entry(name.sample_id.clone())
                .or_insert_with(|| SampleBucket {
                    exp_id: name.exp_tag.clone(),
                    cells: Vec::new(),
                });
            // Unreachable while sample ids embed the tag; never reconcile silently.
            if bucket.exp_id != name.exp_tag {
                return Err(AssembleError::TagMismatch {
                    sample_id: name.sample_id.to_string(),
                    expected: bucket.exp_id.clone(),
                    found: name.exp_tag,
                    path: path.to_string(),
                });
            }
            bucket.cells.push((path.clone(), table));
            sink.event(ProgressEvent::file(
                SourceKind::LightMicroscopy,
                done + 1,
                total,
                &path,
            ));
        }

        let mut samples = BTreeMap::new();
        for (sample_id, bucket) in buckets {
            let merged = merge_cells(&sample_id, bucket)?;
            samples.insert(sample_id, merged);
        }
        info!(samples = samples.len(), "light-microscopy samples merged");

        Ok(LightData { samples })
    }
}

/// Folds a sample's cell tables into the first one, in discovery order.
fn merge_cells(sample_id: &SampleId, bucket: SampleBucket) -> Result<Table, AssembleError> {
    let mut cells = bucket.cells.into_iter();
    let (_, mut merged) = cells.next().ok_or_else(|| AssembleError::EmptyGroup {
        sample_id: sample_id.to_string(),
    })?;

    for (path, table) in cells {
        merged
            .join_positional(table)
            .map_err(|mismatch| join_error(sample_id, &path, mismatch))?;
    }

    merged.push_constant("sample_id", Cell::from(sample_id.as_str()));
    merged.push_constant("exp_id", Cell::from(bucket.exp_id.as_str()));
    Ok(merged)
}

fn join_error(sample_id: &SampleId, path: &Utf8Path, mismatch: RowCountMismatch) -> AssembleError {
    AssembleError::Consistency {
        sample_id: sample_id.to_string(),
        expected: mismatch.expected,
        found: mismatch.found,
        path: path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn empty_bucket_is_reported() {
        let sample_id: SampleId = "23-05-01L3-cl".parse().unwrap();
        let bucket = SampleBucket {
            exp_id: "cl".to_string(),
            cells: Vec::new(),
        };
        let err = merge_cells(&sample_id, bucket).unwrap_err();
        assert_matches!(err, AssembleError::EmptyGroup { ref sample_id } if sample_id == "23-05-01L3-cl");
    }

    #[test]
    fn merge_appends_identity_columns() {
        let sample_id: SampleId = "23-05-01L3-cl".parse().unwrap();
        let mut a9 = Table::from_reader("Basin\n1\n2\n".as_bytes(), b',').unwrap();
        a9.prefix_columns("A9");
        let mut b1 = Table::from_reader("Basin\n3\n4\n".as_bytes(), b',').unwrap();
        b1.prefix_columns("B1");
        let bucket = SampleBucket {
            exp_id: "cl".to_string(),
            cells: vec![
                (Utf8PathBuf::from("a.csv"), a9),
                (Utf8PathBuf::from("b.csv"), b1),
            ],
        };
        let merged = merge_cells(&sample_id, bucket).unwrap();
        assert_eq!(
            merged.column_names(),
            vec!["A9_Basin", "B1_Basin", "sample_id", "exp_id"]
        );
    }

    #[test]
    fn mismatched_rows_fail() {
        let sample_id: SampleId = "23-05-01L3-cl".parse().unwrap();
        let a9 = Table::from_reader("A9_Basin\n1\n2\n".as_bytes(), b',').unwrap();
        let b1 = Table::from_reader("B1_Basin\n3\n".as_bytes(), b',').unwrap();
        let bucket = SampleBucket {
            exp_id: "cl".to_string(),
            cells: vec![
                (Utf8PathBuf::from("a.csv"), a9),
                (Utf8PathBuf::from("b.csv"), b1),
            ],
        };
        let err = merge_cells(&sample_id, bucket).unwrap_err();
        assert_matches!(
            err,
            AssembleError::Consistency { expected: 2, found: 1, ref path, .. } if path == "b.csv"
        );
    }
}
