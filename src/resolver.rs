use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;

use crate::domain::{ResolvedName, SampleId, SourceKind};
use crate::error::AssembleError;

/// `YY-MM-DD` date, the `L` subject marker, subject index and an optional
/// dash-separated sub-index.
const SUBJECT: &str = r"(?P<subject>\d\d-\d\d-\d\dL\d+(?:-(?P<sub_index>\d+))?)";
const DIR_PREFIX: &str = r"^(?:.*[/\\])?";

pub fn default_expression(kind: SourceKind) -> String {
    match kind {
        SourceKind::Behavior => {
            format!(r"{DIR_PREFIX}{SUBJECT}-behavior-(?P<exp_tag>.+)\.csv$")
        }
        SourceKind::LightMicroscopy => {
            format!(r"{DIR_PREFIX}{SUBJECT}-(?P<cell>.+)-(?P<exp_tag>.+)\.csv$")
        }
        SourceKind::Time => format!(r"{DIR_PREFIX}{SUBJECT}-time-(?P<exp_tag>.+)\.txt$"),
    }
}

/// Compiled, immutable naming convention for one source.
#[derive(Debug, Clone)]
pub struct FilenamePattern {
    kind: SourceKind,
    regex: Regex,
}

impl FilenamePattern {
    pub fn for_source(kind: SourceKind) -> Self {
        let regex = Regex::new(&default_expression(kind)).expect("default pattern compiles");
        Self { kind, regex }
    }

    pub fn custom(kind: SourceKind, expression: &str) -> Result<Self, AssembleError> {
        let regex = Regex::new(expression).map_err(|err| AssembleError::InvalidPattern {
            source_kind: kind.to_string(),
            message: err.to_string(),
        })?;

        let mut required = vec!["subject", "exp_tag"];
        if kind == SourceKind::LightMicroscopy {
            required.push("cell");
        }
        let names = regex.capture_names().flatten().collect::<Vec<_>>();
        if let Some(missing) = required.iter().find(|name| !names.contains(name)) {
            return Err(AssembleError::InvalidPattern {
                source_kind: kind.to_string(),
                message: format!("missing named group `{missing}`"),
            });
        }

        Ok(Self { kind, regex })
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn resolve(&self, path: &Utf8Path) -> Result<ResolvedName, AssembleError> {
        let captures = self.regex.captures(path.as_str()).ok_or_else(|| {
            AssembleError::format(path, format!("does not match {} naming", self.kind))
        })?;

        let group = |name: &str| {
            captures
                .name(name)
                .map(|m| m.as_str().to_string())
                .filter(|value| !value.is_empty())
        };

        let subject = group("subject")
            .ok_or_else(|| AssembleError::format(path, "missing subject token"))?;
        let exp_tag = group("exp_tag")
            .ok_or_else(|| AssembleError::format(path, "missing experiment tag"))?;
        let unit = match self.kind {
            SourceKind::LightMicroscopy => Some(
                group("cell").ok_or_else(|| AssembleError::format(path, "missing cell id"))?,
            ),
            _ => None,
        };

        Ok(ResolvedName {
            source: self.kind,
            sample_id: SampleId::new(&subject, &exp_tag),
            sub_index: group("sub_index"),
            subject,
            unit,
            exp_tag,
        })
    }

    /// Resolves every path up front in sorted order; the first bad name aborts
    /// before any file content is read.
    pub fn resolve_all(
        &self,
        paths: &[Utf8PathBuf],
    ) -> Result<Vec<(Utf8PathBuf, ResolvedName)>, AssembleError> {
        let mut sorted = paths.to_vec();
        sorted.sort();
        sorted
            .into_iter()
            .map(|path| {
                let name = self.resolve(&path)?;
                Ok((path, name))
            })
            .collect()
    }
}
