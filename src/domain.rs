use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AssembleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Behavior,
    #[value(name = "light")]
    #[serde(rename = "light")]
    LightMicroscopy,
    Time,
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Behavior => "Behavior",
            SourceKind::LightMicroscopy => "Light",
            SourceKind::Time => "Time",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SourceKind::Behavior | SourceKind::LightMicroscopy => "csv",
            SourceKind::Time => "txt",
        }
    }

    /// Field delimiter of the raw files. Time records are split on whitespace.
    pub fn delimiter(&self) -> Option<u8> {
        match self {
            SourceKind::Behavior => Some(b';'),
            SourceKind::LightMicroscopy => Some(b','),
            SourceKind::Time => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Behavior => write!(f, "behavior"),
            SourceKind::LightMicroscopy => write!(f, "light"),
            SourceKind::Time => write!(f, "time"),
        }
    }
}

/// Canonical recording-session key, `<date-subject>-<exp_tag>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleId(String);

impl SampleId {
    pub fn new(subject: &str, exp_tag: &str) -> Self {
        Self(format!("{subject}-{exp_tag}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SampleId {
    type Err = AssembleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let valid = trimmed
            .split_once('-')
            .map(|(head, rest)| !head.is_empty() && !rest.is_empty())
            .unwrap_or(false);
        if !valid {
            return Err(AssembleError::format(value, "not a sample identifier"));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedName {
    pub source: SourceKind,
    /// Date-subject token, sub-index included (`23-05-01L3-2`).
    pub subject: String,
    pub sub_index: Option<String>,
    /// Cell identifier; only light-microscopy names carry one.
    pub unit: Option<String>,
    pub exp_tag: String,
    pub sample_id: SampleId,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn sample_id_joins_subject_and_tag() {
        let id = SampleId::new("23-05-01L3-2", "cl");
        assert_eq!(id.as_str(), "23-05-01L3-2-cl");
    }

    #[test]
    fn parse_sample_id_invalid() {
        let err = "nodash".parse::<SampleId>().unwrap_err();
        assert_matches!(err, AssembleError::Format { .. });
    }

    #[test]
    fn source_delimiters() {
        assert_eq!(SourceKind::Behavior.delimiter(), Some(b';'));
        assert_eq!(SourceKind::LightMicroscopy.delimiter(), Some(b','));
        assert_eq!(SourceKind::Time.delimiter(), None);
        assert_eq!(SourceKind::LightMicroscopy.to_string(), "light");
    }
}
