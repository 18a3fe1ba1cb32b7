use assert_matches::assert_matches;
use camino::Utf8Path;
use kira_sample_assembler::domain::SourceKind;
use kira_sample_assembler::error::AssembleError;
use kira_sample_assembler::resolver::FilenamePattern;

#[test]
fn resolution_is_deterministic() {
    let cases = [
        (SourceKind::Behavior, "d/23-05-01L3-behavior-cl.csv", "23-05-01L3-cl"),
        (SourceKind::LightMicroscopy, "d/23-05-01L3-A9-cl.csv", "23-05-01L3-cl"),
        (SourceKind::Time, "d/23-05-01L3-time-cl.txt", "23-05-01L3-cl"),
        (SourceKind::Time, "d/24-01-31L12-4-time-blocks.txt", "24-01-31L12-4-blocks"),
    ];
    for (kind, path, expected) in cases {
        let pattern = FilenamePattern::for_source(kind);
        let first = pattern.resolve(Utf8Path::new(path)).unwrap();
        let second = FilenamePattern::for_source(kind)
            .resolve(Utf8Path::new(path))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.sample_id.as_str(), expected);
    }
}

#[test]
fn sources_do_not_accept_each_other() {
    let time = FilenamePattern::for_source(SourceKind::Time);
    let err = time
        .resolve(Utf8Path::new("d/23-05-01L3-behavior-cl.csv"))
        .unwrap_err();
    assert_matches!(err, AssembleError::Format { .. });

    let behavior = FilenamePattern::for_source(SourceKind::Behavior);
    let err = behavior
        .resolve(Utf8Path::new("d/23-05-01L3-time-cl.txt"))
        .unwrap_err();
    assert_matches!(err, AssembleError::Format { .. });
}

#[test]
fn light_requires_cell_and_tag() {
    let light = FilenamePattern::for_source(SourceKind::LightMicroscopy);
    for bad in ["d/23-05-01L3-cl.csv", "d/23-05-01L3--cl.csv", "d/23-05-01L3-A9-cl.tsv"] {
        let err = light.resolve(Utf8Path::new(bad)).unwrap_err();
        assert!(err.to_string().contains(bad), "{err}");
    }
}

#[test]
fn custom_pattern_is_used() {
    let pattern = FilenamePattern::custom(
        SourceKind::Behavior,
        r"^(?P<subject>S\d+)_(?P<exp_tag>\w+)\.csv$",
    )
    .unwrap();
    let name = pattern.resolve(Utf8Path::new("S7_ol.csv")).unwrap();
    assert_eq!(name.sample_id.as_str(), "S7-ol");
    assert_eq!(name.sub_index, None);
}
