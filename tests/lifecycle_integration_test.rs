//! Integration tests walking datasets through their lifecycle

use flate2::write::GzEncoder;
use flate2::Compression;
use strata::config::StrataConfig;
use strata::core::hash::Committed;
use strata::core::progress::{CancellationToken, NoProgress};
use strata::core::stats::StatisticsFormat;
use strata::core::store::{ArtifactKind, Facts, Storage};
use strata::core::Dataset;
use strata::domain::{LifecycleState, MetadataPrefix, SpecName, StrataError};
use std::io::Write;
use tempfile::TempDir;

const MUSEUM: &str = "<export><objects>\
    <object><number>A-1</number><name>Bowl</name></object>\
    <object><number>A-2</number><name>Cup</name></object>\
    <object><number>A-3</number><name>Plate</name></object>\
    </objects></export>";

fn storage(temp: &TempDir) -> Storage {
    let mut config = StrataConfig::default();
    config.storage.root = temp.path().join("datasets");
    Storage::open(&config).unwrap()
}

fn spec(name: &str) -> SpecName {
    SpecName::new(name).unwrap()
}

fn edm() -> MetadataPrefix {
    MetadataPrefix::new("edm").unwrap()
}

fn import(dataset: &Dataset, xml: &str) -> Committed {
    dataset
        .import_stream(xml.as_bytes(), &mut NoProgress, CancellationToken::new())
        .unwrap()
}

fn analyze(dataset: &Dataset, format: StatisticsFormat) {
    dataset
        .analyze(format, &mut NoProgress, CancellationToken::new())
        .unwrap();
}

#[test]
fn test_full_lifecycle_to_validated() {
    let temp = TempDir::new().unwrap();
    let storage = storage(&temp);
    let dataset = storage.dataset(&spec("museum")).unwrap();
    assert_eq!(dataset.state().unwrap(), LifecycleState::Empty);

    let mut facts = Facts::default();
    facts.set("name", "City Museum");
    facts.set("provider", "Example Heritage");
    dataset.set_facts(&facts).unwrap();
    assert_eq!(dataset.state().unwrap(), LifecycleState::Empty);

    import(&dataset, MUSEUM);
    assert_eq!(dataset.state().unwrap(), LifecycleState::Imported);

    analyze(&dataset, StatisticsFormat::Raw);
    assert_eq!(dataset.state().unwrap(), LifecycleState::AnalyzedImport);

    dataset
        .delimit(
            "/export/objects/object".parse().unwrap(),
            "/export/objects/object/number".parse().unwrap(),
        )
        .unwrap();
    assert_eq!(dataset.state().unwrap(), LifecycleState::Delimited);

    let summary = dataset
        .convert(&mut NoProgress, CancellationToken::new())
        .unwrap();
    assert_eq!(summary.record_count, 3);
    assert_eq!(dataset.state().unwrap(), LifecycleState::Sourced);

    analyze(&dataset, StatisticsFormat::Canonical);
    assert_eq!(dataset.state().unwrap(), LifecycleState::AnalyzedSource);

    dataset.set_mapping(&edm(), "<rec-mapping/>".as_bytes()).unwrap();
    assert_eq!(dataset.state().unwrap(), LifecycleState::Mapping);

    dataset.set_validation(&edm(), "3 valid".as_bytes()).unwrap();
    assert_eq!(dataset.state().unwrap(), LifecycleState::Validated);

    let uploads = dataset.upload_artifacts().unwrap();
    assert_eq!(uploads.len(), 3);
    assert!(uploads[0].to_string_lossy().ends_with("__source.xml.gz"));

    assert_eq!(dataset.facts().unwrap().get("name"), Some("City Museum"));
    assert_eq!(dataset.hints().unwrap().delimiters().unwrap().record_count, 3);

    // A reopened handle sees the same state
    let reopened = storage.existing_dataset(&spec("museum")).unwrap().unwrap();
    assert_eq!(reopened.state().unwrap(), LifecycleState::Validated);
}

#[test]
fn test_validation_of_other_prefix_does_not_validate() {
    let temp = TempDir::new().unwrap();
    let dataset = storage(&temp).dataset(&spec("museum")).unwrap();
    import(&dataset, MUSEUM);
    analyze(&dataset, StatisticsFormat::Raw);
    dataset
        .delimit(
            "/export/objects/object".parse().unwrap(),
            "/export/objects/object/number".parse().unwrap(),
        )
        .unwrap();
    dataset
        .convert(&mut NoProgress, CancellationToken::new())
        .unwrap();
    analyze(&dataset, StatisticsFormat::Canonical);

    dataset.set_mapping(&edm(), "<rec-mapping/>".as_bytes()).unwrap();
    dataset
        .set_validation(&MetadataPrefix::new("ese").unwrap(), "ok".as_bytes())
        .unwrap();
    assert_eq!(dataset.state().unwrap(), LifecycleState::Mapping);
}

#[test]
fn test_duplicate_identifiers_leave_no_source() {
    let temp = TempDir::new().unwrap();
    let dataset = storage(&temp).dataset(&spec("dupes")).unwrap();
    import(
        &dataset,
        "<export><objects>\
         <object><number>A-1</number></object>\
         <object><number>A-1</number></object>\
         </objects></export>",
    );
    analyze(&dataset, StatisticsFormat::Raw);
    dataset
        .delimit(
            "/export/objects/object".parse().unwrap(),
            "/export/objects/object/number".parse().unwrap(),
        )
        .unwrap();

    let err = dataset
        .convert(&mut NoProgress, CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, StrataError::Uniqueness(_)));
    assert!(dataset
        .directory()
        .versions(&ArtifactKind::Source)
        .unwrap()
        .is_empty());
    assert_eq!(dataset.state().unwrap(), LifecycleState::Delimited);
}

#[test]
fn test_mapping_history_is_bounded() {
    let temp = TempDir::new().unwrap();
    let dataset = storage(&temp).dataset(&spec("history")).unwrap();
    let depth = StrataConfig::default().storage.mapping_history;

    let mut last = None;
    for version in 0..depth + 5 {
        let mapping = format!("<rec-mapping version=\"{version}\"/>");
        last = Some(dataset.set_mapping(&edm(), mapping.as_bytes()).unwrap());
    }

    let versions = dataset
        .directory()
        .versions(&ArtifactKind::Mapping(edm()))
        .unwrap();
    assert_eq!(versions.len(), depth);
    let last = last.unwrap();
    assert!(versions.iter().any(|v| v.path == last.path()));
    assert!(dataset.latest_mappings().unwrap().contains_key(&edm()));
}

#[test]
fn test_identical_mapping_is_not_stored_twice() {
    let temp = TempDir::new().unwrap();
    let dataset = storage(&temp).dataset(&spec("history")).unwrap();
    let first = dataset.set_mapping(&edm(), "<m/>".as_bytes()).unwrap();
    let second = dataset.set_mapping(&edm(), "<m/>".as_bytes()).unwrap();
    assert!(!first.is_unchanged());
    assert!(second.is_unchanged());
    assert_eq!(first.path(), second.path());
}

#[test]
fn test_import_gzip_file() {
    let temp = TempDir::new().unwrap();
    let dataset = storage(&temp).dataset(&spec("gzipped")).unwrap();

    let external = temp.path().join("export.xml.gz");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(MUSEUM.as_bytes()).unwrap();
    std::fs::write(&external, encoder.finish().unwrap()).unwrap();

    dataset
        .import_external(&external, &mut NoProgress, CancellationToken::new())
        .unwrap();
    assert_eq!(dataset.state().unwrap(), LifecycleState::Imported);

    let statistics = dataset
        .analyze_current(&mut NoProgress, CancellationToken::new())
        .unwrap();
    assert_eq!(statistics.format, StatisticsFormat::Raw);
    assert_eq!(
        statistics.occurrences(&"/export/objects/object".parse().unwrap()),
        3
    );

    // The same content as plain text is recognised as identical
    let plain = temp.path().join("export.xml");
    std::fs::write(&plain, MUSEUM).unwrap();
    let again = dataset
        .import_external(&plain, &mut NoProgress, CancellationToken::new())
        .unwrap();
    assert!(again.is_unchanged());
}

#[test]
fn test_uncompressed_storage_uses_plain_names() {
    let temp = TempDir::new().unwrap();
    let mut config = StrataConfig::default();
    config.storage.root = temp.path().join("datasets");
    config.storage.compress = false;
    let dataset = Storage::open(&config).unwrap().dataset(&spec("plain")).unwrap();

    let imported = import(&dataset, MUSEUM);
    let name = imported.path().file_name().unwrap().to_string_lossy().to_string();
    assert!(name.ends_with("__imported.xml"), "{name}");
    assert_eq!(std::fs::read_to_string(imported.path()).unwrap(), MUSEUM);
    assert_eq!(dataset.state().unwrap(), LifecycleState::Imported);

    analyze(&dataset, StatisticsFormat::Raw);
    dataset
        .delimit(
            "/export/objects/object".parse().unwrap(),
            "/export/objects/object/number".parse().unwrap(),
        )
        .unwrap();
    let summary = dataset
        .convert(&mut NoProgress, CancellationToken::new())
        .unwrap();
    assert!(summary
        .committed
        .path()
        .to_string_lossy()
        .ends_with("__source.xml"));
    assert_eq!(dataset.state().unwrap(), LifecycleState::Sourced);

    // Turning compression back on still finds the plain versions
    config.storage.compress = true;
    let reopened = Storage::open(&config).unwrap().dataset(&spec("plain")).unwrap();
    assert_eq!(reopened.state().unwrap(), LifecycleState::Sourced);
    assert_eq!(
        reopened.directory().latest(&ArtifactKind::Source).unwrap().unwrap().path,
        summary.committed.path()
    );
}

#[test]
fn test_import_missing_file() {
    let temp = TempDir::new().unwrap();
    let dataset = storage(&temp).dataset(&spec("missing")).unwrap();
    let err = dataset
        .import_external(
            &temp.path().join("nope.xml"),
            &mut NoProgress,
            CancellationToken::new(),
        )
        .unwrap_err();
    assert!(matches!(err, StrataError::Storage(_)));
    assert_eq!(dataset.state().unwrap(), LifecycleState::Empty);
}

#[test]
fn test_storage_lists_and_deletes_datasets() {
    let temp = TempDir::new().unwrap();
    let storage = storage(&temp);
    import(&storage.dataset(&spec("beta")).unwrap(), MUSEUM);
    storage.dataset(&spec("alpha")).unwrap();

    assert_eq!(storage.spec_names().unwrap(), vec![spec("alpha"), spec("beta")]);
    storage.delete_dataset(&spec("beta")).unwrap();
    assert_eq!(storage.spec_names().unwrap(), vec![spec("alpha")]);
    assert!(storage.existing_dataset(&spec("beta")).unwrap().is_none());
}
