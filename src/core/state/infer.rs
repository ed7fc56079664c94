//! Lifecycle state inference

use super::snapshot::DatasetSnapshot;
use crate::domain::LifecycleState;
use std::time::SystemTime;

fn at_least(candidate: Option<SystemTime>, reference: SystemTime) -> bool {
    candidate.is_some_and(|modified| modified >= reference)
}

fn import_state(snapshot: &DatasetSnapshot, imported: SystemTime) -> LifecycleState {
    if !at_least(snapshot.raw_statistics, imported) {
        LifecycleState::Imported
    } else if snapshot.hints_delimited {
        LifecycleState::Delimited
    } else {
        LifecycleState::AnalyzedImport
    }
}

/// Derives the lifecycle state from a snapshot
///
/// Pure and deterministic: the same snapshot always yields the same state.
pub fn infer_state(snapshot: &DatasetSnapshot) -> LifecycleState {
    let source = match (snapshot.imported, snapshot.source) {
        (None, None) => return LifecycleState::Empty,
        (Some(imported), None) => return import_state(snapshot, imported),
        (Some(imported), Some(source)) if imported > source => {
            return import_state(snapshot, imported)
        }
        (_, Some(source)) => source,
    };

    if !at_least(snapshot.canonical_statistics, source) {
        LifecycleState::Sourced
    } else if snapshot.mapped_prefixes.is_empty() {
        LifecycleState::AnalyzedSource
    } else if snapshot.has_validated_mapping() {
        LifecycleState::Validated
    } else {
        LifecycleState::Mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MetadataPrefix;
    use std::time::Duration;
    use test_case::test_case;

    fn t(seconds: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + seconds)
    }

    fn edm() -> MetadataPrefix {
        MetadataPrefix::new("edm").unwrap()
    }

    #[test]
    fn test_empty() {
        assert_eq!(infer_state(&DatasetSnapshot::default()), LifecycleState::Empty);
    }

    #[test]
    fn test_stray_statistics_do_not_count() {
        let snapshot = DatasetSnapshot::default()
            .with_raw_statistics(t(5))
            .with_hints_delimited(true);
        assert_eq!(infer_state(&snapshot), LifecycleState::Empty);
    }

    #[test_case(DatasetSnapshot::default().with_imported(t(10)), LifecycleState::Imported ; "imported only")]
    #[test_case(DatasetSnapshot::default().with_imported(t(10)).with_raw_statistics(t(9)), LifecycleState::Imported ; "stale raw statistics")]
    #[test_case(DatasetSnapshot::default().with_imported(t(10)).with_raw_statistics(t(10)), LifecycleState::AnalyzedImport ; "raw statistics same time")]
    #[test_case(DatasetSnapshot::default().with_imported(t(10)).with_raw_statistics(t(11)).with_hints_delimited(true), LifecycleState::Delimited ; "delimited")]
    #[test_case(DatasetSnapshot::default().with_imported(t(20)).with_source(t(10)).with_raw_statistics(t(21)), LifecycleState::AnalyzedImport ; "reimport newer than source")]
    #[test_case(DatasetSnapshot::default().with_imported(t(10)).with_source(t(10)), LifecycleState::Sourced ; "source same time as import")]
    #[test_case(DatasetSnapshot::default().with_source(t(10)), LifecycleState::Sourced ; "source without import")]
    #[test_case(DatasetSnapshot::default().with_imported(t(5)).with_source(t(10)).with_canonical_statistics(t(9)), LifecycleState::Sourced ; "stale canonical statistics")]
    #[test_case(DatasetSnapshot::default().with_imported(t(5)).with_source(t(10)).with_canonical_statistics(t(11)), LifecycleState::AnalyzedSource ; "analyzed source")]
    #[test_case(DatasetSnapshot::default().with_source(t(10)).with_canonical_statistics(t(11)).with_mapping(edm()), LifecycleState::Mapping ; "mapping")]
    #[test_case(DatasetSnapshot::default().with_source(t(10)).with_canonical_statistics(t(11)).with_mapping(edm()).with_validation(edm()), LifecycleState::Validated ; "validated")]
    #[test_case(DatasetSnapshot::default().with_source(t(10)).with_mapping(edm()).with_validation(edm()), LifecycleState::Sourced ; "mapping ignored without canonical statistics")]
    fn test_infer(snapshot: DatasetSnapshot, expected: LifecycleState) {
        assert_eq!(infer_state(&snapshot), expected);
    }

    #[test]
    fn test_validation_of_unmapped_prefix_is_not_validated() {
        let snapshot = DatasetSnapshot::default()
            .with_source(t(10))
            .with_canonical_statistics(t(11))
            .with_mapping(edm())
            .with_validation(MetadataPrefix::new("ese").unwrap());
        assert_eq!(infer_state(&snapshot), LifecycleState::Mapping);
    }

    #[test]
    fn test_deterministic() {
        let snapshot = DatasetSnapshot::default()
            .with_imported(t(1))
            .with_raw_statistics(t(2))
            .with_hints_delimited(true);
        let first = infer_state(&snapshot);
        for _ in 0..100 {
            assert_eq!(infer_state(&snapshot.clone()), first);
        }
    }
}
