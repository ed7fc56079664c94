//! Operations on one dataset
//!
//! [`Dataset`] is the entry point callers use: it reads the lifecycle state,
//! imports raw input, runs the statistics and normalization passes and keeps
//! the per-prefix mapping, validation and report artifacts. Every pass logs
//! its start and end, reports progress to a [`ProgressListener`], stops when
//! its [`CancellationToken`] is tripped and notifies the [`AlertSink`] of any
//! failure other than cancellation.

use crate::config::StatisticsConfig;
use crate::core::hash::Committed;
use crate::core::normalize::SourceNormalizer;
use crate::core::progress::{AlertSink, CancellationToken, PassContext, ProgressListener};
use crate::core::state::{infer_state, DatasetSnapshot};
use crate::core::stats::{Statistics, StatisticsCollector, StatisticsFormat};
use crate::core::store::{
    open_artifact, ArtifactKind, DatasetDirectory, Delimiters, Facts, Hints, NamePattern,
    PrefixedFamily,
};
use crate::core::xml::XmlEventReader;
use crate::domain::{LifecycleState, MetadataPrefix, Path, Result, SpecName, StrataError};
use crate::{log_pass_complete, log_pass_start};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

const COPY_CHUNK: usize = 64 * 1024;
const IMPORT_PROGRESS_BYTES: u64 = 1024 * 1024;

/// Outcome of a conversion pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSummary {
    /// Records written to the source envelope
    pub record_count: u64,
    /// The stored source artifact
    pub committed: Committed,
    pub duration: Duration,
}

/// Handle on one dataset
#[derive(Clone)]
pub struct Dataset {
    directory: DatasetDirectory,
    statistics: StatisticsConfig,
    alerts: Arc<dyn AlertSink>,
}

impl Dataset {
    pub(crate) fn new(
        directory: DatasetDirectory,
        statistics: StatisticsConfig,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            directory,
            statistics,
            alerts,
        }
    }

    pub fn spec(&self) -> &SpecName {
        self.directory.spec()
    }

    pub fn directory(&self) -> &DatasetDirectory {
        &self.directory
    }

    pub fn snapshot(&self) -> Result<DatasetSnapshot> {
        self.directory.snapshot()
    }

    /// Current lifecycle state, inferred from the artifacts on disk
    pub fn state(&self) -> Result<LifecycleState> {
        Ok(infer_state(&self.snapshot()?))
    }

    pub fn facts(&self) -> Result<Facts> {
        self.directory.read_facts()
    }

    pub fn set_facts(&self, facts: &Facts) -> Result<()> {
        self.directory.write_facts(facts)
    }

    pub fn hints(&self) -> Result<Hints> {
        self.directory.read_hints()
    }

    pub fn set_hints(&self, hints: &Hints) -> Result<()> {
        self.directory.write_hints(hints)
    }

    /// Sets the record delimiters, taking the record count from raw statistics
    ///
    /// # Errors
    ///
    /// `StrataError::Configuration` when no raw statistics exist or the paths
    /// are inconsistent.
    pub fn delimit(&self, record_root: Path, unique_element: Path) -> Result<Delimiters> {
        let statistics = self.statistics(StatisticsFormat::Raw)?.ok_or_else(|| {
            StrataError::Configuration(format!("Dataset {} has no raw statistics", self.spec()))
        })?;
        let record_count = statistics.occurrences(&record_root);
        let delimiters = Delimiters::new(record_root, record_count, unique_element)?;
        let mut hints = self.hints()?;
        hints.set_delimiters(&delimiters);
        self.set_hints(&hints)?;
        tracing::info!(
            spec = %self.spec(),
            record_root = %delimiters.record_root,
            unique_element = %delimiters.unique_element,
            record_count,
            "Dataset delimited"
        );
        Ok(delimiters)
    }

    /// Persisted statistics of the given form, if any
    pub fn statistics(&self, format: StatisticsFormat) -> Result<Option<Statistics>> {
        let Some(artifact) = self.directory.latest(&ArtifactKind::Statistics(format))? else {
            return Ok(None);
        };
        let bytes = std::fs::read(&artifact.path)?;
        Statistics::from_json(&bytes).map(Some)
    }

    /// Copies an external file (plain or gzip) into the imported artifact
    ///
    /// Identical content is reported as `Committed::Unchanged` and leaves
    /// the dataset untouched.
    pub fn import_external(
        &self,
        file: &std::path::Path,
        listener: &mut dyn ProgressListener,
        token: CancellationToken,
    ) -> Result<Committed> {
        self.pass("import", listener, token, |ctx| {
            let total = std::fs::metadata(file)
                .map_err(|e| {
                    StrataError::Storage(format!("Cannot read {}: {}", file.display(), e))
                })?
                .len();
            ctx.prepare(total);
            let input = open_artifact(file)?;
            self.store_import(input, ctx)
        })
    }

    /// Copies a stream into the imported artifact
    pub fn import_stream<R: Read>(
        &self,
        input: R,
        listener: &mut dyn ProgressListener,
        token: CancellationToken,
    ) -> Result<Committed> {
        self.pass("import", listener, token, |ctx| {
            ctx.prepare(0);
            self.store_import(input, ctx)
        })
    }

    fn store_import<R: Read>(&self, mut input: R, ctx: &mut PassContext<'_>) -> Result<Committed> {
        let started = Instant::now();
        let mut writer = self.directory.create_writer(&ArtifactKind::Imported)?;
        let mut chunk = vec![0u8; COPY_CHUNK];
        let mut copied = 0u64;
        let mut next_report = IMPORT_PROGRESS_BYTES;
        loop {
            let read = match input.read(&mut chunk) {
                Ok(0) => break,
                Ok(read) => read,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            writer.write_all(&chunk[..read])?;
            copied += read as u64;
            if copied >= next_report {
                ctx.checkpoint(copied)?;
                next_report += IMPORT_PROGRESS_BYTES;
            }
        }
        ctx.checkpoint(copied)?;
        let committed = self
            .directory
            .commit(&ArtifactKind::Imported, writer.finish()?)?;
        log_pass_complete!("import", self.spec(), copied, started.elapsed());
        Ok(committed)
    }

    /// Collects statistics over the imported (raw) or source (canonical) form
    ///
    /// An unparseable input artifact is renamed with the `.error` suffix and
    /// the returned `StructuralParse` error names the renamed file.
    pub fn analyze(
        &self,
        format: StatisticsFormat,
        listener: &mut dyn ProgressListener,
        token: CancellationToken,
    ) -> Result<Statistics> {
        self.pass("analyze", listener, token, |ctx| {
            let started = Instant::now();
            let kind = match format {
                StatisticsFormat::Raw => ArtifactKind::Imported,
                StatisticsFormat::Canonical => ArtifactKind::Source,
            };
            let artifact = self.directory.latest(&kind)?.ok_or_else(|| {
                StrataError::Configuration(format!(
                    "Dataset {} has no {} to analyze",
                    self.spec(),
                    kind
                ))
            })?;
            ctx.prepare(0);

            let mut events = XmlEventReader::new(open_artifact(&artifact.path)?, &artifact.path);
            let collector = StatisticsCollector::new(format, &self.statistics);
            let statistics = match collector.collect(&mut events, ctx) {
                Ok(statistics) => statistics,
                Err(StrataError::StructuralParse { message, .. }) => {
                    let path = self.directory.rename_with_error_suffix(&artifact.path)?;
                    return Err(StrataError::StructuralParse { path, message });
                }
                Err(e) => return Err(e),
            };

            self.directory
                .write_plain(&ArtifactKind::Statistics(format), &statistics.to_json()?)?;
            log_pass_complete!(
                "analyze",
                self.spec(),
                statistics.element_count,
                started.elapsed()
            );
            Ok(statistics)
        })
    }

    /// Analyzes whichever form is current: raw while the import is newer
    /// than the source, canonical otherwise
    pub fn analyze_current(
        &self,
        listener: &mut dyn ProgressListener,
        token: CancellationToken,
    ) -> Result<Statistics> {
        let snapshot = self.snapshot()?;
        let format = if snapshot.import_is_current() || snapshot.source.is_none() {
            StatisticsFormat::Raw
        } else {
            StatisticsFormat::Canonical
        };
        self.analyze(format, listener, token)
    }

    /// Normalizes the imported artifact into the source envelope
    ///
    /// When the result is byte-identical to the current source, the existing
    /// file is kept and its modification time refreshed.
    pub fn convert(
        &self,
        listener: &mut dyn ProgressListener,
        token: CancellationToken,
    ) -> Result<ConversionSummary> {
        self.pass("convert", listener, token, |ctx| {
            let started = Instant::now();
            let delimiters = self.hints()?.delimiters()?;
            let imported = self
                .directory
                .latest(&ArtifactKind::Imported)?
                .ok_or_else(|| {
                    StrataError::Configuration(format!(
                        "Dataset {} has nothing imported",
                        self.spec()
                    ))
                })?;
            ctx.prepare(delimiters.record_count);

            let mut events = XmlEventReader::new(open_artifact(&imported.path)?, &imported.path);
            let mut writer = self.directory.create_writer(&ArtifactKind::Source)?;
            let record_count =
                SourceNormalizer::new(&delimiters).normalize(&mut events, &mut writer, ctx)?;
            let committed = self
                .directory
                .commit(&ArtifactKind::Source, writer.finish()?)?;
            if let Committed::Unchanged(path) = &committed {
                self.directory.touch(path)?;
            }
            if record_count != delimiters.record_count {
                tracing::warn!(
                    spec = %self.spec(),
                    expected = delimiters.record_count,
                    actual = record_count,
                    "Record count differs from hints"
                );
            }

            let duration = started.elapsed();
            log_pass_complete!("convert", self.spec(), record_count, duration);
            Ok(ConversionSummary {
                record_count,
                committed,
                duration,
            })
        })
    }

    /// Current hash-qualified files to publish: source, then the latest
    /// mapping and validation per prefix
    pub fn upload_artifacts(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        if let Some(source) = self.directory.latest(&ArtifactKind::Source)? {
            files.push(source.path);
        }
        for family in [PrefixedFamily::Mapping, PrefixedFamily::Validation] {
            files.extend(
                self.directory
                    .latest_per_prefix(family)?
                    .into_values()
                    .map(|artifact| artifact.path),
            );
        }
        Ok(files)
    }

    /// Stores a new mapping version for `prefix`
    pub fn set_mapping<R: Read>(&self, prefix: &MetadataPrefix, input: R) -> Result<Committed> {
        self.store_hashed(ArtifactKind::Mapping(prefix.clone()), input)
    }

    /// Stores the validation outcome for `prefix`
    pub fn set_validation<R: Read>(&self, prefix: &MetadataPrefix, input: R) -> Result<Committed> {
        self.store_hashed(ArtifactKind::Validation(prefix.clone()), input)
    }

    fn store_hashed<R: Read>(&self, kind: ArtifactKind, mut input: R) -> Result<Committed> {
        let mut writer = self.directory.create_writer(&kind)?;
        std::io::copy(&mut input, &mut writer)?;
        self.directory.commit(&kind, writer.finish()?)
    }

    /// Latest mapping file per prefix
    pub fn latest_mappings(&self) -> Result<BTreeMap<MetadataPrefix, PathBuf>> {
        self.latest_paths(PrefixedFamily::Mapping)
    }

    pub fn set_report(&self, prefix: &MetadataPrefix, text: &str) -> Result<PathBuf> {
        self.directory
            .write_plain(&ArtifactKind::Report(prefix.clone()), text.as_bytes())
    }

    pub fn report(&self, prefix: &MetadataPrefix) -> Result<Option<String>> {
        match self.directory.latest(&ArtifactKind::Report(prefix.clone()))? {
            Some(artifact) => Ok(Some(std::fs::read_to_string(&artifact.path)?)),
            None => Ok(None),
        }
    }

    pub fn set_record_definition(&self, prefix: &MetadataPrefix, content: &[u8]) -> Result<PathBuf> {
        self.directory
            .write_plain(&ArtifactKind::RecordDefinition(prefix.clone()), content)
    }

    /// Record definition file per prefix
    pub fn record_definitions(&self) -> Result<BTreeMap<MetadataPrefix, PathBuf>> {
        self.latest_paths(PrefixedFamily::RecordDefinition)
    }

    /// Most recent artifact whose logical name matches `glob`
    pub fn find_latest(&self, glob: &str) -> Result<Option<PathBuf>> {
        let pattern = NamePattern::new(glob)?;
        Ok(self
            .directory
            .find_latest_by_glob(&pattern)?
            .map(|artifact| artifact.path))
    }

    fn latest_paths(&self, family: PrefixedFamily) -> Result<BTreeMap<MetadataPrefix, PathBuf>> {
        Ok(self
            .directory
            .latest_per_prefix(family)?
            .into_iter()
            .map(|(prefix, artifact)| (prefix, artifact.path))
            .collect())
    }

    /// Deletes the dataset directory with all artifacts
    pub fn delete(self) -> Result<()> {
        self.directory.delete()
    }

    /// Runs a pass with logging, progress bookkeeping and alerting
    fn pass<T>(
        &self,
        name: &'static str,
        listener: &mut dyn ProgressListener,
        token: CancellationToken,
        body: impl FnOnce(&mut PassContext<'_>) -> Result<T>,
    ) -> Result<T> {
        log_pass_start!(name, self.spec());
        let mut ctx = PassContext::new(listener, token);
        let result = body(&mut ctx);
        ctx.finish(result.is_ok());
        match &result {
            Err(StrataError::Cancelled) => {
                tracing::info!(pass = name, spec = %self.spec(), "Pass cancelled, nothing committed");
            }
            Err(e) => self
                .alerts
                .alert(&format!("{name} failed for dataset {}", self.spec()), e),
            Ok(_) => {}
        }
        result
    }
}
