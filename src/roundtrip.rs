//! Round-trip checking
//!
//! Runs XSD → JSON Schema → normalized JSON Schema → XSD and compares the
//! reconstruction with the original. [`RoundTripRunner`] applies this to a
//! directory of `.xsd` files, one outcome per file: a failure in one file
//! never aborts the batch.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::comparison::{is_equivalent_to, Difference, Differences, EquivalenceOptions};
use crate::converters::{ConverterConfig, JsonToXsdConverter, XsdToJsonConverter};
use crate::error::{Converted, Error, LossyConversionWarning, Result};
use crate::json::{JsonSchema, Normalizer, NormalizerConfig};
use crate::validators::InstanceValidator;
use crate::xsd::Schema;

/// Batch configuration
#[derive(Debug, Clone, Default)]
pub struct RoundTripConfig {
    /// Process files on the rayon pool
    parallel: bool,
    /// Per-file time budget
    timeout: Option<Duration>,
    /// Where intermediate JSON Schemas are written
    json_output_dir: Option<PathBuf>,
    /// Skip schemas that are not SERES-generated
    seres_only: bool,
    converter: ConverterConfig,
    normalizer: NormalizerConfig,
    equivalence: EquivalenceOptions,
}

impl RoundTripConfig {
    /// Create a configuration: sequential, no timeout, nothing written
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether files are processed in parallel
    pub fn parallel(&self) -> bool {
        self.parallel
    }

    /// Per-file timeout
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Output directory for intermediate JSON Schemas
    pub fn json_output_dir(&self) -> Option<&Path> {
        self.json_output_dir.as_deref()
    }

    /// Whether non-SERES schemas are skipped
    pub fn seres_only(&self) -> bool {
        self.seres_only
    }

    /// Converter settings for both directions
    pub fn converter(&self) -> &ConverterConfig {
        &self.converter
    }

    /// Normalizer settings
    pub fn normalizer(&self) -> &NormalizerConfig {
        &self.normalizer
    }

    /// Equivalence settings
    pub fn equivalence(&self) -> &EquivalenceOptions {
        &self.equivalence
    }

    /// Set parallel processing
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the per-file timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the JSON output directory
    pub fn with_json_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.json_output_dir = dir;
        self
    }

    /// Set SERES filtering
    pub fn with_seres_only(mut self, seres_only: bool) -> Self {
        self.seres_only = seres_only;
        self
    }

    /// Set the converter configuration
    pub fn with_converter(mut self, converter: ConverterConfig) -> Self {
        self.converter = converter;
        self
    }

    /// Set the normalizer configuration
    pub fn with_normalizer(mut self, normalizer: NormalizerConfig) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Set the equivalence options
    pub fn with_equivalence(mut self, equivalence: EquivalenceOptions) -> Self {
        self.equivalence = equivalence;
        self
    }
}

/// Products of one round trip
#[derive(Debug, Clone)]
pub struct RoundTrip {
    /// Normalized intermediate JSON Schema
    pub json: JsonSchema,
    /// Reconstructed XSD graph
    pub reconstructed: Schema,
    /// Warnings of all three steps, in order
    pub warnings: Vec<LossyConversionWarning>,
}

/// XSD → JSON Schema, normalized
pub fn to_normalized_json(schema: &Schema, config: &RoundTripConfig) -> Result<Converted<JsonSchema>> {
    let (json, mut warnings) = XsdToJsonConverter::new(config.converter.clone())
        .convert(schema)?
        .into_parts();
    let (normalized, more) = Normalizer::new(config.normalizer.clone())
        .normalize(&json)?
        .into_parts();
    warnings.extend(more);
    Ok(Converted::new(normalized, warnings))
}

/// Convert `schema` to JSON Schema and back
pub fn round_trip(schema: &Schema, config: &RoundTripConfig) -> Result<RoundTrip> {
    let (json, mut warnings) = to_normalized_json(schema, config)?.into_parts();
    let (reconstructed, more) = JsonToXsdConverter::new(config.converter.clone())
        .convert(&json)?
        .into_parts();
    warnings.extend(more);
    Ok(RoundTrip {
        json,
        reconstructed,
        warnings,
    })
}

/// Result of checking one schema
#[derive(Debug)]
pub enum Outcome {
    /// Reconstruction is equivalent to the original
    Success {
        /// Fidelity notices raised on the way
        warnings: Vec<LossyConversionWarning>,
    },
    /// Round trip completed but the graphs differ
    Inequivalent(Differences),
    /// Reading or converting failed
    Failed(Error),
    /// The time budget ran out
    TimedOut,
}

impl Outcome {
    /// Whether the round trip succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Short label for reports
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "ok",
            Outcome::Inequivalent(_) => "inequivalent",
            Outcome::Failed(_) => "failed",
            Outcome::TimedOut => "timed out",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success { warnings } if warnings.is_empty() => f.write_str("ok"),
            Outcome::Success { warnings } => {
                write!(f, "ok with {} lossy warning(s)", warnings.len())?;
                for warning in warnings {
                    write!(f, "\n  - {}", warning)?;
                }
                Ok(())
            }
            Outcome::Inequivalent(differences) => write!(f, "inequivalent: {}", differences),
            Outcome::Failed(error) => write!(f, "failed: {}", error),
            Outcome::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Outcome for one file
#[derive(Debug)]
pub struct FileReport {
    /// Schema file
    pub path: PathBuf,
    /// SERES classification (None when the file could not be read)
    pub is_seres: Option<bool>,
    /// What happened
    pub outcome: Outcome,
    /// Wall time spent
    pub elapsed: Duration,
}

impl fmt::Display for FileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seres = match self.is_seres {
            Some(true) => " [SERES]",
            _ => "",
        };
        write!(f, "{}{}: {}", self.path.display(), seres, self.outcome)
    }
}

/// Outcomes of a batch, in file order
#[derive(Debug, Default)]
pub struct RoundTripReport {
    /// One report per processed file
    pub files: Vec<FileReport>,
}

impl RoundTripReport {
    /// Number of files that round-tripped
    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|r| r.outcome.is_success()).count()
    }

    /// Number of files that did not
    pub fn failed(&self) -> usize {
        self.files.len() - self.succeeded()
    }

    /// Number of SERES schemas among the processed files
    pub fn seres(&self) -> usize {
        self.files.iter().filter(|r| r.is_seres == Some(true)).count()
    }

    /// Whether every file round-tripped
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Report for a file
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&FileReport> {
        self.files.iter().find(|r| r.path == path.as_ref())
    }
}

impl fmt::Display for RoundTripReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.files {
            writeln!(f, "{}", report)?;
        }
        write!(
            f,
            "{} file(s): {} ok, {} failed ({} SERES)",
            self.files.len(),
            self.succeeded(),
            self.failed(),
            self.seres()
        )
    }
}

/// Batch round-trip driver
#[derive(Debug, Clone, Default)]
pub struct RoundTripRunner {
    config: RoundTripConfig,
}

impl RoundTripRunner {
    /// Create a runner
    pub fn new(config: RoundTripConfig) -> Self {
        Self { config }
    }

    /// The configuration in use
    pub fn config(&self) -> &RoundTripConfig {
        &self.config
    }

    /// Check every `*.xsd` below `dir`
    pub fn run_dir(&self, dir: impl AsRef<Path>) -> Result<RoundTripReport> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a directory", dir.display()),
            )));
        }

        let mut files = Vec::new();
        let mut unreadable = Vec::new();
        for entry in WalkDir::new(dir).follow_links(true) {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    let path = entry.into_path();
                    if path.extension().map(|ext| ext == "xsd").unwrap_or(false) {
                        files.push(path);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    let path = e.path().unwrap_or(dir).to_path_buf();
                    warn!(path = %path.display(), error = %e, "cannot walk schema directory entry");
                    unreadable.push(FileReport {
                        path,
                        is_seres: None,
                        outcome: Outcome::Failed(Error::Io(e.into())),
                        elapsed: Duration::ZERO,
                    });
                }
            }
        }
        files.sort();

        info!(dir = %dir.display(), files = files.len(), "starting round trip batch");
        let mut report = self.run_files(dir, &files);
        report.files.extend(unreadable);
        Ok(report)
    }

    /// Check the given files; output names are taken relative to `base`
    pub fn run_files(&self, base: &Path, files: &[PathBuf]) -> RoundTripReport {
        let run = |path: &PathBuf| -> Option<FileReport> {
            let relative = path.strip_prefix(base).unwrap_or(path).to_path_buf();
            self.run_one(path, &relative)
        };

        let files: Vec<FileReport> = if self.config.parallel {
            files.par_iter().filter_map(run).collect()
        } else {
            files.iter().filter_map(run).collect()
        };

        let report = RoundTripReport { files };
        info!(
            ok = report.succeeded(),
            failed = report.failed(),
            "round trip batch finished"
        );
        report
    }

    /// Check a single file. `None` when it is filtered out as non-SERES.
    pub fn run_file(&self, path: impl AsRef<Path>) -> Option<FileReport> {
        let path = path.as_ref();
        let relative = path.file_name().map(PathBuf::from).unwrap_or_else(|| path.to_path_buf());
        self.run_one(path, &relative)
    }

    fn run_one(&self, path: &Path, relative: &Path) -> Option<FileReport> {
        let started = Instant::now();
        let (is_seres, outcome) = match self.config.timeout {
            None => check_file(path, relative, &self.config)?,
            Some(timeout) => {
                let owned_path = path.to_path_buf();
                let owned_relative = relative.to_path_buf();
                let config = self.config.clone();
                match with_timeout(timeout, move || check_file(&owned_path, &owned_relative, &config)) {
                    Ok(result) => result?,
                    Err(RecvTimeoutError::Timeout) => {
                        warn!(path = %path.display(), ?timeout, "round trip timed out");
                        (None, Outcome::TimedOut)
                    }
                    Err(RecvTimeoutError::Disconnected) => (None, Outcome::Failed(worker_died(path))),
                }
            }
        };

        let report = FileReport {
            path: path.to_path_buf(),
            is_seres,
            outcome,
            elapsed: started.elapsed(),
        };
        match &report.outcome {
            Outcome::Success { .. } => info!(path = %path.display(), "round trip ok"),
            other => warn!(path = %path.display(), outcome = other.label(), "round trip failed"),
        }
        Some(report)
    }
}

/// Run `work` on its own thread. A worker still running after `timeout` is
/// left detached; `Disconnected` means it panicked.
fn with_timeout<T: Send + 'static>(
    timeout: Duration,
    work: impl FnOnce() -> T + Send + 'static,
) -> std::result::Result<T, RecvTimeoutError> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        // The receiver is gone after a timeout; nothing to report then
        let _ = tx.send(work());
    });
    rx.recv_timeout(timeout)
}

fn worker_died(path: &Path) -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("round trip worker for {} panicked", path.display()),
    ))
}

/// Read, convert, compare. `None` when filtered out.
fn check_file(path: &Path, relative: &Path, config: &RoundTripConfig) -> Option<(Option<bool>, Outcome)> {
    let schema = match Schema::from_file_with_limits(path, config.converter.limits()) {
        Ok(schema) => schema,
        Err(e) => return Some((None, Outcome::Failed(e))),
    };

    let is_seres = schema.is_seres();
    if config.seres_only && !is_seres {
        debug!(path = %path.display(), "skipping non-SERES schema");
        return None;
    }
    Some((Some(is_seres), check_schema(&schema, path, relative, config)))
}

fn check_schema(schema: &Schema, path: &Path, relative: &Path, config: &RoundTripConfig) -> Outcome {
    let (json, mut warnings) = match to_normalized_json(schema, config) {
        Ok(converted) => converted.into_parts(),
        Err(e) => return Outcome::Failed(e),
    };

    if let Some(dir) = &config.json_output_dir {
        if let Err(e) = write_json(&json, &dir.join(relative).with_extension("json")) {
            return Outcome::Failed(e);
        }
    }

    let reconstructed = match JsonToXsdConverter::new(config.converter.clone()).convert(&json) {
        Ok(converted) => {
            let (reconstructed, more) = converted.into_parts();
            warnings.extend(more);
            reconstructed
        }
        Err(e) => return Outcome::Failed(e),
    };

    let mut differences = match is_equivalent_to(schema, &reconstructed, &config.equivalence) {
        Ok(()) => Differences::new(),
        Err(differences) => differences,
    };
    for difference in sample_differences(schema, &reconstructed, path) {
        differences.push(difference);
    }

    if differences.is_empty() {
        Outcome::Success { warnings }
    } else {
        Outcome::Inequivalent(differences)
    }
}

fn write_json(json: &JsonSchema, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    json.write_to_file(target)?;
    debug!(path = %target.display(), "wrote intermediate JSON Schema");
    Ok(())
}

/// Sample instances next to a schema: `<stem>.xml` and `<stem>.*.xml`
fn sample_instances(path: &Path) -> Vec<PathBuf> {
    let (Some(dir), Some(stem)) = (path.parent(), path.file_stem().and_then(|s| s.to_str())) else {
        return Vec::new();
    };
    let prefix = format!("{}.", stem);
    let mut samples: Vec<PathBuf> = std::fs::read_dir(dir)
        .into_iter()
        .flatten()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "xml").unwrap_or(false))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&prefix))
                .unwrap_or(false)
        })
        .collect();
    samples.sort();
    samples
}

/// Samples that validate against one schema but not the other
fn sample_differences(original: &Schema, reconstructed: &Schema, path: &Path) -> Vec<Difference> {
    let before = InstanceValidator::new(original);
    let after = InstanceValidator::new(reconstructed);

    sample_instances(path)
        .into_iter()
        .filter_map(|sample| {
            let (expected_valid, expected) = validity(before.validate_file(&sample));
            let (actual_valid, actual) = validity(after.validate_file(&sample));
            (expected_valid != actual_valid).then(|| {
                Difference::new(
                    format!("instance '{}'", sample.display()),
                    "validity",
                    expected,
                    actual,
                )
            })
        })
        .collect()
}

/// Whether a sample is valid, with a description for the report
fn validity(result: Result<Vec<crate::error::ValidationError>>) -> (bool, String) {
    match result {
        Ok(errors) if errors.is_empty() => (true, "valid".to_string()),
        Ok(errors) => (false, format!("invalid ({})", errors[0].message)),
        Err(e) => (false, format!("unreadable ({})", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERSON: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="person" type="PersonType"/>
  <xs:complexType name="PersonType">
    <xs:sequence>
      <xs:element name="name" type="xs:string"/>
      <xs:element name="age" type="Age" minOccurs="0"/>
    </xs:sequence>
    <xs:attribute name="id" type="xs:string" use="required"/>
  </xs:complexType>
  <xs:simpleType name="Age">
    <xs:restriction base="xs:integer">
      <xs:minInclusive value="0"/>
      <xs:maxInclusive value="150"/>
    </xs:restriction>
  </xs:simpleType>
</xs:schema>"#;

    #[test]
    fn test_worker_panic_is_not_a_timeout() {
        let result = with_timeout(Duration::from_secs(10), || -> u32 { panic!("worker failure") });
        assert_eq!(result, Err(RecvTimeoutError::Disconnected));

        let result = with_timeout(Duration::from_millis(10), || std::thread::sleep(Duration::from_secs(1)));
        assert_eq!(result, Err(RecvTimeoutError::Timeout));

        assert_eq!(with_timeout(Duration::from_secs(10), || 7), Ok(7));
        assert!(worker_died(Path::new("a.xsd")).to_string().contains("a.xsd"));
    }

    #[test]
    fn test_round_trip_is_equivalent() {
        let schema: Schema = PERSON.parse().unwrap();
        let trip = round_trip(&schema, &RoundTripConfig::default()).unwrap();
        assert!(is_equivalent_to(&schema, &trip.reconstructed, &EquivalenceOptions::default()).is_ok());
        assert!(trip.json.definitions.contains("PersonType"));
    }

    #[test]
    fn test_check_schema_success() {
        let schema: Schema = PERSON.parse().unwrap();
        let outcome = check_schema(
            &schema,
            Path::new("person.xsd"),
            Path::new("person.xsd"),
            &RoundTripConfig::default(),
        );
        assert!(outcome.is_success(), "{}", outcome);
    }

    #[test]
    fn test_report_counts() {
        let report = RoundTripReport {
            files: vec![
                FileReport {
                    path: PathBuf::from("a.xsd"),
                    is_seres: Some(true),
                    outcome: Outcome::Success { warnings: Vec::new() },
                    elapsed: Duration::ZERO,
                },
                FileReport {
                    path: PathBuf::from("b.xsd"),
                    is_seres: None,
                    outcome: Outcome::TimedOut,
                    elapsed: Duration::ZERO,
                },
            ],
        };
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.seres(), 1);
        assert!(!report.is_success());
        assert!(report.to_string().ends_with("2 file(s): 1 ok, 1 failed (1 SERES)"));
    }

    #[test]
    fn test_config_builder() {
        let config = RoundTripConfig::new()
            .with_parallel(true)
            .with_timeout(Some(Duration::from_secs(5)))
            .with_seres_only(true);
        assert!(config.parallel());
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        assert!(config.seres_only());
        assert!(config.json_output_dir().is_none());
    }
}
