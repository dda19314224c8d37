//! Command-line interface for xsd-jsonschema

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use std::time::Duration;

#[cfg(feature = "cli")]
use tracing::warn;
#[cfg(feature = "cli")]
use tracing_subscriber::EnvFilter;

#[cfg(feature = "cli")]
use xsd_jsonschema::comparison::{is_equivalent_to, EquivalenceOptions};
#[cfg(feature = "cli")]
use xsd_jsonschema::converters::{ConverterConfig, JsonToXsdConverter, XsdToJsonConverter};
#[cfg(feature = "cli")]
use xsd_jsonschema::json::{JsonSchema, Normalizer, NormalizerConfig};
#[cfg(feature = "cli")]
use xsd_jsonschema::roundtrip::{RoundTripConfig, RoundTripRunner};
#[cfg(feature = "cli")]
use xsd_jsonschema::validators::InstanceValidator;
#[cfg(feature = "cli")]
use xsd_jsonschema::xsd::Schema;
#[cfg(feature = "cli")]
use xsd_jsonschema::LossyConversionWarning;

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xsd-jsonschema")]
#[command(author, version, about = "XSD <-> JSON Schema conversion and round-trip checking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(clap::Args, Debug)]
struct ConverterArgs {
    /// Property key for simple content of complex types
    #[arg(long, default_value = "value")]
    text_key: String,

    /// Prefix for attribute keys that collide with element keys
    #[arg(long, default_value = "@")]
    attr_prefix: String,

    /// Prefix of the XSD namespace in written schemas
    #[arg(long, default_value = "xs")]
    xsd_prefix: String,

    /// Indentation of written documents
    #[arg(long, default_value_t = 2)]
    indent: usize,

    /// Leave annotations out of produced JSON Schemas
    #[arg(long)]
    no_annotations: bool,
}

#[cfg(feature = "cli")]
impl ConverterArgs {
    fn config(&self) -> ConverterConfig {
        ConverterConfig::new()
            .with_text_key(self.text_key.clone())
            .with_attr_prefix(self.attr_prefix.clone())
            .with_xsd_prefix(self.xsd_prefix.clone())
            .with_indent(self.indent)
            .with_emit_annotations(!self.no_annotations)
    }
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert an XSD schema to JSON Schema
    #[command(name = "xsd2json")]
    XsdToJson {
        /// Path to the XSD schema file
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Normalize the produced JSON Schema
        #[arg(short, long)]
        normalize: bool,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        converter: ConverterArgs,
    },

    /// Convert a JSON Schema to XSD
    #[command(name = "json2xsd")]
    JsonToXsd {
        /// Path to the JSON Schema file
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Collapse definitions that only alias another definition (lossy)
        #[arg(long)]
        collapse_aliases: bool,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        converter: ConverterArgs,
    },

    /// Round-trip every XSD in a directory (or a single file)
    Roundtrip {
        /// Directory or XSD file
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Process files in parallel
        #[arg(short, long)]
        parallel: bool,

        /// Per-file timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Write intermediate JSON Schemas to this directory
        #[arg(long, value_name = "DIR")]
        json_out: Option<PathBuf>,

        /// Only process SERES-generated schemas
        #[arg(long)]
        seres_only: bool,

        /// Ignore annotations when comparing
        #[arg(long)]
        ignore_annotations: bool,

        #[command(flatten)]
        converter: ConverterArgs,
    },

    /// Compare two XSD schemas structurally
    Compare {
        /// Expected schema
        #[arg(value_name = "EXPECTED")]
        expected: PathBuf,

        /// Actual schema
        #[arg(value_name = "ACTUAL")]
        actual: PathBuf,

        /// Ignore annotations
        #[arg(long)]
        ignore_annotations: bool,
    },

    /// Validate an XML document against an XSD schema
    Validate {
        /// Path to the XSD schema file
        #[arg(short, long, value_name = "SCHEMA")]
        schema: PathBuf,

        /// Path to the XML file to validate
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[cfg(feature = "cli")]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::XsdToJson {
            schema,
            normalize,
            output,
            converter,
        } => cmd_xsd2json(schema, normalize, output, converter.config()),
        Commands::JsonToXsd {
            schema,
            collapse_aliases,
            output,
            converter,
        } => cmd_json2xsd(schema, collapse_aliases, output, converter.config()),
        Commands::Roundtrip {
            path,
            parallel,
            timeout,
            json_out,
            seres_only,
            ignore_annotations,
            converter,
        } => {
            let config = RoundTripConfig::new()
                .with_parallel(parallel)
                .with_timeout(timeout.map(Duration::from_secs))
                .with_json_output_dir(json_out)
                .with_seres_only(seres_only)
                .with_equivalence(EquivalenceOptions::new().with_compare_annotations(!ignore_annotations))
                .with_converter(converter.config());
            cmd_roundtrip(path, config)
        }
        Commands::Compare {
            expected,
            actual,
            ignore_annotations,
        } => cmd_compare(expected, actual, ignore_annotations),
        Commands::Validate { schema, file } => cmd_validate(schema, file),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

#[cfg(feature = "cli")]
type CliResult = Result<bool, Box<dyn std::error::Error>>;

#[cfg(feature = "cli")]
fn report_warnings(warnings: &[LossyConversionWarning]) {
    for warning in warnings {
        warn!(%warning, "lossy conversion");
    }
}

#[cfg(feature = "cli")]
fn emit(text: &str, output: Option<PathBuf>) -> std::io::Result<()> {
    match output {
        Some(path) => fs::write(path, text),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

#[cfg(feature = "cli")]
fn cmd_xsd2json(
    schema_path: PathBuf,
    normalize: bool,
    output: Option<PathBuf>,
    config: ConverterConfig,
) -> CliResult {
    let schema = Schema::from_file_with_limits(&schema_path, config.limits())?;
    let (mut json, warnings) = XsdToJsonConverter::new(config).convert(&schema)?.into_parts();
    report_warnings(&warnings);

    if normalize {
        let (normalized, warnings) = Normalizer::default().normalize(&json)?.into_parts();
        report_warnings(&warnings);
        json = normalized;
    }

    emit(&json.to_json_string()?, output)?;
    Ok(true)
}

#[cfg(feature = "cli")]
fn cmd_json2xsd(
    schema_path: PathBuf,
    collapse_aliases: bool,
    output: Option<PathBuf>,
    config: ConverterConfig,
) -> CliResult {
    let json = JsonSchema::from_file(&schema_path)?;
    let normalizer = Normalizer::new(NormalizerConfig::new().with_collapse_aliases(collapse_aliases));
    let (normalized, warnings) = normalizer.normalize(&json)?.into_parts();
    report_warnings(&warnings);

    let options = config.write_options();
    let (schema, warnings) = JsonToXsdConverter::new(config).convert(&normalized)?.into_parts();
    report_warnings(&warnings);

    emit(&schema.to_xml_string(&options)?, output)?;
    Ok(true)
}

#[cfg(feature = "cli")]
fn cmd_roundtrip(path: PathBuf, config: RoundTripConfig) -> CliResult {
    let runner = RoundTripRunner::new(config);

    let report = if path.is_dir() {
        runner.run_dir(&path)?
    } else {
        let base = path.parent().map(PathBuf::from).unwrap_or_default();
        runner.run_files(&base, &[path.clone()])
    };

    println!("{}", report);
    Ok(report.is_success())
}

#[cfg(feature = "cli")]
fn cmd_compare(expected: PathBuf, actual: PathBuf, ignore_annotations: bool) -> CliResult {
    let expected = Schema::from_file(&expected)?;
    let actual = Schema::from_file(&actual)?;
    let options = EquivalenceOptions::new().with_compare_annotations(!ignore_annotations);

    match is_equivalent_to(&expected, &actual, &options) {
        Ok(()) => {
            println!("Schemas are equivalent");
            Ok(true)
        }
        Err(differences) => {
            println!("{}", differences);
            Ok(false)
        }
    }
}

#[cfg(feature = "cli")]
fn cmd_validate(schema_path: PathBuf, file: PathBuf) -> CliResult {
    let schema = Schema::from_file(&schema_path)?;
    let errors = InstanceValidator::new(&schema).validate_file(&file)?;

    if errors.is_empty() {
        println!("✓ Document is valid");
        return Ok(true);
    }

    println!("✗ Document is invalid");
    println!();
    println!("Errors:");
    for error in &errors {
        match &error.path {
            Some(path) => println!("  - {}: {}", path, error.message),
            None => println!("  - {}", error.message),
        }
        if let Some(reason) = &error.reason {
            println!("      {}", reason);
        }
    }
    Ok(false)
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
