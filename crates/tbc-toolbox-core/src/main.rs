//! `tbc-process`: run an observer pipeline over a TBC capture and, optionally, the
//! field-mapping analysis.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tbc_toolbox_core::analysis::{
    AnalysisStatus, FieldMappingAnalyzer, FieldMappingOptions, NullProgress,
};
use tbc_toolbox_core::obs::ObservationContext;
use tbc_toolbox_core::observers::validate_observer_sequence;
use tbc_toolbox_core::pipeline::PipelineDescription;
use tbc_toolbox_core::repr::{FieldRepresentation, ObservationAttachment};
use tbc_toolbox_core::tbc::TbcFieldRepresentation;

#[derive(Debug, Parser)]
#[command(
    name = "tbc-process",
    about = "Decode and analyze a time-base-corrected LaserDisc capture"
)]
struct Cli {
    /// Pipeline description file (YAML).
    #[arg(long)]
    pipeline: PathBuf,

    /// TBC capture file.
    #[arg(long)]
    tbc: PathBuf,

    /// Sidecar metadata file; defaults to `<tbc>.json`.
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Run the field-mapping analysis and print the mapping specification.
    #[arg(long)]
    map: bool,

    /// Drop frames whose VBI number cannot be recovered instead of failing.
    #[arg(long)]
    delete_unmappable: bool,

    /// Leave numbering gaps unpadded.
    #[arg(long)]
    no_pad_gaps: bool,

    /// Increase log verbosity (repeat for more).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("tbc-process: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let description =
        PipelineDescription::load(&cli.pipeline).map_err(|e| e.to_string())?;
    info!(name = %description.name, version = %description.version, "loaded pipeline");

    let observers = description.build_observers().map_err(|e| e.to_string())?;
    let report = validate_observer_sequence(&observers);
    if !report.is_valid() {
        return Err(format!("pipeline validation failed:\n{}", report.errors.join("\n")));
    }
    for warning in &report.warnings {
        tracing::warn!("{warning}");
    }

    let source = TbcFieldRepresentation::open(&cli.tbc, cli.metadata.as_deref())
        .map_err(|e| e.to_string())?;
    info!(fields = source.field_count(), "opened capture");

    // Register every observer's schema, then walk the capture field by field.  Observers run
    // in pipeline order within a field, so later ones see earlier results through history.
    let mut observations = ObservationContext::new();
    for observer in &observers {
        observations
            .register_schema(&observer.provided_observations())
            .map_err(|e| e.to_string())?;
    }
    for field_id in source.field_range().iter() {
        for observer in &observers {
            let records = observer.process_field(&source, field_id, &observations.history());
            observations.apply_records(field_id, records);
        }
    }
    info!(fields = observations.field_count(), "observer run complete");

    if cli.map {
        let attached =
            ObservationAttachment::new(std::sync::Arc::new(source), observations);
        let analyzer = FieldMappingAnalyzer::new(FieldMappingOptions {
            delete_unmappable_frames: cli.delete_unmappable,
            pad_gaps: !cli.no_pad_gaps,
        });
        let decision = analyzer.analyze(&attached, &NullProgress);
        for warning in &decision.warnings {
            eprintln!("warning: {warning}");
        }
        match (decision.status, decision.mapping_spec) {
            (AnalysisStatus::Success, Some(spec)) => {
                eprintln!("{}", decision.rationale.trim_end());
                println!("{spec}");
            }
            _ => return Err(decision.rationale.trim_end().to_owned()),
        }
    }

    Ok(())
}
