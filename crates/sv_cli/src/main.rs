// crates/sv_cli/src/main.rs
//
// Entry point for `svotes`: parse flags, resolve the store config, install
// logging, dispatch one subcommand, and map failures to exit codes.
// Outcomes go to stdout as JSON; logs and errors go to stderr.

mod args;

mod exitcodes {
    pub const OK: i32 = 0;
    pub const VALIDATION: i32 = 2;
    pub const NOT_FOUND: i32 = 3;
    pub const IO: i32 = 4;
}

use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use args::{Args, Command};
use sv_core::ApplicationPatch;
use sv_io::canonical_json::write_bytes_replacing;
use sv_io::config::{open_connection, StoreConfig};
use sv_io::import::{load_dataset, load_members};
use sv_io::IoError;
use sv_pipeline::PipelineError;
use sv_report::ReportError;

/// Central error type for CLI → exit-code mapping.
#[derive(Debug)]
enum MainError {
    /// Bad flags, schema/JSON shape, rejected values, bad config
    Validation(String),
    /// A referenced event/body/application does not exist
    NotFound(String),
    /// Filesystem and datastore failures
    Io(String),
}

impl std::fmt::Display for MainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MainError::Validation(m) => write!(f, "validation: {m}"),
            MainError::NotFound(m) => write!(f, "not found: {m}"),
            MainError::Io(m) => write!(f, "io: {m}"),
        }
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(a) => a,
        Err(e) => {
            // --help / --version are not failures.
            let rc = if e.use_stderr() { exitcodes::VALIDATION } else { exitcodes::OK };
            let _ = e.print();
            return ExitCode::from(rc as u8);
        }
    };

    let rc = match run(&args) {
        Ok(()) => exitcodes::OK,
        Err(e) => {
            eprintln!("svotes: error: {e}");
            map_error(&e)
        }
    };
    ExitCode::from(rc as u8)
}

fn run(args: &Args) -> Result<(), MainError> {
    args::validate(args).map_err(map_io_err)?;
    let cfg = args::resolve_store_config(args).map_err(map_io_err)?;
    init_logging(&cfg, args.quiet);
    debug!(database = %cfg.database_path.display(), "store config resolved");

    let mut conn = open_connection(&cfg).map_err(map_io_err)?;

    match &args.command {
        Command::Init => {
            info!(database = %cfg.database_path.display(), "schema ready");
            print_json(&serde_json::json!({ "database": cfg.database_path.display().to_string() }))
        }
        Command::Import { dataset } => {
            let loaded = load_dataset(dataset).map_err(map_io_err)?;
            let outcome = sv_pipeline::import_dataset(&mut conn, &loaded.dataset).map_err(map_pipeline_err)?;
            print_json(&serde_json::json!({
                "dataset_sha256": loaded.sha256,
                "summary": outcome.summary,
                "events": outcome.events,
            }))
        }
        Command::Recalculate { event, body } => match body {
            Some(body) => {
                let out = sv_pipeline::recalculate_antenna_votes_by_id(&mut conn, *event, *body)
                    .map_err(map_pipeline_err)?;
                print_json(&out)
            }
            None => {
                let out = sv_pipeline::recalculate_event_by_id(&mut conn, *event).map_err(map_pipeline_err)?;
                print_json(&out)
            }
        },
        Command::UpdateApplication { id, patch } => {
            let patch: ApplicationPatch =
                serde_json::from_str(patch).map_err(|e| MainError::Validation(format!("--patch: {e}")))?;
            let out = sv_pipeline::update_application(&mut conn, *id, &patch).map_err(map_pipeline_err)?;
            print_json(&out)
        }
        Command::UploadMembers { event, body, file } => {
            let members = load_members(file).map_err(map_io_err)?;
            let out = sv_pipeline::upload_membership(&mut conn, *event, *body, &members).map_err(map_pipeline_err)?;
            print_json(&out)
        }
        Command::SetEventType { event, event_type } => {
            let out = sv_pipeline::change_event_type(&mut conn, *event, *event_type).map_err(map_pipeline_err)?;
            print_json(&out)
        }
        Command::Report { event, out } => {
            let report = sv_report::build_event_report(&conn, *event).map_err(map_report_err)?;
            let text = sv_report::render_json(&report).map_err(map_report_err)?;
            match out {
                Some(path) => {
                    write_bytes_replacing(path, text.as_bytes()).map_err(map_io_err)?;
                    info!(event_id = event.get(), path = %path.display(), "report written");
                    Ok(())
                }
                None => {
                    print!("{text}");
                    Ok(())
                }
            }
        }
    }
}

/// RUST_LOG wins, then the config's `log_filter`, then `info` (`warn` when quiet).
fn init_logging(cfg: &StoreConfig, quiet: bool) {
    let fallback = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(cfg.log_filter.as_deref().unwrap_or(fallback)))
        .unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_json<T: Serialize>(value: &T) -> Result<(), MainError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| MainError::Io(format!("encode output: {e}")))?;
    println!("{text}");
    Ok(())
}

/// Map our typed errors to the exit-code table.
fn map_error(e: &MainError) -> i32 {
    use exitcodes::*;
    match e {
        MainError::Validation(_) => VALIDATION,
        MainError::NotFound(_) => NOT_FOUND,
        MainError::Io(_) => IO,
    }
}

/// Translate sv_io::IoError into MainError buckets.
fn map_io_err(e: IoError) -> MainError {
    match e {
        IoError::Schema { pointer, msg } => MainError::Validation(format!("schema {pointer}: {msg}")),
        IoError::Json { pointer, msg } => MainError::Validation(format!("json {pointer}: {msg}")),
        IoError::Config(m) => MainError::Validation(format!("config: {m}")),
        IoError::Invalid(m) => MainError::Validation(m),
        e @ IoError::NotFound { .. } => MainError::NotFound(e.to_string()),
        e @ IoError::Sqlite(_) if e.is_transient() => MainError::Io(format!("{e} (datastore busy, retry)")),
        IoError::Sqlite(e) => MainError::Io(format!("sqlite: {e}")),
        IoError::Path(m) => MainError::Io(format!("path: {m}")),
        IoError::Hash(m) => MainError::Io(format!("hash: {m}")),
    }
}

fn map_pipeline_err(e: PipelineError) -> MainError {
    match e {
        e @ PipelineError::NotFound { .. } => MainError::NotFound(e.to_string()),
        PipelineError::Invalid(m) => MainError::Validation(m),
        PipelineError::Store(io) => map_io_err(io),
    }
}

fn map_report_err(e: ReportError) -> MainError {
    match e {
        ReportError::Store(io) => map_io_err(io),
        ReportError::Render(m) => MainError::Io(format!("render: {m}")),
    }
}
