//! Purpose: `rollbook` CLI entry point and argument surface.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit stable stdout formats (human or JSON by flag).
//! Invariants: Errors are emitted as JSON on non-interactive stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: All roster mutations go through the sync orchestrator.

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::aot::Shell;
use serde_json::{Value, json};

use rollbook::api::{
    AlwaysAffirm, BackendOptions, ClassName, Error, ErrorKind, FilterCriteria, Section,
    StudentRecord, SyncOrchestrator, TerminalConfirmation, resolve_backend_target, select_backend,
    to_exit_code,
};
use rollbook::api::{EnvSession, SessionBootstrap, default_data_dir};

mod command_dispatch;

use command_dispatch::dispatch_command;

const ENDPOINT_ENV_VAR: &str = "ROLLBOOK_ENDPOINT";

#[derive(Parser)]
#[command(
    name = "rollbook",
    version,
    about = "Student roster sync and query tool"
)]
struct Cli {
    /// Remote endpoint URL, or "local" for the on-disk store.
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Directory holding the local roster slot.
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Bearer token for the remote endpoint.
    #[arg(long, global = true)]
    token: Option<String>,

    /// File containing the bearer token.
    #[arg(long, global = true, value_name = "PATH")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the roster view, filtered, searched, and sorted by roll number.
    List(ListArgs),
    /// Add a new student record.
    Add(AddArgs),
    /// Update an existing record by id; the student id itself is immutable.
    Update(UpdateArgs),
    /// Delete a record by id (asks for confirmation unless --yes).
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
        #[arg(long)]
        json: bool,
    },
    /// Poll the backend on an interval and print roster changes.
    Watch {
        /// Poll interval in seconds.
        #[arg(long, default_value_t = 20)]
        interval: u64,
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts.
    Completion { shell: Shell },
}

#[derive(Args)]
struct ListArgs {
    /// Free-text search over id, name, roll, phone, and father's name.
    #[arg(long)]
    search: Option<String>,
    /// Filter by class (I through XII).
    #[arg(long)]
    class: Option<String>,
    /// Filter by section (MAHA, RISHI, NONE).
    #[arg(long)]
    section: Option<String>,
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct AddArgs {
    #[arg(long)]
    student_id: String,
    #[arg(long)]
    student_name: String,
    #[arg(long, default_value = "I")]
    class: String,
    #[arg(long, default_value = "MAHA")]
    section: String,
    #[arg(long, default_value = "")]
    roll_no: String,
    #[arg(long, default_value = "")]
    date_of_birth: String,
    #[arg(long, default_value = "")]
    father_name: String,
    #[arg(long, default_value = "")]
    phone_number: String,
    #[arg(long, default_value = "")]
    email_id: String,
    #[arg(long, default_value = "")]
    photo_url: String,
    #[arg(long, default_value = "")]
    signature_url: String,
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct UpdateArgs {
    /// Stable id of the record to edit.
    id: String,
    #[arg(long)]
    student_name: Option<String>,
    #[arg(long)]
    class: Option<String>,
    #[arg(long)]
    section: Option<String>,
    #[arg(long)]
    roll_no: Option<String>,
    #[arg(long)]
    date_of_birth: Option<String>,
    #[arg(long)]
    father_name: Option<String>,
    #[arg(long)]
    phone_number: Option<String>,
    #[arg(long)]
    email_id: Option<String>,
    #[arg(long)]
    photo_url: Option<String>,
    #[arg(long)]
    signature_url: Option<String>,
    #[arg(long)]
    json: bool,
}

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<RunOutcome, Error> {
    let endpoint = cli
        .endpoint
        .or_else(|| std::env::var(ENDPOINT_ENV_VAR).ok())
        .filter(|value| !value.trim().is_empty());
    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    dispatch_command(
        cli.command,
        CliContext {
            endpoint,
            data_dir,
            token: cli.token,
            token_file: cli.token_file,
        },
    )
}

struct CliContext {
    endpoint: Option<String>,
    data_dir: PathBuf,
    token: Option<String>,
    token_file: Option<PathBuf>,
}

impl CliContext {
    /// Resolve the backend once and inject it; no call site ever branches
    /// on which backend is active.
    fn orchestrator(&self) -> Result<SyncOrchestrator, Error> {
        let target = resolve_backend_target(self.endpoint.as_deref(), self.data_dir.clone())?;
        let session = EnvSession::new(self.token.clone(), self.token_file.clone());
        // The gateway needs the resolved token up front; resolve it through
        // the same bootstrap path the orchestrator will wait on.
        let token = session.wait_ready()?.token;
        let backend = select_backend(
            target,
            BackendOptions {
                token,
                ..BackendOptions::default()
            },
        );
        Ok(SyncOrchestrator::new(backend, Box::new(session)))
    }
}

fn parse_class_filter(input: &str) -> Result<ClassName, Error> {
    ClassName::parse(input).ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("unknown class: {input}"))
            .with_hint("Use a Roman numeral class I through XII.")
    })
}

fn parse_section_filter(input: &str) -> Result<Section, Error> {
    Section::parse(input).ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("unknown section: {input}"))
            .with_hint("Use MAHA, RISHI, or NONE.")
    })
}

/// Birth dates travel as plain `YYYY-MM-DD` strings; reject values that
/// are not real calendar dates before they reach a backend.
fn validate_birth_date(input: &str) -> Result<(), Error> {
    if input.trim().is_empty() {
        return Ok(());
    }
    let format = time::format_description::parse("[year]-[month]-[day]").map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to build date format")
            .with_source(err)
    })?;
    time::Date::parse(input.trim(), &format)
        .map(|_| ())
        .map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid date of birth: {input}"))
                .with_hint("Use a calendar date like 2015-05-15.")
                .with_source(err)
        })
}

fn criteria_from_flags(
    search: Option<&str>,
    class: Option<&str>,
    section: Option<&str>,
) -> Result<FilterCriteria, Error> {
    Ok(FilterCriteria {
        search: search.unwrap_or_default().to_string(),
        class: class.map(parse_class_filter).transpose()?,
        section: section.map(parse_section_filter).transpose()?,
    })
}

fn record_json(record: &StudentRecord) -> Value {
    serde_json::to_value(record).unwrap_or_else(|_| json!({}))
}

fn emit_json(value: Value) {
    println!("{value}");
}

fn emit_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|header| header.len()).collect();
    for row in rows {
        for (index, cell) in row.iter().enumerate() {
            if index < widths.len() {
                widths[index] = widths[index].max(cell.len());
            }
        }
    }
    let render = |cells: Vec<String>| {
        cells
            .iter()
            .enumerate()
            .map(|(index, cell)| format!("{cell:<width$}", width = widths[index]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    println!(
        "{}",
        render(headers.iter().map(|header| header.to_string()).collect())
    );
    for row in rows {
        println!("{}", render(row.clone()));
    }
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("error: {err}");
        if let Some(hint) = err.hint() {
            eprintln!("hint: {hint}");
        }
    } else {
        eprintln!("{}", error_json(err));
    }
}

fn error_json(err: &Error) -> Value {
    json!({
        "error": {
            "kind": format!("{:?}", err.kind()),
            "message": err.message(),
            "hint": err.hint(),
            "operation": err.operation(),
        }
    })
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}
