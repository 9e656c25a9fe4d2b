//! Purpose: Hold top-level CLI command execution for `rollbook`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate commands.
//! Invariants: Output envelopes and exit-code semantics stay stable.
//! Invariants: Every mutation goes through the sync orchestrator.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use super::*;

pub(super) fn dispatch_command(command: Command, ctx: CliContext) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "rollbook", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::List(args) => {
            let criteria = criteria_from_flags(
                args.search.as_deref(),
                args.class.as_deref(),
                args.section.as_deref(),
            )?;
            let mut sync = ctx.orchestrator()?;
            sync.load()?;
            let view = sync.view(&criteria);
            if args.json {
                emit_json(json!({
                    "students": view.iter().map(record_json).collect::<Vec<_>>(),
                    "total": view.len(),
                }));
            } else {
                let rows: Vec<Vec<String>> = view
                    .iter()
                    .map(|record| {
                        vec![
                            record.id.clone(),
                            record.student_id.clone(),
                            record.student_name.clone(),
                            record.class_name.as_str().to_string(),
                            record.section.as_str().to_string(),
                            record.roll_no.clone(),
                        ]
                    })
                    .collect();
                emit_table(
                    &["ID", "STUDENT-ID", "NAME", "CLASS", "SECTION", "ROLL"],
                    &rows,
                );
            }
            Ok(RunOutcome::ok())
        }
        Command::Add(args) => {
            validate_birth_date(&args.date_of_birth)?;
            let record = StudentRecord {
                id: String::new(),
                student_id: args.student_id,
                student_name: args.student_name,
                class_name: parse_class_filter(&args.class)?,
                section: parse_section_filter(&args.section)?,
                roll_no: args.roll_no,
                date_of_birth: args.date_of_birth,
                father_name: args.father_name,
                phone_number: args.phone_number,
                email_id: args.email_id,
                photo_url: args.photo_url,
                signature_url: args.signature_url,
            };
            let mut sync = ctx.orchestrator()?;
            sync.save(&record)?;
            let saved = sync
                .roster()
                .iter()
                .find(|entry| entry.student_id == record.student_id)
                .cloned();
            if args.json {
                emit_json(json!({
                    "saved": saved.as_ref().map(record_json),
                    "total": sync.roster().len(),
                }));
            } else if let Some(saved) = &saved {
                println!("Added {} (id {})", saved.student_name, saved.id);
            }
            Ok(RunOutcome::ok())
        }
        Command::Update(args) => {
            let mut sync = ctx.orchestrator()?;
            sync.load()?;
            let mut record = sync
                .roster()
                .iter()
                .find(|entry| entry.id == args.id)
                .cloned()
                .ok_or_else(|| {
                    Error::new(ErrorKind::NotFound)
                        .with_message(format!("no record with id {}", args.id))
                        .with_hint("Use `rollbook list` to see current ids.")
                })?;
            if let Some(value) = args.student_name {
                record.student_name = value;
            }
            if let Some(value) = args.class {
                record.class_name = parse_class_filter(&value)?;
            }
            if let Some(value) = args.section {
                record.section = parse_section_filter(&value)?;
            }
            if let Some(value) = args.roll_no {
                record.roll_no = value;
            }
            if let Some(value) = args.date_of_birth {
                validate_birth_date(&value)?;
                record.date_of_birth = value;
            }
            if let Some(value) = args.father_name {
                record.father_name = value;
            }
            if let Some(value) = args.phone_number {
                record.phone_number = value;
            }
            if let Some(value) = args.email_id {
                record.email_id = value;
            }
            if let Some(value) = args.photo_url {
                record.photo_url = value;
            }
            if let Some(value) = args.signature_url {
                record.signature_url = value;
            }
            sync.save(&record)?;
            if args.json {
                emit_json(json!({
                    "saved": record_json(&record),
                    "total": sync.roster().len(),
                }));
            } else {
                println!("Updated {} (id {})", record.student_name, record.id);
            }
            Ok(RunOutcome::ok())
        }
        Command::Delete { id, yes, json } => {
            let mut sync = ctx.orchestrator()?;
            let deleted = if yes {
                sync.delete(&id, &AlwaysAffirm)?
            } else {
                sync.delete(&id, &TerminalConfirmation)?
            };
            if json {
                emit_json(json!({
                    "deleted": deleted,
                    "id": id,
                    "total": sync.roster().len(),
                }));
            } else if deleted {
                println!("Deleted {id}");
            } else {
                println!("Delete cancelled");
            }
            Ok(RunOutcome::ok())
        }
        Command::Watch { interval, json } => {
            init_tracing();
            let stop = Arc::new(AtomicBool::new(false));
            for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
                signal_hook::flag::register(signal, Arc::clone(&stop)).map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to install signal handler")
                        .with_source(err)
                })?;
            }
            let mut sync = ctx
                .orchestrator()?
                .with_poll_interval(Duration::from_secs(interval));
            let events = sync.subscribe();
            if let Err(err) = sync.load() {
                if err.kind() == ErrorKind::AuthInit {
                    return Err(err);
                }
                tracing::warn!(error = %err, "initial load failed, polling continues");
            }
            drain_events(&events, json);
            while !stop.load(Ordering::Acquire) {
                sync.tick(Instant::now());
                drain_events(&events, json);
                std::thread::sleep(Duration::from_millis(200));
            }
            Ok(RunOutcome::ok())
        }
    }
}

fn drain_events(events: &Receiver<rollbook::api::RosterEvent>, json: bool) {
    use rollbook::api::RosterEvent;
    for event in events.try_iter() {
        match event {
            RosterEvent::Loaded { records } => {
                if json {
                    emit_json(json!({"event": "loaded", "records": records}));
                } else {
                    println!("loaded {records} records");
                }
            }
            RosterEvent::Saved { student_id } => {
                if json {
                    emit_json(json!({"event": "saved", "studentId": student_id}));
                } else {
                    println!("saved {student_id}");
                }
            }
            RosterEvent::Deleted { id } => {
                if json {
                    emit_json(json!({"event": "deleted", "id": id}));
                } else {
                    println!("deleted {id}");
                }
            }
            RosterEvent::Error { message } => {
                if json {
                    emit_json(json!({"event": "error", "message": message}));
                } else {
                    println!("error: {message}");
                }
            }
        }
    }
}
