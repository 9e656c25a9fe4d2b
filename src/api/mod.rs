//! Purpose: Define the stable public Rust API boundary for rollbook.
//! Exports: Backend selection, remote gateway, session, confirmation, and
//! the sync orchestrator, plus re-exported core types.
//! Role: Public surface for the CLI and embedders; hides module layout.
//! Invariants: This module is the only public path to the sync engine.

mod backend;
mod confirm;
mod remote;
mod session;
mod sync;

pub use crate::core::error::{Error, ErrorKind, to_exit_code};
pub use crate::core::query::{FilterCriteria, apply as apply_filters, compare_rolls};
pub use crate::core::record::{
    ClassName, Section, StudentRecord, normalize_roster, seed_roster,
};
pub use crate::core::store::RecordStore;
pub use backend::{
    Backend, BackendOptions, BackendTarget, LOCAL_SENTINEL, default_data_dir,
    resolve_backend_target, select_backend,
};
pub use confirm::{AlwaysAffirm, Confirmation, TerminalConfirmation};
pub use remote::{RemoteGateway, RetryPolicy, parse_endpoint_url};
pub use session::{
    AnonymousSession, EnvSession, SessionBootstrap, SessionIdentity, TOKEN_ENV_VAR, USER_ENV_VAR,
};
pub use sync::{DEFAULT_POLL_INTERVAL, LoadPhase, RosterEvent, SyncOrchestrator};
