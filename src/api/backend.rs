//! Purpose: Uniform capability interface over the two roster data sources.
//! Exports: `Backend`, `BackendTarget`, `BackendOptions`, `resolve_backend_target`,
//! `select_backend`, `default_data_dir`, `LOCAL_SENTINEL`.
//! Role: Chosen once at startup from configuration, injected into the
//! orchestrator; call sites never branch on which backend is active.
//! Invariants: Every operation returns the full resulting roster so callers
//! reconcile from one source of truth instead of merging deltas.
//! Invariants: Backend errors propagate unswallowed.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use super::remote::{RemoteGateway, RetryPolicy, parse_endpoint_url};
use crate::core::error::{Error, ErrorKind};
use crate::core::record::StudentRecord;
use crate::core::store::RecordStore;

/// Endpoint value that selects the local store instead of a remote gateway.
pub const LOCAL_SENTINEL: &str = "local";

pub trait Backend {
    fn read(&self) -> Result<Vec<StudentRecord>, Error>;
    fn write(&self, record: &StudentRecord) -> Result<Vec<StudentRecord>, Error>;
    fn remove(&self, id: &str) -> Result<Vec<StudentRecord>, Error>;
}

impl Backend for RecordStore {
    fn read(&self) -> Result<Vec<StudentRecord>, Error> {
        RecordStore::read(self)
    }

    fn write(&self, record: &StudentRecord) -> Result<Vec<StudentRecord>, Error> {
        RecordStore::write(self, record)
    }

    fn remove(&self, id: &str) -> Result<Vec<StudentRecord>, Error> {
        RecordStore::remove(self, id)
    }
}

#[derive(Clone, Debug)]
pub enum BackendTarget {
    Local { data_dir: PathBuf },
    Remote { endpoint: Url },
}

#[derive(Clone, Debug, Default)]
pub struct BackendOptions {
    pub simulated_latency: Option<Duration>,
    pub retry: Option<RetryPolicy>,
    pub token: Option<String>,
}

pub fn default_data_dir() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".rollbook")
}

/// Decide which backend the process will use, once, from configuration.
/// No endpoint (or the sentinel) means the local store; an http(s) URL
/// means the remote gateway; anything else is a usage error.
pub fn resolve_backend_target(
    endpoint: Option<&str>,
    data_dir: PathBuf,
) -> Result<BackendTarget, Error> {
    let endpoint = endpoint.map(str::trim).filter(|value| !value.is_empty());
    match endpoint {
        None => Ok(BackendTarget::Local { data_dir }),
        Some(value) if value.eq_ignore_ascii_case(LOCAL_SENTINEL) => {
            Ok(BackendTarget::Local { data_dir })
        }
        Some(value) if value.contains("://") => Ok(BackendTarget::Remote {
            endpoint: parse_endpoint_url(value)?,
        }),
        Some(value) => Err(Error::new(ErrorKind::Usage)
            .with_message(format!("unrecognized endpoint value: {value}"))
            .with_hint("Use \"local\" for the local store or an http(s):// URL for a remote endpoint.")),
    }
}

pub fn select_backend(target: BackendTarget, options: BackendOptions) -> Box<dyn Backend> {
    match target {
        BackendTarget::Local { data_dir } => Box::new(
            RecordStore::open(data_dir).with_simulated_latency(options.simulated_latency),
        ),
        BackendTarget::Remote { endpoint } => Box::new(
            RemoteGateway::new(endpoint)
                .with_token(options.token)
                .with_retry_policy(options.retry.unwrap_or_default()),
        ),
    }
}
