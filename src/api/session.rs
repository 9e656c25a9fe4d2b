//! Purpose: Session bootstrap collaborator supplying readiness and identity.
//! Exports: `SessionBootstrap`, `SessionIdentity`, `EnvSession`, `AnonymousSession`.
//! Role: The sync layer only waits for readiness before its first load; the
//! identity string is opaque and never interpreted here.
//! Invariants: Bootstrap failure is `AuthInit` — fatal to the ready signal,
//! not to data operations once a session is established another way.

use std::path::{Path, PathBuf};

use crate::core::error::{Error, ErrorKind};

pub const TOKEN_ENV_VAR: &str = "ROLLBOOK_TOKEN";
pub const USER_ENV_VAR: &str = "ROLLBOOK_USER";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionIdentity {
    /// Opaque identity label; displayed, never parsed.
    pub user_id: String,
    /// Bearer token for the remote gateway, when one is configured.
    pub token: Option<String>,
}

impl SessionIdentity {
    pub fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            token: None,
        }
    }
}

pub trait SessionBootstrap {
    /// Block until the session is ready, returning its identity.
    fn wait_ready(&self) -> Result<SessionIdentity, Error>;
}

/// Always-ready session with no credentials. Used by tests and by local
/// backends that need no identity at all.
pub struct AnonymousSession;

impl SessionBootstrap for AnonymousSession {
    fn wait_ready(&self) -> Result<SessionIdentity, Error> {
        Ok(SessionIdentity::anonymous())
    }
}

/// Resolves identity from flags and the environment: an explicit token, a
/// token file, or `ROLLBOOK_TOKEN`. `--token` and `--token-file` are
/// mutually exclusive.
pub struct EnvSession {
    token: Option<String>,
    token_file: Option<PathBuf>,
}

impl EnvSession {
    pub fn new(token: Option<String>, token_file: Option<PathBuf>) -> Self {
        Self { token, token_file }
    }
}

impl SessionBootstrap for EnvSession {
    fn wait_ready(&self) -> Result<SessionIdentity, Error> {
        let token = resolve_token_value(self.token.clone(), self.token_file.as_deref())?;
        let user_id = std::env::var(USER_ENV_VAR)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "anonymous".to_string());
        Ok(SessionIdentity { user_id, token })
    }
}

fn resolve_token_value(
    token: Option<String>,
    token_file: Option<&Path>,
) -> Result<Option<String>, Error> {
    if token.is_some() && token_file.is_some() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--token cannot be combined with --token-file")
            .with_hint("Use --token-file for safer handling, or pass --token for local/dev use."));
    }
    if let Some(path) = token_file {
        return read_token_file(path).map(Some);
    }
    if token.is_some() {
        return Ok(token);
    }
    Ok(std::env::var(TOKEN_ENV_VAR)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty()))
}

fn read_token_file(path: &Path) -> Result<String, Error> {
    let raw = std::fs::read_to_string(path).map_err(|err| {
        Error::new(ErrorKind::AuthInit)
            .with_message(format!("failed to read token file: {}", path.display()))
            .with_source(err)
    })?;
    let token = raw.trim().to_string();
    if token.is_empty() {
        return Err(Error::new(ErrorKind::AuthInit)
            .with_message(format!("token file is empty: {}", path.display())));
    }
    Ok(token)
}
