use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use quay_pty::HostEnv;

use crate::error::SessionError;
use crate::event::SessionEvent;
use crate::local::LocalSession;
use crate::options::{SessionOptions, SessionType};
use crate::remote::RemoteSession;

/// Opaque unique session identifier. Assigned before initialization
/// begins, so it is stable even when initialization later fails.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

enum SessionInner {
    Local(LocalSession),
    Remote(RemoteSession),
}

/// Uniform handle over a local or remote terminal session.
///
/// Exactly one backing handle exists, chosen once at construction; `kill`
/// releases that handle's resources and never the other variant's.
pub struct Session {
    id: SessionId,
    inner: SessionInner,
}

impl Session {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn kind(&self) -> SessionType {
        match self.inner {
            SessionInner::Local(_) => SessionType::Local,
            SessionInner::Remote(_) => SessionType::Remote,
        }
    }

    /// Update the terminal dimensions of the backing handle.
    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), SessionError> {
        match &self.inner {
            SessionInner::Local(session) => session.resize(cols, rows),
            SessionInner::Remote(session) => session.resize(cols, rows),
        }
    }

    /// Send input bytes. Write failures are absorbed and logged, never
    /// returned.
    pub fn write(&mut self, data: &[u8]) {
        match &mut self.inner {
            SessionInner::Local(session) => session.write(data),
            SessionInner::Remote(session) => session.write(data),
        }
    }

    /// Subscribe to the session's typed event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        match &self.inner {
            SessionInner::Local(session) => session.subscribe(),
            SessionInner::Remote(session) => session.subscribe(),
        }
    }

    /// Release the backing handle: terminate the child process for local
    /// sessions, end the SSH connection for remote ones.
    pub async fn kill(&mut self) {
        match &mut self.inner {
            SessionInner::Local(session) => session.kill(),
            SessionInner::Remote(session) => session.kill().await,
        }
    }
}

/// Build a session from caller options, dispatching on the declared type.
/// The id is assigned before the variant initializer runs.
pub async fn create_session(
    options: &SessionOptions,
    env: &HostEnv,
) -> Result<Session, SessionError> {
    let id = SessionId::generate();
    let inner = match options.kind {
        SessionType::Local => SessionInner::Local(LocalSession::spawn(options, env)?),
        SessionType::Remote => SessionInner::Remote(RemoteSession::open(options, env).await?),
    };
    Ok(Session { id, inner })
}

/// Validate remote credentials without keeping a session. Resolves `true`
/// only after authentication succeeds; never opens a shell channel. Any
/// connect or auth failure rejects.
pub async fn test_connection(
    options: &SessionOptions,
    env: &HostEnv,
) -> Result<bool, SessionError> {
    RemoteSession::test(options, env).await?;
    Ok(true)
}
