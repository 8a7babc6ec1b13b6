use quay_pty::PtyError;
use quay_ssh::{ChannelGone, ConnectError};

/// Errors surfaced when creating or driving a session.
#[derive(Debug)]
pub enum SessionError {
    /// The options named a session type with no matching initializer.
    UnsupportedType(String),
    /// Local PTY spawn or control failure.
    Pty(PtyError),
    /// Remote connect, proxy, auth, or channel-open failure.
    Connect(ConnectError),
    /// Remote options were missing a required field.
    MissingField(&'static str),
    /// The remote shell channel has already closed.
    ChannelClosed,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::UnsupportedType(t) => write!(f, "unsupported session type: {t}"),
            SessionError::Pty(err) => write!(f, "{err}"),
            SessionError::Connect(err) => write!(f, "{err}"),
            SessionError::MissingField(name) => {
                write!(f, "remote session options missing `{name}`")
            }
            SessionError::ChannelClosed => write!(f, "shell channel is closed"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Pty(err) => Some(err),
            SessionError::Connect(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PtyError> for SessionError {
    fn from(err: PtyError) -> Self {
        SessionError::Pty(err)
    }
}

impl From<ConnectError> for SessionError {
    fn from(err: ConnectError) -> Self {
        SessionError::Connect(err)
    }
}

impl From<ChannelGone> for SessionError {
    fn from(_: ChannelGone) -> Self {
        SessionError::ChannelClosed
    }
}
