//! quay-session: one handle type for terminal sessions, local or remote.
//!
//! Serves backends of browser- or app-based terminal emulators: the caller
//! supplies [`SessionOptions`], the factory dispatches to the local PTY or
//! remote SSH initializer, and gets back a uniform [`Session`] handle with
//! resize/write/subscribe/kill regardless of backing.
//!
//! # Architecture
//!
//! - [`SessionOptions`] — Caller-facing configuration surface (serde,
//!   camelCase wire names).
//! - [`LocalSession`] — Locally spawned shell in a PTY (`quay-pty`).
//! - [`RemoteSession`] — Shell channel over SSH, optionally proxied and
//!   carrying X11 forwards (`quay-ssh`).
//! - [`Session`] — Tagged union over exactly those two, fixed at
//!   construction.
//! - [`SessionRegistry`] — Owns live sessions keyed by id.

pub mod error;
pub mod event;
pub mod local;
pub mod options;
pub mod registry;
pub mod remote;
pub mod session;

pub use error::SessionError;
pub use event::{OutputStream, SessionEvent};
pub use local::LocalSession;
pub use options::{ProxySettings, SessionOptions, SessionType};
pub use quay_pty::{HostEnv, Platform};
pub use registry::SessionRegistry;
pub use remote::RemoteSession;
pub use session::{create_session, test_connection, Session, SessionId};
