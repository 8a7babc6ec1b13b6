//! quay-pty: local PTY process management for Quay sessions.
//!
//! This crate owns the local half of the session abstraction: spawning a
//! native shell in a pseudo-terminal, resizing it, writing input, and
//! killing the child. The blocking reader and the child handle are handed
//! back to the caller so a dedicated I/O thread can own them without
//! blocking anything else.
//!
//! # Architecture
//!
//! - [`PtyHandle`] — Low-level PTY process management (spawn, write, resize, kill).
//! - [`shell`] — Platform shell policy resolved from an injected [`HostEnv`],
//!   never from ambient process state.

pub mod pty;
pub mod shell;

pub use pty::{PtyChild, PtyError, PtyHandle, PtyReader};
pub use shell::{shell_spec, HostEnv, Platform, ShellSpec, DEFAULT_TERM};
