//! quay-ssh: remote session establishment for Quay.
//!
//! Covers the whole remote path: connect-option normalization, the SOCKS5
//! proxy handoff, the SSH connect/authenticate flow, the interactive shell
//! channel pump, and the X11 forwarding bridge with its bounded display
//! discovery.
//!
//! # Architecture
//!
//! - [`ConnectOptions`] — Normalized credential set handed to the SSH client.
//! - [`proxy`] — SOCKS5 CONNECT that replaces the direct TCP transport.
//! - [`client`] — Connection establishment, authentication, channel pump.
//! - [`display`] — `$DISPLAY` resolution via the host shell.
//! - [`x11`] — Forwarded-channel bridge to the local display server.

pub mod client;
pub mod display;
pub mod options;
pub mod proxy;
pub mod x11;

pub use client::{
    establish, ChannelGone, ClientHandler, ConnectError, RemoteEvent, RemoteHandle, ShellChannel,
};
pub use options::{non_empty, ConnectOptions, ProxyOptions};
pub use proxy::ProxyError;
pub use x11::X11Error;
