//! SSH connection establishment, authentication, and the shell channel
//! pump.
//!
//! The connect flow runs Idle -> Connecting (proxy resolved if requested)
//! -> Authenticating -> Ready; from Ready the caller either opens the
//! interactive shell channel or, in test-only mode, disconnects
//! immediately. Any failure between Connecting and Ready rejects the whole
//! operation with a distinct cause.

use std::sync::Arc;

use log::{debug, warn};
use russh::client::{self, AuthResult, Handle, KeyboardInteractiveAuthResponse, Msg};
use russh::keys::agent::client::AgentClient;
use russh::keys::{decode_secret_key, PrivateKeyWithHashAlg, PublicKey};
use russh::{Channel, ChannelMsg, Disconnect};
use tokio::sync::{broadcast, mpsc};

use crate::options::ConnectOptions;
use crate::proxy::{self, ProxyError};
use crate::x11;

const EVENT_BUFFER: usize = 256;

/// Failure of the overall connect operation, with its cause attached.
#[derive(Debug)]
pub enum ConnectError {
    /// SOCKS tunnel setup failed; no direct connection is attempted.
    Proxy(ProxyError),
    /// Transport or protocol failure while connecting.
    Connection(russh::Error),
    /// Every offered authentication method was rejected.
    Auth(String),
    /// The interactive shell channel could not be opened.
    ChannelOpen(russh::Error),
    /// `ready_timeout` elapsed before authentication completed.
    Timeout,
}

impl std::fmt::Display for ConnectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectError::Proxy(err) => write!(f, "{err}"),
            ConnectError::Connection(err) => write!(f, "SSH connection failed: {err}"),
            ConnectError::Auth(msg) => write!(f, "authentication failed: {msg}"),
            ConnectError::ChannelOpen(err) => write!(f, "shell channel open failed: {err}"),
            ConnectError::Timeout => write!(f, "connection timed out before ready"),
        }
    }
}

impl std::error::Error for ConnectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectError::Proxy(err) => Some(err),
            ConnectError::Connection(err) | ConnectError::ChannelOpen(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProxyError> for ConnectError {
    fn from(err: ProxyError) -> Self {
        ConnectError::Proxy(err)
    }
}

/// Events emitted by the shell channel pump and by X11 bridge tasks.
#[derive(Debug, Clone)]
pub enum RemoteEvent {
    /// Bytes from the channel's primary stream.
    Data(Vec<u8>),
    /// Bytes from the channel's stderr stream.
    StderrData(Vec<u8>),
    Exit(u32),
    Closed,
    /// A single forwarded display channel died; the shell is unaffected.
    X11ForwardFailed(String),
}

/// Commands accepted by the shell channel pump task.
#[derive(Debug)]
enum ChannelCmd {
    Data(Vec<u8>),
    WindowChange { cols: u16, rows: u16 },
    Close,
}

/// The pump task has exited and the shell channel is gone.
#[derive(Debug)]
pub struct ChannelGone;

impl std::fmt::Display for ChannelGone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "shell channel is closed")
    }
}

impl std::error::Error for ChannelGone {}

/// russh client handler: accepts host keys as-is (verification is caller
/// policy, matching the app frontends this serves) and hands each inbound
/// X11 forwarding request to the display bridge on its own task.
pub struct ClientHandler {
    events: broadcast::Sender<RemoteEvent>,
}

impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(&mut self, _server_key: &PublicKey) -> Result<bool, Self::Error> {
        Ok(true)
    }

    async fn server_channel_open_x11(
        &mut self,
        channel: Channel<Msg>,
        originator_address: &str,
        originator_port: u32,
        _session: &mut client::Session,
    ) -> Result<(), Self::Error> {
        debug!("x11 forward request from {originator_address}:{originator_port}");
        let events = self.events.clone();
        // Each forward runs independently; a failed bridge only kills its
        // own channel pair.
        tokio::spawn(async move {
            let display = crate::display::resolve_display().await;
            if let Err(err) = x11::bridge(channel, display).await {
                warn!("x11 forward failed: {err}");
                let _ = events.send(RemoteEvent::X11ForwardFailed(err.to_string()));
            }
        });
        Ok(())
    }
}

/// An authenticated SSH connection. Obtained from [`establish`]; callers
/// either open a shell channel on it or disconnect (test-only mode).
pub struct RemoteHandle {
    handle: Handle<ClientHandler>,
    events: broadcast::Sender<RemoteEvent>,
}

/// Connect (directly or through the configured SOCKS proxy) and
/// authenticate. The whole phase is bounded by `ready_timeout` when set.
pub async fn establish(opts: &ConnectOptions) -> Result<RemoteHandle, ConnectError> {
    let config = Arc::new(client::Config {
        keepalive_interval: opts.keepalive_interval,
        ..Default::default()
    });
    let (events, _) = broadcast::channel(EVENT_BUFFER);
    let handler = ClientHandler {
        events: events.clone(),
    };

    let connect = async {
        let mut handle = match &opts.proxy {
            Some(proxy_opts) => {
                let sock = proxy::connect(proxy_opts, &opts.host, opts.port).await?;
                client::connect_stream(config, sock, handler)
                    .await
                    .map_err(ConnectError::Connection)?
            }
            None => client::connect(config, (opts.host.as_str(), opts.port), handler)
                .await
                .map_err(ConnectError::Connection)?,
        };
        authenticate(&mut handle, opts).await?;
        Ok::<_, ConnectError>(handle)
    };

    let handle = match opts.ready_timeout {
        Some(limit) => tokio::time::timeout(limit, connect)
            .await
            .map_err(|_| ConnectError::Timeout)??,
        None => connect.await?,
    };

    debug!("SSH connection to {}:{} ready", opts.host, opts.port);
    Ok(RemoteHandle { handle, events })
}

/// Try authentication methods in ssh2's preference order: private key,
/// agent identities, password, then keyboard-interactive.
async fn authenticate(
    handle: &mut Handle<ClientHandler>,
    opts: &ConnectOptions,
) -> Result<(), ConnectError> {
    if let Some(key_data) = &opts.private_key {
        let key = decode_secret_key(key_data, opts.passphrase.as_deref())
            .map_err(|e| ConnectError::Auth(format!("private key rejected: {e}")))?;
        let hash = handle
            .best_supported_rsa_hash()
            .await
            .map_err(ConnectError::Connection)?
            .flatten();
        let auth = handle
            .authenticate_publickey(&opts.username, PrivateKeyWithHashAlg::new(Arc::new(key), hash))
            .await
            .map_err(ConnectError::Connection)?;
        if let AuthResult::Success = auth {
            return Ok(());
        }
        debug!("public key authentication rejected");
    }

    if let Some(sock) = &opts.agent_sock {
        match agent_auth(handle, &opts.username, sock).await {
            Ok(true) => return Ok(()),
            Ok(false) => debug!("agent authentication rejected"),
            Err(err) => debug!("ssh-agent unavailable: {err}"),
        }
    }

    if let Some(password) = &opts.password {
        let auth = handle
            .authenticate_password(&opts.username, password)
            .await
            .map_err(ConnectError::Connection)?;
        if let AuthResult::Success = auth {
            return Ok(());
        }
        debug!("password authentication rejected");
    }

    if opts.try_keyboard_interactive && keyboard_interactive(handle, opts).await? {
        return Ok(());
    }

    Err(ConnectError::Auth(
        "all authentication methods rejected".to_string(),
    ))
}

/// Offer each identity the agent holds.
async fn agent_auth(
    handle: &mut Handle<ClientHandler>,
    username: &str,
    sock: &str,
) -> Result<bool, ConnectError> {
    let mut agent = AgentClient::connect_uds(sock)
        .await
        .map_err(|e| ConnectError::Auth(format!("ssh-agent connect failed: {e}")))?;
    let identities = agent
        .request_identities()
        .await
        .map_err(|e| ConnectError::Auth(format!("ssh-agent listing failed: {e}")))?;
    let hash = handle
        .best_supported_rsa_hash()
        .await
        .map_err(ConnectError::Connection)?
        .flatten();

    for key in identities {
        match handle
            .authenticate_publickey_with(username, key, hash, &mut agent)
            .await
        {
            Ok(AuthResult::Success) => return Ok(true),
            Ok(_) => {}
            Err(err) => debug!("agent signature failed: {err}"),
        }
    }
    Ok(false)
}

/// Keyboard-interactive exchange, replying to any prompt set with a single
/// password response. Multi-factor / multi-prompt exchanges are not
/// supported.
async fn keyboard_interactive(
    handle: &mut Handle<ClientHandler>,
    opts: &ConnectOptions,
) -> Result<bool, ConnectError> {
    let mut response = handle
        .authenticate_keyboard_interactive_start(&opts.username, None)
        .await
        .map_err(ConnectError::Connection)?;
    loop {
        match response {
            KeyboardInteractiveAuthResponse::Success => return Ok(true),
            KeyboardInteractiveAuthResponse::InfoRequest { .. } => {
                let reply = vec![opts.password.clone().unwrap_or_default()];
                response = handle
                    .authenticate_keyboard_interactive_respond(reply)
                    .await
                    .map_err(ConnectError::Connection)?;
            }
            _ => return Ok(false),
        }
    }
}

impl RemoteHandle {
    /// Subscribe to channel and forwarding events.
    pub fn subscribe(&self) -> broadcast::Receiver<RemoteEvent> {
        self.events.subscribe()
    }

    /// Open the interactive shell channel and start its pump task.
    ///
    /// Requests X11 forwarding first when enabled, then the PTY at the
    /// caller's geometry, then the shell itself.
    pub async fn open_shell(&mut self, opts: &ConnectOptions) -> Result<ShellChannel, ConnectError> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(ConnectError::ChannelOpen)?;

        if opts.x11 {
            let cookie = x11::fake_cookie();
            channel
                .request_x11(false, false, "MIT-MAGIC-COOKIE-1", &cookie, 0)
                .await
                .map_err(ConnectError::ChannelOpen)?;
        }
        channel
            .request_pty(
                false,
                &opts.term,
                u32::from(opts.cols),
                u32::from(opts.rows),
                0,
                0,
                &[],
            )
            .await
            .map_err(ConnectError::ChannelOpen)?;
        channel
            .request_shell(true)
            .await
            .map_err(ConnectError::ChannelOpen)?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        tokio::spawn(pump(channel, cmd_rx, self.events.clone()));
        Ok(ShellChannel { cmds: cmd_tx })
    }

    /// Tear the connection down. In test-only mode this runs right after
    /// authentication, before any channel exists.
    pub async fn disconnect(&mut self) {
        if let Err(err) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
        {
            debug!("disconnect: {err}");
        }
    }
}

/// Write/resize surface for the live shell channel. Commands are queued to
/// the pump task that owns the channel.
pub struct ShellChannel {
    cmds: mpsc::UnboundedSender<ChannelCmd>,
}

impl ShellChannel {
    /// Queue bytes for the remote side. Fails only once the pump has exited.
    pub fn write(&self, data: Vec<u8>) -> Result<(), ChannelGone> {
        self.cmds
            .send(ChannelCmd::Data(data))
            .map_err(|_| ChannelGone)
    }

    /// Set the remote terminal's window size.
    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), ChannelGone> {
        self.cmds
            .send(ChannelCmd::WindowChange { cols, rows })
            .map_err(|_| ChannelGone)
    }

    /// Ask the pump to end the channel.
    pub fn close(&self) {
        let _ = self.cmds.send(ChannelCmd::Close);
    }
}

/// Owns the shell channel: fans incoming channel messages out as events
/// and applies queued write/resize commands. Exits when the channel
/// closes or a `Close` command arrives.
async fn pump(
    mut channel: Channel<Msg>,
    mut cmds: mpsc::UnboundedReceiver<ChannelCmd>,
    events: broadcast::Sender<RemoteEvent>,
) {
    loop {
        tokio::select! {
            msg = channel.wait() => match msg {
                Some(ChannelMsg::Data { data }) => {
                    let _ = events.send(RemoteEvent::Data(data.to_vec()));
                }
                Some(ChannelMsg::ExtendedData { data, ext: 1 }) => {
                    let _ = events.send(RemoteEvent::StderrData(data.to_vec()));
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    let _ = events.send(RemoteEvent::Exit(exit_status));
                }
                Some(ChannelMsg::Close) | None => {
                    let _ = events.send(RemoteEvent::Closed);
                    break;
                }
                Some(_) => {}
            },
            cmd = cmds.recv() => match cmd {
                Some(ChannelCmd::Data(data)) => {
                    if let Err(err) = channel.data(&data[..]).await {
                        warn!("channel write failed: {err}");
                    }
                }
                Some(ChannelCmd::WindowChange { cols, rows }) => {
                    if let Err(err) = channel
                        .window_change(u32::from(cols), u32::from(rows), 0, 0)
                        .await
                    {
                        warn!("window change failed: {err}");
                    }
                }
                Some(ChannelCmd::Close) | None => {
                    let _ = channel.eof().await;
                    let _ = events.send(RemoteEvent::Closed);
                    break;
                }
            },
        }
    }
}
