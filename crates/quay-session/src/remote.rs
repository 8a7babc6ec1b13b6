use std::time::Duration;

use log::{debug, warn};
use tokio::sync::broadcast;

use quay_pty::HostEnv;
use quay_ssh::{
    establish, non_empty, ConnectOptions, ProxyOptions, RemoteEvent, RemoteHandle, ShellChannel,
};

use crate::error::SessionError;
use crate::event::{OutputStream, SessionEvent};
use crate::options::{ProxySettings, SessionOptions};

const EVENT_BUFFER: usize = 256;

/// A session backed by a shell channel on an SSH connection.
pub struct RemoteSession {
    handle: RemoteHandle,
    shell: ShellChannel,
    events: broadcast::Sender<SessionEvent>,
}

impl RemoteSession {
    /// Connect (through the proxy when configured), authenticate, and open
    /// the interactive shell channel.
    pub async fn open(options: &SessionOptions, env: &HostEnv) -> Result<Self, SessionError> {
        let opts = build_connect_options(options, env)?;
        let mut handle = establish(&opts).await?;

        let (events, _) = broadcast::channel(EVENT_BUFFER);
        spawn_event_mapper(handle.subscribe(), events.clone());

        let shell = handle.open_shell(&opts).await?;
        Ok(Self {
            handle,
            shell,
            events,
        })
    }

    /// Validate credentials only: authenticate, then tear the connection
    /// down without ever opening a shell channel.
    pub async fn test(options: &SessionOptions, env: &HostEnv) -> Result<(), SessionError> {
        let opts = build_connect_options(options, env)?;
        let mut handle = establish(&opts).await?;
        handle.disconnect().await;
        debug!("test connection to {} succeeded", opts.host);
        Ok(())
    }

    /// Set the remote terminal's window size.
    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), SessionError> {
        self.shell.resize(cols, rows)?;
        Ok(())
    }

    /// Send bytes to the channel. Failures are absorbed and logged, same
    /// policy as the local variant.
    pub fn write(&mut self, data: &[u8]) {
        if let Err(err) = self.shell.write(data.to_vec()) {
            warn!("remote session write failed: {err}");
        }
    }

    /// Subscribe to channel output (both streams), exit, and forwarding
    /// events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// End the SSH connection. Never touches a local process handle.
    pub async fn kill(&mut self) {
        self.shell.close();
        self.handle.disconnect().await;
    }
}

/// Map the SSH layer's events onto the session-level event source so that
/// both channel streams and X11 bridge failures arrive as one
/// discriminated stream.
fn spawn_event_mapper(
    mut rx: broadcast::Receiver<RemoteEvent>,
    tx: broadcast::Sender<SessionEvent>,
) {
    tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("remote event stream lagged by {n}");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let mapped = match event {
                RemoteEvent::Data(bytes) => SessionEvent::Output {
                    stream: OutputStream::Stdout,
                    bytes,
                },
                RemoteEvent::StderrData(bytes) => SessionEvent::Output {
                    stream: OutputStream::Stderr,
                    bytes,
                },
                RemoteEvent::Exit(code) => SessionEvent::Exit { code: Some(code) },
                RemoteEvent::Closed => {
                    let _ = tx.send(SessionEvent::Closed);
                    break;
                }
                RemoteEvent::X11ForwardFailed(reason) => SessionEvent::X11ForwardFailed { reason },
            };
            let _ = tx.send(mapped);
        }
    });
}

/// Normalize caller options into the credential set handed to the SSH
/// layer: empty secrets stripped, `x11` a concrete bool,
/// keyboard-interactive always on, and the ambient agent socket attached
/// when the injected environment has one.
fn build_connect_options(
    options: &SessionOptions,
    env: &HostEnv,
) -> Result<ConnectOptions, SessionError> {
    let host = options
        .host
        .clone()
        .ok_or(SessionError::MissingField("host"))?;
    let username = options
        .username
        .clone()
        .ok_or(SessionError::MissingField("username"))?;

    Ok(ConnectOptions {
        host,
        port: options.port.unwrap_or(22),
        username,
        password: non_empty(options.password.clone()),
        private_key: non_empty(options.private_key.clone()),
        passphrase: non_empty(options.passphrase.clone()),
        x11: options.x11.unwrap_or(false),
        try_keyboard_interactive: true,
        agent_sock: env.var("SSH_AUTH_SOCK").map(str::to_string),
        ready_timeout: options.ready_timeout.map(Duration::from_millis),
        keepalive_interval: options.keepalive_interval.map(Duration::from_millis),
        term: options.term().to_string(),
        cols: options.cols(),
        rows: options.rows(),
        proxy: proxy_options(options.proxy.as_ref()),
    })
}

/// A proxy is used only when both address and port are present; otherwise
/// the transport connects directly.
fn proxy_options(settings: Option<&ProxySettings>) -> Option<ProxyOptions> {
    let settings = settings?;
    match (&settings.proxy_ip, settings.proxy_port) {
        (Some(ip), Some(port)) => Some(ProxyOptions {
            host: ip.clone(),
            port,
            username: settings.proxy_username.clone(),
            password: settings.proxy_password.clone(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quay_pty::Platform;

    fn env_with(vars: &[(&str, &str)]) -> HostEnv {
        HostEnv::with_platform(
            Platform::Unix,
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn remote_options() -> SessionOptions {
        SessionOptions::remote("h", 22, "u")
    }

    #[test]
    fn test_empty_secrets_are_stripped() {
        let mut options = remote_options();
        options.password = Some(String::new());
        options.passphrase = Some(String::new());
        let opts = build_connect_options(&options, &env_with(&[])).unwrap();
        assert_eq!(opts.password, None);
        assert_eq!(opts.passphrase, None);

        options.password = None;
        let opts = build_connect_options(&options, &env_with(&[])).unwrap();
        assert_eq!(opts.password, None);
    }

    #[test]
    fn test_x11_is_always_a_concrete_bool() {
        let mut options = remote_options();
        assert!(!build_connect_options(&options, &env_with(&[])).unwrap().x11);
        options.x11 = Some(true);
        assert!(build_connect_options(&options, &env_with(&[])).unwrap().x11);
    }

    #[test]
    fn test_keyboard_interactive_always_enabled() {
        let opts = build_connect_options(&remote_options(), &env_with(&[])).unwrap();
        assert!(opts.try_keyboard_interactive);
    }

    #[test]
    fn test_agent_sock_comes_from_injected_env() {
        let env = env_with(&[("SSH_AUTH_SOCK", "/run/agent.sock")]);
        let opts = build_connect_options(&remote_options(), &env).unwrap();
        assert_eq!(opts.agent_sock.as_deref(), Some("/run/agent.sock"));

        let opts = build_connect_options(&remote_options(), &env_with(&[])).unwrap();
        assert_eq!(opts.agent_sock, None);
    }

    #[test]
    fn test_proxy_requires_both_ip_and_port() {
        let mut options = remote_options();
        options.proxy = Some(ProxySettings {
            proxy_ip: Some("1.2.3.4".to_string()),
            proxy_port: None,
            proxy_username: None,
            proxy_password: None,
        });
        let opts = build_connect_options(&options, &env_with(&[])).unwrap();
        assert!(opts.proxy.is_none());

        options.proxy = Some(ProxySettings {
            proxy_ip: Some("1.2.3.4".to_string()),
            proxy_port: Some(1080),
            proxy_username: None,
            proxy_password: None,
        });
        let opts = build_connect_options(&options, &env_with(&[])).unwrap();
        let proxy = opts.proxy.unwrap();
        assert_eq!(proxy.host, "1.2.3.4");
        assert_eq!(proxy.port, 1080);
    }

    #[test]
    fn test_timeouts_are_milliseconds() {
        let mut options = remote_options();
        options.ready_timeout = Some(5000);
        options.keepalive_interval = Some(10_000);
        let opts = build_connect_options(&options, &env_with(&[])).unwrap();
        assert_eq!(opts.ready_timeout, Some(Duration::from_secs(5)));
        assert_eq!(opts.keepalive_interval, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_missing_host_is_rejected() {
        let mut options = remote_options();
        options.host = None;
        match build_connect_options(&options, &env_with(&[])) {
            Err(SessionError::MissingField("host")) => {}
            other => panic!("expected MissingField(host), got {other:?}"),
        }
    }
}
