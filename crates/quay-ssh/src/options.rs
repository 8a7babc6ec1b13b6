use std::time::Duration;

/// Options for the SOCKS5 tunnel that carries the SSH transport in place of
/// a direct TCP connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyOptions {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Normalized credential set handed to the SSH client.
///
/// Built from caller-supplied session options: empty password/passphrase
/// values are stripped (see [`non_empty`]), `x11` is always a concrete
/// bool, and keyboard-interactive is always enabled.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub private_key: Option<String>,
    pub passphrase: Option<String>,
    pub x11: bool,
    pub try_keyboard_interactive: bool,
    /// Ambient SSH agent socket path, when the environment has one.
    pub agent_sock: Option<String>,
    /// Bound on the whole connect-until-authenticated phase.
    pub ready_timeout: Option<Duration>,
    pub keepalive_interval: Option<Duration>,
    pub term: String,
    pub cols: u16,
    pub rows: u16,
    /// When set, the transport goes through the proxy instead of a direct
    /// connection to `host:port`.
    pub proxy: Option<ProxyOptions>,
}

/// Strip empty credential strings so they are never offered to the server.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_strips_empty_strings() {
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some("p".to_string())), Some("p".to_string()));
    }
}
