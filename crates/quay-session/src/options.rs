use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Which backend a session runs on. Fixed at construction; every dispatch
/// happens on this tag, never on a type string at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Local,
    Remote,
}

impl TryFrom<&str> for SessionType {
    type Error = SessionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "local" => Ok(SessionType::Local),
            "remote" => Ok(SessionType::Remote),
            other => Err(SessionError::UnsupportedType(other.to_string())),
        }
    }
}

/// SOCKS proxy settings. A proxy is only used when both `proxyIp` and
/// `proxyPort` are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxySettings {
    #[serde(default)]
    pub proxy_ip: Option<String>,
    #[serde(default)]
    pub proxy_port: Option<u16>,
    #[serde(default)]
    pub proxy_username: Option<String>,
    #[serde(default)]
    pub proxy_password: Option<String>,
}

/// Caller-supplied session options, immutable once passed. Field names
/// follow the camelCase JSON surface of the app frontends this backend
/// serves. Timeouts and intervals are in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOptions {
    #[serde(rename = "type")]
    pub kind: SessionType,
    #[serde(default)]
    pub cols: Option<u16>,
    #[serde(default)]
    pub rows: Option<u16>,
    #[serde(default)]
    pub term: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub passphrase: Option<String>,
    #[serde(default)]
    pub x11: Option<bool>,
    #[serde(default)]
    pub proxy: Option<ProxySettings>,
    #[serde(default)]
    pub ready_timeout: Option<u64>,
    #[serde(default)]
    pub keepalive_interval: Option<u64>,
}

impl SessionOptions {
    /// Bare local session at the given size.
    pub fn local(cols: u16, rows: u16) -> Self {
        Self {
            kind: SessionType::Local,
            cols: Some(cols),
            rows: Some(rows),
            ..Self::empty(SessionType::Local)
        }
    }

    /// Remote session skeleton; credentials filled in by the caller.
    pub fn remote(host: &str, port: u16, username: &str) -> Self {
        Self {
            host: Some(host.to_string()),
            port: Some(port),
            username: Some(username.to_string()),
            ..Self::empty(SessionType::Remote)
        }
    }

    fn empty(kind: SessionType) -> Self {
        Self {
            kind,
            cols: None,
            rows: None,
            term: None,
            host: None,
            port: None,
            username: None,
            password: None,
            private_key: None,
            passphrase: None,
            x11: None,
            proxy: None,
            ready_timeout: None,
            keepalive_interval: None,
        }
    }

    /// Columns with the 80-wide default applied.
    pub fn cols(&self) -> u16 {
        self.cols.unwrap_or(80)
    }

    /// Rows with the 24-high default applied.
    pub fn rows(&self) -> u16 {
        self.rows.unwrap_or(24)
    }

    pub fn term(&self) -> &str {
        self.term.as_deref().unwrap_or(quay_pty::DEFAULT_TERM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_camel_case_wire_names() {
        let opts: SessionOptions = serde_json::from_str(
            r#"{
                "type": "remote",
                "host": "h",
                "port": 22,
                "username": "u",
                "privateKey": "KEY",
                "readyTimeout": 5000,
                "proxy": {"proxyIp": "1.2.3.4", "proxyPort": 1080}
            }"#,
        )
        .unwrap();
        assert_eq!(opts.kind, SessionType::Remote);
        assert_eq!(opts.private_key.as_deref(), Some("KEY"));
        assert_eq!(opts.ready_timeout, Some(5000));
        let proxy = opts.proxy.unwrap();
        assert_eq!(proxy.proxy_ip.as_deref(), Some("1.2.3.4"));
        assert_eq!(proxy.proxy_port, Some(1080));
    }

    #[test]
    fn test_unknown_type_fails_to_parse() {
        let parsed = serde_json::from_str::<SessionOptions>(r#"{"type": "telnet"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_type_tag_try_from() {
        assert_eq!(SessionType::try_from("local").unwrap(), SessionType::Local);
        assert_eq!(SessionType::try_from("remote").unwrap(), SessionType::Remote);
        match SessionType::try_from("telnet") {
            Err(SessionError::UnsupportedType(t)) => assert_eq!(t, "telnet"),
            other => panic!("expected UnsupportedType, got {other:?}"),
        }
    }

    #[test]
    fn test_size_defaults() {
        let opts: SessionOptions = serde_json::from_str(r#"{"type": "local"}"#).unwrap();
        assert_eq!(opts.cols(), 80);
        assert_eq!(opts.rows(), 24);
        assert_eq!(opts.term(), "xterm-color");
    }
}
