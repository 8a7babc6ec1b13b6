use log::debug;
use tokio::net::TcpStream;
use tokio_socks::tcp::Socks5Stream;

use crate::options::ProxyOptions;

/// SOCKS tunnel setup failure. There is no fallback to a direct
/// connection: the caller aborts the whole connect attempt.
#[derive(Debug)]
pub enum ProxyError {
    Handshake(tokio_socks::Error),
}

impl std::fmt::Display for ProxyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyError::Handshake(err) => write!(f, "SOCKS proxy handshake failed: {err}"),
        }
    }
}

impl std::error::Error for ProxyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProxyError::Handshake(err) => Some(err),
        }
    }
}

/// Establish a SOCKS5 CONNECT tunnel to `host:port` through the proxy.
/// The returned stream replaces host/port as the SSH transport.
pub async fn connect(
    proxy: &ProxyOptions,
    host: &str,
    port: u16,
) -> Result<Socks5Stream<TcpStream>, ProxyError> {
    let proxy_addr = (proxy.host.as_str(), proxy.port);
    let target = (host, port);

    let stream = match (&proxy.username, &proxy.password) {
        (Some(user), Some(pass)) => {
            Socks5Stream::connect_with_password(proxy_addr, target, user, pass).await
        }
        _ => Socks5Stream::connect(proxy_addr, target).await,
    }
    .map_err(ProxyError::Handshake)?;

    debug!("SOCKS5 tunnel to {host}:{port} via {}:{}", proxy.host, proxy.port);
    Ok(stream)
}
