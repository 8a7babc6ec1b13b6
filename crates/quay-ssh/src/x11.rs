use log::{debug, warn};
use russh::client::Msg;
use russh::Channel;
use tokio::io::copy_bidirectional;
use tokio::net::{TcpStream, UnixStream};
use uuid::Uuid;

/// X11 TCP display sockets start here (display `:0`).
const PORT_SCAN_START: u32 = 6000;
/// Hard upper bound (exclusive) for the TCP display scan.
const PORT_SCAN_END: u32 = 65536;

/// Failure of a single forward attempt. Contained: the owning shell
/// session is never affected, the one forwarded channel just dies.
#[derive(Debug)]
pub enum X11Error {
    /// The resolved display's socket refused the one connection attempt.
    Connect {
        path: String,
        source: std::io::Error,
    },
    /// No display number was known and the port scan reached its bound.
    ScanExhausted,
    Bridge(std::io::Error),
}

impl std::fmt::Display for X11Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            X11Error::Connect { path, source } => {
                write!(f, "display socket {path} refused: {source}")
            }
            X11Error::ScanExhausted => {
                write!(f, "no local display socket found below port {PORT_SCAN_END}")
            }
            X11Error::Bridge(err) => write!(f, "display bridge I/O failed: {err}"),
        }
    }
}

impl std::error::Error for X11Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            X11Error::Connect { source, .. } => Some(source),
            X11Error::Bridge(err) => Some(err),
            X11Error::ScanExhausted => None,
        }
    }
}

/// One end of an established bridge to the local display server.
pub enum DisplaySocket {
    Unix(UnixStream),
    Tcp(TcpStream),
}

/// Filesystem socket for a known display number.
pub fn unix_socket_path(display: u32) -> String {
    format!("/tmp/.X11-unix/X{display}")
}

/// Ports probed when no display number is known. The range end is the
/// hard termination bound of the scan.
pub fn scan_ports() -> std::ops::Range<u32> {
    PORT_SCAN_START..PORT_SCAN_END
}

/// Random MIT-MAGIC-COOKIE-1 payload (32 hex chars) for the x11 request.
pub fn fake_cookie() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Connect to the local display server.
///
/// With a known display number the Unix socket for that display is tried
/// exactly once; a refusal is fatal for this forward attempt. With no
/// display known, TCP ports are scanned from 6000 upward until one
/// connects or the bound is reached.
pub async fn connect_display(display: Option<u32>) -> Result<DisplaySocket, X11Error> {
    match display {
        Some(num) => {
            let path = unix_socket_path(num);
            let sock = UnixStream::connect(&path)
                .await
                .map_err(|e| X11Error::Connect { path, source: e })?;
            Ok(DisplaySocket::Unix(sock))
        }
        None => {
            for port in scan_ports() {
                match TcpStream::connect(("localhost", port as u16)).await {
                    Ok(sock) => {
                        debug!("display found on TCP port {port}");
                        return Ok(DisplaySocket::Tcp(sock));
                    }
                    Err(_) => continue,
                }
            }
            Err(X11Error::ScanExhausted)
        }
    }
}

/// Bridge a forwarded X11 channel to the local display server, full
/// duplex, until either side closes. Both ends close together when the
/// copy finishes or fails; no half stays open.
pub async fn bridge(channel: Channel<Msg>, display: Option<u32>) -> Result<(), X11Error> {
    let sock = connect_display(display).await?;
    let mut chan = channel.into_stream();
    let copied = match sock {
        DisplaySocket::Unix(mut s) => copy_bidirectional(&mut chan, &mut s).await,
        DisplaySocket::Tcp(mut s) => copy_bidirectional(&mut chan, &mut s).await,
    };
    match copied {
        Ok((to_display, to_remote)) => {
            debug!("x11 bridge closed ({to_display}B out, {to_remote}B in)");
            Ok(())
        }
        Err(err) => {
            warn!("x11 bridge terminated: {err}");
            Err(X11Error::Bridge(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_socket_path() {
        assert_eq!(unix_socket_path(0), "/tmp/.X11-unix/X0");
        assert_eq!(unix_socket_path(12), "/tmp/.X11-unix/X12");
    }

    #[test]
    fn test_scan_is_bounded() {
        let ports = scan_ports();
        assert_eq!(ports.start, 6000);
        // no attempt at or past 65536
        assert_eq!(ports.clone().last(), Some(65535));
        assert!(!ports.contains(&65536));
    }

    #[test]
    fn test_fake_cookie_is_hex() {
        let cookie = fake_cookie();
        assert_eq!(cookie.len(), 32);
        assert!(cookie.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(cookie, fake_cookie());
    }
}
