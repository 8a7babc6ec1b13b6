use serde::Serialize;

/// Which output stream a chunk came from. Remote shells expose two
/// independent streams; local PTYs only ever produce `Stdout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// A session's single typed event source, delivered over a broadcast
/// channel from [`Session::subscribe`](crate::Session::subscribe).
///
/// Serializes with a `kind` tag so app frontends can switch on it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    Output {
        stream: OutputStream,
        bytes: Vec<u8>,
    },
    Exit {
        code: Option<u32>,
    },
    Closed,
    /// One forwarded display channel could not be bridged; the shell
    /// session itself is unaffected.
    X11ForwardFailed {
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_carry_kind_tag() {
        let event = SessionEvent::Output {
            stream: OutputStream::Stderr,
            bytes: b"oops".to_vec(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "output");
        assert_eq!(json["stream"], "stderr");

        let exit = serde_json::to_value(SessionEvent::Exit { code: Some(1) }).unwrap();
        assert_eq!(exit["kind"], "exit");
        assert_eq!(exit["code"], 1);
    }
}
