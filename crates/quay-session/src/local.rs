use std::io::Read;
use std::thread;

use log::warn;
use tokio::sync::broadcast;

use quay_pty::{shell_spec, HostEnv, PtyChild, PtyHandle, PtyReader};

use crate::error::SessionError;
use crate::event::{OutputStream, SessionEvent};
use crate::options::SessionOptions;

const EVENT_BUFFER: usize = 256;
const READ_BUFFER: usize = 8192;

/// A session backed by a locally spawned shell process.
pub struct LocalSession {
    pty: PtyHandle,
    events: broadcast::Sender<SessionEvent>,
}

impl LocalSession {
    /// Spawn the platform shell (per [`shell_spec`] policy) at the
    /// requested size, 80x24 when unset. A failed spawn rejects session
    /// creation.
    pub fn spawn(options: &SessionOptions, env: &HostEnv) -> Result<Self, SessionError> {
        let spec = shell_spec(env, options.term());
        let (pty, reader, child) = PtyHandle::spawn(&spec, options.cols(), options.rows())?;
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        start_read_thread(reader, child, events.clone());
        Ok(Self { pty, events })
    }

    /// Forward the new dimensions to the process handle.
    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), SessionError> {
        self.pty.resize(cols, rows)?;
        Ok(())
    }

    /// Send bytes to the shell's input. Failures are absorbed and logged
    /// so a broken pipe cannot crash the host application.
    pub fn write(&mut self, data: &[u8]) {
        if let Err(err) = self.pty.write(data) {
            warn!("local session write failed: {err}");
        }
    }

    /// Subscribe to output and exit events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Terminate the shell process. Never touches any SSH state.
    pub fn kill(&mut self) {
        if let Err(err) = self.pty.kill() {
            warn!("local session kill failed: {err}");
        }
    }
}

/// Dedicated OS thread for blocking PTY reads; a tokio task would pin a
/// runtime worker. Emits output chunks until EOF, then waits on the child
/// and emits the final exit event.
fn start_read_thread(
    mut reader: PtyReader,
    mut child: PtyChild,
    events: broadcast::Sender<SessionEvent>,
) {
    thread::Builder::new()
        .name("pty-read".to_string())
        .spawn(move || {
            let mut buf = [0u8; READ_BUFFER];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        let _ = events.send(SessionEvent::Output {
                            stream: OutputStream::Stdout,
                            bytes: buf[..n].to_vec(),
                        });
                    }
                }
            }
            let code = child.wait().ok().map(|status| status.exit_code());
            let _ = events.send(SessionEvent::Exit { code });
        })
        .expect("failed to spawn PTY read thread");
}

#[cfg(test)]
mod tests {
    use super::*;
    use quay_pty::Platform;
    use std::collections::HashMap;
    use std::time::Duration;

    fn test_env() -> HostEnv {
        let mut vars: HashMap<String, String> = HashMap::new();
        vars.insert("HOME".to_string(), "/tmp".to_string());
        HostEnv::with_platform(Platform::Unix, vars)
    }

    async fn collect_output(
        rx: &mut broadcast::Receiver<SessionEvent>,
        marker: &str,
    ) -> String {
        let mut text = String::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while tokio::time::Instant::now() < deadline {
            let event = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await;
            match event {
                Ok(Ok(SessionEvent::Output { bytes, .. })) => {
                    text.push_str(&String::from_utf8_lossy(&bytes));
                    if text.contains(marker) {
                        break;
                    }
                }
                Ok(Ok(_)) => {}
                Ok(Err(_)) | Err(_) => break,
            }
        }
        text
    }

    #[tokio::test]
    async fn test_spawn_write_and_subscribe() {
        let opts = SessionOptions::local(80, 24);
        let mut session = LocalSession::spawn(&opts, &test_env()).unwrap();
        let mut rx = session.subscribe();

        session.write(b"echo QUAY_LOCAL_OK\n");
        let text = collect_output(&mut rx, "QUAY_LOCAL_OK").await;
        assert!(text.contains("QUAY_LOCAL_OK"), "got: {text}");

        session.kill();
    }

    #[tokio::test]
    async fn test_resize_live_session() {
        let opts = SessionOptions::local(80, 24);
        let mut session = LocalSession::spawn(&opts, &test_env()).unwrap();
        assert!(session.resize(100, 40).is_ok());
        session.kill();
    }

    #[tokio::test]
    async fn test_kill_emits_exit_event() {
        let opts = SessionOptions::local(80, 24);
        let mut session = LocalSession::spawn(&opts, &test_env()).unwrap();
        let mut rx = session.subscribe();
        session.kill();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_secs(1), rx.recv()).await {
                Ok(Ok(SessionEvent::Exit { .. })) => return,
                Ok(Ok(_)) => {}
                Ok(Err(_)) | Err(_) => break,
            }
        }
        panic!("no exit event after kill");
    }
}
