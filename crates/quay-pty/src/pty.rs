use std::io::{Read, Write};

use log::debug;
use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize};

use crate::shell::ShellSpec;

/// Errors from PTY operations.
#[derive(Debug)]
pub enum PtyError {
    SpawnFailed(String),
    IoError(std::io::Error),
    ResizeFailed(String),
}

impl std::fmt::Display for PtyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PtyError::SpawnFailed(msg) => write!(f, "PTY spawn failed: {msg}"),
            PtyError::IoError(err) => write!(f, "PTY I/O error: {err}"),
            PtyError::ResizeFailed(msg) => write!(f, "PTY resize failed: {msg}"),
        }
    }
}

impl std::error::Error for PtyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PtyError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PtyError {
    fn from(err: std::io::Error) -> Self {
        PtyError::IoError(err)
    }
}

/// Blocking reader over the PTY master. Owned by a dedicated I/O thread.
pub type PtyReader = Box<dyn Read + Send>;

/// The spawned child process handle, for waiting on its exit status.
pub type PtyChild = Box<dyn Child + Send + Sync>;

/// Owns the PTY master side: the resize handle, the input writer, and a
/// killer for the child process. The reader and the child itself are
/// returned separately from [`PtyHandle::spawn`] so blocking reads and the
/// final `wait()` can live on their own thread.
pub struct PtyHandle {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    killer: Box<dyn ChildKiller + Send + Sync>,
}

impl PtyHandle {
    /// Spawn the given shell command in a new PTY at the given dimensions.
    ///
    /// The command's environment is inherited from the calling process;
    /// program, arguments, working directory, and `TERM` come from `spec`.
    /// A failed spawn always surfaces as [`PtyError::SpawnFailed`].
    pub fn spawn(
        spec: &ShellSpec,
        cols: u16,
        rows: u16,
    ) -> Result<(Self, PtyReader, PtyChild), PtyError> {
        let pty_system = native_pty_system();

        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::SpawnFailed(format!("failed to open PTY: {e}")))?;

        let mut cmd = CommandBuilder::new(&spec.program);
        cmd.args(&spec.args);
        cmd.env("TERM", &spec.term);
        if let Some(cwd) = &spec.cwd {
            cmd.cwd(cwd);
        }

        debug!("spawning {} at {cols}x{rows}", spec.program);

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| PtyError::SpawnFailed(format!("failed to spawn command: {e}")))?;

        let killer = child.clone_killer();

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::SpawnFailed(format!("failed to clone reader: {e}")))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::SpawnFailed(format!("failed to take writer: {e}")))?;

        Ok((
            Self {
                master: pair.master,
                writer,
                killer,
            },
            reader,
            child,
        ))
    }

    /// Resize the PTY to new dimensions.
    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), PtyError> {
        self.master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::ResizeFailed(format!("{e}")))
    }

    /// Write bytes to the PTY master (user input -> shell).
    pub fn write(&mut self, data: &[u8]) -> Result<(), PtyError> {
        self.writer.write_all(data)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Terminate the child process.
    pub fn kill(&mut self) -> Result<(), PtyError> {
        self.killer.kill().map_err(PtyError::IoError)
    }
}
