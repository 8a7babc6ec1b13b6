use std::collections::HashMap;

/// Platform family the host belongs to, for shell selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Unix
        }
    }
}

/// Snapshot of the host environment used during session initialization.
///
/// Captured once and passed in explicitly so that spawning is deterministic
/// and testable; nothing below this reads ambient process state.
#[derive(Debug, Clone)]
pub struct HostEnv {
    platform: Platform,
    vars: HashMap<String, String>,
}

impl HostEnv {
    /// Snapshot the real process environment.
    pub fn capture() -> Self {
        Self {
            platform: Platform::current(),
            vars: std::env::vars().collect(),
        }
    }

    /// Build an explicit environment, e.g. for tests.
    pub fn with_platform(platform: Platform, vars: HashMap<String, String>) -> Self {
        Self { platform, vars }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

/// Terminal name advertised to spawned shells when the caller sets none.
pub const DEFAULT_TERM: &str = "xterm-color";

/// Fully resolved command for a local shell session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<String>,
    pub term: String,
}

/// Select the shell executable, arguments, and working directory by
/// platform policy:
///
/// - Windows: PowerShell under `%windir%`, home from `USERPROFILE`.
/// - macOS: `bash --login` (login shell so the user's profile loads).
/// - elsewhere: plain `bash`, home from `HOME`.
///
/// The same `HostEnv` always yields the same spec.
pub fn shell_spec(env: &HostEnv, term: &str) -> ShellSpec {
    let (program, args) = match env.platform() {
        Platform::Windows => {
            let windir = env.var("windir").unwrap_or("C:\\Windows");
            (
                format!("{windir}\\System32\\WindowsPowerShell\\v1.0\\powershell.exe"),
                Vec::new(),
            )
        }
        Platform::MacOs => ("bash".to_string(), vec!["--login".to_string()]),
        Platform::Unix => ("bash".to_string(), Vec::new()),
    };

    let cwd = match env.platform() {
        Platform::Windows => env.var("USERPROFILE"),
        _ => env.var("HOME"),
    }
    .map(str::to_string);

    ShellSpec {
        program,
        args,
        cwd,
        term: term.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(platform: Platform, vars: &[(&str, &str)]) -> HostEnv {
        HostEnv::with_platform(
            platform,
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_windows_policy() {
        let env = env_with(
            Platform::Windows,
            &[("windir", "C:\\Windows"), ("USERPROFILE", "C:\\Users\\u")],
        );
        let spec = shell_spec(&env, DEFAULT_TERM);
        assert_eq!(
            spec.program,
            "C:\\Windows\\System32\\WindowsPowerShell\\v1.0\\powershell.exe"
        );
        assert!(spec.args.is_empty());
        assert_eq!(spec.cwd.as_deref(), Some("C:\\Users\\u"));
    }

    #[test]
    fn test_macos_adds_login_flag() {
        let env = env_with(Platform::MacOs, &[("HOME", "/Users/u")]);
        let spec = shell_spec(&env, DEFAULT_TERM);
        assert_eq!(spec.program, "bash");
        assert_eq!(spec.args, vec!["--login".to_string()]);
        assert_eq!(spec.cwd.as_deref(), Some("/Users/u"));
    }

    #[test]
    fn test_unix_policy() {
        let env = env_with(Platform::Unix, &[("HOME", "/home/u")]);
        let spec = shell_spec(&env, DEFAULT_TERM);
        assert_eq!(spec.program, "bash");
        assert!(spec.args.is_empty());
        assert_eq!(spec.cwd.as_deref(), Some("/home/u"));
    }

    #[test]
    fn test_missing_home_leaves_cwd_unset() {
        let env = env_with(Platform::Unix, &[]);
        let spec = shell_spec(&env, DEFAULT_TERM);
        assert_eq!(spec.cwd, None);
    }

    #[test]
    fn test_deterministic() {
        let env = env_with(Platform::Unix, &[("HOME", "/home/u")]);
        assert_eq!(shell_spec(&env, "xterm-256color"), shell_spec(&env, "xterm-256color"));
    }
}
