use tokio::process::Command;

/// Ask the host for the active X display number by echoing `$DISPLAY`
/// through the default shell. Any failure is treated as "no display
/// known" and the caller falls back to scanning.
pub async fn resolve_display() -> Option<u32> {
    let output = Command::new("sh")
        .arg("-c")
        .arg("echo $DISPLAY")
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    parse_display(&String::from_utf8_lossy(&output.stdout))
}

/// Extract the display number from a `$DISPLAY` value such as `:0`,
/// `:1.0`, or `localhost:10.0`. The number is whatever digits follow the
/// first colon that has any; screen suffixes are ignored.
pub fn parse_display(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    for (i, ch) in raw.char_indices() {
        if ch != ':' {
            continue;
        }
        let digits: String = raw[i + 1..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if !digits.is_empty() {
            return digits.parse().ok();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_display() {
        assert_eq!(parse_display(":0"), Some(0));
        assert_eq!(parse_display(":12"), Some(12));
    }

    #[test]
    fn test_parse_display_with_screen() {
        assert_eq!(parse_display(":1.0"), Some(1));
    }

    #[test]
    fn test_parse_display_with_host() {
        assert_eq!(parse_display("localhost:10.0"), Some(10));
    }

    #[test]
    fn test_parse_skips_empty_colon() {
        // matches the first colon followed by digits, not just the first colon
        assert_eq!(parse_display("::1"), Some(1));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_display(""), None);
        assert_eq!(parse_display("\n"), None);
        assert_eq!(parse_display("no display"), None);
        assert_eq!(parse_display("host:"), None);
    }

    #[test]
    fn test_parse_trims_shell_newline() {
        assert_eq!(parse_display(":3\n"), Some(3));
    }
}
