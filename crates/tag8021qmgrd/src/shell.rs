//! Shell command execution for the bridge backend.
//!
//! Commands run through `/bin/sh -c`; every interface name that ends up in
//! a command line goes through [`shellquote`] first.

use once_cell::sync::Lazy;
use regex::Regex;
use std::process::{Command, Stdio};
use tracing::{debug, trace, warn};

use crate::error::{MgrError, MgrResult};

/// Path to the `bridge` command for bridge/VLAN configuration.
pub const BRIDGE_CMD: &str = "/sbin/bridge";

/// Path to the shell used to run commands.
pub const SH_CMD: &str = "/bin/sh";

/// Characters that need escaping inside shell double quotes:
/// `$`, `` ` ``, `"`, `\` and newline.
static SHELL_ESCAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([$`"\\\n])"#).expect("Invalid regex pattern"));

/// Quotes a string for safe use in shell commands.
///
/// ```
/// use tag8021qmgrd::shell::shellquote;
///
/// assert_eq!(shellquote("swp0"), "\"swp0\"");
/// assert_eq!(shellquote("a$b"), "\"a\\$b\"");
/// ```
pub fn shellquote(s: &str) -> String {
    let escaped = SHELL_ESCAPE_RE.replace_all(s, r"\$1");
    format!("\"{}\"", escaped)
}

/// Result of a shell command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// The exit code of the command (0 = success, -1 if killed by a signal).
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecResult {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the combined output (stdout + stderr) for error messages.
    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Runs `cmd` through the shell and waits for it.
///
/// # Errors
///
/// Fails only if the shell could not be spawned; a non-zero exit is
/// reported in the returned [`ExecResult`].
pub fn exec(cmd: &str) -> MgrResult<ExecResult> {
    debug!(command = %cmd, "Executing shell command");

    let output = Command::new(SH_CMD)
        .arg("-c")
        .arg(cmd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| MgrError::ShellExec {
            command: cmd.to_string(),
            source: e,
        })?;

    let result = ExecResult {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    };

    if result.success() {
        trace!(command = %cmd, "Command succeeded");
    } else {
        warn!(
            command = %cmd,
            exit_code = result.exit_code,
            stderr = %result.stderr,
            "Command failed"
        );
    }

    Ok(result)
}

/// Runs `cmd` and turns a non-zero exit into an error.
///
/// Returns stdout on success.
pub fn exec_or_throw(cmd: &str) -> MgrResult<String> {
    let result = exec(cmd)?;
    if result.success() {
        Ok(result.stdout)
    } else {
        Err(MgrError::ShellCommandFailed {
            command: cmd.to_string(),
            exit_code: result.exit_code,
            output: result.combined_output(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_shellquote() {
        assert_eq!(shellquote("Ethernet0"), "\"Ethernet0\"");
        assert_eq!(shellquote("$HOME"), "\"\\$HOME\"");
        assert_eq!(shellquote("`id`"), "\"\\`id\\`\"");
        assert_eq!(shellquote("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(shellquote("a\\b"), "\"a\\\\b\"");
        assert_eq!(shellquote(""), "\"\"");
    }

    #[test]
    fn test_combined_output() {
        let mut result = ExecResult {
            exit_code: 1,
            stdout: String::new(),
            stderr: "RTNETLINK answers: No such device".to_string(),
        };
        assert!(!result.success());
        assert_eq!(result.combined_output(), "RTNETLINK answers: No such device");

        result.stdout = "out".to_string();
        assert_eq!(
            result.combined_output(),
            "out\nRTNETLINK answers: No such device"
        );
    }

    #[test]
    fn test_exec_echo() {
        let result = exec("echo hello").unwrap();
        assert!(result.success());
        assert_eq!(result.stdout, "hello");
    }

    #[test]
    fn test_exec_or_throw_failure() {
        match exec_or_throw("exit 3") {
            Err(MgrError::ShellCommandFailed { exit_code, .. }) => assert_eq!(exit_code, 3),
            other => panic!("expected ShellCommandFailed, got {other:?}"),
        }
    }
}
