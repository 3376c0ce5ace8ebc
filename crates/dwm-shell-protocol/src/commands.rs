//! Commands that can be sent to the module shell.
//!
//! The shell understands far more than this, but the driver only ever needs
//! this closed set.

use crate::codec::{ShellCodec, LINE_TERMINATOR};

/// Byte sequence that wakes the shell from raw (binary API) mode.
pub const SHELL_ENTRY_PROBE: &[u8] = b"\r\r";

/// Commands the driver sends to the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellCommand {
    /// Reboot the module. Aborts whatever command was running.
    Reset,

    /// Switch from raw mode into the interactive shell.
    ///
    /// This is a bare double carriage return and carries no extra terminator.
    EnterShell,

    /// A lone carriage return. Stops a streaming command and returns to the prompt.
    Enter,

    /// Start streaming position reports (`lep`).
    StartPositionReporting,

    /// Print system information (`si`).
    SystemInfo,
}

impl ShellCommand {
    /// Get the command text without any terminator.
    ///
    /// `EnterShell` and `Enter` have no command text.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShellCommand::Reset => "reset",
            ShellCommand::EnterShell => "",
            ShellCommand::Enter => "",
            ShellCommand::StartPositionReporting => "lep",
            ShellCommand::SystemInfo => "si",
        }
    }

    /// Encode the command as the exact bytes to write to the module.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            ShellCommand::EnterShell => SHELL_ENTRY_PROBE.to_vec(),
            ShellCommand::Enter => vec![LINE_TERMINATOR],
            _ => ShellCodec::encode_command(self.as_str()),
        }
    }
}

impl std::fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShellCommand::EnterShell => write!(f, "<enter-shell>"),
            ShellCommand::Enter => write!(f, "<enter>"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}
