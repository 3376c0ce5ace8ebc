//! Shell session controller.
//!
//! The session owns the transport and the module's interaction mode, and
//! enforces the settle delays the hardware needs between a write and the
//! point where its effect can be trusted.
//!
//! ```text
//!            reset / exit_shell_mode (from any mode)
//!        +------------------------------------------+
//!        v                                          |
//!   Unknown --enter_shell_mode--> ShellActive --start_position_reporting--> Reporting
//!                                      ^                                       |
//!                                      +-------stop_position_reporting---------+
//! ```

use std::time::Duration;

use dwm_shell_protocol::{decode_text, strip_prompt_block, ShellCommand, SystemInfo, SHELL_PROMPT};
use tracing::{debug, trace};

use crate::config::SettleTimings;
use crate::error::{DriverError, DriverResult};
use crate::transport::Transport;

/// Interaction mode of the module as tracked by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellMode {
    /// State not known (fresh connection, or rebooting after reset).
    Unknown,
    /// Shell prompt active, ready for commands.
    ShellActive,
    /// A position-reporting stream is running.
    Reporting,
}

impl std::fmt::Display for ShellMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShellMode::Unknown => write!(f, "unknown"),
            ShellMode::ShellActive => write!(f, "shell"),
            ShellMode::Reporting => write!(f, "reporting"),
        }
    }
}

/// Suspends the calling thread for settle delays.
pub trait Sleeper {
    /// Block for `duration`.
    fn sleep(&mut self, duration: Duration);
}

/// Sleeper backed by [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Shell session over a single, exclusively owned transport.
pub struct ShellSession<T, S = ThreadSleeper> {
    name: String,
    transport: T,
    timings: SettleTimings,
    sleeper: S,
    mode: ShellMode,
}

impl<T: Transport> ShellSession<T, ThreadSleeper> {
    /// Create a session in [`ShellMode::Unknown`]. Nothing is written yet.
    pub fn new(transport: T, timings: SettleTimings) -> Self {
        Self::with_sleeper(transport, timings, ThreadSleeper)
    }
}

impl<T: Transport, S: Sleeper> ShellSession<T, S> {
    /// Create a session with a custom sleeper.
    pub fn with_sleeper(transport: T, timings: SettleTimings, sleeper: S) -> Self {
        ShellSession {
            name: "dwm".to_string(),
            transport,
            timings,
            sleeper,
            mode: ShellMode::Unknown,
        }
    }

    /// Set the name used in log output.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Get the session name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the current shell mode.
    pub fn mode(&self) -> ShellMode {
        self.mode
    }

    /// Get the settle timings.
    pub fn timings(&self) -> &SettleTimings {
        &self.timings
    }

    /// Get a reference to the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the transport.
    ///
    /// Writing to the transport directly bypasses mode tracking.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Release the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Put the module into a known shell state: reset, then enter shell mode.
    ///
    /// The module may have been left streaming by an earlier session that did
    /// not shut down cleanly, so bring-up never trusts the current state.
    pub fn bring_up(&mut self) -> DriverResult<()> {
        debug!("ShellSession[{}]: Bringing up shell", self.name);
        self.reset()?;
        self.enter_shell_mode()
    }

    /// Reboot the module, aborting any running command.
    pub fn reset(&mut self) -> DriverResult<()> {
        self.write_command(ShellCommand::Reset)?;
        self.settle("reset", self.timings.reset_settle);
        self.set_mode(ShellMode::Unknown);
        Ok(())
    }

    /// Switch the module from raw mode into the shell.
    ///
    /// Anything received before the shell finished starting (boot banner,
    /// prompts) is discarded.
    pub fn enter_shell_mode(&mut self) -> DriverResult<()> {
        self.write_command(ShellCommand::EnterShell)?;
        self.settle("shell startup", self.timings.shell_startup);
        self.discard_input()?;
        self.set_mode(ShellMode::ShellActive);
        Ok(())
    }

    /// Leave the shell.
    ///
    /// This is a reset rather than the shell's `quit`: quitting while `lep` is
    /// armed leaves it armed, and it resumes streaming on the next shell entry.
    /// A reset is the only way to guarantee the running command terminates.
    pub fn exit_shell_mode(&mut self) -> DriverResult<()> {
        debug!("ShellSession[{}]: Exiting shell via reset", self.name);
        self.reset()
    }

    /// Send a command and wait for the module to process it.
    ///
    /// Commands must not be pipelined: the module's next output is only
    /// meaningful once the settle delay has passed.
    pub fn send_shell_command(&mut self, command: ShellCommand) -> DriverResult<()> {
        self.write_command(command)?;
        self.settle("command", self.timings.command_settle);
        Ok(())
    }

    /// Start streaming position reports.
    ///
    /// The first line after `lep` carries trailing prompt bytes, so buffered
    /// input is discarded before any report is read.
    pub fn start_position_reporting(&mut self) -> DriverResult<()> {
        self.require_mode("start position reporting", ShellMode::ShellActive)?;
        self.send_shell_command(ShellCommand::StartPositionReporting)?;
        self.discard_input()?;
        self.set_mode(ShellMode::Reporting);
        Ok(())
    }

    /// Stop streaming and return to the idle prompt.
    ///
    /// The module answers with a fresh prompt, possibly behind reports that
    /// were still in flight; both are discarded.
    pub fn stop_position_reporting(&mut self) -> DriverResult<()> {
        self.require_mode("stop position reporting", ShellMode::Reporting)?;
        self.send_shell_command(ShellCommand::Enter)?;
        self.discard_input()?;
        self.set_mode(ShellMode::ShellActive);
        Ok(())
    }

    /// Read one report line while reporting.
    pub fn read_report_line(&mut self) -> DriverResult<String> {
        self.require_mode("read a report", ShellMode::Reporting)?;
        let raw = self.transport.read_line()?;
        let line = decode_text(&raw)?.trim().to_string();
        trace!("ShellSession[{}]: Report line '{}'", self.name, line);
        Ok(line)
    }

    /// Query and parse the module's system information.
    ///
    /// The response is read up to the next prompt, so any prompt already
    /// waiting in the input is discarded before `si` is sent.
    pub fn read_system_info(&mut self) -> DriverResult<SystemInfo> {
        self.require_mode("read system info", ShellMode::ShellActive)?;
        self.discard_input()?;
        self.send_shell_command(ShellCommand::SystemInfo)?;

        let raw = self.transport.read_until(SHELL_PROMPT)?;
        let text = decode_text(&raw)?;
        let block = strip_prompt_block(text, ShellCommand::SystemInfo.as_str());
        trace!("ShellSession[{}]: System info block:\n{}", self.name, block);

        let info = SystemInfo::parse(&block)?;
        debug!(
            "ShellSession[{}]: System info address={} label={}",
            self.name, info.uwb_address, info.label
        );
        Ok(info)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn write_command(&mut self, command: ShellCommand) -> DriverResult<()> {
        let bytes = command.encode();
        trace!(
            "ShellSession[{}]: Sending {} ({} bytes)",
            self.name,
            command,
            bytes.len()
        );
        self.transport.write_all(&bytes)?;
        self.transport.flush()?;
        Ok(())
    }

    fn discard_input(&mut self) -> DriverResult<()> {
        trace!("ShellSession[{}]: Discarding buffered input", self.name);
        self.transport.discard_buffered_input()?;
        Ok(())
    }

    fn settle(&mut self, what: &str, duration: Duration) {
        trace!("ShellSession[{}]: Waiting {:?} for {}", self.name, duration, what);
        self.sleeper.sleep(duration);
    }

    fn set_mode(&mut self, mode: ShellMode) {
        if self.mode != mode {
            debug!("ShellSession[{}]: {} -> {}", self.name, self.mode, mode);
        }
        self.mode = mode;
    }

    fn require_mode(&self, operation: &'static str, required: ShellMode) -> DriverResult<()> {
        if self.mode != required {
            return Err(DriverError::InvalidMode {
                operation,
                mode: self.mode,
            });
        }
        Ok(())
    }
}
