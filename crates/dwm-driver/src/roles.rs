//! Device roles.
//!
//! Each role composes a [`ShellSession`] with a report parser. Listener and
//! passive tag read the same multi-tag report line and differ only in how the
//! tag identifier is presented; the active tag reads its own position.
//!
//! Nothing here retries. Parse and transport failures reach the caller
//! unchanged, and the caller decides whether to skip the line or give up.

use dwm_shell_protocol::{
    parse_listener_report, parse_passive_tag_report, parse_self_report, Position, ProtocolResult,
    SelfReportFormat, SystemInfo, TagId,
};
use tracing::debug;

use crate::config::SettleTimings;
use crate::error::DriverResult;
use crate::session::{ShellSession, Sleeper, ThreadSleeper};
use crate::transport::Transport;

/// Parser strategy turning one multi-tag report line into a tag and position.
pub type TagReportParser = fn(&str) -> ProtocolResult<(TagId, Position)>;

/// Anchor-side listener of many tags.
pub struct Listener<T, S = ThreadSleeper> {
    session: ShellSession<T, S>,
    parse: TagReportParser,
}

impl<T: Transport> Listener<T, ThreadSleeper> {
    /// Bring up a listener on `transport`.
    pub fn new(transport: T, timings: SettleTimings) -> DriverResult<Self> {
        Self::with_sleeper(transport, timings, ThreadSleeper)
    }
}

impl<T: Transport, S: Sleeper> Listener<T, S> {
    /// Bring up a listener with a custom sleeper.
    pub fn with_sleeper(transport: T, timings: SettleTimings, sleeper: S) -> DriverResult<Self> {
        Self::with_parser(transport, timings, sleeper, parse_listener_report)
    }

    /// Bring up a listener that decodes reports with `parse`.
    pub fn with_parser(
        transport: T,
        timings: SettleTimings,
        sleeper: S,
        parse: TagReportParser,
    ) -> DriverResult<Self> {
        let session = ShellSession::with_sleeper(transport, timings, sleeper).with_name("listener");
        Self::from_session(session, parse)
    }

    fn from_session(mut session: ShellSession<T, S>, parse: TagReportParser) -> DriverResult<Self> {
        session.bring_up()?;
        Ok(Listener { session, parse })
    }

    /// Start streaming reports.
    pub fn start_reporting(&mut self) -> DriverResult<()> {
        self.session.start_position_reporting()
    }

    /// Stop streaming reports.
    pub fn stop_reporting(&mut self) -> DriverResult<()> {
        self.session.stop_position_reporting()
    }

    /// Block until the next report arrives and decode it.
    pub fn next_report(&mut self) -> DriverResult<(TagId, Position)> {
        let line = self.session.read_report_line()?;
        match (self.parse)(&line) {
            Ok(report) => Ok(report),
            Err(e) => {
                debug!(
                    "Listener[{}]: Failed to parse report '{}': {}",
                    self.session.name(),
                    line,
                    e
                );
                Err(e.into())
            }
        }
    }

    /// Read the module's system information. Only valid while not reporting.
    pub fn system_info(&mut self) -> DriverResult<SystemInfo> {
        self.session.read_system_info()
    }

    /// Leave the shell, terminating any running command.
    pub fn shutdown(&mut self) -> DriverResult<()> {
        self.session.exit_shell_mode()
    }

    /// Get the underlying session.
    pub fn session(&self) -> &ShellSession<T, S> {
        &self.session
    }

    /// Get the underlying session mutably.
    pub fn session_mut(&mut self) -> &mut ShellSession<T, S> {
        &mut self.session
    }

    /// Release the transport.
    pub fn into_inner(self) -> T {
        self.session.into_inner()
    }
}

/// Listener whose tags are presented with the `DW` prefix.
///
/// Same wire format and same physical signal source as [`Listener`]; only
/// the identifier presentation differs, for consumers that key tags by their
/// `DW`-prefixed name.
pub struct PassiveTag<T, S = ThreadSleeper> {
    listener: Listener<T, S>,
}

impl<T: Transport> PassiveTag<T, ThreadSleeper> {
    /// Bring up a passive tag on `transport`.
    pub fn new(transport: T, timings: SettleTimings) -> DriverResult<Self> {
        Self::with_sleeper(transport, timings, ThreadSleeper)
    }
}

impl<T: Transport, S: Sleeper> PassiveTag<T, S> {
    /// Bring up a passive tag with a custom sleeper.
    pub fn with_sleeper(transport: T, timings: SettleTimings, sleeper: S) -> DriverResult<Self> {
        let session =
            ShellSession::with_sleeper(transport, timings, sleeper).with_name("passive-tag");
        let listener = Listener::from_session(session, parse_passive_tag_report)?;
        Ok(PassiveTag { listener })
    }

    /// Start streaming reports.
    pub fn start_reporting(&mut self) -> DriverResult<()> {
        self.listener.start_reporting()
    }

    /// Stop streaming reports.
    pub fn stop_reporting(&mut self) -> DriverResult<()> {
        self.listener.stop_reporting()
    }

    /// Block until the next report arrives and decode it.
    pub fn next_report(&mut self) -> DriverResult<(TagId, Position)> {
        self.listener.next_report()
    }

    /// Read the module's system information. Only valid while not reporting.
    pub fn system_info(&mut self) -> DriverResult<SystemInfo> {
        self.listener.system_info()
    }

    /// Leave the shell, terminating any running command.
    pub fn shutdown(&mut self) -> DriverResult<()> {
        self.listener.shutdown()
    }

    /// Get the underlying session.
    pub fn session(&self) -> &ShellSession<T, S> {
        self.listener.session()
    }

    /// Get the underlying session mutably.
    pub fn session_mut(&mut self) -> &mut ShellSession<T, S> {
        self.listener.session_mut()
    }

    /// Release the transport.
    pub fn into_inner(self) -> T {
        self.listener.into_inner()
    }
}

/// Tag reporting its own position.
pub struct ActiveTag<T, S = ThreadSleeper> {
    session: ShellSession<T, S>,
    format: SelfReportFormat,
}

impl<T: Transport> ActiveTag<T, ThreadSleeper> {
    /// Bring up an active tag on `transport`.
    pub fn new(transport: T, timings: SettleTimings, format: SelfReportFormat) -> DriverResult<Self> {
        Self::with_sleeper(transport, timings, format, ThreadSleeper)
    }
}

impl<T: Transport, S: Sleeper> ActiveTag<T, S> {
    /// Bring up an active tag with a custom sleeper.
    pub fn with_sleeper(
        transport: T,
        timings: SettleTimings,
        format: SelfReportFormat,
        sleeper: S,
    ) -> DriverResult<Self> {
        let mut session =
            ShellSession::with_sleeper(transport, timings, sleeper).with_name("active-tag");
        session.bring_up()?;
        Ok(ActiveTag { session, format })
    }

    /// Get the self-report shape this tag expects.
    pub fn format(&self) -> SelfReportFormat {
        self.format
    }

    /// Start streaming reports.
    pub fn start_reporting(&mut self) -> DriverResult<()> {
        self.session.start_position_reporting()
    }

    /// Stop streaming reports.
    pub fn stop_reporting(&mut self) -> DriverResult<()> {
        self.session.stop_position_reporting()
    }

    /// Block until the next self-position report arrives and decode it.
    pub fn position(&mut self) -> DriverResult<Position> {
        let line = self.session.read_report_line()?;
        parse_self_report(&line, self.format).map_err(|e| {
            debug!(
                "ActiveTag[{}]: Failed to parse report '{}': {}",
                self.session.name(),
                line,
                e
            );
            e.into()
        })
    }

    /// Read the module's system information. Only valid while not reporting.
    pub fn system_info(&mut self) -> DriverResult<SystemInfo> {
        self.session.read_system_info()
    }

    /// Leave the shell, terminating any running command.
    pub fn shutdown(&mut self) -> DriverResult<()> {
        self.session.exit_shell_mode()
    }

    /// Get the underlying session.
    pub fn session(&self) -> &ShellSession<T, S> {
        &self.session
    }

    /// Get the underlying session mutably.
    pub fn session_mut(&mut self) -> &mut ShellSession<T, S> {
        &mut self.session
    }

    /// Release the transport.
    pub fn into_inner(self) -> T {
        self.session.into_inner()
    }
}
