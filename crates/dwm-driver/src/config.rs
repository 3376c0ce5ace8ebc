//! Driver configuration.
//!
//! Settle delays are hardware characteristics measured on real modules. They
//! are sequencing points, not tuning knobs: shortening them means the next
//! step runs before the module has produced the output it assumes.
//!
//! Configuration can be loaded from YAML:
//!
//! ```yaml
//! serial:
//!   port: /dev/ttyACM0
//!   baud_rate: 115200
//!   read_timeout_ms: 5000
//! timings:
//!   reset_settle_ms: 100
//!   shell_startup_ms: 1000
//!   command_settle_ms: 100
//! self_report_format: current
//! ```

use std::path::Path;
use std::time::Duration;

use dwm_shell_protocol::SelfReportFormat;
use serde::{Deserialize, Serialize};

use crate::error::{DriverError, DriverResult};

/// Default delay after a reset before the module accepts input.
pub const DEFAULT_RESET_SETTLE: Duration = Duration::from_millis(100);

/// Default delay after the shell entry probe before the shell is usable.
pub const DEFAULT_SHELL_STARTUP: Duration = Duration::from_millis(1000);

/// Default delay after each command before its output is meaningful.
pub const DEFAULT_COMMAND_SETTLE: Duration = Duration::from_millis(100);

/// Default serial port (first CDC-ACM device on Linux).
pub const DEFAULT_PORT: &str = "/dev/ttyACM0";

/// Default UART baud rate of the module shell.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default serial read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(5000);

/// Settle delays enforced by the shell session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleTimings {
    /// Wait after `reset`.
    #[serde(rename = "reset_settle_ms", with = "duration_ms")]
    pub reset_settle: Duration,
    /// Wait after the shell entry probe.
    #[serde(rename = "shell_startup_ms", with = "duration_ms")]
    pub shell_startup: Duration,
    /// Wait after every shell command.
    #[serde(rename = "command_settle_ms", with = "duration_ms")]
    pub command_settle: Duration,
}

impl Default for SettleTimings {
    fn default() -> Self {
        SettleTimings {
            reset_settle: DEFAULT_RESET_SETTLE,
            shell_startup: DEFAULT_SHELL_STARTUP,
            command_settle: DEFAULT_COMMAND_SETTLE,
        }
    }
}

impl SettleTimings {
    /// Check that the timings are usable.
    ///
    /// Shell startup must not be shorter than the reset settle time: the
    /// shell comes up only after the reboot triggered by reset completes.
    pub fn validate(&self) -> DriverResult<()> {
        if self.shell_startup < self.reset_settle {
            return Err(DriverError::Config(format!(
                "shell_startup ({:?}) is shorter than reset_settle ({:?})",
                self.shell_startup, self.reset_settle
            )));
        }
        Ok(())
    }
}

/// Serial link settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port path or name.
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Timeout for a single blocking read.
    #[serde(rename = "read_timeout_ms", with = "duration_ms")]
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Complete driver configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Serial link settings.
    pub serial: SerialConfig,
    /// Settle delays.
    pub timings: SettleTimings,
    /// Shape of self-position reports for the active-tag role.
    pub self_report_format: SelfReportFormat,
}

impl DriverConfig {
    /// Parse configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> DriverResult<Self> {
        let config: DriverConfig =
            serde_yaml::from_str(yaml).map_err(|e| DriverError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> DriverResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| DriverError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&yaml)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> DriverResult<()> {
        if self.serial.port.is_empty() {
            return Err(DriverError::Config("serial port is empty".to_string()));
        }
        if self.serial.baud_rate == 0 {
            return Err(DriverError::Config("baud rate must be non-zero".to_string()));
        }
        self.timings.validate()
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
