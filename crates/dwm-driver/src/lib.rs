//! DWM1001 shell driver
//!
//! Drives a Decawave DWM1001 module through its UART shell: puts it into a
//! known shell state, starts and stops position reporting, and decodes the
//! report stream into typed records.
//!
//! The model is synchronous and blocking. Each role exclusively owns its
//! transport; command and response pairing relies on strict alternation, so
//! a transport must never be shared between sessions.
//!
//! # Example
//!
//! ```no_run
//! use dwm_driver::{DriverConfig, Listener, SerialTransport};
//!
//! let config = DriverConfig::default();
//! let transport = SerialTransport::open(&config.serial)?;
//! let mut listener = Listener::new(transport, config.timings)?;
//! listener.start_reporting()?;
//!
//! loop {
//!     let (tag, position) = listener.next_report()?;
//!     println!("{}: {}", tag, position);
//! }
//! # Ok::<(), dwm_driver::DriverError>(())
//! ```

mod config;
mod error;
mod roles;
mod session;
mod transport;

pub use config::*;
pub use error::*;
pub use roles::*;
pub use session::*;
pub use transport::*;

pub use dwm_shell_protocol::{ParseError, Position, SelfReportFormat, SystemInfo, TagId};
