//! DWM1001 UART Shell Protocol
//!
//! This crate provides types and utilities for talking to a Decawave DWM1001
//! module through its interactive UART shell. The shell is meant for humans:
//! commands are echoed, output is interleaved with `dwm> ` prompts, and the
//! framing differs between one-shot commands and streaming modes.
//!
//! # Protocol Overview
//!
//! - **Shell entry** (host → module): a double carriage return (`\r\r`)
//! - **Commands** (host → module): command name terminated with `\r`
//! - **Position reports** (module → host): one comma-separated line per report,
//!   discriminated by a leading `POS` field
//! - **One-shot responses** (module → host): multi-line text terminated by the
//!   `dwm> ` prompt
//!
//! # Example
//!
//! ```rust
//! use dwm_shell_protocol::{parse_listener_report, Position, ShellCommand};
//!
//! assert_eq!(ShellCommand::StartPositionReporting.encode(), b"lep\r");
//!
//! let (tag, position) = parse_listener_report("POS,1,TEST1,1.23,4.56,7.89,20,86")?;
//! assert_eq!(tag.as_str(), "TEST1");
//! assert!(position.approx_eq(&Position::new(1.23, 4.56, 7.89, 20)));
//! # Ok::<(), dwm_shell_protocol::ParseError>(())
//! ```

mod codec;
mod commands;
mod error;
mod responses;
mod types;

pub use codec::*;
pub use commands::*;
pub use error::*;
pub use responses::*;
pub use types::*;
