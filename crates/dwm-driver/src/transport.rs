//! Byte transports the shell session runs over.
//!
//! The session needs line reads, prompt-delimited reads, and the ability to
//! throw away input that arrived before a mode transition completed.
//! [`BufferedStream`] provides this over any stream that can also drop its
//! own pending input ([`DrainInput`]); [`SerialTransport`] opens a serial port
//! and wraps it.

use std::io::{self, Read, Write};
use std::net::TcpStream;

use dwm_shell_protocol::ShellCodec;
use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, trace};

use crate::config::SerialConfig;
use crate::error::DriverResult;

/// Size of a single read from the underlying stream.
pub const READ_CHUNK_SIZE: usize = 256;

/// A duplex byte channel to the module.
pub trait Transport {
    /// Write all of `data`.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush pending writes to the module.
    fn flush(&mut self) -> io::Result<()>;

    /// Block until a complete, non-empty line arrives. The terminator is not returned.
    fn read_line(&mut self) -> io::Result<Vec<u8>>;

    /// Block until `marker` arrives. The returned bytes include the marker.
    fn read_until(&mut self, marker: &[u8]) -> io::Result<Vec<u8>>;

    /// Drop everything received but not yet read.
    fn discard_buffered_input(&mut self) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        (**self).read_line()
    }

    fn read_until(&mut self, marker: &[u8]) -> io::Result<Vec<u8>> {
        (**self).read_until(marker)
    }

    fn discard_buffered_input(&mut self) -> io::Result<()> {
        (**self).discard_buffered_input()
    }
}

/// Streams that can drop input the module sent but the host has not read.
///
/// Clearing only the framing buffer is not enough: bytes still queued in the
/// OS or driver would reach the parser on the next read.
pub trait DrainInput {
    /// Drop all input currently pending on the stream. Returns the number of
    /// bytes dropped, when known.
    fn drain_input(&mut self) -> io::Result<usize>;
}

impl DrainInput for Box<dyn SerialPort> {
    fn drain_input(&mut self) -> io::Result<usize> {
        let pending = self.bytes_to_read()? as usize;
        self.clear(ClearBuffer::Input)?;
        Ok(pending)
    }
}

impl DrainInput for TcpStream {
    fn drain_input(&mut self) -> io::Result<usize> {
        self.set_nonblocking(true)?;
        let drained = drain_nonblocking(self);
        self.set_nonblocking(false)?;
        drained
    }
}

/// Read until the stream would block. Only valid on a non-blocking stream.
fn drain_nonblocking<R: Read>(stream: &mut R) -> io::Result<usize> {
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    let mut total = 0;
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => return Ok(total),
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(total),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Line and prompt framing over a byte stream (serial port, TCP bridge, ...).
pub struct BufferedStream<S> {
    stream: S,
    codec: ShellCodec,
}

impl<S: Read + Write + DrainInput> BufferedStream<S> {
    /// Wrap a stream.
    pub fn new(stream: S) -> Self {
        BufferedStream {
            stream,
            codec: ShellCodec::new(),
        }
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Get a mutable reference to the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Release the underlying stream, dropping buffered input.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Read one chunk from the stream into the codec.
    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "stream closed by module",
                    ))
                }
                Ok(n) => {
                    trace!("BufferedStream: received {} bytes", n);
                    self.codec.push(&chunk[..n]);
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<S: Read + Write + DrainInput> Transport for BufferedStream<S> {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        loop {
            if let Some(line) = self.codec.decode_line() {
                return Ok(line);
            }
            self.fill()?;
        }
    }

    fn read_until(&mut self, marker: &[u8]) -> io::Result<Vec<u8>> {
        loop {
            if let Some(block) = self.codec.decode_until(marker) {
                return Ok(block);
            }
            self.fill()?;
        }
    }

    fn discard_buffered_input(&mut self) -> io::Result<()> {
        if self.codec.buffered_len() > 0 {
            trace!(
                "BufferedStream: discarding {} framed bytes: {:?}",
                self.codec.buffered_len(),
                self.codec.buffer_as_str()
            );
        }
        self.codec.clear();
        let drained = self.stream.drain_input()?;
        if drained > 0 {
            trace!("BufferedStream: discarded {} pending stream bytes", drained);
        }
        Ok(())
    }
}

/// Transport over a local serial port.
pub struct SerialTransport {
    inner: BufferedStream<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Open the port described by `config`.
    pub fn open(config: &SerialConfig) -> DriverResult<Self> {
        debug!(
            "SerialTransport: opening {} at {} baud (timeout {:?})",
            config.port, config.baud_rate, config.read_timeout
        );
        let port = serialport::new(config.port.as_str(), config.baud_rate)
            .timeout(config.read_timeout)
            .open()?;
        Ok(Self::from_port(port))
    }

    /// Wrap an already opened port.
    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        SerialTransport {
            inner: BufferedStream::new(port),
        }
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        Transport::flush(&mut self.inner)
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        self.inner.read_line()
    }

    fn read_until(&mut self, marker: &[u8]) -> io::Result<Vec<u8>> {
        self.inner.read_until(marker)
    }

    fn discard_buffered_input(&mut self) -> io::Result<()> {
        self.inner.discard_buffered_input()
    }
}
