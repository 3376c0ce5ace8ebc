//! Scripted transport and sleeper shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::rc::Rc;
use std::time::Duration;

use dwm_driver::{DrainInput, SettleTimings, Sleeper, Transport};

/// Something the driver did, in the order it did it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Write(Vec<u8>),
    Flush,
    Sleep(Duration),
    Discard,
    ReadLine,
    ReadUntil(Vec<u8>),
}

pub type OpLog = Rc<RefCell<Vec<Op>>>;

/// Transport that replays canned input and logs every call.
pub struct ScriptedTransport {
    log: OpLog,
    lines: VecDeque<Vec<u8>>,
    blocks: VecDeque<Vec<u8>>,
    /// Lines that arrive "early" and should be dropped by the next discard.
    stale: VecDeque<Vec<u8>>,
}

impl ScriptedTransport {
    pub fn new(log: OpLog) -> Self {
        ScriptedTransport {
            log,
            lines: VecDeque::new(),
            blocks: VecDeque::new(),
            stale: VecDeque::new(),
        }
    }

    /// Queue a line that will still be readable after any discard.
    pub fn push_line(&mut self, line: &str) {
        self.lines.push_back(line.as_bytes().to_vec());
    }

    /// Queue a line that sits in the input buffer until the next discard.
    pub fn push_stale_line(&mut self, line: &str) {
        self.stale.push_back(line.as_bytes().to_vec());
    }

    /// Queue a prompt-terminated block.
    pub fn push_block(&mut self, block: &str) {
        self.blocks.push_back(block.as_bytes().to_vec());
    }
}

impl Transport for ScriptedTransport {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.log.borrow_mut().push(Op::Write(data.to_vec()));
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.log.borrow_mut().push(Op::Flush);
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        self.log.borrow_mut().push(Op::ReadLine);
        self.stale
            .pop_front()
            .or_else(|| self.lines.pop_front())
            .ok_or_else(|| io::Error::new(io::ErrorKind::TimedOut, "no line scripted"))
    }

    fn read_until(&mut self, marker: &[u8]) -> io::Result<Vec<u8>> {
        self.log.borrow_mut().push(Op::ReadUntil(marker.to_vec()));
        self.blocks
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::TimedOut, "no block scripted"))
    }

    fn discard_buffered_input(&mut self) -> io::Result<()> {
        self.log.borrow_mut().push(Op::Discard);
        self.stale.clear();
        Ok(())
    }
}

/// Byte-level stand-in for a module, for use under `BufferedStream`.
///
/// Replies to a known command land in the input immediately, as if they
/// arrived during the settle delay. Streamed chunks arrive one per read once
/// the immediate input is used up, so a drain never reaches them.
#[derive(Default)]
pub struct SimulatedModule {
    replies: Vec<(Vec<u8>, Vec<u8>)>,
    arrived: VecDeque<u8>,
    later: VecDeque<Vec<u8>>,
    written: Vec<u8>,
}

impl SimulatedModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `command` with `reply` whenever it is written.
    pub fn reply(mut self, command: &str, reply: &str) -> Self {
        self.replies
            .push((command.as_bytes().to_vec(), reply.as_bytes().to_vec()));
        self
    }

    /// Queue output that arrives after any pending input has been read.
    pub fn stream(&mut self, chunk: &str) {
        self.later.push_back(chunk.as_bytes().to_vec());
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }
}

impl Read for SimulatedModule {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.arrived.is_empty() {
            match self.later.pop_front() {
                Some(chunk) => self.arrived.extend(chunk),
                None => return Err(io::Error::new(io::ErrorKind::TimedOut, "module silent")),
            }
        }
        let n = buf.len().min(self.arrived.len());
        for (slot, byte) in buf.iter_mut().zip(self.arrived.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for SimulatedModule {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        if let Some((_, reply)) = self.replies.iter().find(|(command, _)| command == buf) {
            self.arrived.extend(reply.iter().copied());
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl DrainInput for SimulatedModule {
    fn drain_input(&mut self) -> io::Result<usize> {
        let pending = self.arrived.len();
        self.arrived.clear();
        Ok(pending)
    }
}

/// Sleeper that logs instead of sleeping.
pub struct RecordingSleeper {
    log: OpLog,
}

impl RecordingSleeper {
    pub fn new(log: OpLog) -> Self {
        RecordingSleeper { log }
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.log.borrow_mut().push(Op::Sleep(duration));
    }
}

/// Fresh log, transport and sleeper sharing that log.
pub fn scripted() -> (OpLog, ScriptedTransport, RecordingSleeper) {
    let log: OpLog = Rc::new(RefCell::new(Vec::new()));
    let transport = ScriptedTransport::new(log.clone());
    let sleeper = RecordingSleeper::new(log.clone());
    (log, transport, sleeper)
}

/// Timings with distinct values so sleeps can be told apart in the log.
pub fn timings() -> SettleTimings {
    SettleTimings {
        reset_settle: Duration::from_millis(100),
        shell_startup: Duration::from_millis(1000),
        command_settle: Duration::from_millis(250),
    }
}

/// All bytes written so far, concatenated.
pub fn written(log: &OpLog) -> Vec<u8> {
    log.borrow()
        .iter()
        .filter_map(|op| match op {
            Op::Write(data) => Some(data.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}

/// Drain the log.
pub fn take(log: &OpLog) -> Vec<Op> {
    std::mem::take(&mut *log.borrow_mut())
}
