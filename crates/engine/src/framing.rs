//! Message transport over byte streams
//!
//! Two framings are supported:
//!
//! ```text
//! Lines:          <message bytes> '\n'            (JSON)
//! LengthPrefixed: u32 BE length | <message bytes> (MessagePack)
//! ```
//!
//! A [`Source`] yields whole messages until the stream ends cleanly; a
//! [`Sink`] writes whole messages. Transport errors are always fatal to a
//! run, unlike per-message decode failures.

use std::io::{BufRead, ErrorKind, Read, Write};

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use docmerge_core::{Error, Result};

use crate::config::CodecKind;

/// Largest frame accepted by [`FramedSource`]
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

const HEADER_LEN: usize = 4;

/// Framing used on a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Newline-delimited messages
    Lines,
    /// Big-endian u32 length prefix per message
    LengthPrefixed,
}

impl CodecKind {
    /// Framing that fits this codec's output
    pub fn framing(self) -> Framing {
        match self {
            CodecKind::Json => Framing::Lines,
            CodecKind::Msgpack => Framing::LengthPrefixed,
        }
    }
}

/// Yields inbound messages
pub trait Source {
    /// Next message, or `None` at a clean end of stream
    fn next_message(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Accepts outbound messages
pub trait Sink {
    /// Write one message
    fn send(&mut self, message: &[u8]) -> Result<()>;

    /// Push buffered output downstream
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Lines
// ============================================================================

/// Newline-delimited reader; blank lines are skipped and `\r\n` is accepted
#[derive(Debug)]
pub struct LineSource<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LineSource<R> {
    /// Wrap a buffered reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Source for LineSource<R> {
    fn next_message(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
                return Ok(None);
            }
            let mut line = self.buf.as_slice();
            if let Some(rest) = line.strip_suffix(b"\n") {
                line = rest;
            }
            if let Some(rest) = line.strip_suffix(b"\r") {
                line = rest;
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Ok(Some(line.to_vec()));
        }
    }
}

/// Newline-delimited writer
#[derive(Debug)]
pub struct LineSink<W> {
    writer: W,
}

impl<W: Write> LineSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Sink for LineSink<W> {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        if message.contains(&b'\n') {
            return Err(Error::Encode(
                "message contains a newline and cannot be line-framed".to_string(),
            ));
        }
        self.writer.write_all(message)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

// ============================================================================
// Length-prefixed
// ============================================================================

/// Length-prefixed reader
#[derive(Debug)]
pub struct FramedSource<R> {
    reader: R,
}

impl<R: Read> FramedSource<R> {
    /// Wrap a reader
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Fill the header; `false` if the stream ended before its first byte
    fn read_header(&mut self, header: &mut [u8; HEADER_LEN]) -> Result<bool> {
        let mut filled = 0;
        while filled < HEADER_LEN {
            match self.reader.read(&mut header[filled..]) {
                Ok(0) if filled == 0 => return Ok(false),
                Ok(0) => {
                    return Err(Error::Decode(format!(
                        "stream ended inside a frame header ({} of {} bytes)",
                        filled, HEADER_LEN
                    )))
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(true)
    }
}

impl<R: Read> Source for FramedSource<R> {
    fn next_message(&mut self) -> Result<Option<Vec<u8>>> {
        let mut header = [0u8; HEADER_LEN];
        if !self.read_header(&mut header)? {
            return Ok(None);
        }
        let len = BigEndian::read_u32(&header) as usize;
        if len > MAX_FRAME_LEN {
            return Err(Error::Decode(format!(
                "frame of {} bytes exceeds limit of {}",
                len, MAX_FRAME_LEN
            )));
        }

        let mut message = vec![0u8; len];
        self.reader.read_exact(&mut message).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                Error::Decode(format!("stream ended inside a {}-byte frame", len))
            } else {
                e.into()
            }
        })?;
        Ok(Some(message))
    }
}

/// Length-prefixed writer
#[derive(Debug)]
pub struct FramedSink<W> {
    writer: W,
}

impl<W: Write> FramedSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Sink for FramedSink<W> {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        if message.len() > MAX_FRAME_LEN {
            return Err(Error::Encode(format!(
                "message of {} bytes exceeds frame limit of {}",
                message.len(),
                MAX_FRAME_LEN
            )));
        }
        self.writer.write_u32::<BigEndian>(message.len() as u32)?;
        self.writer.write_all(message)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Source over an iterator of ready-made messages
#[derive(Debug)]
pub struct IterSource<I> {
    messages: I,
}

impl<I: Iterator<Item = Vec<u8>>> IterSource<I> {
    /// Wrap anything that yields messages
    pub fn new(messages: impl IntoIterator<Item = Vec<u8>, IntoIter = I>) -> Self {
        Self {
            messages: messages.into_iter(),
        }
    }
}

impl<I: Iterator<Item = Vec<u8>>> Source for IterSource<I> {
    fn next_message(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.messages.next())
    }
}

impl Sink for Vec<Vec<u8>> {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.push(message.to_vec());
        Ok(())
    }
}
