//! Base64 ASCII armor
//!
//! Both envelope artifacts are stored as standard base64 wrapped at 64
//! columns with a trailing newline, the layout `openssl base64` and
//! `openssl enc -a` produce. Readers accept any line width and ignore
//! whitespace.

use std::io::{self, Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::read::DecoderReader;
use base64::write::EncoderWriter;
use base64::Engine;

use crate::error::{CryptError, CryptResult};

/// Column at which armored output is wrapped
pub const LINE_WIDTH: usize = 64;

/// Streaming base64 encoder producing wrapped lines
pub struct ArmorWriter<W: Write> {
    encoder: EncoderWriter<'static, base64::engine::GeneralPurpose, LineWrapWriter<W>>,
}

impl<W: Write> ArmorWriter<W> {
    /// Wrap `inner`, which receives the armored text
    pub fn new(inner: W) -> Self {
        Self {
            encoder: EncoderWriter::new(LineWrapWriter::new(inner), &STANDARD),
        }
    }

    /// Flush the final base64 quantum and newline, returning the inner writer
    pub fn finish(mut self) -> io::Result<W> {
        let wrapper = self.encoder.finish()?;
        wrapper.finish()
    }
}

impl<W: Write> Write for ArmorWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.encoder.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.encoder.flush()
    }
}

/// Inserts a newline every [`LINE_WIDTH`] bytes
pub struct LineWrapWriter<W: Write> {
    inner: W,
    column: usize,
}

impl<W: Write> LineWrapWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, column: 0 }
    }

    /// Terminate the last line and return the inner writer
    fn finish(mut self) -> io::Result<W> {
        if self.column > 0 {
            self.inner.write_all(b"\n")?;
            self.column = 0;
        }
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for LineWrapWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < buf.len() {
            if self.column == LINE_WIDTH {
                self.inner.write_all(b"\n")?;
                self.column = 0;
            }
            let take = (LINE_WIDTH - self.column).min(buf.len() - written);
            self.inner.write_all(&buf[written..written + take])?;
            self.column += take;
            written += take;
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Drops ASCII whitespace from the underlying stream
struct StripWhitespace<R: Read> {
    inner: R,
}

impl<R: Read> Read for StripWhitespace<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = self.inner.read(buf)?;
            if n == 0 {
                return Ok(0);
            }

            let mut kept = 0;
            for i in 0..n {
                if !buf[i].is_ascii_whitespace() {
                    buf[kept] = buf[i];
                    kept += 1;
                }
            }

            if kept > 0 {
                return Ok(kept);
            }
        }
    }
}

/// Streaming base64 decoder over armored text
pub fn armor_reader<R: Read>(inner: R) -> impl Read {
    DecoderReader::new(StripWhitespace { inner }, &STANDARD)
}

/// Armor a small in-memory value
pub fn encode(bytes: &[u8]) -> CryptResult<Vec<u8>> {
    let mut writer = ArmorWriter::new(Vec::new());
    writer.write_all(bytes)?;
    Ok(writer.finish()?)
}

/// Decode a small armored value
pub fn decode(armored: &[u8]) -> CryptResult<Vec<u8>> {
    let compact: Vec<u8> = armored
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    STANDARD
        .decode(compact)
        .map_err(|e| CryptError::Decryption(format!("Invalid base64 armor: {}", e)))
}
