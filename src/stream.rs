//! Digesting content streams.
//!
//! `DigestReader` wraps a raw byte source and, while the bytes are consumed
//! exactly once, accumulates a running MD5, counts total length, and captures
//! a fixed-size header for content-type sniffing. `DigestWriter` is the
//! retrieval-side twin used to re-verify stored content.

use md5::{Digest, Md5};
use std::io::{self, Read, Write};

/// Default header capture size: 64 KiB.
pub const DEFAULT_HEADER_LIMIT: usize = 64 * 1024;

/// Read-side digest stream.
///
/// `fill_header` pre-reads up to the header limit with a read-until-full
/// loop: a short read from a pipe or socket is not end-of-stream, only
/// `Ok(0)` is. The captured bytes are replayed before the remainder of the
/// source, so the wrapped stream still yields every byte exactly once and
/// type detection never needs the whole file buffered.
pub struct DigestReader<R> {
    inner: R,
    hasher: Md5,
    len: u64,
    header: Vec<u8>,
    header_limit: usize,
    replayed: usize,
}

impl<R: Read> DigestReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_header_limit(inner, DEFAULT_HEADER_LIMIT)
    }

    pub fn with_header_limit(inner: R, header_limit: usize) -> Self {
        Self {
            inner,
            hasher: Md5::new(),
            len: 0,
            header: Vec::new(),
            header_limit,
            replayed: 0,
        }
    }

    /// Capture the sniff header. Must be called before the stream is
    /// consumed; blocks until the limit is reached or the source ends.
    pub fn fill_header(&mut self) -> io::Result<&[u8]> {
        debug_assert_eq!(self.len, 0, "fill_header after reads began");
        let mut buf = [0u8; 8192];
        while self.header.len() < self.header_limit {
            let want = (self.header_limit - self.header.len()).min(buf.len());
            let n = self.inner.read(&mut buf[..want])?;
            if n == 0 {
                break;
            }
            self.header.extend_from_slice(&buf[..n]);
        }
        Ok(&self.header)
    }

    /// Header bytes captured so far.
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// Canonical lowercase hex digest of all bytes read so far. Meaningful
    /// after full consumption.
    pub fn md5_hex(&self) -> String {
        hex::encode(self.hasher.clone().finalize())
    }

    /// Total bytes handed to the consumer.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<R: Read> Read for DigestReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // Replay the captured header before touching the source again.
        if self.replayed < self.header.len() {
            let n = (self.header.len() - self.replayed).min(buf.len());
            buf[..n].copy_from_slice(&self.header[self.replayed..self.replayed + n]);
            self.replayed += n;
            self.hasher.update(&buf[..n]);
            self.len += n as u64;
            return Ok(n);
        }
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.hasher.update(&buf[..n]);
            self.len += n as u64;
        }
        Ok(n)
    }
}

/// Write-side digest stream: digests everything written through it.
pub struct DigestWriter<W> {
    inner: W,
    hasher: Md5,
    len: u64,
}

impl<W: Write> DigestWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Md5::new(),
            len: 0,
        }
    }

    pub fn md5_hex(&self) -> String {
        hex::encode(self.hasher.clone().finalize())
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.len += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Write sink that keeps only the first `limit` bytes and discards the rest.
/// Used to pull a sniff header out of a store that can only stream a whole
/// object.
pub struct HeaderSink {
    buf: Vec<u8>,
    limit: usize,
}

impl HeaderSink {
    pub fn new(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            limit,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl Write for HeaderSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.buf.len() < self.limit {
            let take = (self.limit - self.buf.len()).min(buf.len());
            self.buf.extend_from_slice(&buf[..take]);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
