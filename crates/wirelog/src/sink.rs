//! Byte-sink contract at the channel output boundary.

use crate::error::ChannelError;
use std::io;

/// Byte writer driven by a channel consumer.
///
/// Implementations are not required to be thread-safe; the consumer
/// serialises calls. `write` reports how many bytes were accepted; fewer
/// than offered means the sink is saturated.
pub trait Sink {
    /// Accept up to `data.len()` bytes, returning how many were taken.
    fn write(&mut self, data: &[u8]) -> u32;

    /// Push buffered bytes down. False when the sink can no longer accept.
    fn flush(&mut self) -> bool;
}

/// Write the whole buffer or fail with [`ChannelError::SinkWriteShort`].
pub fn write_all(sink: &mut dyn Sink, data: &[u8]) -> Result<(), ChannelError> {
    let written = sink.write(data);
    if written as usize == data.len() {
        Ok(())
    } else {
        Err(ChannelError::SinkWriteShort {
            offered: data.len() as u32,
            written,
        })
    }
}

/// Fixed-capacity in-memory sink.
///
/// Accepts bytes until the buffer is full, then reports short writes.
pub struct FlatBufferSink {
    buf: Box<[u8]>,
    cursor: usize,
}

impl FlatBufferSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            cursor: 0,
        }
    }

    /// Bytes written so far.
    pub fn written(&self) -> &[u8] {
        &self.buf[..self.cursor]
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.cursor
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

impl Sink for FlatBufferSink {
    fn write(&mut self, data: &[u8]) -> u32 {
        let take = data.len().min(self.remaining());
        self.buf[self.cursor..self.cursor + take].copy_from_slice(&data[..take]);
        self.cursor += take;
        take as u32
    }

    fn flush(&mut self) -> bool {
        true
    }
}

/// Adapter over any [`io::Write`]: standard streams, files, `Vec<u8>`.
pub struct StreamSink<W> {
    inner: W,
}

impl<W: io::Write> StreamSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: io::Write> Sink for StreamSink<W> {
    fn write(&mut self, data: &[u8]) -> u32 {
        match self.inner.write(data) {
            Ok(n) => n as u32,
            Err(_) => 0,
        }
    }

    fn flush(&mut self) -> bool {
        self.inner.flush().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_buffer_reports_short_writes() {
        let mut sink = FlatBufferSink::new(8);
        assert_eq!(sink.write(b"12345"), 5);
        assert_eq!(sink.write(b"6789"), 3);
        assert_eq!(sink.written(), b"12345678");
        assert_eq!(sink.remaining(), 0);

        sink.reset();
        assert!(write_all(&mut sink, b"1234").is_ok());
        assert_eq!(
            write_all(&mut sink, b"567890"),
            Err(ChannelError::SinkWriteShort {
                offered: 6,
                written: 4
            })
        );
    }

    #[test]
    fn test_stream_sink_over_vec() {
        let mut sink = StreamSink::new(Vec::new());
        assert!(write_all(&mut sink, b"hello").is_ok());
        assert!(sink.flush());
        assert_eq!(sink.get_ref().as_slice(), b"hello");
    }
}
