//! Sample channel ends over the datagram transport.
//!
//! The sender publishes the schema frame once, from its constructor; every
//! later frame is a sample. The receiver learns the schema from the sentinel
//! frame and rejects samples that arrive before it.

use crate::error::{Poison, WireError};
use crate::frame;
use crate::socket;
use std::net::{SocketAddr, UdpSocket};
use wirelog::{with_decoded_args, ChannelError, Encodable, SampleFormatter, Sink, Tag};

/// Sender end of a wire sample channel.
pub struct SampleWireSender {
    socket: UdpSocket,
    frame: Vec<u8>,
    schema: Box<[Tag]>,
}

impl SampleWireSender {
    /// Connect to a receiver endpoint and publish the schema frame.
    ///
    /// # Panics
    ///
    /// Panics if the schema is empty.
    pub fn connect(peer: SocketAddr, schema: Vec<Tag>) -> Result<Self, WireError> {
        assert!(!schema.is_empty(), "sample schema cannot be empty");
        let mut sender = Self {
            socket: socket::connect_sender(peer)?,
            frame: Vec::new(),
            schema: schema.into_boxed_slice(),
        };
        frame::encode_schema(&mut sender.frame, &sender.schema);
        sender.send_frame()?;
        Ok(sender)
    }

    /// The tag sequence every sample must match.
    pub fn schema(&self) -> &[Tag] {
        &self.schema
    }

    /// Validate against the schema and send one sample frame.
    pub fn log_sample(&mut self, args: &[&dyn Encodable]) -> Result<(), WireError> {
        if args.len() != self.schema.len() {
            return Err(WireError::Channel(ChannelError::SchemaMismatch {
                index: args.len().min(self.schema.len()),
            }));
        }
        for (index, (arg, expected)) in args.iter().zip(self.schema.iter()).enumerate() {
            if arg.tag() != *expected {
                return Err(WireError::Channel(ChannelError::SchemaMismatch { index }));
            }
        }
        frame::encode_sample(&mut self.frame, args);
        self.send_frame()
    }

    fn send_frame(&mut self) -> Result<(), WireError> {
        self.socket.send(&self.frame)?;
        Ok(())
    }
}

/// Receiver end of a wire sample channel.
pub struct SampleWireReceiver<F, S> {
    socket: UdpSocket,
    formatter: F,
    sink: S,
    frame: Vec<u8>,
    schema: Option<Box<[Tag]>>,
    poisoned: Option<Poison>,
}

impl<F: SampleFormatter, S: Sink> SampleWireReceiver<F, S> {
    /// Bind the inbound socket.
    pub fn bind(local: SocketAddr, formatter: F, sink: S) -> Result<Self, WireError> {
        Ok(Self {
            socket: socket::bind_receiver(local)?,
            formatter,
            sink,
            frame: Vec::new(),
            schema: None,
            poisoned: None,
        })
    }

    /// The local address the receiver is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, WireError> {
        Ok(self.socket.local_addr()?)
    }

    /// The schema, once the sentinel frame has arrived.
    pub fn schema(&self) -> Option<&[Tag]> {
        self.schema.as_deref()
    }

    /// Parse and dispatch one pending datagram. `Ok(false)` when none is
    /// waiting.
    pub fn try_process_one(&mut self) -> Result<bool, WireError> {
        if let Some(poison) = self.poisoned {
            return Err(poison.to_error());
        }
        if socket::recv_frame(&self.socket, &mut self.frame)?.is_none() {
            return Ok(false);
        }
        match self.dispatch() {
            Ok(()) => Ok(true),
            Err(err) => {
                self.poisoned = Poison::of(&err);
                Err(err)
            }
        }
    }

    fn dispatch(&mut self) -> Result<(), WireError> {
        if frame::is_schema_frame(&self.frame) {
            let schema = frame::decode_schema(&self.frame)?;
            self.formatter
                .format_expected_types(&mut self.sink, &schema)?;
            self.schema = Some(schema.into_boxed_slice());
            return Ok(());
        }

        let Self {
            formatter,
            sink,
            frame,
            schema,
            ..
        } = self;
        let Some(schema) = schema.as_deref() else {
            return Err(WireError::SchemaMissing);
        };
        frame::sample_matches_schema(frame, schema)?;
        with_decoded_args(frame, schema.len(), |args| formatter.format_values(sink, args))
            .map_err(WireError::Decode)?
            .map_err(WireError::Channel)?;
        Ok(())
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
