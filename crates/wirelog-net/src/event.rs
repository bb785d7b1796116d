//! Event channel ends over the datagram transport.
//!
//! The sender publishes each call site's attributes frame ahead of that
//! site's first occurrence frame, then occurrence frames only. The receiver
//! keeps its own id → attributes map; it shares no memory with the sender.

use crate::error::{Poison, WireError};
use crate::frame::{self, FrameKind};
use crate::socket;
use std::net::{SocketAddr, UdpSocket};
use wirelog::{
    with_decoded_args, AttributeRegistry, CallSite, Encodable, EventAttributes, EventFormatter,
    EventMeta, Sink,
};

/// Sender end of a wire event channel.
///
/// Unreliable by design: frames ride single datagrams and no delivery state
/// is kept beyond the not-yet-sent attribute publications.
pub struct EventWireSender {
    socket: UdpSocket,
    frame: Vec<u8>,
    pending: Vec<&'static EventAttributes>,
}

impl EventWireSender {
    /// Connect the outbound socket to a receiver endpoint.
    pub fn connect(peer: SocketAddr) -> Result<Self, WireError> {
        Ok(Self {
            socket: socket::connect_sender(peer)?,
            frame: Vec::new(),
            pending: Vec::new(),
        })
    }

    /// Resolve a call site; its attributes frame is queued for publication
    /// ahead of the next occurrence. Idempotent per site.
    pub fn register_event(
        &mut self,
        site: &'static CallSite,
        meta: EventMeta,
    ) -> &'static EventAttributes {
        let attrs = site.attributes(&meta);
        if site.claim_publication() {
            self.pending.push(attrs);
        }
        attrs
    }

    /// Send one occurrence frame, preceded by any pending attributes frames.
    pub fn log_event(
        &mut self,
        attrs: &'static EventAttributes,
        args: &[&dyn Encodable],
    ) -> Result<(), WireError> {
        debug_assert_eq!(args.len(), attrs.expected_argc as usize);
        self.flush_pending()?;
        frame::encode_occurrence(&mut self.frame, attrs.id, args);
        self.send_frame()
    }

    fn flush_pending(&mut self) -> Result<(), WireError> {
        while let Some(attrs) = self.pending.last().copied() {
            frame::encode_attributes(&mut self.frame, attrs);
            self.send_frame()?;
            self.pending.pop();
        }
        Ok(())
    }

    fn send_frame(&mut self) -> Result<(), WireError> {
        self.socket.send(&self.frame)?;
        Ok(())
    }
}

/// Receiver end of a wire event channel.
///
/// Parses one datagram per [`try_process_one`](Self::try_process_one) call
/// and resolves array payloads in place against the per-channel receive
/// buffer. Stream-fatal conditions poison the channel: every later call
/// returns the same error.
pub struct EventWireReceiver<F, S> {
    socket: UdpSocket,
    formatter: F,
    sink: S,
    registry: AttributeRegistry,
    frame: Vec<u8>,
    poisoned: Option<Poison>,
}

impl<F: EventFormatter, S: Sink> EventWireReceiver<F, S> {
    /// Bind the inbound socket.
    pub fn bind(local: SocketAddr, formatter: F, sink: S) -> Result<Self, WireError> {
        Ok(Self {
            socket: socket::bind_receiver(local)?,
            formatter,
            sink,
            registry: AttributeRegistry::new(),
            frame: Vec::new(),
            poisoned: None,
        })
    }

    /// The local address the receiver is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, WireError> {
        Ok(self.socket.local_addr()?)
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
        match frame::read_mark(&self.frame)? {
            FrameKind::Attributes => {
                let attrs = frame::decode_attributes(&self.frame)?;
                let attrs = self.registry.insert(attrs);
                self.formatter.format_attributes(&mut self.sink, attrs)?;
                Ok(())
            }
            FrameKind::Occurrence => {
                let header = frame::decode_occurrence_header(&self.frame)?;
                let Self {
                    registry,
                    formatter,
                    sink,
                    frame,
                    ..
                } = self;
                let attrs = registry
                    .get(header.id)
                    .ok_or(WireError::UnknownAttribute(header.id))?;
                let body = &frame[frame::OCCU_FIXED..];
                with_decoded_args(body, header.argc as usize, |args| {
                    formatter.format_event(sink, attrs, args)
                })
                .map_err(WireError::Decode)?
                .map_err(WireError::Channel)?;
                Ok(())
            }
        }
    }

    /// Attributes learned so far.
    pub fn known_attributes(&self) -> usize {
        self.registry.len()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
