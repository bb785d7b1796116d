//! wirelog-net - datagram transport for the wirelog diagnostics fabric.
//!
//! Moves event and sample telemetry between processes over UDP, one frame
//! per datagram, using the same 16-byte argument wire form as the
//! in-process channels. The sender keeps no reliability state: telemetry
//! loss is tolerated by design. The receiver embeds its own id → attributes
//! map and a per-channel receive buffer, so no memory is shared with the
//! sender.
//!
//! # Example
//!
//! ```no_run
//! use wirelog::{log_event, FlatBufferSink, PlainTextEventFormatter};
//! use wirelog_net::{EventWireReceiver, EventWireSender};
//!
//! let mut receiver = EventWireReceiver::bind(
//!     "127.0.0.1:9021".parse().unwrap(),
//!     PlainTextEventFormatter::new(),
//!     FlatBufferSink::new(4096),
//! )
//! .unwrap();
//!
//! let mut sender = EventWireSender::connect("127.0.0.1:9021".parse().unwrap()).unwrap();
//! log_event!(sender, "link up after {} retries", 2u32).unwrap();
//!
//! while receiver.try_process_one().unwrap() {}
//! ```

mod error;
mod event;
pub mod frame;
mod sample;
mod socket;

pub use error::WireError;
pub use event::{EventWireReceiver, EventWireSender};
pub use sample::{SampleWireReceiver, SampleWireSender};
pub use socket::MAX_DATAGRAM;
