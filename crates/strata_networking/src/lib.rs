//! # STRATA Networking - Simulation Boundary
//!
//! Everything between the network threads and the single simulation thread.
//!
//! ## Architecture
//!
//! - **Commands**: plain-data requests ([`SimCommand`]) pushed by network
//!   threads through a bounded [`CommandQueue`]
//! - **Session**: the only owner of the [`Registry`](strata_core::Registry)
//!   and [`WorldManager`](strata_procedural::WorldManager); applies commands
//!   and streams chunks once per tick
//! - **Protocol**: framed binary [`Packet`]s describing chunk and tile state
//!
//! ```text
//! NETWORK THREAD                    SIMULATION THREAD
//!   |                                 |
//!   |--- CommandSender::push -------->| CommandQueue
//!   |                                 | Session::tick
//!   |<-- TickReport::outbound --------| (encoded Packets)
//!   |                                 |
//! ```
//!
//! World state is never mutated from a network thread.
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_networking::{ClientId, Session, SessionConfig, SimCommand};
//!
//! let mut session = Session::new(SessionConfig::default())?;
//! let sender = session.command_sender();
//! sender.push(SimCommand::Join { client: ClientId(1) })?;
//!
//! let report = session.tick()?;
//! let bytes = strata_networking::protocol::encode_stream(&report.outbound);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod command;
pub mod error;
pub mod protocol;
pub mod queue;
pub mod session;

pub use command::{ClientId, SimCommand};
pub use error::{ProtocolError, ProtocolResult, SessionError, SessionResult};
pub use protocol::{ChunkSnapshot, Packet, PacketKind, RejectReason, TileState};
pub use queue::{CommandQueue, CommandSender, QueueError, DEFAULT_QUEUE_CAPACITY};
pub use session::{
    Harvested, Session, SessionConfig, SessionStats, TickReport, DEFAULT_MAX_COMMANDS_PER_TICK,
};
