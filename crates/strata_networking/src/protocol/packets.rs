//! # Packet Definitions
//!
//! Server -> client sync packets and their fixed-size wire records.
//!
//! ## Frame
//!
//! ```text
//! ┌────────────┬──────────────────────┬─────────────────────────┐
//! │ Kind (1)   │ Payload length (4 LE)│ Payload (length bytes)  │
//! └────────────┴──────────────────────┴─────────────────────────┘
//! ```
//!
//! | Kind | Packet            | Payload                                  |
//! |------|-------------------|------------------------------------------|
//! | 1    | `ChunkSnapshot`   | `ChunkHeaderRecord` + LZ4 tile planes    |
//! | 2    | `TileUpdate`      | `TileUpdateRecord` (12 bytes)            |
//! | 3    | `EntityDestroyed` | entity bits, u64 LE                      |
//! | 4    | `CommandRejected` | `RejectRecord` (8 bytes)                 |

use bytemuck::{Pod, Zeroable};
use strata_core::EntityId;
use strata_procedural::{
    Chunk, ChunkCoord, Tile, TileIndex, TileType, CHUNK_HEIGHT, CHUNK_WIDTH, TILES_PER_CHUNK,
};

use super::compression::{compress_chunk_payload, decompress_chunk_payload, RAW_CHUNK_PAYLOAD};
use super::serialization::{FrameReader, FrameWriter};
use super::{FRAME_HEADER_SIZE, MAX_PAYLOAD};
use crate::command::ClientId;
use crate::error::{ProtocolError, ProtocolResult};

/// Packet kind byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    /// Full tile contents of a newly active chunk.
    ChunkSnapshot = 1,
    /// One tile changed.
    TileUpdate = 2,
    /// An entity was destroyed.
    EntityDestroyed = 3,
    /// A client command was refused.
    CommandRejected = 4,
}

impl PacketKind {
    /// Parses a kind byte.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownKind`] for anything outside `1..=4`.
    pub const fn from_u8(value: u8) -> ProtocolResult<Self> {
        match value {
            1 => Ok(Self::ChunkSnapshot),
            2 => Ok(Self::TileUpdate),
            3 => Ok(Self::EntityDestroyed),
            4 => Ok(Self::CommandRejected),
            other => Err(ProtocolError::UnknownKind(other)),
        }
    }
}

/// Why a command was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RejectReason {
    /// The client has not joined.
    UnknownClient = 0,
    /// `Join` from a client that is already in the session.
    AlreadyJoined = 1,
    /// Footprint is unloaded, unbuildable or occupied.
    PlacementBlocked = 2,
    /// Building does not exist or belongs to someone else.
    NotYourBuilding = 3,
    /// No ore on the tile, or the tile is not loaded.
    NothingToHarvest = 4,
    /// The server could not apply the command.
    ServerError = 5,
    /// Target position is not finite, or too far out for its streaming box
    /// to fit inside the world.
    InvalidPosition = 6,
}

impl RejectReason {
    /// Parses a reason byte.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownRejectReason`] for anything outside `0..=6`.
    pub const fn from_u8(value: u8) -> ProtocolResult<Self> {
        match value {
            0 => Ok(Self::UnknownClient),
            1 => Ok(Self::AlreadyJoined),
            2 => Ok(Self::PlacementBlocked),
            3 => Ok(Self::NotYourBuilding),
            4 => Ok(Self::NothingToHarvest),
            5 => Ok(Self::ServerError),
            6 => Ok(Self::InvalidPosition),
            other => Err(ProtocolError::UnknownRejectReason(other)),
        }
    }
}

/// What a client needs to know about one tile.
///
/// Entity ids stay on the server; clients only see the flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TileState {
    /// Terrain type.
    pub kind: TileType,
    /// A building stands here.
    pub occupied: bool,
    /// A resource node sits here.
    pub has_ore: bool,
}

impl TileState {
    /// Flag bit: occupied.
    pub const FLAG_OCCUPIED: u8 = 1 << 0;
    /// Flag bit: ore present.
    pub const FLAG_ORE: u8 = 1 << 1;

    /// Client view of a server tile.
    #[must_use]
    pub const fn from_tile(tile: &Tile) -> Self {
        Self {
            kind: tile.kind,
            occupied: tile.is_occupied(),
            has_ore: tile.has_ore(),
        }
    }

    /// Packed flag byte.
    #[must_use]
    pub const fn flags(self) -> u8 {
        let mut flags = 0;
        if self.occupied {
            flags |= Self::FLAG_OCCUPIED;
        }
        if self.has_ore {
            flags |= Self::FLAG_ORE;
        }
        flags
    }

    /// Rebuilds a state from wire bytes. Unknown flag bits are ignored.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidTileKind`] for a kind byte past `Stone`.
    pub const fn from_wire(kind: u8, flags: u8) -> ProtocolResult<Self> {
        if kind > TileType::Stone as u8 {
            return Err(ProtocolError::InvalidTileKind(kind));
        }
        Ok(Self {
            kind: TileType::from_u8(kind),
            occupied: flags & Self::FLAG_OCCUPIED != 0,
            has_ore: flags & Self::FLAG_ORE != 0,
        })
    }
}

/// Every tile of one chunk, row-major (`y` outer, `x` inner).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkSnapshot {
    coord: ChunkCoord,
    tiles: Vec<TileState>,
}

impl ChunkSnapshot {
    /// Captures the current contents of `chunk`.
    #[must_use]
    pub fn from_chunk(chunk: &Chunk) -> Self {
        let mut tiles = Vec::with_capacity(TILES_PER_CHUNK);
        for y in 0..CHUNK_HEIGHT {
            for x in 0..CHUNK_WIDTH {
                tiles.push(chunk.tile(x, y).map(TileState::from_tile).unwrap_or_default());
            }
        }
        Self {
            coord: chunk.coord(),
            tiles,
        }
    }

    /// The snapshotted chunk.
    #[inline]
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// All tiles, row-major.
    #[inline]
    #[must_use]
    pub fn tiles(&self) -> &[TileState] {
        &self.tiles
    }

    /// Tile at local coordinates.
    #[must_use]
    pub fn tile(&self, local_x: usize, local_y: usize) -> Option<TileState> {
        if local_x >= CHUNK_WIDTH || local_y >= CHUNK_HEIGHT {
            return None;
        }
        self.tiles.get(local_y * CHUNK_WIDTH + local_x).copied()
    }

    fn encode_payload(&self, writer: &mut FrameWriter) {
        writer.write_pod(&ChunkHeaderRecord {
            x: self.coord.x,
            y: self.coord.y,
        });

        let mut raw = vec![0u8; RAW_CHUNK_PAYLOAD];
        let (kinds, flags) = raw.split_at_mut(TILES_PER_CHUNK);
        for (i, state) in self.tiles.iter().enumerate() {
            kinds[i] = state.kind as u8;
            flags[i] = state.flags();
        }
        writer.write_bytes(&compress_chunk_payload(&raw));
    }

    fn decode_payload(payload: &[u8]) -> ProtocolResult<Self> {
        let mut reader = FrameReader::new(payload);
        let header: ChunkHeaderRecord = reader.read_pod()?;
        let raw = decompress_chunk_payload(reader.read_bytes(reader.remaining())?)?;

        let (kinds, flags) = raw.split_at(TILES_PER_CHUNK);
        let tiles = kinds
            .iter()
            .zip(flags)
            .map(|(&kind, &flag)| TileState::from_wire(kind, flag))
            .collect::<ProtocolResult<Vec<_>>>()?;

        Ok(Self {
            coord: ChunkCoord::new(header.x, header.y),
            tiles,
        })
    }
}

/// Chunk coordinate leading a snapshot payload.
///
/// Size: 8 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct ChunkHeaderRecord {
    /// Chunk X.
    pub x: i32,
    /// Chunk Y.
    pub y: i32,
}

/// Wire form of a single tile change.
///
/// Size: 12 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct TileUpdateRecord {
    /// World tile X.
    pub x: i32,
    /// World tile Y.
    pub y: i32,
    /// `TileType` byte.
    pub kind: u8,
    /// `TileState` flags.
    pub flags: u8,
    /// Padding for alignment.
    pub _padding: [u8; 2],
}

impl TileUpdateRecord {
    /// Size in bytes.
    pub const SIZE: usize = 12;
}

/// Wire form of a rejection.
///
/// Size: 8 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct RejectRecord {
    /// Client the command came from.
    pub client: u32,
    /// `RejectReason` byte.
    pub reason: u8,
    /// Padding for alignment.
    pub _padding: [u8; 3],
}

impl RejectRecord {
    /// Size in bytes.
    pub const SIZE: usize = 8;
}

/// Payload size of `EntityDestroyed`.
const ENTITY_PAYLOAD_SIZE: usize = 8;

/// A server -> client packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Packet {
    /// A chunk became active.
    ChunkSnapshot(ChunkSnapshot),
    /// One tile changed.
    TileUpdate {
        /// World tile.
        tile: TileIndex,
        /// New state.
        state: TileState,
    },
    /// An entity was destroyed on the server.
    EntityDestroyed(EntityId),
    /// A command was refused.
    CommandRejected {
        /// Sender of the command.
        client: ClientId,
        /// Why.
        reason: RejectReason,
    },
}

impl Packet {
    /// Kind byte of this packet.
    #[must_use]
    pub const fn kind(&self) -> PacketKind {
        match self {
            Self::ChunkSnapshot(_) => PacketKind::ChunkSnapshot,
            Self::TileUpdate { .. } => PacketKind::TileUpdate,
            Self::EntityDestroyed(_) => PacketKind::EntityDestroyed,
            Self::CommandRejected { .. } => PacketKind::CommandRejected,
        }
    }

    /// Encodes one frame into a new buffer.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = FrameWriter::with_capacity(FRAME_HEADER_SIZE + 64);
        self.encode_into(&mut writer);
        writer.into_inner()
    }

    /// Appends one frame to `writer`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn encode_into(&self, writer: &mut FrameWriter) {
        writer.write_u8(self.kind() as u8);
        let length_at = writer.len();
        writer.write_u32(0);
        let payload_start = writer.len();

        match self {
            Self::ChunkSnapshot(snapshot) => snapshot.encode_payload(writer),
            Self::TileUpdate { tile, state } => writer.write_pod(&TileUpdateRecord {
                x: tile.x,
                y: tile.y,
                kind: state.kind as u8,
                flags: state.flags(),
                _padding: [0; 2],
            }),
            Self::EntityDestroyed(entity) => writer.write_u64(entity.to_bits()),
            Self::CommandRejected { client, reason } => writer.write_pod(&RejectRecord {
                client: client.0,
                reason: *reason as u8,
                _padding: [0; 3],
            }),
        }

        // Payloads are bounded well below u32::MAX: the largest is a
        // compressed 2 KiB snapshot.
        let payload_len = (writer.len() - payload_start) as u32;
        writer.patch_u32(length_at, payload_len);
    }

    /// Decodes the frame at the start of `bytes`.
    ///
    /// Returns the packet and the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Any [`ProtocolError`]; the input is untrusted.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<(Self, usize)> {
        let mut reader = FrameReader::new(bytes);
        let kind = PacketKind::from_u8(reader.read_u8()?)?;
        let length = reader.read_u32()? as usize;
        if length > MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge(length));
        }

        let expected = match kind {
            PacketKind::ChunkSnapshot => None,
            PacketKind::TileUpdate => Some(TileUpdateRecord::SIZE),
            PacketKind::EntityDestroyed => Some(ENTITY_PAYLOAD_SIZE),
            PacketKind::CommandRejected => Some(RejectRecord::SIZE),
        };
        if let Some(expected) = expected.filter(|&expected| expected != length) {
            return Err(ProtocolError::PayloadLength {
                kind: kind as u8,
                expected,
                actual: length,
            });
        }

        let mut payload = FrameReader::new(reader.read_bytes(length)?);
        let packet = match kind {
            PacketKind::ChunkSnapshot => {
                Self::ChunkSnapshot(ChunkSnapshot::decode_payload(payload.read_bytes(length)?)?)
            }
            PacketKind::TileUpdate => {
                let record: TileUpdateRecord = payload.read_pod()?;
                Self::TileUpdate {
                    tile: TileIndex::new(record.x, record.y),
                    state: TileState::from_wire(record.kind, record.flags)?,
                }
            }
            PacketKind::EntityDestroyed => Self::EntityDestroyed(EntityId::from_bits(payload.read_u64()?)),
            PacketKind::CommandRejected => {
                let record: RejectRecord = payload.read_pod()?;
                Self::CommandRejected {
                    client: ClientId(record.client),
                    reason: RejectReason::from_u8(record.reason)?,
                }
            }
        };

        Ok((packet, reader.position()))
    }
}

/// Encodes packets back to back.
#[must_use]
pub fn encode_stream(packets: &[Packet]) -> Vec<u8> {
    let mut writer = FrameWriter::with_capacity(packets.len() * (FRAME_HEADER_SIZE + 16));
    for packet in packets {
        packet.encode_into(&mut writer);
    }
    writer.into_inner()
}

/// Decodes back-to-back frames until `bytes` is exhausted.
///
/// # Errors
///
/// The first [`ProtocolError`]; a partial trailing frame is `Truncated`.
pub fn decode_stream(mut bytes: &[u8]) -> ProtocolResult<Vec<Packet>> {
    let mut packets = Vec::new();
    while !bytes.is_empty() {
        let (packet, consumed) = Packet::decode(bytes)?;
        packets.push(packet);
        bytes = &bytes[consumed..];
    }
    Ok(packets)
}
