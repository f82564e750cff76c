//! Ordered binary row key shared by the timeline and feed tables.
//!
//! A row key is the pair (entity id, sequence id) encoded as 16 bytes,
//! both fields big-endian with the entity id first. Encoded keys therefore
//! sort first by entity and then by sequence, which keeps every entity's
//! rows contiguous and makes the paginated queries a single bounded range
//! scan. Byte order matches numeric order across the non-negative id space
//! the system assigns from.

use thiserror::Error;

/// Exact encoded size of a row key
pub const ROW_KEY_LEN: usize = 16;

/// Error decoding a row key from raw table bytes
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowKeyError {
    #[error("row key must be {ROW_KEY_LEN} bytes, got {0}")]
    Length(usize),
}

/// Row key for one stored post: which entity it belongs to and where it
/// sits in that entity's sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowKey {
    /// Timeline, dashboard or other series the row belongs to
    pub entity_id: i64,
    /// Position within the entity's series (a post id)
    pub sequence_id: i64,
}

impl RowKey {
    #[must_use]
    pub fn new(entity_id: i64, sequence_id: i64) -> Self {
        Self {
            entity_id,
            sequence_id,
        }
    }

    /// Encode to the on-disk representation.
    #[must_use]
    pub fn encode(&self) -> [u8; ROW_KEY_LEN] {
        let mut raw = [0u8; ROW_KEY_LEN];
        raw[..8].copy_from_slice(&self.entity_id.to_be_bytes());
        raw[8..].copy_from_slice(&self.sequence_id.to_be_bytes());
        raw
    }

    /// Decode from the on-disk representation. Lossless inverse of
    /// [`RowKey::encode`] for any validly encoded input.
    pub fn decode(raw: &[u8]) -> Result<Self, RowKeyError> {
        let raw: &[u8; ROW_KEY_LEN] =
            raw.try_into().map_err(|_| RowKeyError::Length(raw.len()))?;
        let mut field = [0u8; 8];
        field.copy_from_slice(&raw[..8]);
        let entity_id = i64::from_be_bytes(field);
        field.copy_from_slice(&raw[8..]);
        let sequence_id = i64::from_be_bytes(field);
        Ok(Self {
            entity_id,
            sequence_id,
        })
    }
}
