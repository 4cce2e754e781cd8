//! Growable byte buffer backing every protocol message.
//!
//! Layout:
//! ```text
//! [version:4][type:4][length:4][payload:N]
//! ```
//! The 12-byte header region sits at the front and is never counted in the
//! payload length. All integers are big-endian (network byte order).
//!
//! # Cursors
//!
//! Writes append past the header at the write cursor. Reads consume the
//! payload sequentially from the read cursor and never grow the buffer.
//! Slots are handed out as borrowed slices, so the borrow checker already
//! prevents holding a slot across a write that could reallocate.

use tracing::{debug, error};

use crate::protocol::error::WireError;

/// Size of the fixed header: version + type + length, 4 bytes each.
pub const HEADER_SIZE: usize = 12;

/// Capacity of a freshly constructed buffer (16 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 1 << 14;

/// Absolute buffer ceiling (16 KiB × 4096 ≈ 67 MB).
pub const BUFFER_SIZE_LIMIT: usize = DEFAULT_BUFFER_SIZE << 12;

/// Largest payload a data-typed message may declare.
pub const MAX_PAYLOAD_SIZE: usize = BUFFER_SIZE_LIMIT - HEADER_SIZE;

/// Capacity multiplier applied when a write does not fit.
const GROWTH_FACTOR: usize = 8;

/// Size of one encoded `int32`.
const I32_SIZE: usize = 4;

/// Owned, growable message storage with a header region and payload cursors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireBuffer {
    /// Backing storage. Its length is the logical capacity.
    bytes: Vec<u8>,
    /// Payload bytes written (or received) past the header.
    written: usize,
    /// Payload bytes consumed by sequential reads.
    read: usize,
    /// Set once an allocation was refused; all later writes fail.
    poisoned: bool,
}

impl Default for WireBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl WireBuffer {
    /// Creates an empty buffer with [`DEFAULT_BUFFER_SIZE`] capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    /// Creates an empty buffer with room for at least `size` bytes including
    /// the header.
    pub fn with_capacity(size: usize) -> Self {
        Self {
            bytes: vec![0; size.clamp(HEADER_SIZE, BUFFER_SIZE_LIMIT)],
            written: 0,
            read: 0,
            poisoned: false,
        }
    }

    /// Wraps a received frame. Everything past the header counts as written
    /// payload, available to sequential reads.
    ///
    /// The caller has already checked `HEADER_SIZE <= raw.len() <= BUFFER_SIZE_LIMIT`.
    pub(crate) fn from_received(raw: &[u8]) -> Self {
        Self {
            bytes: raw.to_vec(),
            written: raw.len().saturating_sub(HEADER_SIZE),
            read: 0,
            poisoned: false,
        }
    }

    /// Total capacity in bytes, header included.
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Payload bytes written past the header.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Payload bytes not yet consumed by reads.
    pub fn remaining(&self) -> usize {
        self.written - self.read
    }

    /// Returns `true` once an allocation has been refused.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// The written payload, header excluded.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_SIZE..HEADER_SIZE + self.written]
    }

    /// Header plus the first `payload_len` payload bytes: one wire frame.
    pub(crate) fn frame(&self, payload_len: usize) -> &[u8] {
        let end = (HEADER_SIZE + payload_len).min(self.bytes.len());
        &self.bytes[..end]
    }

    // ── Header ────────────────────────────────────────────────────────────────

    /// Writes the three header integers into the header region.
    pub fn write_header(&mut self, version: i32, code: i32, int_field: i32) {
        self.bytes[0..4].copy_from_slice(&version.to_be_bytes());
        self.bytes[4..8].copy_from_slice(&code.to_be_bytes());
        self.bytes[8..12].copy_from_slice(&int_field.to_be_bytes());
    }

    /// Reads `(version, type, length)` from the header region.
    pub fn read_header(&self) -> (i32, i32, i32) {
        (
            be_i32(&self.bytes[0..4]),
            be_i32(&self.bytes[4..8]),
            be_i32(&self.bytes[8..12]),
        )
    }

    // ── Allocation ────────────────────────────────────────────────────────────

    /// Replaces the backing storage with a block of `size` bytes, keeping the
    /// header and every payload byte written so far.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::AllocationFailure`] when `size` exceeds
    /// [`BUFFER_SIZE_LIMIT`]. The buffer is then poisoned: its contents stay
    /// intact but every further write fails with [`WireError::Poisoned`].
    pub fn allocate(&mut self, size: usize) -> Result<(), WireError> {
        if self.poisoned {
            return Err(WireError::Poisoned);
        }
        if size > BUFFER_SIZE_LIMIT {
            error!(
                requested = size,
                limit = BUFFER_SIZE_LIMIT,
                "wire buffer allocation exceeds ceiling"
            );
            self.poisoned = true;
            return Err(WireError::AllocationFailure {
                requested: size,
                limit: BUFFER_SIZE_LIMIT,
            });
        }
        // Never drop bytes already written.
        let size = size.max(HEADER_SIZE + self.written);
        debug!(from = self.bytes.len(), to = size, "reallocating wire buffer");
        let mut fresh = Vec::with_capacity(size);
        fresh.extend_from_slice(&self.bytes[..HEADER_SIZE + self.written]);
        fresh.resize(size, 0);
        self.bytes = fresh;
        Ok(())
    }

    /// Reserves `size` bytes past the write cursor and returns them.
    ///
    /// Grows the buffer first when needed: the capacity is multiplied by 8,
    /// clamped to the ceiling, and raised further if the request alone needs
    /// more.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::AllocationFailure`] if the request cannot fit
    /// under the ceiling, or [`WireError::Poisoned`] after an earlier failure.
    pub fn write_slot(&mut self, size: usize) -> Result<&mut [u8], WireError> {
        if self.poisoned {
            return Err(WireError::Poisoned);
        }
        let needed = (HEADER_SIZE + self.written).saturating_add(size);
        if needed > self.bytes.len() {
            let grown = self
                .bytes
                .len()
                .saturating_mul(GROWTH_FACTOR)
                .min(BUFFER_SIZE_LIMIT);
            self.allocate(grown.max(needed))?;
        }
        let start = HEADER_SIZE + self.written;
        self.written += size;
        Ok(&mut self.bytes[start..start + size])
    }

    /// Consumes the next `size` payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::InsufficientData`] if fewer than `size` bytes remain.
    pub fn read_slot(&mut self, size: usize) -> Result<&[u8], WireError> {
        let available = self.remaining();
        if size > available {
            return Err(WireError::InsufficientData {
                needed: size,
                available,
            });
        }
        let start = HEADER_SIZE + self.read;
        self.read += size;
        Ok(&self.bytes[start..start + size])
    }

    /// Rewinds the read cursor to the start of the payload.
    pub fn reset_read(&mut self) {
        self.read = 0;
    }

    /// Forgets payload bytes past `len`. Capacity is unchanged.
    pub(crate) fn truncate_payload(&mut self, len: usize) {
        self.written = self.written.min(len);
        self.read = self.read.min(self.written);
    }

    // ── Typed writers ─────────────────────────────────────────────────────────

    pub fn write_i8(&mut self, value: i8) -> Result<(), WireError> {
        self.write_slot(1)?.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<(), WireError> {
        self.write_slot(I32_SIZE)?
            .copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Writes raw bytes with no length prefix.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), WireError> {
        self.write_slot(data.len())?.copy_from_slice(data);
        Ok(())
    }

    /// Writes `length:int32` followed by the bytes.
    pub fn write_blob(&mut self, data: &[u8]) -> Result<(), WireError> {
        self.write_i32(wire_len(data.len())?)?;
        self.write_bytes(data)
    }

    /// Writes a string as `length:int32` + UTF-8 bytes, no terminator.
    pub fn write_string(&mut self, value: &str) -> Result<(), WireError> {
        self.write_blob(value.as_bytes())
    }

    /// Writes `count:int32` followed by `count` length-prefixed strings.
    pub fn write_string_list<S: AsRef<str>>(&mut self, values: &[S]) -> Result<(), WireError> {
        self.write_i32(wire_len(values.len())?)?;
        for value in values {
            self.write_string(value.as_ref())?;
        }
        Ok(())
    }

    /// Writes `count:int32` followed by `count` `int32` values.
    pub fn write_i32_list(&mut self, values: &[i32]) -> Result<(), WireError> {
        self.write_i32(wire_len(values.len())?)?;
        for &value in values {
            self.write_i32(value)?;
        }
        Ok(())
    }

    // ── Typed readers ─────────────────────────────────────────────────────────

    pub fn read_i8(&mut self) -> Result<i8, WireError> {
        let slot = self.read_slot(1)?;
        Ok(i8::from_be_bytes([slot[0]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, WireError> {
        Ok(be_i32(self.read_slot(I32_SIZE)?))
    }

    /// Reads a length field and rejects negative values.
    pub fn read_len(&mut self) -> Result<usize, WireError> {
        let len = self.read_i32()?;
        usize::try_from(len).map_err(|_| WireError::Malformed(format!("negative length {len}")))
    }

    /// Reads `len` raw bytes into an owned vector.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, WireError> {
        Ok(self.read_slot(len)?.to_vec())
    }

    /// Reads a length-prefixed blob.
    pub fn read_blob(&mut self) -> Result<Vec<u8>, WireError> {
        let len = self.read_len()?;
        self.read_bytes(len)
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, WireError> {
        let bytes = self.read_blob()?;
        String::from_utf8(bytes)
            .map_err(|e| WireError::Malformed(format!("invalid UTF-8 in string: {e}")))
    }

    pub fn read_string_list(&mut self) -> Result<Vec<String>, WireError> {
        let count = self.read_len()?;
        // Every string needs at least its 4-byte length.
        let mut out = Vec::with_capacity(count.min(self.remaining() / I32_SIZE));
        for _ in 0..count {
            out.push(self.read_string()?);
        }
        Ok(out)
    }

    pub fn read_i32_list(&mut self) -> Result<Vec<i32>, WireError> {
        let count = self.read_len()?;
        let mut out = Vec::with_capacity(count.min(self.remaining() / I32_SIZE));
        for _ in 0..count {
            out.push(self.read_i32()?);
        }
        Ok(out)
    }
}

/// Converts a length to its `int32` wire form.
pub(crate) fn wire_len(len: usize) -> Result<i32, WireError> {
    i32::try_from(len).map_err(|_| WireError::AllocationFailure {
        requested: len,
        limit: BUFFER_SIZE_LIMIT,
    })
}

fn be_i32(bytes: &[u8]) -> i32 {
    i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_has_default_capacity_and_no_payload() {
        let buf = WireBuffer::new();
        assert_eq!(buf.capacity(), DEFAULT_BUFFER_SIZE);
        assert_eq!(buf.written(), 0);
        assert!(buf.payload().is_empty());
    }

    #[test]
    fn test_limits_match_protocol_constants() {
        assert_eq!(HEADER_SIZE, 12);
        assert_eq!(DEFAULT_BUFFER_SIZE, 16 * 1024);
        assert_eq!(BUFFER_SIZE_LIMIT, 16 * 1024 * 4096);
        assert_eq!(MAX_PAYLOAD_SIZE, BUFFER_SIZE_LIMIT - 12);
    }

    #[test]
    fn test_header_round_trips_big_endian() {
        let mut buf = WireBuffer::new();
        buf.write_header(7, 205, 0x0102_0304);
        assert_eq!(buf.read_header(), (7, 205, 0x0102_0304));
        assert_eq!(&buf.frame(0)[8..12], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_write_slot_grows_by_factor_of_eight() {
        // Arrange
        let mut buf = WireBuffer::with_capacity(64);
        buf.write_bytes(&[1u8; 40]).unwrap();

        // Act: 40 + 20 past a 12-byte header no longer fits in 64
        buf.write_bytes(&[2u8; 20]).unwrap();

        // Assert
        assert_eq!(buf.capacity(), 64 * 8);
        assert_eq!(&buf.payload()[..40], &[1u8; 40][..]);
        assert_eq!(&buf.payload()[40..], &[2u8; 20][..]);
    }

    #[test]
    fn test_write_slot_grows_to_request_when_factor_is_too_small() {
        let mut buf = WireBuffer::with_capacity(16);
        buf.write_bytes(&[9u8; 1000]).unwrap();
        assert_eq!(buf.capacity(), HEADER_SIZE + 1000);
        assert_eq!(buf.written(), 1000);
    }

    #[test]
    fn test_growth_is_clamped_to_ceiling() {
        let mut buf = WireBuffer::with_capacity(BUFFER_SIZE_LIMIT / 2);
        buf.write_slot(BUFFER_SIZE_LIMIT / 2).unwrap();
        assert_eq!(buf.capacity(), BUFFER_SIZE_LIMIT);
    }

    #[test]
    fn test_allocate_above_ceiling_poisons_buffer() {
        // Arrange
        let mut buf = WireBuffer::new();
        buf.write_i32(5).unwrap();

        // Act
        let result = buf.allocate(BUFFER_SIZE_LIMIT + 1);

        // Assert
        assert_eq!(
            result,
            Err(WireError::AllocationFailure {
                requested: BUFFER_SIZE_LIMIT + 1,
                limit: BUFFER_SIZE_LIMIT
            })
        );
        assert!(buf.is_poisoned());
        assert_eq!(buf.write_i32(1), Err(WireError::Poisoned));
        // Previously written bytes stay readable.
        assert_eq!(buf.read_i32(), Ok(5));
    }

    #[test]
    fn test_write_slot_beyond_ceiling_fails() {
        let mut buf = WireBuffer::new();
        let result = buf.write_slot(MAX_PAYLOAD_SIZE + 1);
        assert!(matches!(result, Err(WireError::AllocationFailure { .. })));
    }

    #[test]
    fn test_allocate_preserves_written_bytes() {
        let mut buf = WireBuffer::new();
        buf.write_string("render").unwrap();
        buf.allocate(DEFAULT_BUFFER_SIZE * 2).unwrap();
        assert_eq!(buf.read_string().unwrap(), "render");
    }

    #[test]
    fn test_read_slot_does_not_grow_and_reports_shortfall() {
        let mut buf = WireBuffer::new();
        buf.write_i8(3).unwrap();
        assert_eq!(buf.read_i8(), Ok(3));
        assert_eq!(
            buf.read_i32(),
            Err(WireError::InsufficientData {
                needed: 4,
                available: 0
            })
        );
        assert_eq!(buf.capacity(), DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn test_reset_read_allows_rereading() {
        let mut buf = WireBuffer::new();
        buf.write_i32(-42).unwrap();
        assert_eq!(buf.read_i32(), Ok(-42));
        buf.reset_read();
        assert_eq!(buf.read_i32(), Ok(-42));
    }

    #[test]
    fn test_string_encoding_is_length_prefixed_without_terminator() {
        let mut buf = WireBuffer::new();
        buf.write_string("abc").unwrap();
        assert_eq!(buf.payload(), &[0, 0, 0, 3, b'a', b'b', b'c']);
    }

    #[test]
    fn test_string_list_and_i32_list_encoding() {
        let mut buf = WireBuffer::new();
        buf.write_string_list(&["a", "bc"]).unwrap();
        buf.write_i32_list(&[10, -1]).unwrap();

        assert_eq!(buf.read_string_list().unwrap(), vec!["a", "bc"]);
        assert_eq!(buf.read_i32_list().unwrap(), vec![10, -1]);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_negative_length_is_malformed() {
        let mut buf = WireBuffer::new();
        buf.write_i32(-5).unwrap();
        assert!(matches!(buf.read_blob(), Err(WireError::Malformed(_))));
    }

    #[test]
    fn test_huge_declared_count_fails_without_preallocating() {
        let mut buf = WireBuffer::new();
        buf.write_i32(i32::MAX).unwrap();
        assert!(matches!(
            buf.read_string_list(),
            Err(WireError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let mut buf = WireBuffer::new();
        buf.write_blob(&[0xFF, 0xFE]).unwrap();
        assert!(matches!(buf.read_string(), Err(WireError::Malformed(_))));
    }
}
