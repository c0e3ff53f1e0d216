//! Helpers for the little-endian integer encoding used on the wire.
//!
//! OPC UA encodes every multi-byte integer least significant byte first.
//! Keeping the conversions in one place makes the wire endianness explicit
//! at every call site that touches a chunk header.

/// Serialise a `u32` in wire byte order (little-endian).
///
/// # Examples
///
/// ```
/// use uaframe::byte_order::write_wire_u32;
///
/// assert_eq!(write_wire_u32(0x1234_5678), [0x78, 0x56, 0x34, 0x12]);
/// ```
#[must_use]
pub const fn write_wire_u32(value: u32) -> [u8; 4] { value.to_le_bytes() }

/// Parse a wire-order `u32` from its on-wire representation.
///
/// # Examples
///
/// ```
/// use uaframe::byte_order::read_wire_u32;
///
/// assert_eq!(read_wire_u32([0x78, 0x56, 0x34, 0x12]), 0x1234_5678);
/// ```
#[must_use]
pub const fn read_wire_u32(bytes: [u8; 4]) -> u32 { u32::from_le_bytes(bytes) }

/// Serialise an `i32` in wire byte order (little-endian).
#[must_use]
pub const fn write_wire_i32(value: i32) -> [u8; 4] { value.to_le_bytes() }

/// Parse a wire-order `i32` from its on-wire representation.
#[must_use]
pub const fn read_wire_i32(bytes: [u8; 4]) -> i32 { i32::from_le_bytes(bytes) }

/// Read a wire-order `u32` starting at `offset`, if enough bytes remain.
///
/// # Examples
///
/// ```
/// use uaframe::byte_order::read_wire_u32_at;
///
/// let bytes = [0xff, 0x01, 0x00, 0x00, 0x00];
/// assert_eq!(read_wire_u32_at(&bytes, 1), Some(1));
/// assert_eq!(read_wire_u32_at(&bytes, 2), None);
/// ```
#[must_use]
pub fn read_wire_u32_at(bytes: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    let slice = bytes.get(offset..end)?;
    <[u8; 4]>::try_from(slice).ok().map(read_wire_u32)
}
