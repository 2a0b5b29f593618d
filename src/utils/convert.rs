/// Converts a `u64` to an 8-byte array in big-endian byte order.
///
/// # Examples
/// ```
/// use hapdb::convert::safe_kv;
///
/// let bytes = safe_kv(0x1234_5678_9ABC_DEF0);
/// assert_eq!(bytes, [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0]);
/// ```
pub const fn safe_kv(num: u64) -> [u8; 8] {
    num.to_be_bytes()
}

/// Inverse of [`safe_kv`]; `None` unless exactly 8 bytes are given.
pub fn safe_vk<K: AsRef<[u8]>>(bytes: K) -> Option<u64> {
    let array: [u8; 8] = bytes.as_ref().try_into().ok()?;
    Some(u64::from_be_bytes(array))
}

/// Durable storage key of a characteristic: 4 hex digits of type, 8 of
/// accessory id, 3 of instance id.
///
/// Only the low 12 bits of `iid` fit; callers reject larger ids before a key
/// is ever built.
pub fn durable_key(
    type_id: u16,
    aid: u32,
    iid: u32,
) -> String {
    format!("{:04X}{:08X}{:03X}", type_id, aid, iid & 0xFFF)
}
