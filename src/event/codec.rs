//! Binary codec for `struct input_event`
//!
//! Wire layout (host byte order, 24 bytes, no interior padding):
//!
//! ```text
//! offset  size  field
//!      0     8  sec
//!      8     8  usec
//!     16     2  type
//!     18     2  code
//!     20     4  value
//! ```
//!
//! Every field is read and written with explicit shifts in the configured
//! byte order; the buffer is never reinterpreted as a native struct.

use super::codes::EventType;
use super::types::EventRecord;
use crate::platform::ByteOrder;
use crate::{Error, Result};

/// Size in bytes of one encoded record
pub const RECORD_SIZE: usize = 24;

const OFFSET_SEC: usize = 0;
const OFFSET_USEC: usize = 8;
const OFFSET_TYPE: usize = 16;
const OFFSET_CODE: usize = 18;
const OFFSET_VALUE: usize = 20;

// Fields are contiguous and the struct's 8-byte alignment adds no tail padding.
const _: () = assert!(OFFSET_VALUE + 4 == RECORD_SIZE);
const _: () = assert!(RECORD_SIZE % 8 == 0);

// Must agree with the kernel ABI where 64-bit timestamps are native.
#[cfg(all(target_os = "linux", target_pointer_width = "64"))]
const _: () = assert!(std::mem::size_of::<libc::input_event>() == RECORD_SIZE);

/// Encoder/decoder bound to one byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventCodec {
    order: ByteOrder,
}

impl EventCodec {
    pub fn new(order: ByteOrder) -> Self {
        Self { order }
    }

    /// Codec for the running host
    pub fn host() -> Self {
        Self::new(ByteOrder::host())
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Decode exactly one record.
    ///
    /// # Errors
    /// `TruncatedRecord` if `bytes` is shorter than [`RECORD_SIZE`], `Decode`
    /// if it is longer. Nothing is decoded in either case.
    pub fn decode(&self, bytes: &[u8]) -> Result<EventRecord> {
        if bytes.len() < RECORD_SIZE {
            return Err(Error::TruncatedRecord {
                expected: RECORD_SIZE,
                actual: bytes.len(),
            });
        }
        if bytes.len() > RECORD_SIZE {
            return Err(Error::Decode(format!(
                "record buffer holds {} bytes, expected exactly {}",
                bytes.len(),
                RECORD_SIZE
            )));
        }

        let sec = self.order.read_u64(field::<8>(bytes, OFFSET_SEC)?);
        let usec = self.order.read_u64(field::<8>(bytes, OFFSET_USEC)?);
        let event_type = self.order.read_u16(field::<2>(bytes, OFFSET_TYPE)?);
        let code = self.order.read_u16(field::<2>(bytes, OFFSET_CODE)?);
        let value = self.order.read_u32(field::<4>(bytes, OFFSET_VALUE)?) as i32;

        Ok(EventRecord {
            sec,
            usec,
            event_type: EventType(event_type),
            code,
            value,
        })
    }

    /// Decode a buffer holding a whole number of records
    pub fn decode_all(&self, bytes: &[u8]) -> Result<Vec<EventRecord>> {
        let chunks = bytes.chunks_exact(RECORD_SIZE);
        let remainder = chunks.remainder().len();
        if remainder != 0 {
            return Err(Error::TruncatedRecord {
                expected: RECORD_SIZE,
                actual: remainder,
            });
        }
        chunks.map(|chunk| self.decode(chunk)).collect()
    }

    /// Encode one record
    pub fn encode(&self, record: &EventRecord) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out[OFFSET_SEC..OFFSET_USEC].copy_from_slice(&self.order.write_u64(record.sec));
        out[OFFSET_USEC..OFFSET_TYPE].copy_from_slice(&self.order.write_u64(record.usec));
        out[OFFSET_TYPE..OFFSET_CODE].copy_from_slice(&self.order.write_u16(record.event_type.0));
        out[OFFSET_CODE..OFFSET_VALUE].copy_from_slice(&self.order.write_u16(record.code));
        out[OFFSET_VALUE..RECORD_SIZE].copy_from_slice(&self.order.write_u32(record.value as u32));
        out
    }

    /// Encode a sequence of records back to back
    pub fn encode_all<'a, I>(&self, records: I) -> Vec<u8>
    where
        I: IntoIterator<Item = &'a EventRecord>,
    {
        let mut out = Vec::new();
        for record in records {
            out.extend_from_slice(&self.encode(record));
        }
        out
    }
}

impl Default for EventCodec {
    fn default() -> Self {
        Self::host()
    }
}

fn field<const N: usize>(bytes: &[u8], offset: usize) -> Result<[u8; N]> {
    bytes
        .get(offset..offset + N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| Error::Decode(format!("field at offset {} out of bounds", offset)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<EventRecord> {
        vec![
            EventRecord::new(0, 0, EventType::SYN, 0, 0),
            EventRecord::new(1_700_000_000, 123_456, EventType::KEY, 30, 1),
            EventRecord::new(1_700_000_000, 999_999, EventType::KEY, 30, 0),
            EventRecord::new(42, 7, EventType::REL, 1, -3),
            EventRecord::new(u64::MAX, u64::MAX, EventType(u16::MAX), u16::MAX, i32::MIN),
            EventRecord::new(5, 6, EventType::ABS, 0x35, i32::MAX),
        ]
    }

    #[test]
    fn test_roundtrip_both_orders() {
        for order in [ByteOrder::Little, ByteOrder::Big] {
            let codec = EventCodec::new(order);
            for record in sample_records() {
                let bytes = codec.encode(&record);
                assert_eq!(codec.decode(&bytes).unwrap(), record, "order {}", order);
            }
        }
    }

    #[test]
    fn test_little_endian_layout() {
        let codec = EventCodec::new(ByteOrder::Little);
        let record = EventRecord::new(0x0102, 0x0304, EventType::KEY, 0x001e, -1);
        let bytes = codec.encode(&record);

        assert_eq!(&bytes[0..8], &[0x02, 0x01, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&bytes[8..16], &[0x04, 0x03, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&bytes[16..18], &[0x01, 0x00]);
        assert_eq!(&bytes[18..20], &[0x1e, 0x00]);
        assert_eq!(&bytes[20..24], &[0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_big_endian_layout() {
        let codec = EventCodec::new(ByteOrder::Big);
        let record = EventRecord::new(0x0102, 0x0304, EventType::REL, 0x0008, 2);
        let bytes = codec.encode(&record);

        assert_eq!(&bytes[0..8], &[0, 0, 0, 0, 0, 0, 0x01, 0x02]);
        assert_eq!(&bytes[8..16], &[0, 0, 0, 0, 0, 0, 0x03, 0x04]);
        assert_eq!(&bytes[16..18], &[0x00, 0x02]);
        assert_eq!(&bytes[18..20], &[0x00, 0x08]);
        assert_eq!(&bytes[20..24], &[0, 0, 0, 2]);
    }

    #[test]
    fn test_orders_disagree_on_same_bytes() {
        let record = EventRecord::new(1, 2, EventType::KEY, 3, 4);
        let bytes = EventCodec::new(ByteOrder::Little).encode(&record);
        let misread = EventCodec::new(ByteOrder::Big).decode(&bytes).unwrap();
        assert_ne!(misread, record);
        assert_eq!(misread.event_type, EventType(0x0100));
    }

    #[test]
    fn test_decode_short_buffer_is_truncated() {
        let codec = EventCodec::host();
        let bytes = codec.encode(&sample_records()[1]);
        for len in 0..RECORD_SIZE {
            match codec.decode(&bytes[..len]) {
                Err(Error::TruncatedRecord { expected, actual }) => {
                    assert_eq!(expected, RECORD_SIZE);
                    assert_eq!(actual, len);
                }
                other => panic!("expected truncation for {} bytes, got {:?}", len, other),
            }
        }
    }

    #[test]
    fn test_decode_long_buffer_is_rejected() {
        let codec = EventCodec::host();
        let bytes = [0u8; RECORD_SIZE + 1];
        assert!(matches!(codec.decode(&bytes), Err(Error::Decode(_))));
    }

    #[test]
    fn test_decode_all() {
        let codec = EventCodec::new(ByteOrder::Little);
        let records = sample_records();
        let bytes = codec.encode_all(&records);
        assert_eq!(bytes.len(), records.len() * RECORD_SIZE);
        assert_eq!(codec.decode_all(&bytes).unwrap(), records);

        let partial = &bytes[..bytes.len() - 5];
        assert!(matches!(
            codec.decode_all(partial),
            Err(Error::TruncatedRecord { actual: 19, .. })
        ));
    }

    #[test]
    fn test_host_codec_matches_native_bytes() {
        let codec = EventCodec::host();
        let record = EventRecord::new(10, 20, EventType::KEY, 28, 1);
        let bytes = codec.encode(&record);
        assert_eq!(&bytes[0..8], &10u64.to_ne_bytes());
        assert_eq!(&bytes[16..18], &1u16.to_ne_bytes());
        assert_eq!(&bytes[20..24], &1i32.to_ne_bytes());
    }
}
