//! TLV record encoding for the pega container.
//!
//! Every field of the container header is a (type, length, value) record:
//! type and length as big-endian 16-bit integers, followed by exactly
//! `length` value bytes. The raw firmware payload is not a record — it is
//! appended verbatim after the record sequence.

use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Result, SignError};

/// Size of the type + length header in bytes.
pub const HEADER_LEN: usize = 4;

/// Maximum number of value bytes a record may carry.
///
/// The on-device parser reads record values into a fixed 32-byte field, so
/// longer values are rejected here instead of being silently truncated.
pub const MAX_VALUE_LEN: usize = 32;

/// A decoded TLV record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Record type tag.
    pub rtype: u16,
    /// Value bytes, at most [`MAX_VALUE_LEN`] of them.
    pub value: Vec<u8>,
}

impl Record {
    /// Total encoded size of this record, header included.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.value.len()
    }
}

/// Writes one record at the stream's current position.
///
/// # Errors
///
/// Fails with [`SignError::ValueTooLong`] if `value` exceeds
/// [`MAX_VALUE_LEN`] bytes, or with an I/O error from the stream.
pub fn write_record<W: Write>(w: &mut W, rtype: u16, value: &[u8]) -> Result<()> {
    if value.len() > MAX_VALUE_LEN {
        return Err(SignError::ValueTooLong {
            rtype,
            len: value.len(),
            limit: MAX_VALUE_LEN,
        });
    }
    w.write_u16::<BigEndian>(rtype)?;
    w.write_u16::<BigEndian>(value.len() as u16)?;
    w.write_all(value)?;
    Ok(())
}

/// Writes a header-only record with length zero.
pub fn write_empty_record<W: Write>(w: &mut W, rtype: u16) -> Result<()> {
    write_record(w, rtype, &[])
}

/// Writes a record whose value is the UTF-8 bytes of `text`.
pub fn write_string_record<W: Write>(w: &mut W, rtype: u16, text: &str) -> Result<()> {
    write_record(w, rtype, text.as_bytes())
}

/// Reads one record from the stream's current position.
///
/// # Errors
///
/// Fails with [`SignError::InvalidContainer`] if the declared length
/// exceeds [`MAX_VALUE_LEN`], or with an I/O error if the stream ends
/// inside the record.
pub fn read_record<R: Read>(r: &mut R) -> Result<Record> {
    let rtype = r.read_u16::<BigEndian>()?;
    let len = r.read_u16::<BigEndian>()? as usize;
    if len > MAX_VALUE_LEN {
        return Err(SignError::invalid_container(format!(
            "record type {} declares {} value bytes, limit is {}",
            rtype, len, MAX_VALUE_LEN
        )));
    }
    let mut value = vec![0u8; len];
    r.read_exact(&mut value)?;
    Ok(Record { rtype, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_record_layout_is_big_endian() {
        let mut buf = Vec::new();
        write_record(&mut buf, 0x0102, &[0xAA, 0xBB]).expect("write should succeed");
        assert_eq!(buf, [0x01, 0x02, 0x00, 0x02, 0xAA, 0xBB]);
    }

    #[test]
    fn test_empty_record_is_header_only() {
        let mut buf = Vec::new();
        write_empty_record(&mut buf, 1).expect("write should succeed");
        assert_eq!(buf, [0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_string_record_round_trip() {
        let mut buf = Vec::new();
        write_string_record(&mut buf, 2, "V1.0.2.46_1.0.1").expect("write should succeed");

        let record = read_record(&mut Cursor::new(&buf)).expect("read should succeed");
        assert_eq!(record.rtype, 2);
        assert_eq!(record.value, b"V1.0.2.46_1.0.1");
        assert_eq!(record.encoded_len(), buf.len());
    }

    #[test]
    fn test_oversized_value_rejected() {
        let mut buf = Vec::new();
        let err = write_record(&mut buf, 7, &[0u8; MAX_VALUE_LEN + 1])
            .expect_err("33-byte value must be rejected");
        assert!(matches!(
            err,
            SignError::ValueTooLong { rtype: 7, len: 33, .. }
        ));
        assert!(buf.is_empty(), "nothing may be written on rejection");
    }

    #[test]
    fn test_read_rejects_oversized_length() {
        // Header declares 33 value bytes.
        let bytes = [0x00, 0x05, 0x00, 0x21];
        let err = read_record(&mut Cursor::new(&bytes)).expect_err("length must be rejected");
        assert!(matches!(err, SignError::InvalidContainer(_)));
    }

    #[test]
    fn test_read_rejects_truncated_value() {
        // Header declares 4 value bytes but only 2 follow.
        let bytes = [0x00, 0x02, 0x00, 0x04, 0xDE, 0xAD];
        assert!(read_record(&mut Cursor::new(&bytes)).is_err());
    }
}
