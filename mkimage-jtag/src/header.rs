//! Segment header structures and serialization
//!
//! Every segment in a JTAG image starts with a fixed 16 byte header:
//!
//! | field      | width | encoding                  |
//! |------------|-------|---------------------------|
//! | magic      | 2     | ASCII `GW`                |
//! | erase mode | 2     | little-endian `u16`       |
//! | offset     | 4     | little-endian `u32`       |
//! | data size  | 4     | little-endian `u32`       |
//! | part size  | 4     | little-endian `u32`       |
//!
//! The payload follows immediately, with no padding or checksum.

use std::fmt;
use std::io::{Read, Write};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use crate::error::{JtagImageError, Result};
use crate::{GW_MAGIC, HEADER_SIZE};

/// What the flasher erases before writing a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum EraseMode {
    /// Erase the whole device; only meaningful on the first segment
    All = 0,
    /// Write without erasing
    None = 1,
    /// Erase the segment's partition; the offset must be block aligned
    Partition = 2,
    /// Erase from the segment's offset to the end of the device
    ToEnd = 3,
}

impl EraseMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::None => "none",
            Self::Partition => "part",
            Self::ToEnd => "toend",
        }
    }
}

impl fmt::Display for EraseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u16> for EraseMode {
    type Error = JtagImageError;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0 => Ok(Self::All),
            1 => Ok(Self::None),
            2 => Ok(Self::Partition),
            3 => Ok(Self::ToEnd),
            _ => Err(JtagImageError::invalid_image(format!(
                "unknown erase mode {value}"
            ))),
        }
    }
}

/// Decoded form of one segment header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    pub erase_mode: EraseMode,
    /// Flash address the payload is written to
    pub offset: u32,
    /// Number of payload bytes following the header
    pub data_size: u32,
    /// Partition size, only meaningful for an empty payload
    pub part_size: u32,
}

impl SegmentHeader {
    pub fn new(erase_mode: EraseMode, offset: u32, data_size: u32, part_size: u32) -> Self {
        Self {
            erase_mode,
            offset,
            data_size,
            part_size,
        }
    }

    /// Serialize the header into its fixed-width wire form.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buffer = [0u8; HEADER_SIZE];
        buffer[0..2].copy_from_slice(&GW_MAGIC);
        buffer[2..4].copy_from_slice(&encode_u16(self.erase_mode as u16));
        buffer[4..8].copy_from_slice(&encode_u32(self.offset));
        buffer[8..12].copy_from_slice(&encode_u32(self.data_size));
        buffer[12..16].copy_from_slice(&encode_u32(self.part_size));
        buffer
    }

    /// Write the header to a writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.encode())?;
        Ok(())
    }

    /// Read one header, failing on a bad magic or erase mode.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 2];
        reader.read_exact(&mut magic)?;
        if magic != GW_MAGIC {
            return Err(JtagImageError::invalid_image(format!(
                "bad magic {:02x} {:02x}",
                magic[0], magic[1]
            )));
        }

        let erase_mode = EraseMode::try_from(reader.read_u16::<LittleEndian>()?)?;
        let offset = reader.read_u32::<LittleEndian>()?;
        let data_size = reader.read_u32::<LittleEndian>()?;
        let part_size = reader.read_u32::<LittleEndian>()?;

        Ok(Self {
            erase_mode,
            offset,
            data_size,
            part_size,
        })
    }

    /// Deserialize a header from the start of `data`.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(JtagImageError::invalid_image(format!(
                "header too short: {} bytes (expected {HEADER_SIZE})",
                data.len()
            )));
        }
        Self::read_from(&mut &data[..HEADER_SIZE])
    }
}

pub fn encode_u16(value: u16) -> [u8; 2] {
    let mut bytes = [0u8; 2];
    LittleEndian::write_u16(&mut bytes, value);
    bytes
}

pub fn encode_u32(value: u32) -> [u8; 4] {
    let mut bytes = [0u8; 4];
    LittleEndian::write_u32(&mut bytes, value);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_exact_bytes() {
        let header = SegmentHeader::new(EraseMode::Partition, 0x00E0_0000, 0x1234_5678, 0);
        assert_eq!(
            header.encode(),
            [
                0x47, 0x57, 0x02, 0x00, 0x00, 0x00, 0xE0, 0x00, 0x78, 0x56, 0x34, 0x12, 0x00,
                0x00, 0x00, 0x00,
            ]
        );
    }

    #[test]
    fn test_write_to_matches_encode() {
        let header = SegmentHeader::new(EraseMode::ToEnd, 0x0110_0000, 100, 0x0020_0000);
        let mut buffer = Vec::new();
        header.write_to(&mut buffer).unwrap();
        assert_eq!(buffer.len(), HEADER_SIZE);
        assert_eq!(buffer, header.encode());
    }

    #[test]
    fn test_magic_is_literal_ascii() {
        let bytes = SegmentHeader::new(EraseMode::All, 0, 0, 0).encode();
        assert_eq!(&bytes[..2], b"GW");
    }

    #[test]
    fn test_erase_mode_values() {
        assert_eq!(EraseMode::All as u16, 0);
        assert_eq!(EraseMode::None as u16, 1);
        assert_eq!(EraseMode::Partition as u16, 2);
        assert_eq!(EraseMode::ToEnd as u16, 3);
        assert_eq!(EraseMode::try_from(3).unwrap(), EraseMode::ToEnd);
        assert!(EraseMode::try_from(4).is_err());
        assert_eq!(EraseMode::Partition.to_string(), "part");
    }

    #[test]
    fn test_from_bytes() {
        let header = SegmentHeader::new(EraseMode::None, 0x0100_0000, 7, 0);
        let mut bytes = header.encode().to_vec();
        bytes.extend_from_slice(b"payload");
        assert_eq!(SegmentHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn test_from_bytes_rejects_bad_input() {
        let good = SegmentHeader::new(EraseMode::None, 0, 0, 0).encode();

        assert!(matches!(
            SegmentHeader::from_bytes(&good[..HEADER_SIZE - 1]),
            Err(JtagImageError::InvalidImage(_))
        ));

        let mut bad_magic = good;
        bad_magic[1] = b'X';
        assert!(matches!(
            SegmentHeader::from_bytes(&bad_magic),
            Err(JtagImageError::InvalidImage(_))
        ));

        let mut bad_mode = good;
        bad_mode[2] = 9;
        assert!(matches!(
            SegmentHeader::from_bytes(&bad_mode),
            Err(JtagImageError::InvalidImage(_))
        ));
    }
}
