//! Collection header (component F): 12 bytes of metadata preceding each
//! collection's payload inside a chunk.

use byteorder::{BigEndian, ByteOrder};

use crate::consts::MAX_48BIT;
use crate::error::{CmpError, CmpResult};
use crate::structs::data_type::{data_type_from_subservice, CmpDataType};

/// A 12-byte collection header: 48-bit timestamp, 16-bit configuration id,
/// 16-bit collection id (pkt_type/subservice/ccd_id/sequence_num bitfield),
/// 16-bit data length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionHeader {
    pub timestamp: u64,
    pub configuration_id: u16,
    pub pkt_type: u8,
    pub subservice: u8,
    pub ccd_id: u8,
    pub sequence_num: u8,
    pub data_length: u16,
}

pub const SIZE: usize = crate::consts::COLLECTION_HEADER_SIZE;

impl CollectionHeader {
    pub fn new(
        timestamp: u64,
        configuration_id: u16,
        pkt_type: u8,
        subservice: u8,
        ccd_id: u8,
        sequence_num: u8,
        data_length: u16,
    ) -> CmpResult<Self> {
        let h = CollectionHeader {
            timestamp,
            configuration_id,
            pkt_type,
            subservice,
            ccd_id,
            sequence_num,
            data_length,
        };
        h.validate()?;
        Ok(h)
    }

    fn validate(&self) -> CmpResult<()> {
        if self.timestamp > MAX_48BIT {
            return Err(CmpError::EntityTimestamp);
        }
        if self.pkt_type > 1 || self.subservice > 63 || self.ccd_id > 3 || self.sequence_num > 127
        {
            return Err(CmpError::ColSubserviceUnsupported);
        }
        Ok(())
    }

    /// The schema variant this collection's subservice maps to.
    pub fn data_type(&self) -> CmpDataType {
        data_type_from_subservice(self.subservice)
    }

    /// Serializes this header into the first [`SIZE`] bytes of `out`.
    pub fn write(&self, out: &mut [u8]) -> CmpResult<()> {
        if out.len() < SIZE {
            return Err(CmpError::SmallBuf);
        }
        self.validate()?;

        write_u48(&mut out[0..6], self.timestamp);
        BigEndian::write_u16(&mut out[6..8], self.configuration_id);

        let collection_id: u16 = ((self.pkt_type as u16 & 0x1) << 15)
            | ((self.subservice as u16 & 0x3F) << 9)
            | ((self.ccd_id as u16 & 0x3) << 7)
            | (self.sequence_num as u16 & 0x7F);
        BigEndian::write_u16(&mut out[8..10], collection_id);

        BigEndian::write_u16(&mut out[10..12], self.data_length);
        Ok(())
    }

    /// Parses a header from the first [`SIZE`] bytes of `buf`.
    pub fn read(buf: &[u8]) -> CmpResult<Self> {
        if buf.len() < SIZE {
            return Err(CmpError::ChunkTooSmall);
        }

        let timestamp = read_u48(&buf[0..6]);
        let configuration_id = BigEndian::read_u16(&buf[6..8]);
        let collection_id = BigEndian::read_u16(&buf[8..10]);
        let data_length = BigEndian::read_u16(&buf[10..12]);

        let pkt_type = ((collection_id >> 15) & 0x1) as u8;
        let subservice = ((collection_id >> 9) & 0x3F) as u8;
        let ccd_id = ((collection_id >> 7) & 0x3) as u8;
        let sequence_num = (collection_id & 0x7F) as u8;

        let h = CollectionHeader {
            timestamp,
            configuration_id,
            pkt_type,
            subservice,
            ccd_id,
            sequence_num,
            data_length,
        };
        h.validate()?;
        Ok(h)
    }
}

fn write_u48(out: &mut [u8], v: u64) {
    out[0] = (v >> 40) as u8;
    out[1] = (v >> 32) as u8;
    out[2] = (v >> 24) as u8;
    out[3] = (v >> 16) as u8;
    out[4] = (v >> 8) as u8;
    out[5] = v as u8;
}

fn read_u48(buf: &[u8]) -> u64 {
    (buf[0] as u64) << 40
        | (buf[1] as u64) << 32
        | (buf[2] as u64) << 24
        | (buf[3] as u64) << 16
        | (buf[4] as u64) << 8
        | (buf[5] as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let h = CollectionHeader::new(0x0001_0203_0405, 0xABCD, 1, 6, 2, 100, 42).unwrap();
        let mut buf = [0u8; SIZE];
        h.write(&mut buf).unwrap();
        let back = CollectionHeader::read(&buf).unwrap();
        assert_eq!(h, back);
    }

    #[test]
    fn bitfield_boundaries_rejected() {
        assert_eq!(
            CollectionHeader::new(0, 0, 2, 0, 0, 0, 0).unwrap_err(),
            CmpError::ColSubserviceUnsupported
        );
        assert_eq!(
            CollectionHeader::new(0, 0, 0, 64, 0, 0, 0).unwrap_err(),
            CmpError::ColSubserviceUnsupported
        );
        assert_eq!(
            CollectionHeader::new(0, 0, 0, 0, 4, 0, 0).unwrap_err(),
            CmpError::ColSubserviceUnsupported
        );
        assert_eq!(
            CollectionHeader::new(0, 0, 0, 0, 0, 128, 0).unwrap_err(),
            CmpError::ColSubserviceUnsupported
        );
    }

    #[test]
    fn timestamp_above_48_bits_rejected() {
        assert_eq!(
            CollectionHeader::new(1 << 48, 0, 0, 0, 0, 0, 0).unwrap_err(),
            CmpError::EntityTimestamp
        );
    }

    #[test]
    fn subservice_maps_to_data_type() {
        let h = CollectionHeader::new(0, 0, 0, 6, 0, 0, 0).unwrap();
        assert_eq!(h.data_type(), CmpDataType::Background);
    }
}
