//! Binary artifact format for `FlatIndex`.
//!
//! Layout (little-endian):
//! `magic[4] | version(u8) | metric(u8) | dim(u32) | count(u64) | [f32 * dim] * count`

use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::distance::DistanceMetric;
use crate::error::{Result, VectorDbError};
use super::FlatIndex;
use super::traits::VectorIndex;

pub const INDEX_MAGIC: &[u8; 4] = b"RAGX";
pub const INDEX_FORMAT_VERSION: u8 = 1;

const HEADER_LEN: usize = 4 + 1 + 1 + 4 + 8;

impl FlatIndex {
    /// Serialize to the index artifact format.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.raw().len() * 4);
        out.write_all(INDEX_MAGIC)?;
        out.write_u8(INDEX_FORMAT_VERSION)?;
        out.write_u8(self.metric().to_byte())?;
        out.write_u32::<LittleEndian>(self.dimension() as u32)?;
        out.write_u64::<LittleEndian>(self.len() as u64)?;
        for &val in self.raw() {
            out.write_f32::<LittleEndian>(val)?;
        }
        Ok(out)
    }

    /// Parse an index artifact. Any structural problem is a format error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(VectorDbError::Format(format!(
                "file too short for header: {} bytes",
                bytes.len()
            )));
        }
        if &bytes[..4] != INDEX_MAGIC {
            return Err(VectorDbError::Format("bad magic".into()));
        }
        let mut cur = Cursor::new(&bytes[4..]);
        let version = cur.read_u8()?;
        if version != INDEX_FORMAT_VERSION {
            return Err(VectorDbError::Format(format!("unsupported version {version}")));
        }
        let metric_byte = cur.read_u8()?;
        let metric = DistanceMetric::from_byte(metric_byte)
            .ok_or_else(|| VectorDbError::Format(format!("unknown metric tag {metric_byte}")))?;
        let dim = cur.read_u32::<LittleEndian>()? as usize;
        let count = cur.read_u64::<LittleEndian>()?;
        if dim == 0 {
            return Err(VectorDbError::Format("dimension must be positive".into()));
        }

        let payload = &bytes[HEADER_LEN..];
        let expected = usize::try_from(count)
            .ok()
            .and_then(|c| c.checked_mul(dim))
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| VectorDbError::Format(format!("count {count} x dim {dim} overflows")))?;
        if payload.len() != expected {
            return Err(VectorDbError::Format(format!(
                "expected {expected} payload bytes for {count} vectors of dim {dim}, found {}",
                payload.len()
            )));
        }

        let mut data = vec![0f32; expected / 4];
        Cursor::new(payload).read_f32_into::<LittleEndian>(&mut data)?;
        if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
            return Err(VectorDbError::Format(format!("row {} contains non-finite values", pos / dim)));
        }
        FlatIndex::from_raw(dim, metric, data)
    }
}
