//! Chunk boundaries for integrity trees
//!
//! Two strategies:
//!   - fixed-size: every chunk is `size` bytes except possibly the last
//!   - content-defined (FastCDC): boundaries follow the content, so inserting
//!     bytes near the start of a file doesn't move every later boundary
//!
//! Each chunk carries its plain BLAKE3 hash as a content identifier.

use pinseal_core::config::ChunkingConfig;
use pinseal_core::{PinsealError, PinsealResult};

/// A span of the source buffer
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Byte offset within the source
    pub offset: u64,
    /// Chunk length in bytes
    pub length: usize,
    /// BLAKE3 hash of this chunk's data
    pub hash: crate::blake3::Hash,
}

impl Chunk {
    /// The bytes of this chunk within `source`. Panics if `source` is not
    /// the buffer the chunk was cut from.
    pub fn data<'a>(&self, source: &'a [u8]) -> &'a [u8] {
        let start = self.offset as usize;
        &source[start..start + self.length]
    }
}

/// FastCDC size targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSizes {
    pub min_size: u32,
    pub avg_size: u32,
    pub max_size: u32,
}

impl ChunkSizes {
    /// Small-file targets: min 2KB, avg 4KB, max 16KB
    pub const SMALL: ChunkSizes = ChunkSizes {
        min_size: 2 * 1024,
        avg_size: 4 * 1024,
        max_size: 16 * 1024,
    };

    /// Targets centred on `avg`: a quarter of it minimum, four times maximum,
    /// clamped into the range FastCDC accepts.
    pub fn around(avg: u32) -> Self {
        let avg = avg.clamp(
            fastcdc::v2020::AVERAGE_MIN,
            fastcdc::v2020::AVERAGE_MAX,
        );
        Self {
            min_size: (avg / 4).clamp(fastcdc::v2020::MINIMUM_MIN, fastcdc::v2020::MINIMUM_MAX),
            avg_size: avg,
            max_size: avg
                .saturating_mul(4)
                .clamp(fastcdc::v2020::MAXIMUM_MIN, fastcdc::v2020::MAXIMUM_MAX),
        }
    }

    pub fn validate(&self) -> PinsealResult<()> {
        use fastcdc::v2020::{
            AVERAGE_MAX, AVERAGE_MIN, MAXIMUM_MAX, MAXIMUM_MIN, MINIMUM_MAX, MINIMUM_MIN,
        };
        let in_range = (MINIMUM_MIN..=MINIMUM_MAX).contains(&self.min_size)
            && (AVERAGE_MIN..=AVERAGE_MAX).contains(&self.avg_size)
            && (MAXIMUM_MIN..=MAXIMUM_MAX).contains(&self.max_size);
        if !in_range || self.min_size > self.avg_size || self.avg_size > self.max_size {
            return Err(PinsealError::InvalidParameter(format!(
                "chunk sizes out of range: {self:?}"
            )));
        }
        Ok(())
    }
}

fn make_chunk(data: &[u8], offset: usize, length: usize) -> Chunk {
    Chunk {
        offset: offset as u64,
        length,
        hash: crate::blake3::hash_bytes(&data[offset..offset + length]),
    }
}

/// Split `data` into `size`-byte chunks. Empty data yields no chunks.
pub fn chunk_fixed(data: &[u8], size: usize) -> PinsealResult<Vec<Chunk>> {
    if size == 0 {
        return Err(PinsealError::InvalidParameter(
            "chunk size must be non-zero".into(),
        ));
    }
    Ok((0..data.len())
        .step_by(size)
        .map(|offset| make_chunk(data, offset, size.min(data.len() - offset)))
        .collect())
}

/// Split `data` into content-defined chunks using FastCDC.
///
/// Returns a list of chunks. For empty data, returns an empty list.
pub fn chunk_content_defined(data: &[u8], sizes: ChunkSizes) -> PinsealResult<Vec<Chunk>> {
    sizes.validate()?;
    if data.is_empty() {
        return Ok(vec![]);
    }

    let chunker =
        fastcdc::v2020::FastCDC::new(data, sizes.min_size, sizes.avg_size, sizes.max_size);
    Ok(chunker
        .map(|c| make_chunk(data, c.offset, c.length))
        .collect())
}

/// Chunk according to the `[chunking]` configuration section.
pub fn chunk_with_config(data: &[u8], config: &ChunkingConfig) -> PinsealResult<Vec<Chunk>> {
    if config.content_defined {
        let avg = u32::try_from(config.chunk_size).unwrap_or(u32::MAX);
        chunk_content_defined(data, ChunkSizes::around(avg))
    } else {
        chunk_fixed(data, config.chunk_size)
    }
}
