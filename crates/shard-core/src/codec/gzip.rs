use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::ShardError;
use crate::types::Result;

/// Compresses `data` as one gzip member streamed into `writer`.
pub fn compress_into<W: Write>(data: &[u8], writer: W) -> Result<()> {
    let mut encoder = GzEncoder::new(writer, Compression::default());
    encoder
        .write_all(data)
        .map_err(|err| ShardError::CompressionError(format!("gzip encode failed: {err}")))?;
    encoder
        .finish()
        .map_err(|err| ShardError::CompressionError(format!("gzip encode failed: {err}")))?;
    Ok(())
}

/// Decompresses one gzip member fully into memory.
pub fn decompress_to_vec<R: Read>(reader: R) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(reader);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|err| ShardError::DecompressionError(format!("gzip decode failed: {err}")))?;
    Ok(out)
}
