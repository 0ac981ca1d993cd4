//! Payload encoding for cached values: JSON, optionally lz4-framed.

use std::io::{Read, Write};

use serde::{Serialize, de::DeserializeOwned};

use super::CacheError;

const LZ4_LEVEL: u32 = 4;

pub(crate) fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>, CacheError> {
    serde_json::to_vec(value).map_err(CacheError::encode)
}

pub(crate) fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CacheError> {
    serde_json::from_slice(bytes).map_err(CacheError::decode)
}

pub(crate) fn encode_compressed<T: Serialize>(value: &T) -> Result<Vec<u8>, CacheError> {
    compress(&encode_json(value)?)
}

pub(crate) fn decode_compressed<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CacheError> {
    decode_json(&decompress(bytes)?)
}

fn compress(data: &[u8]) -> Result<Vec<u8>, CacheError> {
    let mut encoder = lz4::EncoderBuilder::new()
        .level(LZ4_LEVEL)
        .build(Vec::new())
        .map_err(CacheError::encode)?;
    encoder.write_all(data).map_err(CacheError::encode)?;
    let (compressed, result) = encoder.finish();
    result.map_err(CacheError::encode)?;
    Ok(compressed)
}

fn decompress(data: &[u8]) -> Result<Vec<u8>, CacheError> {
    let mut decoder = lz4::Decoder::new(data).map_err(CacheError::decode)?;
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(CacheError::decode)?;
    Ok(decompressed)
}
