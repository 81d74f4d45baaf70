// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
//! Decompressor uniformity: one capability, `decompress(bytes)
//! -> bytes`, with four concrete backends. Every decompressor reads the
//! full input and produces the full output in memory — no streaming to the
//! output file,

use anyhow::{Context, Result};
use std::io::Read;

/// initial output-buffer guess and growth factor shared by every codec
/// ("initial output buffer guess is 4 × comp_size; grow by
/// doubling on saturation").
fn read_all_growing<R: Read>(mut reader: R, comp_size: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; (comp_size * 4).max(4096)];
    let mut filled = 0usize;

    loop {
        if filled == out.len() {
            out.resize(out.len() * 2, 0);
        }
        let n = reader.read(&mut out[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    out.truncate(filled);
    Ok(out)
}

pub fn decompress_xz(data: &[u8]) -> Result<Vec<u8>> {
    let decoder = xz2::read::XzDecoder::new_multi_decoder(data);
    read_all_growing(decoder, data.len()).context("XZ decompression failed")
}

pub fn decompress_bz2(data: &[u8]) -> Result<Vec<u8>> {
    let decoder = bzip2::read::BzDecoder::new(data);
    read_all_growing(decoder, data.len()).context("bzip2 decompression failed")
}

pub fn decompress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    if let Some(size) = zstd::zstd_safe::get_frame_content_size(data).ok().flatten() {
        let mut out = vec![0u8; size as usize];
        let written = zstd::bulk::decompress_to_buffer(data, &mut out)
            .context("Zstandard decompression failed")?;
        out.truncate(written);
        return Ok(out);
    }

    let decoder = zstd::stream::read::Decoder::new(data).context("failed to open Zstd frame")?;
    read_all_growing(decoder, data.len()).context("Zstandard decompression failed")
}

#[cfg(feature = "brotli_stub")]
pub fn decompress_brotli(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = brotli::Decompressor::new(data, data.len().max(4096));
    read_all_growing(&mut decoder, data.len()).context("Brotli decompression failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xz_round_trip() {
        let original = b"HELLOWORLD".repeat(50);
        let mut compressed = Vec::new();
        {
            let mut encoder = xz2::write::XzEncoder::new(&mut compressed, 6);
            std::io::Write::write_all(&mut encoder, &original).unwrap();
            encoder.finish().unwrap();
        }
        assert_eq!(decompress_xz(&compressed).unwrap(), original);
    }

    #[test]
    fn bz2_round_trip() {
        let original = b"HELLOWORLD".repeat(50);
        let mut compressed = Vec::new();
        {
            let mut encoder = bzip2::write::BzEncoder::new(&mut compressed, bzip2::Compression::default());
            std::io::Write::write_all(&mut encoder, &original).unwrap();
            encoder.finish().unwrap();
        }
        assert_eq!(decompress_bz2(&compressed).unwrap(), original);
    }

    #[test]
    fn zstd_round_trip_with_known_size() {
        let original = b"HELLOWORLD".repeat(50);
        let compressed = zstd::stream::encode_all(&original[..], 3).unwrap();
        assert_eq!(decompress_zstd(&compressed).unwrap(), original);
    }
}
