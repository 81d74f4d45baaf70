// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
// This file is part of payload_extractor. It implements components used for
// extracting and processing Android OTA payloads.

// ZIP signatures
pub const ZIP_MAGIC: [u8; 2] = [0x50, 0x4B];
pub const LOCAL_FILE_HEADER_SIGNATURE: [u8; 4] = [ZIP_MAGIC[0], ZIP_MAGIC[1], 0x03, 0x04];
pub const CENTRAL_DIR_HEADER_SIGNATURE: [u8; 4] = [ZIP_MAGIC[0], ZIP_MAGIC[1], 0x01, 0x02];
pub const EOCD_SIGNATURE: [u8; 4] = [ZIP_MAGIC[0], ZIP_MAGIC[1], 0x05, 0x06];
pub const ZIP64_EOCD_SIGNATURE: [u8; 4] = [ZIP_MAGIC[0], ZIP_MAGIC[1], 0x06, 0x06];
pub const ZIP64_EOCD_LOCATOR_SIGNATURE: [u8; 4] = [ZIP_MAGIC[0], ZIP_MAGIC[1], 0x06, 0x07];

#[cfg(feature = "remote")]
pub const DEFAULT_USER_AGENT: &str = concat!("payload_extractor/", env!("CARGO_PKG_VERSION"));

// Payload envelope
pub const PAYLOAD_MAGIC: &[u8; 4] = b"CrAU";
pub const SUPPORTED_PAYLOAD_VERSION: u64 = 2;
pub const ENVELOPE_HEADER_LEN: u64 = 24; // magic(4) + version(8) + manifest_len(8) + sig_len(4)

pub const DEFAULT_BLOCK_SIZE: u32 = 4096;
pub const DEFAULT_OUT_DIR: &str = "output";
pub const MAX_THREADS: usize = 8;
pub const DEFAULT_THREADS_FALLBACK: usize = 4;
