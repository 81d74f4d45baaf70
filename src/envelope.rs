// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
//! Envelope parser: reads the 24-byte `CrAU` header and the
//! manifest slab that follows it, and computes where operation data begins.

use crate::constants::{ENVELOPE_HEADER_LEN, PAYLOAD_MAGIC, SUPPORTED_PAYLOAD_VERSION};
use crate::source::ByteSource;
use anyhow::{Result, anyhow};

/// parsed envelope: everything needed to reach the manifest bytes and the
/// start of the operation data region.
pub struct Envelope {
    pub manifest: Vec<u8>,
    pub data_offset: u64,
}

/// reads and validates the envelope at `payload_offset` within `source`.
/// a bad magic or unsupported version is fatal: there is no
/// partial-envelope recovery.
pub fn parse(source: &dyn ByteSource, payload_offset: u64) -> Result<Envelope> {
    let mut header = [0u8; ENVELOPE_HEADER_LEN as usize];
    source.read_at(payload_offset, &mut header)?;

    if &header[0..4] != PAYLOAD_MAGIC {
        return Err(anyhow!("not a valid payload: missing 'CrAU' magic"));
    }

    let version = u64::from_be_bytes(header[4..12].try_into()?);
    if version != SUPPORTED_PAYLOAD_VERSION {
        return Err(anyhow!(
            "unsupported payload version {version}, expected {SUPPORTED_PAYLOAD_VERSION}"
        ));
    }

    let manifest_len = u64::from_be_bytes(header[12..20].try_into()?);
    let metadata_sig_len = u32::from_be_bytes(header[20..24].try_into()?) as u64;

    let manifest_offset = payload_offset + ENVELOPE_HEADER_LEN;
    let mut manifest = vec![0u8; manifest_len as usize];
    source.read_at(manifest_offset, &mut manifest)?;

    let data_offset = manifest_offset + manifest_len + metadata_sig_len;

    Ok(Envelope {
        manifest,
        data_offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct MemSource(Vec<u8>);
    impl ByteSource for MemSource {
        fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
            let start = offset as usize;
            let end = start + buf.len();
            if end > self.0.len() {
                return Err(anyhow!("short read"));
            }
            buf.copy_from_slice(&self.0[start..end]);
            Ok(())
        }
    }

    fn build_envelope(manifest: &[u8], sig: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(PAYLOAD_MAGIC);
        out.extend_from_slice(&SUPPORTED_PAYLOAD_VERSION.to_be_bytes());
        out.extend_from_slice(&(manifest.len() as u64).to_be_bytes());
        out.extend_from_slice(&(sig.len() as u32).to_be_bytes());
        out.extend_from_slice(manifest);
        out.extend_from_slice(sig);
        out
    }

    #[test]
    fn round_trip_computes_data_offset() {
        let manifest = b"fake-manifest-bytes".to_vec();
        let sig = b"sig".to_vec();
        let bytes = build_envelope(&manifest, &sig);
        let source: Arc<dyn ByteSource> = Arc::new(MemSource(bytes));

        let env = parse(source.as_ref(), 0).unwrap();
        assert_eq!(env.manifest, manifest);
        assert_eq!(env.data_offset, ENVELOPE_HEADER_LEN + manifest.len() as u64 + sig.len() as u64);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = build_envelope(b"m", b"");
        bytes[0] = b'X';
        let source: Arc<dyn ByteSource> = Arc::new(MemSource(bytes));
        assert!(parse(source.as_ref(), 0).is_err());
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut bytes = build_envelope(b"m", b"");
        bytes[4..12].copy_from_slice(&99u64.to_be_bytes());
        let source: Arc<dyn ByteSource> = Arc::new(MemSource(bytes));
        assert!(parse(source.as_ref(), 0).is_err());
    }
}
