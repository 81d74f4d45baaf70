// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
//! Operation Executor: applies one `InstallOperation`'s
//! data to an output partition file. Failures here are non-fatal — the
//! caller logs and moves on to the next operation.

use crate::decompress;
use crate::manifest::{InstallOperation, OpType};
use crate::source::ByteSource;
use anyhow::{Result, anyhow};
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};

/// applies `op` to `out`, reading source data (if any) through `reader` at
/// `data_offset + op.data_offset`.
pub fn execute(
    op: &InstallOperation,
    reader: &dyn ByteSource,
    data_offset: u64,
    block_size: u64,
    out: &mut File,
) -> Result<()> {
    match op.op_type {
        OpType::Zero => apply_zero(op, block_size, out),
        OpType::Unsupported => Err(anyhow!("unsupported operation type")),
        _ => apply_data_op(op, reader, data_offset, block_size, out),
    }
}

/// REPLACE / REPLACE_XZ / REPLACE_BZ / ZSTD: fetch the operation's payload
/// slice, decompress if needed, then write the whole buffer contiguously
/// at `dst_extents[0]`'s start. This matches the reference implementation,
/// which only ever seeks to the first destination extent for these op
/// types regardless of how many extents the operation declares — later
/// extents are not separately addressed.
fn apply_data_op(
    op: &InstallOperation,
    reader: &dyn ByteSource,
    data_offset: u64,
    block_size: u64,
    out: &mut File,
) -> Result<()> {
    let offset = op
        .data_offset
        .ok_or_else(|| anyhow!("operation missing data_offset"))?;
    let length = op
        .data_length
        .ok_or_else(|| anyhow!("operation missing data_length"))? as usize;

    let mut raw = vec![0u8; length];
    reader.read_at(data_offset + offset, &mut raw)?;

    let payload = match op.op_type {
        OpType::Replace => raw,
        OpType::ReplaceXz => decompress::decompress_xz(&raw)?,
        OpType::ReplaceBz => decompress::decompress_bz2(&raw)?,
        OpType::Zstd => decompress::decompress_zstd(&raw)?,
        OpType::Zero | OpType::Unsupported => unreachable!(),
    };

    let first = op
        .dst_extents
        .first()
        .ok_or_else(|| anyhow!("operation has no destination extents"))?;
    let (start, _) = first.byte_range(block_size);

    out.seek(SeekFrom::Start(start))?;
    out.write_all(&payload)?;

    Ok(())
}

/// ZERO: writes `num_blocks * block_size` zero bytes per extent. Preserves
/// the reference implementation's defect of seeking to `dst_extents[0]`'s
/// start on every iteration instead of the current extent's own start, so
/// with more than one destination extent all writes after the first land
/// at the wrong offset.
fn apply_zero(op: &InstallOperation, block_size: u64, out: &mut File) -> Result<()> {
    let first = op
        .dst_extents
        .first()
        .ok_or_else(|| anyhow!("ZERO operation has no destination extents"))?;
    let (first_start, _) = first.byte_range(block_size);

    for extent in &op.dst_extents {
        let (start, end) = extent.byte_range(block_size);
        let len = (end - start) as usize;

        out.seek(SeekFrom::Start(first_start))?;
        out.write_all(&vec![0u8; len])?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Extent;
    use anyhow::Result as AResult;
    use std::io::Read;

    struct MemSource(Vec<u8>);
    impl ByteSource for MemSource {
        fn read_at(&self, offset: u64, buf: &mut [u8]) -> AResult<()> {
            let start = offset as usize;
            buf.copy_from_slice(&self.0[start..start + buf.len()]);
            Ok(())
        }
    }

    fn tmp_file() -> (tempfile::NamedTempFile, File) {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let file = tmp.reopen().unwrap();
        (tmp, file)
    }

    #[test]
    fn replace_writes_identity_bytes() {
        let block_size = 4u64;
        let data = vec![0xAAu8; 8];
        let reader = MemSource(data.clone());
        let op = InstallOperation {
            op_type: OpType::Replace,
            data_offset: Some(0),
            data_length: Some(8),
            dst_extents: vec![Extent {
                start_block: 0,
                num_blocks: 2,
            }],
        };

        let (tmp, mut file) = tmp_file();
        execute(&op, &reader, 0, block_size, &mut file).unwrap();

        let mut out = Vec::new();
        tmp.reopen().unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn replace_with_multiple_extents_writes_only_at_first() {
        let block_size = 4u64;
        let data = vec![0xBBu8; 8];
        let reader = MemSource(data.clone());
        let op = InstallOperation {
            op_type: OpType::Replace,
            data_offset: Some(0),
            data_length: Some(8),
            dst_extents: vec![
                Extent {
                    start_block: 0,
                    num_blocks: 1,
                },
                Extent {
                    start_block: 5,
                    num_blocks: 1,
                },
            ],
        };

        let (tmp, mut file) = tmp_file();
        file.write_all(&[0xFFu8; 32]).unwrap();

        execute(&op, &reader, 0, block_size, &mut file).unwrap();

        let mut out = Vec::new();
        tmp.reopen().unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(&out[0..8], &data[..]);
        assert_eq!(&out[20..24], &[0xFFu8; 4]);
    }

    #[test]
    fn zero_bug_reuses_first_extent_offset() {
        let block_size = 4u64;
        let op = InstallOperation {
            op_type: OpType::Zero,
            data_offset: None,
            data_length: None,
            dst_extents: vec![
                Extent {
                    start_block: 0,
                    num_blocks: 1,
                },
                Extent {
                    start_block: 5,
                    num_blocks: 1,
                },
            ],
        };

        let reader = MemSource(Vec::new());
        let (tmp, mut file) = tmp_file();
        // pre-fill so we can observe that block 5 is untouched by the bug.
        file.write_all(&[0xFFu8; 32]).unwrap();

        execute(&op, &reader, 0, block_size, &mut file).unwrap();

        let mut out = Vec::new();
        tmp.reopen().unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(&out[0..4], &[0u8; 4]);
        assert_eq!(&out[20..24], &[0xFFu8; 4]);
    }
}
