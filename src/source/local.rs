// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

use super::zip::{RangeRead, ZipParser};
use super::{ByteSource, OpenedPayload, SourceFactory};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// a file handle used only for the ZIP central-directory walk.
struct LocalRangeReader<'a>(&'a File);

impl RangeRead for LocalRangeReader<'_> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        read_exact_at(self.0, offset, buf)
    }

    fn size(&self) -> Result<u64> {
        Ok(self.0.metadata()?.len())
    }
}

fn read_exact_at(file: &File, offset: u64, buf: &mut [u8]) -> Result<()> {
    let mut file = file.try_clone()?;
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(buf)?;
    Ok(())
}

/// opens a local path: a raw `payload.bin` if the magic
/// matches at offset 0, otherwise a ZIP archive containing `payload.bin`.
pub fn open_local(path: &Path) -> Result<OpenedPayload> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;

    let mut magic = [0u8; 4];
    let has_raw_magic = {
        let mut probe = file.try_clone()?;
        probe.seek(SeekFrom::Start(0))?;
        probe.read_exact(&mut magic).is_ok()
    };

    let payload_offset = if has_raw_magic && &magic == crate::constants::PAYLOAD_MAGIC {
        0
    } else {
        let reader = LocalRangeReader(&file);
        let entry = ZipParser::find_payload_entry(&reader)
            .context("payload.bin not found: not a raw payload and not a ZIP containing one")?;
        let offset = ZipParser::get_data_offset(&reader, &entry)?;
        ZipParser::verify_payload_magic(&reader, offset)?;
        offset
    };

    Ok(OpenedPayload {
        factory: Arc::new(LocalSourceFactory {
            path: path.to_path_buf(),
        }),
        payload_offset,
    })
}

/// each call to [`SourceFactory::open_reader`] opens an independent file
/// handle, so worker threads never contend on a shared reader mutex for
/// local extraction (the explicitly permitted optimization).
struct LocalSourceFactory {
    path: PathBuf,
}

impl SourceFactory for LocalSourceFactory {
    fn open_reader(&self) -> Result<Arc<dyn ByteSource>> {
        let file = File::open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        Ok(Arc::new(LocalByteSource(file)))
    }
}

struct LocalByteSource(File);

impl ByteSource for LocalByteSource {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        read_exact_at(&self.0, offset, buf)
    }
}
