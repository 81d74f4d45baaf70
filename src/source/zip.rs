// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
//! Archive locator collaborator: finds the `payload.bin`
//! member in a ZIP central directory and resolves its data offset. Works
//! over any [`RangeRead`] source, local file or remote HTTP, through plain
//! synchronous, positional reads.

use crate::constants::{
    CENTRAL_DIR_HEADER_SIGNATURE, EOCD_SIGNATURE, LOCAL_FILE_HEADER_SIGNATURE,
    ZIP64_EOCD_LOCATOR_SIGNATURE, ZIP64_EOCD_SIGNATURE,
};
use anyhow::{Result, anyhow};

/// minimal random-access byte source the ZIP locator needs; implemented by
/// both the local file opener and the remote HTTP reader so the same
/// central-directory walk works over either.
pub trait RangeRead {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;
    fn size(&self) -> Result<u64>;
}

#[derive(Debug, Clone)]
pub struct ZipEntry {
    pub name: String,
    pub uncompressed_size: u64,
    pub offset: u64,
    pub compression_method: u16,
}

pub struct ZipParser;

impl ZipParser {
    fn find_eocd<R: RangeRead>(io: &R) -> Result<u64> {
        let file_size = io.size()?;
        let max_comment_size = 65535u64;
        let eocd_min_size = 22u64;
        let max_search = std::cmp::min(file_size, max_comment_size + eocd_min_size);
        let chunk_size = 8192usize;
        let mut current_pos = file_size;
        let mut eocd_pos = None;
        let mut buffer = vec![0u8; chunk_size];

        while current_pos > file_size.saturating_sub(max_search) && eocd_pos.is_none() {
            let read_size = std::cmp::min(
                chunk_size as u64,
                current_pos - file_size.saturating_sub(max_search),
            ) as usize;
            let read_pos = current_pos.saturating_sub(read_size as u64);

            io.read_at(read_pos, &mut buffer[..read_size])?;

            if read_size >= 4 {
                for i in (0..=read_size - 4).rev() {
                    if buffer[i..i + 4] == EOCD_SIGNATURE {
                        eocd_pos = Some(read_pos + i as u64);
                        break;
                    }
                }
            }

            current_pos = read_pos;
            if current_pos > 3 {
                current_pos -= 3;
            } else {
                break;
            }
        }

        eocd_pos.ok_or_else(|| anyhow!("Could not find End of Central Directory record"))
    }

    fn read_zip64_eocd<R: RangeRead>(io: &R, eocd_offset: u64) -> Result<(u64, u64)> {
        if eocd_offset < 20 {
            return Err(anyhow!("Invalid ZIP64 structure"));
        }

        let search_start = eocd_offset.saturating_sub(20);
        let mut buffer = vec![0u8; (eocd_offset - search_start) as usize];
        io.read_at(search_start, &mut buffer)?;

        let mut zip64_eocd_offset = 0u64;
        let mut found_locator = false;

        if buffer.len() >= 4 {
            for i in (0..=buffer.len() - 4).rev() {
                if buffer[i..i + 4] == ZIP64_EOCD_LOCATOR_SIGNATURE {
                    found_locator = true;
                    if i + 16 <= buffer.len() {
                        zip64_eocd_offset = u64::from_le_bytes(buffer[i + 8..i + 16].try_into()?);
                    }
                    break;
                }
            }
        }

        if !found_locator {
            return Err(anyhow!(
                "ZIP64 format indicated but ZIP64 EOCD locator not found"
            ));
        }

        let mut zip64_eocd = [0u8; 56];
        io.read_at(zip64_eocd_offset, &mut zip64_eocd)?;

        if zip64_eocd[0..4] != ZIP64_EOCD_SIGNATURE {
            return Err(anyhow!("Invalid ZIP64 EOCD signature"));
        }

        let cd_offset = u64::from_le_bytes(zip64_eocd[48..56].try_into()?);
        let num_entries = u64::from_le_bytes(zip64_eocd[32..40].try_into()?);

        Ok((cd_offset, num_entries))
    }

    fn central_directory_info<R: RangeRead>(io: &R) -> Result<(u64, usize)> {
        let eocd_offset = Self::find_eocd(io)?;

        let mut num_entries_buf = [0u8; 2];
        io.read_at(eocd_offset + 10, &mut num_entries_buf)?;
        let num_entries = u16::from_le_bytes(num_entries_buf);

        let mut cd_offset_buf = [0u8; 4];
        io.read_at(eocd_offset + 16, &mut cd_offset_buf)?;
        let cd_offset = u32::from_le_bytes(cd_offset_buf) as u64;

        if cd_offset == 0xFFFF_FFFF {
            let (real_cd_offset, real_num_entries) = Self::read_zip64_eocd(io, eocd_offset)?;
            Ok((real_cd_offset, real_num_entries as usize))
        } else {
            Ok((cd_offset, num_entries as usize))
        }
    }

    fn read_central_directory_entry<R: RangeRead>(
        io: &R,
        offset: u64,
    ) -> Result<(ZipEntry, u64)> {
        let mut header = [0u8; 46];
        io.read_at(offset, &mut header)?;

        if header[0..4] != CENTRAL_DIR_HEADER_SIGNATURE {
            return Err(anyhow!("Invalid central directory header signature"));
        }

        let compression_method = u16::from_le_bytes([header[10], header[11]]);
        let filename_len = u16::from_le_bytes([header[28], header[29]]) as usize;
        let extra_len = u16::from_le_bytes([header[30], header[31]]) as usize;
        let comment_len = u16::from_le_bytes([header[32], header[33]]) as usize;

        let mut local_header_offset = u32::from_le_bytes(header[42..46].try_into()?) as u64;
        let mut uncompressed_size = u32::from_le_bytes(header[24..28].try_into()?) as u64;

        let mut filename = vec![0u8; filename_len];
        io.read_at(offset + 46, &mut filename)?;

        let mut extra_data = vec![0u8; extra_len];
        io.read_at(offset + 46 + filename_len as u64, &mut extra_data)?;

        if local_header_offset == 0xFFFF_FFFF || uncompressed_size == 0xFFFF_FFFF {
            let mut pos = 0;
            while pos + 4 <= extra_data.len() {
                let header_id = u16::from_le_bytes([extra_data[pos], extra_data[pos + 1]]);
                let data_size = u16::from_le_bytes([extra_data[pos + 2], extra_data[pos + 3]]) as usize;

                if header_id == 0x0001 && pos + 4 + data_size <= extra_data.len() {
                    let mut field_pos = pos + 4;
                    if uncompressed_size == 0xFFFF_FFFF && field_pos + 8 <= pos + 4 + data_size {
                        uncompressed_size =
                            u64::from_le_bytes(extra_data[field_pos..field_pos + 8].try_into()?);
                        field_pos += 8;
                    }
                    if local_header_offset == 0xFFFF_FFFF && field_pos + 8 <= pos + 4 + data_size {
                        local_header_offset =
                            u64::from_le_bytes(extra_data[field_pos..field_pos + 8].try_into()?);
                    }
                    break;
                }
                pos += 4 + data_size;
            }
        }

        let next_offset = offset + 46 + filename_len as u64 + extra_len as u64 + comment_len as u64;

        Ok((
            ZipEntry {
                name: String::from_utf8_lossy(&filename).into_owned(),
                uncompressed_size,
                offset: local_header_offset,
                compression_method,
            },
            next_offset,
        ))
    }

    /// find the `payload.bin` member, requiring it be stored (uncompressed)
    /// so raw byte ranges equal payload bytes.
    pub fn find_payload_entry<R: RangeRead>(io: &R) -> Result<ZipEntry> {
        let (cd_offset, num_entries) = Self::central_directory_info(io)?;
        let mut current_offset = cd_offset;

        for _ in 0..num_entries {
            let (entry, next_offset) = Self::read_central_directory_entry(io, current_offset)?;
            current_offset = next_offset;

            if entry.compression_method != 0 {
                continue;
            }
            if entry.name == "payload.bin" || entry.name.ends_with("/payload.bin") {
                return Ok(entry);
            }
        }

        Err(anyhow!("Could not find uncompressed payload.bin in ZIP file"))
    }

    /// resolves the local file header to the first content byte.
    pub fn get_data_offset<R: RangeRead>(io: &R, entry: &ZipEntry) -> Result<u64> {
        let mut local_header = [0u8; 30];
        io.read_at(entry.offset, &mut local_header)?;

        if local_header[0..4] != LOCAL_FILE_HEADER_SIGNATURE {
            return Err(anyhow!("Invalid local file header signature"));
        }

        let local_compression = u16::from_le_bytes([local_header[8], local_header[9]]);
        if local_compression != 0 {
            return Err(anyhow!(
                "payload.bin is compressed, expected uncompressed (STORED)"
            ));
        }

        let filename_len = u16::from_le_bytes([local_header[26], local_header[27]]) as u64;
        let extra_len = u16::from_le_bytes([local_header[28], local_header[29]]) as u64;

        Ok(entry.offset + 30 + filename_len + extra_len)
    }

    pub fn verify_payload_magic<R: RangeRead>(io: &R, offset: u64) -> Result<()> {
        let mut magic = [0u8; 4];
        io.read_at(offset, &mut magic)?;

        if &magic != crate::constants::PAYLOAD_MAGIC {
            return Err(anyhow!("Invalid payload file: magic 'CrAU' not found at calculated offset"));
        }

        Ok(())
    }
}
