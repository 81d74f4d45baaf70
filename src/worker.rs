// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
//! Partition Worker Pool: drives the whole extraction — opens
//! the payload, parses the envelope and manifest, filters partitions, then
//! fans operations out across a fixed-size `std::thread` pool. Per-partition
//! failures are logged and skipped; the process itself still
//! exits 0.

use crate::constants::{DEFAULT_THREADS_FALLBACK, MAX_THREADS};
use crate::manifest::Partition;
use crate::progress::Progress;
use crate::source::{self, OpenedPayload};
use crate::{envelope, manifest, operation, utils};
use anyhow::Result;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct ExtractOptions {
    pub out_dir: PathBuf,
    pub images: Option<String>,
    pub list_only: bool,
    pub threads: Option<usize>,
    pub user_agent: Option<String>,
}

/// opens `payload_source`, decodes its manifest, and either lists or
/// extracts the partitions selected by `opts`.
pub fn run(payload_source: &str, opts: &ExtractOptions) -> Result<()> {
    let start = std::time::Instant::now();

    let opened = source::open_payload_source(payload_source, opts.user_agent.as_deref())?;
    let reader = opened.factory.open_reader()?;
    let envelope = envelope::parse(reader.as_ref(), opened.payload_offset)?;
    let manifest = manifest::decode(&envelope.manifest)?;
    drop(reader);

    let partitions: Vec<&Partition> = manifest
        .partitions
        .iter()
        .filter(|p| matches_filter(opts.images.as_deref(), &p.name))
        .collect();

    if opts.list_only {
        list_partitions(&partitions, manifest.block_size as u64);
        return Ok(());
    }

    if partitions.is_empty() {
        println!("No matching partitions found.");
        println!("\nExtraction completed!");
        println!("Time taken: {}", utils::format_elapsed_time(start.elapsed()));
        return Ok(());
    }

    std::fs::create_dir_all(&opts.out_dir)?;

    let thread_count = resolve_thread_count(opts.threads, partitions.len());
    println!("- Initialized {thread_count} thread(s)");
    let progress = Progress::new();
    let next_index = AtomicUsize::new(0);
    let data_offset = envelope.data_offset;
    let block_size = manifest.block_size as u64;

    std::thread::scope(|scope| {
        for _ in 0..thread_count {
            scope.spawn(|| loop {
                let idx = next_index.fetch_add(1, Ordering::SeqCst);
                let Some(partition) = partitions.get(idx) else {
                    break;
                };
                if let Err(e) = process_partition(
                    partition,
                    &opened,
                    data_offset,
                    block_size,
                    &opts.out_dir,
                    &progress,
                ) {
                    eprintln!("- failed to extract partition {}: {e}", partition.name);
                }
            });
        }
    });

    println!("\nExtraction completed!");
    println!("Time taken: {}", utils::format_elapsed_time(start.elapsed()));

    Ok(())
}

/// the documented imprecise filter: a partition is kept when its
/// name appears anywhere as a substring of the raw `--images` argument, not
/// when it appears as one of the comma-separated elements.
fn matches_filter(images: Option<&str>, partition_name: &str) -> bool {
    match images {
        Some(list) => list.contains(partition_name),
        None => true,
    }
}

fn resolve_thread_count(requested: Option<usize>, num_partitions: usize) -> usize {
    let base = match requested {
        Some(n) if (1..=MAX_THREADS).contains(&n) => n,
        Some(_) => DEFAULT_THREADS_FALLBACK,
        None => num_cpus::get().clamp(1, MAX_THREADS),
    };
    base.min(num_partitions.max(1))
}

const LIST_SEPARATOR: &str = "─────────────────────────────────────────────────";

fn list_partitions(partitions: &[&Partition], block_size: u64) {
    println!("Available partitions:");
    println!("{LIST_SEPARATOR}");
    println!("{:<20} {:<15} {:<15}", "Partition Name", "Size", "Size (bytes)");
    println!("{LIST_SEPARATOR}");

    let mut total_size = 0u64;
    for partition in partitions {
        let size = partition
            .new_partition_size
            .unwrap_or_else(|| partition.max_extent_end_blocks() * block_size);
        total_size += size;
        println!(
            "{:<20} {:<15} {:<15}",
            partition.name,
            utils::format_size(size),
            size
        );
    }

    println!("{LIST_SEPARATOR}");
    println!(
        "{:<20} {:<15} {:<15}",
        "Total",
        utils::format_size(total_size),
        total_size
    );
    println!("\nTotal partitions: {}", partitions.len());
    println!("Block size: {block_size} bytes");
}

fn process_partition(
    partition: &Partition,
    opened: &OpenedPayload,
    data_offset: u64,
    block_size: u64,
    out_dir: &Path,
    progress: &Progress,
) -> Result<()> {
    let reader = opened.factory.open_reader()?;
    let bar = progress.add_partition(&partition.name, partition.operations.len() as u64);

    let out_path = out_dir.join(format!("{}.img", partition.name));
    let mut out_file = File::create(&out_path)?;
    if let Some(size) = partition.new_partition_size {
        out_file.set_len(size)?;
    }

    for (i, op) in partition.operations.iter().enumerate() {
        if let Err(e) = operation::execute(op, reader.as_ref(), data_offset, block_size, &mut out_file) {
            eprintln!("- partition {} operation {i}: {e}", partition.name);
        }
        bar.inc(1);
    }

    bar.finish_with_message(format!("{} done", partition.name));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches_substring_of_joined_list() {
        assert!(matches_filter(Some("boot,system"), "boot"));
        assert!(matches_filter(Some("boot,system"), "system"));
        assert!(!matches_filter(Some("boot,system"), "vendor"));
        assert!(matches_filter(None, "anything"));
    }

    #[test]
    fn thread_count_clamps_to_fallback() {
        assert_eq!(resolve_thread_count(Some(0), 10), DEFAULT_THREADS_FALLBACK.min(10));
        assert_eq!(resolve_thread_count(Some(999), 10), DEFAULT_THREADS_FALLBACK.min(10));
        assert_eq!(resolve_thread_count(Some(3), 10), 3);
        assert_eq!(resolve_thread_count(Some(8), 1), 1);
    }

    fn build_test_payload(block_size: u32) -> (Vec<u8>, Vec<u8>) {
        use crate::proto;
        use prost::Message;

        let block_bytes = vec![0x42u8; block_size as usize];
        let op = proto::InstallOperation {
            r#type: proto::install_operation::Type::Replace as i32,
            data_offset: Some(0),
            data_length: Some(block_bytes.len() as u64),
            dst_extents: vec![proto::Extent {
                start_block: Some(0),
                num_blocks: Some(1),
            }],
            ..Default::default()
        };
        let partition = proto::PartitionUpdate {
            partition_name: "boot".to_string(),
            new_partition_info: Some(proto::PartitionInfo {
                size: Some(block_bytes.len() as u64),
                hash: None,
            }),
            operations: vec![op],
            ..Default::default()
        };
        let manifest = proto::DeltaArchiveManifest {
            block_size: Some(block_size),
            partitions: vec![partition],
            ..Default::default()
        };

        let manifest_bytes = manifest.encode_to_vec();

        let mut payload = Vec::new();
        payload.extend_from_slice(crate::constants::PAYLOAD_MAGIC);
        payload.extend_from_slice(&crate::constants::SUPPORTED_PAYLOAD_VERSION.to_be_bytes());
        payload.extend_from_slice(&(manifest_bytes.len() as u64).to_be_bytes());
        payload.extend_from_slice(&0u32.to_be_bytes()); // no metadata signature
        payload.extend_from_slice(&manifest_bytes);
        payload.extend_from_slice(&block_bytes);

        (payload, block_bytes)
    }

    #[test]
    fn end_to_end_extracts_one_partition() {
        let (payload_bytes, expected_block) = build_test_payload(16);

        let payload_file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(payload_file.path(), &payload_bytes).unwrap();

        let out_dir = tempfile::tempdir().unwrap();
        let opts = ExtractOptions {
            out_dir: out_dir.path().to_path_buf(),
            images: None,
            list_only: false,
            threads: Some(2),
            user_agent: None,
        };

        run(payload_file.path().to_str().unwrap(), &opts).unwrap();

        let produced = std::fs::read(out_dir.path().join("boot.img")).unwrap();
        assert_eq!(produced, expected_block);
    }
}
