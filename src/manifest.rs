// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
// In-memory manifest tree handed from the manifest decoder collaborator to
// the core. The core never looks at the protobuf wire format directly; it
// only sees these types.

use crate::proto;
use anyhow::Result;
use prost::Message;

#[derive(Debug, Clone, Copy)]
pub struct Extent {
    pub start_block: u64,
    pub num_blocks: u64,
}

impl Extent {
    pub fn byte_range(&self, block_size: u64) -> (u64, u64) {
        let start = self.start_block * block_size;
        (start, start + self.num_blocks * block_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpType {
    Replace,
    ReplaceBz,
    ReplaceXz,
    Zstd,
    Zero,
    Unsupported,
}

#[derive(Debug, Clone)]
pub struct InstallOperation {
    pub op_type: OpType,
    pub data_offset: Option<u64>,
    pub data_length: Option<u64>,
    pub dst_extents: Vec<Extent>,
}

#[derive(Debug, Clone)]
pub struct Partition {
    pub name: String,
    pub operations: Vec<InstallOperation>,
    pub new_partition_size: Option<u64>,
}

impl Partition {
    /// size implied by the operations' destination extents, used by `--list`
    /// when `new_partition_info.size` is absent (listing format).
    pub fn max_extent_end_blocks(&self) -> u64 {
        self.operations
            .iter()
            .flat_map(|op| &op.dst_extents)
            .map(|e| e.start_block + e.num_blocks)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct Manifest {
    pub block_size: u32,
    pub partitions: Vec<Partition>,
}

fn convert_op_type(t: proto::install_operation::Type) -> OpType {
    use proto::install_operation::Type as T;
    match t {
        T::Replace => OpType::Replace,
        T::ReplaceBz => OpType::ReplaceBz,
        T::ReplaceXz => OpType::ReplaceXz,
        T::Zstd => OpType::Zstd,
        T::Zero => OpType::Zero,
        _ => OpType::Unsupported,
    }
}

fn convert_extent(e: &proto::Extent) -> Extent {
    Extent {
        start_block: e.start_block.unwrap_or(0),
        num_blocks: e.num_blocks.unwrap_or(0),
    }
}

fn convert_operation(op: &proto::InstallOperation) -> InstallOperation {
    let op_type = proto::install_operation::Type::try_from(op.r#type)
        .map(convert_op_type)
        .unwrap_or(OpType::Unsupported);
    InstallOperation {
        op_type,
        data_offset: op.data_offset,
        data_length: op.data_length,
        dst_extents: op.dst_extents.iter().map(convert_extent).collect(),
    }
}

fn convert_partition(p: &proto::PartitionUpdate) -> Partition {
    Partition {
        name: p.partition_name.clone(),
        operations: p.operations.iter().map(convert_operation).collect(),
        new_partition_size: p.new_partition_info.as_ref().and_then(|i| i.size),
    }
}

/// decodes manifest bytes into the in-memory tree the core operates on.
/// this is the manifest decoder collaborator's `decode` entry point
/// — the only place the crate touches protobuf wire format.
pub fn decode(bytes: &[u8]) -> Result<Manifest> {
    let raw = proto::DeltaArchiveManifest::decode(bytes)?;
    Ok(Manifest {
        block_size: raw.block_size.unwrap_or(crate::constants::DEFAULT_BLOCK_SIZE),
        partitions: raw.partitions.iter().map(convert_partition).collect(),
    })
}
