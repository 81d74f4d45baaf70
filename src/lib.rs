// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

pub mod constants;
pub mod decompress;
pub mod envelope;
pub mod manifest;
pub mod operation;
pub mod progress;
pub mod source;
pub mod utils;
pub mod worker;

/// generated protobuf bindings for the payload manifest — the core only
/// ever touches the friendly wrapper types in [`manifest`], never these
/// generated structs directly.
pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/chromeos_update_engine.rs"));
}
