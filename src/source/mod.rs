// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
//! Byte Source abstraction and the archive locator / remote
//! reader collaborators it's built from.

pub mod local;
pub mod zip;
#[cfg(feature = "remote")]
pub mod remote;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

/// random-access read over an opaque, potentially-remote source. every read
/// is an absolute offset — there is no cursor state on this trait itself.
pub trait ByteSource: Send + Sync {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;
}

/// produces [`ByteSource`] handles for worker threads. local sources hand
/// out one independent OS file handle per call (parallel reads permitted);
/// remote sources hand out wrappers around one shared, mutex-guarded HTTP
/// client, so remote reads always serialize.
pub trait SourceFactory: Send + Sync {
    fn open_reader(&self) -> Result<Arc<dyn ByteSource>>;
}

/// resolved location of the `CrAU` payload inside whatever was opened.
pub struct OpenedPayload {
    pub factory: Arc<dyn SourceFactory>,
    pub payload_offset: u64,
}

/// opens a payload source: local file (raw payload or ZIP
/// containing `payload.bin`), or — when `path` looks like a URL — a remote
/// ZIP served over HTTP range requests.
pub fn open_payload_source(
    path: &str,
    user_agent: Option<&str>,
) -> Result<OpenedPayload> {
    if path.starts_with("http://") || path.starts_with("https://") {
        #[cfg(feature = "remote")]
        {
            return remote::open_remote(path, user_agent);
        }
        #[cfg(not(feature = "remote"))]
        {
            anyhow::bail!("remote payload sources require the 'remote' feature");
        }
    }

    local::open_local(Path::new(path))
}
