// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
//! Remote reader collaborator: a range-capable HTTP source.
//! Reads are synchronous (`reqwest::blocking`) and all serialize through
//! one [`std::sync::Mutex`]-guarded client, so concurrent workers never
//! issue overlapping requests against the same connection.

use super::zip::{RangeRead, ZipParser};
use super::{ByteSource, OpenedPayload, SourceFactory};
use crate::constants::DEFAULT_USER_AGENT;
use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use reqwest::header;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct RemoteByteSource {
    client: Client,
    url: String,
    content_length: u64,
}

impl RemoteByteSource {
    fn new(url: &str, user_agent: Option<&str>) -> Result<Self> {
        url::Url::parse(url).map_err(|e| anyhow!("invalid URL: {e}"))?;

        let client = Client::builder()
            .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
            .timeout(Duration::from_secs(600))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        let head = client
            .head(url)
            .send()
            .context("HEAD request to payload URL failed")?;
        if !head.status().is_success() {
            return Err(anyhow!("failed to access URL: {}", head.status()));
        }

        let content_length = head
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| anyhow!("could not determine content length"))?;

        Ok(Self {
            client,
            url: url.to_string(),
            content_length,
        })
    }

    fn read_range(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        if offset >= self.content_length {
            return Err(anyhow!(
                "offset {offset} exceeds content length {}",
                self.content_length
            ));
        }

        let end = offset + buf.len() as u64 - 1;
        let range = format!("bytes={offset}-{end}");

        let response = self
            .client
            .get(&self.url)
            .header(header::RANGE, range)
            .send()
            .context("range request failed")?;

        let status = response.status();
        if !status.is_success() && status.as_u16() != 206 {
            return Err(anyhow!("range request returned {status}"));
        }

        let bytes = response.bytes().context("failed to read response body")?;
        if bytes.len() != buf.len() {
            return Err(anyhow!(
                "server returned {} bytes, expected {}",
                bytes.len(),
                buf.len()
            ));
        }
        buf.copy_from_slice(&bytes);
        Ok(())
    }
}

impl RangeRead for RemoteByteSource {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.read_range(offset, buf)
    }

    fn size(&self) -> Result<u64> {
        Ok(self.content_length)
    }
}

/// opens a remote ZIP and locates its `payload.bin` member. remote raw
/// `.bin` sources aren't supported — a URL is always treated as a ZIP,
/// so this always goes through the archive locator.
pub fn open_remote(url: &str, user_agent: Option<&str>) -> Result<OpenedPayload> {
    let source = RemoteByteSource::new(url, user_agent)?;
    let entry = ZipParser::find_payload_entry(&source)
        .context("could not find payload.bin in remote ZIP")?;
    let payload_offset = ZipParser::get_data_offset(&source, &entry)?;
    ZipParser::verify_payload_magic(&source, payload_offset)?;

    Ok(OpenedPayload {
        factory: Arc::new(RemoteSourceFactory {
            shared: Arc::new(Mutex::new(source)),
        }),
        payload_offset,
    })
}

/// every call to `open_reader` hands back a wrapper around the *same*
/// mutex-guarded client — unlike the local case, remote reads never
/// parallelize (one reader mutex per remote source).
struct RemoteSourceFactory {
    shared: Arc<Mutex<RemoteByteSource>>,
}

impl SourceFactory for RemoteSourceFactory {
    fn open_reader(&self) -> Result<Arc<dyn ByteSource>> {
        Ok(Arc::new(SharedRemoteHandle(self.shared.clone())))
    }
}

struct SharedRemoteHandle(Arc<Mutex<RemoteByteSource>>);

impl ByteSource for SharedRemoteHandle {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let guard = self.0.lock().map_err(|_| anyhow!("reader mutex poisoned"))?;
        guard.read_at(offset, buf)
    }
}
