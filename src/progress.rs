// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust
//
//! Progress Reporter: one bar per partition inside a shared
//! [`MultiProgress`], safe to update from any worker thread.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

pub struct Progress {
    multi: MultiProgress,
}

impl Progress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
        }
    }

    /// registers a bar for a partition with `total_ops` steps.
    pub fn add_partition(&self, partition_name: &str, total_ops: u64) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new(total_ops));
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/white}] {percent}% - {msg}")
                .unwrap()
                .progress_chars("▰▱△"),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(500));
        bar.set_message(format!("Processing {partition_name} ({total_ops} ops)"));
        bar
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}
