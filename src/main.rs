// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

use clap::Parser;
use payload_extractor::worker::{self, ExtractOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "Extracts partition images from an Android A/B OTA payload.bin")]
#[command(next_line_help = true)]
struct Args {
    #[arg(
        value_name = "PAYLOAD",
        help = "Path to a payload.bin, a .zip containing one, or a remote URL"
    )]
    payload_path: String,

    #[arg(
        short = 'o',
        long,
        default_value = "output",
        value_name = "DIR",
        help = "Directory to write extracted partitions into"
    )]
    out: PathBuf,

    #[arg(
        short = 'i',
        long,
        value_name = "NAMES",
        help = "Comma-separated list of partitions to extract",
        long_help = "Extract only specific partitions instead of all available ones. Provide \
                     partition names as a comma-separated list. Use --list to see available \
                     partition names in the payload"
    )]
    images: Option<String>,

    #[arg(
        short = 'l',
        long,
        help = "List available partitions and exit",
        long_help = "Display all partitions present in the payload with their sizes, then exit \
                     without extracting"
    )]
    list: bool,

    #[arg(
        short = 't',
        long,
        value_name = "COUNT",
        help = "Number of worker threads for parallel extraction"
    )]
    threads: Option<usize>,

    #[arg(
        short = 'U',
        long,
        value_name = "AGENT",
        help = if cfg!(feature = "remote") {
            "Custom User-Agent for HTTP requests"
        } else {
            "Custom User-Agent for HTTP requests [requires remote feature]"
        },
        hide = cfg!(not(feature = "remote"))
    )]
    user_agent: Option<String>,
}

fn main() {
    let args = Args::parse();

    let opts = ExtractOptions {
        out_dir: args.out,
        images: args.images,
        list_only: args.list,
        threads: args.threads,
        user_agent: args.user_agent,
    };

    if let Err(e) = worker::run(&args.payload_path, &opts) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
