// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! graphshell command-line entry point

mod cli;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::new();
    logger.filter_level(cli.level_filter());
    logger.parse_default_env();
    logger.init();

    std::process::exit(cli::run(cli));
}
