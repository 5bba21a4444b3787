/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 Arsenal Project contributors. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::path::PathBuf;

use clap::{Parser, Subcommand};

const DEFAULT_CONFIG_PATH: &str = "/etc/arsenal/client.toml";

#[derive(Parser, Debug)]
#[command(name = "arsenal-register")]
#[command(about = "Register this host with the arsenal inventory")]
#[command(version)]
pub struct Options {
    /// Path to the client configuration file. Missing file means defaults.
    #[arg(
        short,
        long,
        default_value = DEFAULT_CONFIG_PATH,
        env = "ARSENAL_CLIENT_CONFIG"
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Gather facts about this host and register it with the arsenal server.
    Register {
        /// Print the registration payload instead of submitting it.
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the gathered facts as JSON without registering.
    Facts,
    /// Print this node's resolved unique_id without registering.
    UniqueId,
}
