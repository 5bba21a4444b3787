/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 Arsenal Project contributors. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::path::Path;

use host_support::client_config::ClientConfig;
use tracing::info;
use utils::cmd::CmdError;

use crate::command_line::{Command, Options};

pub mod command_line;
pub mod commands;

#[derive(thiserror::Error, Debug)]
pub enum ArsenalClientError {
    #[error("Generic error: {0}")]
    GenericError(String),

    #[error("StdIo error {0}")]
    StdIo(#[from] std::io::Error),

    #[error("Subprocess failed: {0}")]
    SubprocessError(#[from] CmdError),

    #[error("Fact gathering error: {0}")]
    FactError(#[from] host_support::facter::FactError),

    #[error("Registration error: {0}")]
    RegistrationError(#[from] host_support::registration::RegistrationError),

    #[error("Json error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type ArsenalClientResult<T> = Result<T, ArsenalClientError>;

pub async fn run(options: Options) -> ArsenalClientResult<()> {
    let config = load_config(&options.config)?;

    match options.command {
        Command::Register { dry_run } => commands::register(&config, dry_run).await,
        Command::Facts => commands::facts(&config).await,
        Command::UniqueId => commands::unique_id(&config).await,
    }
}

fn load_config(path: &Path) -> ArsenalClientResult<ClientConfig> {
    if path.is_file() {
        Ok(ClientConfig::load_from(path)?)
    } else {
        info!("No config file at {}, using defaults.", path.display());
        Ok(ClientConfig::default())
    }
}
