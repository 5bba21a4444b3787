/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 Arsenal Project contributors. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Fact gathering: runs facter, parses its JSON, and folds in the guest
//! inventory from the local hypervisor.

use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, info};
use utils::cmd::{CmdError, TokioCmd};

use crate::client_config::{ClientConfig, MODERN_FACTER_PATH};
use crate::facts::FactSet;
use crate::guest_vms;

#[derive(thiserror::Error, Debug)]
pub enum FactError {
    #[error(transparent)]
    Cmd(#[from] CmdError),

    #[error("facter produced invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Prefer the modern puppetlabs facter when it is installed, otherwise fall
/// back to whatever `facter` is on PATH.
pub fn default_facter_path() -> PathBuf {
    let modern = PathBuf::from(MODERN_FACTER_PATH);
    if modern.is_file() {
        modern
    } else {
        PathBuf::from("facter")
    }
}

/// Gather all facts about this host: run facter with puppet facts loaded,
/// map its JSON into the arsenal fact model, then attach the guests found
/// running on the local hypervisor, if any.
pub async fn gather(config: &ClientConfig) -> Result<FactSet, FactError> {
    let facter = config
        .tools
        .facter
        .clone()
        .unwrap_or_else(default_facter_path);
    info!("Gathering facts with {}", facter.display());

    let output = TokioCmd::new(&facter)
        .args(["-p", "--json"])
        .timeout(config.timeouts.facter_timeout())
        .output()
        .await?;

    let doc: Value = serde_json::from_str(&output)?;
    let mut facts = FactSet::from_facter_json(&doc);

    facts.guest_vms = guest_vms::collect(config).await;
    debug!("Fact gathering complete.");

    Ok(facts)
}
