/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 Arsenal Project contributors. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use host_support::client_config::ClientConfig;
use host_support::facter;
use host_support::registration::{self, NodeRecord};
use host_support::unique_id::{Dmidecode, resolve_unique_id};
use tracing::{debug, info};

use crate::{ArsenalClientError, ArsenalClientResult};

/// Gather facts, build the node record, and submit it. With `dry_run` the
/// payload is printed instead of submitted.
pub async fn register(config: &ClientConfig, dry_run: bool) -> ArsenalClientResult<()> {
    let facts = facter::gather(config).await?;
    let source = Dmidecode::from_config(config);
    let record = registration::build_node_record(&facts, &source);
    ensure_identity(&record)?;

    if dry_run {
        println!("{}", serde_json::to_string_pretty(&record)?);
        info!("Dry run, not submitting registration.");
        return Ok(());
    }

    let response = registration::register_node(config, &record).await?;
    info!(
        "Node registered: name: {} unique_id: {}",
        record.name, record.unique_id
    );
    debug!("Server response: {response}");
    Ok(())
}

/// Print the gathered facts as JSON.
pub async fn facts(config: &ClientConfig) -> ArsenalClientResult<()> {
    let facts = facter::gather(config).await?;
    println!("{}", serde_json::to_string_pretty(&facts)?);
    Ok(())
}

/// Print the resolved unique_id of this node.
pub async fn unique_id(config: &ClientConfig) -> ArsenalClientResult<()> {
    let facts = facter::gather(config).await?;
    let source = Dmidecode::from_config(config);
    let unique_id = resolve_unique_id(&facts, &source);
    ensure_identity_value(&unique_id)?;
    println!("{unique_id}");
    Ok(())
}

// Registering with an empty unique_id would collide every broken host onto
// one inventory record, so refuse before anything reaches the server.
fn ensure_identity(record: &NodeRecord) -> ArsenalClientResult<()> {
    ensure_identity_value(&record.unique_id)
}

fn ensure_identity_value(unique_id: &str) -> ArsenalClientResult<()> {
    if unique_id.is_empty() {
        return Err(ArsenalClientError::GenericError(
            "Unable to determine a unique_id for this node, refusing to register.".to_string(),
        ));
    }
    Ok(())
}
