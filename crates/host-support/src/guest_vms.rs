/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 Arsenal Project contributors. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Guest discovery on hypervisor hosts.
//!
//! Asks libvirt (via virsh) for the domains running locally and reports each
//! one by name and the MAC of its first interface, which is the same
//! unique_id the guest registers under itself. Hosts without a hypervisor
//! simply report no guests; nothing here is allowed to fail registration.

use regex::Regex;
use tracing::{debug, info};
use utils::cmd::TokioCmd;

use crate::client_config::ClientConfig;
use crate::facts::GuestVm;

const LIBVIRT_URIS: &[&str] = &["qemu:///system", "xen:///system"];

/// Collect the guests running on this host. Best effort: any virsh failure
/// (not installed, no libvirt daemon, no such URI) yields an empty list.
pub async fn collect(config: &ClientConfig) -> Vec<GuestVm> {
    let mut guests = Vec::new();

    for uri in LIBVIRT_URIS {
        for name in list_domains(config, uri).await {
            match domain_mac(config, uri, &name).await {
                Some(unique_id) => {
                    info!("Found guest vm: {name} ({unique_id})");
                    guests.push(GuestVm { name, unique_id });
                }
                None => debug!("No mac address found for domain {name}, skipping."),
            }
        }
    }

    guests
}

async fn list_domains(config: &ClientConfig, uri: &str) -> Vec<String> {
    let output = TokioCmd::new(&config.tools.virsh)
        .args(["-c", uri, "list", "--name"])
        .timeout(config.timeouts.subprocess_timeout())
        .output()
        .await;

    match output {
        Ok(output) => output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        Err(e) => {
            debug!("virsh list failed for {uri}: {e}");
            Vec::new()
        }
    }
}

async fn domain_mac(config: &ClientConfig, uri: &str, domain: &str) -> Option<String> {
    let output = TokioCmd::new(&config.tools.virsh)
        .args(["-c", uri, "dumpxml", domain])
        .timeout(config.timeouts.subprocess_timeout())
        .output()
        .await;

    match output {
        Ok(xml) => first_mac(&xml),
        Err(e) => {
            debug!("virsh dumpxml failed for {domain}: {e}");
            None
        }
    }
}

// The first <mac address='...'/> in the domain XML belongs to the guest's
// primary interface.
fn first_mac(domain_xml: &str) -> Option<String> {
    let pattern = Regex::new(r#"(?i)<mac address='([a-f0-9:]+)'"#).ok()?;
    pattern
        .captures(domain_xml)
        .map(|captures| captures[1].to_string())
}
