/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 Arsenal Project contributors. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Node identity resolution.
//!
//! A node's unique_id is the primary external key the inventory keeps for
//! it, so the priority order here is load-bearing: cloud instance id over
//! SMBIOS UUID over MAC address, with platform-specific escapes where a
//! source is known to lie.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};
use utils::cmd::Cmd;

use crate::client_config::ClientConfig;
use crate::facts::FactSet;

/// SMBIOS UUID values that are known placeholder data and never unique.
pub const BOGUS_UUIDS: &[&str] = &[
    "03000200-0400-0500-0006-000700080009",
    "Not Settable",
];

/// A source of SMBIOS UUID data, normally dmidecode. Broken out as a trait
/// so every branch of the resolution chain is testable without shelling out.
pub trait UuidSource {
    /// Whether the underlying tool exists on this host at all.
    fn is_available(&self) -> bool;
    /// Output of the system-uuid query, if any.
    fn system_uuid(&self) -> Option<String>;
    /// Raw SMBIOS type-1 table text (the legacy/Xen query path), if any.
    fn smbios_type1(&self) -> Option<String>;
}

/// The production [`UuidSource`]: dmidecode invoked with a bounded timeout.
/// Any failure, including a timeout, reads as "no UUID here".
#[derive(Debug)]
pub struct Dmidecode {
    path: PathBuf,
    timeout: Duration,
}

impl Dmidecode {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.tools.dmidecode.clone(),
            config.timeouts.subprocess_timeout(),
        )
    }

    fn query(&self, args: &[&str]) -> Option<String> {
        match Cmd::new(&self.path)
            .args(args)
            .timeout(self.timeout)
            .output()
        {
            Ok(output) => Some(output),
            Err(e) => {
                debug!("dmidecode {args:?} query failed: {e}");
                None
            }
        }
    }
}

impl UuidSource for Dmidecode {
    fn is_available(&self) -> bool {
        self.path.is_file()
    }

    fn system_uuid(&self) -> Option<String> {
        self.query(&["-s", "system-uuid"])?
            .lines()
            .last()
            .map(str::to_string)
            .filter(|uuid| !uuid.trim().is_empty())
    }

    fn smbios_type1(&self) -> Option<String> {
        self.query(&["-t", "1"])
    }
}

/// Determine the unique_id of a node.
///
/// Total: every branch falls through to the MAC address, and an absent MAC
/// yields an empty string. Callers that go on to register must refuse an
/// empty identity themselves.
pub fn resolve_unique_id(facts: &FactSet, source: &impl UuidSource) -> String {
    debug!("Determining unique_id...");
    let mac_address = facts.networking.mac_address.clone().unwrap_or_default();

    if !kernel_supports_uuid_probing(facts) {
        debug!("unique_id is from mac address: {mac_address}");
        return mac_address;
    }

    // KVM guests commonly present rewritten or non-unique SMBIOS UUIDs, so
    // the MAC is the better identity even when a UUID is on offer.
    if is_kvm_guest(facts) {
        debug!("unique_id is from mac address: {mac_address}");
        return mac_address;
    }

    if let Some(instance_id) = ec2_instance_id(facts) {
        debug!("unique_id is from ec2 instance_id: {instance_id}");
        return instance_id;
    }

    if source.is_available() {
        if let Some(uuid) = smbios_uuid(source) {
            debug!("unique_id is from dmidecode: {uuid}");
            return uuid;
        }
    }

    if mac_address.is_empty() {
        warn!("No usable UUID, instance id, or mac address; unique_id is empty");
    }
    debug!("unique_id is from mac address: {mac_address}");
    mac_address
}

/// The UUID and EC2 heuristics are only trusted on Linux and FreeBSD;
/// everything else registers by MAC address.
fn kernel_supports_uuid_probing(facts: &FactSet) -> bool {
    matches!(facts.os.kernel.as_deref(), Some("Linux") | Some("FreeBSD"))
}

fn is_kvm_guest(facts: &FactSet) -> bool {
    facts.hardware.virtual_type.as_deref() == Some("kvm")
}

fn ec2_instance_id(facts: &FactSet) -> Option<String> {
    facts
        .ec2
        .as_ref()?
        .instance_id
        .clone()
        .filter(|id| !id.is_empty())
}

/// The uuid of a node from the SMBIOS source, if usable. Skips known bad
/// placeholder values that are not unique.
fn smbios_uuid(source: &impl UuidSource) -> Option<String> {
    if let Some(uuid) = source.system_uuid() {
        let uuid = uuid.trim_end().to_string();
        if !is_bogus(&uuid) {
            return Some(uuid);
        }
        warn!("unique_id from dmidecode is known bad: {uuid}");
    }

    // Older dmidecode has no -s support; scan the type-1 table instead.
    smbios_type1_uuid(source)
}

fn smbios_type1_uuid(source: &impl UuidSource) -> Option<String> {
    let table = source.smbios_type1()?;
    let mut found = None;
    for line in table.lines() {
        if let Some(value) = line.trim_start().strip_prefix("UUID: ") {
            let value = value.trim_end().to_string();
            if is_bogus(&value) {
                warn!("unique_id from dmidecode is known bad: {value}");
            } else {
                found = Some(value);
            }
        }
    }
    found
}

fn is_bogus(uuid: &str) -> bool {
    BOGUS_UUIDS.contains(&uuid)
}
