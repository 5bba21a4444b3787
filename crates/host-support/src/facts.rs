/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 Arsenal Project contributors. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The arsenal fact model: a normalized view over whatever the local fact
//! source (facter) reports about a host.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::interfaces::InterfaceFacts;

/// Placeholder used wherever a required fact could not be determined.
pub const UNKNOWN: &str = "Unknown";

/// Interfaces we never collect: loopback (unnecessary) and veth (changes
/// every time a container is restarted).
const SKIP_INTERFACE_PREFIXES: &[&str] = &["lo", "veth"];

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactSet {
    pub uptime: Option<String>,
    pub ec2: Option<Ec2Facts>,
    #[serde(default)]
    pub hardware: HardwareFacts,
    #[serde(default)]
    pub networking: NetworkingFacts,
    #[serde(default)]
    pub os: OsFacts,
    #[serde(default)]
    pub processors: ProcessorFacts,
    #[serde(default)]
    pub memory: MemoryFacts,
    #[serde(default)]
    pub guest_vms: Vec<GuestVm>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareFacts {
    /// Composed profile name, `{manufacturer} {product_name}`.
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub product_name: Option<String>,
    /// Virtualization type as reported by the fact source ("physical",
    /// "kvm", "xen", ...).
    #[serde(rename = "virtual")]
    pub virtual_type: Option<String>,
    pub is_virtual: Option<bool>,
    pub serial_number: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkingFacts {
    pub fqdn: Option<String>,
    /// MAC address of the primary interface. The identity fallback of last
    /// resort.
    pub mac_address: Option<String>,
    #[serde(default)]
    pub interfaces: BTreeMap<String, InterfaceFacts>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsFacts {
    pub name: Option<String>,
    pub variant: Option<String>,
    pub version_number: Option<String>,
    pub architecture: Option<String>,
    pub description: Option<String>,
    pub kernel: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorFacts {
    pub count: Option<u32>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryFacts {
    #[serde(default)]
    pub system: MemorySystemFacts,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySystemFacts {
    pub total: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ec2Facts {
    pub account_id: Option<String>,
    pub ami_id: Option<String>,
    pub availability_zone: Option<String>,
    pub hostname: Option<String>,
    pub instance_id: Option<String>,
    pub instance_type: Option<String>,
    pub profile: Option<String>,
    pub reservation_id: Option<String>,
    pub security_groups: Option<String>,
}

/// One guest on a hypervisor, keyed by the guest's own unique_id (its MAC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestVm {
    pub name: String,
    pub unique_id: String,
}

impl FactSet {
    /// Map modern facter JSON output to arsenal facts. Pure; anything facter
    /// did not report stays `None` and is dealt with at record build time.
    pub fn from_facter_json(resp: &Value) -> Self {
        let mut facts = FactSet {
            uptime: string_at(resp, &["system_uptime", "uptime"]),
            ..FactSet::default()
        };

        let manufacturer = string_at(resp, &["dmi", "manufacturer"]);
        let product_name = string_at(resp, &["dmi", "product", "name"]);
        match (manufacturer, product_name) {
            (Some(manufacturer), Some(product_name)) => {
                facts.hardware.name = Some(format!("{manufacturer} {product_name}"));
                facts.hardware.manufacturer = Some(manufacturer);
                facts.hardware.product_name = Some(product_name);
                debug!("Hardware profile from dmi facts.");
            }
            _ => {
                // Xen guests expose no dmi product data at all.
                let virt = string_at(resp, &["virtual"]).unwrap_or_default();
                if virt.starts_with("xen") && bool_at(resp, &["is_virtual"]).unwrap_or(false) {
                    facts.hardware.manufacturer = Some("Citrix".to_string());
                    facts.hardware.product_name = Some("Xen Guest".to_string());
                    facts.hardware.name = Some("Citrix Xen Guest".to_string());
                    debug!("Hardware profile is virtual.");
                } else {
                    error!("Unable to determine hardware profile.");
                }
            }
        }
        facts.hardware.virtual_type = string_at(resp, &["virtual"]);
        facts.hardware.is_virtual = bool_at(resp, &["is_virtual"]);
        facts.hardware.serial_number = string_at(resp, &["dmi", "product", "serial_number"]);
        if facts.hardware.serial_number.is_none() {
            warn!("Unable to determine serial number.");
        }

        facts.networking.fqdn = string_at(resp, &["networking", "fqdn"]);
        facts.networking.mac_address = string_at(resp, &["networking", "mac"]);
        facts.networking.interfaces = map_network_interfaces(resp);

        let os_name = string_at(resp, &["os", "name"]);
        let release = string_at(resp, &["os", "distro", "release", "full"]);
        let architecture = string_at(resp, &["os", "architecture"]);
        match (os_name, release, architecture) {
            (Some(os_name), Some(release), Some(architecture)) => {
                facts.os.name = Some(format!("{os_name} {release} {architecture}"));
                facts.os.variant = Some(os_name);
                facts.os.version_number = Some(release);
                facts.os.architecture = Some(architecture);
                facts.os.description = string_at(resp, &["os", "distro", "description"]);
                facts.os.kernel = string_at(resp, &["kernel"]);
            }
            _ => error!("Unable to determine operating system."),
        }

        facts.memory.system.total = string_at(resp, &["memory", "system", "total"]);
        facts.processors.count = value_at(resp, &["processors", "count"])
            .and_then(Value::as_u64)
            .map(|count| count as u32);

        facts.ec2 = Ec2Facts::from_facter_json(resp);

        facts
    }
}

impl Ec2Facts {
    /// Facter exposes cloud metadata under `ec2_metadata` on EC2 instances
    /// only; anywhere else this returns `None`.
    fn from_facter_json(resp: &Value) -> Option<Self> {
        let Some(meta) = resp.get("ec2_metadata") else {
            debug!("ec2 facts not found, nothing to do.");
            return None;
        };

        Some(Ec2Facts {
            account_id: account_id_from(meta),
            ami_id: string_at(meta, &["ami-id"]),
            availability_zone: string_at(meta, &["placement", "availability-zone"]),
            hostname: string_at(meta, &["hostname"]),
            instance_id: string_at(meta, &["instance-id"]),
            instance_type: string_at(meta, &["instance-type"]),
            profile: string_at(meta, &["profile"]),
            reservation_id: string_at(meta, &["reservation-id"]),
            security_groups: string_at(meta, &["security-groups"])
                .map(|groups| groups.replace('\n', ",")),
        })
    }
}

// The value of this fact is a JSON document in string form for some reason.
fn account_id_from(meta: &Value) -> Option<String> {
    let info = string_at(meta, &["identity-credentials", "ec2", "info"])?;
    match serde_json::from_str::<Value>(&info) {
        Ok(info) => string_at(&info, &["AccountId"]),
        Err(e) => {
            debug!("Unable to parse ec2 identity credentials: {e}");
            None
        }
    }
}

fn map_network_interfaces(resp: &Value) -> BTreeMap<String, InterfaceFacts> {
    let mut results = BTreeMap::new();
    let Some(interfaces) =
        value_at(resp, &["networking", "interfaces"]).and_then(Value::as_object)
    else {
        return results;
    };

    for (name, attrs) in interfaces {
        if SKIP_INTERFACE_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix))
        {
            debug!("Skipping interface: {name}");
            continue;
        }
        debug!("Network interface found: {name}");

        let mut entry = InterfaceFacts {
            ip_address: attrs.get("ip").and_then(Value::as_str).map(str::to_string),
            ..InterfaceFacts::default()
        };

        // Switch port data comes from a custom fact keyed by interface name.
        if let Some(ports) = value_at(resp, &["int_switchports", name]).and_then(Value::as_object)
        {
            for (key, value) in ports {
                if key == "bond_master" {
                    entry.bond_master = value.as_str().map(str::to_string);
                } else {
                    entry.extra.insert(key.clone(), value.clone());
                }
            }
        }

        // Bonded interfaces get their unique_id synthesized during record
        // building; their reported MAC is borrowed from the active slave.
        if !name.starts_with("bond") {
            if let Some(mac) = attrs.get("mac").and_then(Value::as_str) {
                entry.unique_id = Some(mac.to_string());
            }
        }

        results.insert(name.clone(), entry);
    }

    results
}

fn value_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |acc, key| acc.get(key))
}

fn string_at(value: &Value, path: &[&str]) -> Option<String> {
    value_at(value, path)?.as_str().map(str::to_string)
}

fn bool_at(value: &Value, path: &[&str]) -> Option<bool> {
    value_at(value, path)?.as_bool()
}
