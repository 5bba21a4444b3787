/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 Arsenal Project contributors. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Network interface normalization: give every interface a stable unique_id
//! and reconcile bonded interfaces with their slaves.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Interfaces whose reported MAC is borrowed from whichever slave is
/// currently active, and therefore never usable as an identity.
const SYNTHESIZED_ID_PREFIXES: &[&str] = &["bond", "br"];

/// Raw attributes reported for one interface by the fact source.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceFacts {
    /// MAC-derived id; absent for interfaces without a hardware MAC of
    /// their own (bond, sit, tun, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bond_master: Option<String>,
    /// Anything else (port_description, port_number, port_switch,
    /// port_vlan, ...) passes through to the server unchanged.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One normalized interface in the outbound registration payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    pub name: String,
    pub unique_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bond_master: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn needs_synthesized_id(name: &str) -> bool {
    SYNTHESIZED_ID_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

fn synthesized_id(name: &str, node_unique_id: &str) -> String {
    format!("{name}_{node_unique_id}")
}

/// Normalize the raw interface map into the outbound record list.
///
/// Bond and bridge interfaces always get a synthesized id, even when a
/// MAC-derived one was reported. Slaves that name a `bond_master` inherit
/// the master's IP address, since only the aggregate interface reliably
/// carries the assigned IP; a master that is missing from the map, or has
/// no IP, is silently skipped.
pub fn normalize_interfaces(
    raw: &BTreeMap<String, InterfaceFacts>,
    node_unique_id: &str,
) -> Vec<InterfaceRecord> {
    let mut records = Vec::with_capacity(raw.len());

    for (name, attrs) in raw {
        let record = if attrs.unique_id.is_none() || needs_synthesized_id(name) {
            let unique_id = synthesized_id(name, node_unique_id);
            debug!("Synthesized unique_id for interface {name}: {unique_id}");
            InterfaceRecord {
                name: name.clone(),
                unique_id,
                ip_address: attrs.ip_address.clone(),
                bond_master: attrs.bond_master.clone(),
                extra: attrs.extra.clone(),
            }
        } else {
            let mut ip_address = attrs.ip_address.clone();
            if let Some(master) = attrs.bond_master.as_deref() {
                // Set the bond IP on its slaves too.
                match raw.get(master).and_then(|m| m.ip_address.clone()) {
                    Some(master_ip) => ip_address = Some(master_ip),
                    None => debug!("No ip_address to inherit from bond master {master}"),
                }
            }
            InterfaceRecord {
                name: name.clone(),
                unique_id: attrs.unique_id.clone().unwrap_or_default(),
                ip_address,
                bond_master: attrs.bond_master.clone(),
                extra: attrs.extra.clone(),
            }
        };
        records.push(record);
    }

    if utils::has_duplicates(records.iter().map(|record| &record.unique_id)) {
        warn!("Duplicate interface unique_ids in registration payload");
    }

    records
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw_with(entries: &[(&str, InterfaceFacts)]) -> BTreeMap<String, InterfaceFacts> {
        entries
            .iter()
            .map(|(name, attrs)| (name.to_string(), attrs.clone()))
            .collect()
    }

    #[test]
    fn bond_interface_gets_synthesized_id_even_with_mac() {
        let raw = raw_with(&[(
            "bond0",
            InterfaceFacts {
                unique_id: Some("aa:bb:cc:dd:ee:ff".to_string()),
                ip_address: Some("10.0.0.5".to_string()),
                ..InterfaceFacts::default()
            },
        )]);

        let records = normalize_interfaces(&raw, "NODE123");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].unique_id, "bond0_NODE123");
        assert_eq!(records[0].ip_address.as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn bridge_interface_gets_synthesized_id() {
        let raw = raw_with(&[(
            "br0",
            InterfaceFacts {
                unique_id: Some("aa:bb:cc:dd:ee:ff".to_string()),
                ..InterfaceFacts::default()
            },
        )]);

        let records = normalize_interfaces(&raw, "NODE123");
        assert_eq!(records[0].unique_id, "br0_NODE123");
    }

    #[test]
    fn interface_without_mac_gets_synthesized_id() {
        let raw = raw_with(&[("sit0", InterfaceFacts::default())]);

        let records = normalize_interfaces(&raw, "NODE123");
        assert_eq!(records[0].unique_id, "sit0_NODE123");
    }

    #[test]
    fn slave_inherits_bond_ip() {
        let raw = raw_with(&[
            (
                "bond0",
                InterfaceFacts {
                    ip_address: Some("10.0.0.5".to_string()),
                    ..InterfaceFacts::default()
                },
            ),
            (
                "eth0",
                InterfaceFacts {
                    unique_id: Some("5c:b9:01:90:5d:dc".to_string()),
                    bond_master: Some("bond0".to_string()),
                    ..InterfaceFacts::default()
                },
            ),
        ]);

        let records = normalize_interfaces(&raw, "NODE123");
        let eth0 = records.iter().find(|r| r.name == "eth0").unwrap();
        assert_eq!(eth0.ip_address.as_deref(), Some("10.0.0.5"));
        assert_eq!(eth0.unique_id, "5c:b9:01:90:5d:dc");
    }

    #[test]
    fn missing_bond_master_is_tolerated() {
        let raw = raw_with(&[(
            "eth0",
            InterfaceFacts {
                unique_id: Some("5c:b9:01:90:5d:dc".to_string()),
                bond_master: Some("bond7".to_string()),
                ip_address: Some("10.0.0.9".to_string()),
                ..InterfaceFacts::default()
            },
        )]);

        let records = normalize_interfaces(&raw, "NODE123");
        // the copy is skipped, the interface's own address survives
        assert_eq!(records[0].ip_address.as_deref(), Some("10.0.0.9"));
    }

    #[test]
    fn switchport_attributes_survive_normalization() {
        let raw = raw_with(&[(
            "eth0",
            InterfaceFacts {
                unique_id: Some("5c:b9:01:90:5d:dc".to_string()),
                extra: BTreeMap::from([
                    ("port_switch".to_string(), json!("switch-1.dc1")),
                    ("port_vlan".to_string(), json!("960")),
                ]),
                ..InterfaceFacts::default()
            },
        )]);

        let records = normalize_interfaces(&raw, "NODE123");
        assert_eq!(records[0].extra["port_switch"], json!("switch-1.dc1"));
        assert_eq!(records[0].extra["port_vlan"], json!("960"));
    }

    #[test]
    fn output_order_is_reproducible() {
        let raw = raw_with(&[
            ("eth1", InterfaceFacts::default()),
            ("bond0", InterfaceFacts::default()),
            ("eth0", InterfaceFacts::default()),
        ]);

        let records = normalize_interfaces(&raw, "NODE123");
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["bond0", "eth0", "eth1"]);
    }
}
