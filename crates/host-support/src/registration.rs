/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 Arsenal Project contributors. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Assembles the outbound registration payload and submits it to the
//! arsenal API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::client_config::ClientConfig;
use crate::facts::{Ec2Facts, FactSet, GuestVm, UNKNOWN};
use crate::interfaces::{InterfaceRecord, normalize_interfaces};
use crate::unique_id::{UuidSource, resolve_unique_id};

#[derive(thiserror::Error, Debug)]
pub enum RegistrationError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server rejected registration with status {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareProfile {
    pub manufacturer: String,
    pub model: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingSystem {
    pub name: String,
    pub variant: String,
    pub version_number: String,
    pub architecture: String,
    pub description: String,
}

/// The complete registration payload for one node. Built fresh from a
/// freshly gathered [`FactSet`] on every run, submitted once, discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    pub unique_id: String,
    pub hardware_profile: HardwareProfile,
    pub operating_system: OperatingSystem,
    pub ec2: Option<Ec2Facts>,
    pub uptime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor_count: Option<u32>,
    pub network_interfaces: Vec<InterfaceRecord>,
    pub guest_vms: Vec<GuestVm>,
}

/// Assemble the registration payload from gathered facts. A straight-line
/// copy apart from identity resolution and interface normalization.
pub fn build_node_record(facts: &FactSet, source: &impl UuidSource) -> NodeRecord {
    debug!("Collecting data for node.");

    let unique_id = resolve_unique_id(facts, source);
    let network_interfaces = normalize_interfaces(&facts.networking.interfaces, &unique_id);

    if facts.ec2.is_some() {
        debug!("This is an Ec2 instance.");
    }

    NodeRecord {
        name: facts.networking.fqdn.clone().unwrap_or_default(),
        unique_id,
        hardware_profile: hardware_profile(facts),
        operating_system: operating_system(facts),
        ec2: facts.ec2.clone(),
        uptime: facts.uptime.clone(),
        serial_number: facts.hardware.serial_number.clone(),
        processor_count: facts.processors.count,
        network_interfaces,
        guest_vms: facts.guest_vms.clone(),
    }
}

fn hardware_profile(facts: &FactSet) -> HardwareProfile {
    let hardware = &facts.hardware;
    if hardware.manufacturer.is_none() || hardware.product_name.is_none() {
        error!("Unable to determine hardware_profile.");
    }
    HardwareProfile {
        manufacturer: unknown_if_missing(&hardware.manufacturer),
        model: unknown_if_missing(&hardware.product_name),
        name: unknown_if_missing(&hardware.name),
    }
}

fn operating_system(facts: &FactSet) -> OperatingSystem {
    let os = &facts.os;
    if os.name.is_none() || os.variant.is_none() {
        error!("Unable to determine operating_system.");
    }
    OperatingSystem {
        name: unknown_if_missing(&os.name),
        variant: unknown_if_missing(&os.variant),
        version_number: unknown_if_missing(&os.version_number),
        architecture: unknown_if_missing(&os.architecture),
        description: unknown_if_missing(&os.description),
    }
}

fn unknown_if_missing(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| UNKNOWN.to_string())
}

/// Submit the registration payload with a PUT to `/api/nodes`. Any
/// non-success status is a registration failure; transient failures are
/// retried with a fixed backoff per the client config.
pub async fn register_node(
    config: &ClientConfig,
    record: &NodeRecord,
) -> Result<Value, RegistrationError> {
    let url = format!(
        "{}/api/nodes",
        config.arsenal_system.api_server.trim_end_matches('/')
    );
    let client = reqwest::Client::builder()
        .timeout(config.timeouts.http_timeout())
        .build()?;

    info!(
        "Registering node name: {} unique_id: {}",
        record.name, record.unique_id
    );

    tryhard::retry_fn(|| put_node(&client, &url, record))
        .retries(config.timeouts.register_retries)
        .fixed_backoff(config.timeouts.register_retry_delay())
        .await
}

async fn put_node(
    client: &reqwest::Client,
    url: &str,
    record: &NodeRecord,
) -> Result<Value, RegistrationError> {
    let response = client.put(url).json(record).send().await?;
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if !status.is_success() {
        return Err(RegistrationError::Rejected { status, body });
    }
    Ok(serde_json::from_str(&body).unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    use super::*;
    use crate::interfaces::InterfaceFacts;

    struct FixedUuid(Option<String>);

    impl UuidSource for FixedUuid {
        fn is_available(&self) -> bool {
            self.0.is_some()
        }

        fn system_uuid(&self) -> Option<String> {
            self.0.clone()
        }

        fn smbios_type1(&self) -> Option<String> {
            None
        }
    }

    fn switchports(switch: &str) -> BTreeMap<String, Value> {
        BTreeMap::from([
            ("port_description".to_string(), json!("UNKNOWN")),
            ("port_number".to_string(), json!("Ethernet23")),
            ("port_switch".to_string(), json!(switch)),
            ("port_vlan".to_string(), json!("960")),
        ])
    }

    /// A bonded dual-NIC server, mirroring the registration regression data.
    fn bonded_server_facts() -> FactSet {
        let mut facts = FactSet::default();
        facts.uptime = Some("1 day".to_string());
        facts.os = crate::facts::OsFacts {
            name: Some("CentOS 7.3.1611 x86_64".to_string()),
            variant: Some("CentOS".to_string()),
            version_number: Some("7.3.1611".to_string()),
            architecture: Some("x86_64".to_string()),
            description: Some("CentOS Linux release 7.3.1611 (Core)".to_string()),
            kernel: Some("Linux".to_string()),
        };
        facts.hardware.manufacturer = Some("HP".to_string());
        facts.hardware.product_name = Some("ProLiant DL360 Gen9".to_string());
        facts.hardware.name = Some("HP ProLiant DL360 Gen9".to_string());
        facts.hardware.serial_number = Some("987654321-1".to_string());
        facts.processors.count = Some(40);
        facts.networking.fqdn = Some("server0001.internal".to_string());
        facts.networking.mac_address = Some("5c:b9:01:90:5d:dc".to_string());
        facts.networking.interfaces = BTreeMap::from([
            (
                "bond0".to_string(),
                InterfaceFacts {
                    ip_address: Some("10.1.1.21".to_string()),
                    ..InterfaceFacts::default()
                },
            ),
            (
                "eth0".to_string(),
                InterfaceFacts {
                    unique_id: Some("5c:b9:01:90:5d:dc".to_string()),
                    bond_master: Some("bond0".to_string()),
                    extra: switchports("switch-1.dc1"),
                    ..InterfaceFacts::default()
                },
            ),
            (
                "eth1".to_string(),
                InterfaceFacts {
                    unique_id: Some("5c:b9:01:90:5d:dd".to_string()),
                    bond_master: Some("bond0".to_string()),
                    extra: switchports("switch-2.dc1"),
                    ..InterfaceFacts::default()
                },
            ),
        ]);
        facts
    }

    #[test]
    fn bonded_server_record_reconciles_interfaces() {
        let facts = bonded_server_facts();
        let record = build_node_record(&facts, &FixedUuid(Some("123456789-1".to_string())));

        assert_eq!(record.unique_id, "123456789-1");
        assert_eq!(record.name, "server0001.internal");

        let bond0 = record
            .network_interfaces
            .iter()
            .find(|r| r.name == "bond0")
            .unwrap();
        assert_eq!(bond0.unique_id, "bond0_123456789-1");
        assert_eq!(bond0.ip_address.as_deref(), Some("10.1.1.21"));

        for slave in ["eth0", "eth1"] {
            let record = record
                .network_interfaces
                .iter()
                .find(|r| r.name == slave)
                .unwrap();
            assert!(record.unique_id.starts_with("5c:b9:01:90:5d:"));
            assert_eq!(record.ip_address.as_deref(), Some("10.1.1.21"));
        }
    }

    #[test]
    fn bonded_server_payload_shape() {
        let facts = bonded_server_facts();
        let record = build_node_record(&facts, &FixedUuid(Some("123456789-1".to_string())));

        assert_json_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "name": "server0001.internal",
                "unique_id": "123456789-1",
                "hardware_profile": {
                    "manufacturer": "HP",
                    "model": "ProLiant DL360 Gen9",
                    "name": "HP ProLiant DL360 Gen9"
                },
                "operating_system": {
                    "name": "CentOS 7.3.1611 x86_64",
                    "variant": "CentOS",
                    "version_number": "7.3.1611",
                    "architecture": "x86_64",
                    "description": "CentOS Linux release 7.3.1611 (Core)"
                },
                "ec2": null,
                "uptime": "1 day",
                "serial_number": "987654321-1",
                "processor_count": 40,
                "network_interfaces": [
                    {
                        "name": "bond0",
                        "unique_id": "bond0_123456789-1",
                        "ip_address": "10.1.1.21"
                    },
                    {
                        "name": "eth0",
                        "unique_id": "5c:b9:01:90:5d:dc",
                        "ip_address": "10.1.1.21",
                        "bond_master": "bond0",
                        "port_description": "UNKNOWN",
                        "port_number": "Ethernet23",
                        "port_switch": "switch-1.dc1",
                        "port_vlan": "960"
                    },
                    {
                        "name": "eth1",
                        "unique_id": "5c:b9:01:90:5d:dd",
                        "ip_address": "10.1.1.21",
                        "bond_master": "bond0",
                        "port_description": "UNKNOWN",
                        "port_number": "Ethernet23",
                        "port_switch": "switch-2.dc1",
                        "port_vlan": "960"
                    }
                ],
                "guest_vms": []
            })
        );
    }

    #[test]
    fn missing_hardware_facts_become_unknown() {
        let mut facts = bonded_server_facts();
        facts.hardware.manufacturer = None;
        facts.hardware.product_name = None;
        facts.hardware.name = None;

        let record = build_node_record(&facts, &FixedUuid(None));
        assert_eq!(record.hardware_profile.manufacturer, UNKNOWN);
        assert_eq!(record.hardware_profile.model, UNKNOWN);
        assert_eq!(record.hardware_profile.name, UNKNOWN);
    }

    #[tokio::test]
    async fn register_puts_payload_to_api_nodes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/nodes")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_body(r#"{"status": "ok"}"#)
            .create_async()
            .await;

        let mut config = ClientConfig::default();
        config.arsenal_system.api_server = server.url();
        config.timeouts.register_retries = 0;

        let facts = bonded_server_facts();
        let record = build_node_record(&facts, &FixedUuid(Some("123456789-1".to_string())));
        let response = register_node(&config, &record).await.unwrap();

        assert_eq!(response["status"], "ok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_a_registration_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("PUT", "/api/nodes")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let mut config = ClientConfig::default();
        config.arsenal_system.api_server = server.url();
        config.timeouts.register_retries = 0;
        config.timeouts.register_retry_secs = 0;

        let facts = bonded_server_facts();
        let record = build_node_record(&facts, &FixedUuid(None));
        let err = register_node(&config, &record).await.unwrap_err();

        match err {
            RegistrationError::Rejected { status, body } => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
