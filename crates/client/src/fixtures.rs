//! Demo dataset: two loaded snapshots a month apart and one unloaded capture.

use chrono::{TimeZone, Utc};
use ipf_core::{Row, SnapshotState, SnapshotSummary, TableName};
use serde_json::{json, Value};

use crate::memory::InMemoryBackend;

pub const JANUARY_SNAPSHOT: &str = "2024-01-01T00:00:00Z";
pub const FEBRUARY_SNAPSHOT: &str = "2024-02-01T00:00:00Z";
pub const ARCHIVED_SNAPSHOT: &str = "2023-12-01T00:00:00Z";

fn snapshot(
    id: &str,
    name: &str,
    state: SnapshotState,
    month: u32,
    year: i32,
    locked: bool,
) -> SnapshotSummary {
    let mut summary = SnapshotSummary::new(id, state);
    summary.name = Some(name.to_string());
    summary.status = Some("done".to_string());
    summary.locked = locked;
    summary.device_count = Some(3);
    summary.started_at = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single();
    summary.finished_at = Utc.with_ymd_and_hms(year, month, 1, 0, 45, 0).single();
    summary
}

fn rows(value: Value) -> Vec<Row> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn devices_january() -> Vec<Row> {
    rows(json!([
        { "id": "d1", "sn": "FOC1001", "hostname": "dc1-core-sw01", "siteName": "DC1", "vendor": "cisco",
          "family": "nx-os", "platform": "n9k", "model": "N9K-C93180YC", "version": "9.3(8)", "devType": "switch",
          "loginIp": "10.0.0.1" },
        { "id": "d2", "sn": "FOC1002", "hostname": "dc1-edge-rtr01", "siteName": "DC1", "vendor": "cisco",
          "family": "ios-xe", "platform": "asr1k", "model": "ASR1001-X", "version": "17.3.4", "devType": "router",
          "loginIp": "10.0.0.2" },
        { "id": "d3", "sn": "JPE2003", "hostname": "branch-leaf01", "siteName": "BR1", "vendor": "arista",
          "family": "eos", "platform": "7050", "model": "DCS-7050SX3", "version": "4.28.3M", "devType": "switch",
          "loginIp": "10.1.0.1" },
    ]))
}

fn devices_february() -> Vec<Row> {
    rows(json!([
        { "id": "d1", "sn": "FOC1001", "hostname": "dc1-core-sw01", "siteName": "DC1", "vendor": "cisco",
          "family": "nx-os", "platform": "n9k", "model": "N9K-C93180YC", "version": "10.2(5)", "devType": "switch",
          "loginIp": "10.0.0.1" },
        { "id": "d3", "sn": "JPE2003", "hostname": "branch-leaf01", "siteName": "BR1", "vendor": "arista",
          "family": "eos", "platform": "7050", "model": "DCS-7050SX3", "version": "4.28.3M", "devType": "switch",
          "loginIp": "10.1.0.1" },
        { "id": "d4", "sn": "JN4004", "hostname": "dc1-fw01", "siteName": "DC1", "vendor": "juniper",
          "family": "junos", "platform": "srx", "model": "SRX1500", "version": "21.4R3", "devType": "fw",
          "loginIp": "10.0.0.4" },
    ]))
}

fn interfaces_january() -> Vec<Row> {
    rows(json!([
        { "id": "i1", "hostname": "dc1-core-sw01", "siteName": "DC1", "intName": "Eth1/1", "l1": "up", "l2": "up",
          "speed": "10G", "mtu": 9216, "primaryIp": "10.10.0.1" },
        { "id": "i2", "hostname": "dc1-core-sw01", "siteName": "DC1", "intName": "Eth1/2", "l1": "down",
          "l2": "down", "reason": "admin", "speed": "10G", "mtu": 9216 },
        { "id": "i3", "hostname": "branch-leaf01", "siteName": "BR1", "intName": "Ethernet1", "l1": "up",
          "l2": "up", "speed": "10G", "mtu": 1500 },
    ]))
}

fn routes_january() -> Vec<Row> {
    rows(json!([
        { "id": "r1", "hostname": "dc1-edge-rtr01", "siteName": "DC1", "vrf": "", "network": "0.0.0.0/0",
          "prefix": 0, "protocol": "bgp", "nhCount": 1 },
        { "id": "r2", "hostname": "dc1-core-sw01", "siteName": "DC1", "vrf": "", "network": "10.1.0.0/16",
          "prefix": 16, "protocol": "ospf", "nhCount": 2 },
    ]))
}

fn vlans_january() -> Vec<Row> {
    rows(json!([
        { "id": "v1", "hostname": "dc1-core-sw01", "siteName": "DC1", "vlanId": 10, "vlanName": "users", "status": "active" },
        { "id": "v2", "hostname": "dc1-core-sw01", "siteName": "DC1", "vlanId": 20, "vlanName": "voice", "status": "active" },
        { "id": "v3", "hostname": "branch-leaf01", "siteName": "BR1", "vlanId": 10, "vlanName": "users", "status": "active" },
    ]))
}

fn bgp_january() -> Vec<Row> {
    rows(json!([
        { "id": "b1", "hostname": "dc1-edge-rtr01", "siteName": "DC1", "vrf": "", "localAs": 65001,
          "neiAddress": "192.0.2.1", "neiAs": 64512, "state": "established", "totalReceivedPrefixes": 900000 },
        { "id": "b2", "hostname": "dc1-edge-rtr01", "siteName": "DC1", "vrf": "", "localAs": 65001,
          "neiAddress": "198.51.100.1", "neiAs": 64513, "state": "idle", "totalReceivedPrefixes": 0 },
    ]))
}

fn sites_january() -> Vec<Row> {
    rows(json!([
        { "id": "s1", "siteName": "DC1", "devicesCount": 2, "routersCount": 1, "switchesCount": 1 },
        { "id": "s2", "siteName": "BR1", "devicesCount": 1, "routersCount": 0, "switchesCount": 1 },
    ]))
}

fn vendors_january() -> Vec<Row> {
    rows(json!([
        { "id": "ven1", "vendor": "cisco", "devicesCount": 2, "platformsCount": 2, "modelsCount": 2 },
        { "id": "ven2", "vendor": "arista", "devicesCount": 1, "platformsCount": 1, "modelsCount": 1 },
    ]))
}

/// In-memory backend preloaded with the demo dataset.
pub fn demo_backend() -> InMemoryBackend {
    InMemoryBackend::new()
        .with_snapshot(snapshot(ARCHIVED_SNAPSHOT, "december", SnapshotState::Unloaded, 12, 2023, false))
        .with_snapshot(snapshot(JANUARY_SNAPSHOT, "january baseline", SnapshotState::Loaded, 1, 2024, true))
        .with_snapshot(snapshot(FEBRUARY_SNAPSHOT, "february", SnapshotState::Loaded, 2, 2024, false))
        .with_rows(JANUARY_SNAPSHOT, TableName::Devices, devices_january())
        .with_rows(JANUARY_SNAPSHOT, TableName::Interfaces, interfaces_january())
        .with_rows(JANUARY_SNAPSHOT, TableName::Routes, routes_january())
        .with_rows(JANUARY_SNAPSHOT, TableName::Vlans, vlans_january())
        .with_rows(JANUARY_SNAPSHOT, TableName::BgpNeighbors, bgp_january())
        .with_rows(JANUARY_SNAPSHOT, TableName::Sites, sites_january())
        .with_rows(JANUARY_SNAPSHOT, TableName::Vendors, vendors_january())
        .with_rows(FEBRUARY_SNAPSHOT, TableName::Devices, devices_february())
        .with_rows(FEBRUARY_SNAPSHOT, TableName::Interfaces, interfaces_january())
}

#[cfg(test)]
mod tests {
    use ipf_core::TableName;

    use super::{demo_backend, FEBRUARY_SNAPSHOT, JANUARY_SNAPSHOT};
    use crate::backend::IpfBackend;

    #[tokio::test]
    async fn latest_loaded_snapshot_is_february() {
        let catalog = demo_backend().list_snapshots().await.expect("snapshots");
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.latest_loaded().map(|s| s.id.as_str()), Some(FEBRUARY_SNAPSHOT));
        assert_eq!(catalog.resolve("$prev").map(|s| s.id.as_str()), Some(JANUARY_SNAPSHOT));
        assert_eq!(catalog.resolve("$lastLocked").map(|s| s.id.as_str()), Some(JANUARY_SNAPSHOT));
    }

    #[test]
    fn demo_rows_only_use_catalogued_columns() {
        let rows = [
            (TableName::Devices, super::devices_january()),
            (TableName::Devices, super::devices_february()),
            (TableName::Interfaces, super::interfaces_january()),
            (TableName::Routes, super::routes_january()),
            (TableName::Vlans, super::vlans_january()),
            (TableName::BgpNeighbors, super::bgp_january()),
            (TableName::Sites, super::sites_january()),
            (TableName::Vendors, super::vendors_january()),
        ];
        for (table, rows) in rows {
            assert!(!rows.is_empty(), "{table} fixture should not be empty");
            for row in rows {
                for column in row.keys() {
                    assert!(table.has_column(column), "{table} has no column {column}");
                }
            }
        }
    }
}
