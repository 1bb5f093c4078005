use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The inventory tables exposed as tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
#[schemars(inline)]
pub enum TableName {
    Devices,
    Interfaces,
    Routes,
    Vlans,
    BgpNeighbors,
    Sites,
    Vendors,
}

const DEVICE_COLUMNS: &[&str] = &[
    "id",
    "sn",
    "hostname",
    "siteName",
    "vendor",
    "family",
    "platform",
    "model",
    "version",
    "devType",
    "loginIp",
    "loginType",
    "uptime",
    "reload",
    "memoryUtilization",
    "snHw",
    "mac",
    "image",
    "processor",
    "fqdn",
    "domain",
    "stpDomain",
    "rd",
    "configReg",
    "objectId",
    "taskKey",
];

const INTERFACE_COLUMNS: &[&str] = &[
    "id",
    "sn",
    "hostname",
    "siteName",
    "intName",
    "nameOriginal",
    "dscr",
    "l1",
    "l2",
    "reason",
    "mac",
    "duplex",
    "speed",
    "speedValue",
    "speedType",
    "media",
    "errDisabled",
    "mtu",
    "primaryIp",
    "hasTransceiver",
    "transceiverType",
];

const ROUTE_COLUMNS: &[&str] = &[
    "id",
    "sn",
    "hostname",
    "siteName",
    "vrf",
    "network",
    "prefix",
    "protocol",
    "nhCount",
    "nhLowestAge",
    "nhLongestAge",
    "nexthop",
];

const VLAN_COLUMNS: &[&str] =
    &["id", "sn", "hostname", "siteName", "vlanId", "vlanName", "dscr", "status", "stdStatus"];

const BGP_NEIGHBOR_COLUMNS: &[&str] = &[
    "id",
    "sn",
    "hostname",
    "siteName",
    "vrf",
    "localAs",
    "localAddress",
    "localRid",
    "neiAs",
    "neiAddress",
    "neiRid",
    "state",
    "bgpUptime",
    "totalReceivedPrefixes",
    "totalSentPrefixes",
];

const SITE_COLUMNS: &[&str] = &[
    "id",
    "siteName",
    "siteUid",
    "devicesCount",
    "routersCount",
    "switchesCount",
    "networksCount",
    "usersCount",
    "vlanCount",
    "rDCount",
    "stpDCount",
];

const VENDOR_COLUMNS: &[&str] = &["id", "vendor", "devicesCount", "platformsCount", "modelsCount"];

impl TableName {
    pub const ALL: [TableName; 7] = [
        TableName::Devices,
        TableName::Interfaces,
        TableName::Routes,
        TableName::Vlans,
        TableName::BgpNeighbors,
        TableName::Sites,
        TableName::Vendors,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Devices => "devices",
            Self::Interfaces => "interfaces",
            Self::Routes => "routes",
            Self::Vlans => "vlans",
            Self::BgpNeighbors => "bgp_neighbors",
            Self::Sites => "sites",
            Self::Vendors => "vendors",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|table| table.as_str() == raw.trim())
    }

    /// Name of the per-table fetch tool.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::Devices => "ipf_get_devices",
            Self::Interfaces => "ipf_get_interfaces",
            Self::Routes => "ipf_get_routing_table",
            Self::Vlans => "ipf_get_vlans",
            Self::BgpNeighbors => "ipf_get_bgp_neighbors",
            Self::Sites => "ipf_get_sites",
            Self::Vendors => "ipf_get_vendors",
        }
    }

    /// Table endpoint relative to the versioned API root.
    pub fn api_path(&self) -> &'static str {
        match self {
            Self::Devices => "tables/inventory/devices",
            Self::Interfaces => "tables/inventory/interfaces",
            Self::Routes => "tables/networks/routes",
            Self::Vlans => "tables/vlan/device",
            Self::BgpNeighbors => "tables/routing/protocols/bgp/neighbors",
            Self::Sites => "tables/inventory/sites",
            Self::Vendors => "tables/inventory/summary/vendors",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Devices => "network devices",
            Self::Interfaces => "network interfaces",
            Self::Routes => "routing table entries",
            Self::Vlans => "VLANs configured on devices",
            Self::BgpNeighbors => "BGP neighbors",
            Self::Sites => "sites",
            Self::Vendors => "vendor summary",
        }
    }

    /// Example filter and column hints shown in tool descriptions.
    pub fn examples(&self) -> (&'static str, &'static str) {
        match self {
            Self::Devices => (r#"{"vendor": ["eq", "cisco"]}"#, r#"["hostname", "siteName"]"#),
            Self::Interfaces => (r#"{"l1": ["eq", "down"]}"#, r#"["hostname", "intName", "l1"]"#),
            Self::Routes => {
                (r#"{"protocol": ["eq", "ospf"]}"#, r#"["hostname", "network", "protocol"]"#)
            }
            Self::Vlans => (r#"{"vlanId": ["eq", 10]}"#, r#"["hostname", "vlanId", "vlanName"]"#),
            Self::BgpNeighbors => {
                (r#"{"state": ["neq", "established"]}"#, r#"["hostname", "neiAddress", "state"]"#)
            }
            Self::Sites => (r#"{"siteName": ["like", "dc"]}"#, r#"["siteName", "devicesCount"]"#),
            Self::Vendors => (r#"{"vendor": ["reg", "(cisco|arista)"]}"#, r#"["vendor", "devicesCount"]"#),
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::Devices => DEVICE_COLUMNS,
            Self::Interfaces => INTERFACE_COLUMNS,
            Self::Routes => ROUTE_COLUMNS,
            Self::Vlans => VLAN_COLUMNS,
            Self::BgpNeighbors => BGP_NEIGHBOR_COLUMNS,
            Self::Sites => SITE_COLUMNS,
            Self::Vendors => VENDOR_COLUMNS,
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns().contains(&column)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::TableName;

    #[test]
    fn tags_round_trip_through_parse() {
        for table in TableName::ALL {
            assert_eq!(TableName::parse(table.as_str()), Some(table));
        }
        assert_eq!(TableName::parse("arp"), None);
    }

    #[test]
    fn tool_names_and_paths_are_unique() {
        let tools: HashSet<_> = TableName::ALL.iter().map(TableName::tool_name).collect();
        let paths: HashSet<_> = TableName::ALL.iter().map(TableName::api_path).collect();
        assert_eq!(tools.len(), TableName::ALL.len());
        assert_eq!(paths.len(), TableName::ALL.len());
    }

    #[test]
    fn every_catalog_has_unique_columns_and_an_id() {
        for table in TableName::ALL {
            let columns = table.columns();
            let unique: HashSet<_> = columns.iter().collect();
            assert_eq!(unique.len(), columns.len(), "duplicate column in {table}");
            assert!(table.has_column("id"), "{table} catalog should expose id");
        }
        assert!(TableName::Devices.has_column("vendor"));
        assert!(!TableName::Devices.has_column("intName"));
    }

    #[test]
    fn serde_uses_snake_case_tags() {
        let value = serde_json::to_value(TableName::BgpNeighbors).expect("serialize");
        assert_eq!(value, serde_json::json!("bgp_neighbors"));
        let parsed: TableName = serde_json::from_value(serde_json::json!("routes")).expect("parse");
        assert_eq!(parsed, TableName::Routes);
    }
}
