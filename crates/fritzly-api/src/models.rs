// Raw XML response types
//
// Leaf values are kept as strings exactly as the gateway sent them.
// Shape checks and conversion to typed records happen in `fritzly-core`,
// so a single malformed device never fails the whole document.

use std::collections::BTreeMap;

use serde::Deserialize;

// ── login_sid.lua ───────────────────────────────────────────────────

/// Response of `login_sid.lua`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    #[serde(rename = "SID")]
    pub sid: String,
    #[serde(rename = "Challenge", default)]
    pub challenge: String,
    #[serde(rename = "BlockTime", default)]
    pub block_time: u64,
    #[serde(rename = "Rights", default)]
    pub rights: RightsList,
}

/// The `<Rights>` subtree: alternating `<Name>` / `<Access>` siblings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RightsList {
    #[serde(rename = "$value", default)]
    pub entries: Vec<RightEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub enum RightEntry {
    Name(String),
    Access(u8),
}

impl RightsList {
    /// Pair every `<Name>` with the `<Access>` that follows it.
    pub fn to_map(&self) -> BTreeMap<String, u8> {
        let mut rights = BTreeMap::new();
        let mut pending: Option<&str> = None;
        for entry in &self.entries {
            match entry {
                RightEntry::Name(name) => pending = Some(name.as_str()),
                RightEntry::Access(level) => {
                    if let Some(name) = pending.take() {
                        rights.insert(name.to_owned(), *level);
                    }
                }
            }
        }
        rights
    }
}

// ── getdevicelistinfos ──────────────────────────────────────────────

/// Top-level `<devicelist>` element. Devices and groups may interleave.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceListDocument {
    #[serde(rename = "$value", default)]
    pub entries: Vec<DeviceListEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub enum DeviceListEntry {
    #[serde(rename = "device")]
    Device(RawDevice),
    #[serde(rename = "group")]
    Group(RawGroup),
}

/// A single `<device>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawDevice {
    #[serde(rename = "@identifier")]
    pub identifier: Option<String>,
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(rename = "@functionbitmask")]
    pub function_bitmask: Option<String>,
    #[serde(rename = "@fwversion")]
    pub fw_version: Option<String>,
    #[serde(rename = "@manufacturer")]
    pub manufacturer: Option<String>,
    #[serde(rename = "@productname")]
    pub product_name: Option<String>,
    pub present: Option<String>,
    pub name: Option<String>,
    pub switch: Option<RawSwitch>,
    pub powermeter: Option<RawPowerMeter>,
    pub temperature: Option<RawTemperature>,
    pub hkr: Option<RawHkr>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawSwitch {
    pub state: Option<String>,
    pub mode: Option<String>,
    pub lock: Option<String>,
    pub devicelock: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawPowerMeter {
    pub power: Option<String>,
    pub energy: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawTemperature {
    pub celsius: Option<String>,
    pub offset: Option<String>,
}

/// Radiator controller (`<hkr>`) values, in half-degree units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawHkr {
    pub tist: Option<String>,
    pub tsoll: Option<String>,
    pub absenk: Option<String>,
    pub komfort: Option<String>,
    pub lock: Option<String>,
    pub devicelock: Option<String>,
    pub errorcode: Option<String>,
    pub batterylow: Option<String>,
    pub nextchange: Option<RawNextChange>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawNextChange {
    pub endperiod: Option<String>,
    pub tchange: Option<String>,
}

/// A `<group>` element. Groups are parsed but not acted upon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawGroup {
    #[serde(rename = "@identifier")]
    pub identifier: Option<String>,
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(rename = "@functionbitmask")]
    pub function_bitmask: Option<String>,
    pub present: Option<String>,
    pub name: Option<String>,
    pub groupinfo: Option<RawGroupInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawGroupInfo {
    pub masterdeviceid: Option<String>,
    pub members: Option<String>,
}

impl RawGroup {
    /// Numeric device ids of the group members.
    pub fn member_ids(&self) -> Vec<u32> {
        self.groupinfo
            .as_ref()
            .and_then(|info| info.members.as_deref())
            .map(|members| {
                members
                    .split(',')
                    .filter_map(|m| m.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rights_pair_names_with_access() {
        let xml = "<SessionInfo><SID>ff88e4d39354992f</SID><Challenge>ab7190d6</Challenge>\
                   <BlockTime>0</BlockTime><Rights><Name>BoxAdmin</Name><Access>2</Access>\
                   <Name>Phone</Name><Access>1</Access><Name>HomeAuto</Name><Access>2</Access>\
                   </Rights></SessionInfo>";
        let info: SessionInfo = quick_xml::de::from_str(xml).unwrap();
        let rights = info.rights.to_map();

        assert_eq!(info.sid, "ff88e4d39354992f");
        assert_eq!(rights.len(), 3);
        assert_eq!(rights.get("Phone"), Some(&1));
        assert_eq!(rights.get("HomeAuto"), Some(&2));
    }

    #[test]
    fn empty_rights_element() {
        let xml = "<SessionInfo><SID>0000000000000000</SID><Challenge>1234567z</Challenge>\
                   <BlockTime>12</BlockTime><Rights></Rights></SessionInfo>";
        let info: SessionInfo = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(info.block_time, 12);
        assert!(info.rights.to_map().is_empty());
    }

    #[test]
    fn group_members_parse() {
        let group = RawGroup {
            groupinfo: Some(RawGroupInfo {
                masterdeviceid: Some("0".into()),
                members: Some("17, 18,x".into()),
            }),
            ..RawGroup::default()
        };
        assert_eq!(group.member_ids(), vec![17, 18]);
    }
}
