// Device inventory
//
// `getdevicelistinfos` returns every device and group known to the
// gateway. The document is split into two maps keyed by the stable
// `identifier` attribute (AIN), preserving document order.

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::client::{Params, SessionClient};
use crate::error::Error;
use crate::models::{DeviceListDocument, DeviceListEntry, RawDevice, RawGroup};

/// Parsed `getdevicelistinfos` response.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub devices: IndexMap<String, RawDevice>,
    /// Device groups. Parsed for completeness, not acted upon.
    pub groups: IndexMap<String, RawGroup>,
}

impl Inventory {
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty() && self.groups.is_empty()
    }
}

/// Parse a `<devicelist>` document.
///
/// Entries without an `identifier` attribute cannot be keyed and are
/// dropped with a warning.
pub fn parse_inventory(xml: &str) -> Result<Inventory, Error> {
    let doc: DeviceListDocument = quick_xml::de::from_str(xml).map_err(|e| Error::xml(&e, xml))?;

    let mut inventory = Inventory::default();
    for entry in doc.entries {
        match entry {
            DeviceListEntry::Device(device) => match device.identifier.clone() {
                Some(ain) => {
                    inventory.devices.insert(ain.trim().to_owned(), device);
                }
                None => warn!(id = ?device.id, "device without identifier skipped"),
            },
            DeviceListEntry::Group(group) => match group.identifier.clone() {
                Some(ain) => {
                    inventory.groups.insert(ain.trim().to_owned(), group);
                }
                None => warn!(id = ?group.id, "group without identifier skipped"),
            },
        }
    }
    Ok(inventory)
}

impl SessionClient {
    /// Fetch and parse the full device inventory.
    pub async fn fetch_inventory(&self) -> Result<Inventory, Error> {
        let body = self
            .send_command(Params::command("getdevicelistinfos"), None)
            .await?;
        let inventory = parse_inventory(&body)?;
        debug!(
            devices = inventory.devices.len(),
            groups = inventory.groups.len(),
            "inventory fetched"
        );
        Ok(inventory)
    }
}
