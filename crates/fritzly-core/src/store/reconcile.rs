// ── Reconciliation ──
//
// Applies one inventory snapshot to the registry: add new devices,
// update known ones in place, tear down the ones that vanished. New
// devices are announced before any removal happens; refresh hooks of a
// cycle run concurrently and the cycle ends when all of them finish.

use std::sync::Arc;

use fritzly_api::Inventory;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info};

use super::registry::{Applied, Registry};
use crate::hooks::{DeviceHandler, DiscoveryHook};
use crate::model::{Ain, DeviceCategory};
use crate::validate::{classify, parse_record};

/// What one poll cycle did to the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub added: Vec<Ain>,
    pub updated: Vec<Ain>,
    pub removed: Vec<Ain>,
    /// Devices whose data failed validation this cycle.
    pub rejected: Vec<Ain>,
}

impl CycleReport {
    pub fn is_quiet(&self) -> bool {
        self.added.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
            && self.rejected.is_empty()
    }
}

/// Apply `inventory` to `registry`, invoking host hooks along the way.
pub async fn reconcile(
    registry: &Arc<Registry>,
    inventory: &Inventory,
    hook: &dyn DiscoveryHook,
) -> CycleReport {
    let mut report = CycleReport::default();
    let mut discovered: [(DeviceCategory, Vec<Ain>); 2] = [
        (DeviceCategory::Switch, Vec::new()),
        (DeviceCategory::Thermostat, Vec::new()),
    ];
    let mut refresh: Vec<Arc<dyn DeviceHandler>> = Vec::new();

    // ── Additions and updates ────────────────────────────────────────
    for (key, raw) in &inventory.devices {
        let ain = Ain::from(key.as_str());

        let Some(category) = registry.category(key) else {
            let category = classify(raw);
            match parse_record(raw, category) {
                Ok(record) => {
                    debug!(%ain, %category, "new device");
                    registry.insert(record);
                    if let Some((_, batch)) = discovered.iter_mut().find(|(c, _)| *c == category) {
                        batch.push(ain.clone());
                    }
                    report.added.push(ain);
                }
                Err(e) => {
                    error!(%ain, %category, error = %e, "new device failed validation, retrying next poll");
                    report.rejected.push(ain);
                }
            }
            continue;
        };

        match parse_record(raw, category) {
            Ok(record) => {
                if let Applied::Changed(handler) = registry.apply(record) {
                    refresh.extend(handler);
                    report.updated.push(ain);
                }
            }
            Err(e) => {
                error!(%ain, %category, error = %e, "device failed validation, keeping cached state");
                registry.mark_stale(key);
                report.rejected.push(ain);
            }
        }
    }

    for (category, ains) in &discovered {
        if !ains.is_empty() {
            info!(%category, count = ains.len(), "devices discovered");
            hook.devices_discovered(*category, ains, registry);
        }
    }

    // ── Removals ─────────────────────────────────────────────────────
    for ain in registry.ains() {
        if inventory.devices.contains_key(ain.as_str()) {
            continue;
        }
        if let Some(handler) = registry.handler(ain.as_str()) {
            handler.teardown();
        }
        registry.remove(ain.as_str());
        info!(%ain, "device removed");
        report.removed.push(ain);
    }

    // ── Refresh hooks ────────────────────────────────────────────────
    join_all(refresh.iter().map(|handler| handler.state_changed())).await;

    debug!(
        added = report.added.len(),
        updated = report.updated.len(),
        removed = report.removed.len(),
        rejected = report.rejected.len(),
        "reconcile complete"
    );
    report
}
