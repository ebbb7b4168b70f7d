// ── Device registry ──
//
// Concurrent ain -> entry storage with push-based change notification.
// The reconciler is the only writer of records and entry lifetimes; the
// command facade patches single fields after a successful write.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;

use crate::error::CoreError;
use crate::hooks::DeviceHandler;
use crate::model::{Ain, DeviceCategory, DeviceRecord};

/// One registered device.
#[derive(Clone)]
pub struct RegistryEntry {
    pub record: Arc<DeviceRecord>,
    /// Fixed at discovery. Later polls are validated against this shape.
    pub category: DeviceCategory,
    pub handler: Option<Arc<dyn DeviceHandler>>,
    /// The last poll returned data that failed validation; `record` is older.
    pub stale: bool,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("ain", &self.record.ain)
            .field("category", &self.category)
            .field("handler", &self.handler.is_some())
            .field("stale", &self.stale)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Result of applying a freshly validated record to a known entry.
pub(crate) enum Applied {
    Unchanged,
    Changed(Option<Arc<dyn DeviceHandler>>),
}

/// Registry of every device the poll loop knows about.
///
/// Every mutation bumps a version counter and rebuilds the ordered
/// snapshot that subscribers receive.
pub struct Registry {
    entries: DashMap<Ain, RegistryEntry>,
    version: watch::Sender<u64>,
    snapshot: watch::Sender<Arc<Vec<Arc<DeviceRecord>>>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("devices", &self.entries.len())
            .field("version", &*self.version.borrow())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            entries: DashMap::new(),
            version,
            snapshot,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, ain: &str) -> bool {
        self.entries.contains_key(ain)
    }

    /// Cached record for `ain`. Never touches the network.
    pub fn record(&self, ain: &str) -> Option<Arc<DeviceRecord>> {
        self.entries.get(ain).map(|e| Arc::clone(&e.record))
    }

    pub fn category(&self, ain: &str) -> Option<DeviceCategory> {
        self.entries.get(ain).map(|e| e.category)
    }

    pub fn handler(&self, ain: &str) -> Option<Arc<dyn DeviceHandler>> {
        self.entries.get(ain).and_then(|e| e.handler.clone())
    }

    pub fn is_stale(&self, ain: &str) -> bool {
        self.entries.get(ain).is_some_and(|e| e.stale)
    }

    pub fn entry(&self, ain: &str) -> Option<RegistryEntry> {
        self.entries.get(ain).map(|e| e.value().clone())
    }

    /// All registered AINs, sorted.
    pub fn ains(&self) -> Vec<Ain> {
        let mut ains: Vec<Ain> = self.entries.iter().map(|r| r.key().clone()).collect();
        ains.sort();
        ains
    }

    /// Current records ordered by AIN (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Vec<Arc<DeviceRecord>>> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<DeviceRecord>>>> {
        self.snapshot.subscribe()
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    // ── Handler binding ──────────────────────────────────────────────

    /// Attach a host handler to a registered device.
    ///
    /// Only switch and thermostat entries accept a handler. Binding twice
    /// replaces the previous handler.
    pub fn bind_handler(&self, ain: &str, handler: Arc<dyn DeviceHandler>) -> Result<(), CoreError> {
        let mut entry = self
            .entries
            .get_mut(ain)
            .ok_or_else(|| CoreError::DeviceNotFound { ain: ain.to_owned() })?;
        if !entry.category.is_actionable() {
            return Err(CoreError::Unsupported {
                operation: format!("binding a handler to {ain}"),
                required: "a switch or thermostat device".into(),
            });
        }
        entry.handler = Some(handler);
        Ok(())
    }

    pub fn unbind_handler(&self, ain: &str) -> Option<Arc<dyn DeviceHandler>> {
        self.entries.get_mut(ain).and_then(|mut e| e.handler.take())
    }

    // ── Writes (crate-internal) ──────────────────────────────────────

    pub(crate) fn insert(&self, record: DeviceRecord) {
        let ain = record.ain.clone();
        let category = record.category();
        self.entries.insert(
            ain,
            RegistryEntry {
                record: Arc::new(record),
                category,
                handler: None,
                stale: false,
                updated_at: Utc::now(),
            },
        );
        self.publish();
    }

    /// Replace the cached record if it differs from `record`.
    ///
    /// A stale entry counts as changed even when the data matches, so the
    /// handler learns that the record is trustworthy again.
    pub(crate) fn apply(&self, record: DeviceRecord) -> Applied {
        let applied = {
            let Some(mut entry) = self.entries.get_mut(record.ain.as_str()) else {
                return Applied::Unchanged;
            };
            if !entry.stale && *entry.record == record {
                Applied::Unchanged
            } else {
                entry.record = Arc::new(record);
                entry.stale = false;
                entry.updated_at = Utc::now();
                Applied::Changed(entry.handler.clone())
            }
        };
        if matches!(applied, Applied::Changed(_)) {
            self.publish();
        }
        applied
    }

    pub(crate) fn mark_stale(&self, ain: &str) {
        if let Some(mut entry) = self.entries.get_mut(ain) {
            entry.stale = true;
        }
    }

    pub(crate) fn remove(&self, ain: &str) -> Option<RegistryEntry> {
        let removed = self.entries.remove(ain).map(|(_, entry)| entry);
        if removed.is_some() {
            self.publish();
        }
        removed
    }

    /// Patch the cached record in place and return the bound handler.
    ///
    /// `patch` may refuse the change (wrong device kind); the cache is
    /// left untouched in that case.
    pub(crate) fn modify<T>(
        &self,
        ain: &str,
        patch: impl FnOnce(&mut DeviceRecord) -> Result<T, CoreError>,
    ) -> Result<(T, Option<Arc<dyn DeviceHandler>>), CoreError> {
        let result = {
            let mut entry = self
                .entries
                .get_mut(ain)
                .ok_or_else(|| CoreError::DeviceNotFound { ain: ain.to_owned() })?;
            let mut record = DeviceRecord::clone(&entry.record);
            let value = patch(&mut record)?;
            entry.record = Arc::new(record);
            entry.updated_at = Utc::now();
            (value, entry.handler.clone())
        };
        self.publish();
        Ok(result)
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Rebuild the snapshot and bump the version. Must not be called while
    /// holding a shard guard.
    fn publish(&self) {
        let mut values: Vec<Arc<DeviceRecord>> = self
            .entries
            .iter()
            .map(|r| Arc::clone(&r.value().record))
            .collect();
        values.sort_by(|a, b| a.ain.cmp(&b.ain));
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{DeviceKind, FunctionMask, PowerMeter, SwitchState};
    use async_trait::async_trait;

    fn plug(ain: &str, on: bool) -> DeviceRecord {
        DeviceRecord {
            ain: Ain::from(ain),
            id: 17,
            function_mask: FunctionMask::new(2944),
            fw_version: "03.33".into(),
            manufacturer: "AVM".into(),
            product_name: "FRITZ!DECT 200".into(),
            present: true,
            name: "Plug".into(),
            kind: DeviceKind::Switch {
                switch: SwitchState {
                    state: Some(on),
                    ..SwitchState::default()
                },
                power_meter: PowerMeter::default(),
                temperature: None,
            },
        }
    }

    fn repeater(ain: &str) -> DeviceRecord {
        DeviceRecord {
            function_mask: FunctionMask::new(1024),
            kind: DeviceKind::Generic { temperature: None },
            ..plug(ain, false)
        }
    }

    struct Quiet;

    #[async_trait]
    impl DeviceHandler for Quiet {
        async fn state_changed(&self) {}
        fn teardown(&self) {}
    }

    #[test]
    fn insert_publishes_snapshot() {
        let registry = Registry::new();
        let rx = registry.subscribe();

        registry.insert(plug("b", true));
        registry.insert(plug("a", false));

        let snap = rx.borrow().clone();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].ain.as_str(), "a");
        assert_eq!(registry.version(), 2);
        assert_eq!(registry.category("a"), Some(DeviceCategory::Switch));
    }

    #[test]
    fn apply_detects_unchanged_records() {
        let registry = Registry::new();
        registry.insert(plug("a", true));

        assert!(matches!(registry.apply(plug("a", true)), Applied::Unchanged));
        assert!(matches!(registry.apply(plug("a", false)), Applied::Changed(None)));
        assert_eq!(registry.record("a").unwrap().is_on(), Some(false));
    }

    #[test]
    fn stale_entry_refreshes_even_when_equal() {
        let registry = Registry::new();
        registry.insert(plug("a", true));
        registry.mark_stale("a");
        assert!(registry.is_stale("a"));

        assert!(matches!(registry.apply(plug("a", true)), Applied::Changed(_)));
        assert!(!registry.is_stale("a"));
    }

    #[test]
    fn handlers_only_bind_to_actionable_devices() {
        let registry = Registry::new();
        registry.insert(plug("plug", true));
        registry.insert(repeater("rep"));

        assert!(registry.bind_handler("plug", Arc::new(Quiet)).is_ok());
        assert!(matches!(
            registry.bind_handler("rep", Arc::new(Quiet)),
            Err(CoreError::Unsupported { .. })
        ));
        assert!(matches!(
            registry.bind_handler("ghost", Arc::new(Quiet)),
            Err(CoreError::DeviceNotFound { .. })
        ));
        assert!(registry.handler("plug").is_some());
        assert!(registry.unbind_handler("plug").is_some());
        assert!(registry.handler("plug").is_none());
    }

    #[test]
    fn failed_patch_leaves_cache_alone() {
        let registry = Registry::new();
        registry.insert(plug("a", true));
        let before = registry.version();

        let result = registry.modify("a", |_| -> Result<(), CoreError> {
            Err(CoreError::Internal("nope".into()))
        });

        assert!(result.is_err());
        assert_eq!(registry.version(), before);
        assert_eq!(registry.record("a").unwrap().is_on(), Some(true));
    }

    #[test]
    fn remove_returns_entry() {
        let registry = Registry::new();
        registry.insert(plug("a", true));

        let entry = registry.remove("a").unwrap();
        assert_eq!(entry.category, DeviceCategory::Switch);
        assert!(registry.is_empty());
        assert!(registry.snapshot().is_empty());
        assert!(registry.remove("a").is_none());
    }
}
