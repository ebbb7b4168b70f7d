#![allow(clippy::unwrap_used)]
// Reconciliation tests: inventory snapshots applied to a registry with
// recording hooks. No network involved.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use fritzly_api::{Inventory, parse_inventory};
use fritzly_core::{
    Ain, CycleReport, DeviceCategory, DeviceHandler, DiscoveryHook, Registry, reconcile,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn plug(ain: &str, state: &str) -> String {
    format!(
        r#"<device identifier="{ain}" id="17" functionbitmask="2944" fwversion="03.33" manufacturer="AVM" productname="FRITZ!DECT 200">
            <present>1</present><name>Plug {ain}</name>
            <switch><state>{state}</state><mode>manuell</mode><lock>0</lock><devicelock>0</devicelock></switch>
            <powermeter><power>0</power><energy>707</energy></powermeter>
            <temperature><celsius>215</celsius><offset>0</offset></temperature>
        </device>"#
    )
}

fn radiator(ain: &str, tsoll: &str) -> String {
    format!(
        r#"<device identifier="{ain}" id="18" functionbitmask="320" fwversion="03.54" manufacturer="AVM" productname="Comet DECT">
            <present>1</present><name>Radiator {ain}</name>
            <temperature><celsius>210</celsius><offset>0</offset></temperature>
            <hkr><tist>42</tist><tsoll>{tsoll}</tsoll><absenk>32</absenk><komfort>44</komfort><lock>0</lock><devicelock>0</devicelock><errorcode>0</errorcode><batterylow>0</batterylow></hkr>
        </device>"#
    )
}

fn repeater(ain: &str) -> String {
    format!(
        r#"<device identifier="{ain}" id="19" functionbitmask="1280" fwversion="04.16" manufacturer="AVM" productname="FRITZ!DECT Repeater 100">
            <present>1</present><name>Repeater</name>
            <temperature><celsius>230</celsius><offset>0</offset></temperature>
        </device>"#
    )
}

fn inventory(devices: &[String]) -> Inventory {
    parse_inventory(&format!(
        r#"<devicelist version="1">{}</devicelist>"#,
        devices.concat()
    ))
    .unwrap()
}

/// Records every discovery batch and binds a counting handler per device.
#[derive(Default)]
struct Host {
    batches: Mutex<Vec<(DeviceCategory, Vec<Ain>)>>,
    handlers: Mutex<Vec<(Ain, Arc<Counting>)>>,
}

impl Host {
    fn handler(&self, ain: &str) -> Arc<Counting> {
        self.handlers
            .lock()
            .unwrap()
            .iter()
            .find(|(a, _)| a.as_str() == ain)
            .map(|(_, h)| Arc::clone(h))
            .unwrap()
    }

    fn batches(&self) -> Vec<(DeviceCategory, Vec<Ain>)> {
        self.batches.lock().unwrap().clone()
    }
}

impl DiscoveryHook for Host {
    fn devices_discovered(&self, category: DeviceCategory, ains: &[Ain], registry: &Arc<Registry>) {
        self.batches.lock().unwrap().push((category, ains.to_vec()));
        for ain in ains {
            let handler = Arc::new(Counting::default());
            registry.bind_handler(ain.as_str(), handler.clone()).unwrap();
            self.handlers.lock().unwrap().push((ain.clone(), handler));
        }
    }
}

#[derive(Default)]
struct Counting {
    refreshed: AtomicUsize,
    torn_down: AtomicUsize,
}

#[async_trait]
impl DeviceHandler for Counting {
    async fn state_changed(&self) {
        tokio::task::yield_now().await;
        self.refreshed.fetch_add(1, Ordering::SeqCst);
    }

    fn teardown(&self) {
        self.torn_down.fetch_add(1, Ordering::SeqCst);
    }
}

fn ains(list: &[&str]) -> Vec<Ain> {
    list.iter().map(|a| Ain::from(*a)).collect()
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_first_cycle_announces_switches_then_thermostats() {
    let registry = Arc::new(Registry::new());
    let host = Host::default();

    let report = reconcile(
        &registry,
        &inventory(&[radiator("R1", "44"), plug("P1", "1"), repeater("X1")]),
        &host,
    )
    .await;

    assert_eq!(report.added, ains(&["R1", "P1", "X1"]));
    assert_eq!(
        host.batches(),
        vec![
            (DeviceCategory::Switch, ains(&["P1"])),
            (DeviceCategory::Thermostat, ains(&["R1"])),
        ]
    );
    // Generic devices are stored but never announced.
    assert_eq!(registry.category("X1"), Some(DeviceCategory::Generic));
    assert!(registry.handler("X1").is_none());
}

#[tokio::test]
async fn test_add_update_remove_in_one_cycle() {
    let registry = Arc::new(Registry::new());
    let host = Host::default();

    reconcile(&registry, &inventory(&[plug("A", "0"), plug("B", "0")]), &host).await;
    let a = host.handler("A");
    let b = host.handler("B");

    let report = reconcile(&registry, &inventory(&[plug("B", "1"), plug("C", "0")]), &host).await;

    assert_eq!(
        report,
        CycleReport {
            added: ains(&["C"]),
            updated: ains(&["B"]),
            removed: ains(&["A"]),
            rejected: vec![],
        }
    );
    assert_eq!(a.torn_down.load(Ordering::SeqCst), 1);
    assert_eq!(b.torn_down.load(Ordering::SeqCst), 0);
    assert_eq!(b.refreshed.load(Ordering::SeqCst), 1);
    assert_eq!(
        host.batches(),
        vec![
            (DeviceCategory::Switch, ains(&["A", "B"])),
            (DeviceCategory::Switch, ains(&["C"])),
        ]
    );
    assert!(!registry.contains("A"));
    assert_eq!(registry.record("B").unwrap().is_on(), Some(true));
    assert_eq!(registry.ains(), ains(&["B", "C"]));
}

#[tokio::test]
async fn test_unchanged_device_is_not_refreshed() {
    let registry = Arc::new(Registry::new());
    let host = Host::default();
    let devices = [plug("P1", "1"), radiator("R1", "44")];

    reconcile(&registry, &inventory(&devices), &host).await;
    let report = reconcile(&registry, &inventory(&devices), &host).await;

    assert!(report.is_quiet());
    assert_eq!(host.handler("P1").refreshed.load(Ordering::SeqCst), 0);
    assert_eq!(host.handler("R1").refreshed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_update_keeps_cached_record() {
    let registry = Arc::new(Registry::new());
    let host = Host::default();

    reconcile(&registry, &inventory(&[radiator("R1", "44")]), &host).await;
    let before = registry.record("R1").unwrap();

    // The thermostat loses its <hkr> block: the shape no longer validates.
    let broken = r#"<device identifier="R1" id="18" functionbitmask="320" fwversion="03.54" manufacturer="AVM" productname="Comet DECT">
            <present>1</present><name>Radiator R1</name>
            <temperature><celsius>210</celsius><offset>0</offset></temperature>
        </device>"#;
    let report = reconcile(&registry, &inventory(&[broken.to_owned()]), &host).await;

    assert_eq!(report.rejected, ains(&["R1"]));
    assert!(report.removed.is_empty());
    assert!(registry.is_stale("R1"));
    assert_eq!(*registry.record("R1").unwrap(), *before);
    assert_eq!(host.handler("R1").refreshed.load(Ordering::SeqCst), 0);

    // Valid data clears the stale flag and refreshes the handler.
    let report = reconcile(&registry, &inventory(&[radiator("R1", "44")]), &host).await;
    assert_eq!(report.updated, ains(&["R1"]));
    assert!(!registry.is_stale("R1"));
    assert_eq!(host.handler("R1").refreshed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalid_new_device_is_retried_next_poll() {
    let registry = Arc::new(Registry::new());
    let host = Host::default();

    let broken = plug("P1", "1").replace(r#"id="17""#, r#"id="seventeen""#);
    let report = reconcile(&registry, &inventory(&[broken]), &host).await;

    assert_eq!(report.rejected, ains(&["P1"]));
    assert!(registry.is_empty());
    assert!(host.batches().is_empty());

    let report = reconcile(&registry, &inventory(&[plug("P1", "1")]), &host).await;
    assert_eq!(report.added, ains(&["P1"]));
    assert_eq!(host.batches(), vec![(DeviceCategory::Switch, ains(&["P1"]))]);
}

#[tokio::test]
async fn test_empty_inventory_tears_everything_down() {
    let registry = Arc::new(Registry::new());
    let host = Host::default();

    reconcile(&registry, &inventory(&[plug("P1", "1"), radiator("R1", "44")]), &host).await;
    let report = reconcile(&registry, &inventory(&[]), &host).await;

    assert_eq!(report.removed, ains(&["P1", "R1"]));
    assert!(registry.is_empty());
    assert_eq!(host.handler("P1").torn_down.load(Ordering::SeqCst), 1);
    assert_eq!(host.handler("R1").torn_down.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_closure_discovery_hook() {
    let registry = Arc::new(Registry::new());
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let hook = move |_: DeviceCategory, ains: &[Ain], _: &Arc<Registry>| {
        counter.fetch_add(ains.len(), Ordering::SeqCst);
    };

    reconcile(&registry, &inventory(&[plug("P1", "1"), plug("P2", "0")]), &hook).await;

    assert_eq!(seen.load(Ordering::SeqCst), 2);
}
