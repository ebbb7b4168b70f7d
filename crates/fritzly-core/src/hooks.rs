// ── Host hooks ──
//
// The reconciler never renders anything itself. It announces new
// devices through a `DiscoveryHook` and pokes bound `DeviceHandler`s when
// their cached record changes or the device disappears.

use std::sync::Arc;

use async_trait::async_trait;

use crate::model::{Ain, DeviceCategory};
use crate::store::Registry;

/// Called once per category with each batch of newly seen devices.
///
/// Batches arrive switches first, then thermostats. Generic devices are
/// stored but never announced. Implementations typically build a handler
/// per AIN and attach it with [`Registry::bind_handler`].
pub trait DiscoveryHook: Send + Sync {
    fn devices_discovered(&self, category: DeviceCategory, ains: &[Ain], registry: &Arc<Registry>);
}

impl<F> DiscoveryHook for F
where
    F: Fn(DeviceCategory, &[Ain], &Arc<Registry>) + Send + Sync,
{
    fn devices_discovered(&self, category: DeviceCategory, ains: &[Ain], registry: &Arc<Registry>) {
        self(category, ains, registry);
    }
}

/// Discovery hook that ignores every batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiscovery;

impl DiscoveryHook for NoopDiscovery {
    fn devices_discovered(&self, _: DeviceCategory, _: &[Ain], _: &Arc<Registry>) {}
}

/// Host-side representation of one device.
#[async_trait]
pub trait DeviceHandler: Send + Sync {
    /// The cached record changed. Re-read it from the registry; never fetch.
    async fn state_changed(&self);

    /// The device vanished from the inventory and is about to be removed.
    fn teardown(&self);
}
