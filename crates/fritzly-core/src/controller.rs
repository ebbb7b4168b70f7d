// ── Controller abstraction ──
//
// Full lifecycle management for a gateway connection: login with
// backoff, the background poll loop, command routing and shutdown.
// The controller is the explicit context object every actor and hook
// is handed; nothing lives in process-wide state.

use std::sync::Arc;
use std::time::Duration;

use fritzly_api::transport::{TlsMode, TransportConfig};
use fritzly_api::{Credentials, SessionClient};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandResult};
use crate::config::{GatewayConfig, TlsVerification};
use crate::device::{SwitchActor, ThermostatActor};
use crate::error::CoreError;
use crate::hooks::{DiscoveryHook, NoopDiscovery};
use crate::model::{DeviceCategory, DeviceRecord, OperationMode, thermostat};
use crate::store::{CycleReport, Registry, reconcile};

/// Added on top of the block time the gateway reports.
pub const LOGIN_BLOCK_MARGIN: Duration = Duration::from_secs(5);

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Login failed; waiting before the next attempt.
    Reconnecting { attempt: u32 },
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Owns the session client
/// and the device registry.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: GatewayConfig,
    client: SessionClient,
    registry: Arc<Registry>,
    hook: Arc<dyn DiscoveryHook>,
    connection_state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    /// Serialises poll cycles between the background task and `refresh()`.
    refresh_lock: Mutex<()>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller {
    /// Create a new Controller from configuration. Does NOT connect --
    /// call [`connect()`](Self::connect) to log in and start polling.
    pub fn new(config: GatewayConfig, hook: Arc<dyn DiscoveryHook>) -> Result<Self, CoreError> {
        let transport = build_transport(&config);
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let client = SessionClient::new(config.url.clone(), credentials, &transport)?;
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                client,
                registry: Arc::new(Registry::new()),
                hook,
                connection_state,
                cancel: CancellationToken::new(),
                refresh_lock: Mutex::new(()),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Access the gateway configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &SessionClient {
        &self.inner.client
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Log in, run the first poll cycle and spawn the poll task.
    ///
    /// Login is retried until it succeeds or the controller is
    /// disconnected. A failing first cycle is logged and left to the
    /// poll task.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.inner.connection_state.send_replace(ConnectionState::Connecting);

        self.login_with_retry().await?;

        match self.refresh().await {
            Ok(report) => debug!(
                devices = self.inner.registry.len(),
                added = report.added.len(),
                "initial refresh complete"
            ),
            Err(e) => warn!(error = %e, "initial refresh failed"),
        }

        let interval = self.inner.config.poll_interval;
        if !interval.is_zero() {
            let ctrl = self.clone();
            let cancel = self.inner.cancel.clone();
            self.inner
                .task_handles
                .lock()
                .await
                .push(tokio::spawn(poll_task(ctrl, interval, cancel)));
        }

        self.inner.connection_state.send_replace(ConnectionState::Connected);
        info!(url = %self.inner.config.url, "connected to gateway");
        Ok(())
    }

    /// Stop polling, wait for the poll task, then log out.
    pub async fn disconnect(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        self.inner.client.close().await;
        self.inner.connection_state.send_replace(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    async fn login_with_retry(&self) -> Result<(), CoreError> {
        let mut attempt = 0u32;
        loop {
            let err = match self.inner.client.login().await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            attempt += 1;
            let wait = login_backoff(err.blocked_for(), self.inner.config.login_retry);
            warn!(error = %err, attempt, retry_in_secs = wait.as_secs(), "login failed");
            self.inner.connection_state.send_replace(ConnectionState::Reconnecting { attempt });

            tokio::select! {
                biased;
                () = self.inner.cancel.cancelled() => return Err(CoreError::Disconnected),
                () = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Run one poll cycle: fetch the inventory and reconcile the registry.
    ///
    /// On fetch failure the registry is left untouched.
    pub async fn refresh(&self) -> Result<CycleReport, CoreError> {
        let _cycle = self.inner.refresh_lock.lock().await;
        let inventory = self.inner.client.fetch_inventory().await?;
        Ok(reconcile(&self.inner.registry, &inventory, self.inner.hook.as_ref()).await)
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: log in once, poll once, run closure, log out.
    ///
    /// Fails fast instead of retrying the login, and never spawns the
    /// poll task.
    pub async fn oneshot<F, Fut, T>(config: GatewayConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.poll_interval = Duration::ZERO;

        let controller = Controller::new(cfg, Arc::new(NoopDiscovery))?;
        let result = async {
            controller.inner.client.login().await?;
            controller.refresh().await?;
            controller.inner.connection_state.send_replace(ConnectionState::Connected);
            f(controller.clone()).await
        }
        .await;
        controller.disconnect().await;
        result
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    pub fn devices_snapshot(&self) -> Arc<Vec<Arc<DeviceRecord>>> {
        self.inner.registry.snapshot()
    }

    pub fn device(&self, ain: &str) -> Option<Arc<DeviceRecord>> {
        self.inner.registry.record(ain)
    }

    // ── Capability handles ───────────────────────────────────────

    pub fn switch(&self, ain: &str) -> Result<SwitchActor, CoreError> {
        self.require(ain, DeviceCategory::Switch, "switch")?;
        Ok(SwitchActor::new(self.clone(), ain.into()))
    }

    pub fn thermostat(&self, ain: &str) -> Result<ThermostatActor, CoreError> {
        self.require(ain, DeviceCategory::Thermostat, "thermostat")?;
        Ok(ThermostatActor::new(self.clone(), ain.into()))
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command against the gateway.
    ///
    /// On success the cached record is patched and the bound handler is
    /// notified. On failure the cache is left untouched.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        debug!(command = cmd.name(), ain = %cmd.ain(), "executing command");
        route_command(self, cmd).await
    }

    fn require(&self, ain: &str, category: DeviceCategory, operation: &str) -> Result<(), CoreError> {
        match self.inner.registry.category(ain) {
            None => Err(CoreError::DeviceNotFound { ain: ain.to_owned() }),
            Some(c) if c == category => Ok(()),
            Some(c) => Err(CoreError::Unsupported {
                operation: format!("{operation} on {ain} ({c})"),
                required: format!("a {category} device"),
            }),
        }
    }
}

/// How long to wait before the next login attempt.
pub fn login_backoff(blocked_for_secs: Option<u64>, floor: Duration) -> Duration {
    match blocked_for_secs {
        Some(secs) if secs > 0 => Duration::from_secs(secs) + LOGIN_BLOCK_MARGIN,
        _ => floor,
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Poll the gateway until cancelled.
///
/// Cycles never overlap: a slow cycle delays the next tick instead of
/// bunching ticks up.
async fn poll_task(controller: Controller, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                match controller.refresh().await {
                    Ok(report) if !report.is_quiet() => info!(
                        added = report.added.len(),
                        updated = report.updated.len(),
                        removed = report.removed.len(),
                        rejected = report.rejected.len(),
                        "poll cycle applied"
                    ),
                    Ok(_) => debug!("poll cycle: no changes"),
                    Err(e) => warn!(error = %e, "poll cycle failed"),
                }
            }
        }
    }
}

// ── Command routing ──────────────────────────────────────────────

async fn route_command(controller: &Controller, cmd: Command) -> Result<CommandResult, CoreError> {
    let client = &controller.inner.client;

    match cmd {
        // ── Switch operations ────────────────────────────────────
        Command::TurnOn { ain } => {
            controller.require(ain.as_str(), DeviceCategory::Switch, "turn_on")?;
            client.set_switch_on(ain.as_str()).await?;
            patch_switch(controller, ain.as_str(), true).await?;
            Ok(CommandResult::Ok)
        }

        Command::TurnOff { ain } => {
            controller.require(ain.as_str(), DeviceCategory::Switch, "turn_off")?;
            client.set_switch_off(ain.as_str()).await?;
            patch_switch(controller, ain.as_str(), false).await?;
            Ok(CommandResult::Ok)
        }

        Command::Toggle { ain } => {
            controller.require(ain.as_str(), DeviceCategory::Switch, "toggle")?;
            let on = client.set_switch_toggle(ain.as_str()).await?;
            patch_switch(controller, ain.as_str(), on).await?;
            Ok(CommandResult::Switched(on))
        }

        // ── Thermostat operations ────────────────────────────────
        Command::SetTargetTemperature { ain, celsius } => {
            controller.require(
                ain.as_str(),
                DeviceCategory::Thermostat,
                "set_target_temperature",
            )?;
            let setpoint = thermostat::half_degrees(celsius)?;
            client.set_hkr_tsoll(ain.as_str(), setpoint).await?;
            patch_setpoint(controller, ain.as_str(), setpoint).await?;
            Ok(CommandResult::Setpoint(setpoint))
        }

        Command::SetOperationMode { ain, mode } => {
            controller.require(
                ain.as_str(),
                DeviceCategory::Thermostat,
                "set_operation_mode",
            )?;
            let setpoint = match mode {
                OperationMode::Off => thermostat::OFF,
                OperationMode::On => thermostat::ON,
                OperationMode::Auto => comfort_setpoint(controller, ain.as_str())?,
                OperationMode::Manual | OperationMode::Unknown => {
                    return Err(CoreError::Unsupported {
                        operation: format!("set_operation_mode({mode})"),
                        required: "one of auto, on, off".into(),
                    });
                }
            };
            client.set_hkr_tsoll(ain.as_str(), setpoint).await?;
            patch_setpoint(controller, ain.as_str(), setpoint).await?;
            Ok(CommandResult::Setpoint(setpoint))
        }
    }
}

/// The cached comfort setpoint, used to hand a thermostat back to its schedule.
fn comfort_setpoint(controller: &Controller, ain: &str) -> Result<u8, CoreError> {
    let komfort = controller
        .inner
        .registry
        .record(ain)
        .and_then(|r| r.hkr().and_then(|h| h.komfort))
        .ok_or_else(|| CoreError::Validation {
            message: format!("{ain} has no cached comfort setpoint"),
        })?;
    u8::try_from(komfort).map_err(|_| CoreError::Validation {
        message: format!("{ain} reports an out-of-range comfort setpoint {komfort}"),
    })
}

async fn patch_switch(controller: &Controller, ain: &str, on: bool) -> Result<(), CoreError> {
    patch_and_notify(controller, ain, |record| {
        let switch = record
            .switch_mut()
            .ok_or_else(|| CoreError::Internal(format!("{ain} has no switch state")))?;
        switch.state = Some(on);
        Ok(())
    })
    .await
}

async fn patch_setpoint(controller: &Controller, ain: &str, setpoint: u8) -> Result<(), CoreError> {
    patch_and_notify(controller, ain, |record| {
        let hkr = record
            .hkr_mut()
            .ok_or_else(|| CoreError::Internal(format!("{ain} has no thermostat state")))?;
        hkr.tsoll = Some(u32::from(setpoint));
        Ok(())
    })
    .await
}

/// Write-through after a successful command, then a non-forcing refresh.
///
/// A device removed by a concurrent poll cycle is not an error: the
/// command reached the gateway, there is just nothing left to patch.
async fn patch_and_notify(
    controller: &Controller,
    ain: &str,
    patch: impl FnOnce(&mut DeviceRecord) -> Result<(), CoreError>,
) -> Result<(), CoreError> {
    match controller.inner.registry.modify(ain, patch) {
        Ok(((), Some(handler))) => {
            handler.state_changed().await;
            Ok(())
        }
        Ok(((), None)) => Ok(()),
        Err(CoreError::DeviceNotFound { .. }) => {
            debug!(ain, "device vanished before its cache could be patched");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn build_transport(config: &GatewayConfig) -> TransportConfig {
    TransportConfig {
        tls: match &config.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        },
        timeout: config.timeout,
    }
}
