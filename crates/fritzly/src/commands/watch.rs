//! `fritzly watch`: run the poll loop and report every device change.
//!
//! The CLI acts as the host: a discovery hook binds a printing handler to
//! every announced outlet and thermostat, and Ctrl-C closes the session.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use fritzly_core::{
    Ain, ConnectionState, Controller, DeviceCategory, DeviceHandler, DeviceRecord, DiscoveryHook,
    Registry,
};

use crate::cli::WatchArgs;
use crate::commands::devices::state_summary;
use crate::config::Session;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Clone, Copy)]
struct Printer {
    color: bool,
    quiet: bool,
}

impl Printer {
    fn emit(self, line: &str) {
        let stamp = chrono::Local::now().format("%H:%M:%S");
        output::print_output(&format!("{stamp}  {line}"), self.quiet);
    }

    fn describe(self, record: &DeviceRecord) -> String {
        format!(
            "{} ({}): {}",
            record.name,
            record.ain,
            state_summary(record, self.color)
        )
    }
}

// ── Host hooks ──────────────────────────────────────────────────────

struct WatchHost {
    printer: Printer,
}

impl DiscoveryHook for WatchHost {
    fn devices_discovered(&self, category: DeviceCategory, ains: &[Ain], registry: &Arc<Registry>) {
        info!(%category, count = ains.len(), "devices discovered");
        for ain in ains {
            if let Some(record) = registry.record(ain.as_str()) {
                self.printer
                    .emit(&format!("+ {category} {}", self.printer.describe(&record)));
            }
            let handler = Arc::new(WatchHandler {
                ain: ain.clone(),
                registry: Arc::downgrade(registry),
                printer: self.printer,
            });
            if let Err(e) = registry.bind_handler(ain.as_str(), handler) {
                warn!(%ain, error = %e, "could not bind handler");
            }
        }
    }
}

struct WatchHandler {
    ain: Ain,
    // Weak: the registry owns this handler.
    registry: Weak<Registry>,
    printer: Printer,
}

#[async_trait]
impl DeviceHandler for WatchHandler {
    async fn state_changed(&self) {
        let Some(record) = self
            .registry
            .upgrade()
            .and_then(|r| r.record(self.ain.as_str()))
        else {
            return;
        };
        debug!(ain = %self.ain, "state changed");
        self.printer
            .emit(&format!("~ {}", self.printer.describe(&record)));
    }

    fn teardown(&self) {
        debug!(ain = %self.ain, "device removed");
        self.printer.emit(&format!("- {}", self.ain));
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: WatchArgs, session: &Session) -> Result<(), CliError> {
    let mut gateway = session.gateway.clone();
    if let Some(secs) = args.interval {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        gateway.poll_interval = Duration::from_secs(secs);
    }
    let interval = gateway.poll_interval;

    let printer = Printer {
        color: session.color,
        quiet: session.quiet,
    };
    let controller = Controller::new(gateway, Arc::new(WatchHost { printer }))?;
    let mut state = controller.connection_state();

    // The connect future is dropped before disconnect runs.
    let connected = tokio::select! {
        result = controller.connect() => Some(result),
        signal = tokio::signal::ctrl_c() => {
            signal?;
            None
        }
    };
    match connected {
        Some(result) => result?,
        None => {
            controller.disconnect().await;
            return Ok(());
        }
    }

    printer.emit(&format!(
        "watching {} devices every {}s, Ctrl-C to stop",
        controller.registry().len(),
        interval.as_secs()
    ));

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = state.borrow_and_update().clone();
                match current {
                    ConnectionState::Reconnecting { attempt } => {
                        printer.emit(&format!("login failed, retrying (attempt {attempt})"));
                    }
                    other => info!(state = ?other, "connection state changed"),
                }
            }
        }
    }

    info!("shutting down");
    controller.disconnect().await;
    Ok(())
}
