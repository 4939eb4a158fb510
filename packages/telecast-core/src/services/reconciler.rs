//! Per-device reconciliation loop.
//!
//! Each managed TV gets one [`DeviceReconciler`] running as its own task. A
//! cycle adopts the latest announced address, fetches the desired state from
//! the status feed and applies it through a fresh remote session, falling
//! back to wake-on-LAN for power-on when the TV cannot be reached.
//!
//! Cycles never overlap: the next one starts `poll_interval` after the
//! previous one finished.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::discovery::AddressReceiver;
use crate::error::ErrorCode;
use crate::samsung::{RemoteFactory, RemoteKey};
use crate::services::status_feed::{DesiredState, FeedError, StatusFeed};
use crate::services::wake::WakeSender;
use crate::state::{Config, DeviceConfig};

/// Timing of the reconciliation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerSettings {
    /// Delay between the end of one cycle and the start of the next.
    pub poll_interval: Duration,
    /// Delay after each volume step.
    pub volume_step_delay: Duration,
}

impl ReconcilerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            volume_step_delay: config.volume_step_delay(),
        }
    }
}

/// Result of a single reconciliation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Keep polling.
    Continue,
    /// Feed reported end of stream; the loop should stop.
    Finished,
}

/// Drives one TV towards the state requested by the status feed.
pub struct DeviceReconciler {
    device: DeviceConfig,
    address: Option<String>,
    address_rx: AddressReceiver,
    feed: Arc<dyn StatusFeed>,
    remotes: Arc<dyn RemoteFactory>,
    waker: Arc<dyn WakeSender>,
    settings: ReconcilerSettings,
}

impl DeviceReconciler {
    /// Creates a reconciler for `device`.
    ///
    /// A configured static `host` seeds the last-known address.
    pub fn new(
        device: DeviceConfig,
        address_rx: AddressReceiver,
        feed: Arc<dyn StatusFeed>,
        remotes: Arc<dyn RemoteFactory>,
        waker: Arc<dyn WakeSender>,
        settings: ReconcilerSettings,
    ) -> Self {
        let address = device.host.clone().filter(|host| !host.is_empty());
        Self {
            device,
            address,
            address_rx,
            feed,
            remotes,
            waker,
            settings,
        }
    }

    /// Last-known address, if any.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Runs cycles until the feed ends or `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        log::info!(
            "[Reconcile] Managing {} (address: {})",
            self.device.id,
            self.address.as_deref().unwrap_or("unknown")
        );

        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.run_cycle() => outcome,
            };

            if outcome == CycleOutcome::Finished {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }

        log::info!("[Reconcile] Stopped managing {}", self.device.id);
    }

    /// Runs one cycle: adopt address, fetch desired state, apply it.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.adopt_pending_address();

        let desired = match self.feed.fetch(&self.device.id).await {
            Ok(desired) => desired,
            Err(FeedError::EndOfStream) => {
                log::info!(
                    "[Reconcile] Status feed ended for {}, no more work",
                    self.device.id
                );
                return CycleOutcome::Finished;
            }
            Err(e @ FeedError::Decode(_)) => {
                log::warn!(
                    "[Reconcile] Skipping malformed desired state for {} ({}): {}",
                    self.device.id,
                    e.code(),
                    e
                );
                return CycleOutcome::Continue;
            }
            Err(e) => {
                log::warn!(
                    "[Reconcile] Status fetch failed for {} ({}): {}",
                    self.device.id,
                    e.code(),
                    e
                );
                return CycleOutcome::Continue;
            }
        };

        self.apply(&desired).await;
        CycleOutcome::Continue
    }

    /// Takes the pending address update, if any, without waiting.
    ///
    /// With no update pending (or the publisher gone), the last-known
    /// address is kept.
    pub fn adopt_pending_address(&mut self) {
        if !self.address_rx.has_changed().unwrap_or(false) {
            return;
        }

        let latest = self.address_rx.borrow_and_update().clone();
        let Some(address) = latest else {
            return;
        };

        if self.address.as_deref() != Some(address.as_str()) {
            log::info!(
                "[Reconcile] {} is now at {} (was {})",
                self.device.id,
                address,
                self.address.as_deref().unwrap_or("unknown")
            );
            self.address = Some(address);
        }
    }

    /// Applies every requested action in `desired`.
    pub async fn apply(&self, desired: &DesiredState) {
        if desired.power_on {
            self.power_on().await;
        }

        let Some(host) = self.address.as_deref() else {
            if !desired.is_idle() {
                log::debug!(
                    "[Reconcile] Address of {} unknown, skipping remote actions",
                    self.device.id
                );
            }
            return;
        };

        if desired.power_off {
            self.dispatch(host, RemoteKey::Power).await;
        }

        if desired.volume_up > 0 {
            self.step_volume(host, RemoteKey::VolumeUp, desired.volume_up)
                .await;
        }
        if desired.volume_down > 0 {
            self.step_volume(host, RemoteKey::VolumeDown, desired.volume_down)
                .await;
        }

        let single_keys = [
            (desired.mute, RemoteKey::Mute),
            (desired.pause, RemoteKey::Pause),
            (desired.play, RemoteKey::Play),
            (desired.confirm, RemoteKey::Ok),
        ];
        for (requested, key) in single_keys {
            if requested {
                self.dispatch(host, key).await;
            }
        }
    }

    /// Sends the power key if the TV is reachable, otherwise wakes it.
    async fn power_on(&self) {
        if let Some(host) = self.address.as_deref() {
            if self.dispatch(host, RemoteKey::Power).await {
                return;
            }
        }

        log::info!(
            "[Reconcile] Waking {} via {}",
            self.device.id,
            self.device.mac_address
        );
        if let Err(e) = self.waker.wake(&self.device.mac_address) {
            log::warn!("[Reconcile] Wake failed for {}: {}", self.device.id, e);
        }
    }

    /// Connect, send `key`, close.
    async fn dispatch(&self, host: &str, key: RemoteKey) -> bool {
        let mut remote = self.remotes.remote_for(host);
        let sent = remote.send_single_command(key.as_str()).await;
        if sent {
            log::debug!("[Reconcile] Sent {} to {}", key, self.device.id);
        } else {
            log::warn!(
                "[Reconcile] Failed to send {} to {} at {}",
                key,
                self.device.id,
                host
            );
        }
        sent
    }

    /// Sends `key` `steps` times over one session.
    ///
    /// A failed step aborts the rest of the sequence: the remaining steps are
    /// skipped, so the TV may end up short of the requested volume change.
    /// The session is still closed and the caller goes on to apply the other
    /// fields of the desired state.
    async fn step_volume(&self, host: &str, key: RemoteKey, steps: u32) {
        let mut remote = self.remotes.remote_for(host);
        if !remote.connect().await {
            log::warn!(
                "[Reconcile] Cannot reach {} at {} for {}",
                self.device.id,
                host,
                key
            );
            return;
        }

        for step in 1..=steps {
            if !remote.send_command(key.as_str()).await {
                log::warn!(
                    "[Reconcile] {} step {}/{} failed for {}, aborting",
                    key,
                    step,
                    steps,
                    self.device.id
                );
                break;
            }
            tokio::time::sleep(self.settings.volume_step_delay).await;
        }

        remote.close().await;
    }
}
