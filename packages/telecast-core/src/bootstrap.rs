//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root: the single place where the
//! status feed, remote factory, wake sender, discovery listener and one
//! reconciliation loop per device are created and wired together.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::discovery::{AddressReceiver, AddressRoutes, DiscoveryListener, DiscoveryResult};
use crate::error::{ErrorCode, TelecastError, TelecastResult};
use crate::protocol_constants::HTTP_TIMEOUT_SECS;
use crate::samsung::{RemoteFactory, SamsungRemoteFactory};
use crate::services::{
    DeviceReconciler, HttpStatusFeed, MagicPacketSender, ReconcilerSettings, StatusFeed,
    WakeSender,
};
use crate::state::Config;

/// Collaborators injected into every reconciliation loop.
#[derive(Clone)]
pub struct Collaborators {
    pub feed: Arc<dyn StatusFeed>,
    pub remotes: Arc<dyn RemoteFactory>,
    pub waker: Arc<dyn WakeSender>,
}

/// Handles to all running tasks.
///
/// Dropping this does not stop the tasks; call [`shutdown`](Self::shutdown).
pub struct BootstrappedServices {
    /// Cancellation token shared by every task.
    pub cancel_token: CancellationToken,
    /// One loop per configured device.
    reconcilers: Vec<JoinHandle<()>>,
    /// Discovery listener; `None` once it has been awaited.
    discovery: Option<JoinHandle<DiscoveryResult<()>>>,
}

impl BootstrappedServices {
    /// Number of running reconciliation loops.
    pub fn device_count(&self) -> usize {
        self.reconcilers.len()
    }

    /// Resolves when the discovery listener exits.
    ///
    /// A listener error means no more address updates will arrive, so callers
    /// should treat it as fatal. Pends forever once the listener has already
    /// been awaited.
    pub async fn discovery_stopped(&mut self) -> TelecastResult<()> {
        let Some(handle) = self.discovery.as_mut() else {
            return std::future::pending().await;
        };

        let result = handle.await;
        self.discovery = None;
        match result {
            Ok(listener_result) => Ok(listener_result?),
            Err(e) => Err(TelecastError::Internal(format!(
                "discovery task panicked: {}",
                e
            ))),
        }
    }

    /// Cancels all tasks and waits for them to finish.
    pub async fn shutdown(self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        self.cancel_token.cancel();

        if let Some(handle) = self.discovery {
            if let Ok(Err(e)) = handle.await {
                log::warn!(
                    "[Bootstrap] Discovery listener ended with error ({}): {}",
                    e.code(),
                    e
                );
            }
        }

        let count = self.reconcilers.len();
        for handle in self.reconcilers {
            if let Err(e) = handle.await {
                log::warn!("[Bootstrap] Reconciliation task failed: {}", e);
            }
        }
        log::info!("[Bootstrap] Stopped {} reconciliation loop(s)", count);

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Creates the shared HTTP client for the status feed.
pub fn create_http_client() -> TelecastResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .map_err(|e| TelecastError::Internal(format!("Failed to create HTTP client: {}", e)))
}

/// Bootstraps all services with their production implementations.
///
/// Wiring order:
///
/// 1. Config validation
/// 2. Shared HTTP client and status feed
/// 3. Remote factory and wake sender
/// 4. Multicast discovery socket
/// 5. Address routes, reconciliation loops and the listener task
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the discovery socket
/// cannot be bound.
pub fn bootstrap_services(config: &Config) -> TelecastResult<BootstrappedServices> {
    config.validate()?;

    let http_client = create_http_client()?;
    let feed = HttpStatusFeed::new(http_client, &config.server_url, &config.feed_path)?;

    let collaborators = Collaborators {
        feed: Arc::new(feed),
        remotes: Arc::new(SamsungRemoteFactory::new(config.remote.clone())),
        waker: Arc::new(MagicPacketSender),
    };

    let listener = DiscoveryListener::bind(&config.discovery)?;

    bootstrap_services_with(config, listener, collaborators)
}

/// Bootstraps with an already-bound listener and explicit collaborators.
pub fn bootstrap_services_with(
    config: &Config,
    listener: DiscoveryListener,
    collaborators: Collaborators,
) -> TelecastResult<BootstrappedServices> {
    let cancel_token = CancellationToken::new();
    let settings = ReconcilerSettings::from_config(config);

    let (routes, mut receivers) =
        AddressRoutes::new(config.devices.iter().map(|device| device.id.clone()));

    let mut reconcilers = Vec::with_capacity(config.devices.len());
    for device in &config.devices {
        let address_rx = take_receiver(&mut receivers, &device.id)?;
        let reconciler = DeviceReconciler::new(
            device.clone(),
            address_rx,
            Arc::clone(&collaborators.feed),
            Arc::clone(&collaborators.remotes),
            Arc::clone(&collaborators.waker),
            settings,
        );
        reconcilers.push(tokio::spawn(reconciler.run(cancel_token.clone())));
    }

    let discovery_cancel = cancel_token.clone();
    let discovery = tokio::spawn(async move {
        let result = listener
            .run(discovery_cancel, move |announcement| {
                routes.route(&announcement);
            })
            .await;
        if let Err(e) = &result {
            log::error!("[Discovery] Listener failed ({}): {}", e.code(), e);
        }
        result
    });

    log::info!(
        "[Bootstrap] Started {} reconciliation loop(s)",
        reconcilers.len()
    );

    Ok(BootstrappedServices {
        cancel_token,
        reconcilers,
        discovery: Some(discovery),
    })
}

fn take_receiver(
    receivers: &mut HashMap<String, AddressReceiver>,
    device_id: &str,
) -> TelecastResult<AddressReceiver> {
    receivers.remove(device_id).ok_or_else(|| {
        TelecastError::Configuration(format!("duplicate device id {}", device_id))
    })
}
