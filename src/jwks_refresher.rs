// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # JWKS Refresher
//!
//! Background task that keeps the Firebase signing keys cached so request
//! handling rarely waits on a JWKS fetch.
//!
//! ## Strategy
//!
//! Fetch once at startup, then every `refresh_interval` (default 1 h). A
//! failed fetch is logged and retried on the next tick; the cache keeps
//! serving the previous keys meanwhile.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::JwksManager;

/// Default interval between refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(3600);

/// Periodic JWKS cache refresher.
pub struct JwksRefresher {
    jwks: JwksManager,
    refresh_interval: Duration,
}

impl JwksRefresher {
    pub fn new(jwks: JwksManager) -> Self {
        Self {
            jwks,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    /// Override the refresh interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Run the refresh loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(refresher.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.refresh_interval.as_secs(),
            jwks_url = self.jwks.jwks_url(),
            "JWKS refresher starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("JWKS refresher shutting down");
                return;
            }

            self.refresh_step().await;

            tokio::select! {
                _ = tokio::time::sleep(self.refresh_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("JWKS refresher shutting down");
                    return;
                }
            }
        }
    }

    async fn refresh_step(&self) {
        match self.jwks.refresh().await {
            Ok(()) => debug!("JWKS refreshed"),
            Err(e) => warn!(error = %e, "JWKS refresh failed"),
        }
    }
}
