// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Refresh Token Sweeper
//!
//! Background task that periodically clears stored refresh tokens which can
//! no longer be redeemed. An expired token is already rejected by the codec;
//! the sweep only keeps dead tokens from lingering in the store.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown; the same
//! token stops the HTTP server.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::SessionManager;

pub struct RefreshTokenSweeper {
    sessions: Arc<SessionManager>,
    interval: Duration,
}

impl RefreshTokenSweeper {
    pub fn new(sessions: Arc<SessionManager>, interval: Duration) -> Self {
        Self { sessions, interval }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Refresh token sweeper starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Refresh token sweeper shutting down");
                    return;
                }
            }

            self.sweep_step().await;
        }
    }

    /// Execute one sweep on the blocking pool. Returns the number of cleared
    /// tokens.
    async fn sweep_step(&self) -> usize {
        let sessions = self.sessions.clone();
        match tokio::task::spawn_blocking(move || sessions.sweep_expired_refresh_tokens()).await {
            Ok(Ok(0)) => 0,
            Ok(Ok(cleared)) => {
                info!(cleared, "Cleared stale refresh tokens");
                cleared
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Refresh token sweep failed");
                0
            }
            Err(e) => {
                warn!(error = %e, "Refresh token sweep task panicked");
                0
            }
        }
    }
}
