use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::SweeperConfig;
use crate::audit::CompletedBy;
use crate::error::{Result, TurnoverError};
use crate::metrics;
use crate::service::TurnoverService;

/// What one sweep completed.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct SweepReport {
    pub beds_completed: usize,
    pub equipment_completed: usize,
    /// Beds handed to a waiting patient as part of completion.
    pub assignments: usize,
}

/// Background task completing elapsed turnovers.
pub struct TurnoverSweeper {
    config: SweeperConfig,
    service: Arc<TurnoverService>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TurnoverSweeper {
    pub fn new(config: SweeperConfig, service: Arc<TurnoverService>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            service,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Spawn the sweep loop.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Turnover sweeper already running");
            return;
        }

        let running = Arc::clone(&self.running);
        let service = Arc::clone(&self.service);
        let interval = Duration::from_millis(self.config.interval_ms);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!(interval_ms = interval.as_millis() as u64, "Turnover sweeper started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Turnover sweeper received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        match Self::sweep(&service).await {
                            Ok(report) => {
                                metrics::SWEEPER_TICKS.with_label_values(&["ok"]).inc();
                                if report != SweepReport::default() {
                                    info!(
                                        beds = report.beds_completed,
                                        equipment = report.equipment_completed,
                                        assignments = report.assignments,
                                        "Sweep completed elapsed turnovers"
                                    );
                                }
                            }
                            Err(e) => {
                                metrics::SWEEPER_TICKS.with_label_values(&["error"]).inc();
                                warn!("Sweep failed: {}", e);
                            }
                        }
                    }
                }
            }
            info!("Turnover sweeper stopped");
        });

        *self.handle.lock().await = Some(handle);
    }

    /// Stop the loop and wait for an in-flight sweep to finish.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Turnover sweeper not running");
            return;
        }

        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Turnover sweeper task ended abnormally: {}", e);
            }
        }
    }

    /// Run one sweep now.
    pub async fn tick(&self) -> Result<SweepReport> {
        Self::sweep(&self.service).await
    }

    /// Complete everything due. Turnovers closed by someone else in the
    /// meantime are skipped, so repeating a sweep is harmless.
    async fn sweep(service: &TurnoverService) -> Result<SweepReport> {
        let now = service.now();
        let mut report = SweepReport::default();

        for bed_id in service.turnovers().due_beds(now)? {
            match service
                .turnovers()
                .complete_turnover(&bed_id, CompletedBy::Sweeper)
                .await
            {
                Ok(outcome) => {
                    report.beds_completed += 1;
                    if outcome.assignment.is_some() {
                        report.assignments += 1;
                    }
                }
                Err(TurnoverError::InvalidTransition { .. }) => {
                    debug!(bed_id, "Turnover already closed, skipping");
                }
                Err(e) => warn!(bed_id, error = %e, "Failed to auto-complete bed turnover"),
            }
        }

        for equipment_id in service.equipment_turnovers().due_equipment(now)? {
            match service
                .equipment_turnovers()
                .complete_cleaning(&equipment_id, CompletedBy::Sweeper)
                .await
            {
                Ok(_) => report.equipment_completed += 1,
                Err(TurnoverError::InvalidTransition { .. }) => {
                    debug!(equipment_id, "Cleaning cycle already closed, skipping");
                }
                Err(e) => {
                    warn!(equipment_id, error = %e, "Failed to auto-complete equipment cleaning")
                }
            }
        }

        Ok(report)
    }
}
