//! Periodic analysis scheduler
//!
//! Runs [`TrendEngine::run_cycle`] on a fixed interval and hands every
//! report to the publisher. On cancellation one last cycle runs so the
//! final report covers everything the producers accepted.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::engine::TrendEngine;
use crate::report::ReportPublisher;

pub struct AnalysisScheduler {
    engine: Arc<TrendEngine>,
    publisher: Arc<ReportPublisher>,
    interval: Duration,
    cancel_token: CancellationToken,
}

impl AnalysisScheduler {
    pub fn new(
        engine: Arc<TrendEngine>,
        publisher: Arc<ReportPublisher>,
        interval: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            engine,
            publisher,
            interval,
            cancel_token,
        }
    }

    /// Run until cancelled. Returns the number of cycles published.
    pub async fn run(self) -> Result<u64> {
        info!("[Analysis] Task starting with interval {:?}", self.interval);

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so cycle 1 has data
        interval.tick().await;

        let mut cycles = 0u64;
        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("[Analysis] Shutdown signal received, running final cycle");
                    self.cycle().await?;
                    cycles += 1;
                    break;
                }
                _ = interval.tick() => {
                    self.cycle().await?;
                    cycles += 1;
                }
            }
        }

        info!("[Analysis] Stopped after {} cycles", cycles);
        Ok(cycles)
    }

    async fn cycle(&self) -> Result<()> {
        let engine = Arc::clone(&self.engine);
        let report = tokio::task::spawn_blocking(move || engine.run_cycle())
            .await
            .context("Analysis cycle panicked")?;
        self.publisher.publish(report);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrendConfig;
    use crate::report::OutputFormat;
    use crate::types::{LimitsRegistry, OperationalLimit};
    use chrono::{Duration as ChronoDuration, Utc};

    #[tokio::test]
    async fn cancellation_runs_one_final_cycle() {
        let limits: LimitsRegistry = [("M:s".to_string(), OperationalLimit::new(0.0, 100.0))]
            .into_iter()
            .collect();
        let engine = Arc::new(TrendEngine::new(limits, TrendConfig::default()));
        let base = Utc::now();
        for i in 0..5i32 {
            engine.append("M:s", 50.0 + f64::from(i), base + ChronoDuration::seconds(i64::from(i)));
        }

        let publisher = Arc::new(ReportPublisher::new(OutputFormat::Text));
        let token = CancellationToken::new();
        let scheduler = AnalysisScheduler::new(
            Arc::clone(&engine),
            Arc::clone(&publisher),
            Duration::from_secs(3600),
            token.clone(),
        );

        token.cancel();
        let cycles = scheduler.run().await.unwrap();

        assert_eq!(cycles, 1);
        let latest = publisher.latest().unwrap();
        assert_eq!(latest.cycle, 1);
        assert!(latest.sensor_trend("M:s").is_some());
        assert_eq!(latest.range_summary.good, 1);
    }
}
