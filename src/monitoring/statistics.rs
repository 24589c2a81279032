/*!
 * Statistics Reporter
 * Periodic dump of per-task timing statistics
 */

use crate::registry::ComponentRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Log the timing statistics of every task driven by an engine
///
/// Returns the number of tasks reported.
pub fn log_statistics(registry: &ComponentRegistry) -> usize {
    let mut tasks: Vec<_> = registry.tasks().into_iter().collect();
    tasks.sort_by(|a, b| a.0.cmp(&b.0));

    let mut reported = 0;
    for (name, task) in tasks {
        let Some(engine) = task.engine() else {
            continue;
        };

        let stats = engine.time_stats();
        info!(
            task = %name,
            iterations = stats.iterations,
            total_s = stats.total,
            mean_s = stats.mean,
            variance = stats.variance,
            service_mean_s = stats.service_mean,
            service_variance = stats.service_variance,
            min_s = stats.min,
            max_s = stats.max,
            "task statistics"
        );
        reported += 1;
    }
    reported
}

/// Control messages for the statistics task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatisticsCommand {
    /// Report immediately
    Flush,
    Shutdown,
}

/// Handle to the statistics background task
pub struct StatisticsTask {
    command_tx: mpsc::UnboundedSender<StatisticsCommand>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl StatisticsTask {
    /// Spawn the reporter on the current tokio runtime
    pub fn spawn(registry: Arc<ComponentRegistry>, interval: Duration) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            run_statistics_loop(registry, interval, command_rx).await;
        });

        info!(interval_ms = interval.as_millis() as u64, "Statistics task spawned");

        Self {
            command_tx,
            handle: Some(handle),
        }
    }

    pub fn flush(&self) {
        let _ = self.command_tx.send(StatisticsCommand::Flush);
    }

    /// Stop the reporter after one final report
    pub async fn shutdown(mut self) {
        let _ = self.command_tx.send(StatisticsCommand::Shutdown);

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Statistics task shutdown error: {}", e);
            }
        }
    }
}

async fn run_statistics_loop(
    registry: Arc<ComponentRegistry>,
    period: Duration,
    mut command_rx: mpsc::UnboundedReceiver<StatisticsCommand>,
) {
    let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick completes immediately
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                log_statistics(&registry);
            }

            cmd = command_rx.recv() => {
                match cmd {
                    Some(StatisticsCommand::Flush) => {
                        log_statistics(&registry);
                    }
                    Some(StatisticsCommand::Shutdown) | None => {
                        log_statistics(&registry);
                        info!("Statistics task shutting down");
                        break;
                    }
                }
            }
        }
    }
}

impl Drop for StatisticsTask {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.command_tx.send(StatisticsCommand::Shutdown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_statistics_task_lifecycle() {
        let registry = Arc::new(ComponentRegistry::new());
        let task = StatisticsTask::spawn(registry, Duration::from_millis(5));

        task.flush();
        tokio::time::sleep(Duration::from_millis(20)).await;

        task.shutdown().await;
    }

    #[test]
    fn test_log_statistics_skips_tasks_without_engine() {
        use crate::registry::ComponentSpec;
        use crate::task::Component;

        #[derive(Default)]
        struct Noop;
        impl Component for Noop {
            fn on_update(&mut self) {}
        }

        let registry = ComponentRegistry::new();
        registry.add_spec(ComponentSpec::of::<Noop>("Noop"));
        registry.create("Noop", "n").unwrap();
        assert_eq!(log_statistics(&registry), 0);
    }
}
