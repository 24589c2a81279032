/*!
 * Drive Loop
 * The periodic / triggered loop shared by inline and dedicated activities
 */

use super::runnable::Runnable;
use super::trigger::TriggerGate;
use super::ExecutionMode;
use crate::scheduler::SchedulePolicy;
use log::debug;
use std::sync::Arc;
use std::time::Instant;

/// Run the full activity lifecycle on the current thread
///
/// init all -> loop until stopping -> mark inactive -> finalize all.
pub(super) fn run(
    mode: ExecutionMode,
    policy: &SchedulePolicy,
    gate: &TriggerGate,
    runnables: &[Arc<dyn Runnable>],
) {
    for runnable in runnables {
        runnable.init();
    }

    if policy.is_periodic() {
        run_periodic(mode, policy, gate, runnables);
    } else {
        run_triggered(gate, runnables);
    }

    gate.set_inactive();

    for runnable in runnables {
        runnable.finalize();
    }
}

fn run_periodic(
    mode: ExecutionMode,
    policy: &SchedulePolicy,
    gate: &TriggerGate,
    runnables: &[Arc<dyn Runnable>],
) {
    let period = policy.period();

    while !gate.is_stopping() {
        let deadline = Instant::now() + period;

        for runnable in runnables {
            runnable.step();
        }

        match mode {
            ExecutionMode::Dedicated => gate.sleep_until(deadline),
            // Plain sleep: stop() is only observed at the next iteration
            ExecutionMode::Inline => {
                let now = Instant::now();
                if deadline > now {
                    std::thread::sleep(deadline - now);
                }
            }
        }
    }
}

fn run_triggered(gate: &TriggerGate, runnables: &[Arc<dyn Runnable>]) {
    while gate.wait_trigger() {
        for runnable in runnables {
            runnable.step();
        }
    }

    if let Some(first) = runnables.first() {
        debug!("Stopping activity with task: {}", first.label());
    }
}
