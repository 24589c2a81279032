/*!
 * Real-Time Binding
 * Applies CPU affinity and the real-time scheduling class to the calling thread
 *
 * Only dedicated activity threads call into this module, right before their
 * drive loop starts. Failures are reported to the caller; the activity turns
 * them into a fatal exit.
 */

use super::policy::{RealtimePolicy, SchedulePolicy};
use crate::core::errors::ScheduleResult;
use crate::core::types::ActivityId;
use log::debug;

/// Apply the placement and real-time class of `policy` to the current thread
pub fn apply(policy: &SchedulePolicy, id: ActivityId) -> ScheduleResult<()> {
    let cores = policy.cpu_set();
    if !cores.is_empty() {
        platform::set_affinity(&cores)?;
        debug!("Activity {} pinned to cores {:?}", id, cores);
    }

    let realtime = policy.effective_realtime();
    if realtime == RealtimePolicy::None {
        return Ok(());
    }

    platform::set_policy(policy, realtime)?;
    debug!("Activity {} running under {}", id, realtime);
    Ok(())
}

#[cfg(target_os = "linux")]
mod platform {
    use super::super::policy::{RealtimePolicy, SchedulePolicy};
    use crate::core::errors::{ScheduleError, ScheduleResult};
    use crate::core::types::CoreId;
    use nix::errno::Errno;
    use nix::libc;
    use nix::sched::{sched_setaffinity, CpuSet};
    use nix::unistd::Pid;

    /// SCHED_DEADLINE class id (not exported by every libc target)
    const SCHED_DEADLINE: u32 = 6;

    /// Kernel `struct sched_attr` (include/uapi/linux/sched/types.h)
    #[repr(C)]
    #[derive(Debug, Default)]
    struct SchedAttr {
        size: u32,
        sched_policy: u32,
        sched_flags: u64,
        sched_nice: i32,
        sched_priority: u32,
        sched_runtime: u64,
        sched_deadline: u64,
        sched_period: u64,
    }

    pub(super) fn set_affinity(cores: &[CoreId]) -> ScheduleResult<()> {
        let mut set = CpuSet::new();
        for &core in cores {
            set.set(core).map_err(|_| ScheduleError::InvalidCore(core))?;
        }

        // Pid 0 targets the calling thread
        sched_setaffinity(Pid::from_raw(0), &set).map_err(|errno| ScheduleError::AffinityFailed {
            cores: cores.to_vec(),
            reason: errno.desc().to_string(),
        })
    }

    pub(super) fn set_policy(policy: &SchedulePolicy, realtime: RealtimePolicy) -> ScheduleResult<()> {
        let result = match realtime {
            RealtimePolicy::None => return Ok(()),
            RealtimePolicy::Fifo => set_priority_class(libc::SCHED_FIFO, policy.priority),
            RealtimePolicy::RoundRobin => set_priority_class(libc::SCHED_RR, policy.priority),
            RealtimePolicy::Deadline => set_deadline(policy),
        };

        result.map_err(|errno| ScheduleError::PolicyFailed {
            policy: realtime.to_string(),
            reason: errno.desc().to_string(),
        })
    }

    fn set_priority_class(class: libc::c_int, priority: i32) -> Result<(), Errno> {
        // SAFETY: sched_param is plain old data; zeroing covers the extra
        // fields some libc targets carry.
        let mut param: libc::sched_param = unsafe { std::mem::zeroed() };
        param.sched_priority = priority;

        // SAFETY: param outlives the call; pid 0 is the calling thread
        let ret = unsafe { libc::sched_setscheduler(0, class, &param) };
        Errno::result(ret).map(drop)
    }

    fn set_deadline(policy: &SchedulePolicy) -> Result<(), Errno> {
        let attr = SchedAttr {
            size: std::mem::size_of::<SchedAttr>() as u32,
            sched_policy: SCHED_DEADLINE,
            sched_runtime: policy.runtime_ns,
            sched_deadline: policy.effective_deadline_ns(),
            sched_period: policy.period_ns(),
            ..SchedAttr::default()
        };

        // SAFETY: attr is a valid, fully initialised sched_attr for the
        // duration of the syscall
        let ret = unsafe {
            libc::syscall(
                libc::SYS_sched_setattr,
                0 as libc::pid_t,
                &attr as *const SchedAttr,
                0 as libc::c_uint,
            )
        };
        Errno::result(ret).map(drop)
    }
}

#[cfg(not(target_os = "linux"))]
mod platform {
    use super::super::policy::{RealtimePolicy, SchedulePolicy};
    use crate::core::errors::ScheduleResult;
    use crate::core::types::CoreId;
    use log::warn;

    pub(super) fn set_affinity(cores: &[CoreId]) -> ScheduleResult<()> {
        warn!("CPU affinity {:?} not supported on this platform; ignored", cores);
        Ok(())
    }

    pub(super) fn set_policy(_policy: &SchedulePolicy, realtime: RealtimePolicy) -> ScheduleResult<()> {
        warn!("{} not supported on this platform; ignored", realtime);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_noop() {
        assert!(apply(&SchedulePolicy::periodic(10), 0).is_ok());
        assert!(apply(&SchedulePolicy::triggered(), 0).is_ok());
    }

    #[test]
    fn test_triggered_skips_realtime_class() {
        // FIFO would need privileges; a triggered policy must never request it
        let policy = SchedulePolicy {
            realtime: RealtimePolicy::Fifo,
            priority: 90,
            ..SchedulePolicy::triggered()
        };
        assert!(apply(&policy, 0).is_ok());
    }
}
