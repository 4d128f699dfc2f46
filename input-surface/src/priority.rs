// 线程调度优先级
//
// 以 nice 值表示：数值越小优先级越高。提升优先级通常需要权限，
// 失败时由调用方记录日志，不影响队列工作。

use common::PacerError;

pub const MIN_PRIORITY: i32 = -20;
pub const MAX_PRIORITY: i32 = 19;

/// 视频类线程的常用优先级
pub const PRIORITY_VIDEO: i32 = -10;

pub fn validate_priority(priority: i32) -> Result<(), PacerError> {
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        return Err(PacerError::Priority(format!(
            "priority {} out of range [{}, {}]",
            priority, MIN_PRIORITY, MAX_PRIORITY
        )));
    }
    Ok(())
}

/// 设置当前线程的优先级
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn set_current_thread_priority(priority: i32) -> Result<(), PacerError> {
    validate_priority(priority)?;

    // Linux 上 PRIO_PROCESS 配合线程 id 只作用于该线程
    let tid = unsafe { libc::syscall(libc::SYS_gettid) } as libc::id_t;
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, tid, priority) };
    if rc != 0 {
        return Err(PacerError::Priority(format!(
            "setpriority(tid={}, {}) failed: {}",
            tid,
            priority,
            std::io::Error::last_os_error()
        )));
    }
    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn set_current_thread_priority(priority: i32) -> Result<(), PacerError> {
    validate_priority(priority)?;
    Err(PacerError::Priority(
        "per-thread priority is not supported on this platform".to_string(),
    ))
}
