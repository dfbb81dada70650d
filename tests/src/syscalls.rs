//! System call layer tests
//!
//! Calls made from the test thread have no current process, which is how
//! the error paths that need no process table are reached.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serial_test::serial;

    use mlfq_kernel::param::MONOPOLY_PASSWORD;
    use mlfq_kernel::syscalls::*;

    use crate::mock;

    // =========================================================================
    // Numbering
    // =========================================================================

    #[test]
    fn test_syscall_numbers_distinct() {
        let numbers = [
            SYS_FORK,
            SYS_EXIT,
            SYS_WAIT,
            SYS_KILL,
            SYS_GETPID,
            SYS_SBRK,
            SYS_SLEEP,
            SYS_UPTIME,
            SYS_YIELD,
            SYS_GETLEV,
            SYS_SETPRIORITY,
            SYS_SETMONOPOLY,
            SYS_UNMONOPOLIZE,
        ];
        let unique: HashSet<_> = numbers.iter().collect();
        assert_eq!(unique.len(), numbers.len());
        assert!(numbers.iter().all(|&nr| nr > 0));
    }

    // =========================================================================
    // Error codes
    // =========================================================================

    #[test]
    #[serial]
    fn test_unknown_syscall() {
        mock::install();
        assert_eq!(syscall_dispatch(0, 0, 0), -1);
        assert_eq!(syscall_dispatch(999, 1, 2), -1);
    }

    #[test]
    #[serial]
    fn test_setpriority_codes() {
        mock::install();
        assert_eq!(syscall_dispatch(SYS_SETPRIORITY, 4242, 11), -2);
        assert_eq!(syscall_dispatch(SYS_SETPRIORITY, 4242, (-1i32) as u32 as u64), -2);
        assert_eq!(syscall_dispatch(SYS_SETPRIORITY, 4242, 5), -1);
    }

    #[test]
    #[serial]
    fn test_calls_without_process() {
        mock::install();
        assert_eq!(syscall_dispatch(SYS_GETLEV, 0, 0), -1);
        assert_eq!(syscall_dispatch(SYS_GETPID, 0, 0), -1);
        assert_eq!(syscall_dispatch(SYS_FORK, 0, 0), -1);
        assert_eq!(syscall_dispatch(SYS_WAIT, 0, 0), -1);
        assert_eq!(syscall_dispatch(SYS_SBRK, 4096, 0), -1);
        assert_eq!(syscall_dispatch(SYS_KILL, 4242, 0), -1);
        assert_eq!(syscall_dispatch(SYS_UNMONOPOLIZE, 0, 0), 0);
    }

    #[test]
    #[serial]
    fn test_setmonopoly_unknown_pid() {
        mock::install();
        let pw = u64::from(MONOPOLY_PASSWORD);
        assert_eq!(syscall_dispatch(SYS_SETMONOPOLY, 4242, pw), -1);
        assert_eq!(syscall_dispatch(SYS_SETMONOPOLY, 4242, pw + 1), -1);
    }

    #[test]
    #[serial]
    fn test_uptime_non_negative() {
        mock::install();
        assert!(syscall_dispatch(SYS_UPTIME, 0, 0) >= 0);
    }
}
