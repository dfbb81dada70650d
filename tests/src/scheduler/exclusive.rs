//! Priority control and exclusive mode tests

#[cfg(test)]
mod tests {
    use mlfq_kernel::param::{MAX_PRIORITY, MONOPOLY_PASSWORD};
    use mlfq_kernel::proc::{Channel, ProcError, ProcHandle, ProcState, ProcTable, QueueLevel};

    fn runnable_at(table: &mut ProcTable, level: u8) -> ProcHandle {
        let handle = table.alloc().unwrap();
        table.get_mut(handle).unwrap().level = level;
        table.make_runnable(handle);
        handle
    }

    // =========================================================================
    // setpriority
    // =========================================================================

    #[test]
    fn test_set_priority_range_checked_before_pid() {
        let mut table = ProcTable::new();
        assert_eq!(table.set_priority(999, 11), Err(ProcError::PriorityOutOfRange));
        assert_eq!(table.set_priority(999, -1), Err(ProcError::PriorityOutOfRange));
        assert_eq!(table.set_priority(999, 5), Err(ProcError::NotFound));
    }

    #[test]
    fn test_set_priority_bounds() {
        let mut table = ProcTable::new();
        let handle = runnable_at(&mut table, 3);
        let pid = table[handle].pid;

        assert_eq!(table.set_priority(pid, 0), Ok(()));
        assert_eq!(table.set_priority(pid, MAX_PRIORITY as i32), Ok(()));
        assert_eq!(table[handle].priority, MAX_PRIORITY);
        assert_eq!(
            table.set_priority(pid, MAX_PRIORITY as i32 + 1),
            Err(ProcError::PriorityOutOfRange)
        );
        assert_eq!(table.set_priority(pid, i32::MIN), Err(ProcError::PriorityOutOfRange));
        assert_eq!(table[handle].priority, MAX_PRIORITY);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ProcError::NotFound.code(), -1);
        assert_eq!(ProcError::PriorityOutOfRange.code(), -2);
        assert_eq!(ProcError::BadSecret.code(), -2);
        assert_eq!(ProcError::AlreadyExclusive.code(), -3);
        assert_eq!(ProcError::SelfTarget.code(), -4);
        assert_eq!(ProcError::NoChildren.code(), -1);
        assert_eq!(ProcError::BadSecret.to_string(), "bad password");
    }

    // =========================================================================
    // monopolize
    // =========================================================================

    #[test]
    fn test_monopolize_error_order() {
        let mut table = ProcTable::new();
        let caller = runnable_at(&mut table, 0);
        let target = runnable_at(&mut table, 0);
        let (caller_pid, target_pid) = (table[caller].pid, table[target].pid);

        // Self first, even with a bad secret.
        assert_eq!(
            table.monopolize(Some(caller_pid), caller_pid, 1),
            Err(ProcError::SelfTarget)
        );
        // Unknown pid before the secret is checked.
        assert_eq!(
            table.monopolize(Some(caller_pid), 4242, 1),
            Err(ProcError::NotFound)
        );
        assert_eq!(
            table.monopolize(Some(caller_pid), target_pid, MONOPOLY_PASSWORD + 1),
            Err(ProcError::BadSecret)
        );
        assert_eq!(
            table.monopolize(Some(caller_pid), target_pid, MONOPOLY_PASSWORD),
            Ok(1)
        );
        assert_eq!(
            table.monopolize(Some(caller_pid), target_pid, MONOPOLY_PASSWORD),
            Err(ProcError::AlreadyExclusive)
        );
    }

    #[test]
    fn test_bad_secret_changes_nothing() {
        let mut table = ProcTable::new();
        let target = runnable_at(&mut table, 2);
        let pid = table[target].pid;

        assert!(table.monopolize(None, pid, 0).is_err());
        assert!(!table[target].monopolize);
        assert_eq!(table.exclusive_count(), 0);
        assert_eq!(table.ready_count(2), 1);
    }

    #[test]
    fn test_monopolize_returns_exclusive_count() {
        let mut table = ProcTable::new();
        let pids: Vec<_> = (0..3)
            .map(|_| {
                let handle = runnable_at(&mut table, 0);
                table[handle].pid
            })
            .collect();

        for (n, &pid) in pids.iter().enumerate() {
            assert_eq!(table.monopolize(None, pid, MONOPOLY_PASSWORD), Ok(n + 1));
        }
        assert_eq!(table.exclusive_count(), 3);
        assert_eq!(table.ready_count(0), 0);
    }

    #[test]
    fn test_monopolize_leaves_ready_counts_consistent() {
        let mut table = ProcTable::new();
        let queued = runnable_at(&mut table, 1);
        let asleep = runnable_at(&mut table, 1);
        table.dispatch(asleep);
        table.block(asleep, Channel::new(3));
        assert_eq!(table.ready_count(1), 1);

        for handle in [queued, asleep] {
            let pid = table[handle].pid;
            table.monopolize(None, pid, MONOPOLY_PASSWORD).unwrap();
            assert!(table.ready_counts_consistent());
        }
        assert_eq!(table.ready_count(1), 0);

        // An exclusive sleeper does not rejoin the counts on wakeup.
        table.wakeup(Channel::new(3));
        assert_eq!(table[asleep].state, ProcState::Runnable);
        assert_eq!(table.ready_count(1), 0);
        assert!(table.ready_counts_consistent());
    }

    // =========================================================================
    // unmonopolize and getlev
    // =========================================================================

    #[test]
    fn test_unmonopolize_requeues_runnable() {
        let mut table = ProcTable::new();
        let handle = runnable_at(&mut table, 2);
        let pid = table[handle].pid;
        table.monopolize(None, pid, MONOPOLY_PASSWORD).unwrap();
        assert_eq!(table.queue_level(handle), QueueLevel::Exclusive);

        assert!(table.unmonopolize(handle));
        assert_eq!(table.exclusive_count(), 0);
        assert_eq!(table.ready_count(2), 1);
        assert_eq!(table.queue_level(handle), QueueLevel::Level(2));
        assert!(table.ready_counts_consistent());

        assert!(!table.unmonopolize(handle));
        assert_eq!(table.ready_count(2), 1);
    }

    #[test]
    fn test_unmonopolize_running_process() {
        let mut table = ProcTable::new();
        let handle = runnable_at(&mut table, 0);
        let pid = table[handle].pid;
        table.monopolize(None, pid, MONOPOLY_PASSWORD).unwrap();
        table.dispatch(handle);

        assert!(table.unmonopolize(handle));
        assert_eq!(table.ready_count(0), 0);
        table.make_runnable(handle);
        assert_eq!(table.ready_count(0), 1);
        assert!(table.ready_counts_consistent());
    }
}
