//! Multi-CPU scheduler tests
//!
//! Boots the kernel on several mock CPUs and checks the properties that only
//! show up with real concurrency: no lost wakeups, sound reparenting under
//! churn, timer-driven demotion and exclusive dispatch.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use rusty_fork::rusty_fork_test;

    use mlfq_kernel::param::{EXCLUSIVE_LEVEL, LOWEST_LEVEL, MONOPOLY_PASSWORD};
    use mlfq_kernel::proc::{self, Channel, ProcError, ProcState, QueueLevel, PTABLE};
    use mlfq_kernel::scheduler::{self, TICKS};
    use mlfq_kernel::sync::SpinLock;
    use mlfq_kernel::syscalls::{
        syscall_dispatch, SYS_GETLEV, SYS_SETMONOPOLY, SYS_SLEEP, SYS_UNMONOPOLIZE, SYS_UPTIME,
    };

    use crate::mock::{boot, park, state_of, wait_until, MACHINE, MEMORY};

    const TIMEOUT: Duration = Duration::from_secs(20);

    static DONE: AtomicBool = AtomicBool::new(false);

    fn finish() {
        DONE.store(true, Ordering::SeqCst);
        park()
    }

    fn wait_done() {
        assert!(wait_until(TIMEOUT, || DONE.load(Ordering::SeqCst)), "init never finished");
    }

    fn wait_all() -> usize {
        let mut reaped = 0;
        while proc::wait().is_ok() {
            reaped += 1;
        }
        reaped
    }

    rusty_fork_test! {
        // =====================================================================
        // Sleep / wakeup
        // =====================================================================

        #[test]
        fn test_no_lost_wakeups() {
            const ROUNDS: u32 = 300;
            static ITEMS: SpinLock<u32> = SpinLock::new("items", 0);
            static CONSUMED: AtomicUsize = AtomicUsize::new(0);

            boot(3, || {
                MACHINE.spawn_child(|| {
                    let chan = Channel::of(&ITEMS);
                    for _ in 0..ROUNDS {
                        let mut items = ITEMS.lock();
                        while *items == 0 {
                            items = scheduler::sleep(chan, items);
                        }
                        *items -= 1;
                        CONSUMED.fetch_add(1, Ordering::SeqCst);
                    }
                });
                MACHINE.spawn_child(|| {
                    for _ in 0..ROUNDS {
                        *ITEMS.lock() += 1;
                        scheduler::wakeup(Channel::of(&ITEMS));
                        scheduler::yield_now();
                    }
                });
                assert_eq!(wait_all(), 2);
                finish()
            });
            wait_done();

            assert_eq!(CONSUMED.load(Ordering::SeqCst), ROUNDS as usize);
            assert_eq!(*ITEMS.lock(), 0);
        }

        #[test]
        fn test_fork_exit_churn_across_cpus() {
            const CHILDREN: usize = 24;
            static REAPED: AtomicUsize = AtomicUsize::new(0);

            boot(4, || {
                for _ in 0..CHILDREN {
                    MACHINE.spawn_child(|| {
                        // Exits without waiting; the grandchild is orphaned.
                        MACHINE.spawn_child(scheduler::yield_now);
                        scheduler::yield_now();
                    });
                }
                REAPED.store(wait_all(), Ordering::SeqCst);
                finish()
            });
            wait_done();

            assert_eq!(REAPED.load(Ordering::SeqCst), 2 * CHILDREN);
            let table = PTABLE.lock();
            assert_eq!(table.iter().count(), 1);
            assert!(table.ready_counts_consistent());
            assert_eq!(table.exclusive_count(), 0);
            drop(table);
            assert_eq!(MEMORY.live_pages(), 1);
            assert_eq!(MEMORY.live_spaces(), 1);
        }

        // =====================================================================
        // Timer accounting
        // =====================================================================

        #[test]
        fn test_timer_demotes_by_pid_parity() {
            static LEVELS: Mutex<Vec<(i32, QueueLevel)>> = Mutex::new(Vec::new());

            fn burn(ticks: u32) {
                for _ in 0..ticks {
                    MACHINE.timer_tick();
                }
            }

            fn record() {
                let pid = proc::current_pid().unwrap();
                LEVELS.lock().unwrap().push((pid, scheduler::get_level().unwrap()));
            }

            boot(1, || {
                // pid 2: even
                MACHINE.spawn_child(|| {
                    burn(2);
                    record();
                    burn(6);
                    record();
                });
                proc::wait().unwrap();
                // pid 3: odd
                MACHINE.spawn_child(|| {
                    burn(2);
                    record();
                    burn(4);
                    record();
                });
                proc::wait().unwrap();
                finish()
            });
            wait_done();

            assert_eq!(
                *LEVELS.lock().unwrap(),
                vec![
                    (2, QueueLevel::Level(2)),
                    (2, QueueLevel::Level(LOWEST_LEVEL)),
                    (3, QueueLevel::Level(1)),
                    (3, QueueLevel::Level(LOWEST_LEVEL)),
                ]
            );
        }

        #[test]
        fn test_sleep_syscall_counts_ticks() {
            static SLEPT: AtomicI64 = AtomicI64::new(-1);

            boot(1, || {
                let sleeper = MACHINE.spawn_child(|| {
                    let start = syscall_dispatch(SYS_UPTIME, 0, 0);
                    assert_eq!(syscall_dispatch(SYS_SLEEP, 3, 0), 0);
                    SLEPT.store(syscall_dispatch(SYS_UPTIME, 0, 0) - start, Ordering::SeqCst);
                });
                MACHINE.spawn_child(move || {
                    while state_of(sleeper).is_some_and(|s| s != ProcState::Zombie) {
                        MACHINE.timer_tick();
                    }
                });
                assert_eq!(wait_all(), 2);
                finish()
            });
            wait_done();

            assert!(SLEPT.load(Ordering::SeqCst) >= 3);
            assert!(TICKS.now().uptime >= 3);
        }

        #[test]
        fn test_killed_sleeper_leaves_tick_sleep() {
            static RESULT: Mutex<Option<Result<(), ProcError>>> = Mutex::new(None);

            boot(1, || {
                let child = MACHINE.spawn_child(|| {
                    *RESULT.lock().unwrap() = Some(TICKS.sleep(1_000));
                });
                while state_of(child) != Some(ProcState::Sleeping) {
                    scheduler::yield_now();
                }
                proc::kill(child).unwrap();
                proc::wait().unwrap();
                finish()
            });
            wait_done();
            assert_eq!(*RESULT.lock().unwrap(), Some(Err(ProcError::Killed)));
        }

        // =====================================================================
        // Exclusive mode
        // =====================================================================

        #[test]
        fn test_exclusive_process_runs_alone() {
            static TARGET: AtomicI64 = AtomicI64::new(0);
            static OTHER_RUNS: AtomicUsize = AtomicUsize::new(0);
            static STOP: AtomicBool = AtomicBool::new(false);
            static REPORT: Mutex<Vec<i64>> = Mutex::new(Vec::new());

            boot(1, || {
                let target = MACHINE.spawn_child(|| {
                    while syscall_dispatch(SYS_GETLEV, 0, 0) != i64::from(EXCLUSIVE_LEVEL) {
                        scheduler::yield_now();
                    }
                    let before = OTHER_RUNS.load(Ordering::SeqCst);
                    for _ in 0..50 {
                        scheduler::yield_now();
                    }
                    let after = OTHER_RUNS.load(Ordering::SeqCst);
                    let mut report = REPORT.lock().unwrap();
                    report.push((after - before) as i64);
                    drop(report);

                    let ret = syscall_dispatch(SYS_UNMONOPOLIZE, 0, 0);
                    let level = syscall_dispatch(SYS_GETLEV, 0, 0);
                    REPORT.lock().unwrap().extend([ret, level]);
                    STOP.store(true, Ordering::SeqCst);
                });
                TARGET.store(i64::from(target), Ordering::SeqCst);

                MACHINE.spawn_child(|| {
                    let target = TARGET.load(Ordering::SeqCst) as u64;
                    let me = proc::current_pid().unwrap() as u64;
                    let pw = u64::from(MONOPOLY_PASSWORD);
                    let codes = [
                        syscall_dispatch(SYS_SETMONOPOLY, me, pw),
                        syscall_dispatch(SYS_SETMONOPOLY, 4242, pw),
                        syscall_dispatch(SYS_SETMONOPOLY, target, pw + 1),
                        syscall_dispatch(SYS_SETMONOPOLY, target, pw),
                        syscall_dispatch(SYS_SETMONOPOLY, target, pw),
                    ];
                    REPORT.lock().unwrap().extend(codes);
                    while !STOP.load(Ordering::SeqCst) {
                        OTHER_RUNS.fetch_add(1, Ordering::SeqCst);
                        scheduler::yield_now();
                    }
                });
                assert_eq!(wait_all(), 2);
                finish()
            });
            wait_done();

            let report = REPORT.lock().unwrap().clone();
            // setmonopoly: self, missing, bad secret, granted, already
            assert_eq!(&report[..5], &[-4, -1, -2, 1, -3]);
            // no other process ran while exclusive
            assert_eq!(report[5], 0);
            let level = report[7];
            assert_eq!(report[6], 0);
            assert!((0..=i64::from(LOWEST_LEVEL)).contains(&level), "level {}", level);
            assert_eq!(PTABLE.lock().exclusive_count(), 0);
        }

        #[test]
        fn test_exit_while_exclusive_clears_count() {
            boot(2, || {
                let child = MACHINE.spawn_child(|| {
                    while scheduler::get_level() != Ok(QueueLevel::Exclusive) {
                        scheduler::yield_now();
                    }
                });
                assert_eq!(scheduler::monopolize(child, MONOPOLY_PASSWORD), Ok(1));
                assert_eq!(proc::wait(), Ok(child));
                finish()
            });
            wait_done();

            let table = PTABLE.lock();
            assert_eq!(table.exclusive_count(), 0);
            assert!(table.ready_counts_consistent());
        }

        #[test]
        fn test_boost_keeps_exclusive_flag() {
            static LEVEL_AFTER_BOOST: Mutex<Option<QueueLevel>> = Mutex::new(None);

            boot(1, || {
                let child = MACHINE.spawn_child(|| {
                    while scheduler::get_level() != Ok(QueueLevel::Exclusive) {
                        scheduler::yield_now();
                    }
                    // Enough ticks on cpu0 to cross a boost.
                    for _ in 0..120 {
                        MACHINE.timer_tick();
                    }
                    *LEVEL_AFTER_BOOST.lock().unwrap() = Some(scheduler::get_level().unwrap());
                    scheduler::unmonopolize();
                });
                scheduler::monopolize(child, MONOPOLY_PASSWORD).unwrap();
                proc::wait().unwrap();
                finish()
            });
            wait_done();

            assert_eq!(*LEVEL_AFTER_BOOST.lock().unwrap(), Some(QueueLevel::Exclusive));
            assert!(TICKS.now().uptime >= 120);
            assert_eq!(PTABLE.lock().exclusive_count(), 0);
        }
    }
}
