/*!
 * Shutdown policies, reentry and teardown
 */

use crate::mock_engine::{factory, gated_factory, wait_for, Probe};
use render_dispatch::{
    DispatchError, Dispatcher, DispatcherConfig, QueueStats, ShutdownPolicy, WorkerState,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Three blocking calls parked behind a gated factory, then shutdown
fn shutdown_with_three_pending(
    policy: ShutdownPolicy,
) -> (Vec<render_dispatch::DispatchResult<Vec<u32>>>, QueueStats) {
    let (gate_tx, gate_rx) = flume::bounded::<()>(1);
    let config = DispatcherConfig::portable().with_shutdown_policy(policy);
    let dispatcher =
        Arc::new(Dispatcher::new(gated_factory(Probe::new(), gate_rx), config).unwrap());

    let callers: Vec<_> = (0..3)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            thread::spawn(move || dispatcher.gen_textures(2))
        })
        .collect();
    assert!(wait_for(|| dispatcher.pending() == 3));

    let closer = {
        let dispatcher = dispatcher.clone();
        thread::spawn(move || dispatcher.shutdown())
    };
    assert!(wait_for(|| !dispatcher.is_running()));
    gate_tx.send(()).unwrap();

    closer.join().unwrap().unwrap();
    let results = callers.into_iter().map(|c| c.join().unwrap()).collect();
    assert_eq!(dispatcher.worker_state(), WorkerState::Stopped);
    (results, dispatcher.stats())
}

#[test]
fn test_abandon_fails_pending_blocking_calls() {
    let (results, stats) = shutdown_with_three_pending(ShutdownPolicy::Abandon);

    assert!(results.iter().all(|r| *r == Err(DispatchError::Terminated)));
    assert_eq!(
        stats,
        QueueStats {
            submitted: 3,
            executed: 0,
            abandoned: 3
        }
    );
}

#[test]
fn test_drain_completes_pending_blocking_calls() {
    let (results, stats) = shutdown_with_three_pending(ShutdownPolicy::Drain);

    let mut names: Vec<u32> = results.into_iter().flat_map(|r| r.unwrap()).collect();
    names.sort_unstable();
    assert_eq!(names, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(stats.executed, 3);
    assert_eq!(stats.abandoned, 0);
}

#[test]
fn test_submission_after_shutdown_is_terminated() {
    let probe = Probe::new();
    let dispatcher = Dispatcher::new(factory(probe.clone()), DispatcherConfig::portable()).unwrap();
    dispatcher.prime_cache().unwrap();

    dispatcher.shutdown().unwrap();
    assert!(probe.dropped_on.lock().is_some());
    assert_eq!(dispatcher.shutdown(), Err(DispatchError::AlreadyShutDown));
    assert_eq!(dispatcher.prime_cache(), Err(DispatchError::Terminated));
    assert_eq!(dispatcher.is_protected(), Err(DispatchError::Terminated));
    // Construction-time properties stay readable
    assert_eq!(dispatcher.max_texture_size(), Ok(4096));
}

#[test]
fn test_drop_joins_worker() {
    let probe = Probe::new();
    let dispatcher = Dispatcher::new(factory(probe.clone()), DispatcherConfig::portable()).unwrap();
    dispatcher.run(|engine| engine.increment()).unwrap();
    drop(dispatcher);

    assert!(probe.dropped_on.lock().is_some());
    assert_ne!(*probe.dropped_on.lock(), Some(thread::current().id()));
}

#[test]
fn test_last_handle_dropped_on_worker_stops_engine() {
    let probe = Probe::new();
    let dispatcher = Arc::new(
        Dispatcher::new(factory(probe.clone()), DispatcherConfig::portable()).unwrap(),
    );
    let test_thread = thread::current().id();

    let inner = dispatcher.clone();
    dispatcher
        .run(move |_| {
            thread::sleep(Duration::from_millis(100));
            drop(inner);
        })
        .unwrap();
    drop(dispatcher);

    assert!(wait_for(|| probe.dropped_on.lock().is_some()));
    assert_ne!(*probe.dropped_on.lock(), Some(test_thread));
}

#[test]
fn test_diagnostics_from_worker_do_not_block() {
    let dispatcher = Arc::new(
        Dispatcher::new(factory(Probe::new()), DispatcherConfig::portable()).unwrap(),
    );
    dispatcher.prime_cache().unwrap();

    let (tx, rx) = flume::bounded(1);
    let inner = dispatcher.clone();
    dispatcher
        .run(move |_| {
            let _ = tx.send((
                inner.pending(),
                inner.is_running(),
                inner.stats(),
                inner.worker_state(),
            ));
        })
        .unwrap();

    let (pending, running, stats, state) = rx.recv_timeout(Duration::from_secs(3)).unwrap();
    assert_eq!(pending, 0);
    assert!(running);
    assert_eq!(stats.submitted, 2);
    assert_eq!(stats.executed, 2);
    assert_eq!(state, WorkerState::Running);
}

#[test]
fn test_calls_from_worker_are_rejected() {
    let dispatcher = Arc::new(
        Dispatcher::new(factory(Probe::new()), DispatcherConfig::portable()).unwrap(),
    );

    let inner = dispatcher.clone();
    let (sync_call, async_call, stop) = dispatcher
        .run_sync(move |_| (inner.gen_textures(1), inner.prime_cache(), inner.shutdown()))
        .unwrap();

    assert_eq!(sync_call, Err(DispatchError::WorkerReentry { op: "gen_textures" }));
    assert_eq!(async_call, Err(DispatchError::WorkerReentry { op: "prime_cache" }));
    assert_eq!(stop, Err(DispatchError::WorkerReentry { op: "shutdown" }));

    // The worker is still serving
    assert_eq!(dispatcher.gen_textures(1).unwrap().len(), 1);
}

#[test]
fn test_panicking_operation_does_not_stop_worker() {
    let dispatcher = Dispatcher::new(factory(Probe::new()), DispatcherConfig::portable()).unwrap();

    let result: render_dispatch::DispatchResult<()> =
        dispatcher.run_sync(|_| panic!("bad frame"));
    assert_eq!(result, Err(DispatchError::OperationPanicked { op: "sync_task" }));

    dispatcher.run(|_| panic!("bad async frame")).unwrap();
    dispatcher.run(|engine| engine.increment()).unwrap();
    assert_eq!(dispatcher.run_sync(|engine| engine.counter).unwrap(), 1);
}
