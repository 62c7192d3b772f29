/*!
 * Construction barrier and construction failure
 */

use crate::mock_engine::{gated_factory, Probe, MockEngine, MAX_TEXTURE_SIZE};
use render_dispatch::{DispatchError, Dispatcher, DispatcherConfig, WorkerState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_direct_reads_block_until_constructed() {
    let (gate_tx, gate_rx) = flume::bounded::<()>(1);
    let dispatcher = Arc::new(
        Dispatcher::new(
            gated_factory(Probe::new(), gate_rx),
            DispatcherConfig::portable(),
        )
        .unwrap(),
    );
    let finished = Arc::new(AtomicUsize::new(0));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            let finished = finished.clone();
            thread::spawn(move || {
                let size = dispatcher.max_texture_size();
                finished.fetch_add(1, Ordering::SeqCst);
                size
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(50));
    assert_eq!(finished.load(Ordering::SeqCst), 0);
    assert!(!dispatcher.is_initialized());
    assert_eq!(dispatcher.worker_state(), WorkerState::Starting);

    gate_tx.send(()).unwrap();
    for reader in readers {
        // Never a default or zero value
        assert_eq!(reader.join().unwrap(), Ok(MAX_TEXTURE_SIZE));
    }
    assert!(dispatcher.is_initialized());
    assert!(dispatcher.supports_protected_content().unwrap());
    assert!(!dispatcher.supports_background_blur().unwrap());
    assert_eq!(dispatcher.max_viewport_dims().unwrap(), 8192);
}

#[test]
fn test_operations_queued_before_construction_run_after() {
    let (gate_tx, gate_rx) = flume::bounded::<()>(1);
    let dispatcher = Dispatcher::new(
        gated_factory(Probe::new(), gate_rx),
        DispatcherConfig::portable(),
    )
    .unwrap();

    for _ in 0..3 {
        dispatcher.run(|engine| engine.increment()).unwrap();
    }
    assert_eq!(dispatcher.pending(), 3);

    gate_tx.send(()).unwrap();
    dispatcher.wait_until_initialized().unwrap();
    assert_eq!(dispatcher.run_sync(|engine| engine.counter).unwrap(), 3);
    assert_eq!(dispatcher.worker_state(), WorkerState::Running);
}

#[test]
fn test_factory_error_fails_waiters() {
    let dispatcher = Dispatcher::<MockEngine>::new(
        || Err(anyhow::anyhow!("no display")),
        DispatcherConfig::portable(),
    )
    .unwrap();

    assert_eq!(
        dispatcher.max_texture_size(),
        Err(DispatchError::InitFailed("no display".to_string()))
    );
    assert_eq!(dispatcher.gen_textures(1), Err(DispatchError::Terminated));
    assert_eq!(dispatcher.prime_cache(), Err(DispatchError::Terminated));

    dispatcher.shutdown().unwrap();
    assert_eq!(dispatcher.worker_state(), WorkerState::Stopped);
}

#[test]
fn test_factory_panic_fails_waiters() {
    let dispatcher = Dispatcher::<MockEngine>::new(
        || -> anyhow::Result<MockEngine> { panic!("gpu reset") },
        DispatcherConfig::portable(),
    )
    .unwrap();

    match dispatcher.wait_until_initialized() {
        Err(DispatchError::InitFailed(reason)) => assert!(reason.contains("gpu reset")),
        other => panic!("unexpected {:?}", other),
    }
    assert!(dispatcher.is_initialized());
}
