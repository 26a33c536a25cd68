//! End-to-end event dispatch scenarios (S1, S2).

use std::ffi::c_void;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use vkr_config::EventManagerConfig;
use vkr_events::{Event, EventManager};

#[derive(Default)]
struct Recorder {
    count: AtomicUsize,
    last_type: AtomicU32,
    last_byte: AtomicUsize,
}

fn record_callback(event: &Event, user_data: *mut c_void) {
    let recorder = unsafe { &*(user_data as *const Recorder) };
    recorder.count.fetch_add(1, Ordering::SeqCst);
    recorder.last_type.store(event.event_type, Ordering::SeqCst);
    if let Some(ptr) = event.data {
        let byte = unsafe { *ptr.as_ptr() };
        recorder.last_byte.store(byte as usize, Ordering::SeqCst);
    }
}

fn small_config() -> EventManagerConfig {
    EventManagerConfig {
        queue_capacity: 8,
        data_buffer_capacity: 4096,
        event_type_max: 4,
    }
}

#[test]
fn event_dispatch_round_trip() {
    let manager = EventManager::new(small_config());
    let recorder = Box::into_raw(Box::new(Recorder::default()));

    assert!(manager.subscribe(1, record_callback, recorder as *mut c_void));
    assert!(manager.dispatch(1, &[42u8]));

    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if unsafe { &*recorder }.count.load(Ordering::SeqCst) == 1 {
            break;
        }
        assert!(Instant::now() < deadline, "timed out waiting for the worker to drain the event");
        std::thread::sleep(Duration::from_millis(5));
    }

    let recorder_ref = unsafe { &*recorder };
    assert_eq!(recorder_ref.last_type.load(Ordering::SeqCst), 1);
    assert_eq!(recorder_ref.last_byte.load(Ordering::SeqCst), 42);
    assert_eq!(manager.data_buffer_fill(), 0);

    manager.shutdown();
    unsafe { drop(Box::from_raw(recorder)) };
}

#[test]
fn duplicate_subscription_is_rejected() {
    let manager = EventManager::new(small_config());
    let recorder = Box::into_raw(Box::new(Recorder::default()));

    assert!(manager.subscribe(0, record_callback, recorder as *mut c_void));
    assert!(!manager.subscribe(0, record_callback, recorder as *mut c_void));
    assert!(manager.unsubscribe(0, record_callback, recorder as *mut c_void));
    assert!(!manager.unsubscribe(0, record_callback, recorder as *mut c_void));

    manager.shutdown();
    unsafe { drop(Box::from_raw(recorder)) };
}

#[test]
fn rollback_on_enqueue_failure() {
    let manager = EventManager::new(EventManagerConfig {
        queue_capacity: 0,
        data_buffer_capacity: 4096,
        event_type_max: 4,
    });

    assert_eq!(manager.data_buffer_fill(), 0);
    assert!(!manager.dispatch(0, &[1, 2, 3, 4]));
    assert_eq!(manager.data_buffer_fill(), 0);

    manager.shutdown();
}

#[test]
fn out_of_range_event_type_is_dropped_at_drain() {
    let manager = EventManager::new(small_config());
    // event_type_max is 4; dispatch accepts any u32 at enqueue time, and
    // range checking happens only at drain.
    assert!(manager.dispatch(99, &[7u8]));

    let deadline = Instant::now() + Duration::from_secs(2);
    while manager.data_buffer_fill() != 0 {
        assert!(Instant::now() < deadline, "timed out waiting for the worker to drop the event");
        std::thread::sleep(Duration::from_millis(5));
    }

    manager.shutdown();
}
