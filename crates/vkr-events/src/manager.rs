//! Multi-producer/single-consumer event dispatch over the ring buffer in
//! [`crate::buffer`].
//!
//! `Event` is a small owned value wrapping a raw pointer, made `Send` by an
//! explicit `unsafe impl` because the caller (here, the manager's own mutex)
//! is what actually makes access safe, not the type system.

use std::ffi::c_void;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::collections::VecDeque;
use std::ptr::NonNull;

use log::{debug, warn};
use smallvec::SmallVec;

use vkr_alloc::{Arena, ArenaFlags};
use vkr_config::EventManagerConfig;

use crate::buffer::EventDataBuffer;

/// `{ type, data: pointer into the event-data buffer (or none), data_size }`.
/// The pointer is only ever dereferenced while the owning manager's mutex is
/// held or after it has been copied into the worker's thread-local arena.
#[derive(Copy, Clone)]
pub struct Event {
    pub event_type: u32,
    pub data: Option<NonNull<u8>>,
    pub data_size: u64,
}

unsafe impl Send for Event {}

pub type EventCallback = fn(&Event, *mut c_void);

#[derive(Copy, Clone)]
struct Subscription {
    callback: EventCallback,
    user_data: *mut c_void,
}

unsafe impl Send for Subscription {}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::fn_addr_eq(self.callback, other.callback) && self.user_data == other.user_data
    }
}

struct Inner {
    event_queue: VecDeque<Event>,
    callbacks: Vec<SmallVec<[Subscription; 4]>>,
    data_buf: EventDataBuffer,
    running: bool,
}

/// Owns the event queue, per-type subscriber lists, and the data buffer
/// behind a single mutex/condvar pair, plus the worker thread that drains
/// them. The drain loop's own arena is created inside the worker closure
/// rather than shared in, since it has exactly one reader and never needs to
/// cross a thread boundary.
pub struct EventManager {
    shared: Arc<(Mutex<Inner>, Condvar)>,
    queue_capacity: usize,
    event_type_max: usize,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EventManager {
    pub fn new(config: EventManagerConfig) -> EventManager {
        let inner = Inner {
            event_queue: VecDeque::with_capacity(config.queue_capacity),
            callbacks: vec![SmallVec::new(); config.event_type_max],
            data_buf: EventDataBuffer::create(config.data_buffer_capacity),
            running: true,
        };
        let shared = Arc::new((Mutex::new(inner), Condvar::new()));
        let worker_shared = shared.clone();
        let event_type_max = config.event_type_max;
        let worker = std::thread::Builder::new()
            .name("vkr-event-drain".to_string())
            .spawn(move || Self::drain_loop(worker_shared, event_type_max))
            .expect("failed to spawn event manager worker thread");
        EventManager {
            shared,
            queue_capacity: config.queue_capacity,
            event_type_max,
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn event_type_max(&self) -> usize {
        self.event_type_max
    }

    /// Diagnostic accessor for the data buffer's current fill level, for
    /// debug logging.
    pub fn data_buffer_fill(&self) -> usize {
        self.shared.0.lock().unwrap().data_buf.fill()
    }

    /// Reserves a slot in the data buffer (if `data` is non-empty), enqueues
    /// the event, and wakes the worker. On any failure the reservation is
    /// rolled back and no event is enqueued.
    pub fn dispatch(&self, event_type: u32, data: &[u8]) -> bool {
        let (mutex, condvar) = &*self.shared;
        let mut guard = mutex.lock().unwrap();

        let data_size = data.len();
        let data_ptr = if data_size > 0 {
            if !guard.data_buf.can_alloc(data_size) {
                warn!(
                    "event manager: data buffer full or fragmented, dropping event type {}",
                    event_type
                );
                return false;
            }
            match guard.data_buf.alloc(data_size) {
                Some(ptr) => {
                    unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr(), data_size) };
                    Some(ptr)
                }
                None => {
                    warn!(
                        "event manager: data buffer alloc failed, dropping event type {}",
                        event_type
                    );
                    return false;
                }
            }
        } else {
            None
        };

        if guard.event_queue.len() >= self.queue_capacity {
            if data_ptr.is_some() {
                guard.data_buf.rollback_last_alloc();
            }
            warn!("event manager: dispatch queue full, dropping event type {}", event_type);
            return false;
        }

        guard.event_queue.push_back(Event {
            event_type,
            data: data_ptr,
            data_size: data_size as u64,
        });
        drop(guard);
        condvar.notify_one();
        true
    }

    /// Rejects an exact duplicate `(callback, user_data)` pair.
    pub fn subscribe(&self, event_type: u32, callback: EventCallback, user_data: *mut c_void) -> bool {
        assert!((event_type as usize) < self.event_type_max, "event type out of range");
        let (mutex, _) = &*self.shared;
        let mut guard = mutex.lock().unwrap();
        let candidate = Subscription { callback, user_data };
        let list = &mut guard.callbacks[event_type as usize];
        if list.iter().any(|s| *s == candidate) {
            debug!("event manager: duplicate subscription rejected for type {}", event_type);
            return false;
        }
        list.push(candidate);
        true
    }

    pub fn unsubscribe(&self, event_type: u32, callback: EventCallback, user_data: *mut c_void) -> bool {
        assert!((event_type as usize) < self.event_type_max, "event type out of range");
        let (mutex, _) = &*self.shared;
        let mut guard = mutex.lock().unwrap();
        let candidate = Subscription { callback, user_data };
        let list = &mut guard.callbacks[event_type as usize];
        if let Some(pos) = list.iter().position(|s| *s == candidate) {
            list.remove(pos);
            true
        } else {
            false
        }
    }

    fn drain_loop(shared: Arc<(Mutex<Inner>, Condvar)>, event_type_max: usize) {
        let (mutex, condvar) = &*shared;
        // Owned solely by this thread: never shared, so no `Send` bound is
        // needed even though `Arena` holds a raw pointer internally.
        let arena = Arena::create(1024 * 1024, 64 * 1024, ArenaFlags::NONE);
        loop {
            let event = {
                let mut guard = mutex.lock().unwrap();
                while guard.event_queue.is_empty() && guard.running {
                    guard = condvar.wait(guard).unwrap();
                }
                let should_run = guard.running || !guard.event_queue.is_empty();
                if !should_run {
                    break;
                }
                match guard.event_queue.pop_front() {
                    Some(event) => event,
                    None => break,
                }
            };

            if event.event_type as usize >= event_type_max {
                warn!("event manager: dropping out-of-range event type {}", event.event_type);
                if event.data.is_some() {
                    let mut guard = mutex.lock().unwrap();
                    guard.data_buf.free(event.data_size as usize);
                }
                continue;
            }

            let scope = arena.begin_scope();
            let (local_data, callbacks_snapshot) = {
                let mut guard = mutex.lock().unwrap();
                let local_data = if event.data_size > 0 {
                    let size = event.data_size as usize;
                    let ptr = arena
                        .alloc(size)
                        .expect("event manager worker arena exhausted copying event payload");
                    unsafe {
                        std::ptr::copy_nonoverlapping(
                            event.data.expect("data_size > 0 implies a data pointer").as_ptr(),
                            ptr.as_ptr(),
                            size,
                        );
                    }
                    guard.data_buf.free(size);
                    Some(ptr)
                } else {
                    None
                };
                let snapshot = guard.callbacks[event.event_type as usize].clone();
                (local_data, snapshot)
            };

            let local_event = Event {
                event_type: event.event_type,
                data: local_data,
                data_size: event.data_size,
            };
            for sub in &callbacks_snapshot {
                (sub.callback)(&local_event, sub.user_data);
            }
            scope.end();
        }
    }

    /// Stops the worker cooperatively: it drains whatever is left in the
    /// queue before exiting.
    pub fn shutdown(&self) {
        {
            let (mutex, condvar) = &*self.shared;
            let mut guard = mutex.lock().unwrap();
            guard.running = false;
            condvar.notify_one();
        }
        if let Some(handle) = self.worker.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for EventManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
