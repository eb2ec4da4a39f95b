use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

/// FIFO hand-off that delivers values in the order they were queued.
///
/// Values are queued while the producer still holds its own state lock, then
/// delivered by [`drain`](Self::drain) outside of it. Only one thread drains
/// at a time. A value queued during delivery (for instance by a listener
/// calling back into the manager) is delivered by the thread already
/// draining, after the value in progress.
pub struct OrderedDispatch<T> {
    queue: Mutex<Queue<T>>,
    idle: Condvar,
}

struct Queue<T> {
    items: VecDeque<T>,
    drainer: Option<ThreadId>,
}

impl<T> OrderedDispatch<T> {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(Queue {
                items: VecDeque::new(),
                drainer: None,
            }),
            idle: Condvar::new(),
        }
    }

    pub fn enqueue(&self, value: T) {
        self.lock().items.push_back(value);
    }

    /// Delivers every queued value before returning.
    ///
    /// A nested call from inside `deliver` returns at once and leaves the
    /// value to the outer loop. A call from another thread blocks until the
    /// current drainer has emptied the queue.
    pub fn drain(&self, mut deliver: impl FnMut(T)) {
        let me = thread::current().id();
        let mut queue = self.lock();
        if queue.drainer == Some(me) {
            return;
        }
        while queue.drainer.is_some() {
            queue = self
                .idle
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if queue.items.is_empty() {
            return;
        }
        queue.drainer = Some(me);
        drop(queue);

        let _guard = DrainGuard(self);
        loop {
            let next = self.lock().items.pop_front();
            match next {
                Some(value) => deliver(value),
                None => break,
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Queue<T>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for OrderedDispatch<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the drainer slot, also when a listener panics
struct DrainGuard<'a, T>(&'a OrderedDispatch<T>);

impl<T> Drop for DrainGuard<'_, T> {
    fn drop(&mut self) {
        self.0.lock().drainer = None;
        self.0.idle.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, mpsc};
    use std::time::Duration;

    #[test]
    fn test_drain_delivers_in_queue_order() {
        let dispatch = OrderedDispatch::new();
        dispatch.enqueue(1);
        dispatch.enqueue(2);
        dispatch.enqueue(3);

        let mut seen = Vec::new();
        dispatch.drain(|value| seen.push(value));
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_reentrant_enqueue_is_delivered_after_current_value() {
        let dispatch = Arc::new(OrderedDispatch::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        dispatch.enqueue(1);

        let inner_dispatch = Arc::clone(&dispatch);
        let inner_seen = Arc::clone(&seen);
        dispatch.drain(|value| {
            inner_seen.lock().unwrap().push(value);
            if value == 1 {
                inner_dispatch.enqueue(2);
                // Nested drain returns immediately; the outer loop delivers 2
                inner_dispatch.drain(|nested| inner_seen.lock().unwrap().push(nested * 100));
                inner_seen.lock().unwrap().push(10);
            }
        });

        assert_eq!(*seen.lock().unwrap(), vec![1, 10, 2]);
    }

    #[test]
    fn test_drain_from_other_thread_waits_for_delivery() {
        let dispatch = Arc::new(OrderedDispatch::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        dispatch.enqueue(1);

        let first = {
            let dispatch = Arc::clone(&dispatch);
            let seen = Arc::clone(&seen);
            thread::spawn(move || {
                dispatch.drain(|value| {
                    if value == 1 {
                        entered_tx.send(()).unwrap();
                        release_rx.recv().unwrap();
                    }
                    seen.lock().unwrap().push(value);
                });
            })
        };
        entered_rx.recv().unwrap();
        dispatch.enqueue(2);

        let second = {
            let dispatch = Arc::clone(&dispatch);
            let seen = Arc::clone(&seen);
            thread::spawn(move || {
                dispatch.drain(|value| seen.lock().unwrap().push(value));
                seen.lock().unwrap().clone()
            })
        };
        thread::sleep(Duration::from_millis(50));
        assert!(!second.is_finished());

        release_tx.send(()).unwrap();
        // Both values were delivered before the second drain returned
        assert_eq!(second.join().unwrap(), vec![1, 2]);
        first.join().unwrap();
    }
}
