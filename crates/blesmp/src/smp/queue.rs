//! The serialized event stream feeding a pairing session
//!
//! All external inputs (peer SMP PDUs, HCI events, UI answers, the exit
//! signal) are funneled into one bounded FIFO. The pairing worker is the
//! only consumer; producers lock, push, unlock, then notify.

use super::types::UiAction;
use log::warn;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// An event sent into the pairing worker from the outside world
#[derive(Debug, Clone)]
pub enum PairingEvent {
    /// Abort the pairing immediately; also synthesized when a wait times
    /// out
    Exit,
    /// An SMP PDU received on L2CAP CID 0x0006
    Pdu(Vec<u8>),
    /// A raw HCI event packet (`[code, len, params...]`)
    Hci(Vec<u8>),
    /// An answer from the user interface
    Ui(UiAction, u32),
}

/// Upper bound on queued events; producers beyond it are dropped with a
/// warning rather than growing without limit
const QUEUE_CAPACITY: usize = 32;

/// Bounded multi-producer single-consumer FIFO with a timed blocking wait
pub(crate) struct EventQueue {
    queue: Mutex<VecDeque<PairingEvent>>,
    blocker: Condvar,
    timeout: Duration,
}

impl EventQueue {
    pub fn new(timeout: Duration) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            blocker: Condvar::new(),
            timeout,
        }
    }

    /// Enqueue an event and wake the worker
    pub fn push(&self, event: PairingEvent) {
        {
            let mut queue = match self.queue.lock() {
                Ok(queue) => queue,
                Err(poisoned) => poisoned.into_inner(),
            };

            if queue.len() >= QUEUE_CAPACITY {
                warn!("pairing event queue full, dropping {:?}", event);
                return;
            }

            queue.push_back(event);
        }

        self.blocker.notify_one();
    }

    /// Block until an event arrives. Each call gets its own timeout
    /// deadline; expiry yields a synthetic [`PairingEvent::Exit`].
    pub fn wait(&self) -> PairingEvent {
        let deadline = Instant::now() + self.timeout;

        let mut queue = match self.queue.lock() {
            Ok(queue) => queue,
            Err(poisoned) => poisoned.into_inner(),
        };

        loop {
            if let Some(event) = queue.pop_front() {
                return event;
            }

            let remaining = match deadline.checked_duration_since(Instant::now()) {
                Some(remaining) if !remaining.is_zero() => remaining,
                _ => return PairingEvent::Exit,
            };

            queue = match self.blocker.wait_timeout(queue, remaining) {
                Ok((queue, _)) => queue,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_events_delivered_in_order() {
        let queue = EventQueue::new(Duration::from_secs(1));
        queue.push(PairingEvent::Pdu(vec![1]));
        queue.push(PairingEvent::Pdu(vec![2]));

        assert!(matches!(queue.wait(), PairingEvent::Pdu(p) if p == vec![1]));
        assert!(matches!(queue.wait(), PairingEvent::Pdu(p) if p == vec![2]));
    }

    #[test]
    fn test_wait_timeout_yields_exit() {
        let queue = EventQueue::new(Duration::from_millis(20));
        let start = Instant::now();
        assert!(matches!(queue.wait(), PairingEvent::Exit));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_wait_wakes_on_push_from_other_thread() {
        let queue = Arc::new(EventQueue::new(Duration::from_secs(5)));
        let producer = Arc::clone(&queue);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            producer.push(PairingEvent::Ui(UiAction::Passkey, 42));
        });

        assert!(matches!(
            queue.wait(),
            PairingEvent::Ui(UiAction::Passkey, 42)
        ));
        handle.join().unwrap();
    }

    #[test]
    fn test_full_queue_drops_new_events() {
        let queue = EventQueue::new(Duration::from_millis(10));
        for _ in 0..QUEUE_CAPACITY {
            queue.push(PairingEvent::Exit);
        }
        queue.push(PairingEvent::Pdu(vec![0xFF]));

        for _ in 0..QUEUE_CAPACITY {
            assert!(matches!(queue.wait(), PairingEvent::Exit));
        }
        // The overflowing PDU was dropped; the next wait times out
        assert!(matches!(queue.wait(), PairingEvent::Exit));
    }
}
