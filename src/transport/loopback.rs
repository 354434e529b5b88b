//! In-memory transport for tests and in-process pipelines

use crate::transport::error::TransportResult;
use crate::transport::MeasurementTransport;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::warn;

#[derive(Debug, Default)]
struct Queue {
    datagrams: VecDeque<Vec<u8>>,
    dropped: usize,
}

/// Shared FIFO of datagrams; every clone reads and writes the same queue
///
/// When the queue is full new datagrams are dropped, mirroring a socket
/// buffer overflowing under a sender that never waits.
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    queue: Rc<RefCell<Queue>>,
    capacity: usize,
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::with_capacity(1024)
    }
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: Rc::new(RefCell::new(Queue::default())),
            capacity: capacity.max(1),
        }
    }

    /// Queue a raw datagram, as if received from the network
    pub fn inject(&self, payload: impl Into<Vec<u8>>) {
        let mut queue = self.queue.borrow_mut();
        if queue.datagrams.len() >= self.capacity {
            queue.dropped += 1;
            warn!(dropped = queue.dropped, "loopback queue full, datagram dropped");
            return;
        }
        queue.datagrams.push_back(payload.into());
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().datagrams.len()
    }

    pub fn dropped(&self) -> usize {
        self.queue.borrow().dropped
    }
}

impl MeasurementTransport for LoopbackTransport {
    fn send(&mut self, payload: &[u8]) -> TransportResult<()> {
        self.inject(payload);
        Ok(())
    }

    fn receive(&mut self) -> TransportResult<Option<Vec<u8>>> {
        Ok(self.queue.borrow_mut().datagrams.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_queue_in_order() {
        let mut sender = LoopbackTransport::new();
        let mut receiver = sender.clone();

        sender.send(b"one").unwrap();
        sender.send(b"two").unwrap();
        assert_eq!(receiver.pending(), 2);

        assert_eq!(receiver.receive().unwrap(), Some(b"one".to_vec()));
        assert_eq!(receiver.receive().unwrap(), Some(b"two".to_vec()));
        assert_eq!(receiver.receive().unwrap(), None);
    }

    #[test]
    fn test_full_queue_drops_new_datagrams() {
        let mut transport = LoopbackTransport::with_capacity(2);
        for payload in [&b"a"[..], &b"b"[..], &b"c"[..]] {
            transport.send(payload).unwrap();
        }

        assert_eq!(transport.pending(), 2);
        assert_eq!(transport.dropped(), 1);
        assert_eq!(transport.receive().unwrap(), Some(b"a".to_vec()));
    }
}
