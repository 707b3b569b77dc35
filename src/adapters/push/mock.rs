//! In-memory push transport for testing.
//!
//! Records every frame written to it and can be told to fail writes,
//! standing in for a client that has gone away.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::domain::push::PushEvent;
use crate::ports::{PushFrame, PushTransport, TransportError};

/// Transport that records frames instead of sending them.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    frames: Mutex<Vec<PushFrame>>,
    closed: AtomicBool,
    fail_writes: AtomicBool,
    fail_next: AtomicUsize,
}

impl RecordingTransport {
    /// Creates an open transport that accepts every write.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport whose every write fails.
    pub fn failing() -> Self {
        let transport = Self::new();
        transport.fail_all_writes();
        transport
    }

    /// Makes every subsequent write fail.
    pub fn fail_all_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Makes the next `n` writes fail.
    pub fn fail_next_writes(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Every frame accepted so far.
    pub fn frames(&self) -> Vec<PushFrame> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Accepted event frames, parsed back into events.
    pub fn events(&self) -> Vec<PushEvent> {
        self.frames()
            .iter()
            .filter_map(|frame| match frame {
                PushFrame::Event(json) => PushEvent::from_json(json).ok(),
                PushFrame::Heartbeat => None,
            })
            .collect()
    }

    /// Number of heartbeat frames accepted.
    pub fn heartbeat_count(&self) -> usize {
        self.frames()
            .iter()
            .filter(|frame| matches!(frame, PushFrame::Heartbeat))
            .count()
    }

    fn should_fail(&self) -> bool {
        if self.fail_writes.load(Ordering::SeqCst) {
            return true;
        }
        self.fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl PushTransport for RecordingTransport {
    fn write(&self, frame: PushFrame) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if self.should_fail() {
            return Err(TransportError::Write("simulated write failure".to_string()));
        }
        self.frames.lock().unwrap_or_else(PoisonError::into_inner).push(frame);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_frames_in_order() {
        let transport = RecordingTransport::new();
        transport.write(PushFrame::Heartbeat).unwrap();
        transport.write(PushFrame::event("{}")).unwrap();

        assert_eq!(transport.frames(), vec![PushFrame::Heartbeat, PushFrame::event("{}")]);
        assert_eq!(transport.heartbeat_count(), 1);
    }

    #[test]
    fn fail_next_writes_then_recovers() {
        let transport = RecordingTransport::new();
        transport.fail_next_writes(1);

        assert!(transport.write(PushFrame::Heartbeat).is_err());
        assert!(transport.write(PushFrame::Heartbeat).is_ok());
    }

    #[test]
    fn closed_transport_rejects_writes() {
        let transport = RecordingTransport::new();
        transport.close();
        assert_eq!(transport.write(PushFrame::Heartbeat), Err(TransportError::Closed));
    }
}
