//! Datagram transport abstraction
//!
//! The estimator and the generator only exchange opaque datagrams. Delivery
//! is best effort: nothing here retries, acknowledges or reorders.

pub mod error;
pub mod udp;
pub mod loopback;

pub use error::{RecoveryStrategy, TransportError, TransportResult};
pub use udp::UdpTransport;
pub use loopback::LoopbackTransport;

/// Connectionless datagram channel
pub trait MeasurementTransport {
    /// Send one datagram without waiting for delivery
    fn send(&mut self, payload: &[u8]) -> TransportResult<()>;

    /// Receive one datagram
    /// Returns Ok(Some(bytes)) when a datagram arrived
    /// Returns Ok(None) when the receive timed out or nothing is queued
    fn receive(&mut self) -> TransportResult<Option<Vec<u8>>>;
}

impl<T: MeasurementTransport + ?Sized> MeasurementTransport for Box<T> {
    fn send(&mut self, payload: &[u8]) -> TransportResult<()> {
        (**self).send(payload)
    }

    fn receive(&mut self) -> TransportResult<Option<Vec<u8>>> {
        (**self).receive()
    }
}
