//! UDP datagram transport

use crate::transport::error::{is_timeout, TransportError, TransportResult};
use crate::transport::MeasurementTransport;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;
use tracing::debug;

/// Largest datagram accepted or sent
pub const MAX_DATAGRAM_SIZE: usize = 4096;

/// Connectionless transport over a single UDP socket
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    destination: Option<SocketAddr>,
    buffer: Vec<u8>,
}

impl UdpTransport {
    /// Bind `local`, sending to `destination` when set
    pub fn bind(
        local: SocketAddr,
        destination: Option<SocketAddr>,
        read_timeout: Option<Duration>,
    ) -> TransportResult<Self> {
        let socket = UdpSocket::bind(local)?;
        // A zero duration is rejected by the socket API
        socket.set_read_timeout(read_timeout.filter(|t| !t.is_zero()))?;
        debug!(local = %socket.local_addr()?, ?destination, "udp transport bound");

        Ok(Self {
            socket,
            destination,
            buffer: vec![0u8; MAX_DATAGRAM_SIZE],
        })
    }

    /// Listen on all interfaces
    pub fn listener(port: u16, read_timeout: Duration) -> TransportResult<Self> {
        let local = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
        Self::bind(local, None, Some(read_timeout))
    }

    /// Broadcast to every listener on `port`
    pub fn broadcaster(port: u16) -> TransportResult<Self> {
        let local = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0));
        let destination = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, port));
        let transport = Self::bind(local, Some(destination), None)?;
        transport.socket.set_broadcast(true)?;
        Ok(transport)
    }

    pub fn local_addr(&self) -> TransportResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl MeasurementTransport for UdpTransport {
    fn send(&mut self, payload: &[u8]) -> TransportResult<()> {
        if payload.len() > MAX_DATAGRAM_SIZE {
            return Err(TransportError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_DATAGRAM_SIZE,
            });
        }
        let destination = self.destination.ok_or(TransportError::NoDestination)?;
        self.socket.send_to(payload, destination)?;
        Ok(())
    }

    fn receive(&mut self) -> TransportResult<Option<Vec<u8>>> {
        match self.socket.recv_from(&mut self.buffer) {
            Ok((len, from)) => {
                debug!(%from, len, "datagram received");
                Ok(Some(self.buffer[..len].to_vec()))
            }
            Err(e) if is_timeout(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn localhost(port: u16) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port))
    }

    #[test]
    fn test_udp_round_trip_on_localhost() {
        let mut receiver =
            UdpTransport::bind(localhost(0), None, Some(Duration::from_millis(500))).unwrap();
        let target = receiver.local_addr().unwrap();
        let mut sender = UdpTransport::bind(localhost(0), Some(target), None).unwrap();

        sender.send(b"{\"tag_id\":\"T1\",\"anchors\":[]}").unwrap();
        let received = receiver.receive().unwrap();
        assert_eq!(received.as_deref(), Some(&b"{\"tag_id\":\"T1\",\"anchors\":[]}"[..]));
    }

    #[test]
    fn test_receive_timeout_is_idle() {
        let mut receiver =
            UdpTransport::bind(localhost(0), None, Some(Duration::from_millis(20))).unwrap();
        assert!(receiver.receive().unwrap().is_none());
    }

    #[test]
    fn test_send_without_destination_fails() {
        let mut transport = UdpTransport::bind(localhost(0), None, None).unwrap();
        assert!(matches!(
            transport.send(b"x"),
            Err(TransportError::NoDestination)
        ));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let mut transport =
            UdpTransport::bind(localhost(0), Some(localhost(9)), None).unwrap();
        let payload = vec![0u8; MAX_DATAGRAM_SIZE + 1];
        assert!(matches!(
            transport.send(&payload),
            Err(TransportError::PayloadTooLarge { .. })
        ));
    }
}
