use std::{io, net::IpAddr};

use common::{AsyncICMPSocket, Family, ICMPSocket};

#[allow(async_fn_in_trait)]
pub trait ProbeChannel {
    async fn send_to(&mut self, packet: &[u8], addr: IpAddr) -> io::Result<usize>;
    /// Reads one datagram as delivered by the socket (IPv4 reads include the
    /// IP header).
    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Where probe datagrams go. The engine opens one channel per probe and drops
/// it when the probe is over.
pub trait ProbeTransport {
    type Channel: ProbeChannel;
    fn open(&mut self, family: Family) -> io::Result<Self::Channel>;
}

/// Raw ICMP sockets, optionally bound to a network device.
#[derive(Debug, Clone, Default)]
pub struct RawTransport {
    iface: Option<String>,
}

impl RawTransport {
    pub fn new(iface: Option<String>) -> Self {
        Self { iface }
    }
}

impl ProbeTransport for RawTransport {
    type Channel = AsyncICMPSocket;

    fn open(&mut self, family: Family) -> io::Result<AsyncICMPSocket> {
        let socket = ICMPSocket::new(family, self.iface.as_deref())?;
        AsyncICMPSocket::new(socket)
    }
}

impl ProbeChannel for AsyncICMPSocket {
    async fn send_to(&mut self, packet: &[u8], addr: IpAddr) -> io::Result<usize> {
        AsyncICMPSocket::send_to(self, packet, &addr).await
    }

    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf).await
    }
}
