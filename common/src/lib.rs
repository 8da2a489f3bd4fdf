use std::{
    fmt,
    io::Read,
    net::{IpAddr, SocketAddr, SocketAddrV4, SocketAddrV6},
    os::unix::io::{AsRawFd, RawFd},
};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tokio::io::unix::AsyncFd;

mod checksum;
mod config;
mod logger;
mod records;

pub use checksum::{checksum, verify_checksum};
pub use config::AppConfig;
pub use logger::{read_records, Logger, Logging};
pub use logging_macro::Logging;
pub use records::{QualityScoreRecord, SessionResult, TIMESTAMP_FORMAT};

/// Address family a probe session runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    pub fn of(addr: &IpAddr) -> Family {
        match addr {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => write!(f, "IPv4"),
            Family::V6 => write!(f, "IPv6"),
        }
    }
}

// Strong type for raw ICMP / ICMPv6 sockets
pub struct ICMPSocket(Socket);

impl ICMPSocket {
    pub fn new(
        family: Family,
        bind_interface: Option<&str>,
    ) -> std::io::Result<ICMPSocket> {
        let socket = match family {
            Family::V4 => {
                Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?
            }
            Family::V6 => {
                Socket::new(Domain::IPV6, Type::RAW, Some(Protocol::ICMPV6))?
            }
        };
        socket.set_nonblocking(true)?;

        let socket = match bind_interface {
            Some(bi) => bind_to_device(socket, bi)?,
            None => socket,
        };

        Ok(ICMPSocket(socket))
    }
    pub fn get_ref(&self) -> &Socket {
        &self.0
    }
}

impl AsRawFd for ICMPSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.0.as_raw_fd()
    }
}

/// Raw ICMP socket registered with the tokio reactor. Dropping it closes the
/// underlying descriptor.
pub struct AsyncICMPSocket {
    inner: AsyncFd<ICMPSocket>,
}

impl AsyncICMPSocket {
    pub fn new(socket: ICMPSocket) -> std::io::Result<Self> {
        Ok(Self {
            inner: AsyncFd::new(socket)?,
        })
    }

    pub async fn send_to(
        &mut self,
        packet: &[u8],
        addr: &IpAddr,
    ) -> std::io::Result<usize> {
        let addr = match addr {
            IpAddr::V4(addr) => {
                SockAddr::from(SocketAddr::V4(SocketAddrV4::new(*addr, 0)))
            }
            IpAddr::V6(addr) => {
                SockAddr::from(SocketAddr::V6(SocketAddrV6::new(*addr, 0, 0, 0)))
            }
        };
        loop {
            let mut guard = self.inner.writable().await?;
            match guard
                .try_io(|inner| inner.get_ref().get_ref().send_to(packet, &addr))
            {
                Ok(res) => return res,
                Err(_would_block) => continue,
            }
        }
    }

    pub async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            let mut guard = self.inner.readable().await?;
            match guard.try_io(|inner| {
                let mut socket: &Socket = inner.get_ref().get_ref();
                socket.read(buf)
            }) {
                Ok(res) => return res,
                Err(_would_block) => continue,
            }
        }
    }
}

pub fn bind_to_device(
    socket: Socket,
    bind_interface: &str,
) -> Result<Socket, std::io::Error> {
    // Socket2 bind_device does not have nice error types, so we have to handle
    // the libc errors. In case, we get an error when binding, map it into a
    // more friendly std::io::Error
    if let Err(err) = socket.bind_device(Some(bind_interface.as_bytes())) {
        return if matches!(err.raw_os_error(), Some(libc::ENODEV)) {
            let error_msg = format!(
                "error binding to device (`{}`): {}",
                bind_interface, err
            );
            Err(std::io::Error::new(std::io::ErrorKind::Other, error_msg))
        } else {
            let error_msg = format!("unexpected error binding device: {}", err);
            Err(std::io::Error::new(std::io::ErrorKind::Other, error_msg))
        };
    }

    Ok(socket)
}

#[cfg(test)]
mod test {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;

    #[test]
    fn family_of_address() {
        assert_eq!(Family::of(&IpAddr::V4(Ipv4Addr::LOCALHOST)), Family::V4);
        assert_eq!(Family::of(&IpAddr::V6(Ipv6Addr::LOCALHOST)), Family::V6);
        assert_eq!(Family::V6.to_string(), "IPv6");
    }
}
