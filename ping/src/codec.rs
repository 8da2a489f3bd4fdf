use std::net::Ipv4Addr;

use common::{checksum, Family};
use etherparse::Ipv4HeaderSlice;

use crate::error::ProbeError;

/// Echo request (RFC 792)
pub const ICMP_ECHO_REQUEST: u8 = 8;
/// Echo reply (RFC 792)
pub const ICMP_ECHO_REPLY: u8 = 0;
/// Echo request (RFC 4443)
pub const ICMPV6_ECHO_REQUEST: u8 = 128;
/// Echo reply (RFC 4443)
pub const ICMPV6_ECHO_REPLY: u8 = 129;

pub const ICMP_HEADER_LEN: usize = 8;
pub const IPV4_HEADER_LEN: usize = 20;
/// Largest datagram read from the socket.
pub const MAX_RECV: usize = 2048;
/// First byte of the payload filler, incremented (mod 256) per byte.
pub const PAYLOAD_FILL_START: u8 = 0x42;

/// The fixed 8-byte ICMP echo header. The same layout is used for ICMPv6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpHeader {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence: u16,
}

impl IcmpHeader {
    pub fn to_bytes(&self) -> [u8; ICMP_HEADER_LEN] {
        let mut bytes = [0u8; ICMP_HEADER_LEN];
        bytes[0] = self.icmp_type;
        bytes[1] = self.code;
        bytes[2..4].copy_from_slice(&self.checksum.to_be_bytes());
        bytes[4..6].copy_from_slice(&self.identifier.to_be_bytes());
        bytes[6..8].copy_from_slice(&self.sequence.to_be_bytes());
        bytes
    }

    pub fn parse(data: &[u8]) -> Result<Self, ProbeError> {
        if data.len() < ICMP_HEADER_LEN {
            return Err(ProbeError::MalformedPacket {
                len: data.len(),
                reason: format!("ICMP header needs {} bytes", ICMP_HEADER_LEN),
            });
        }
        Ok(Self {
            icmp_type: data[0],
            code: data[1],
            checksum: u16::from_be_bytes([data[2], data[3]]),
            identifier: u16::from_be_bytes([data[4], data[5]]),
            sequence: u16::from_be_bytes([data[6], data[7]]),
        })
    }

    pub fn is_echo_reply(&self, family: Family) -> bool {
        self.code == 0 && self.icmp_type == echo_reply_type(family)
    }

    pub fn is_echo(&self, family: Family) -> bool {
        self.icmp_type == echo_request_type(family)
            || self.icmp_type == echo_reply_type(family)
    }
}

pub fn echo_request_type(family: Family) -> u8 {
    match family {
        Family::V4 => ICMP_ECHO_REQUEST,
        Family::V6 => ICMPV6_ECHO_REQUEST,
    }
}

pub fn echo_reply_type(family: Family) -> u8 {
    match family {
        Family::V4 => ICMP_ECHO_REPLY,
        Family::V6 => ICMPV6_ECHO_REPLY,
    }
}

/// An echo request with its checksum finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoPacket {
    header: IcmpHeader,
    payload: Vec<u8>,
}

impl EchoPacket {
    /// Builds an echo request whose total ICMP length is `packet_size`
    /// (header included). Sizes below the header length get an empty payload.
    pub fn new(
        identifier: u16,
        sequence: u16,
        packet_size: usize,
        family: Family,
    ) -> Self {
        let payload = payload_filler(packet_size.saturating_sub(ICMP_HEADER_LEN));
        let mut header = IcmpHeader {
            icmp_type: echo_request_type(family),
            code: 0,
            checksum: 0,
            identifier,
            sequence,
        };

        let mut buf = Vec::with_capacity(ICMP_HEADER_LEN + payload.len());
        buf.extend_from_slice(&header.to_bytes());
        buf.extend_from_slice(&payload);
        header.checksum = checksum(&buf);

        Self { header, payload }
    }

    pub fn header(&self) -> &IcmpHeader {
        &self.header
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        [self.header.to_bytes().as_slice(), self.payload.as_slice()].concat()
    }
}

/// Encodes an echo request ready to hand to a raw socket.
pub fn encode(
    identifier: u16,
    sequence: u16,
    packet_size: usize,
    family: Family,
) -> Vec<u8> {
    EchoPacket::new(identifier, sequence, packet_size, family).to_bytes()
}

/// Deterministic payload: `0x42, 0x43, ...` wrapping at 256.
pub fn payload_filler(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| PAYLOAD_FILL_START.wrapping_add(i as u8))
        .collect()
}

/// IPv4 header fields kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Fields {
    pub version: u8,
    pub header_len: usize,
    pub total_len: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Headers {
    pub ip: Ipv4Fields,
    pub icmp: IcmpHeader,
}

/// The host stack strips the IPv6 header from raw ICMPv6 reads, so only the
/// ICMPv6 header is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Headers {
    pub icmp: IcmpHeader,
}

/// Headers of one received datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyHeaders {
    V4(Ipv4Headers),
    V6(Ipv6Headers),
}

impl ReplyHeaders {
    pub fn icmp(&self) -> &IcmpHeader {
        match self {
            ReplyHeaders::V4(headers) => &headers.icmp,
            ReplyHeaders::V6(headers) => &headers.icmp,
        }
    }

    pub fn ttl(&self) -> Option<u8> {
        match self {
            ReplyHeaders::V4(headers) => Some(headers.ip.ttl),
            ReplyHeaders::V6(_) => None,
        }
    }
}

/// Decodes a datagram read from a raw socket of the given family.
pub fn decode(raw: &[u8], family: Family) -> Result<ReplyHeaders, ProbeError> {
    match family {
        Family::V4 => {
            if raw.len() < IPV4_HEADER_LEN + ICMP_HEADER_LEN {
                return Err(ProbeError::MalformedPacket {
                    len: raw.len(),
                    reason: format!(
                        "IPv4 + ICMP headers need {} bytes",
                        IPV4_HEADER_LEN + ICMP_HEADER_LEN
                    ),
                });
            }
            let ip = Ipv4HeaderSlice::from_slice(raw).map_err(|err| {
                ProbeError::MalformedPacket {
                    len: raw.len(),
                    reason: format!("invalid IPv4 header: {:?}", err),
                }
            })?;
            let header_len = ip.slice().len();
            let fields = Ipv4Fields {
                version: ip.version(),
                header_len,
                total_len: ip.total_len(),
                ttl: ip.ttl(),
                protocol: ip.protocol(),
                checksum: ip.header_checksum(),
                source: ip.source_addr(),
                destination: ip.destination_addr(),
            };
            let icmp = IcmpHeader::parse(&raw[header_len..])?;
            Ok(ReplyHeaders::V4(Ipv4Headers { ip: fields, icmp }))
        }
        Family::V6 => Ok(ReplyHeaders::V6(Ipv6Headers {
            icmp: IcmpHeader::parse(raw)?,
        })),
    }
}

#[cfg(test)]
mod test {
    use common::verify_checksum;
    use etherparse::{IcmpEchoHeader, Icmpv4Header, Icmpv4Type};

    use super::*;

    /// 20-byte IPv4 header (ttl 57, protocol ICMP) followed by `icmp`.
    fn ipv4_datagram(icmp: &[u8]) -> Vec<u8> {
        let total_len = (IPV4_HEADER_LEN + icmp.len()) as u16;
        let mut ip = vec![
            0x45, 0x00, 0, 0, 0x1c, 0x46, 0x00, 0x00, 57, 1, 0, 0, 8, 8, 8, 8,
            192, 168, 1, 10,
        ];
        ip[2..4].copy_from_slice(&total_len.to_be_bytes());
        let sum = checksum(&ip);
        ip[10..12].copy_from_slice(&sum.to_be_bytes());
        [ip.as_slice(), icmp].concat()
    }

    #[test]
    fn echo_request_v4_layout() {
        let packet = encode(1234, 0, 64, Family::V4);
        assert_eq!(packet.len(), 64);
        assert_eq!(packet[0], ICMP_ECHO_REQUEST);
        assert_eq!(packet[1], 0);
        assert_eq!(&packet[4..6], &1234u16.to_be_bytes());
        assert_eq!(&packet[6..8], &0u16.to_be_bytes());
        assert_eq!(&packet[8..], payload_filler(56).as_slice());
        assert_eq!(packet[8], 0x42);
        assert_eq!(packet[63], 0x42 + 55);
    }

    #[test]
    fn echo_request_checksum_matches_manual_computation() {
        let packet = encode(1234, 0, 64, Family::V4);

        // Manual RFC 1071 sum over header (checksum zeroed) + filler bytes.
        let mut manual = vec![ICMP_ECHO_REQUEST, 0, 0, 0];
        manual.extend_from_slice(&1234u16.to_be_bytes());
        manual.extend_from_slice(&0u16.to_be_bytes());
        manual.extend((0..56u32).map(|i| ((0x42 + i) & 0xff) as u8));
        let mut sum = 0u32;
        for word in manual.chunks(2) {
            sum += ((word[0] as u32) << 8) | word[1] as u32;
        }
        while sum >> 16 != 0 {
            sum = (sum & 0xffff) + (sum >> 16);
        }
        let expected = !(sum as u16);

        assert_eq!(u16::from_be_bytes([packet[2], packet[3]]), expected);
        assert!(verify_checksum(&packet));
    }

    #[test]
    fn echo_request_matches_etherparse() {
        let packet = EchoPacket::new(0xbeef, 7, 64, Family::V4);
        let reference = Icmpv4Header::with_checksum(
            Icmpv4Type::EchoRequest(IcmpEchoHeader { id: 0xbeef, seq: 7 }),
            packet.payload(),
        );
        assert_eq!(
            &packet.to_bytes()[..ICMP_HEADER_LEN],
            reference.to_bytes().as_slice()
        );
    }

    #[test]
    fn echo_request_v6_type() {
        let packet = EchoPacket::new(1, 2, 16, Family::V6);
        assert_eq!(packet.header().icmp_type, ICMPV6_ECHO_REQUEST);
        assert_eq!(packet.payload().len(), 8);
        assert!(verify_checksum(&packet.to_bytes()));
    }

    #[test]
    fn odd_and_tiny_packet_sizes() {
        let odd = encode(9, 9, 65, Family::V4);
        assert_eq!(odd.len(), 65);
        assert!(verify_checksum(&odd));

        let bare = encode(9, 9, 4, Family::V4);
        assert_eq!(bare.len(), ICMP_HEADER_LEN);
        assert!(verify_checksum(&bare));
    }

    #[test]
    fn filler_wraps() {
        let filler = payload_filler(300);
        assert_eq!(filler[0], 0x42);
        assert_eq!(filler[0xbd], 0xff);
        assert_eq!(filler[0xbe], 0x00);
    }

    #[test]
    fn decode_v4_reply() {
        let icmp = IcmpHeader {
            icmp_type: ICMP_ECHO_REPLY,
            code: 0,
            checksum: 0xabcd,
            identifier: 1234,
            sequence: 3,
        };
        let datagram = ipv4_datagram(&icmp.to_bytes());
        let reply = decode(&datagram, Family::V4).unwrap();
        let ReplyHeaders::V4(headers) = reply else {
            panic!("expected IPv4 headers");
        };
        assert_eq!(headers.icmp, icmp);
        assert_eq!(headers.ip.version, 4);
        assert_eq!(headers.ip.header_len, IPV4_HEADER_LEN);
        assert_eq!(headers.ip.ttl, 57);
        assert_eq!(headers.ip.protocol, 1);
        assert_eq!(headers.ip.source, Ipv4Addr::new(8, 8, 8, 8));
        assert_eq!(headers.ip.destination, Ipv4Addr::new(192, 168, 1, 10));
        assert_eq!(reply.ttl(), Some(57));
        assert!(reply.icmp().is_echo_reply(Family::V4));
    }

    #[test]
    fn decode_v6_reply() {
        let icmp = IcmpHeader {
            icmp_type: ICMPV6_ECHO_REPLY,
            code: 0,
            checksum: 0,
            identifier: 77,
            sequence: 1,
        };
        let mut raw = icmp.to_bytes().to_vec();
        raw.extend_from_slice(&payload_filler(8));
        let reply = decode(&raw, Family::V6).unwrap();
        assert_eq!(*reply.icmp(), icmp);
        assert_eq!(reply.ttl(), None);
        assert!(reply.icmp().is_echo_reply(Family::V6));
        assert!(!reply.icmp().is_echo_reply(Family::V4));
    }

    #[test]
    fn short_datagrams_are_malformed() {
        assert!(matches!(
            decode(&[0u8; 27], Family::V4),
            Err(ProbeError::MalformedPacket { len: 27, .. })
        ));
        assert!(matches!(
            decode(&[0u8; 7], Family::V6),
            Err(ProbeError::MalformedPacket { len: 7, .. })
        ));
    }

    #[test]
    fn garbage_ip_header_is_malformed() {
        // Version nibble 6 in an IPv4 read.
        let mut datagram = ipv4_datagram(&[0u8; 8]);
        datagram[0] = 0x65;
        assert!(matches!(
            decode(&datagram, Family::V4),
            Err(ProbeError::MalformedPacket { .. })
        ));
    }
}
