use common::Family;

/// ICMP types 0, 3, 4, 5, 8, 11, 12, 13, 14 from RFC 792, types 9 and 10 from
/// RFC 1256.
pub fn icmp_control_message(icmp_type: u8, code: u8) -> Option<&'static str> {
    let message = match (icmp_type, code) {
        (0, 0) => "Echo Reply",
        (3, 0) => "Net Unreachable",
        (3, 1) => "Host Unreachable",
        (3, 2) => "Destination protocol unreachable",
        (3, 3) => "Destination port unreachable",
        (3, 4) => "Fragmentation required, and DF flag set",
        (3, 5) => "Source route failed",
        (3, 6) => "Destination network unknown",
        (3, 7) => "Destination host unknown",
        (3, 8) => "Source host isolated",
        (3, 9) => "Network administratively prohibited",
        (3, 10) => "Host administratively prohibited",
        (3, 11) => "Network unreachable for TOS",
        (3, 12) => "Host unreachable for TOS",
        (3, 13) => "Communication administratively prohibited",
        (3, 14) => "Host Precedence Violation",
        (3, 15) => "Precedence cutoff in effect",
        (4, 0) => "Source quench",
        (5, 0) => "Redirect Datagram for the Network",
        (5, 1) => "Redirect Datagram for the Host",
        (5, 2) => "Redirect Datagram for the TOS & network",
        (5, 3) => "Redirect Datagram for the TOS & host",
        (8, 0) => "Echo request",
        (9, 0) => "Router Advertisement",
        (10, 0) => "Router discovery/selection/solicitation",
        (11, 0) => "TTL expired in transit",
        (11, 1) => "Fragment reassembly time exceeded",
        (12, 0) => "Pointer indicates the error",
        (12, 1) => "Missing a required option",
        (12, 2) => "Bad length",
        (13, 0) => "Timestamp",
        (14, 0) => "Timestamp reply",
        _ => return None,
    };
    Some(message)
}

/// ICMPv6 error types 1-4 from RFC 4443.
pub fn icmpv6_control_message(icmp_type: u8, code: u8) -> Option<&'static str> {
    let message = match (icmp_type, code) {
        (1, 0) => "no route to destination",
        (1, 1) => "communication with destination administratively prohibited",
        (1, 2) => "beyond scope of source address",
        (1, 3) => "address unreachable",
        (1, 4) => "port unreachable",
        (1, 5) => "source address failed ingress/egress policy",
        (1, 6) => "reject route to destination",
        (1, 7) => "Error in Source Routing Header",
        (2, 0) => "packet too big",
        (3, 0) => "hop limit exceeded in transit",
        (3, 1) => "fragment reassembly time exceeded",
        (4, 0) => "erroneous header field encountered",
        (4, 1) => "unrecognized Next Header type encountered",
        (4, 2) => "unrecognized IPv6 option encountered",
        _ => return None,
    };
    Some(message)
}

pub fn control_message(
    family: Family,
    icmp_type: u8,
    code: u8,
) -> Option<&'static str> {
    match family {
        Family::V4 => icmp_control_message(icmp_type, code),
        Family::V6 => icmpv6_control_message(icmp_type, code),
    }
}

/// Like [`control_message`], with a generic text for pairs missing from the
/// tables.
pub fn describe(family: Family, icmp_type: u8, code: u8) -> String {
    control_message(family, icmp_type, code)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Unknown ICMP type {} code {}", icmp_type, code))
}
