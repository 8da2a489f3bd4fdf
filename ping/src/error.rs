use thiserror::Error;

/// Failure kinds of a probe session.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("unknown host: {0}")]
    UnknownHost(String),

    #[error(
        "cannot open raw socket ({0}); ICMP messages can only be sent from \
         processes running as root"
    )]
    SocketUnavailable(#[source] std::io::Error),

    #[error("general failure sending echo request: {0}")]
    SendFailed(#[source] std::io::Error),

    #[error("malformed packet of {len} bytes: {reason}")]
    MalformedPacket { len: usize, reason: String },
}
