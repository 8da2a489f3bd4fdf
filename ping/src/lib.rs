pub mod codec;
pub mod error;
pub mod icmp_messages;
pub mod report;
pub mod schedule;
pub mod session;
pub mod stats;
pub mod transport;

pub use error::ProbeError;
pub use report::ProbeOutcome;
pub use session::{
    run_session, ProbeOptions, ProbeSession, SessionOutcome, SessionReport,
};
pub use stats::ProbeStats;
pub use transport::{ProbeChannel, ProbeTransport, RawTransport};
