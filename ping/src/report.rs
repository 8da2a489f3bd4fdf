use std::{net::IpAddr, time::Duration};

use common::SessionResult;

use crate::stats::ProbeStats;

const RULE: &str = "=======================================";

/// What became of one probe.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// A reply carrying this session's identifier arrived in time.
    Reply {
        sequence: u16,
        ttl: Option<u8>,
        rtt: Duration,
    },
    /// No reply, but a control message (unreachable, time exceeded, ...) was
    /// seen while waiting.
    ControlMessage { sequence: u16, message: String },
    /// No reply and nothing else of interest before the budget ran out.
    Timeout { sequence: u16 },
    /// The echo request never left the host.
    SendFailed { sequence: u16 },
}

impl ProbeOutcome {
    pub fn rtt(&self) -> Option<Duration> {
        match self {
            ProbeOutcome::Reply { rtt, .. } => Some(*rtt),
            _ => None,
        }
    }
}

// Console lines follow the classic ping layout.
pub fn banner(host: &str, addr: IpAddr, payload_len: usize) -> String {
    format!(
        "\nTARGET: {} ({}):  PACKET SIZE: {} bytes\n{}",
        host, addr, payload_len, RULE
    )
}

pub fn probe_line(outcome: &ProbeOutcome, addr: IpAddr) -> String {
    match outcome {
        ProbeOutcome::Reply { sequence, ttl, rtt } => {
            let ttl = ttl.map_or_else(|| "-".to_string(), |ttl| ttl.to_string());
            format!(
                "Packet number: {} | TTL: {} | Time: {:.3}ms",
                sequence,
                ttl,
                rtt.as_secs_f64() * 1000.0
            )
        }
        ProbeOutcome::ControlMessage { sequence, message } => {
            format!("From {}: icmp_seq={} {}", addr, sequence, message)
        }
        ProbeOutcome::Timeout { sequence } => {
            format!("Request timeout for icmp_seq {}", sequence)
        }
        ProbeOutcome::SendFailed { sequence } => {
            format!("General failure for icmp_seq {}", sequence)
        }
    }
}

pub fn summary(host: &str, stats: &ProbeStats, result: &SessionResult) -> String {
    let mut out = format!(
        "\nCompleted analysis on: {}\n{}\nPackets sent: {}\nPackets received: \
         {}\nPacket loss: {:.1}%\nTotal Time: {}ms\n",
        host,
        RULE,
        stats.sent(),
        stats.received(),
        result.loss_rate_pct,
        stats.total_rtt() as u64
    );
    if stats.received() > 0 {
        out.push_str(&format!(
            "\nMinimum RTT: {:.3}ms\nAverage RTT: {:.3}ms\nMaximum RTT: \
             {:.3}ms\nMean deviation: {:.3}ms\nJitter: {:.3}\nBandwidth: {:.6}\n",
            result.min_rtt_ms,
            result.avg_rtt_ms,
            result.max_rtt_ms,
            stats.mdev(),
            result.jitter,
            result.bandwidth
        ));
    }
    out
}

pub fn unknown_host(host: &str, reason: &str) -> String {
    format!("\nERROR: Unknown host: {} ({})", host, reason)
}
