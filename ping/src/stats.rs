use std::{fmt, net::IpAddr};

use common::SessionResult;

/// Nominal spacing of two consecutive probes, in seconds.
pub const NOMINAL_INTERVAL_SECS: f64 = 1.0;

/// Running counters of one probe session.
///
/// Send and receive timestamps are seconds since the session started.
#[derive(Debug, Clone)]
pub struct ProbeStats {
    sent: u64,
    received: u64,
    min_rtt: f64,
    max_rtt: f64,
    total_rtt: f64,
    mean: f64,
    m2: f64,
    send_times: Vec<f64>,
    recv_times: Vec<f64>,
}

impl Default for ProbeStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeStats {
    pub fn new() -> Self {
        Self {
            sent: 0,
            received: 0,
            min_rtt: f64::INFINITY,
            max_rtt: 0.0,
            total_rtt: 0.0,
            mean: 0.0,
            m2: 0.0,
            send_times: Vec::new(),
            recv_times: Vec::new(),
        }
    }

    pub fn record_sent(&mut self, send_time: f64) {
        self.sent += 1;
        self.send_times.push(send_time);
    }

    /// Accounts one accepted reply. `rtt` is in milliseconds.
    pub fn record_reply(&mut self, rtt: f64, recv_time: f64) {
        self.received += 1;
        self.total_rtt += rtt;
        self.min_rtt = self.min_rtt.min(rtt);
        self.max_rtt = self.max_rtt.max(rtt);
        self.recv_times.push(recv_time);

        let old_mean = self.mean;
        self.mean = old_mean + (rtt - old_mean) / self.received as f64;
        self.m2 += (rtt - old_mean) * (rtt - self.mean);
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn total_rtt(&self) -> f64 {
        self.total_rtt
    }

    pub fn recv_times(&self) -> &[f64] {
        &self.recv_times
    }

    pub fn send_times(&self) -> &[f64] {
        &self.send_times
    }

    /// Percentage of sent probes without an accepted reply; 100 when nothing
    /// was sent.
    pub fn loss_rate(&self) -> f64 {
        if self.sent == 0 {
            return 100.0;
        }
        let lost = self.sent.saturating_sub(self.received);
        lost as f64 / self.sent as f64 * 100.0
    }

    pub fn average_rtt(&self) -> f64 {
        if self.received == 0 {
            0.0
        } else {
            self.total_rtt / self.received as f64
        }
    }

    pub fn min_rtt(&self) -> f64 {
        if self.received == 0 {
            0.0
        } else {
            self.min_rtt
        }
    }

    pub fn max_rtt(&self) -> f64 {
        self.max_rtt
    }

    /// Population standard deviation of the RTT samples.
    pub fn mdev(&self) -> f64 {
        if self.received == 0 {
            0.0
        } else {
            (self.m2 / self.received as f64).sqrt()
        }
    }

    pub fn jitter(&self) -> f64 {
        jitter_estimate(&self.recv_times, NOMINAL_INTERVAL_SECS)
    }

    pub fn bandwidth(&self, payload_len: usize) -> f64 {
        bandwidth_estimate(payload_len, self.average_rtt())
    }

    pub fn summarize(
        &self,
        destination_ip: IpAddr,
        timestamp: String,
        payload_len: usize,
    ) -> SessionResult {
        SessionResult {
            destination_ip,
            timestamp,
            loss_rate_pct: self.loss_rate(),
            min_rtt_ms: self.min_rtt(),
            avg_rtt_ms: self.average_rtt(),
            max_rtt_ms: self.max_rtt(),
            bandwidth: self.bandwidth(payload_len),
            jitter: self.jitter(),
        }
    }
}

impl fmt::Display for ProbeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sent: {} received: {} loss: {:.1}% min: {:.3} avg: {:.3} max: \
             {:.3} mdev: {:.3}",
            self.sent,
            self.received,
            self.loss_rate(),
            self.min_rtt(),
            self.average_rtt(),
            self.max_rtt(),
            self.mdev()
        )
    }
}

/// Mean deviation of receive gaps from `nominal`.
///
/// Pairs are taken with a stride of two: (t0, t1), (t2, t3), ... so the gap
/// between t1 and t2 is never looked at. A trailing unpaired timestamp is
/// ignored. Returns 0 when there is no pair.
pub fn jitter_estimate(recv_times: &[f64], nominal: f64) -> f64 {
    let deltas = recv_times
        .chunks_exact(2)
        .map(|pair| (pair[1] - pair[0]) - nominal)
        .collect::<Vec<_>>();
    if deltas.is_empty() {
        return 0.0;
    }
    deltas.iter().sum::<f64>() / deltas.len() as f64
}

/// `(payload + 8) / 1000 / avg_rtt_ms`, 0 when no RTT was measured.
pub fn bandwidth_estimate(payload_len: usize, average_rtt_ms: f64) -> f64 {
    if average_rtt_ms <= 0.0 {
        return 0.0;
    }
    (payload_len + 8) as f64 / 1000.0 / average_rtt_ms
}
