use std::{
    future::Future,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    time::Duration,
};

use chrono::Local;
use common::{Family, SessionResult, TIMESTAMP_FORMAT};
use log::{debug, info, warn};
use tokio::time::Instant;

use crate::{
    codec::{self, ICMP_HEADER_LEN, MAX_RECV},
    error::ProbeError,
    icmp_messages,
    report::{self, ProbeOutcome},
    schedule::{remaining_budget, Scheduler},
    stats::ProbeStats,
    transport::{ProbeChannel, ProbeTransport},
};

/// Tunables of one probe session.
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// How long to wait for each reply.
    pub timeout: Duration,
    /// Total ICMP packet size, header included.
    pub packet_size: usize,
    /// Stop after this many probes.
    pub count: Option<u64>,
    /// Stop once the session has run this long.
    pub deadline: Option<Duration>,
    /// One probe per interval.
    pub interval: Duration,
    /// Echo identifier; the process id when unset.
    pub identifier: Option<u16>,
    /// Suppress the banner and per-probe lines.
    pub quiet: bool,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(3000),
            packet_size: 64,
            count: Some(50),
            deadline: None,
            interval: Duration::from_millis(1000),
            identifier: None,
            quiet: false,
        }
    }
}

/// A finished session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub result: SessionResult,
    pub sent: u64,
    pub received: u64,
}

#[derive(Debug, Clone)]
pub enum SessionOutcome {
    Completed(SessionReport),
    /// The destination did not resolve; nothing was sent.
    UnknownHost(SessionResult),
}

/// Echo identifier used when none is configured.
pub fn process_identifier() -> u16 {
    (std::process::id() & 0xffff) as u16
}

/// Host name with a `:port` suffix dropped, `None` when it is empty or holds
/// anything but alphanumerics, `.` and `-`.
fn valid_hostname(hostname: &str) -> Option<&str> {
    let hostname = hostname.split(':').next().unwrap_or(hostname);
    let valid = !hostname.is_empty()
        && hostname
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
    valid.then_some(hostname)
}

/// Resolves `host` to an address. Address literals are used as they are and
/// decide the family themselves; names resolve to their first address of
/// `family`.
pub async fn resolve(host: &str, family: Family) -> Result<IpAddr, ProbeError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let name = valid_hostname(host).ok_or_else(|| {
        ProbeError::UnknownHost(format!("{} (invalid host name)", host))
    })?;

    let mut addrs = tokio::net::lookup_host((name, 0))
        .await
        .map_err(|err| ProbeError::UnknownHost(format!("{} ({})", host, err)))?;
    addrs
        .find(|addr| Family::of(&addr.ip()) == family)
        .map(|addr| addr.ip())
        .ok_or_else(|| {
            ProbeError::UnknownHost(format!("{} (no {} address)", host, family))
        })
}

/// Summary used when the destination never resolved.
pub fn unresolved_result(family: Family) -> SessionResult {
    let destination_ip = match family {
        Family::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        Family::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    SessionResult {
        destination_ip,
        timestamp: now_timestamp(),
        loss_rate_pct: 0.0,
        min_rtt_ms: 0.0,
        avg_rtt_ms: 0.0,
        max_rtt_ms: 0.0,
        bandwidth: 0.0,
        jitter: 0.0,
    }
}

fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// One measurement run against one destination.
pub struct ProbeSession {
    host: String,
    address: IpAddr,
    family: Family,
    options: ProbeOptions,
    identifier: u16,
    sequence: u64,
    stats: ProbeStats,
    scheduler: Scheduler,
}

impl ProbeSession {
    pub fn new(host: impl Into<String>, address: IpAddr, options: ProbeOptions) -> Self {
        let scheduler =
            Scheduler::new(options.interval, options.count, options.deadline);
        Self {
            host: host.into(),
            address,
            family: Family::of(&address),
            identifier: options.identifier.unwrap_or_else(process_identifier),
            options,
            sequence: 0,
            stats: ProbeStats::new(),
            scheduler,
        }
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn stats(&self) -> &ProbeStats {
        &self.stats
    }

    fn payload_len(&self) -> usize {
        self.options.packet_size.saturating_sub(ICMP_HEADER_LEN)
    }

    /// Probes until the count or deadline is reached or `shutdown` resolves,
    /// then finalizes with whatever the counters hold. Only a socket that
    /// cannot be opened ends the run with an error.
    pub async fn run<T, F>(
        &mut self,
        transport: &mut T,
        shutdown: F,
    ) -> Result<SessionReport, ProbeError>
    where
        T: ProbeTransport,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        if !self.options.quiet {
            println!("{}", report::banner(&self.host, self.address, self.payload_len()));
        }

        loop {
            let outcome = tokio::select! {
                _ = &mut shutdown => {
                    info!("probe session to {} interrupted", self.address);
                    break;
                }
                outcome = self.probe_once(transport) => outcome?,
            };
            if !self.options.quiet {
                println!("{}", report::probe_line(&outcome, self.address));
            }

            self.sequence += 1;
            if self.scheduler.is_done(self.sequence) {
                break;
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("probe session to {} interrupted", self.address);
                    break;
                }
                _ = self.scheduler.tick(outcome.rtt()) => {}
            }
        }

        Ok(self.finalize())
    }

    /// Sends one echo request on a fresh channel and waits for its reply. The
    /// channel is closed when this returns.
    pub async fn probe_once<T: ProbeTransport>(
        &mut self,
        transport: &mut T,
    ) -> Result<ProbeOutcome, ProbeError> {
        let mut channel = transport
            .open(self.family)
            .map_err(ProbeError::SocketUnavailable)?;

        let sequence = self.sequence as u16;
        let packet = codec::encode(
            self.identifier,
            sequence,
            self.options.packet_size,
            self.family,
        );
        let sent_at = Instant::now();
        if let Err(err) = channel.send_to(&packet, self.address).await {
            warn!("{}", ProbeError::SendFailed(err));
            return Ok(ProbeOutcome::SendFailed { sequence });
        }
        self.stats.record_sent(self.scheduler.offset_secs(sent_at));

        Ok(self.await_reply(&mut channel, sequence, sent_at).await)
    }

    async fn await_reply<C: ProbeChannel>(
        &mut self,
        channel: &mut C,
        sequence: u16,
        sent_at: Instant,
    ) -> ProbeOutcome {
        let mut buf = [0u8; MAX_RECV];
        let mut control_message = None;

        loop {
            let budget = remaining_budget(self.options.timeout, sent_at.elapsed());
            if budget.is_zero() {
                break;
            }
            let len = match tokio::time::timeout(budget, channel.recv(&mut buf)).await {
                Err(_elapsed) => break,
                Ok(Err(err)) => {
                    warn!("receive failed for icmp_seq {}: {}", sequence, err);
                    break;
                }
                Ok(Ok(len)) => len,
            };
            let received_at = Instant::now();

            let reply = match codec::decode(&buf[..len], self.family) {
                Ok(reply) => reply,
                Err(err) => {
                    warn!("discarding datagram while waiting for icmp_seq {}: {}", sequence, err);
                    continue;
                }
            };
            let icmp = *reply.icmp();

            if icmp.identifier != self.identifier {
                if !icmp.is_echo(self.family) {
                    let message =
                        icmp_messages::describe(self.family, icmp.icmp_type, icmp.code);
                    debug!(
                        "control message type {} code {}: {}",
                        icmp.icmp_type, icmp.code, message
                    );
                    control_message = Some(message);
                }
                debug!(
                    "ignoring ICMP type {} with identifier {} (ours is {})",
                    icmp.icmp_type, icmp.identifier, self.identifier
                );
                continue;
            }
            if !icmp.is_echo_reply(self.family) {
                debug!("ignoring own ICMP type {} for icmp_seq {}", icmp.icmp_type, icmp.sequence);
                continue;
            }

            let rtt = received_at.saturating_duration_since(sent_at);
            self.stats.record_reply(
                rtt.as_secs_f64() * 1000.0,
                self.scheduler.offset_secs(received_at),
            );
            return ProbeOutcome::Reply {
                sequence: icmp.sequence,
                ttl: reply.ttl(),
                rtt,
            };
        }

        match control_message {
            Some(message) => ProbeOutcome::ControlMessage { sequence, message },
            None => ProbeOutcome::Timeout { sequence },
        }
    }

    /// Computes the session summary. Safe to call at any point of the run.
    pub fn finalize(&mut self) -> SessionReport {
        let result = self.stats.summarize(
            self.address,
            now_timestamp(),
            self.payload_len(),
        );
        info!("probe session to {} finished: {}", self.address, self.stats);
        SessionReport {
            result,
            sent: self.stats.sent(),
            received: self.stats.received(),
        }
    }

    /// Prints the summary block.
    pub fn print_summary(&self, report: &SessionReport) {
        println!("{}", report::summary(&self.host, &self.stats, &report.result));
    }
}

/// Resolves `host` and runs a full session against it.
pub async fn run_session<T, F>(
    host: &str,
    family: Family,
    options: ProbeOptions,
    transport: &mut T,
    shutdown: F,
) -> Result<SessionOutcome, ProbeError>
where
    T: ProbeTransport,
    F: Future<Output = ()>,
{
    let address = match resolve(host, family).await {
        Ok(address) => address,
        Err(ProbeError::UnknownHost(reason)) => {
            eprintln!("{}", report::unknown_host(host, &reason));
            return Ok(SessionOutcome::UnknownHost(unresolved_result(family)));
        }
        Err(err) => return Err(err),
    };

    let mut session = ProbeSession::new(host, address, options);
    let report = session.run(transport, shutdown).await?;
    session.print_summary(&report);
    Ok(SessionOutcome::Completed(report))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hostname_validation() {
        assert_eq!(valid_hostname("example.org:8080"), Some("example.org"));
        assert_eq!(valid_hostname("gw-1.lan"), Some("gw-1.lan"));
        assert_eq!(valid_hostname("ex ample.org"), None);
        assert_eq!(valid_hostname("example.org/x"), None);
        assert_eq!(valid_hostname("!!!"), None);
        assert_eq!(valid_hostname(""), None);
    }

    #[tokio::test]
    async fn literal_addresses_skip_lookup() {
        assert_eq!(
            resolve("127.0.0.1", Family::V4).await.unwrap(),
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        );
        assert_eq!(
            resolve("::1", Family::V4).await.unwrap(),
            IpAddr::V6(Ipv6Addr::LOCALHOST)
        );
    }

    #[tokio::test]
    async fn unusable_name_is_unknown_host() {
        for host in ["%%%", "ex ample.org", "localhost;reboot"] {
            assert!(matches!(
                resolve(host, Family::V4).await,
                Err(ProbeError::UnknownHost(_))
            ));
        }
    }

    #[test]
    fn unresolved_result_is_all_zero() {
        let result = unresolved_result(Family::V6);
        assert_eq!(result.destination_ip, IpAddr::V6(Ipv6Addr::UNSPECIFIED));
        assert_eq!(result.loss_rate_pct, 0.0);
        assert_eq!(result.avg_rtt_ms, 0.0);
    }

    #[test]
    fn identifier_override() {
        let options = ProbeOptions {
            identifier: Some(4321),
            ..ProbeOptions::default()
        };
        let session =
            ProbeSession::new("localhost", IpAddr::V4(Ipv4Addr::LOCALHOST), options);
        assert_eq!(session.identifier(), 4321);

        let session = ProbeSession::new(
            "localhost",
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            ProbeOptions::default(),
        );
        assert_eq!(session.identifier(), process_identifier());
    }
}
