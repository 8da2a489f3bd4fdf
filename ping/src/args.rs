use std::{path::PathBuf, time::Duration};

use clap::Parser;
use common::Family;
use ping::ProbeOptions;

#[derive(Parser, Debug)]
#[command(author, version, about = "ICMP echo probe recording daily link quality")]
pub struct Opts {
    /// Host name or address to probe
    pub destination: String,
    /// Number of probes to send, 0 for no limit
    #[arg(long, short, default_value = "50")]
    pub count: u64,
    /// Total ICMP packet size in bytes, header included
    #[arg(long, short, default_value = "64", value_parser = clap::value_parser!(u16).range(8..))]
    pub size: u16,
    /// Time to wait for each reply in seconds
    #[arg(long = "timeout", short = 'W', default_value = "3")]
    pub timeout: f64,
    /// Stop after this many seconds, whatever the count
    #[arg(long, short = 'w')]
    pub deadline: Option<f64>,
    /// Interval between probes in milliseconds
    #[arg(long, short, default_value = "1000")]
    pub interval: u64,
    /// Resolve and probe over IPv6
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub ipv6: bool,
    /// Only print the summary
    #[arg(long, short, action = clap::ArgAction::SetTrue)]
    pub quiet: bool,
    /// Interface to bind to
    #[arg(long, short = 'I')]
    pub iface: Option<String>,
    /// Echo identifier, the process id by default
    #[arg(long)]
    pub id: Option<u16>,
    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Opts {
    pub fn family(&self) -> Family {
        if self.ipv6 {
            Family::V6
        } else {
            Family::V4
        }
    }

    pub fn probe_options(&self) -> ProbeOptions {
        ProbeOptions {
            timeout: secs(self.timeout),
            packet_size: self.size as usize,
            count: (self.count > 0).then_some(self.count),
            deadline: self.deadline.map(secs),
            interval: Duration::from_millis(self.interval),
            identifier: self.id,
            quiet: self.quiet,
        }
    }
}

/// Negative and non-finite values count as zero.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}
