use clap::{Parser, ValueEnum};

use crate::msg::{PathState, RateMode};
use crate::units;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pathctl",
    about = "Inspect and tune the paths of the multipath tunnel daemon"
)]
pub struct Cli {
    /// Interface name of the path to select or modify
    #[arg(value_name = "IFNAME")]
    pub ifname: Option<String>,
    /// Control device name under the runtime directory
    #[arg(long, value_name = "NAME")]
    pub dev: Option<String>,
    /// Mark the path usable
    #[arg(long, group = "state")]
    pub up: bool,
    /// Keep the path as a standby
    #[arg(long, group = "state")]
    pub backup: bool,
    /// Stop using the path
    #[arg(long, group = "state")]
    pub down: bool,
    /// Rate control mode
    #[arg(long, value_enum, value_name = "MODE")]
    pub rate: Option<RateArg>,
    /// Transmit rate
    #[arg(long, value_name = "BYTES/SEC")]
    pub tx: Option<u64>,
    /// Receive rate
    #[arg(long, value_name = "BYTES/SEC")]
    pub rx: Option<u64>,
    /// Keep-alive probe interval
    #[arg(long, value_name = "SECONDS")]
    pub beat: Option<u64>,
    /// Prefer this path over other usable paths
    #[arg(long)]
    pub preferred: bool,
    /// Loss tolerance
    #[arg(long, value_name = "PERCENT", value_parser = clap::value_parser!(u64).range(0..=100))]
    pub losslimit: Option<u64>,
    /// Round-trip time tolerance
    #[arg(long, value_name = "MS")]
    pub rttlimit: Option<u64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateArg {
    Fixed,
    Auto,
}

/// Everything the core needs, as plain data: the core never sees clap.
#[derive(Debug, Clone, Default)]
pub struct PathOptions {
    pub dev: Option<String>,
    pub ifname: Option<String>,
    pub state: Option<PathState>,
    pub rate_mode: Option<RateMode>,
    pub rate_tx: Option<u64>,
    pub rate_rx: Option<u64>,
    /// Wire time units (microseconds).
    pub beat: Option<u64>,
    pub preferred: bool,
    /// Percent, 0-100; translated to the wire scale when a patch is built.
    pub loss_limit: Option<u64>,
    /// Milliseconds; translated to wire time units when a patch is built.
    pub rtt_limit: Option<u64>,
}

impl Cli {
    pub fn into_options(self) -> PathOptions {
        let state = if self.up {
            Some(PathState::Up)
        } else if self.backup {
            Some(PathState::Backup)
        } else if self.down {
            Some(PathState::Down)
        } else {
            None
        };
        PathOptions {
            dev: self.dev,
            ifname: self.ifname,
            state,
            rate_mode: self.rate.map(|r| match r {
                RateArg::Fixed => RateMode::Fixed,
                RateArg::Auto => RateMode::Auto,
            }),
            rate_tx: self.tx,
            rate_rx: self.rx,
            beat: self.beat.map(units::secs_to_wire),
            preferred: self.preferred,
            loss_limit: self.losslimit,
            rtt_limit: self.rttlimit,
        }
    }
}
