//! Command-line argument parsing

use std::net::IpAddr;

use clap::Parser;
use tpc_common::{DEFAULT_PORT, DEFAULT_TRANSFER_MANAGER_PORT};

use tpc_server::constants::{DEFAULT_MANAGER_REQUEST_TIMEOUT, DEFAULT_MARKER_PERIOD};

/// Third-party copy daemon
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// IP address to bind to (IPv4 or IPv6)
    #[arg(short, long, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Port to listen on for copy requests
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address of the transfer manager (host:port)
    #[arg(
        short = 'm',
        long = "transfer-manager",
        default_value_t = format!("127.0.0.1:{DEFAULT_TRANSFER_MANAGER_PORT}")
    )]
    pub transfer_manager: String,

    /// Seconds between performance markers
    #[arg(
        long,
        default_value_t = DEFAULT_MARKER_PERIOD.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub marker_period: u64,

    /// Seconds to wait for the transfer manager to answer a request
    #[arg(
        long,
        default_value_t = DEFAULT_MANAGER_REQUEST_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub request_timeout: u64,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, default_value = "false")]
    pub debug: bool,
}
