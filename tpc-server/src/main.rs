//! Third-party copy daemon

mod args;

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use tpc_common::protocol::ManagerNotification;
use tpc_server::connection;
use tpc_server::constants::*;
use tpc_server::transfer_manager::TcpTransferManager;
use tpc_server::transfers::{HandlerConfig, RemoteTransferHandler};

use args::Args;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    setup_tracing(args.debug);

    // Print banner first
    println!("{}{}", MSG_BANNER, env!("CARGO_PKG_VERSION"));

    // Connect to the transfer manager; its notifications feed the handler
    let (notify_tx, notify_rx) = mpsc::unbounded_channel();
    let manager = match TcpTransferManager::connect(
        &args.transfer_manager,
        Duration::from_secs(args.request_timeout),
        notify_tx,
    )
    .await
    {
        Ok(manager) => manager,
        Err(e) => {
            error!("{}{}: {}", ERR_TRANSFER_MANAGER, args.transfer_manager, e);
            std::process::exit(1);
        }
    };
    info!(address = %args.transfer_manager, "Connected to transfer manager");

    let config = HandlerConfig {
        marker_period: Duration::from_secs(args.marker_period),
        ..HandlerConfig::default()
    };
    let handler = Arc::new(RemoteTransferHandler::new(Arc::new(manager), config));

    let listener = setup_network(args.bind, args.port).await;

    // Setup graceful shutdown handling
    let shutdown_signal = setup_shutdown_signal();

    tokio::select! {
        _ = shutdown_signal => {
            info!("{}", MSG_SHUTDOWN_RECEIVED);
        }
        _ = forward_notifications(notify_rx, handler.clone()) => {
            error!("{}", ERR_TRANSFER_MANAGER_LOST);
        }
        _ = accept_loop(listener, handler) => {}
    }
}

/// Install the fmt subscriber; RUST_LOG overrides `--debug`
fn setup_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Bind the listener for copy requests, exiting on failure
async fn setup_network(bind: IpAddr, port: u16) -> TcpListener {
    let addr = SocketAddr::new(bind, port);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("{}{}: {}", ERR_BIND_FAILED, addr, e);
            std::process::exit(1);
        }
    };
    println!("{}{}", MSG_LISTENING, addr);
    listener
}

/// Accept copy requests, one task per connection
async fn accept_loop(listener: TcpListener, handler: Arc<RemoteTransferHandler>) {
    loop {
        match listener.accept().await {
            Ok((socket, peer_addr)) => {
                debug!(%peer_addr, "Accepted connection");
                let handler = handler.clone();
                tokio::spawn(async move {
                    if let Err(e) = connection::handle_connection(socket, peer_addr, handler).await {
                        log_connection_error(&e, peer_addr);
                    }
                });
            }
            Err(e) => {
                error!("{}{}", ERR_ACCEPT, e);
            }
        }
    }
}

/// Hand transfer manager notifications to the handler
///
/// Returns when the transfer manager connection is gone.
async fn forward_notifications(
    mut notifications: mpsc::UnboundedReceiver<ManagerNotification>,
    handler: Arc<RemoteTransferHandler>,
) {
    while let Some(notification) = notifications.recv().await {
        handler.handle_notification(notification);
    }
}

/// Log a connection error, keeping ordinary disconnects at debug level
fn log_connection_error(error: &io::Error, peer_addr: SocketAddr) {
    match error.kind() {
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::TimedOut => {
            debug!("{}{}: {}", ERR_CONNECTION, peer_addr, error);
        }
        _ => error!("{}{}: {}", ERR_CONNECTION, peer_addr, error),
    }
}

/// Setup graceful shutdown signal handling (Ctrl+C)
async fn setup_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate()).expect(ERR_SIGNAL_SIGTERM);
        let mut sigint = signal(SignalKind::interrupt()).expect(ERR_SIGNAL_SIGINT);

        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect(ERR_SIGNAL_CTRLC);
    }
}
