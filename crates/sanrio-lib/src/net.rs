//! TCP reachability probe used by operators before starting the service.

use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;

/// Return `true` when a TCP connection to `host:port` succeeds within `timeout`.
///
/// Resolution failures, refusals and timeouts all report `false`.
pub async fn check_port(host: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(err)) => {
            debug!(host = %host, port = port, error = %err, "connection failed");
            false
        }
        Err(_) => {
            debug!(host = %host, port = port, "connection timed out");
            false
        }
    }
}
