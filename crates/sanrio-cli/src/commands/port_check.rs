//! `port-check`: report whether a TCP port accepts connections.

use std::time::Duration;

use sanrio_lib::check_port;

/// Line printed for a probe result.
pub fn status_line(host: &str, port: u16, open: bool) -> String {
    let state = if open { "OPEN" } else { "CLOSED" };
    format!("Port {} on {} is {}", port, host, state)
}

/// Probe `host:port` and print the result. A closed port is not an error.
pub async fn handle_port_check(host: &str, port: u16, timeout: Duration) -> bool {
    let open = check_port(host, port, timeout).await;
    println!("{}", status_line(host, port, open));
    open
}
