//! Address formatting helpers

use std::fmt::Display;

/// Format `host:port` for use in a URL.
///
/// Hosts containing a colon are taken to be IPv6 literals and get wrapped
/// in brackets.
pub fn host_port_for_url(host: &str, port: impl Display) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_host_is_not_bracketed() {
        assert_eq!(host_port_for_url("192.168.0.1", 80), "192.168.0.1:80");
        assert_eq!(host_port_for_url("localhost", "8080"), "localhost:8080");
    }

    #[test]
    fn ipv6_host_is_bracketed() {
        assert_eq!(host_port_for_url("::1", 443), "[::1]:443");
        assert_eq!(
            host_port_for_url("fe80::1%eth0", 22),
            "[fe80::1%eth0]:22"
        );
    }
}
