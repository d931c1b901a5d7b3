//! Network address discovery via the `ip` tool

use std::borrow::Cow;
use tracing::debug;

use crate::{CommandResult, CommandRunner};

/// Pipeline printing the interface of the default route
const DEFAULT_ROUTE_DEVICE_COMMAND: &str = r#"ip route | grep default | cut -d" " -f5"#;

/// Pipeline printing the global-scope addresses of `device`, one per line
pub fn addresses_command(device: &str) -> String {
    format!(
        r#"ip addr show dev {} | grep "scope global" | awk -F' ' '{{print $2;}}' | cut -d/ -f1"#,
        shell_escape::unix::escape(Cow::Borrowed(device))
    )
}

/// Split the output of [`addresses_command`] into addresses
pub fn parse_addresses(output: &str) -> Vec<String> {
    output.split_whitespace().map(String::from).collect()
}

/// Device named by the default-route lookup, or `default_device` if it found none
pub fn resolve_device(route_output: &str, default_device: &str) -> String {
    let dev = route_output.trim();
    if dev.is_empty() {
        default_device.to_string()
    } else {
        dev.to_string()
    }
}

/// Look up the global addresses of a network interface.
///
/// Without `device`, the interface of the default route is used, falling
/// back to `default_device` when there is none.
pub fn network_addresses(
    runner: &CommandRunner,
    device: Option<&str>,
    default_device: &str,
) -> CommandResult<Vec<String>> {
    let device = match device {
        Some(dev) => dev.to_string(),
        None => resolve_device(&runner.call(DEFAULT_ROUTE_DEVICE_COMMAND)?, default_device),
    };

    let addresses = parse_addresses(&runner.call(addresses_command(&device))?);
    debug!(device = %device, count = addresses.len(), "Network addresses resolved");
    Ok(addresses)
}
