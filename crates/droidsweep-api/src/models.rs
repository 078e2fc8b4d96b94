// Wire-level records reported by the ADB server and parsers for the
// textual output of common device commands.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One line of `host:devices-l` output.
///
/// `state` is the raw string the server reports (`device`, `unauthorized`,
/// `offline`, `recovery`, ...). Classification happens in core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub serial: String,
    pub state: String,
    pub product: Option<String>,
    pub model: Option<String>,
    pub device: Option<String>,
    pub transport_id: Option<u64>,
}

/// Parse the body of a `host:devices` or `host:devices-l` reply.
///
/// Each non-empty line is `serial<ws>state[ key:value...]`. The state may
/// contain spaces (`no permissions ...`), so everything up to the first
/// `key:value` token belongs to it.
pub fn parse_devices(body: &str) -> Vec<DeviceEntry> {
    body.lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let serial = tokens.next()?.to_owned();

            let mut state_parts: Vec<&str> = Vec::new();
            let mut attrs: BTreeMap<&str, &str> = BTreeMap::new();
            for token in tokens {
                match token.split_once(':') {
                    Some((key, value)) if !state_parts.is_empty() && is_attr_key(key) => {
                        attrs.insert(key, value);
                    }
                    _ if attrs.is_empty() => state_parts.push(token),
                    _ => {}
                }
            }
            if state_parts.is_empty() {
                return None;
            }

            Some(DeviceEntry {
                serial,
                state: state_parts.join(" "),
                product: attrs.get("product").map(|s| (*s).to_owned()),
                model: attrs.get("model").map(|s| (*s).to_owned()),
                device: attrs.get("device").map(|s| (*s).to_owned()),
                transport_id: attrs.get("transport_id").and_then(|s| s.parse().ok()),
            })
        })
        .collect()
}

fn is_attr_key(key: &str) -> bool {
    matches!(key, "usb" | "product" | "model" | "device" | "transport_id")
}

/// Parse `getprop` output: lines of the form `[key]: [value]`.
pub fn parse_properties(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix('[')?;
            let (key, rest) = rest.split_once("]: [")?;
            let value = rest.strip_suffix(']')?;
            Some((key.to_owned(), value.to_owned()))
        })
        .collect()
}

/// Parse `pm list packages` output: lines of the form `package:<name>`.
pub fn parse_packages(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("package:"))
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Extract the first IPv4 address from `ip -f inet addr show <iface>`.
///
/// Looks for `inet a.b.c.d/nn` and returns `a.b.c.d`.
pub fn parse_inet_address(output: &str) -> Option<std::net::Ipv4Addr> {
    output.lines().find_map(|line| {
        let mut tokens = line.split_whitespace();
        while let Some(token) = tokens.next() {
            if token == "inet" {
                let cidr = tokens.next()?;
                let addr = cidr.split('/').next()?;
                return addr.parse().ok();
            }
        }
        None
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_long_device_listing() {
        let body = "emulator-5554          device product:sdk_gphone64 model:sdk_gphone64_x86_64 device:emu64xa transport_id:1\n\
                    R58N12ABCDE            unauthorized usb:1-1 transport_id:2\n\
                    192.168.1.20:5555      offline\n";
        let devices = parse_devices(body);

        assert_eq!(devices.len(), 3);
        assert_eq!(devices[0].serial, "emulator-5554");
        assert_eq!(devices[0].state, "device");
        assert_eq!(devices[0].model.as_deref(), Some("sdk_gphone64_x86_64"));
        assert_eq!(devices[0].transport_id, Some(1));
        assert_eq!(devices[1].state, "unauthorized");
        assert_eq!(devices[1].model, None);
        assert_eq!(devices[2].serial, "192.168.1.20:5555");
        assert_eq!(devices[2].state, "offline");
    }

    #[test]
    fn parses_short_listing_with_tabs() {
        let devices = parse_devices("abc123\tdevice\nxyz\tno permissions\n\n");
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[1].state, "no permissions");
    }

    #[test]
    fn empty_listing_is_empty() {
        assert!(parse_devices("").is_empty());
    }

    #[test]
    fn parses_getprop_lines() {
        let out = "[ro.product.model]: [Pixel 7]\r\n[ro.build.version.sdk]: [34]\n[empty]: []\nnoise\n";
        let props = parse_properties(out);
        assert_eq!(props.get("ro.product.model").unwrap(), "Pixel 7");
        assert_eq!(props.get("ro.build.version.sdk").unwrap(), "34");
        assert_eq!(props.get("empty").unwrap(), "");
        assert_eq!(props.len(), 3);
    }

    #[test]
    fn parses_package_list() {
        let out = "package:com.android.settings\npackage:com.example.app\r\n\nWARNING: linker\n";
        assert_eq!(
            parse_packages(out),
            vec!["com.android.settings", "com.example.app"]
        );
    }

    #[test]
    fn extracts_inet_address() {
        let out = "30: wlan0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 qdisc mq state UP group default qlen 3000\n    \
                   inet 192.168.29.60/24 brd 192.168.29.255 scope global wlan0\n       \
                   valid_lft forever preferred_lft forever\n";
        assert_eq!(
            parse_inet_address(out),
            Some(std::net::Ipv4Addr::new(192, 168, 29, 60))
        );
    }

    #[test]
    fn missing_inet_address_is_none() {
        assert_eq!(parse_inet_address("Device \"wlan0\" does not exist.\n"), None);
        assert_eq!(parse_inet_address(""), None);
    }
}
