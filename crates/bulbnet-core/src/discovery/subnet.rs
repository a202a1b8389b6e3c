//! Probe target resolution from local interfaces.

use std::net::{IpAddr, Ipv4Addr};

/// Directed broadcast addresses for the local subnets worth probing.
///
/// Falls back to the limited broadcast address when nothing qualifies or the
/// interfaces cannot be listed.
pub fn resolve_broadcast_targets() -> Vec<Ipv4Addr> {
    match if_addrs::get_if_addrs() {
        Ok(interfaces) => {
            let targets = broadcast_targets_from(interfaces.iter().map(|iface| iface.ip()));
            tracing::debug!(
                interfaces = interfaces.len(),
                targets = ?targets,
                "resolved broadcast targets"
            );
            targets
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to enumerate local interfaces, using global broadcast");
            vec![Ipv4Addr::BROADCAST]
        }
    }
}

/// Map local addresses to broadcast targets, keeping enumeration order.
///
/// Duplicates are kept; probing a subnet twice is harmless.
pub fn broadcast_targets_from<I>(addrs: I) -> Vec<Ipv4Addr>
where
    I: IntoIterator<Item = IpAddr>,
{
    let mut targets: Vec<Ipv4Addr> = addrs
        .into_iter()
        .filter_map(|addr| match addr {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .filter(is_probe_subnet)
        .map(subnet_broadcast)
        .collect();

    if targets.is_empty() {
        targets.push(Ipv4Addr::BROADCAST);
    }

    targets
}

/// 10.0.0.0/8 or 192.168.0.0/16.
///
/// 172.16.0.0/12 is deliberately not matched.
pub fn is_probe_subnet(addr: &Ipv4Addr) -> bool {
    let octets = addr.octets();
    octets[0] == 10 || (octets[0] == 192 && octets[1] == 168)
}

/// Broadcast address assuming a /24: last octet set to 255.
pub fn subnet_broadcast(addr: Ipv4Addr) -> Ipv4Addr {
    let [a, b, c, _] = addr.octets();
    Ipv4Addr::new(a, b, c, 255)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    fn v4(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(a, b, c, d))
    }

    #[test]
    fn test_home_subnet() {
        let targets = broadcast_targets_from([v4(192, 168, 1, 42)]);
        assert_eq!(targets, vec![Ipv4Addr::new(192, 168, 1, 255)]);
    }

    #[test]
    fn test_ten_subnet_keeps_first_three_octets() {
        let targets = broadcast_targets_from([v4(10, 20, 30, 40)]);
        assert_eq!(targets, vec![Ipv4Addr::new(10, 20, 30, 255)]);
    }

    #[test]
    fn test_only_172_falls_back_to_global_broadcast() {
        let targets = broadcast_targets_from([v4(172, 16, 5, 4)]);
        assert_eq!(targets, vec![Ipv4Addr::new(255, 255, 255, 255)]);
    }

    #[test]
    fn test_no_addresses_falls_back() {
        let targets = broadcast_targets_from(Vec::new());
        assert_eq!(targets, vec![Ipv4Addr::BROADCAST]);
    }

    #[test]
    fn test_skips_loopback_ipv6_and_other_ranges() {
        let targets = broadcast_targets_from([
            v4(127, 0, 0, 1),
            IpAddr::V6(Ipv6Addr::LOCALHOST),
            v4(10, 0, 0, 7),
            v4(192, 169, 1, 1),
            v4(192, 168, 7, 9),
        ]);

        assert_eq!(
            targets,
            vec![Ipv4Addr::new(10, 0, 0, 255), Ipv4Addr::new(192, 168, 7, 255)]
        );
    }

    #[test]
    fn test_duplicates_are_kept() {
        let targets = broadcast_targets_from([v4(192, 168, 1, 2), v4(192, 168, 1, 3)]);
        assert_eq!(targets.len(), 2);
        assert!(targets.iter().all(|t| *t == Ipv4Addr::new(192, 168, 1, 255)));
    }

    #[test]
    fn test_resolve_never_returns_empty() {
        assert!(!resolve_broadcast_targets().is_empty());
    }
}
