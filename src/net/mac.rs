// src/net/mac.rs

use std::net::Ipv4Addr;

/// Locally administered prefix written over the first two bytes.
pub const MAC_PREFIX: [&str; 2] = ["02", "42"];

/// Derive a MAC address from an IPv4 address.
///
/// Every octet is zero-padded to three decimal digits, the twelve digits are
/// read as six hex byte pairs, and the first two pairs are replaced by
/// [`MAC_PREFIX`]. `172.17.0.2` becomes `02:42:17:00:00:02`.
pub fn mac_for_ip(ip: Ipv4Addr) -> String {
    let digits: String = ip.octets().iter().map(|o| format!("{o:03}")).collect();

    let mut pairs: Vec<&str> = (0..6).map(|i| &digits[i * 2..i * 2 + 2]).collect();
    pairs[0] = MAC_PREFIX[0];
    pairs[1] = MAC_PREFIX[1];
    pairs.join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_is_a_pure_function_of_the_address() {
        let ip = Ipv4Addr::new(10, 0, 0, 5);
        assert_eq!(mac_for_ip(ip), mac_for_ip(ip));
        assert_eq!(mac_for_ip(ip), "02:42:00:00:00:05");
    }

    #[test]
    fn mac_keeps_low_octets() {
        assert_eq!(mac_for_ip(Ipv4Addr::new(172, 17, 0, 2)), "02:42:17:00:00:02");
        assert_eq!(mac_for_ip(Ipv4Addr::new(172, 17, 1, 255)), "02:42:17:00:12:55");
    }

    #[test]
    fn distinct_suffixes_give_distinct_macs() {
        let a = mac_for_ip(Ipv4Addr::new(172, 17, 0, 10));
        let b = mac_for_ip(Ipv4Addr::new(172, 17, 1, 0));
        assert_ne!(a, b);
        assert!(a.starts_with("02:42:"));
    }
}
