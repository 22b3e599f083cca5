// tests/property_allocator.rs

use std::collections::HashSet;
use std::net::Ipv4Addr;

use proptest::prelude::*;

use dockrig::net::{AddressAllocator, AddressAssignment, mac_for_ip};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn addresses_are_distinct_and_skip_the_bridge(
        octets in any::<[u8; 4]>(),
        draws in 1..700usize,
    ) {
        let bridge = Ipv4Addr::from(octets);
        let mut allocator = AddressAllocator::new(bridge);

        let mut seen = HashSet::new();
        for _ in 0..draws {
            let ip = allocator.next_address().unwrap();
            prop_assert_ne!(ip, bridge);
            let [a, b, _, _] = ip.octets();
            prop_assert_eq!([a, b], [octets[0], octets[1]]);
            prop_assert!(seen.insert(ip), "{} handed out twice", ip);
        }
    }

    #[test]
    fn assignment_gives_every_container_its_own_mac(count in 1..300usize) {
        let mut allocator = AddressAllocator::new(Ipv4Addr::new(172, 17, 0, 1));
        let mut assignment = AddressAssignment::new();
        for i in 0..count {
            assignment.assign(&mut allocator, &format!("node{i}")).unwrap();
        }

        prop_assert_eq!(assignment.len(), count);
        let macs: HashSet<String> = assignment.iter().map(|(_, ip)| mac_for_ip(ip)).collect();
        prop_assert_eq!(macs.len(), count);
    }
}
