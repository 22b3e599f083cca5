// src/net/allocator.rs

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use tracing::debug;

use crate::errors::{Result, RigError};

/// Monotonic generator of container addresses inside the bridge's /16.
///
/// Draws `a.b.0.1`, `a.b.0.2`, ..., `a.b.0.255`, `a.b.1.0`, ... where `a.b`
/// are the first two octets of the bridge address. The bridge address itself
/// is never handed out and no address is handed out twice.
#[derive(Debug, Clone)]
pub struct AddressAllocator {
    bridge: Ipv4Addr,
    prefix: [u8; 2],
    /// Next `(third, fourth)` octet pair; `third == 256` means exhausted.
    next: (u16, u16),
}

impl AddressAllocator {
    pub fn new(bridge: Ipv4Addr) -> Self {
        let [a, b, _, _] = bridge.octets();
        Self {
            bridge,
            prefix: [a, b],
            next: (0, 1),
        }
    }

    pub fn bridge(&self) -> Ipv4Addr {
        self.bridge
    }

    /// Draw the next free address.
    pub fn next_address(&mut self) -> Result<Ipv4Addr> {
        loop {
            let (b0, b1) = self.next;
            if b0 > 255 {
                return Err(RigError::AddressExhaustion(format!(
                    "all addresses in {}.{}.0.0/16 are used",
                    self.prefix[0], self.prefix[1]
                )));
            }

            self.next = if b1 == 255 { (b0 + 1, 0) } else { (b0, b1 + 1) };

            let candidate = Ipv4Addr::new(self.prefix[0], self.prefix[1], b0 as u8, b1 as u8);
            if candidate == self.bridge {
                debug!(%candidate, "skipping bridge address");
                continue;
            }
            return Ok(candidate);
        }
    }
}

/// Container name to allocated address, in allocation order.
///
/// Addresses are pairwise distinct and never equal to the bridge address
/// because they all come from one [`AddressAllocator`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressAssignment {
    entries: Vec<(String, Ipv4Addr)>,
}

impl AddressAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw an address for `container` and record it.
    pub fn assign(&mut self, allocator: &mut AddressAllocator, container: &str) -> Result<Ipv4Addr> {
        if self.get(container).is_some() {
            return Err(RigError::config(format!(
                "container name '{container}' is used by more than one instance"
            )));
        }
        let addr = allocator.next_address()?;
        self.entries.push((container.to_string(), addr));
        Ok(addr)
    }

    pub fn get(&self, container: &str) -> Option<Ipv4Addr> {
        self.entries
            .iter()
            .find(|(name, _)| name == container)
            .map(|(_, addr)| *addr)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Ipv4Addr)> {
        self.entries.iter().map(|(name, addr)| (name.as_str(), *addr))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted view, for display.
    pub fn to_map(&self) -> BTreeMap<String, Ipv4Addr> {
        self.entries.iter().cloned().collect()
    }
}
