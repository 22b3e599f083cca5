// src/net/mod.rs

//! Container addressing: address allocation, MAC derivation and the
//! synthesized DNS service.

pub mod allocator;
pub mod dns;
pub mod mac;

pub use allocator::{AddressAllocator, AddressAssignment};
pub use dns::{DNS_IMAGE_TASK, DNS_TASK, DnsProvisioner};
pub use mac::mac_for_ip;
