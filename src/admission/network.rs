//! Network key derivation from client addresses.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::{NetwardenError, Result};

/// The base address of a client's network.
///
/// Two clients whose addresses agree on the first `mask` bits map to the same
/// key. The key displays as the canonical textual form of the base address,
/// e.g. `192.168.1.0` for `192.168.1.10` under a /24 mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkKey(IpAddr);

impl NetworkKey {
    /// Resolve a raw client address into its network key.
    ///
    /// `raw` must be a bare IPv4 or IPv6 literal without a port. `mask` may be
    /// at most 32 for IPv4 and 128 for IPv6.
    pub fn resolve(raw: &str, mask: u8) -> Result<Self> {
        let addr: IpAddr = raw
            .parse()
            .map_err(|_| NetwardenError::InvalidAddress(raw.to_string()))?;

        let network = match addr {
            IpAddr::V4(v4) => {
                if mask > 32 {
                    return Err(NetwardenError::InvalidMask { mask, family: "IPv4" });
                }
                let bits = u32::from(v4) & prefix_mask_v4(mask);
                IpAddr::V4(Ipv4Addr::from(bits))
            }
            IpAddr::V6(v6) => {
                if mask > 128 {
                    return Err(NetwardenError::InvalidMask { mask, family: "IPv6" });
                }
                let bits = u128::from(v6) & prefix_mask_v6(mask);
                IpAddr::V6(Ipv6Addr::from(bits))
            }
        };

        Ok(Self(network))
    }

    /// The network's base address.
    pub fn addr(&self) -> IpAddr {
        self.0
    }
}

impl fmt::Display for NetworkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn prefix_mask_v4(mask: u8) -> u32 {
    u32::MAX.checked_shl(32 - u32::from(mask)).unwrap_or(0)
}

fn prefix_mask_v6(mask: u8) -> u128 {
    u128::MAX.checked_shl(128 - u32::from(mask)).unwrap_or(0)
}
