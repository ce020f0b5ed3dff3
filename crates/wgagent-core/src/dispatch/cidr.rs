//! IPv4 CIDR parsing for interface and route parameters

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 address with prefix length, e.g. `10.0.0.1/24`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Cidr {
    addr: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Option<Self> {
        (prefix <= 32).then_some(Self { addr, prefix })
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Dotted-quad netmask for the prefix length
    pub fn netmask(&self) -> Ipv4Addr {
        let bits = match self.prefix {
            0 => 0,
            n => u32::MAX << (32 - u32::from(n)),
        };
        Ipv4Addr::from(bits)
    }

    /// Address with host bits cleared
    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.addr) & u32::from(self.netmask()))
    }
}

impl FromStr for Ipv4Cidr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| format!("'{}' is not in A.B.C.D/N notation", s))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| format!("'{}' is not an IPv4 address", addr))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| format!("'{}' is not a prefix length", prefix))?;
        Self::new(addr, prefix).ok_or_else(|| format!("prefix length {} exceeds 32", prefix))
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}
