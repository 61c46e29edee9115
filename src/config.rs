use std::net::Ipv4Addr;

use crate::error::{Error, Result};
use crate::mac::MacAddress;
use crate::resolve::parse_ipv4;

/// Who to wake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Mac(MacAddress),
    Ip(Ipv4Addr),
    /// An explicit MAC wins; the IP is informational only.
    Both(MacAddress, Ipv4Addr),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// `None` when neither address was given.
    pub target: Option<Target>,
    pub port: u16,
    pub verbose: bool,
}

impl Config {
    /// Validates the raw address text as given on the command line.
    pub fn new(ip: Option<&str>, mac: Option<&str>, port: u16, verbose: bool) -> Result<Self> {
        let ip = ip.map(parse_ipv4).transpose()?;
        let mac = mac
            .map(|mac| mac.trim().parse::<MacAddress>())
            .transpose()
            .map_err(Error::from)?;

        let target = match (mac, ip) {
            (Some(mac), Some(ip)) => Some(Target::Both(mac, ip)),
            (Some(mac), None) => Some(Target::Mac(mac)),
            (None, Some(ip)) => Some(Target::Ip(ip)),
            (None, None) => None,
        };

        Ok(Config {
            target,
            port,
            verbose,
        })
    }
}
