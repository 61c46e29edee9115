//! IPv4 to hardware address resolution.
//!
//! Two independent strategies are tried in order: a lookup in the host's
//! neighbor (ARP) table, then an active resolution request through the
//! platform. Each reports failure as `None`; only when both come back empty
//! does resolution fail.
use std::net::Ipv4Addr;

use log::debug;

use crate::error::{Error, Result};
use crate::mac::MacAddress;

pub mod native;
pub mod table;

/// Looks an address up in an already populated neighbor table.
pub trait NeighborTableReader {
    fn lookup(&self, ip: Ipv4Addr) -> Option<MacAddress>;
}

/// Asks the platform to resolve an address, which may put an ARP request on
/// the wire.
pub trait NeighborResolver {
    fn resolve(&self, ip: Ipv4Addr) -> Option<MacAddress>;
}

pub struct AddressResolver<T, N> {
    table: T,
    native: N,
}

impl<T: NeighborTableReader, N: NeighborResolver> AddressResolver<T, N> {
    pub fn new(table: T, native: N) -> Self {
        AddressResolver { table, native }
    }

    pub fn resolve(&self, ip: Ipv4Addr) -> Result<MacAddress> {
        if let Some(mac) = self.table.lookup(ip) {
            debug!("found {ip} in neighbor table");
            return Ok(mac);
        }

        debug!("{ip} not in neighbor table, sending resolution request");
        if let Some(mac) = self.native.resolve(ip) {
            return Ok(mac);
        }

        Err(Error::ResolutionFailed(ip))
    }
}

/// Standard dotted-quad parsing; empty input is rejected like any other.
pub fn parse_ipv4(ip: &str) -> Result<Ipv4Addr> {
    ip.trim()
        .parse()
        .map_err(|_| Error::InvalidAddress(format!("'{ip}' is not an IPv4 address")))
}

/// Resolver with the table reader and native request for this platform.
pub fn system() -> AddressResolver<table::SystemTable, native::Native> {
    AddressResolver::new(table::SystemTable::default(), native::Native::default())
}
