//! Resolve, build, send.
use log::{debug, info};

use crate::config::{Config, Target};
use crate::error::{Error, Result};
use crate::mac::MacAddress;
use crate::resolve::{AddressResolver, NeighborResolver, NeighborTableReader};
use crate::wol::{self, MagicPacket, Transport};

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to wake; the caller should print usage.
    Usage,
    Sent { mac: MacAddress, port: u16 },
}

pub fn run<T, N>(
    config: &Config,
    resolver: &AddressResolver<T, N>,
    transport: &dyn Transport,
) -> Result<Outcome>
where
    T: NeighborTableReader,
    N: NeighborResolver,
{
    let mac = match config.target {
        None => return Ok(Outcome::Usage),
        Some(Target::Mac(mac)) => mac,
        Some(Target::Both(mac, ip)) => {
            debug!("MAC address given, not resolving {ip}");
            mac
        }
        Some(Target::Ip(ip)) => {
            info!("trying to determine MAC address from {ip}");
            let mac = resolver.resolve(ip)?;
            info!("MAC address determined to be {mac}");
            mac
        }
    };

    info!("sending Wake-on-LAN packet to {mac} on UDP port {}", config.port);
    let packet = MagicPacket::new(&mac);
    transport
        .send(wol::broadcast_addr(config.port), packet.as_bytes())
        .map_err(Error::TransmissionFailed)?;

    Ok(Outcome::Sent {
        mac,
        port: config.port,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io;
    use std::net::{Ipv4Addr, SocketAddrV4};

    use assert_matches::assert_matches;

    use super::*;
    use crate::resolve::fake::Fixed;

    const MAC: MacAddress = MacAddress::new([0x00, 0x0c, 0x29, 0x14, 0x98, 0xf3]);
    const IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);

    #[derive(Default)]
    struct Recorder {
        sent: RefCell<Vec<(SocketAddrV4, Vec<u8>)>>,
        fail: bool,
    }

    impl Transport for Recorder {
        fn send(&self, dest: SocketAddrV4, payload: &[u8]) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::Other, "network unreachable"));
            }
            self.sent.borrow_mut().push((dest, payload.to_vec()));
            Ok(())
        }
    }

    fn config(target: Option<Target>, port: u16) -> Config {
        Config {
            target,
            port,
            verbose: false,
        }
    }

    #[test]
    fn no_target_means_usage() {
        let transport = Recorder::default();
        let resolver = AddressResolver::new(Fixed::answering(MAC), Fixed::default());
        let outcome = run(&config(None, 9), &resolver, &transport).unwrap();

        assert_eq!(outcome, Outcome::Usage);
        assert!(transport.sent.borrow().is_empty());
    }

    #[test]
    fn mac_sends_one_packet() {
        let transport = Recorder::default();
        let resolver = AddressResolver::new(Fixed::default(), Fixed::default());
        let outcome = run(&config(Some(Target::Mac(MAC)), 9), &resolver, &transport).unwrap();

        assert_eq!(outcome, Outcome::Sent { mac: MAC, port: 9 });
        let sent = transport.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.to_string(), "255.255.255.255:9");
        assert_eq!(sent[0].1, MagicPacket::new(&MAC).as_bytes());
    }

    #[test]
    fn explicit_mac_skips_resolution() {
        let transport = Recorder::default();
        let resolver = AddressResolver::new(Fixed::default(), Fixed::default());
        run(&config(Some(Target::Both(MAC, IP)), 7), &resolver, &transport).unwrap();

        assert_eq!(transport.sent.borrow()[0].0.port(), 7);
    }

    #[test]
    fn ip_is_resolved() {
        let transport = Recorder::default();
        let resolver = AddressResolver::new(Fixed::default(), Fixed::answering(MAC));
        let outcome = run(&config(Some(Target::Ip(IP)), 9), &resolver, &transport).unwrap();

        assert_eq!(outcome, Outcome::Sent { mac: MAC, port: 9 });
        assert_eq!(transport.sent.borrow().len(), 1);
    }

    #[test]
    fn unresolved_ip_sends_nothing() {
        let transport = Recorder::default();
        let resolver = AddressResolver::new(Fixed::default(), Fixed::default());
        let result = run(&config(Some(Target::Ip(IP)), 9), &resolver, &transport);

        assert_matches!(result, Err(Error::ResolutionFailed(_)));
        assert!(transport.sent.borrow().is_empty());
    }

    #[test]
    fn send_failure_is_reported() {
        let transport = Recorder {
            fail: true,
            ..Default::default()
        };
        let resolver = AddressResolver::new(Fixed::default(), Fixed::default());
        let result = run(&config(Some(Target::Mac(MAC)), 9), &resolver, &transport);

        assert_matches!(result, Err(Error::TransmissionFailed(_)));
    }
}
