//! Active resolution through the platform.
//!
//! Linux has no single "resolve this address" call, so a datagram is sent to
//! the target to make the kernel issue an ARP request, and the resulting
//! entry is read back with the `SIOCGARP` ioctl. Windows offers `SendARP`
//! from the IP Helper API. Elsewhere the probe is followed by a second look
//! at the neighbor table.
use std::io;
use std::net::{Ipv4Addr, UdpSocket};
use std::thread;
use std::time::Duration;

use log::debug;

use super::{NeighborResolver, NeighborTableReader};
use crate::mac::MacAddress;

/// Discard service; nothing is expected to answer.
const PROBE_PORT: u16 = 9;
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const POLLS: usize = 10;

#[cfg(target_os = "linux")]
pub type Native = linux::Ioctl;
#[cfg(windows)]
pub type Native = windows::SendArp;
#[cfg(not(any(target_os = "linux", windows)))]
pub type Native = TableOnly<super::table::SystemTable>;

/// Sends an empty datagram so the kernel has to resolve `ip` before it can
/// transmit.
fn probe(ip: Ipv4Addr) -> io::Result<()> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.send_to(&[], (ip, PROBE_PORT))?;
    Ok(())
}

/// Repeats `attempt` until it yields or the poll budget runs out.
fn poll<F>(mut attempt: F) -> Option<MacAddress>
where
    F: FnMut() -> Option<MacAddress>,
{
    for i in 0..POLLS {
        if let Some(mac) = attempt() {
            return Some(mac);
        }
        if i + 1 < POLLS {
            thread::sleep(POLL_INTERVAL);
        }
    }
    None
}

/// Probes the target and then re-reads a neighbor table. Works wherever the
/// table can be read at all.
#[cfg_attr(any(target_os = "linux", windows), allow(dead_code))]
pub struct TableOnly<T> {
    table: T,
}

#[cfg_attr(any(target_os = "linux", windows), allow(dead_code))]
impl<T: NeighborTableReader> TableOnly<T> {
    pub fn new(table: T) -> Self {
        TableOnly { table }
    }
}

impl<T: NeighborTableReader + Default> Default for TableOnly<T> {
    fn default() -> Self {
        TableOnly::new(T::default())
    }
}

impl<T: NeighborTableReader> NeighborResolver for TableOnly<T> {
    fn resolve(&self, ip: Ipv4Addr) -> Option<MacAddress> {
        if let Err(err) = probe(ip) {
            debug!("unable to probe {ip}: {err}");
            return None;
        }
        poll(|| self.table.lookup(ip))
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use std::ffi::CStr;
    use std::io;
    use std::mem;
    use std::net::{Ipv4Addr, UdpSocket};
    use std::os::unix::io::AsRawFd;

    use log::debug;

    use super::{poll, probe};
    use crate::mac::{MacAddress, MAC_LEN};
    use crate::resolve::NeighborResolver;

    const SIOCGARP: libc::c_ulong = 0x8954;

    const ATF_COM: libc::c_int = 0x02;

    const ARPHRD_ETHER: libc::sa_family_t = 1;

    #[repr(C)]
    #[allow(non_camel_case_types, dead_code)]
    /// [https://man7.org/linux/man-pages/man7/arp.7.html](https://man7.org/linux/man-pages/man7/arp.7.html)
    struct c_arpreq {
        arp_pa: libc::sockaddr,
        arp_ha: libc::sockaddr,
        arp_flags: libc::c_int,
        arp_netmask: libc::sockaddr,
        arp_dev: [libc::c_char; 16],
    }

    impl c_arpreq {
        fn new(ip: Ipv4Addr, dev: &str) -> c_arpreq {
            // All-zero is a valid bit pattern for every field.
            let mut req: c_arpreq = unsafe { mem::zeroed() };

            let pa = &mut req.arp_pa as *mut libc::sockaddr as *mut libc::sockaddr_in;
            unsafe {
                (*pa).sin_family = libc::AF_INET as libc::sa_family_t;
                (*pa).sin_addr.s_addr = u32::from(ip).to_be();
            }

            // Leave room for the terminating NUL.
            for (dst, src) in req.arp_dev.iter_mut().zip(dev.bytes().take(15)) {
                *dst = src as libc::c_char;
            }

            req
        }

        fn hardware_addr(&self) -> Option<MacAddress> {
            if self.arp_flags & ATF_COM == 0 || self.arp_ha.sa_family != ARPHRD_ETHER {
                return None;
            }

            let mut bytes = [0u8; MAC_LEN];
            for (dst, src) in bytes.iter_mut().zip(self.arp_ha.sa_data.iter()) {
                *dst = *src as u8;
            }
            Some(MacAddress::new(bytes)).filter(|mac| !mac.is_zero())
        }
    }

    /// Names of all interfaces except loopback.
    fn interfaces() -> io::Result<Vec<String>> {
        unsafe {
            let head = libc::if_nameindex();
            if head.is_null() {
                return Err(io::Error::last_os_error());
            }

            let mut names = Vec::new();
            let mut entry = head;
            while (*entry).if_index != 0 && !(*entry).if_name.is_null() {
                let name = CStr::from_ptr((*entry).if_name).to_string_lossy().into_owned();
                if name != "lo" {
                    names.push(name);
                }
                entry = entry.add(1);
            }

            libc::if_freenameindex(head);
            Ok(names)
        }
    }

    /// Active probe followed by `SIOCGARP` on every interface.
    #[derive(Default)]
    pub struct Ioctl;

    impl Ioctl {
        fn query(socket: &UdpSocket, ip: Ipv4Addr, devices: &[String]) -> Option<MacAddress> {
            devices.iter().find_map(|dev| {
                let mut req = c_arpreq::new(ip, dev);
                let rc = unsafe {
                    libc::ioctl(socket.as_raw_fd(), SIOCGARP as _, &mut req as *mut c_arpreq)
                };
                if rc == -1 {
                    // ENXIO just means no entry on this interface.
                    let err = io::Error::last_os_error();
                    if err.raw_os_error() != Some(libc::ENXIO) {
                        debug!("SIOCGARP {ip} on {dev}: {err}");
                    }
                    return None;
                }
                req.hardware_addr()
            })
        }

        fn try_resolve(&self, ip: Ipv4Addr) -> io::Result<Option<MacAddress>> {
            let devices = interfaces()?;
            let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;

            if let Some(mac) = Self::query(&socket, ip, &devices) {
                return Ok(Some(mac));
            }

            probe(ip)?;
            Ok(poll(|| Self::query(&socket, ip, &devices)))
        }
    }

    impl NeighborResolver for Ioctl {
        fn resolve(&self, ip: Ipv4Addr) -> Option<MacAddress> {
            match self.try_resolve(ip) {
                Ok(mac) => mac,
                Err(err) => {
                    debug!("ARP request for {ip} failed: {err}");
                    None
                }
            }
        }
    }

}

#[cfg(windows)]
mod windows {
    use std::net::Ipv4Addr;

    use log::debug;

    use crate::mac::{MacAddress, MAC_LEN};
    use crate::resolve::NeighborResolver;

    const NO_ERROR: u32 = 0;

    #[link(name = "iphlpapi")]
    extern "system" {
        /// [https://learn.microsoft.com/en-us/windows/win32/api/iphlpapi/nf-iphlpapi-sendarp](https://learn.microsoft.com/en-us/windows/win32/api/iphlpapi/nf-iphlpapi-sendarp)
        fn SendARP(dest_ip: u32, src_ip: u32, mac_addr: *mut u32, phy_addr_len: *mut u32) -> u32;
    }

    /// `SendARP` with the source address left for the stack to choose.
    #[derive(Default)]
    pub struct SendArp;

    /// Requested hardware address length, in bytes.
    const REQUEST_LEN: u32 = MAC_LEN as u32;

    /// SendARP writes into ULONG-sized chunks, so the buffer is 8 bytes while
    /// only 6 are requested.
    type Reply = [u32; 2];

    fn decode(buf: &Reply, len: u32) -> Option<MacAddress> {
        if len as usize != MAC_LEN {
            return None;
        }
        let raw = [buf[0].to_ne_bytes(), buf[1].to_ne_bytes()].concat();
        let mut bytes = [0u8; MAC_LEN];
        bytes.copy_from_slice(&raw[..MAC_LEN]);
        Some(MacAddress::new(bytes))
    }

    impl NeighborResolver for SendArp {
        fn resolve(&self, ip: Ipv4Addr) -> Option<MacAddress> {
            let mut buf: Reply = [0; 2];
            let mut len = REQUEST_LEN;

            // IPAddr is the address in network order.
            let dest = u32::from_ne_bytes(ip.octets());
            let rc = unsafe { SendARP(dest, 0, buf.as_mut_ptr(), &mut len) };
            if rc != NO_ERROR {
                debug!("SendARP {ip} returned {rc}");
                return None;
            }

            let mac = decode(&buf, len);
            if mac.is_none() {
                debug!("SendARP {ip} returned a {len} byte address");
            }
            mac
        }
    }

}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct AppearsAfter {
        lookups: Cell<usize>,
        ready_at: usize,
    }

    impl NeighborTableReader for AppearsAfter {
        fn lookup(&self, _ip: Ipv4Addr) -> Option<MacAddress> {
            let n = self.lookups.get() + 1;
            self.lookups.set(n);
            (n >= self.ready_at).then(|| MacAddress::new([0x00, 0x0c, 0x29, 0x14, 0x98, 0xf3]))
        }
    }

    #[test]
    fn poll_stops_at_first_answer() {
        let table = AppearsAfter {
            lookups: Cell::new(0),
            ready_at: 2,
        };
        assert!(poll(|| table.lookup(Ipv4Addr::LOCALHOST)).is_some());
        assert_eq!(table.lookups.get(), 2);
    }

    #[test]
    fn table_only_gives_up() {
        let resolver = TableOnly::new(AppearsAfter {
            lookups: Cell::new(0),
            ready_at: usize::MAX,
        });
        assert_eq!(resolver.resolve(Ipv4Addr::LOCALHOST), None);
        assert_eq!(resolver.table.lookups.get(), POLLS);
    }
}
