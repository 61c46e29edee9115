//! Constructs a WakeOnLAN packet (so called "Magic Packet Technology") and
//! hands it to the network.
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use log::debug;

use crate::mac::{MacAddress, MAC_LEN};

pub const SYNC_STREAM: [u8; MAC_LEN] = [0xFF; MAC_LEN];
pub const REPEATS: usize = 16;
pub const MAGIC_PACKET_LEN: usize = MAC_LEN * (REPEATS + 1);

const SEND_TIMEOUT: Duration = Duration::from_secs(2);

pub struct MagicPacket([u8; MAGIC_PACKET_LEN]);

impl MagicPacket {
    /// Six bytes of 0xFF followed by 16 copies of the target address.
    pub fn new(mac: &MacAddress) -> Self {
        let mut packet = [0u8; MAGIC_PACKET_LEN];
        packet[..MAC_LEN].copy_from_slice(&SYNC_STREAM);

        for block in packet[MAC_LEN..].chunks_exact_mut(MAC_LEN) {
            block.copy_from_slice(mac.as_bytes());
        }

        MagicPacket(packet)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Something that can put a single datagram on the wire.
pub trait Transport {
    fn send(&self, dest: SocketAddrV4, payload: &[u8]) -> io::Result<()>;
}

/// One-shot UDP send from an ephemeral port with SO_BROADCAST set.
pub struct UdpBroadcast;

impl Transport for UdpBroadcast {
    fn send(&self, dest: SocketAddrV4, payload: &[u8]) -> io::Result<()> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.set_broadcast(true)?;
        socket.set_write_timeout(Some(SEND_TIMEOUT))?;

        let sent = socket.send_to(payload, dest)?;
        debug!("wrote {sent} bytes to {dest}");
        if sent != payload.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short send: {sent} of {} bytes", payload.len()),
            ));
        }

        Ok(())
    }
}

/// Destination for a magic packet on the local segment.
pub fn broadcast_addr(port: u16) -> SocketAddrV4 {
    SocketAddrV4::new(Ipv4Addr::BROADCAST, port)
}
