//! Neighbor table readers.
use std::fs;
use std::io;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use log::debug;

use super::NeighborTableReader;
use crate::mac::MacAddress;

/// Set by the kernel once an entry holds a usable hardware address.
const ATF_COM: u32 = 0x02;

/// Runs `arp -a <ip>` and picks the hardware address off the row for `ip`.
pub struct ArpCommand {
    program: String,
}

impl Default for ArpCommand {
    fn default() -> Self {
        ArpCommand {
            program: "arp".to_string(),
        }
    }
}

impl ArpCommand {
    fn run(&self, ip: Ipv4Addr) -> io::Result<String> {
        let output = Command::new(&self.program)
            .arg("-a")
            .arg(ip.to_string())
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()?;

        if !output.status.success() {
            debug!("{} exited with {}", self.program, output.status);
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl NeighborTableReader for ArpCommand {
    fn lookup(&self, ip: Ipv4Addr) -> Option<MacAddress> {
        match self.run(ip) {
            Ok(listing) => {
                let mac = parse_arp_listing(&listing, ip);
                if mac.is_none() {
                    debug!("no usable entry for {ip} in `{} -a` output", self.program);
                }
                mac
            }
            Err(err) => {
                debug!("unable to run {}: {err}", self.program);
                None
            }
        }
    }
}

/// Understands the row layouts printed by the common `arp` tools:
///
/// ```text
///   192.168.1.1           00-0c-29-14-98-f3     dynamic
/// ? (192.168.1.1) at 00:0c:29:14:98:f3 [ether] on eth0
/// ? (192.168.1.1) at 0:c:29:14:98:f3 on en0 ifscope [ethernet]
/// ```
///
/// Rows that don't mention `ip` are ignored, so headers and neighbours of
/// other hosts can't be mistaken for the answer.
pub fn parse_arp_listing(listing: &str, ip: Ipv4Addr) -> Option<MacAddress> {
    let ip = ip.to_string();
    listing.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        fields
            .by_ref()
            .find(|field| field.trim_matches(|c| c == '(' || c == ')') == ip)?;
        fields
            .filter_map(MacAddress::from_table_field)
            .find(|mac| !mac.is_zero())
    })
}

/// Reads the kernel's table from `/proc/net/arp`.
pub struct ProcNetArp {
    path: PathBuf,
}

impl Default for ProcNetArp {
    fn default() -> Self {
        ProcNetArp {
            path: PathBuf::from("/proc/net/arp"),
        }
    }
}

impl NeighborTableReader for ProcNetArp {
    fn lookup(&self, ip: Ipv4Addr) -> Option<MacAddress> {
        match fs::read_to_string(&self.path) {
            Ok(table) => parse_proc_net_arp(&table, ip),
            Err(err) => {
                debug!("unable to read {}: {err}", self.path.display());
                None
            }
        }
    }
}

/// `IP address  HW type  Flags  HW address  Mask  Device`, one header row.
pub fn parse_proc_net_arp(table: &str, ip: Ipv4Addr) -> Option<MacAddress> {
    table.lines().skip(1).find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 || fields[0].parse::<Ipv4Addr>().ok()? != ip {
            return None;
        }

        let flags = u32::from_str_radix(fields[2].trim_start_matches("0x"), 16).ok()?;
        if flags & ATF_COM == 0 {
            debug!("entry for {ip} is incomplete");
            return None;
        }

        MacAddress::from_table_field(fields[3]).filter(|mac| !mac.is_zero())
    })
}

/// The host's neighbor table: `/proc/net/arp` where the kernel exposes it,
/// then the `arp` tool.
pub struct SystemTable {
    proc_net: Option<ProcNetArp>,
    command: ArpCommand,
}

impl Default for SystemTable {
    fn default() -> Self {
        SystemTable {
            proc_net: cfg!(target_os = "linux").then(ProcNetArp::default),
            command: ArpCommand::default(),
        }
    }
}

impl NeighborTableReader for SystemTable {
    fn lookup(&self, ip: Ipv4Addr) -> Option<MacAddress> {
        self.proc_net
            .as_ref()
            .and_then(|proc_net| proc_net.lookup(ip))
            .or_else(|| self.command.lookup(ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);
    const MAC: MacAddress = MacAddress::new([0x00, 0x0c, 0x29, 0x14, 0x98, 0xf3]);

    #[test]
    fn windows_listing() {
        let listing = "\r\nInterface: 192.168.1.5 --- 0xb\r\n  \
                       Internet Address      Physical Address      Type\r\n  \
                       192.168.1.1           00-0c-29-14-98-f3     dynamic\r\n";
        assert_eq!(parse_arp_listing(listing, IP), Some(MAC));
    }

    #[test]
    fn linux_listing() {
        let listing = "? (192.168.1.1) at 00:0c:29:14:98:f3 [ether] on eth0\n";
        assert_eq!(parse_arp_listing(listing, IP), Some(MAC));
    }

    #[test]
    fn bsd_listing_short_octets() {
        let listing = "? (192.168.1.1) at 0:c:29:14:98:f3 on en0 ifscope [ethernet]\n";
        assert_eq!(parse_arp_listing(listing, IP), Some(MAC));
    }

    #[test]
    fn listing_ignores_other_hosts() {
        let listing = "? (192.168.1.10) at 11:22:33:44:55:66 [ether] on eth0\n\
                       ? (192.168.1.1) at 00:0c:29:14:98:f3 [ether] on eth0\n";
        assert_eq!(parse_arp_listing(listing, IP), Some(MAC));
    }

    #[test]
    fn listing_without_entry() {
        assert_eq!(parse_arp_listing("", IP), None);
        assert_eq!(parse_arp_listing("No ARP Entries Found.\r\n", IP), None);
        assert_eq!(
            parse_arp_listing("192.168.1.1 (192.168.1.1) -- no entry\n", IP),
            None
        );
        assert_eq!(
            parse_arp_listing("? (192.168.1.1) at <incomplete> on eth0\n", IP),
            None
        );
    }

    #[test]
    fn proc_net_arp_complete_entry() {
        let table = "IP address       HW type     Flags       HW address            Mask     Device\n\
                     192.168.1.10     0x1         0x2         11:22:33:44:55:66     *        eth0\n\
                     192.168.1.1      0x1         0x2         00:0c:29:14:98:f3     *        eth0\n";
        assert_eq!(parse_proc_net_arp(table, IP), Some(MAC));
    }

    #[test]
    fn proc_net_arp_incomplete_entry() {
        let table = "IP address       HW type     Flags       HW address            Mask     Device\n\
                     192.168.1.1      0x1         0x0         00:00:00:00:00:00     *        eth0\n";
        assert_eq!(parse_proc_net_arp(table, IP), None);
    }

    #[test]
    fn proc_net_arp_from_file() {
        let path = std::env::temp_dir().join(format!("wol-ip-arp-{}", std::process::id()));
        fs::write(
            &path,
            "IP address       HW type     Flags       HW address            Mask     Device\n\
             192.168.1.1      0x1         0x6         00:0c:29:14:98:f3     *        eth0\n",
        )
        .unwrap();

        let reader = ProcNetArp { path: path.clone() };
        assert_eq!(reader.lookup(IP), Some(MAC));
        fs::remove_file(&path).unwrap();

        assert_eq!(reader.lookup(IP), None);
    }

    #[test]
    fn missing_arp_tool_is_not_fatal() {
        let reader = ArpCommand {
            program: "wol-ip-no-such-arp-tool".to_string(),
        };
        assert_eq!(reader.lookup(IP), None);
    }
}
