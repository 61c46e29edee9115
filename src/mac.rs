//! IEEE EUI-48 hardware addresses as used on Ethernet links.
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const MAC_LEN: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; MAC_LEN]);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// Neither `-` nor `:` found, or both used in the same address
    #[error("expected octets separated uniformly by '-' or ':'")]
    Delimiter,

    /// Wrong number of octets
    #[error("expected 6 octets, got {0}")]
    InvalidLength(usize),

    /// Octet is not two hexadecimal digits
    #[error("invalid octet '{0}'")]
    InvalidOctet(String),
}

impl MacAddress {
    pub const fn new(bytes: [u8; MAC_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; MAC_LEN] {
        &self.0
    }

    /// True for `00-00-00-00-00-00`, which neighbor tables use for
    /// unresolved entries.
    pub fn is_zero(&self) -> bool {
        self.0 == [0; MAC_LEN]
    }

    /// Parses the looser notation found in neighbor table listings, where
    /// octets may be written with a single digit (`0:c:29:14:98:f3` on BSD).
    pub fn from_table_field(field: &str) -> Option<Self> {
        let sep = delimiter(field).ok()?;
        let mut bytes = [0u8; MAC_LEN];
        let mut count = 0;
        for octet in field.split(sep) {
            if count == MAC_LEN || octet.is_empty() || octet.len() > 2 {
                return None;
            }
            if !octet.chars().all(|c| c.is_ascii_hexdigit()) {
                return None;
            }
            bytes[count] = u8::from_str_radix(octet, 16).ok()?;
            count += 1;
        }
        (count == MAC_LEN).then_some(Self(bytes))
    }
}

fn delimiter(input: &str) -> Result<char, ParseError> {
    match (input.contains('-'), input.contains(':')) {
        (true, false) => Ok('-'),
        (false, true) => Ok(':'),
        _ => Err(ParseError::Delimiter),
    }
}

impl FromStr for MacAddress {
    type Err = ParseError;

    /// Accepts `NN-NN-NN-NN-NN-NN` or `NN:NN:NN:NN:NN:NN`, case-insensitive.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let sep = delimiter(input)?;
        let octets: Vec<&str> = input.split(sep).collect();
        if octets.len() != MAC_LEN {
            return Err(ParseError::InvalidLength(octets.len()));
        }

        let mut bytes = [0u8; MAC_LEN];
        for (byte, octet) in bytes.iter_mut().zip(&octets) {
            // from_str_radix would also take a leading '+'
            if octet.len() != 2 || !octet.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ParseError::InvalidOctet(octet.to_string()));
            }
            *byte = u8::from_str_radix(octet, 16)
                .map_err(|_| ParseError::InvalidOctet(octet.to_string()))?;
        }

        Ok(Self(bytes))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}-{b:02X}-{c:02X}-{d:02X}-{e:02X}-{g:02X}")
    }
}
