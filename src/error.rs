use std::io;
use std::net::Ipv4Addr;

use thiserror::Error;

use crate::mac;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed MAC or IP text
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Both resolution strategies came back empty
    #[error("could not determine MAC address for {0}")]
    ResolutionFailed(Ipv4Addr),

    #[error("unable to send packet: {0}")]
    TransmissionFailed(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// 1 for bad input, 2 when the address could not be resolved, 3 when the
    /// packet could not be sent.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::InvalidAddress(_) => 1,
            Error::ResolutionFailed(_) => 2,
            Error::TransmissionFailed(_) => 3,
        }
    }
}

impl From<mac::ParseError> for Error {
    fn from(err: mac::ParseError) -> Self {
        Error::InvalidAddress(err.to_string())
    }
}
