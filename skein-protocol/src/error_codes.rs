//! Kafka protocol error codes

use anyhow::Result;
use bytes::BufMut;
use num_derive::{FromPrimitive, ToPrimitive};

use crate::codec::{Decodable, Encodable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, FromPrimitive, ToPrimitive)]
#[repr(i16)]
pub enum ErrorCode {
    #[default]
    None = 0,
    UnknownTopicOrPartition = 3,
    UnsupportedVersion = 35,
}

impl ErrorCode {
    pub fn code(self) -> i16 {
        self as i16
    }
}

impl From<ErrorCode> for i16 {
    fn from(code: ErrorCode) -> Self {
        code as i16
    }
}

impl Encodable for ErrorCode {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        (*self as i16).encode(buf)
    }
}

impl Decodable for ErrorCode {
    fn decode(buf: &mut impl bytes::Buf) -> Result<Self> {
        let code = i16::decode(buf)?;
        num_traits::FromPrimitive::from_i16(code)
            .ok_or_else(|| anyhow::anyhow!("Unknown error code: {}", code))
    }
}
