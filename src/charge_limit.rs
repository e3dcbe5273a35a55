use std::fmt;

use crate::error::Error;
use crate::param::{Payload, PAYLOAD_LEN};

/// Maximum charge level enforced by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeLimit {
    Eighty,
    Hundred,
}

/// What the raw register byte says, without coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterReading {
    Limited,
    Unlimited,
    Unrecognized(u8),
}

impl From<u8> for RegisterReading {
    fn from(raw: u8) -> Self {
        match raw {
            1 => Self::Limited,
            0 => Self::Unlimited,
            other => Self::Unrecognized(other),
        }
    }
}

impl ChargeLimit {
    pub fn percentage(&self) -> u8 {
        match self {
            ChargeLimit::Eighty => 80,
            ChargeLimit::Hundred => 100,
        }
    }

    pub fn register_byte(&self) -> u8 {
        match self {
            ChargeLimit::Eighty => 1,
            ChargeLimit::Hundred => 0,
        }
    }

    /// Only `1` engages limiting; every other byte reads as [`ChargeLimit::Hundred`].
    /// The register is only expected to hold 0 or 1, see [`RegisterReading`]
    /// to tell other values apart.
    pub fn from_register_byte(raw: u8) -> Self {
        match RegisterReading::from(raw) {
            RegisterReading::Limited => ChargeLimit::Eighty,
            RegisterReading::Unlimited | RegisterReading::Unrecognized(_) => ChargeLimit::Hundred,
        }
    }

    /// Register payload: the limit byte followed by zeroes.
    pub fn payload(&self) -> Payload {
        let mut payload = [0; PAYLOAD_LEN];
        payload[0] = self.register_byte();
        payload
    }
}

impl TryFrom<i64> for ChargeLimit {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            80 => Ok(Self::Eighty),
            100 => Ok(Self::Hundred),
            other => Err(Error::InvalidLimit(other)),
        }
    }
}

impl fmt::Display for ChargeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.percentage())
    }
}
