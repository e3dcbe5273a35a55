use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Packs a 4 character ASCII code into the big-endian identifier the controller expects.
pub fn encode(code: &str) -> Result<u32> {
    if !code.is_ascii() {
        return Err(Error::NonAsciiKey(code.to_owned()));
    }
    let bytes: [u8; 4] = code
        .as_bytes()
        .try_into()
        .map_err(|_| Error::InvalidKeyLength(code.len()))?;
    Ok(u32::from_be_bytes(bytes))
}

/// Inverse of [`encode`], only meant for diagnostics.
pub fn decode(code: u32) -> String {
    code.to_be_bytes().iter().map(|b| char::from(*b)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCharCode(u32);

impl FourCharCode {
    /// Compile time constructor for known codes.
    pub const fn from_bytes(code: &[u8; 4]) -> Self {
        Self(u32::from_be_bytes(*code))
    }

    pub const fn from_raw(code: u32) -> Self {
        Self(code)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl FromStr for FourCharCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        encode(s).map(Self)
    }
}

impl fmt::Display for FourCharCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&decode(self.0))
    }
}

/// Declared type of a register: a type tag plus its size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataType {
    pub tag: FourCharCode,
    pub size: u32,
}

impl DataType {
    pub const UINT8: DataType = DataType {
        tag: FourCharCode::from_bytes(b"ui8 "),
        size: 1,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterKey {
    pub code: FourCharCode,
    pub data_type: DataType,
}

impl RegisterKey {
    pub fn new(code: &str, data_type: DataType) -> Result<Self> {
        Ok(Self {
            code: code.parse()?,
            data_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_most_significant_byte_first() {
        assert_eq!(encode("CHWA").unwrap(), 0x4348_5741);
        assert_eq!(encode("ui8 ").unwrap(), 0x7569_3820);
    }

    #[test]
    fn decode_reverses_encode() {
        for code in ["CHWA", "BCLM", "ui8 ", "#KEY", "    "] {
            assert_eq!(decode(encode(code).unwrap()), code);
        }
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(encode("CHW"), Err(Error::InvalidKeyLength(3))));
        assert!(matches!(encode("CHWAX"), Err(Error::InvalidKeyLength(5))));
        assert!(matches!(encode(""), Err(Error::InvalidKeyLength(0))));
    }

    #[test]
    fn rejects_non_ascii() {
        assert!(matches!(encode("CHé"), Err(Error::NonAsciiKey(_))));
    }

    #[test]
    fn data_type_equality_is_structural() {
        let other = DataType {
            tag: "ui8 ".parse().unwrap(),
            size: 1,
        };
        assert_eq!(DataType::UINT8, other);
        assert_ne!(DataType::UINT8, DataType { size: 2, ..other });
    }

    #[test]
    fn register_key_displays_its_code() {
        let key = RegisterKey::new("CHWA", DataType::UINT8).unwrap();
        assert_eq!(key.code.to_string(), "CHWA");
    }
}
