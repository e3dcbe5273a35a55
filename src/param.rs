//! The fixed 80 byte record exchanged with the controller driver.
//!
//! Every request and every reply uses this exact layout, so it is declared
//! `#[repr(C)]` and its size and field offsets are checked at compile time.

use std::mem::{offset_of, size_of};

use crate::key::RegisterKey;

pub const PAYLOAD_LEN: usize = 32;

/// Raw register payload carried in every request and reply.
pub type Payload = [u8; PAYLOAD_LEN];

/// Method identifiers understood by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Selector {
    HandleEvent = 2,
    ReadKey = 5,
    WriteKey = 6,
    GetKeyFromIndex = 8,
    GetKeyInfo = 9,
}

/// Result byte embedded in the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SmcResult {
    Success = 0,
    Error = 1,
    KeyNotFound = 132,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub build: u8,
    pub reserved: u8,
    pub release: u16,
}

/// Power limits, never used here but part of the layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerLimitData {
    pub version: u16,
    pub length: u16,
    pub cpu_limit: u32,
    pub gpu_limit: u32,
    pub mem_limit: u32,
}

/// Packed to 9 bytes, the driver does not pad this one.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyInfo {
    pub data_size: u32,
    pub data_type: u32,
    pub data_attributes: u8,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ParamStruct {
    pub key: u32,
    pub version: Version,
    pub power_limit: PowerLimitData,
    pub key_info: KeyInfo,
    pub padding: u16,
    pub result: u8,
    pub status: u8,
    /// Sub-selector of [`Selector::HandleEvent`] on requests.
    pub data8: u8,
    pub data32: u32,
    pub bytes: Payload,
}

pub const PARAM_STRUCT_SIZE: usize = 80;

const _: () = assert!(size_of::<ParamStruct>() == PARAM_STRUCT_SIZE);
const _: () = assert!(size_of::<KeyInfo>() == 9);
const _: () = assert!(offset_of!(ParamStruct, power_limit) == 12);
const _: () = assert!(offset_of!(ParamStruct, key_info) == 28);
const _: () = assert!(offset_of!(ParamStruct, padding) == 38);
const _: () = assert!(offset_of!(ParamStruct, result) == 40);
const _: () = assert!(offset_of!(ParamStruct, data8) == 42);
const _: () = assert!(offset_of!(ParamStruct, data32) == 44);
const _: () = assert!(offset_of!(ParamStruct, bytes) == 48);

impl ParamStruct {
    /// Request addressing `key` with the given sub-selector.
    pub fn request(key: &RegisterKey, op: Selector) -> Self {
        Self {
            key: key.code.raw(),
            key_info: KeyInfo {
                data_size: key.data_type.size,
                ..KeyInfo::default()
            },
            data8: op as u8,
            ..Self::default()
        }
    }

    pub fn with_payload(mut self, bytes: Payload) -> Self {
        self.bytes = bytes;
        self
    }

    /// Declared size of the addressed register, copied out of the packed field.
    pub fn data_size(&self) -> u32 {
        self.key_info.data_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::DataType;

    #[test]
    fn wire_record_is_eighty_bytes() {
        assert_eq!(size_of::<ParamStruct>(), 80);
        assert_eq!(size_of::<Version>(), 6);
        assert_eq!(size_of::<PowerLimitData>(), 16);
    }

    #[test]
    fn read_request_carries_key_size_and_sub_selector() {
        let key = RegisterKey::new("CHWA", DataType::UINT8).unwrap();
        let req = ParamStruct::request(&key, Selector::ReadKey);
        assert_eq!(req.key, 0x4348_5741);
        assert_eq!(req.data_size(), 1);
        assert_eq!(req.data8, 5);
        assert_eq!(req.result, 0);
        assert_eq!(req.bytes, [0; PAYLOAD_LEN]);
    }

    #[test]
    fn write_request_embeds_payload() {
        let key = RegisterKey::new("CHWA", DataType::UINT8).unwrap();
        let mut payload = [0; PAYLOAD_LEN];
        payload[0] = 1;
        let req = ParamStruct::request(&key, Selector::WriteKey).with_payload(payload);
        assert_eq!(req.data8, 6);
        assert_eq!(req.bytes[0], 1);
        assert!(req.bytes[1..].iter().all(|b| *b == 0));
    }
}
