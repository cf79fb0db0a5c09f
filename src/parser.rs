// src/parser.rs

use crate::types::code;

pub const CONTROL_HEADER_LEN: usize = 4;
pub const OPTION_HEADER_LEN: usize = 2;

/// Code / Identifier / Length header plus the option bytes it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPacket {
    pub code: u8,
    pub id: u8,
    pub length: u16,
    pub payload: Vec<u8>,
}

impl ControlPacket {
    pub fn is_configure(&self) -> bool {
        (code::CONFIGURE_REQUEST..=code::CONFIGURE_REJECT).contains(&self.code)
    }
}

pub fn parse_control_packet(buf: &[u8]) -> Option<ControlPacket> {
    if buf.len() < CONTROL_HEADER_LEN {
        return None;
    }

    let code = buf[0];
    let id = buf[1];
    let length = u16::from_be_bytes([buf[2], buf[3]]);

    // Trailing bytes past Length are padding and ignored
    if (length as usize) < CONTROL_HEADER_LEN || buf.len() < length as usize {
        return None;
    }

    Some(ControlPacket {
        code,
        id,
        length,
        payload: buf[CONTROL_HEADER_LEN..length as usize].to_vec(),
    })
}

pub fn build_control_packet(code: u8, id: u8, options: &[u8]) -> Vec<u8> {
    let length = (options.len() + CONTROL_HEADER_LEN) as u16;
    let mut packet = Vec::with_capacity(length as usize);
    packet.push(code);
    packet.push(id);
    packet.extend_from_slice(&length.to_be_bytes());
    packet.extend_from_slice(options);
    packet
}

/// Iterator over (type, value) option TLVs. Stops at the first malformed one.
pub struct OptionIter<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for OptionIter<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.data.get(self.offset..)?;
        if rest.len() < OPTION_HEADER_LEN {
            return None;
        }

        let option_type = rest[0];
        let option_len = rest[1] as usize;
        if option_len < OPTION_HEADER_LEN || option_len > rest.len() {
            return None;
        }

        self.offset += option_len;
        Some((option_type, &rest[OPTION_HEADER_LEN..option_len]))
    }
}

pub fn iter_options(options: &[u8]) -> OptionIter<'_> {
    OptionIter {
        data: options,
        offset: 0,
    }
}

pub fn extract_option_value(options: &[u8], option_type: u8) -> Option<[u8; 4]> {
    iter_options(options)
        .find(|(t, data)| *t == option_type && data.len() == 4)
        .map(|(_, data)| [data[0], data[1], data[2], data[3]])
}
