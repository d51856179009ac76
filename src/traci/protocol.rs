//! Framing and value encoding for the TraCI wire protocol.
//!
//! All integers are big-endian. A message starts with a 4-byte total
//! length that counts itself, followed by one or more commands. A command
//! carries a 1-byte length, or a zero byte and a 4-byte length when it
//! does not fit, then its identifier and payload. Strings are a 4-byte
//! byte count followed by UTF-8.

use crate::error::{Error, Result};

// Commands.
pub const CMD_GET_VERSION: u8 = 0x00;
pub const CMD_SIM_STEP: u8 = 0x02;
pub const CMD_CLOSE: u8 = 0x7f;
pub const CMD_GET_TL_VARIABLE: u8 = 0xa2;
pub const CMD_GET_VEHICLE_VARIABLE: u8 = 0xa4;
pub const CMD_GET_SIM_VARIABLE: u8 = 0xab;

// Variables.
pub const VAR_ID_LIST: u8 = 0x00;
pub const TL_CONTROLLED_LANES: u8 = 0x26;
pub const VAR_LANE_ID: u8 = 0x51;
pub const VAR_EDGES: u8 = 0x54;
pub const VAR_LANE_POSITION: u8 = 0x56;
pub const VAR_TIME: u8 = 0x66;
pub const VAR_ROUTE_INDEX: u8 = 0x69;

// Value type markers.
pub const TYPE_INTEGER: u8 = 0x09;
pub const TYPE_DOUBLE: u8 = 0x0b;
pub const TYPE_STRING: u8 = 0x0c;
pub const TYPE_STRING_LIST: u8 = 0x0e;

// Status results.
pub const RTYPE_OK: u8 = 0x00;
pub const RTYPE_ERR: u8 = 0xff;

/// The response command identifier paired with a retrieval command.
pub fn response_id(command: u8) -> u8 {
    command | 0x10
}

/// The status line at the front of every response.
pub struct Status {
    pub command: u8,
    pub result: u8,
    pub description: String,
}

/// Builds an outgoing message.
pub struct MessageBuilder {
    buf: Vec<u8>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        // Space for the length prefix, filled in by `finish`.
        Self { buf: vec![0; 4] }
    }

    /// Appends a command, choosing the short or extended length form.
    pub fn command(mut self, id: u8, payload: &[u8]) -> Self {
        let len = 2 + payload.len();
        if len <= u8::MAX as usize {
            self.buf.push(len as u8);
        } else {
            self.buf.push(0);
            self.buf.extend_from_slice(&((len + 4) as i32).to_be_bytes());
        }
        self.buf.push(id);
        self.buf.extend_from_slice(payload);
        self
    }

    /// Fills in the length prefix and returns the wire bytes.
    pub fn finish(mut self) -> Vec<u8> {
        let len = self.buf.len() as i32;
        self.buf[0..4].copy_from_slice(&len.to_be_bytes());
        self.buf
    }
}

/// Appends a length-prefixed string.
pub fn put_string(buf: &mut Vec<u8>, value: &str) {
    buf.extend_from_slice(&(value.len() as i32).to_be_bytes());
    buf.extend_from_slice(value.as_bytes());
}

/// The payload of a variable retrieval command.
pub fn variable_payload(variable: u8, object: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(5 + object.len());
    buf.push(variable);
    put_string(&mut buf, object);
    buf
}

/// Reads values out of a received message body.
pub struct MessageReader {
    buf: Vec<u8>,
    pos: usize,
}

impl MessageReader {
    /// Wraps a message body, the bytes after the length prefix.
    pub fn new(buf: Vec<u8>) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, count: usize) -> Result<&[u8]> {
        if count > self.remaining() {
            return Err(Error::Protocol(format!(
                "message truncated: wanted {count} bytes at offset {}, have {}",
                self.pos,
                self.remaining()
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(self.take(4)?);
        Ok(i32::from_be_bytes(bytes))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let mut bytes = [0; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(f64::from_be_bytes(bytes))
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(Error::Protocol(format!("negative string length {len}")));
        }
        let bytes = self.take(len as usize)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| Error::Protocol("string is not valid UTF-8".to_string()))
    }

    pub fn read_string_list(&mut self) -> Result<Vec<String>> {
        let count = self.read_i32()?;
        if count < 0 {
            return Err(Error::Protocol(format!("negative list length {count}")));
        }
        let mut items = Vec::new();
        for _ in 0..count {
            items.push(self.read_string()?);
        }
        Ok(items)
    }

    /// Reads a value type marker and checks it is the expected one.
    pub fn expect_type(&mut self, expected: u8) -> Result<()> {
        let actual = self.read_u8()?;
        if actual != expected {
            return Err(Error::Protocol(format!(
                "expected value type {expected:#04x}, got {actual:#04x}"
            )));
        }
        Ok(())
    }
}

/// Reads a command header, returning the payload length and identifier.
pub fn read_command_header(reader: &mut MessageReader) -> Result<(usize, u8)> {
    let short = reader.read_u8()?;
    let payload = if short == 0 {
        let len = reader.read_i32()?;
        if len < 6 {
            return Err(Error::Protocol(format!("extended command length {len} is too short")));
        }
        len as usize - 6
    } else {
        if short < 2 {
            return Err(Error::Protocol(format!("command length {short} is too short")));
        }
        short as usize - 2
    };
    let id = reader.read_u8()?;
    Ok((payload, id))
}

/// Reads the status response at the front of a message body.
pub fn read_status(reader: &mut MessageReader) -> Result<Status> {
    let (_, command) = read_command_header(reader)?;
    let result = reader.read_u8()?;
    let description = reader.read_string()?;
    Ok(Status {
        command,
        result,
        description,
    })
}
