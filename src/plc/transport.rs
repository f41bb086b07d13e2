// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Narrow PLC transport boundary.
//!
//! No concrete Siemens S7 client is vendored here (§1, §6): any transport
//! that can open an ISO-on-TCP session and read/write a single byte of a
//! data block can be plugged in behind [`PlcTransport`]. Production
//! deployments wire in a real S7 client crate; tests and demos use
//! [`MockPlcTransport`].

use crate::error::Result;
use crate::plc::PlcLinkId;

/// Single-writer PLC connection. Implementations are not required to be
/// internally thread-safe for concurrent callers — the actuator that owns
/// a transport instance is the only caller, one camera per link (§4.7).
pub trait PlcTransport: Send {
    fn link_id(&self) -> &PlcLinkId;
    fn connect(&mut self) -> Result<()>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    fn read_byte(&mut self, data_block: u16, byte_offset: u16) -> Result<u8>;
    fn write_byte(&mut self, data_block: u16, byte_offset: u16, value: u8) -> Result<()>;
}

/// An in-memory transport for tests: models a PLC's data blocks as byte
/// vectors, and can be told to fail the next N operations to exercise the
/// actuator's reconnect-and-retry path.
pub struct MockPlcTransport {
    link_id: PlcLinkId,
    connected: bool,
    blocks: std::collections::HashMap<u16, Vec<u8>>,
    fail_next_writes: u32,
    pub connect_count: u32,
}

impl MockPlcTransport {
    pub fn new(link_id: PlcLinkId) -> Self {
        Self {
            link_id,
            connected: false,
            blocks: std::collections::HashMap::new(),
            fail_next_writes: 0,
            connect_count: 0,
        }
    }

    /// Read the current byte back out of the mock's block storage, for
    /// test assertions.
    pub fn peek_byte(&self, data_block: u16, byte_offset: u16) -> u8 {
        self.blocks
            .get(&data_block)
            .and_then(|b| b.get(byte_offset as usize))
            .copied()
            .unwrap_or(0)
    }

    pub fn fail_next_writes(&mut self, n: u32) {
        self.fail_next_writes = n;
    }

    fn block_mut(&mut self, data_block: u16, byte_offset: u16) -> &mut Vec<u8> {
        let block = self.blocks.entry(data_block).or_default();
        if block.len() <= byte_offset as usize {
            block.resize(byte_offset as usize + 1, 0);
        }
        block
    }
}

impl PlcTransport for MockPlcTransport {
    fn link_id(&self) -> &PlcLinkId {
        &self.link_id
    }

    fn connect(&mut self) -> Result<()> {
        self.connect_count += 1;
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn read_byte(&mut self, data_block: u16, byte_offset: u16) -> Result<u8> {
        Ok(self.peek_byte(data_block, byte_offset))
    }

    fn write_byte(&mut self, data_block: u16, byte_offset: u16, value: u8) -> Result<()> {
        if self.fail_next_writes > 0 {
            self.fail_next_writes -= 1;
            return Err(crate::error::VisionError::Plc {
                link: format!("{}:{}", self.link_id.host, self.link_id.port),
                reason: "simulated write failure".into(),
            });
        }
        let byte = self.block_mut(data_block, byte_offset);
        byte[byte_offset as usize] = value;
        Ok(())
    }
}

/// A [`MockPlcTransport`] behind a shared, lockable handle, so a test can
/// hold one clone while an [`AlarmActuator`](crate::plc::actuator::AlarmActuator)
/// owns the other as its `Box<dyn PlcTransport>`.
#[derive(Clone)]
pub struct SharedMockTransport {
    link_id: PlcLinkId,
    inner: std::sync::Arc<parking_lot::Mutex<MockPlcTransport>>,
}

impl SharedMockTransport {
    pub fn new(link_id: PlcLinkId) -> Self {
        Self {
            inner: std::sync::Arc::new(parking_lot::Mutex::new(MockPlcTransport::new(link_id.clone()))),
            link_id,
        }
    }

    pub fn peek_byte(&self, data_block: u16, byte_offset: u16) -> u8 {
        self.inner.lock().peek_byte(data_block, byte_offset)
    }

    pub fn fail_next_writes(&self, n: u32) {
        self.inner.lock().fail_next_writes(n);
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().is_connected()
    }
}

/// A transport that always succeeds without talking to any hardware, for
/// running the full supervisor loop against a camera whose PLC link isn't
/// wired up yet. Reads return 0, writes are accepted and discarded, never
/// reported as a failure — so `AlarmActuator` never enters a retry/error
/// path against it. Production deployments plug in a real S7 client (§1,
/// §6); no concrete one ships with this crate.
pub struct NullPlcTransport {
    link_id: PlcLinkId,
    connected: bool,
}

impl NullPlcTransport {
    pub fn new(link_id: PlcLinkId) -> Self {
        Self { link_id, connected: false }
    }
}

impl PlcTransport for NullPlcTransport {
    fn link_id(&self) -> &PlcLinkId {
        &self.link_id
    }

    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn read_byte(&mut self, _data_block: u16, _byte_offset: u16) -> Result<u8> {
        Ok(0)
    }

    fn write_byte(&mut self, _data_block: u16, _byte_offset: u16, _value: u8) -> Result<()> {
        Ok(())
    }
}

impl PlcTransport for SharedMockTransport {
    fn link_id(&self) -> &PlcLinkId {
        &self.link_id
    }

    fn connect(&mut self) -> Result<()> {
        self.inner.lock().connect()
    }

    fn disconnect(&mut self) {
        self.inner.lock().disconnect()
    }

    fn is_connected(&self) -> bool {
        self.inner.lock().is_connected()
    }

    fn read_byte(&mut self, data_block: u16, byte_offset: u16) -> Result<u8> {
        self.inner.lock().read_byte(data_block, byte_offset)
    }

    fn write_byte(&mut self, data_block: u16, byte_offset: u16, value: u8) -> Result<()> {
        self.inner.lock().write_byte(data_block, byte_offset, value)
    }
}
