// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Bit-level alarm actuator (§4.7).
//!
//! Owns one PLC link per camera and two alarm addresses (person, coal).
//! Writes are idempotent (no wire traffic if the requested state already
//! matches the last confirmed value) and edge-triggered via
//! read-modify-write of the single byte containing the target bit. A
//! write failure gets exactly one reconnect-and-retry before the link is
//! marked unhealthy.

use std::collections::HashMap;

use tracing::{error, warn};

use crate::error::Result;
use crate::plc::transport::PlcTransport;
use crate::plc::{AlarmAddress, AlarmKind, PlcLinkState};

/// Per-camera alarm actuator: one PLC link, two addressable bits.
pub struct AlarmActuator {
    transport: Box<dyn PlcTransport>,
    addresses: HashMap<AlarmKind, AlarmAddress>,
    last_written: HashMap<AlarmKind, bool>,
    state: PlcLinkState,
}

impl AlarmActuator {
    pub fn new(
        transport: Box<dyn PlcTransport>,
        person_address: AlarmAddress,
        coal_address: AlarmAddress,
    ) -> Self {
        let mut addresses = HashMap::new();
        addresses.insert(AlarmKind::Person, person_address);
        addresses.insert(AlarmKind::Coal, coal_address);
        Self {
            transport,
            addresses,
            last_written: HashMap::new(),
            state: PlcLinkState::Disconnected,
        }
    }

    pub fn link_state(&self) -> PlcLinkState {
        self.state
    }

    pub fn connect(&mut self) -> Result<()> {
        self.state = PlcLinkState::Connecting;
        match self.transport.connect() {
            Ok(()) => {
                self.state = PlcLinkState::Connected;
                Ok(())
            }
            Err(e) => {
                self.state = PlcLinkState::Error;
                Err(e)
            }
        }
    }

    /// Idempotently assert or deassert `kind`'s alarm bit. Returns `Ok(true)`
    /// if a wire write was performed, `Ok(false)` if the request was a
    /// no-op against the last confirmed value.
    pub fn set(&mut self, kind: AlarmKind, desired: bool) -> Result<bool> {
        if self.last_written.get(&kind).copied() == Some(desired) {
            return Ok(false);
        }

        let address = *self.addresses.get(&kind).expect("both alarm kinds are always registered");

        match self.write_bit(address, desired) {
            Ok(()) => {
                self.last_written.insert(kind, desired);
                self.state = PlcLinkState::Connected;
                Ok(true)
            }
            Err(first_err) => {
                warn!(?kind, error = %first_err, "PLC write failed, reconnecting and retrying once");
                self.state = PlcLinkState::Reconnecting;
                self.transport.disconnect();
                if let Err(reconnect_err) = self.transport.connect() {
                    self.state = PlcLinkState::Error;
                    error!(?kind, error = %reconnect_err, "PLC reconnect failed");
                    return Err(reconnect_err);
                }

                match self.write_bit(address, desired) {
                    Ok(()) => {
                        self.last_written.insert(kind, desired);
                        self.state = PlcLinkState::Connected;
                        Ok(true)
                    }
                    Err(retry_err) => {
                        self.state = PlcLinkState::Error;
                        error!(?kind, error = %retry_err, "PLC write failed after retry, marking link unhealthy");
                        Err(retry_err)
                    }
                }
            }
        }
    }

    /// Read-modify-write the single byte containing `address`'s bit.
    fn write_bit(&mut self, address: AlarmAddress, value: bool) -> Result<()> {
        let mut byte = self.transport.read_byte(address.data_block, address.byte_offset)?;
        if value {
            byte |= 1 << address.bit_offset;
        } else {
            byte &= !(1 << address.bit_offset);
        }
        self.transport.write_byte(address.data_block, address.byte_offset, byte)
    }

    /// Write every alarm address to 0 before the supervisor releases the
    /// link (§4.7 shutdown). Failures are logged, never propagated
    /// (§7 shutdown-path errors).
    pub fn shutdown(&mut self) {
        for kind in [AlarmKind::Person, AlarmKind::Coal] {
            if let Err(e) = self.set(kind, false) {
                warn!(?kind, error = %e, "failed to clear alarm bit on shutdown");
            }
        }
        self.transport.disconnect();
        self.state = PlcLinkState::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plc::transport::SharedMockTransport;
    use crate::plc::PlcLinkId;

    fn link() -> PlcLinkId {
        PlcLinkId { host: "10.0.0.1".into(), port: 102, rack: 0, slot: 2 }
    }

    fn actuator() -> (AlarmActuator, SharedMockTransport, AlarmAddress, AlarmAddress) {
        let shared = SharedMockTransport::new(link());
        let person = AlarmAddress { data_block: 300, byte_offset: 6, bit_offset: 0 };
        let coal = AlarmAddress { data_block: 300, byte_offset: 6, bit_offset: 1 };
        (AlarmActuator::new(Box::new(shared.clone()), person, coal), shared, person, coal)
    }

    #[test]
    fn idempotent_repeated_sets_write_once() {
        // distilled spec §8 invariant 8 / scenario 6.
        let (mut actuator, _shared, _, _) = actuator();
        assert!(actuator.set(AlarmKind::Person, true).unwrap());
        assert!(!actuator.set(AlarmKind::Person, true).unwrap());
        assert!(!actuator.set(AlarmKind::Person, true).unwrap());
        assert!(actuator.set(AlarmKind::Person, false).unwrap());
        assert!(!actuator.set(AlarmKind::Person, false).unwrap());
    }

    #[test]
    fn read_modify_write_preserves_other_bits() {
        let (mut actuator, shared, person, coal) = actuator();
        actuator.set(AlarmKind::Person, true).unwrap();
        actuator.set(AlarmKind::Coal, true).unwrap();

        let byte = shared.peek_byte(person.data_block, person.byte_offset);
        assert_eq!(byte & (1 << person.bit_offset), 1 << person.bit_offset);
        assert_eq!(byte & (1 << coal.bit_offset), 1 << coal.bit_offset);
    }

    #[test]
    fn write_failure_retries_once_then_succeeds() {
        let shared = SharedMockTransport::new(link());
        shared.fail_next_writes(1);
        let person = AlarmAddress { data_block: 300, byte_offset: 6, bit_offset: 0 };
        let coal = AlarmAddress { data_block: 300, byte_offset: 6, bit_offset: 1 };
        let mut actuator = AlarmActuator::new(Box::new(shared), person, coal);

        assert!(actuator.set(AlarmKind::Person, true).unwrap());
        assert_eq!(actuator.link_state(), PlcLinkState::Connected);
    }

    #[test]
    fn write_failure_exhausting_retry_marks_unhealthy() {
        let shared = SharedMockTransport::new(link());
        shared.fail_next_writes(2);
        let person = AlarmAddress { data_block: 300, byte_offset: 6, bit_offset: 0 };
        let coal = AlarmAddress { data_block: 300, byte_offset: 6, bit_offset: 1 };
        let mut actuator = AlarmActuator::new(Box::new(shared), person, coal);

        assert!(actuator.set(AlarmKind::Person, true).is_err());
        assert_eq!(actuator.link_state(), PlcLinkState::Error);
    }

    #[test]
    fn shutdown_clears_both_addresses() {
        let (mut actuator, shared, person, coal) = actuator();
        actuator.set(AlarmKind::Person, true).unwrap();
        actuator.set(AlarmKind::Coal, true).unwrap();
        actuator.shutdown();

        assert_eq!(shared.peek_byte(person.data_block, person.byte_offset) & (1 << person.bit_offset), 0);
        assert_eq!(shared.peek_byte(coal.data_block, coal.byte_offset) & (1 << coal.bit_offset), 0);
        assert!(!shared.is_connected());
    }
}
