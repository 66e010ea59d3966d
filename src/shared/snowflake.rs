//! Snowflake ID Generator
//!
//! 64-bit ids: 41 bits of milliseconds since the HotelFlow epoch, 10 bits of
//! machine id, 12 bits of per-millisecond sequence.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// HotelFlow epoch (2025-01-01T00:00:00.000Z)
pub const HOTELFLOW_EPOCH: u64 = 1_735_689_600_000;

const MACHINE_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

/// Snowflake ID generator
pub struct SnowflakeGenerator {
    machine_id: u64,
    state: Mutex<GeneratorState>,
}

struct GeneratorState {
    last_timestamp: u64,
    sequence: u64,
}

impl SnowflakeGenerator {
    /// Create a new snowflake generator for the given machine id (0-1023).
    pub fn new(machine_id: u64) -> Self {
        Self {
            machine_id: machine_id & ((1 << MACHINE_BITS) - 1),
            state: Mutex::new(GeneratorState {
                last_timestamp: 0,
                sequence: 0,
            }),
        }
    }

    /// Generate a new snowflake ID
    pub fn generate(&self) -> i64 {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut timestamp = current_millis().max(state.last_timestamp);
        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // Sequence exhausted for this millisecond, borrow the next one.
                timestamp += 1;
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = timestamp;

        let id = ((timestamp - HOTELFLOW_EPOCH) << (MACHINE_BITS + SEQUENCE_BITS))
            | (self.machine_id << SEQUENCE_BITS)
            | state.sequence;

        id as i64
    }
}

fn current_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(HOTELFLOW_EPOCH)
}

/// Extract timestamp from snowflake ID
pub fn extract_timestamp(snowflake: i64) -> u64 {
    ((snowflake as u64) >> (MACHINE_BITS + SEQUENCE_BITS)) + HOTELFLOW_EPOCH
}

/// Parse snowflake from string
pub fn from_string(s: &str) -> Result<i64, std::num::ParseIntError> {
    s.trim().parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_unique() {
        let gen = SnowflakeGenerator::new(1);
        let ids: HashSet<i64> = (0..10_000).map(|_| gen.generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_ids_are_increasing() {
        let gen = SnowflakeGenerator::new(3);
        let a = gen.generate();
        let b = gen.generate();
        assert!(b > a);
    }

    #[test]
    fn test_extract_timestamp() {
        let gen = SnowflakeGenerator::new(1);
        let id = gen.generate();
        let ts = extract_timestamp(id);
        let now = current_millis();
        assert!(ts <= now + 5);
        assert!(ts > now - 1000);
    }

    #[test]
    fn test_from_string_trims() {
        assert_eq!(from_string(" 42 ").unwrap(), 42);
        assert!(from_string("abc").is_err());
    }
}
