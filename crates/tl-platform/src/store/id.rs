//! Document ids
//!
//! 64-bit time-sorted values rendered as 13 Crockford base32 characters:
//! 42 bits of unix milliseconds followed by a 22 bit process-wide sequence.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const ID_LEN: usize = 13;
const TIMESTAMP_MASK: u64 = (1 << 42) - 1;
const SEQUENCE_MASK: u64 = (1 << 22) - 1;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

pub fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    encode(((millis & TIMESTAMP_MASK) << 22) | (sequence & SEQUENCE_MASK))
}

fn encode(mut value: u64) -> String {
    let mut out = [b'0'; ID_LEN];
    for slot in out.iter_mut().rev() {
        *slot = ALPHABET[(value & 0x1F) as usize];
        value >>= 5;
    }
    out.iter().map(|&b| b as char).collect()
}
