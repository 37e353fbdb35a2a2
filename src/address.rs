//! Strict parsing of hex addresses and storage keys.
//!
//! Source lists mix checksummed, upper- and lower-case hex, with and without
//! a `0x` prefix. Everything is decoded into fixed-width bytes here, so all
//! later comparisons are case-insensitive by construction. Wrong lengths and
//! non-hex characters are rejected instead of being padded or truncated.

use crate::error::{ReconcileError, Result};
use alloy_primitives::{Address, B256};

fn strip_hex_prefix(raw: &str) -> &str {
    raw.strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw)
}

fn decode_fixed<const N: usize>(raw: &str) -> std::result::Result<[u8; N], String> {
    let digits = strip_hex_prefix(raw.trim());
    if digits.len() != N * 2 {
        return Err(format!(
            "expected {} hex digits, got {}",
            N * 2,
            digits.len()
        ));
    }
    let mut out = [0u8; N];
    hex::decode_to_slice(digits, &mut out).map_err(|e| e.to_string())?;
    Ok(out)
}

/// Parse a 20-byte address. `source_list` names where the value came from.
pub fn parse_address(raw: &str, source_list: &str) -> Result<Address> {
    decode_fixed::<20>(raw)
        .map(Address::from)
        .map_err(|reason| ReconcileError::MalformedAddress {
            value: raw.to_string(),
            source_list: source_list.to_string(),
            reason,
        })
}

/// Parse a 32-byte storage key.
pub fn parse_storage_key(raw: &str, source_list: &str) -> Result<B256> {
    decode_fixed::<32>(raw)
        .map(B256::from)
        .map_err(|reason| ReconcileError::MalformedStorageKey {
            value: raw.to_string(),
            source_list: source_list.to_string(),
            reason,
        })
}

/// Lower-case hex without `0x`, the form used in genesis alloc keys and
/// persisted address lists.
pub fn to_unprefixed_hex(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(bytes)
}
