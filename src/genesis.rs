//! Typed genesis document.
//!
//! Only the `alloc` section is modelled. Every other top-level field
//! (`config`, `gasLimit`, `difficulty`, ...) is kept as raw JSON, with
//! arbitrary-precision numbers and original order, so a rewritten genesis
//! differs from its input only in the accounts we change.
//!
//! Alloc entries are validated while loading: addresses, storage keys and
//! words, balances and nonces must all parse, otherwise loading fails and
//! names the offending account and field.

use crate::{
    address::{parse_address, parse_storage_key, to_unprefixed_hex},
    error::{ReconcileError, Result},
    slots::{ovm_eth_balance_slot, OVM_ETH_CONTRACT},
};
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::collections::{btree_map::Entry, BTreeMap};
use std::path::Path;
use tracing::{debug, info, warn};

const ALLOC_FIELD: &str = "alloc";

/// Nonce given to accounts created while carrying balances forward.
const NEW_ACCOUNT_NONCE: u64 = 0;

/// An account in the genesis allocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenesisAccount {
    pub balance: U256,
    pub nonce: Option<u64>,
    pub code: Option<Bytes>,
    pub storage: Option<BTreeMap<B256, B256>>,
    pub secret_key: Option<String>,
}

/// Genesis document with a typed allocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Genesis {
    pub alloc: BTreeMap<Address, GenesisAccount>,
    /// All other top-level fields, preserved verbatim.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Result of [`Genesis::carry_forward_balances`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CarryForwardReport {
    /// Accounts that had no alloc entry and were created with nonce 0.
    pub created: usize,
    /// Existing accounts whose balance was overwritten.
    pub updated: usize,
    /// Matched addresses with no balance word in the OVM ETH storage.
    pub skipped: usize,
}

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct RawAccount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    storage: Option<BTreeMap<String, String>>,
    #[serde(default = "zero_balance")]
    balance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nonce: Option<String>,
    #[serde(rename = "secretKey", default, skip_serializing_if = "Option::is_none")]
    secret_key: Option<String>,
}

fn zero_balance() -> String {
    "0x0".to_string()
}

fn strip_hex_prefix(raw: &str) -> Option<&str> {
    raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))
}

/// `0x`-prefixed hex or plain decimal, as geth accepts for balances.
fn parse_u256_quantity(raw: &str) -> std::result::Result<U256, String> {
    let raw = raw.trim();
    match strip_hex_prefix(raw) {
        Some("") => Ok(U256::ZERO),
        Some(digits) => U256::from_str_radix(digits, 16).map_err(|e| e.to_string()),
        None => U256::from_str_radix(raw, 10).map_err(|e| e.to_string()),
    }
}

fn parse_u64_quantity(raw: &str) -> std::result::Result<u64, String> {
    let raw = raw.trim();
    match strip_hex_prefix(raw) {
        Some("") => Ok(0),
        Some(digits) => u64::from_str_radix(digits, 16).map_err(|e| e.to_string()),
        None => raw.parse::<u64>().map_err(|e| e.to_string()),
    }
}

/// Storage word: up to 32 bytes of hex, left-padded.
fn parse_storage_word(raw: &str) -> std::result::Result<B256, String> {
    let raw = raw.trim();
    let digits = strip_hex_prefix(raw).unwrap_or(raw);
    if digits.len() > 64 {
        return Err(format!("expected at most 64 hex digits, got {}", digits.len()));
    }
    let padded = format!("{digits:0>64}");
    let mut word = [0u8; 32];
    hex::decode_to_slice(&padded, &mut word).map_err(|e| e.to_string())?;
    Ok(B256::from(word))
}

fn parse_code(raw: &str) -> std::result::Result<Bytes, String> {
    let raw = raw.trim();
    let digits = strip_hex_prefix(raw).unwrap_or(raw);
    hex::decode(digits).map(Bytes::from).map_err(|e| e.to_string())
}

fn malformed(owner: &str, field: impl Into<String>, value: &str, reason: String) -> ReconcileError {
    ReconcileError::MalformedAccountField {
        owner: owner.to_string(),
        field: field.into(),
        value: value.to_string(),
        reason,
    }
}

impl GenesisAccount {
    fn from_raw(owner: &str, raw: RawAccount) -> Result<Self> {
        let balance = parse_u256_quantity(&raw.balance)
            .map_err(|reason| malformed(owner, "balance", &raw.balance, reason))?;
        let nonce = raw
            .nonce
            .as_deref()
            .map(|nonce| {
                parse_u64_quantity(nonce).map_err(|reason| malformed(owner, "nonce", nonce, reason))
            })
            .transpose()?;
        let code = raw
            .code
            .as_deref()
            .map(|code| parse_code(code).map_err(|reason| malformed(owner, "code", code, reason)))
            .transpose()?;

        let storage = match raw.storage {
            Some(raw_storage) => {
                let source = format!("storage of alloc entry {owner}");
                let mut storage = BTreeMap::new();
                let mut mixed_case = 0usize;
                for (key, value) in raw_storage {
                    let slot = parse_storage_key(&key, &source)?;
                    let word = parse_storage_word(&value).map_err(|reason| {
                        malformed(owner, format!("storage[{key}]"), &value, reason)
                    })?;
                    if key.chars().any(|c| c.is_ascii_uppercase()) {
                        mixed_case += 1;
                    }
                    if storage.insert(slot, word).is_some() {
                        warn!(owner, slot = %slot, "duplicate storage key after case normalization, keeping last");
                    }
                }
                if mixed_case > 0 {
                    debug!(owner, mixed_case, "normalized upper-case storage keys");
                }
                Some(storage)
            }
            None => None,
        };

        Ok(Self {
            balance,
            nonce,
            code,
            storage,
            secret_key: raw.secret_key,
        })
    }

    fn to_raw(&self) -> RawAccount {
        RawAccount {
            code: self
                .code
                .as_ref()
                .map(|code| format!("0x{}", hex::encode(code))),
            storage: self.storage.as_ref().map(|storage| {
                storage
                    .iter()
                    .map(|(slot, word)| (format!("{slot:#x}"), format!("{word:#x}")))
                    .collect()
            }),
            balance: format!("0x{:x}", self.balance),
            nonce: self.nonce.map(|nonce| nonce.to_string()),
            secret_key: self.secret_key.clone(),
        }
    }
}

impl Genesis {
    /// Parse a genesis document. `source` is used in error messages.
    pub fn from_json_str(json: &str, source: &str) -> Result<Self> {
        let mut extra: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(json).map_err(|e| ReconcileError::json(source, e))?;
        let raw_alloc = extra
            .remove(ALLOC_FIELD)
            .ok_or_else(|| ReconcileError::MissingAlloc(source.to_string()))?;
        let raw_alloc: BTreeMap<String, RawAccount> =
            serde_json::from_value(raw_alloc).map_err(|e| ReconcileError::json(source, e))?;

        let alloc_source = format!("{source} alloc");
        let mut alloc = BTreeMap::new();
        for (key, raw_account) in raw_alloc {
            let address = parse_address(&key, &alloc_source)?;
            let account = GenesisAccount::from_raw(&key, raw_account)?;
            if alloc.insert(address, account).is_some() {
                warn!(address = %address, "duplicate alloc entry after case normalization, keeping last");
            }
        }

        Ok(Self { alloc, extra })
    }

    /// Load a genesis file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ReconcileError::io(path, e))?;
        let genesis = Self::from_json_str(&content, &path.display().to_string())?;
        info!(
            accounts = genesis.alloc.len(),
            path = %path.display(),
            "loaded genesis"
        );
        Ok(genesis)
    }

    /// Pretty JSON with alloc keys as un-prefixed lower-case hex. The alloc
    /// is written after the preserved fields.
    pub fn to_json_string(&self) -> Result<String> {
        let alloc: BTreeMap<String, RawAccount> = self
            .alloc
            .iter()
            .map(|(address, account)| (to_unprefixed_hex(address.as_slice()), account.to_raw()))
            .collect();
        let alloc = serde_json::to_value(alloc).map_err(|e| ReconcileError::json("genesis", e))?;

        let mut document = self.extra.clone();
        document.insert(ALLOC_FIELD.to_string(), alloc);
        serde_json::to_string_pretty(&document).map_err(|e| ReconcileError::json("genesis", e))
    }

    /// Write the genesis to disk atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json_string()?;
        crate::sources::write_atomic(path, json.as_bytes())?;
        info!(
            accounts = self.alloc.len(),
            path = %path.display(),
            "wrote genesis"
        );
        Ok(())
    }

    /// Storage of the OVM ETH predeploy, i.e. the reference set of balance slots.
    pub fn ovm_eth_storage(&self) -> Result<&BTreeMap<B256, B256>> {
        self.alloc
            .get(&OVM_ETH_CONTRACT)
            .ok_or(ReconcileError::MissingContract(OVM_ETH_CONTRACT))?
            .storage
            .as_ref()
            .ok_or(ReconcileError::MissingStorage(OVM_ETH_CONTRACT))
    }

    /// Every address with an alloc entry.
    pub fn account_addresses(&self) -> Vec<Address> {
        self.alloc.keys().copied().collect()
    }

    /// Copy each matched holder's OVM ETH balance into its own alloc entry.
    ///
    /// Existing accounts keep their nonce and get their balance overwritten;
    /// missing accounts are created with nonce 0.
    pub fn carry_forward_balances<'a, I>(&mut self, matched: I) -> Result<CarryForwardReport>
    where
        I: IntoIterator<Item = &'a Address>,
    {
        let storage = self.ovm_eth_storage()?;
        let mut report = CarryForwardReport::default();

        let mut balances = Vec::new();
        for &holder in matched {
            let slot = ovm_eth_balance_slot(holder);
            let Some(word) = storage.get(&slot) else {
                warn!(holder = %holder, slot = %slot, "no OVM ETH balance for matched address");
                report.skipped += 1;
                continue;
            };
            balances.push((holder, U256::from_be_slice(word.as_slice())));
        }

        for (holder, balance) in balances {
            match self.alloc.entry(holder) {
                Entry::Occupied(mut entry) => {
                    entry.get_mut().balance = balance;
                    report.updated += 1;
                }
                Entry::Vacant(entry) => {
                    entry.insert(GenesisAccount {
                        balance,
                        nonce: Some(NEW_ACCOUNT_NONCE),
                        ..Default::default()
                    });
                    report.created += 1;
                }
            }
        }

        info!(
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            "carried forward OVM ETH balances"
        );
        Ok(report)
    }
}
