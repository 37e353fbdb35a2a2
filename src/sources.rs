//! Candidate address lists and matched-set persistence.
//!
//! Candidate lists come either as JSON arrays of hex strings or as delimited
//! text exports (one record per line, address in the first column). The
//! matched set is written back as a JSON array so a later run can pick up
//! where this one stopped.

use crate::{
    address::{parse_address, to_unprefixed_hex},
    error::{ReconcileError, Result},
};
use alloy_primitives::Address;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

const FIELD_DELIMITERS: &[char] = &[',', '\t', ';'];

/// Spreadsheet exports often start with a UTF-8 byte order mark.
fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{feff}').unwrap_or(content)
}

/// One ordered list of candidate addresses and the name it was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressBatch {
    pub source: String,
    pub addresses: Vec<Address>,
}

impl AddressBatch {
    pub fn new(source: impl Into<String>, addresses: Vec<Address>) -> Self {
        Self {
            source: source.into(),
            addresses,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// Load a candidate list. `.json` files are arrays of strings, anything else
/// is treated as delimited text.
pub fn load_address_list(path: &Path) -> Result<AddressBatch> {
    let content = std::fs::read_to_string(path).map_err(|e| ReconcileError::io(path, e))?;
    let source = path.display().to_string();

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let addresses = if is_json {
        parse_json_list(&content, &source)?
    } else {
        parse_delimited_list(&content, &source)?
    };

    info!(count = addresses.len(), path = %source, "loaded address list");
    Ok(AddressBatch::new(source, addresses))
}

/// `["0xabc...", "ABC...", ...]`
pub fn parse_json_list(content: &str, source: &str) -> Result<Vec<Address>> {
    let raw: Vec<String> =
        serde_json::from_str(strip_bom(content)).map_err(|e| ReconcileError::json(source, e))?;
    raw.iter()
        .enumerate()
        .map(|(index, value)| parse_address(value, &format!("{source}[{index}]")))
        .collect()
}

/// One record per line, address in the first field. Blank lines and `#`
/// comments are ignored, as is a leading `address` header.
pub fn parse_delimited_list(content: &str, source: &str) -> Result<Vec<Address>> {
    let mut addresses = Vec::new();
    let mut seen_record = false;

    for (index, line) in strip_bom(content).lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let field = line
            .split(FIELD_DELIMITERS)
            .next()
            .unwrap_or_default()
            .trim()
            .trim_matches('"');

        if !seen_record && field.eq_ignore_ascii_case("address") {
            debug!(source, "skipping header line");
            seen_record = true;
            continue;
        }
        seen_record = true;

        addresses.push(parse_address(field, &format!("{source}:{}", index + 1))?);
    }

    Ok(addresses)
}

/// Load a matched set written by [`save_matched_addresses`].
pub fn load_matched_addresses(path: &Path) -> Result<AddressBatch> {
    let content = std::fs::read_to_string(path).map_err(|e| ReconcileError::io(path, e))?;
    let source = path.display().to_string();
    let addresses = parse_json_list(&content, &source)?;
    info!(count = addresses.len(), path = %source, "loaded persisted matched set");
    Ok(AddressBatch::new(source, addresses))
}

/// JSON format: `["abc...", ...]`, un-prefixed lower-case hex, sorted.
pub fn save_matched_addresses(path: &Path, matched: &BTreeSet<Address>) -> Result<()> {
    let raw: Vec<String> = matched
        .iter()
        .map(|address| to_unprefixed_hex(address.as_slice()))
        .collect();
    let json = serde_json::to_string_pretty(&raw).map_err(|e| ReconcileError::json(path, e))?;
    write_atomic(path, json.as_bytes())?;
    info!(count = raw.len(), path = %path.display(), "persisted matched set");
    Ok(())
}

/// Atomic write: write to `.tmp` → rename over target.
/// `rename` is atomic on POSIX when src and dst are on the same filesystem
/// (guaranteed here since they share the same parent directory).
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ReconcileError::io(parent, e))?;
    }
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, contents).map_err(|e| ReconcileError::io(&tmp_path, e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| ReconcileError::io(path, e))?;
    Ok(())
}
