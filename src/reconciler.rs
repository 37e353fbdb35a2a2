//! Reconciles candidate address lists against the OVM ETH balance slots found
//! in a genesis allocation.
//!
//! Every reference slot starts unvisited. Each candidate address is hashed to
//! its balance slot; a hit flags the slot and records the address. Flags only
//! ever go from unvisited to visited, so batch order and repeated batches do
//! not change the final state.

use crate::{
    error::Result,
    genesis::Genesis,
    slots::ovm_eth_balance_slot,
    sources::AddressBatch,
};
use alloy_primitives::{Address, B256};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

/// Cumulative found/missing reference slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub found: usize,
    pub missing: usize,
}

impl Counts {
    pub fn total(&self) -> usize {
        self.found + self.missing
    }
}

/// Statistics for one processed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub source: String,
    /// Addresses in the batch, duplicates included.
    pub scanned: usize,
    /// Addresses in the batch whose slot is in the reference set.
    pub matched: usize,
    /// Reference slots flagged for the first time by this batch.
    pub newly_found: usize,
    pub counts: Counts,
}

/// Tracks which reference slots have a matching candidate address.
#[derive(Debug, Clone, Default)]
pub struct AddressReconciler {
    /// reference slot → visited
    visited_slots: HashMap<B256, bool>,
    /// Every candidate address that hit a reference slot.
    matched_addresses: BTreeSet<Address>,
}

impl AddressReconciler {
    /// Start a run against a fixed set of reference slots.
    pub fn new<I>(reference_slots: I) -> Self
    where
        I: IntoIterator<Item = B256>,
    {
        let visited_slots: HashMap<B256, bool> = reference_slots
            .into_iter()
            .map(|slot| (slot, false))
            .collect();
        debug!(slots = visited_slots.len(), "reconciler initialized");
        Self {
            visited_slots,
            matched_addresses: BTreeSet::new(),
        }
    }

    /// Reference slots are the storage keys of the OVM ETH predeploy.
    pub fn from_genesis(genesis: &Genesis) -> Result<Self> {
        let storage = genesis.ovm_eth_storage()?;
        Ok(Self::new(storage.keys().copied()))
    }

    /// Number of reference slots.
    pub fn len(&self) -> usize {
        self.visited_slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited_slots.is_empty()
    }

    /// Process one named batch of already-validated addresses.
    pub fn process_batch(&mut self, batch: &AddressBatch) -> BatchReport {
        self.process_addresses(&batch.source, batch.addresses.iter().copied())
    }

    /// Hash each address to its OVM ETH balance slot and flag reference hits.
    /// `source` only labels the returned report and log line.
    pub fn process_addresses<I>(&mut self, source: &str, addresses: I) -> BatchReport
    where
        I: IntoIterator<Item = Address>,
    {
        let mut scanned = 0;
        let mut matched = 0;
        let mut newly_found = 0;

        for address in addresses {
            scanned += 1;
            let slot = ovm_eth_balance_slot(address);
            let Some(visited) = self.visited_slots.get_mut(&slot) else {
                continue;
            };
            if !*visited {
                *visited = true;
                newly_found += 1;
            }
            matched += 1;
            self.matched_addresses.insert(address);
        }

        let report = BatchReport {
            source: source.to_string(),
            scanned,
            matched,
            newly_found,
            counts: self.counts(),
        };
        info!(
            source = %report.source,
            scanned,
            matched,
            newly_found,
            found = report.counts.found,
            missing = report.counts.missing,
            "processed address batch"
        );
        report
    }

    /// Found vs missing reference slots. Always sums to [`Self::len`].
    pub fn counts(&self) -> Counts {
        let found = self.visited_slots.values().filter(|visited| **visited).count();
        Counts {
            found,
            missing: self.visited_slots.len() - found,
        }
    }

    /// Every address matched so far, across all batches.
    pub fn matched_addresses(&self) -> &BTreeSet<Address> {
        &self.matched_addresses
    }

    /// Reference slots no candidate has matched yet, sorted.
    pub fn missing_slots(&self) -> Vec<B256> {
        let mut missing: Vec<B256> = self
            .visited_slots
            .iter()
            .filter(|(_, visited)| !**visited)
            .map(|(slot, _)| *slot)
            .collect();
        missing.sort_unstable();
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    const X: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const Y: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
    const Z: Address = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");

    fn unrelated_slot() -> B256 {
        b256!("00000000000000000000000000000000000000000000000000000000000000ff")
    }

    #[test]
    fn single_hit_among_candidates() {
        let mut reconciler = AddressReconciler::new([ovm_eth_balance_slot(X)]);
        let report = reconciler.process_addresses("batch", [X, Y]);

        assert_eq!(report.scanned, 2);
        assert_eq!(report.matched, 1);
        assert_eq!(report.newly_found, 1);
        assert_eq!(reconciler.counts(), Counts { found: 1, missing: 0 });
        assert_eq!(
            reconciler.matched_addresses().iter().copied().collect::<Vec<_>>(),
            vec![X]
        );
    }

    #[test]
    fn counts_always_sum_to_reference_size() {
        let mut reconciler = AddressReconciler::new([
            ovm_eth_balance_slot(X),
            ovm_eth_balance_slot(Y),
            unrelated_slot(),
        ]);
        assert_eq!(reconciler.counts(), Counts { found: 0, missing: 3 });

        for batch in [vec![X], vec![Z], vec![Y, X], vec![]] {
            reconciler.process_addresses("batch", batch);
            assert_eq!(reconciler.counts().total(), reconciler.len());
        }
        assert_eq!(reconciler.counts(), Counts { found: 2, missing: 1 });
        assert_eq!(reconciler.missing_slots(), vec![unrelated_slot()]);
    }

    #[test]
    fn repeated_batch_is_idempotent() {
        let slots = [ovm_eth_balance_slot(X), ovm_eth_balance_slot(Y)];
        let mut once = AddressReconciler::new(slots);
        once.process_addresses("b", [X, Z]);

        let mut twice = AddressReconciler::new(slots);
        twice.process_addresses("b", [X, Z]);
        let second = twice.process_addresses("b", [X, Z]);

        assert_eq!(second.newly_found, 0);
        assert_eq!(once.counts(), twice.counts());
        assert_eq!(once.matched_addresses(), twice.matched_addresses());
        assert_eq!(once.missing_slots(), twice.missing_slots());
    }

    #[test]
    fn batch_order_does_not_matter() {
        let slots = [ovm_eth_balance_slot(X), ovm_eth_balance_slot(Y), unrelated_slot()];
        let b1 = AddressBatch::new("b1", vec![X, Z]);
        let b2 = AddressBatch::new("b2", vec![Y]);

        let mut forward = AddressReconciler::new(slots);
        forward.process_batch(&b1);
        forward.process_batch(&b2);

        let mut reverse = AddressReconciler::new(slots);
        reverse.process_batch(&b2);
        reverse.process_batch(&b1);

        assert_eq!(forward.counts(), reverse.counts());
        assert_eq!(forward.matched_addresses(), reverse.matched_addresses());
        assert_eq!(forward.missing_slots(), reverse.missing_slots());
    }

    #[test]
    fn duplicates_across_batches_collapse() {
        let mut reconciler = AddressReconciler::new([ovm_eth_balance_slot(X)]);
        reconciler.process_addresses("a", [X]);
        let report = reconciler.process_addresses("b", [X, X]);
        assert_eq!(report.matched, 2);
        assert_eq!(report.newly_found, 0);
        assert_eq!(reconciler.matched_addresses().len(), 1);
    }

    #[test]
    fn upper_and_lower_case_inputs_match_identically() {
        use crate::address::parse_address;

        let upper = parse_address("0xF39FD6E51AAD88F6F4CE6AB8827279CFFFB92266", "upper").unwrap();
        let lower = parse_address("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266", "lower").unwrap();

        let mut a = AddressReconciler::new([ovm_eth_balance_slot(X)]);
        a.process_addresses("upper", [upper]);
        let mut b = AddressReconciler::new([ovm_eth_balance_slot(X)]);
        b.process_addresses("lower", [lower]);

        assert_eq!(a.counts(), Counts { found: 1, missing: 0 });
        assert_eq!(a.matched_addresses(), b.matched_addresses());
    }

    #[test]
    fn empty_reference_set() {
        let mut reconciler = AddressReconciler::new(std::iter::empty());
        assert!(reconciler.is_empty());
        reconciler.process_addresses("batch", [X]);
        assert_eq!(reconciler.counts(), Counts::default());
        assert!(reconciler.matched_addresses().is_empty());
    }
}
