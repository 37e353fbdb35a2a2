// OVM ETH Genesis Reconciliation Library
//
// Slot derivation, genesis schema, candidate lists and the reconciler used by
// the `ovm-reconcile` binary

pub mod address;
pub mod error;
pub mod genesis;
pub mod reconciler;
pub mod slots;
pub mod sources;

// Flat re-exports of the workflow types
pub use error::{ReconcileError, Result};
pub use genesis::{CarryForwardReport, Genesis, GenesisAccount};
pub use reconciler::{AddressReconciler, BatchReport, Counts};
pub use slots::{compute_mapping_slot, ovm_eth_balance_slot, OVM_ETH_CONTRACT};
pub use sources::{
    load_address_list, load_matched_addresses, save_matched_addresses, AddressBatch,
};
