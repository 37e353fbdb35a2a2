//! OVM ETH balance storage slot computation.
//!
//! The legacy OVM ETH contract keeps balances in a Solidity
//! `mapping(address => uint256)` at slot 0, so `balances[holder]` lives at
//! `keccak256(abi.encode(holder, 0))`.

use alloy_primitives::{address, keccak256, Address, B256, U256};
use alloy_sol_types::SolValue;

/// Predeploy holding legacy OVM ETH balances in its storage.
pub const OVM_ETH_CONTRACT: Address = address!("DeadDeAddeAddEAddeadDEaDDEAdDeaDDeAD0000");

/// Base slot of the OVM ETH `balances` mapping.
pub const OVM_ETH_BALANCE_MAPPING_SLOT: u64 = 0;

/// Compute the storage slot for `balances[holder]` in the OVM ETH contract.
pub fn ovm_eth_balance_slot(holder: Address) -> B256 {
    compute_mapping_slot(holder, U256::from(OVM_ETH_BALANCE_MAPPING_SLOT))
}

/// `keccak256(abi.encode(key, mapping_slot))`
///
/// Both operands are encoded as left-padded 32-byte words, so the hashed
/// preimage is always 64 bytes.
pub fn compute_mapping_slot(key: Address, mapping_slot: U256) -> B256 {
    let encoded = (key, mapping_slot).abi_encode();
    keccak256(&encoded)
}
