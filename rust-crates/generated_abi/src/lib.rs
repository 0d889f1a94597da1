use ethers::{
    providers::Middleware,
    types::Address,
};
use std::sync::Arc;

pub mod dice_poker_types {
    use ethers::contract::abigen;

    abigen!(DicePoker, "abi/DicePoker.json");
}

pub use dice_poker_types::DicePoker;

/// The ABI the bindings were generated from, used to fingerprint deployments.
pub const DICE_POKER_ABI: &str = include_str!("../abi/DicePoker.json");

pub fn dice_poker_at<M: Middleware>(address: Address, client: Arc<M>) -> DicePoker<M> {
    DicePoker::new(address, client)
}
