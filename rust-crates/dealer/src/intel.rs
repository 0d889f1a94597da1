use crate::{
    Result,
    gateway::ContractGateway,
};
use dice_poker_game::amount::{
    WEI_PER_UNIT,
    format_units,
};
use ethers::types::Address;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Wealth {
    Whale,
    Comfortable,
    Poor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    High,
    Medium,
    Low,
}

/// Public on-chain facts about the other seat, for table talk only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentIntel {
    pub address: Address,
    pub balance: String,
    pub transaction_count: u64,
    pub wealth: Wealth,
    pub activity: Activity,
    pub talking_points: Vec<&'static str>,
}

impl OpponentIntel {
    pub fn classify(address: Address, balance_wei: u128, transaction_count: u64) -> Self {
        let wealth = if balance_wei > 100 * WEI_PER_UNIT {
            Wealth::Whale
        } else if balance_wei > 10 * WEI_PER_UNIT {
            Wealth::Comfortable
        } else {
            Wealth::Poor
        };
        let activity = match transaction_count {
            101.. => Activity::High,
            21..=100 => Activity::Medium,
            _ => Activity::Low,
        };

        let mut talking_points = Vec::new();
        if balance_wei < WEI_PER_UNIT {
            talking_points.push("Their wallet is nearly empty. Ask if they can cover the next raise.");
        } else if wealth == Wealth::Whale {
            talking_points.push("Deep pockets. Tell them money cannot buy good dice.");
        }
        if transaction_count < 10 {
            talking_points.push("Barely any history on chain. Treat them like a newcomer.");
        } else if transaction_count > 1000 {
            talking_points.push("Thousands of transactions. Acknowledge a seasoned grinder.");
        }

        Self {
            address,
            balance: format_units(balance_wei),
            transaction_count,
            wealth,
            activity,
            talking_points,
        }
    }
}

pub async fn gather<G: ContractGateway>(gateway: &G, address: Address) -> Result<OpponentIntel> {
    let balance = gateway.balance_of(address).await?;
    let transaction_count = gateway.transaction_count(address).await?;
    Ok(OpponentIntel::classify(address, balance, transaction_count))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn classify__levels_follow_thresholds() {
        let rich = OpponentIntel::classify(Address::zero(), 101 * WEI_PER_UNIT, 101);
        assert_eq!(rich.wealth, Wealth::Whale);
        assert_eq!(rich.activity, Activity::High);

        let middle = OpponentIntel::classify(Address::zero(), 11 * WEI_PER_UNIT, 21);
        assert_eq!(middle.wealth, Wealth::Comfortable);
        assert_eq!(middle.activity, Activity::Medium);

        let edge = OpponentIntel::classify(Address::zero(), 100 * WEI_PER_UNIT, 100);
        assert_eq!(edge.wealth, Wealth::Comfortable);
        assert_eq!(edge.activity, Activity::Medium);

        let poor = OpponentIntel::classify(Address::zero(), 10 * WEI_PER_UNIT, 20);
        assert_eq!(poor.wealth, Wealth::Poor);
        assert_eq!(poor.activity, Activity::Low);
    }

    #[test]
    fn classify__talking_points_for_extremes_only() {
        let broke_newbie = OpponentIntel::classify(Address::zero(), WEI_PER_UNIT / 2, 3);
        assert_eq!(broke_newbie.talking_points.len(), 2);

        let ordinary = OpponentIntel::classify(Address::zero(), 50 * WEI_PER_UNIT, 500);
        assert!(ordinary.talking_points.is_empty());

        let grinder = OpponentIntel::classify(Address::zero(), 50 * WEI_PER_UNIT, 1001);
        assert_eq!(grinder.talking_points.len(), 1);
    }
}
