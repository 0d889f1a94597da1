use crate::{
    Result,
    gateway::ContractGateway,
};
use dice_poker_game::{
    DecisionContext,
    Dice,
    GameState,
    HandStrength,
    Seat,
    amount::format_units,
    evaluate,
    seat::seat_of,
};
use ethers::types::Address;
use serde::{
    Deserialize,
    Serialize,
};

/// Everything public about the table at one point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSnapshot {
    pub state: GameState,
    pub players: [Option<Address>; 2],
    pub bets: [u128; 2],
    pub dice: [Dice; 2],
    pub pot: u128,
    pub current_bet: u128,
}

impl TableSnapshot {
    pub fn seat_of(&self, who: Address) -> Option<Seat> {
        seat_of(&self.players, &who)
    }

    pub fn seated_count(&self) -> usize {
        self.players.iter().flatten().count()
    }

    pub fn player(&self, seat: Seat) -> Option<Address> {
        self.players[seat.index()]
    }

    pub fn dice_of(&self, seat: Seat) -> Dice {
        self.dice[seat.index()]
    }

    /// What `seat` knows before it moves. Without a seat both hands are
    /// treated as the first seat's view.
    pub fn decision_context(&self, seat: Option<Seat>, round_bet: u128) -> DecisionContext {
        let mine = seat.unwrap_or(Seat::First);
        DecisionContext {
            state: self.state,
            seat,
            my_dice: self.dice_of(mine),
            opponent_dice: self.dice_of(mine.opponent()),
            to_call: self.current_bet.saturating_sub(round_bet),
        }
    }

    pub fn view(&self, dealer: Address) -> Result<TableView> {
        let seats = Seat::ALL
            .iter()
            .map(|seat| {
                let dice = self.dice_of(*seat).masked(self.state);
                Ok(SeatView {
                    seat: *seat,
                    address: self.player(*seat),
                    is_dealer: self.player(*seat) == Some(dealer),
                    bet: format_units(self.bets[seat.index()]),
                    hand: evaluate(&dice.values())?,
                    dice,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TableView {
            state: self.state,
            phase: self.state.name().to_string(),
            round: self.state.round(),
            revealed_dice: self.state.revealed_dice_count(),
            turn: self.state.turn_owner(),
            dealer_seat: self.seat_of(dealer),
            pot: format_units(self.pot),
            current_bet: format_units(self.current_bet),
            seats,
        })
    }
}

pub async fn read_table<G: ContractGateway>(gateway: &G) -> Result<TableSnapshot> {
    let state = gateway.read_state().await?;
    let players = gateway.read_players().await?;
    let bets = gateway.read_bets().await?;
    let dice = [
        gateway.read_dice(Seat::First).await?,
        gateway.read_dice(Seat::Second).await?,
    ];
    let pot = gateway.read_pot().await?;
    let current_bet = gateway.read_current_bet().await?;
    Ok(TableSnapshot {
        state,
        players,
        bets,
        dice,
        pot,
        current_bet,
    })
}

/// A polling client's view of the table. Dice past the reveal count are
/// zeroed for both seats.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub state: GameState,
    pub phase: String,
    pub round: Option<u8>,
    pub revealed_dice: usize,
    pub turn: Option<Seat>,
    pub dealer_seat: Option<Seat>,
    pub pot: String,
    pub current_bet: String,
    pub seats: Vec<SeatView>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatView {
    pub seat: Seat,
    pub address: Option<Address>,
    pub is_dealer: bool,
    pub bet: String,
    pub dice: Dice,
    pub hand: HandStrength,
}
