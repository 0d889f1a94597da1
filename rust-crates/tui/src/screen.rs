//! What the terminal shows, and when to poke the dealer.

use dealer::{
    chat::ChatTurn,
    table::TableView,
};
use dice_poker_game::GameState;

const MAX_ERRORS: usize = 5;

/// Follow-up work the poll loop should start after a state change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    DealerTurn(Vec<ChatTurn>),
    Join,
    Chat { message: String, history: Vec<ChatTurn> },
    Refresh,
}

#[derive(Clone, Debug, Default)]
pub struct TableScreen {
    pub view: Option<TableView>,
    pub history: Vec<ChatTurn>,
    pub status: String,
    pub errors: Vec<String>,
    pub input: Option<String>,
    /// Set while a dealer move is in flight.
    turn_pending: bool,
    /// State the dealer was last asked to move in.
    triggered_at: Option<GameState>,
}

impl TableScreen {
    /// Takes a fresh poll. Returns a command when the dealer owes a move
    /// it has not been asked for yet.
    pub fn on_table(&mut self, view: TableView) -> Option<Command> {
        let dealer_to_move = view.dealer_seat.is_some() && view.turn == view.dealer_seat;
        let state = view.state;
        self.view = Some(view);
        if !dealer_to_move {
            self.triggered_at = None;
            return None;
        }
        if self.turn_pending || self.triggered_at == Some(state) {
            return None;
        }
        self.turn_pending = true;
        self.triggered_at = Some(state);
        self.status = "Dealer is thinking...".to_string();
        Some(Command::DealerTurn(self.history.clone()))
    }

    pub fn on_turn(&mut self, result: Result<(String, Vec<ChatTurn>), String>) -> Command {
        self.turn_pending = false;
        match result {
            Ok((message, history)) => {
                self.status = message;
                self.history = history;
            }
            Err(err) => {
                // allow another attempt in the same state
                self.triggered_at = None;
                self.push_error(format!("Dealer move failed: {err}"));
            }
        }
        Command::Refresh
    }

    pub fn on_chat(&mut self, result: Result<(String, Vec<ChatTurn>), String>) {
        match result {
            Ok((message, history)) => {
                if !message.is_empty() {
                    self.status = format!("Dealer: {message}");
                }
                self.history = history;
            }
            Err(err) => self.push_error(format!("Chat failed: {err}")),
        }
    }

    pub fn on_joined(&mut self, result: Result<String, String>) -> Command {
        match result {
            Ok(message) => self.status = format!("Dealer joined: {message}"),
            Err(err) => self.push_error(format!("Join failed: {err}")),
        }
        Command::Refresh
    }

    pub fn push_error(&mut self, error: String) {
        tracing::warn!("{error}");
        self.errors.push(error);
        if self.errors.len() > MAX_ERRORS {
            self.errors.remove(0);
        }
    }

    pub fn begin_input(&mut self) {
        self.input = Some(String::new());
    }

    /// Ends chat input; `Some` when there is something to send.
    pub fn submit_input(&mut self) -> Option<Command> {
        let message = self.input.take()?.trim().to_string();
        if message.is_empty() {
            return None;
        }
        Some(Command::Chat {
            message,
            history: self.history.clone(),
        })
    }

    pub fn turn_pending(&self) -> bool {
        self.turn_pending
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use dice_poker_game::Seat;

    fn view(code: u64, dealer_seat: Option<Seat>) -> TableView {
        let state = GameState::new(code).unwrap();
        TableView {
            state,
            phase: state.name().to_string(),
            round: state.round(),
            revealed_dice: state.revealed_dice_count(),
            turn: state.turn_owner(),
            dealer_seat,
            pot: "0".to_string(),
            current_bet: "0".to_string(),
            seats: vec![],
        }
    }

    #[test]
    fn on_table__triggers_once_per_dealer_state() {
        // given
        let mut screen = TableScreen::default();

        // when
        let first = screen.on_table(view(2, Some(Seat::Second)));
        let again = screen.on_table(view(2, Some(Seat::Second)));

        // then
        assert_eq!(first, Some(Command::DealerTurn(vec![])));
        assert_eq!(again, None);
        assert!(screen.turn_pending());
    }

    #[test]
    fn on_table__ignores_the_humans_turn_and_unseated_dealer() {
        let mut screen = TableScreen::default();
        assert_eq!(screen.on_table(view(1, Some(Seat::Second))), None);
        assert_eq!(screen.on_table(view(2, None)), None);
        assert!(!screen.turn_pending());
    }

    #[test]
    fn on_turn__failure_allows_a_retry_in_the_same_state() {
        // given
        let mut screen = TableScreen::default();
        screen.on_table(view(6, Some(Seat::Second)));

        // when
        let command = screen.on_turn(Err("rpc down".to_string()));
        let retry = screen.on_table(view(6, Some(Seat::Second)));

        // then
        assert_eq!(command, Command::Refresh);
        assert!(matches!(retry, Some(Command::DealerTurn(_))));
        assert_eq!(screen.errors.len(), 1);
    }

    #[test]
    fn on_turn__success_keeps_the_new_history() {
        let mut screen = TableScreen::default();
        screen.on_table(view(6, Some(Seat::Second)));
        let history = vec![ChatTurn::human("Your move, Dealer."), ChatTurn::ai("Rolls.")];

        screen.on_turn(Ok(("Rolls.".to_string(), history.clone())));

        assert_eq!(screen.history, history);
        assert_eq!(screen.status, "Rolls.");
        assert_eq!(screen.on_table(view(6, Some(Seat::Second))), None);
    }

    #[test]
    fn submit_input__skips_blank_messages() {
        let mut screen = TableScreen::default();
        screen.begin_input();
        screen.input.as_mut().unwrap().push_str("   ");
        assert_eq!(screen.submit_input(), None);

        screen.begin_input();
        screen.input.as_mut().unwrap().push_str(" hi ");
        assert_eq!(
            screen.submit_input(),
            Some(Command::Chat {
                message: "hi".to_string(),
                history: vec![]
            })
        );
    }

    #[test]
    fn push_error__keeps_the_latest_few() {
        let mut screen = TableScreen::default();
        for i in 0..8 {
            screen.push_error(format!("e{i}"));
        }
        assert_eq!(screen.errors.len(), MAX_ERRORS);
        assert_eq!(screen.errors[0], "e3");
    }
}
