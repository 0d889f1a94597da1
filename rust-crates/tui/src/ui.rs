use crate::screen::TableScreen;
use color_eyre::eyre::Result;
use crossterm::{
    event::{
        self,
        Event,
        KeyCode,
        KeyEvent,
        KeyEventKind,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use dealer::{
    chat::ChatRole,
    table::{
        SeatView,
        TableView,
    },
};
use itertools::Itertools;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::{
    Stdout,
    stdout,
};
use tokio::sync::mpsc;

pub type Term = Terminal<CrosstermBackend<Stdout>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Join,
    Refresh,
    StartChat,
    Redraw,
    SendChat,
}

pub fn terminal_enter() -> Result<Term> {
    enable_raw_mode()?;
    crossterm::execute!(stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    Ok(Terminal::new(backend)?)
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

/// Reads terminal events on a plain thread; crossterm's reader blocks.
pub fn input_event_stream() -> mpsc::UnboundedReceiver<KeyEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        loop {
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if tx.send(key).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::error!("terminal input failed: {err}");
                    break;
                }
            }
        }
    });
    rx
}

/// Maps a key press to an event, editing the chat line while it is open.
pub fn interpret_key(screen: &mut TableScreen, key: KeyEvent) -> Option<UserEvent> {
    if let Some(input) = screen.input.as_mut() {
        return match key.code {
            KeyCode::Esc => {
                screen.input = None;
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => Some(UserEvent::SendChat),
            KeyCode::Backspace => {
                input.pop();
                Some(UserEvent::Redraw)
            }
            KeyCode::Char(c) => {
                input.push(c);
                Some(UserEvent::Redraw)
            }
            _ => None,
        };
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(UserEvent::Quit),
        KeyCode::Char('j') => Some(UserEvent::Join),
        KeyCode::Char('r') => Some(UserEvent::Refresh),
        KeyCode::Char('c') | KeyCode::Char('/') => Some(UserEvent::StartChat),
        _ => None,
    }
}

pub fn draw(terminal: &mut Term, screen: &TableScreen) -> Result<()> {
    terminal.draw(|f| ui(f, screen))?;
    Ok(())
}

fn ui(f: &mut Frame, screen: &TableScreen) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // phase + pot
            Constraint::Length(8), // seats
            Constraint::Min(6),    // chat
            Constraint::Length(5), // status/errors
            Constraint::Length(3), // input or help
        ])
        .split(f.area());

    draw_overview(f, chunks[0], screen.view.as_ref());
    draw_seats(f, chunks[1], screen.view.as_ref());
    draw_chat(f, chunks[2], screen);
    draw_status(f, chunks[3], screen);
    draw_footer(f, chunks[4], screen);
}

fn draw_overview(f: &mut Frame, area: Rect, view: Option<&TableView>) {
    let text = match view {
        Some(view) => format!(
            "{} | Round {} | Pot {} | Current bet {} | Turn {}",
            view.state,
            view.round.map_or("-".to_string(), |r| r.to_string()),
            view.pot,
            view.current_bet,
            view.turn.map_or("nobody".to_string(), |s| s.to_string()),
        ),
        None => "Waiting for the dealer service...".to_string(),
    };
    let widget = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Table"));
    f.render_widget(widget, area);
}

fn draw_seats(f: &mut Frame, area: Rect, view: Option<&TableView>) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let seats = view.map(|v| v.seats.as_slice()).unwrap_or_default();
    for (idx, column) in columns.iter().enumerate() {
        let lines = match seats.get(idx) {
            Some(seat) => seat_lines(seat, view.and_then(|v| v.turn) == Some(seat.seat)),
            None => vec![Line::from("-")],
        };
        let title = format!("Seat {}", idx + 1);
        let widget = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(widget, *column);
    }
}

fn seat_lines(seat: &SeatView, to_move: bool) -> Vec<Line<'static>> {
    let who = match (seat.address, seat.is_dealer) {
        (None, _) => "open".to_string(),
        (Some(_), true) => "Dealer".to_string(),
        (Some(address), false) => format!("{address:#x}"),
    };
    let marker = if to_move { " <- to move" } else { "" };
    let style = if to_move {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    vec![
        Line::styled(format!("{who}{marker}"), style),
        Line::from(format!("Bet: {}", seat.bet)),
        Line::from(format!("Dice: {}", render_dice(&seat.dice.values()))),
        Line::from(format!(
            "Hand: {} ({})",
            seat.hand.category, seat.hand.score
        )),
    ]
}

pub fn render_dice(values: &[u8]) -> String {
    values
        .iter()
        .map(|v| match v {
            0 => "?".to_string(),
            v => v.to_string(),
        })
        .join(" ")
}

fn draw_chat(f: &mut Frame, area: Rect, screen: &TableScreen) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines = screen
        .history
        .iter()
        .rev()
        .take(visible)
        .rev()
        .map(|turn| match turn.role {
            ChatRole::Human => Line::from(format!("You: {}", turn.content)),
            ChatRole::Ai => Line::styled(
                format!("Dealer: {}", turn.content),
                Style::default().fg(Color::Cyan),
            ),
        })
        .collect::<Vec<_>>();
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Table talk"));
    f.render_widget(widget, area);
}

fn draw_status(f: &mut Frame, area: Rect, screen: &TableScreen) {
    let widget = if screen.errors.is_empty() {
        let status = if screen.status.trim().is_empty() {
            "Ready"
        } else {
            screen.status.as_str()
        };
        Paragraph::new(status.to_string())
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .style(Style::default().fg(Color::Green))
    } else {
        let lines = screen
            .errors
            .iter()
            .map(|e| Line::from(e.clone()))
            .collect::<Vec<_>>();
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Errors"))
            .style(Style::default().fg(Color::Red))
    };
    f.render_widget(widget, area);
}

fn draw_footer(f: &mut Frame, area: Rect, screen: &TableScreen) {
    let widget = match &screen.input {
        Some(input) => Paragraph::new(format!("> {input}"))
            .block(Block::default().borders(Borders::ALL).title("Say (Enter send, Esc cancel)")),
        None => Paragraph::new("j seat the dealer | c chat | r refresh | q/Esc quit")
            .block(Block::default().borders(Borders::ALL).title("Help")),
    };
    f.render_widget(widget, area);
}
