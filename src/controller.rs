use std::time::Duration;
use tracing::trace;

use crate::domain::{GridConfig, GridError, Message};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &GridConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, GridError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    self.handle_key(key, model.raw_keyevents())
                }
                Event::Resize(width, height) => {
                    Some(Message::Resize(width as usize, height as usize))
                }
                _ => None,
            });
        }
        Ok(None)
    }

    fn handle_key(&self, key: KeyEvent, raw: bool) -> Option<Message> {
        if raw && key != KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL) {
            return Some(Message::RawKey(key));
        }
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Down, _) | (KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::Up, _) | (KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Left, _) | (KeyCode::Char('h'), _) => Some(Message::MoveLeft),
            (KeyCode::Right, _) | (KeyCode::Char('l'), _) => Some(Message::MoveRight),
            (KeyCode::Home, _) | (KeyCode::Char('g'), _) => Some(Message::MoveBeginning),
            (KeyCode::End, _) | (KeyCode::Char('G'), _) => Some(Message::MoveEnd),
            (KeyCode::Char('s'), _) => Some(Message::HeaderClick),
            (KeyCode::Char('a'), _) => Some(Message::SortAscending),
            (KeyCode::Char('d'), _) => Some(Message::SortDescending),
            (KeyCode::Char('c'), _) => Some(Message::ClearSort),
            (KeyCode::Char('+'), _) | (KeyCode::Char('>'), _) => Some(Message::Widen),
            (KeyCode::Char('-'), _) | (KeyCode::Char('<'), _) => Some(Message::Narrow),
            (KeyCode::Char('r'), _) => Some(Message::BeginResize),
            (KeyCode::Char('m'), _) => Some(Message::BeginMove),
            (KeyCode::Char('e'), _) | (KeyCode::F(2), _) => Some(Message::Edit),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Esc, _) => Some(Message::Exit),
            (KeyCode::Char('y'), _) => Some(Message::CopyCell),
            (KeyCode::Char('Y'), _) => Some(Message::CopyRow),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
