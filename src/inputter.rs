use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::trace;

/// What a key did to the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputResult {
    Editing,
    Confirmed,
    Canceled,
}

/// Single line text input with a cursor. The cursor counts chars, not bytes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Inputter {
    current_input: String,
    curser_pos: usize,
}

impl Inputter {
    pub fn new(s: &str) -> Self {
        let mut input = Inputter::default();
        input.set(s);
        input
    }

    pub fn read(&mut self, key: KeyEvent) -> InputResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => return InputResult::Confirmed,
            (KeyCode::Esc, _) => return InputResult::Canceled,
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.left(),
            (KeyCode::Right, _) => self.right(),
            (KeyCode::Home, _) => self.curser_pos = 0,
            (KeyCode::End, _) => self.curser_pos = self.char_count(),
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => self.clear(),
            (KeyCode::Char(chr), m) if !m.contains(KeyModifiers::CONTROL) => self.insert(chr),
            (code, modifiers) => trace!("Ignoring input key {:?} {:?}", code, modifiers),
        }
        InputResult::Editing
    }

    /// Replace the content and put the cursor at the end.
    pub fn set(&mut self, s: &str) {
        self.current_input = s.to_string();
        self.curser_pos = self.char_count();
    }

    pub fn text(&self) -> &str {
        &self.current_input
    }

    pub fn curser_pos(&self) -> usize {
        self.curser_pos
    }

    pub fn clear(&mut self) {
        self.current_input.clear();
        self.curser_pos = 0;
    }

    pub fn insert(&mut self, chr: char) {
        let pos = self.byte_pos(self.curser_pos);
        self.current_input.insert(pos, chr);
        self.curser_pos += 1;
    }

    fn backspace(&mut self) {
        if self.curser_pos > 0 {
            self.curser_pos -= 1;
            let pos = self.byte_pos(self.curser_pos);
            self.current_input.remove(pos);
        }
    }

    fn delete(&mut self) {
        if self.curser_pos < self.char_count() {
            let pos = self.byte_pos(self.curser_pos);
            self.current_input.remove(pos);
        }
    }

    fn left(&mut self) {
        self.curser_pos = self.curser_pos.saturating_sub(1);
    }

    fn right(&mut self) {
        if self.curser_pos < self.char_count() {
            self.curser_pos += 1;
        }
    }

    fn char_count(&self) -> usize {
        self.current_input.chars().count()
    }

    fn byte_pos(&self, char_pos: usize) -> usize {
        self.current_input
            .char_indices()
            .nth(char_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(input: &mut Inputter, s: &str) {
        for c in s.chars() {
            assert_eq!(input.read(key(KeyCode::Char(c))), InputResult::Editing);
        }
    }

    #[test]
    fn starts_with_cursor_at_end() {
        let input = Inputter::new("Tesla");
        assert_eq!(input.text(), "Tesla");
        assert_eq!(input.curser_pos(), 5);
    }

    #[test]
    fn backspace_deletes_before_cursor() {
        let mut input = Inputter::new("Fiat");
        input.read(key(KeyCode::Left));
        input.read(key(KeyCode::Backspace));
        assert_eq!(input.text(), "Fit");
        assert_eq!(input.curser_pos(), 2);
        input.read(key(KeyCode::Home));
        input.read(key(KeyCode::Backspace));
        assert_eq!(input.text(), "Fit");
        input.read(key(KeyCode::Delete));
        assert_eq!(input.text(), "it");
    }

    #[test]
    fn inserts_at_cursor_with_multibyte_chars() {
        let mut input = Inputter::new("Citron");
        input.read(key(KeyCode::Left));
        input.read(key(KeyCode::Left));
        type_str(&mut input, "ë");
        assert_eq!(input.text(), "Citrëon");
        input.read(key(KeyCode::End));
        type_str(&mut input, "!");
        assert_eq!(input.text(), "Citrëon!");
    }

    #[test]
    fn enter_and_escape_finish_input() {
        let mut input = Inputter::new("500");
        assert_eq!(input.read(key(KeyCode::Enter)), InputResult::Confirmed);
        assert_eq!(input.read(key(KeyCode::Esc)), InputResult::Canceled);
        assert_eq!(input.text(), "500");
    }

    #[test]
    fn ctrl_u_clears() {
        let mut input = Inputter::new("EQA");
        input.read(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert_eq!(input.text(), "");
        assert_eq!(input.curser_pos(), 0);
    }
}
