use unicode_width::UnicodeWidthChar;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Editable text with a character-based cursor.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    /// Replace the content and move the cursor to the end.
    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.cursor = self.value.chars().count();
    }

    /// Take the content, leaving the input empty.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.value)
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, text: &str) {
        let byte_pos = char_to_byte_index(&self.value, self.cursor);
        self.value.insert_str(byte_pos, text);
        self.cursor += text.chars().count();
    }

    pub fn newline(&mut self) {
        self.insert_char('\n');
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        let char_count = self.value.chars().count();
        if self.cursor < char_count {
            let byte_pos = char_to_byte_index(&self.value, self.cursor);
            self.value.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        let char_count = self.value.chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    /// Zero-based (line, column) of the cursor. The column is in terminal
    /// cells, so wide characters count twice.
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let mut line = 0;
        let mut col = 0;
        for c in self.value.chars().take(self.cursor) {
            if c == '\n' {
                line += 1;
                col = 0;
            } else {
                col += c.width().unwrap_or(0);
            }
        }
        (line, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_respect_multibyte_chars() {
        let mut input = TextInput::new();
        input.insert_str("Drle");
        input.left();
        input.left();
        input.insert_char('ô');
        assert_eq!(input.value(), "Drôle");
        input.backspace();
        assert_eq!(input.value(), "Drle");
        input.home();
        input.delete();
        assert_eq!(input.value(), "rle");
        input.end();
        input.right();
        assert_eq!(input.cursor(), 3);
    }

    #[test]
    fn take_empties_and_resets_cursor() {
        let mut input = TextInput::new();
        input.set("bonjour");
        assert_eq!(input.take(), "bonjour");
        assert_eq!(input.value(), "");
        assert_eq!(input.cursor(), 0);
    }

    #[test]
    fn blank_detection_ignores_whitespace() {
        let mut input = TextInput::new();
        assert!(input.is_blank());
        input.set(" \n\t ");
        assert!(input.is_blank());
        input.set(" x ");
        assert!(!input.is_blank());
    }

    #[test]
    fn cursor_position_tracks_lines() {
        let mut input = TextInput::new();
        input.insert_str("Nom,Age");
        input.newline();
        input.insert_str("Alice");
        assert_eq!(input.cursor_line_col(), (1, 5));
        input.home();
        assert_eq!(input.cursor_line_col(), (0, 0));
    }

    #[test]
    fn cursor_column_counts_wide_chars_as_two_cells() {
        let mut input = TextInput::new();
        input.insert_str("a\n日本語");
        assert_eq!(input.cursor_line_col(), (1, 6));
        input.left();
        assert_eq!(input.cursor_line_col(), (1, 4));
    }
}
