/// Log of submitted command lines with an up/down recall cursor.
///
/// The cursor ranges over `0..=len()`, where `len()` stands for the fresh, empty input
/// line. Only [`HistoryStore::record`] changes the stored entries.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    entries: Vec<String>,
    cursor: usize,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a submitted line and reset the cursor to the fresh line.
    ///
    /// A line equal to the most recent entry is not stored again; older duplicates do not
    /// matter.
    pub fn record(&mut self, line: &str) {
        if self.entries.last().map(String::as_str) != Some(line) {
            self.entries.push(line.to_string());
        }
        self.cursor = self.entries.len();
    }

    /// Step back to the previous entry.
    ///
    /// Returns `None` when already at the oldest entry, meaning the caller keeps its
    /// current buffer.
    pub fn recall_previous(&mut self) -> Option<String> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor).cloned()
    }

    /// Step forward to the next entry.
    ///
    /// Moving past the newest entry yields an empty string once (back to the fresh line);
    /// after that, `None` until the cursor moves back again.
    pub fn recall_next(&mut self) -> Option<String> {
        let len = self.entries.len();
        if self.cursor >= len {
            return None;
        }
        self.cursor += 1;
        if self.cursor == len {
            Some(String::new())
        } else {
            self.entries.get(self.cursor).cloned()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Stored entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}
