//! The address bar, as seen by the listing.

/// Where the listing reads and writes its URL state.
pub trait Location {
    /// Current query string, without the leading `?`.
    fn query(&self) -> String;

    /// Swap the current entry's query string in place: no new history entry,
    /// no scroll reset.
    fn replace_query(&mut self, query: &str);

    /// Push a new history entry for `path`.
    fn navigate(&mut self, path: &str);
}

/// A history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: String,
    pub query: String,
}

/// In-memory history, for tests and non-browser hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryLocation {
    entries: Vec<Entry>,
}

impl Default for MemoryLocation {
    fn default() -> Self {
        Self::new("/products", "")
    }
}

impl MemoryLocation {
    pub fn new(path: impl Into<String>, query: impl Into<String>) -> Self {
        let query: String = query.into();
        Self {
            entries: vec![Entry {
                path: path.into(),
                query: query.trim_start_matches('?').to_string(),
            }],
        }
    }

    pub fn current(&self) -> &Entry {
        // `entries` always holds the initial entry
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

impl Location for MemoryLocation {
    fn query(&self) -> String {
        self.current().query.clone()
    }

    fn replace_query(&mut self, query: &str) {
        if let Some(entry) = self.entries.last_mut() {
            entry.query = query.to_string();
        }
    }

    fn navigate(&mut self, path: &str) {
        let (path, query) = path.split_once('?').unwrap_or((path, ""));
        self.entries.push(Entry {
            path: path.to_string(),
            query: query.to_string(),
        });
    }
}
