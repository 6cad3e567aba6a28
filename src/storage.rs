//! In-memory message catalog.
//!
//! Provides an immutable, ordered set of messages with:
//! - 1-based lookup by message number
//! - Uniform random selection with a caller-supplied RNG
//! - Loading from a line-oriented text source
//!
//! The catalog is built once at startup and shared read-only between all
//! sessions, so it needs no locking.

use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info};

use crate::error::LoadError;

/// Immutable ordered message catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageStore {
    messages: Vec<String>,
}

impl MessageStore {
    /// Create a store from already loaded messages
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }

    /// Load the message source at `path` and wrap it for sharing
    pub fn load(path: impl AsRef<Path>) -> Result<Arc<Self>, LoadError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| LoadError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let store = Self::parse(&contents)?;
        info!(
            path = %path.display(),
            total = store.total(),
            "Loaded message catalog"
        );
        Ok(Arc::new(store))
    }

    /// Parse the line-oriented source format.
    ///
    /// The first line holds the message count `N`; the next `N` lines are the
    /// messages, in order. Anything after them is ignored.
    pub fn parse(source: &str) -> Result<Self, LoadError> {
        let mut lines = source.lines();

        let count_line = lines.next().ok_or(LoadError::MissingCount)?;
        let declared: usize = count_line
            .trim()
            .parse()
            .map_err(|_| LoadError::InvalidCount(count_line.trim().to_string()))?;

        let messages: Vec<String> = lines.take(declared).map(str::to_string).collect();
        if messages.len() < declared {
            return Err(LoadError::Truncated {
                declared,
                found: messages.len(),
            });
        }

        debug!(declared, "Parsed message source");
        Ok(Self::new(messages))
    }

    /// Number of messages in the catalog
    pub fn total(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Message number `index`, counting from 1.
    ///
    /// Returns `None` outside `1..=total()`; validating the number is the
    /// caller's job.
    pub fn by_index(&self, index: usize) -> Option<&str> {
        let position = index.checked_sub(1)?;
        self.messages.get(position).map(String::as_str)
    }

    /// A message chosen uniformly at random, or `None` if the catalog is empty
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        if self.messages.is_empty() {
            return None;
        }
        let position = rng.gen_range(0..self.messages.len());
        Some(self.messages[position].as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::io::Write;

    fn sample() -> MessageStore {
        MessageStore::parse("3\nHello\nWorld\nFoo\n").unwrap()
    }

    #[test]
    fn test_parse() {
        let store = sample();
        assert_eq!(store.total(), 3);
        assert_eq!(store.by_index(1), Some("Hello"));
        assert_eq!(store.by_index(2), Some("World"));
        assert_eq!(store.by_index(3), Some("Foo"));
    }

    #[test]
    fn test_by_index_out_of_range() {
        let store = sample();
        assert_eq!(store.by_index(0), None);
        assert_eq!(store.by_index(4), None);
    }

    #[test]
    fn test_messages_kept_verbatim() {
        let store = MessageStore::parse("2\n  leading and trailing  \n\n").unwrap();
        assert_eq!(store.by_index(1), Some("  leading and trailing  "));
        assert_eq!(store.by_index(2), Some(""));
    }

    #[test]
    fn test_crlf_source() {
        let store = MessageStore::parse("2\r\nfirst\r\nsecond\r\n").unwrap();
        assert_eq!(store.total(), 2);
        assert_eq!(store.by_index(2), Some("second"));
    }

    #[test]
    fn test_extra_lines_ignored() {
        let store = MessageStore::parse("1\nonly\nignored\n").unwrap();
        assert_eq!(store.total(), 1);
        assert_eq!(store.by_index(1), Some("only"));
    }

    #[test]
    fn test_empty_catalog() {
        let store = MessageStore::parse("0\n").unwrap();
        assert!(store.is_empty());

        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(store.random(&mut rng), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            MessageStore::parse(""),
            Err(LoadError::MissingCount)
        ));
        assert!(matches!(
            MessageStore::parse("three\na\nb\nc\n"),
            Err(LoadError::InvalidCount(ref s)) if s == "three"
        ));
        assert!(matches!(
            MessageStore::parse("-1\n"),
            Err(LoadError::InvalidCount(_))
        ));
        assert!(matches!(
            MessageStore::parse("3\na\nb\n"),
            Err(LoadError::Truncated {
                declared: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn test_random_covers_all_messages() {
        let store = sample();
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = HashSet::new();

        for _ in 0..1000 {
            let message = store.random(&mut rng).unwrap();
            seen.insert(message.to_string());
        }

        let expected: HashSet<String> = ["Hello", "World", "Foo"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "2\nalpha\nbeta\n").unwrap();

        let store = MessageStore::load(file.path()).unwrap();
        assert_eq!(store.total(), 2);
        assert_eq!(store.by_index(1), Some("alpha"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = MessageStore::load(dir.path().join("absent.txt"));
        assert!(matches!(result, Err(LoadError::FileRead { .. })));
    }
}
