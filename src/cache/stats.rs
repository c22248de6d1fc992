//! Update statistics

use std::fmt;

/// How one artifact compares to the cache it replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Created,
    Updated,
    Unchanged,
}

impl Change {
    /// Compare a new artifact with the previous one at the same path, if any.
    pub fn classify(prior: Option<&[u8]>, new: &[u8]) -> Self {
        match prior {
            None => Self::Created,
            Some(prior) if prior == new => Self::Unchanged,
            Some(_) => Self::Updated,
        }
    }
}

/// Counts of created, updated and unchanged artifacts across an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl UpdateStats {
    pub fn record(&mut self, change: Change) {
        match change {
            Change::Created => self.created += 1,
            Change::Updated => self.updated += 1,
            Change::Unchanged => self.unchanged += 1,
        }
    }

    /// Total artifacts written.
    pub fn total(&self) -> usize {
        self.created + self.updated + self.unchanged
    }
}

impl fmt::Display for UpdateStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} unchanged",
            self.created, self.updated, self.unchanged
        )
    }
}
