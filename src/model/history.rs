use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One event in a book's checkout history.
///
/// Stored as a flat object tagged by `action`:
/// `{"action": "checkout", "timestamp": .., "user_email": .., "due_date": ..}` or
/// `{"action": "checkin", "timestamp": .., "user_email": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum HistoryEntry {
    Checkout {
        timestamp: NaiveDateTime,
        user_email: Option<String>,
        due_date: Option<NaiveDate>,
    },
    Checkin {
        timestamp: NaiveDateTime,
        user_email: Option<String>,
    },
}

impl HistoryEntry {
    pub fn checkout(
        timestamp: NaiveDateTime,
        user_email: Option<String>,
        due_date: Option<NaiveDate>,
    ) -> Self {
        Self::Checkout {
            timestamp,
            user_email,
            due_date,
        }
    }

    pub fn checkin(timestamp: NaiveDateTime, user_email: Option<String>) -> Self {
        Self::Checkin {
            timestamp,
            user_email,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            HistoryEntry::Checkout { .. } => "checkout",
            HistoryEntry::Checkin { .. } => "checkin",
        }
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        match self {
            HistoryEntry::Checkout { timestamp, .. } | HistoryEntry::Checkin { timestamp, .. } => {
                *timestamp
            }
        }
    }

    pub fn user_email(&self) -> Option<&str> {
        match self {
            HistoryEntry::Checkout { user_email, .. } | HistoryEntry::Checkin { user_email, .. } => {
                user_email.as_deref()
            }
        }
    }

    pub fn is_checkout(&self) -> bool {
        matches!(self, HistoryEntry::Checkout { .. })
    }
}
