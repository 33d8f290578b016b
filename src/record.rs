//! Log record types
//!
//! A [`LogRecord`] is one parsed event line. It lives only between the
//! parser and the batch writer; rows read back from the store are
//! [`crate::query::LogRow`].

use std::fmt;

/// Interaction codes as written by the game server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interaction {
    /// Block broken (`b`)
    Break,
    /// Block placed (`p`)
    Place,
    /// Container opened (`o`)
    Open,
}

impl Interaction {
    /// Single-character code stored in the `interaction` column
    pub fn code(&self) -> char {
        match self {
            Interaction::Break => 'b',
            Interaction::Place => 'p',
            Interaction::Open => 'o',
        }
    }
}

/// One ingested event
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogRecord {
    pub x: i64,
    pub y: i64,
    pub z: i64,

    /// Interaction kind code (single word character)
    pub interaction: char,

    /// Actor name as logged
    pub username: String,

    /// Subject identifier with any `namespace:` prefix removed
    pub block: String,

    /// UNIX seconds
    pub unix_time: i64,
}

impl LogRecord {
    /// Case-folded actor name used for case-insensitive lookup
    pub fn lower_username(&self) -> String {
        self.username.to_lowercase()
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} '{}' {} at {} {} {}",
            self.unix_time, self.username, self.interaction, self.block, self.x, self.y, self.z
        )
    }
}

/// Strip an optional `namespace:` prefix from a subject identifier
pub fn strip_namespace(subject: &str) -> &str {
    match subject.split_once(':') {
        Some((_, name)) => name,
        None => subject,
    }
}
