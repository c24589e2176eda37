//! Market Identifiers
//!
//! Validated value objects for the inputs of market data tools.

use std::fmt;

use chrono::NaiveDate;

/// Date format accepted for trading dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Longest ticker accepted, covering OCC option symbols with a prefix.
const MAX_SYMBOL_LEN: usize = 32;

// =============================================================================
// Symbol
// =============================================================================

/// An uppercased ticker symbol (`AAPL`, `BRK.B`, `X:BTCUSD`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol(String);

impl Symbol {
    /// Parse and normalize a symbol.
    ///
    /// Surrounding whitespace is trimmed and letters are uppercased. At least
    /// one character must be an ASCII letter or digit.
    pub fn parse(raw: &str) -> Result<Self, MarketValueError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MarketValueError::EmptySymbol);
        }
        if trimmed.len() > MAX_SYMBOL_LEN {
            return Err(MarketValueError::InvalidSymbol(trimmed.to_string()));
        }
        // A symbol of punctuation only would be read as a `.`/`..` path segment.
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '-' | '_'))
            || !trimmed.chars().any(|c| c.is_ascii_alphanumeric())
        {
            return Err(MarketValueError::InvalidSymbol(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Get the symbol text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Trading Date
// =============================================================================

/// A calendar date in `YYYY-MM-DD` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TradingDate(NaiveDate);

impl TradingDate {
    /// Parse a `YYYY-MM-DD` date.
    pub fn parse(raw: &str) -> Result<Self, MarketValueError> {
        let trimmed = raw.trim();
        // chrono accepts unpadded fields; upstream paths need the padded form.
        if trimmed.len() != 10 {
            return Err(MarketValueError::InvalidDate(trimmed.to_string()));
        }
        NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
            .map(Self)
            .map_err(|_| MarketValueError::InvalidDate(trimmed.to_string()))
    }
}

impl fmt::Display for TradingDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Invalid market identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarketValueError {
    /// Symbol was empty or whitespace.
    #[error("symbol cannot be empty")]
    EmptySymbol,
    /// Symbol contained unsupported characters or was too long.
    #[error("invalid symbol: {0:?}")]
    InvalidSymbol(String),
    /// Date was not a real `YYYY-MM-DD` date.
    #[error("invalid date {0:?}: expected YYYY-MM-DD")]
    InvalidDate(String),
}
