use std::fmt;

use serde::{Deserialize, Serialize};

/// Listing price as entered by the seller, e.g. `"120"` or `"49.99"`.
///
/// Kept as text: digits with at most one `.` separator. Only validated on
/// entry through [`Price::parse`]; stored values are taken as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    Empty,
    InvalidCharacter(char),
    MultipleSeparators,
    NoDigits,
}

impl fmt::Display for PriceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "price is empty"),
            Self::InvalidCharacter(c) => write!(f, "price contains invalid character '{c}'"),
            Self::MultipleSeparators => write!(f, "price has more than one decimal separator"),
            Self::NoDigits => write!(f, "price has no digits"),
        }
    }
}

impl std::error::Error for PriceError {}

impl Price {
    /// Validate seller input.
    pub fn parse(text: &str) -> Result<Self, PriceError> {
        if text.is_empty() {
            return Err(PriceError::Empty);
        }
        let mut separators = 0;
        let mut digits = 0;
        for c in text.chars() {
            match c {
                '0'..='9' => digits += 1,
                '.' => separators += 1,
                other => return Err(PriceError::InvalidCharacter(other)),
            }
        }
        if separators > 1 {
            return Err(PriceError::MultipleSeparators);
        }
        if digits == 0 {
            return Err(PriceError::NoDigits);
        }
        Ok(Self(text.to_string()))
    }

    /// Strip everything but digits and `.` from raw keyboard input.
    ///
    /// The result still has to go through [`Price::parse`].
    pub fn sanitize(raw: &str) -> String {
        raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}
