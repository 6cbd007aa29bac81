use std::fmt;
use std::num::ParseIntError;

use thiserror::Error;

/// `class.subject.detail` triple sent alongside the basic reply code.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnhancedCode(pub u16, pub u16, pub u16);

impl EnhancedCode {
    pub const fn new(class: u16, subject: u16, detail: u16) -> Self {
        Self(class, subject, detail)
    }

    pub const fn class(&self) -> u16 {
        self.0
    }

    pub const fn subject(&self) -> u16 {
        self.1
    }

    pub const fn detail(&self) -> u16 {
        self.2
    }

    /// `true` for class 4 (persistent transient failure).
    pub const fn is_transient(&self) -> bool {
        self.0 == 4
    }
}

impl fmt::Display for EnhancedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

impl std::str::FromStr for EnhancedCode {
    type Err = EnhancedCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_enhanced_code(s)
    }
}

/// Malformed enhanced code string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnhancedCodeError {
    #[error("wrong amount of enhanced code parts in {value:?}, expected 3")]
    PartCount { value: String },
    #[error("enhanced code part {part:?} is not a non-negative integer: {source}")]
    Part {
        part: String,
        #[source]
        source: ParseIntError,
    },
}

/// Parses `"5.7.1"` into `EnhancedCode(5, 7, 1)`.
///
/// Only the shape is checked here; the class digit is validated by the
/// directive parser.
pub fn parse_enhanced_code(s: &str) -> Result<EnhancedCode, EnhancedCodeError> {
    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() != 3 {
        return Err(EnhancedCodeError::PartCount {
            value: s.to_string(),
        });
    }

    let mut nums = [0u16; 3];
    for (slot, part) in nums.iter_mut().zip(parts) {
        *slot = part.parse().map_err(|source| EnhancedCodeError::Part {
            part: part.to_string(),
            source,
        })?;
    }
    Ok(EnhancedCode(nums[0], nums[1], nums[2]))
}
