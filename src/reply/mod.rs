//! SMTP reply model: enhanced status codes (RFC 3463) and the structured
//! [`SmtpError`] carried by failing checks.

mod code;
mod error;

pub use code::{EnhancedCode, EnhancedCodeError, parse_enhanced_code};
pub use error::SmtpError;
