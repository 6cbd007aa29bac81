use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address {0:?}: missing at-sign")]
    MissingAt(String),
    #[error("address {0:?}: empty local-part")]
    EmptyLocalPart(String),
    #[error("address {address:?}: invalid domain: {reason}")]
    InvalidDomain { address: String, reason: String },
}

/// Splits a reverse-path into local part and domain at the last `@`.
///
/// `postmaster` without a domain is accepted and yields an empty domain.
pub(crate) fn split_address(addr: &str) -> Result<(&str, &str), AddressError> {
    if addr.eq_ignore_ascii_case("postmaster") {
        return Ok((addr, ""));
    }

    let Some((local, domain)) = addr.rsplit_once('@') else {
        return Err(AddressError::MissingAt(addr.to_string()));
    };
    if local.is_empty() {
        return Err(AddressError::EmptyLocalPart(addr.to_string()));
    }
    Ok((local, domain))
}

/// IDNA-normalizes the domain for lookup.
pub(crate) fn ascii_domain(addr: &str, domain: &str) -> Result<String, AddressError> {
    idna::domain_to_ascii(domain.trim()).map_err(|err| AddressError::InvalidDomain {
        address: addr.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_last_at() {
        assert_eq!(
            split_address("\"a@b\"@example.com").unwrap(),
            ("\"a@b\"", "example.com")
        );
    }

    #[test]
    fn postmaster_has_no_domain() {
        assert_eq!(split_address("Postmaster").unwrap(), ("Postmaster", ""));
    }

    #[test]
    fn empty_domain_is_not_a_parse_error() {
        assert_eq!(split_address("user@").unwrap(), ("user", ""));
    }

    #[test]
    fn rejects_missing_at_and_empty_local() {
        assert!(matches!(
            split_address("example.com"),
            Err(AddressError::MissingAt(_))
        ));
        assert!(matches!(
            split_address("@example.com"),
            Err(AddressError::EmptyLocalPart(_))
        ));
    }

    #[test]
    fn ascii_domain_converts_idn() {
        assert_eq!(
            ascii_domain("u@exämple.com", "exämple.com").unwrap(),
            "xn--exmple-cua.com"
        );
    }
}
