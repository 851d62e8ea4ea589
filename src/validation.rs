use regex::Regex;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("name is empty")]
    Empty,
    #[error("label too long (max 63 characters)")]
    TooLong,
    #[error("name contains invalid characters (only a-z, 0-9, and '-' allowed)")]
    InvalidCharacters,
    #[error("label must not start or end with '-'")]
    LeadingOrTrailingHyphen,
    #[error("unsupported record type '{0}'")]
    UnsupportedRecordType(String),
    #[error("ttl must be between 1 and 604800")]
    TtlOutOfRange,
}

const SUPPORTED_RECORD_TYPES: &[&str] = &[
    "A", "AAAA", "CNAME", "MX", "NS", "PTR", "SRV", "TXT", "CAA",
];

lazy_static::lazy_static! {
    /// Only lowercase letters, digits and '-'
    static ref LABEL_RE: Regex = Regex::new(r"^[a-z0-9-]+$").unwrap();
}

fn validate_label(label: &str) -> Result<(), ValidationError> {
    if label.is_empty() {
        return Err(ValidationError::Empty);
    }
    if label.len() > 63 {
        return Err(ValidationError::TooLong);
    }
    if !LABEL_RE.is_match(label) {
        return Err(ValidationError::InvalidCharacters);
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(ValidationError::LeadingOrTrailingHyphen);
    }
    Ok(())
}

/// A zone name is a dot-separated sequence of DNS labels, with or without a
/// trailing dot.
pub fn validate_zone_name(name: &str) -> Result<(), ValidationError> {
    let name = name.trim_end_matches('.');
    if name.is_empty() {
        return Err(ValidationError::Empty);
    }
    for label in name.split('.') {
        validate_label(label)?;
    }
    Ok(())
}

/// A record host is `@` for the apex, optionally a leading `*` wildcard,
/// otherwise plain labels.
pub fn validate_record_host(host: &str) -> Result<(), ValidationError> {
    if host == "@" {
        return Ok(());
    }
    let rest = host.strip_prefix("*.").unwrap_or(host);
    validate_zone_name(rest)
}

pub fn validate_record_type(rtype: &str) -> Result<(), ValidationError> {
    if SUPPORTED_RECORD_TYPES.contains(&rtype) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedRecordType(rtype.to_string()))
    }
}

pub fn validate_ttl(ttl: u32) -> Result<(), ValidationError> {
    if (1..=604_800).contains(&ttl) {
        Ok(())
    } else {
        Err(ValidationError::TtlOutOfRange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_names_accept_plain_and_dotted_forms() {
        assert!(validate_zone_name("home").is_ok());
        assert!(validate_zone_name("internal.example.com").is_ok());
        assert!(validate_zone_name("internal.example.com.").is_ok());
        assert!(validate_zone_name("").is_err());
        assert!(validate_zone_name("UPPER.case").is_err());
        assert!(validate_zone_name("bad-.label").is_err());
    }

    #[test]
    fn hosts_allow_apex_and_wildcards() {
        assert!(validate_record_host("@").is_ok());
        assert!(validate_record_host("*.media").is_ok());
        assert!(validate_record_host("example").is_ok());
        assert!(validate_record_host("*bad").is_err());
    }

    #[test]
    fn record_types_are_whitelisted() {
        assert!(validate_record_type("A").is_ok());
        assert!(validate_record_type("AAAA").is_ok());
        assert!(validate_record_type("SPF").is_err());
    }
}
