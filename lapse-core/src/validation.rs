//! Domain name normalization for registry queries

use crate::error::{LapseError, Result};

/// Reduces a configured name to the ASCII form a registry expects.
///
/// Surrounding whitespace, a URL scheme, a path and the root dot are dropped;
/// every other label, `www` included, is kept. Unicode labels are converted to
/// punycode. Whether the name is actually registered is left to the registry.
pub fn normalize_domain(domain: &str) -> Result<String> {
    let trimmed = domain.trim();

    let host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .unwrap_or(trimmed);
    let host = host.split('/').next().unwrap_or(host);
    let host = host.strip_suffix('.').unwrap_or(host);

    let ascii = idna::domain_to_ascii(host)
        .map_err(|_| LapseError::InvalidDomain(trimmed.to_string()))?;

    if !ascii.contains('.') {
        return Err(LapseError::InvalidDomain(trimmed.to_string()));
    }

    let labels_ok = ascii.split('.').all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    if !labels_ok {
        return Err(LapseError::InvalidDomain(trimmed.to_string()));
    }

    Ok(ascii)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("example.com").unwrap(), "example.com");
        assert_eq!(normalize_domain("EXAMPLE.COM").unwrap(), "example.com");
        assert_eq!(
            normalize_domain("https://example.com/path").unwrap(),
            "example.com"
        );
        assert_eq!(normalize_domain("example.com.").unwrap(), "example.com");
        assert_eq!(normalize_domain("  sub.example.co.uk ").unwrap(), "sub.example.co.uk");
        assert_eq!(normalize_domain("xn--bcher-kva.de").unwrap(), "xn--bcher-kva.de");
    }

    #[test]
    fn test_www_label_is_kept() {
        assert_eq!(normalize_domain("www.example.com").unwrap(), "www.example.com");
        assert_eq!(
            normalize_domain("https://WWW.Example.com/").unwrap(),
            "www.example.com"
        );
    }

    #[test]
    fn test_unicode_names_become_punycode() {
        assert_eq!(normalize_domain("münchen.de").unwrap(), "xn--mnchen-3ya.de");
        assert_eq!(normalize_domain("Bücher.de").unwrap(), "xn--bcher-kva.de");
    }

    #[test]
    fn test_normalize_domain_rejects_malformed() {
        assert!(normalize_domain("").is_err());
        assert!(normalize_domain("nodots").is_err());
        assert!(normalize_domain("example..com").is_err());
        assert!(normalize_domain(".example.com").is_err());
        assert!(normalize_domain("-example.com").is_err());
        assert!(normalize_domain("example-.com").is_err());
        assert!(normalize_domain("exa mple.com").is_err());
    }
}
