//! C9 — the pre-account-creation allowlist hook. Pure function: given the
//! configured domain/email lists and a candidate address, decide whether
//! signup is permitted.

pub const REJECTION_MESSAGE: &str =
    "Signup is restricted to invited users. Please contact an administrator.";

pub fn is_allowed(email: &str, allowed_domains: &[String], allowed_emails: &[String]) -> bool {
    let email_lower = email.to_ascii_lowercase();

    if allowed_emails.iter().any(|e| e.to_ascii_lowercase() == email_lower) {
        return true;
    }

    let Some((_, domain)) = email_lower.split_once('@') else {
        return false;
    };

    allowed_domains.iter().any(|configured| {
        let configured = configured.trim_start_matches('@').to_ascii_lowercase();
        configured == domain
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exact_address() {
        let domains = vec![];
        let emails = vec!["alice@example.com".to_string()];
        assert!(is_allowed("alice@example.com", &domains, &emails));
        assert!(!is_allowed("bob@example.com", &domains, &emails));
    }

    #[test]
    fn accepts_domain_suffix_with_or_without_leading_at() {
        let domains = vec!["@example.com".to_string(), "other.org".to_string()];
        let emails = vec![];
        assert!(is_allowed("anyone@example.com", &domains, &emails));
        assert!(is_allowed("anyone@other.org", &domains, &emails));
        assert!(!is_allowed("anyone@evil.com", &domains, &emails));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let domains = vec!["Example.COM".to_string()];
        assert!(is_allowed("Alice@EXAMPLE.com", &domains, &[]));
    }

    #[test]
    fn rejects_address_without_at_sign() {
        assert!(!is_allowed("not-an-email", &["example.com".to_string()], &[]));
    }
}
