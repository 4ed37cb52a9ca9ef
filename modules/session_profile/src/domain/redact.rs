//! Log-safe renderings of personal data and credentials.

/// `ana@x.com` → `a***@x.com`. Input without `@` is fully masked.
pub fn email(raw: &str) -> String {
    match raw.trim().split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}

/// Keeps the first four characters of a bearer token.
pub fn token(raw: &str) -> String {
    let head: String = raw.chars().take(4).collect();
    format!("{head}***")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_keeps_first_letter_and_domain() {
        assert_eq!(email("ana@x.com"), "a***@x.com");
        assert_eq!(email("  Bob@Example.org "), "B***@Example.org");
        assert_eq!(email("@x.com"), "***@x.com");
        assert_eq!(email("not-an-email"), "***");
    }

    #[test]
    fn token_shows_only_a_prefix() {
        assert_eq!(token("abcdefghijkl"), "abcd***");
        assert_eq!(token("ab"), "ab***");
    }
}
