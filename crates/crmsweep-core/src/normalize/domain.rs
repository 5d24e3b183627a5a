pub fn normalize_domain(value: &str) -> String {
    let mut rest = value.trim().to_ascii_lowercase();

    for scheme in ["https://", "http://"] {
        if let Some(stripped) = rest.strip_prefix(scheme) {
            rest = stripped.to_string();
            break;
        }
    }
    if let Some(stripped) = rest.strip_prefix("www.") {
        rest = stripped.to_string();
    }
    if let Some(cut) = rest.find(['/', '?', '#']) {
        rest.truncate(cut);
    }
    rest.trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::normalize_domain;

    #[test]
    fn strips_scheme_www_and_path() {
        assert_eq!(normalize_domain("https://www.acme.com/about"), "acme.com");
        assert_eq!(normalize_domain("http://acme.com/path"), "acme.com");
        assert_eq!(normalize_domain("www.acme.com"), "acme.com");
    }

    #[test]
    fn strips_query_fragment_and_trailing_dots() {
        assert_eq!(normalize_domain("acme.com?utm=1"), "acme.com");
        assert_eq!(normalize_domain("acme.com#team"), "acme.com");
        assert_eq!(normalize_domain("ACME.COM."), "acme.com");
    }

    #[test]
    fn is_idempotent() {
        let once = normalize_domain("HTTPS://WWW.Acme.Com/x?y#z");
        assert_eq!(normalize_domain(&once), once);
        assert_eq!(once, "acme.com");
    }

    #[test]
    fn empty_input() {
        assert_eq!(normalize_domain("  "), "");
    }
}
