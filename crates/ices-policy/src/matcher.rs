use globset::GlobBuilder;

/// Case-insensitive glob match. A pattern with no glob metacharacter
/// (`*`/`?`/`[`) is still routed through here — `globset` treats a
/// literal pattern as matching only itself, so an exact string "falls
/// out" of the same compiled matcher rather than needing a separate path.
pub fn glob_matches(pattern: &str, candidate: &str) -> bool {
    match GlobBuilder::new(pattern).case_insensitive(true).build() {
        Ok(glob) => glob.compile_matcher().is_match(candidate),
        Err(err) => {
            tracing::warn!(pattern, error = %err, "invalid glob pattern, falling back to exact match");
            pattern.eq_ignore_ascii_case(candidate)
        }
    }
}

#[must_use]
pub fn tenant_matches(pattern: &str, tenant_id: &str, tenant_alias: Option<&str>) -> bool {
    if pattern == "*" {
        return true;
    }
    pattern.eq_ignore_ascii_case(tenant_id) || tenant_alias.is_some_and(|alias| pattern.eq_ignore_ascii_case(alias))
}

#[must_use]
pub fn any_pattern_matches(patterns: &[String], candidate: &str) -> bool {
    patterns.iter().any(|p| p == "*" || glob_matches(p, candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_everything() {
        assert!(glob_matches("*", "anything@example.com"));
    }

    #[test]
    fn exact_pattern_without_metacharacters_is_case_insensitive_exact_match() {
        assert!(glob_matches("CEO@Corp.com", "ceo@corp.com"));
        assert!(!glob_matches("ceo@corp.com", "cfo@corp.com"));
    }

    #[test]
    fn glob_pattern_matches_suffix() {
        assert!(glob_matches("*@*.xyz", "new-ceo@vendor.xyz"));
        assert!(!glob_matches("*@*.xyz", "new-ceo@vendor.com"));
    }

    #[test]
    fn any_pattern_matches_checks_every_candidate_pattern() {
        let patterns = vec!["alice@corp.com".to_string(), "*@partners.com".to_string()];
        assert!(any_pattern_matches(&patterns, "bob@partners.com"));
        assert!(!any_pattern_matches(&patterns, "mallory@evil.com"));
    }
}
