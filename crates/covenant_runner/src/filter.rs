//! Target filters.

/// Decides which discovered targets are executed.
pub trait TestFilter: Send + Sync {
    /// Whether the test with the given name should be included.
    fn matches_test(&self, test_name: &str) -> bool;

    /// Whether the target type should be included.
    fn matches_target(&self, fully_qualified_name: &str) -> bool;
}

/// Wildcard filter backing the `--tests` option. `*` matches any run of
/// characters; matching is case-sensitive and anchored at both ends.
#[derive(Clone, Debug, Default)]
pub struct TestFilterConfig {
    pub pattern: Option<String>,
}

impl TestFilterConfig {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn pattern(pattern: &str) -> Self {
        Self {
            pattern: Some(pattern.to_owned()),
        }
    }

    fn matches(&self, candidate: &str) -> bool {
        match &self.pattern {
            None => true,
            Some(pattern) => wildcard_match(pattern, candidate),
        }
    }
}

impl TestFilter for TestFilterConfig {
    fn matches_test(&self, test_name: &str) -> bool {
        self.matches(test_name)
    }

    fn matches_target(&self, fully_qualified_name: &str) -> bool {
        self.matches(fully_qualified_name)
    }
}

fn wildcard_match(pattern: &str, candidate: &str) -> bool {
    let segments: Vec<&str> = pattern.split('*').collect();
    if segments.len() == 1 {
        return pattern == candidate;
    }
    let mut remainder = candidate;
    let last = segments.len() - 1;
    for (index, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        match index {
            0 => {
                let Some(rest) = remainder.strip_prefix(segment) else {
                    return false;
                };
                remainder = rest;
            }
            _ if index == last => {
                let Some(found) = remainder.rfind(segment) else {
                    return false;
                };
                return found + segment.len() == remainder.len();
            }
            _ => {
                let Some(found) = remainder.find(segment) else {
                    return false;
                };
                remainder = &remainder[found + segment.len()..];
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_wildcard_patterns() {
        assert!(wildcard_match("demo.Adder", "demo.Adder"));
        assert!(!wildcard_match("demo.Adder", "demo.Adders"));
        assert!(wildcard_match("demo.*", "demo.Adder"));
        assert!(wildcard_match("*Adder", "demo.Adder"));
        assert!(wildcard_match("demo.*er", "demo.Adder"));
        assert!(wildcard_match("*", "anything"));
        assert!(!wildcard_match("demo.*er", "demo.Index"));
    }

    #[test]
    fn absent_pattern_admits_everything() {
        let filter = TestFilterConfig::all();
        assert!(filter.matches_target("demo.Anything"));
        let narrowed = TestFilterConfig::pattern("demo.Ad*");
        assert!(narrowed.matches_target("demo.Adder"));
        assert!(!narrowed.matches_target("demo.Index"));
    }
}
