//! Keyword filter.
//!
//! A post is interesting when every configured keyword occurs somewhere in
//! its text, ignoring case.  The keyword set comes from configuration and
//! never changes during a run.

/// Returns `true` iff every keyword is a case-insensitive substring of
/// `content`.  An empty keyword set matches everything, including empty
/// content.
pub fn matches<S: AsRef<str>>(content: &str, keywords: &[S]) -> bool {
    let haystack = content.to_lowercase();
    keywords
        .iter()
        .all(|k| haystack.contains(&k.as_ref().to_lowercase()))
}

/// A keyword set with the keywords lower-cased once up front.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().to_lowercase())
            .collect();
        keywords.sort();
        keywords.dedup();
        Self { keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn matches(&self, content: &str) -> bool {
        matches(content, &self.keywords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_keywords_required() {
        assert!(matches("Day 5 of ML grind", &["Day", "ML"]));
        assert!(!matches("Day 5 of coding", &["Day", "ML"]));
    }

    #[test]
    fn case_insensitive() {
        assert!(matches("daily ml grind", &["DAILY", "ML"]));
        let filter = KeywordFilter::new(["DAILY", "ml"]);
        assert!(filter.matches("Daily ML grind"));
    }

    #[test]
    fn empty_content_only_matches_empty_set() {
        let none: [&str; 0] = [];
        assert!(matches("", &none));
        assert!(!matches("", &["Day"]));
    }

    #[test]
    fn duplicate_keywords_collapse() {
        let filter = KeywordFilter::new(["ML", "ml", "Day"]);
        assert_eq!(filter.keywords(), &["day".to_string(), "ml".to_string()]);
    }
}
