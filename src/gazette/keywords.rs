//! Case-insensitive keyword matching

/// Fixed, ordered set of target phrases.
///
/// Phrases are lower-cased once at construction. Order only decides which
/// phrase is reported when several would match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
    normalized: Vec<String>,
}

impl KeywordSet {
    /// Build a keyword set, keeping the given order
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords: Vec<String> = keywords.into_iter().map(Into::into).collect();
        let normalized = keywords.iter().map(|k| k.to_lowercase()).collect();
        Self {
            keywords,
            normalized,
        }
    }

    /// First keyword contained in `text`, ignoring case
    pub fn find_in(&self, text: &str) -> Option<&str> {
        let haystack = text.to_lowercase();
        self.find_in_normalized(&haystack)
    }

    /// Same as [`find_in`](Self::find_in) for text that is already lower-cased
    pub fn find_in_normalized(&self, haystack: &str) -> Option<&str> {
        self.normalized
            .iter()
            .position(|needle| haystack.contains(needle.as_str()))
            .map(|i| self.keywords[i].as_str())
    }

    /// Whether any keyword occurs in `text`
    pub fn matches(&self, text: &str) -> bool {
        self.find_in(text).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}
