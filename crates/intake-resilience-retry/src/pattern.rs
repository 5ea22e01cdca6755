use regex::Regex;
use std::fmt;

/// One entry of the retryable-error filter.
///
/// Errors are matched by their `Display` text.
#[derive(Clone)]
pub enum RetryablePattern {
    /// Retry when the message contains this substring.
    Literal(String),
    /// Retry when the message matches this expression anywhere.
    Regex(Regex),
}

impl RetryablePattern {
    /// A substring pattern.
    pub fn literal(text: impl Into<String>) -> Self {
        RetryablePattern::Literal(text.into())
    }

    /// A regular expression pattern.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(RetryablePattern::Regex)
    }

    /// Returns true if `message` is covered by this pattern.
    pub fn matches(&self, message: &str) -> bool {
        match self {
            RetryablePattern::Literal(text) => message.contains(text.as_str()),
            RetryablePattern::Regex(re) => re.is_match(message),
        }
    }
}

impl fmt::Debug for RetryablePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryablePattern::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            RetryablePattern::Regex(re) => f.debug_tuple("Regex").field(&re.as_str()).finish(),
        }
    }
}

impl PartialEq for RetryablePattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RetryablePattern::Literal(a), RetryablePattern::Literal(b)) => a == b,
            (RetryablePattern::Regex(a), RetryablePattern::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl From<&str> for RetryablePattern {
    fn from(text: &str) -> Self {
        RetryablePattern::literal(text)
    }
}

impl From<String> for RetryablePattern {
    fn from(text: String) -> Self {
        RetryablePattern::Literal(text)
    }
}

impl From<Regex> for RetryablePattern {
    fn from(re: Regex) -> Self {
        RetryablePattern::Regex(re)
    }
}
