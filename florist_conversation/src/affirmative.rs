//! Yes/no detection for the order confirmation step.

/// Tokens that count as agreement when found anywhere in the reply.
pub const DEFAULT_AFFIRMATIVE_TOKENS: [&str; 3] = ["да", "подходит", "согласен"];

/// Case-insensitive substring heuristic over a fixed token set.
///
/// Matching is by substring, so "нет, не подходит" also counts as agreement.
#[derive(Debug, Clone)]
pub struct AffirmativeTokens {
    tokens: Vec<String>,
}

impl AffirmativeTokens {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.tokens.iter().any(|token| text.contains(token.as_str()))
    }
}

impl Default for AffirmativeTokens {
    fn default() -> Self {
        Self::new(DEFAULT_AFFIRMATIVE_TOKENS)
    }
}
