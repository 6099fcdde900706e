use anyhow::Result;
#[cfg(test)]
use mockall::automock;

/// Hands a telephone number to the host's native dialer. Fire-and-forget.
#[cfg_attr(test, automock)]
pub trait Dialer: Send + Sync {
    fn dial(&self, telephone_number: &str) -> Result<()>;
}

/// Builds a `tel:` URI, dropping the visual separators people put in numbers.
pub fn tel_uri(telephone_number: &str) -> String {
    let digits: String = telephone_number
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();
    format!("tel:{}", digits)
}
