/// Masks an upstream key for logs and status output: `AIzaSy...x9Q2kL`.
///
/// Keys of 12 characters or fewer keep three characters on each side.
pub fn redact_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    let keep = if chars.len() <= 12 { 3 } else { 6 };
    if chars.len() <= keep {
        return format!("{}...", chars.iter().collect::<String>());
    }
    let head: String = chars[..keep].iter().collect();
    let tail: String = chars[chars.len() - keep..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::redact_key;

    #[test]
    fn long_keys_keep_six() {
        assert_eq!(
            redact_key("AIzaSyA1234567890abcdefXYZ"),
            "AIzaSy...defXYZ"
        );
    }

    #[test]
    fn short_keys_keep_three() {
        assert_eq!(redact_key("sk-123456"), "sk-...456");
        assert_eq!(redact_key("abcdefghijkl"), "abc...jkl");
    }

    #[test]
    fn tiny_and_empty() {
        assert_eq!(redact_key(""), "");
        assert_eq!(redact_key("ab"), "ab...");
    }
}
