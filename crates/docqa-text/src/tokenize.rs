/// Whitespace tokenization used by the lexical index. Case is preserved.
pub fn whitespace_tokens(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}
