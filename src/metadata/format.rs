/// Trims `input` and upper-cases the first letter, digit or underscore of
/// every whitespace-separated word. The rest of each word is left as is.
pub fn capitalize_words(input: &str) -> String {
    let mut formatted = String::with_capacity(input.len());
    let mut word_started = false;
    for c in input.trim().chars() {
        if c.is_whitespace() {
            word_started = false;
            formatted.push(c);
        } else if !word_started && (c.is_alphanumeric() || c == '_') {
            formatted.extend(c.to_uppercase());
            word_started = true;
        } else {
            formatted.push(c);
        }
    }
    formatted
}
