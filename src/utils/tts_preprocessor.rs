use regex::Regex;
use std::sync::OnceLock;

fn punctuation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[!?،,;:#@_*=+\-/\\^$]").unwrap())
}

fn quotes_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"["'«»“”‘’]"#).unwrap())
}

fn bracketed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(.*?\)|\[.*?\]|\{.*?\}|<.*?>").unwrap())
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Filter story text before speech synthesis.
///
/// Symbols that the voice would read out or stumble over become spaces, `%`
/// and `&` are spelled out in Arabic, quotes and bracketed asides are dropped,
/// and every full stop is followed by a single space.
pub fn clean_text_for_tts(text: &str) -> String {
    let result = punctuation_re().replace_all(text, " ");
    let result = result.replace('%', " بالمئة ").replace('&', " و ");
    let result = quotes_re().replace_all(&result, " ");
    let result = bracketed_re().replace_all(&result, " ");
    let result = result.replace('.', ". ");
    let result = whitespace_re().replace_all(&result, " ");
    result.trim().to_string()
}
