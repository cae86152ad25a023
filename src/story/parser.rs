use regex::Regex;
use std::sync::OnceLock;

use crate::models::StoryChoice;

const PARAGRAPH_LABEL: &str = "الفقرة:";
const CHOICES_LABEL: &str = "الخيارات:";
const TITLE_LABEL: &str = "العنوان:";
const MAX_FALLBACK_CHOICES: usize = 3;

/// A model reply split into its labelled sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub paragraph: String,
    pub choices: Option<Vec<StoryChoice>>,
    pub title: Option<String>,
}

fn paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)الفقرة:(.*?)(?:الخيارات:|العنوان:|$)").unwrap())
}

fn numbered_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+\.\s*").unwrap())
}

fn leading_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\s*").unwrap())
}

fn new_title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)العنوان الجديد:\s*([^\n]*)\n?").unwrap())
}

/// Text following `label`, up to the next of `stops` (or the end).
fn section_after<'a>(text: &'a str, label: &str, stops: &[&str]) -> Option<&'a str> {
    let start = text.find(label)? + label.len();
    let rest = &text[start..];
    let end = stops
        .iter()
        .filter_map(|stop| rest.find(stop))
        .min()
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Split a labelled reply into paragraph, choices and title.
///
/// Without a `الفقرة:` label the whole reply is the paragraph. Choices are the
/// `N. text` items after `الخيارات:`; when nothing is numbered, the first three
/// non-empty lines are used instead.
pub fn parse_reply(text: &str) -> ParsedReply {
    let paragraph = paragraph_re()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| text.trim().to_string());

    let choices = section_after(text, CHOICES_LABEL, &[TITLE_LABEL]).map(parse_choices);

    let title = section_after(text, TITLE_LABEL, &[])
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    ParsedReply { paragraph, choices, title }
}

fn parse_choices(section: &str) -> Vec<StoryChoice> {
    let section = section.trim();
    let markers: Vec<_> = numbered_item_re().find_iter(section).collect();

    let mut texts: Vec<String> = markers
        .iter()
        .enumerate()
        .map(|(i, marker)| {
            let end = markers.get(i + 1).map(|next| next.start()).unwrap_or(section.len());
            section[marker.end()..end].trim().to_string()
        })
        .filter(|text| !text.is_empty())
        .collect();

    if texts.is_empty() {
        texts = section
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(MAX_FALLBACK_CHOICES)
            .map(|line| leading_number_re().replace(line, "").trim().to_string())
            .collect();
    }

    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| StoryChoice { id: i as u32 + 1, text })
        .collect()
}

/// Strip a leading `العنوان:` label from a generated title.
pub fn clean_title(text: &str) -> String {
    text.trim().replace(TITLE_LABEL, "").trim().to_string()
}

/// Split an edited story into paragraphs, pulling out an
/// `العنوان الجديد: ...` line as the new title when present.
pub fn parse_edit_reply(text: &str) -> (Vec<String>, Option<String>) {
    let re = new_title_re();
    let new_title = re
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty());

    let body = re.replace_all(text, "");

    let paragraphs = body
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();

    (paragraphs, new_title)
}
