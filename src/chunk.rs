//! Heading-boundary article splitter.
//!
//! Long blog articles are split into one section per markdown heading so
//! each stored document stays semantically coherent. Splitting happens on
//! structural boundaries only — never fixed character windows — so an
//! unchanged article always re-chunks into the same sections with the same
//! indices, and re-ingestion overwrites instead of duplicating.

/// One section of a split article. `heading` is the heading line's text
/// (without the leading `#`s); the preamble before the first heading has
/// no heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: Option<String>,
    pub text: String,
}

/// Split an article body into sections on markdown heading boundaries.
///
/// Articles at or under `max_chars` stay whole as a single section.
/// Always returns at least one section.
pub fn split_article(text: &str, max_chars: usize) -> Vec<Section> {
    let trimmed = text.trim();

    if trimmed.len() <= max_chars {
        return vec![Section {
            heading: None,
            text: trimmed.to_string(),
        }];
    }

    let mut sections: Vec<Section> = Vec::new();
    let mut current_heading: Option<String> = None;
    let mut current_buf = String::new();

    for line in trimmed.lines() {
        if let Some(heading) = heading_text(line) {
            flush_section(&mut sections, current_heading.take(), &mut current_buf);
            current_heading = Some(heading);
        }
        if !current_buf.is_empty() {
            current_buf.push('\n');
        }
        current_buf.push_str(line);
    }
    flush_section(&mut sections, current_heading, &mut current_buf);

    // Guarantee at least one section
    if sections.is_empty() {
        sections.push(Section {
            heading: None,
            text: trimmed.to_string(),
        });
    }

    sections
}

/// Returns the heading text for an ATX heading line (`# ...` through
/// `###### ...`), or `None` for any other line.
fn heading_text(line: &str) -> Option<String> {
    let stripped = line.trim_start();
    let hashes = stripped.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &stripped[hashes..];
    if !rest.starts_with(' ') && !rest.is_empty() {
        return None;
    }
    Some(rest.trim().to_string())
}

fn flush_section(sections: &mut Vec<Section>, heading: Option<String>, buf: &mut String) {
    let text = buf.trim();
    if !text.is_empty() {
        sections.push(Section {
            heading,
            text: text.to_string(),
        });
    }
    buf.clear();
}
