//! Annotation extraction from free-text model replies

use super::prompt::ANNOTATION_MARKER;

/// Pull the candidate annotation out of a model reply
///
/// Looks, in order, for the last `Annotation:` line, the last fenced code
/// block, and the last line starting with `(`. Returns `None` when the reply
/// has no candidate.
pub fn extract_annotation(reply: &str) -> Option<String> {
    marker_line(reply)
        .or_else(|| last_code_block(reply))
        .or_else(|| last_group_line(reply))
        .map(|text| clean(&text))
        .filter(|text| !text.is_empty())
}

fn marker_line(reply: &str) -> Option<String> {
    reply.lines().rev().find_map(|line| {
        let line = line.trim().trim_start_matches(&['*', '#', ' '][..]);
        line.strip_prefix(ANNOTATION_MARKER)
            .map(|rest| rest.trim_start_matches(&['*', ' '][..]).trim())
            .filter(|rest| !rest.is_empty())
            .map(str::to_string)
    })
}

fn last_code_block(reply: &str) -> Option<String> {
    let mut blocks = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in reply.lines() {
        if line.trim_start().starts_with("```") {
            match current.take() {
                Some(body) => blocks.push(body.join(" ")),
                None => current = Some(Vec::new()),
            }
        } else if let Some(body) = current.as_mut() {
            body.push(line.trim());
        }
    }

    blocks.into_iter().rev().find(|b| !b.trim().is_empty())
}

fn last_group_line(reply: &str) -> Option<String> {
    reply
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with('('))
        .map(str::to_string)
}

fn clean(text: &str) -> String {
    text.trim().trim_matches('`').trim().to_string()
}
