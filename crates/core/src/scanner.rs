//! Marker scanning.
//!
//! A marker is `#`, `##` or `>>` immediately followed by one or more code characters, and may be
//! followed by a single `:`. A prefix glued to a preceding word character (`C#5`, `a>>b`) is
//! ordinary text. The captured value runs from just after the marker to the next marker or the
//! end of the note, trimmed. Text before the first marker belongs to no occurrence.

use ctag_types::{is_code_char, MarkerStyle, TagCode};

/// One marker occurrence in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// 0-based position in scan order.
    pub ordinal: usize,
    /// Byte offset of the marker prefix in the note.
    pub offset: usize,
    pub code: TagCode,
    pub raw_value: String,
}

struct Marker {
    start: usize,
    end: usize,
    code: TagCode,
}

/// Tries to read a marker starting at byte `start`. Returns `None` if there is none.
fn marker_at(note: &str, start: usize) -> Option<Marker> {
    let rest = &note[start..];
    let style = MarkerStyle::detect(rest)?;
    let body_start = start + style.prefix().len();

    let body_len: usize = note[body_start..]
        .chars()
        .take_while(|c| is_code_char(*c))
        .map(char::len_utf8)
        .sum();
    if body_len == 0 {
        return None;
    }

    let code_end = body_start + body_len;
    let code = TagCode::parse(&note[start..code_end]).ok()?;
    let end = if note[code_end..].starts_with(':') {
        code_end + 1
    } else {
        code_end
    };

    Some(Marker {
        start,
        end,
        code,
    })
}

fn find_markers(note: &str) -> Vec<Marker> {
    let mut markers = Vec::new();
    let mut previous: Option<char> = None;
    let mut iter = note.char_indices();

    while let Some((index, c)) = iter.next() {
        let glued = previous.is_some_and(is_code_char);
        if !glued && (c == '#' || c == '>') {
            if let Some(marker) = marker_at(note, index) {
                // Skip the characters consumed by the marker. A marker may follow another
                // directly (`#A#B`), so it does not count as a preceding word character.
                while iter.clone().next().is_some_and(|(i, _)| i < marker.end) {
                    iter.next();
                }
                previous = None;
                markers.push(marker);
                continue;
            }
        }
        previous = Some(c);
    }

    markers
}

/// Scans a note for marker occurrences in document order.
pub fn scan(note: &str) -> Vec<Occurrence> {
    let markers = find_markers(note);
    let value_ends = markers
        .iter()
        .skip(1)
        .map(|m| m.start)
        .chain(std::iter::once(note.len()));

    markers
        .iter()
        .zip(value_ends)
        .enumerate()
        .map(|(ordinal, (marker, value_end))| Occurrence {
            ordinal,
            offset: marker.start,
            code: marker.code.clone(),
            raw_value: note[marker.end..value_end].trim().to_string(),
        })
        .collect()
}

/// The codes of every marker in the note, in document order, duplicates included.
pub fn extract_codes(note: &str) -> Vec<TagCode> {
    find_markers(note).into_iter().map(|m| m.code).collect()
}
