//! Tokenizer for `<np-*>` notepad tags embedded in a persona response.
//!
//! Supported forms:
//!
//! ```text
//! <np-NAME key="value" ...>content</np-NAME>
//! <np-NAME key="value" ... />
//! ```
//!
//! Every well-formed tag is removed from the spoken text whether or not its
//! name is known; only known names become operations. Anything that does not
//! scan as a complete tag is kept verbatim in the spoken text.

use super::operation::PatchOperation;
use std::collections::HashMap;

const TAG_PREFIX: &[u8] = b"<np-";

/// Result of splitting a raw response into prose and notepad edits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedResponse {
    /// Response text with all tags removed, trimmed.
    pub spoken_text: String,
    /// Recognized operations in the order their tags appear.
    pub operations: Vec<PatchOperation>,
}

/// A complete tag found in the raw text.
#[derive(Debug)]
struct ScannedTag<'a> {
    name: &'a str,
    attributes: &'a str,
    content: &'a str,
    /// Byte offset just past the tag (after `/>` or the closing tag).
    end: usize,
}

/// Splits `raw` into spoken text and patch operations. Never fails.
pub fn parse(raw: &str) -> ParsedResponse {
    let mut residual = String::with_capacity(raw.len());
    let mut operations = Vec::new();
    let mut cursor = 0;

    while let Some(start) = find_tag_start(raw, cursor) {
        match scan_tag(raw, start) {
            Some(tag) => {
                residual.push_str(&raw[cursor..start]);
                if let Some(op) = to_operation(&tag) {
                    operations.push(op);
                }
                cursor = tag.end;
            }
            None => {
                // Not a complete tag: keep the '<' and keep scanning after it.
                residual.push_str(&raw[cursor..start + 1]);
                cursor = start + 1;
            }
        }
    }
    residual.push_str(&raw[cursor..]);

    ParsedResponse {
        spoken_text: residual.trim().to_string(),
        operations,
    }
}

/// Finds the next `<np-` (prefix matched case-insensitively) at or after `from`.
fn find_tag_start(raw: &str, from: usize) -> Option<usize> {
    let bytes = raw.as_bytes();
    let mut index = from;
    while index + TAG_PREFIX.len() <= bytes.len() {
        if bytes[index..index + TAG_PREFIX.len()].eq_ignore_ascii_case(TAG_PREFIX) {
            return Some(index);
        }
        index += 1;
    }
    None
}

fn scan_tag(raw: &str, start: usize) -> Option<ScannedTag<'_>> {
    let bytes = raw.as_bytes();
    let name_start = start + TAG_PREFIX.len();
    let name_end = name_start
        + bytes[name_start..]
            .iter()
            .take_while(|b| is_name_byte(**b))
            .count();
    if name_end == name_start {
        return None;
    }
    let name = &raw[name_start..name_end];

    let open_end = name_end + raw[name_end..].find('>')?;
    let attributes = &raw[name_end..open_end];

    if let Some(self_closed) = attributes.trim_end().strip_suffix('/') {
        return Some(ScannedTag {
            name,
            attributes: self_closed,
            content: "",
            end: open_end + 1,
        });
    }

    let content_start = open_end + 1;
    let (close_start, close_end) = find_closing_tag(raw, content_start, name)?;
    Some(ScannedTag {
        name,
        attributes,
        content: &raw[content_start..close_start],
        end: close_end,
    })
}

/// Finds the first `</np-NAME>` after `from`, comparing the name ignoring case.
fn find_closing_tag(raw: &str, from: usize, name: &str) -> Option<(usize, usize)> {
    let closing = format!("</np-{name}>");
    let needle = closing.as_bytes();
    let bytes = raw.as_bytes();
    let mut index = from;
    while index + needle.len() <= bytes.len() {
        if bytes[index..index + needle.len()].eq_ignore_ascii_case(needle) {
            return Some((index, index + needle.len()));
        }
        index += 1;
    }
    None
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn is_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Extracts `key="value"` pairs. Values are taken literally up to the next
/// double quote; a later duplicate key overrides an earlier one.
fn parse_attributes(source: &str) -> HashMap<String, String> {
    let bytes = source.as_bytes();
    let mut attributes = HashMap::new();
    let mut floor = 0;
    let mut search_from = 0;

    while let Some(offset) = source[search_from..].find("=\"") {
        let eq = search_from + offset;
        let mut key_start = eq;
        while key_start > floor && is_key_byte(bytes[key_start - 1]) {
            key_start -= 1;
        }

        let value_start = eq + 2;
        let Some(value_len) = source[value_start..].find('"') else {
            break;
        };

        if key_start == eq {
            search_from = eq + 1;
            continue;
        }

        let value_end = value_start + value_len;
        attributes.insert(
            source[key_start..eq].to_string(),
            source[value_start..value_end].to_string(),
        );
        floor = value_end + 1;
        search_from = floor;
    }

    attributes
}

fn line_attribute(attributes: &HashMap<String, String>) -> Option<i64> {
    attributes.get("line")?.trim().parse().ok()
}

fn to_operation(tag: &ScannedTag<'_>) -> Option<PatchOperation> {
    let attributes = parse_attributes(tag.attributes);
    // Content is taken verbatim, line breaks next to the tags included.
    let content = || tag.content.to_string();

    let op = match tag.name.to_ascii_lowercase().as_str() {
        "replace-all" => PatchOperation::ReplaceAll { content: content() },
        "append" => PatchOperation::Append { content: content() },
        "prepend" => PatchOperation::Prepend { content: content() },
        "insert" => PatchOperation::InsertAfterLine {
            line: line_attribute(&attributes)?,
            content: content(),
        },
        "replace" => PatchOperation::ReplaceLine {
            line: line_attribute(&attributes)?,
            content: content(),
        },
        "delete" => PatchOperation::DeleteLine {
            line: line_attribute(&attributes)?,
        },
        "search-replace" => {
            let find = attributes.get("find").filter(|find| !find.is_empty())?;
            let with = attributes.get("with")?;
            let all = attributes
                .get("all")
                .is_some_and(|all| all == "true");
            PatchOperation::SearchReplace {
                find: find.clone(),
                with: with.clone(),
                all,
            }
        }
        _ => return None,
    };
    Some(op)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_has_no_operations() {
        let parsed = parse("  Just talking about <b>bold</b> ideas.  ");
        assert_eq!(parsed.spoken_text, "Just talking about <b>bold</b> ideas.");
        assert!(parsed.operations.is_empty());
    }

    #[test]
    fn test_block_tags_are_extracted_in_order() {
        let raw = "I have updated the notepad.\n<np-delete line=\"1\" />\n<np-append>\n- Final conclusion reached.\n</np-append>\nPlease review.";
        let parsed = parse(raw);
        assert_eq!(
            parsed.operations,
            vec![
                PatchOperation::DeleteLine { line: 1 },
                PatchOperation::Append {
                    content: "\n- Final conclusion reached.\n".into()
                },
            ]
        );
        assert_eq!(
            parsed.spoken_text,
            "I have updated the notepad.\n\n\nPlease review."
        );
    }

    #[test]
    fn test_tag_names_are_case_insensitive() {
        let parsed = parse("<NP-Replace-All>New body</np-replace-ALL>");
        assert_eq!(
            parsed.operations,
            vec![PatchOperation::ReplaceAll {
                content: "New body".into()
            }]
        );
        assert_eq!(parsed.spoken_text, "");
    }

    #[test]
    fn test_unknown_tags_are_stripped_without_operations() {
        let parsed = parse("Before <np-highlight color=\"red\">x</np-highlight> after <np-bogus/>.");
        assert!(parsed.operations.is_empty());
        assert_eq!(parsed.spoken_text, "Before  after .");
    }

    #[test]
    fn test_missing_or_bad_line_drops_only_that_tag() {
        let raw = "<np-insert>no line</np-insert><np-replace line=\"two\">x</np-replace><np-insert line=\" 2 \">kept</np-insert>";
        let parsed = parse(raw);
        assert_eq!(
            parsed.operations,
            vec![PatchOperation::InsertAfterLine {
                line: 2,
                content: "kept".into()
            }]
        );
        assert_eq!(parsed.spoken_text, "");
    }

    #[test]
    fn test_search_replace_attributes() {
        let parsed = parse(
            "<np-search-replace find=\"a.b*\" with=\"c\" all=\"true\" /><np-search-replace find=\"x\" with=\"\"></np-search-replace><np-search-replace with=\"y\"/>",
        );
        assert_eq!(
            parsed.operations,
            vec![
                PatchOperation::SearchReplace {
                    find: "a.b*".into(),
                    with: "c".into(),
                    all: true
                },
                PatchOperation::SearchReplace {
                    find: "x".into(),
                    with: "".into(),
                    all: false
                },
            ]
        );
    }

    #[test]
    fn test_attribute_values_are_literal() {
        let attrs = parse_attributes(" find=\"<np-append>\" with=\"&amp;\" all=\"false\"");
        assert_eq!(attrs.get("find").map(String::as_str), Some("<np-append>"));
        assert_eq!(attrs.get("with").map(String::as_str), Some("&amp;"));
        assert_eq!(attrs.get("all").map(String::as_str), Some("false"));
    }

    #[test]
    fn test_attribute_duplicate_key_last_wins() {
        let attrs = parse_attributes(" line=\"1\" line=\"3\"");
        assert_eq!(attrs.get("line").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_unclosed_tag_is_left_in_place() {
        let raw = "Start <np-append>dangling content and <np-delete line=\"2\"/> end";
        let parsed = parse(raw);
        assert_eq!(parsed.operations, vec![PatchOperation::DeleteLine { line: 2 }]);
        assert_eq!(parsed.spoken_text, "Start <np-append>dangling content and  end");
    }

    #[test]
    fn test_mismatched_close_is_left_in_place() {
        let raw = "<np-append>text</np-prepend>";
        let parsed = parse(raw);
        assert!(parsed.operations.is_empty());
        assert_eq!(parsed.spoken_text, raw);
    }

    #[test]
    fn test_tag_without_closing_bracket_is_left_in_place() {
        let parsed = parse("trailing <np-delete line=\"1\"");
        assert!(parsed.operations.is_empty());
        assert_eq!(parsed.spoken_text, "trailing <np-delete line=\"1\"");
    }

    #[test]
    fn test_stripping_preserves_surrounding_text_order() {
        let raw = "one <np-append>A</np-append>two<np-x/> three <np-prepend>P</np-prepend>four";
        let parsed = parse(raw);
        assert_eq!(parsed.spoken_text, "one two three four");
        assert_eq!(parsed.operations.len(), 2);
    }

    #[test]
    fn test_multibyte_text_around_tags() {
        let parsed = parse("résumé ✓ <np-append>日本語</np-append> fin");
        assert_eq!(parsed.spoken_text, "résumé ✓  fin");
        assert_eq!(
            parsed.operations,
            vec![PatchOperation::Append {
                content: "日本語".into()
            }]
        );
    }

    #[test]
    fn test_block_content_is_verbatim() {
        let parsed = parse("<np-replace-all>\n# Title\n\nBody\n</np-replace-all>");
        assert_eq!(
            parsed.operations,
            vec![PatchOperation::ReplaceAll {
                content: "\n# Title\n\nBody\n".into()
            }]
        );

        let parsed = parse("<np-append>  padded  </np-append>");
        assert_eq!(
            parsed.operations,
            vec![PatchOperation::Append {
                content: "  padded  ".into()
            }]
        );
    }

    #[test]
    fn test_search_replace_all_is_exactly_true() {
        let raw = "<np-search-replace find=\"a\" with=\"b\" all=\"TRUE\"/><np-search-replace find=\"a\" with=\"b\" all=\"True\"/><np-search-replace find=\"a\" with=\"b\" all=\"true\"/>";
        let flags: Vec<bool> = parse(raw)
            .operations
            .into_iter()
            .map(|op| match op {
                PatchOperation::SearchReplace { all, .. } => all,
                other => panic!("unexpected operation {other:?}"),
            })
            .collect();
        assert_eq!(flags, vec![false, false, true]);
    }
}
