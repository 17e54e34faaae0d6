//! Deterministic interpreter for patch operations.

use super::operation::PatchOperation;

/// Applies `operations` to `document` in order and returns the new document.
///
/// Each operation sees the result of the previous one, so line numbers in a
/// later operation refer to the already-shifted document. Nothing here can
/// fail: an operation whose target does not exist leaves the text untouched.
pub fn apply(document: &str, operations: &[PatchOperation]) -> String {
    operations
        .iter()
        .fold(document.to_string(), |current, op| apply_one(current, op))
}

fn apply_one(document: String, op: &PatchOperation) -> String {
    match op {
        PatchOperation::ReplaceAll { content } => content.clone(),
        PatchOperation::Append { content } => {
            if document.is_empty() {
                content.clone()
            } else {
                format!("{document}\n{content}")
            }
        }
        PatchOperation::Prepend { content } => {
            if document.is_empty() {
                content.clone()
            } else {
                format!("{content}\n{document}")
            }
        }
        PatchOperation::InsertAfterLine { line, content } => {
            let mut lines = split_lines(&document);
            let index = (*line).clamp(0, lines.len() as i64) as usize;
            lines.insert(index, content.as_str());
            lines.join("\n")
        }
        PatchOperation::ReplaceLine { line, content } => {
            let mut lines = split_lines(&document);
            match line_index(*line, lines.len()) {
                Some(index) => {
                    lines[index] = content.as_str();
                    lines.join("\n")
                }
                None => document,
            }
        }
        PatchOperation::DeleteLine { line } => {
            let mut lines = split_lines(&document);
            match line_index(*line, lines.len()) {
                Some(index) => {
                    lines.remove(index);
                    lines.join("\n")
                }
                None => document,
            }
        }
        PatchOperation::SearchReplace { find, with, all } => {
            if find.is_empty() {
                document
            } else if *all {
                document.replace(find.as_str(), with)
            } else {
                document.replacen(find.as_str(), with, 1)
            }
        }
    }
}

/// Every `\n` starts a new line, so an empty document is one empty line.
fn split_lines(document: &str) -> Vec<&str> {
    document.split('\n').collect()
}

/// Converts a 1-based line number into an index, if it addresses an existing line.
fn line_index(line: i64, line_count: usize) -> Option<usize> {
    if line >= 1 && line <= line_count as i64 {
        Some((line - 1) as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "alpha\nbeta\ngamma";

    fn insert(line: i64, content: &str) -> PatchOperation {
        PatchOperation::InsertAfterLine {
            line,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_replace_all_is_absolute() {
        for doc in ["", DOC, "x\n\n"] {
            let ops = [PatchOperation::ReplaceAll {
                content: "fresh".into(),
            }];
            assert_eq!(apply(doc, &ops), "fresh");
        }
    }

    #[test]
    fn test_append_and_prepend_separator() {
        let append = PatchOperation::Append {
            content: "delta".into(),
        };
        let prepend = PatchOperation::Prepend {
            content: "# Title".into(),
        };
        assert_eq!(apply(DOC, &[append.clone()]), "alpha\nbeta\ngamma\ndelta");
        assert_eq!(apply("", &[append]), "delta");
        assert_eq!(apply(DOC, &[prepend.clone()]), "# Title\nalpha\nbeta\ngamma");
        assert_eq!(apply("", &[prepend]), "# Title");
    }

    #[test]
    fn test_insert_clamps_to_document_bounds() {
        assert_eq!(apply(DOC, &[insert(0, "top")]), "top\nalpha\nbeta\ngamma");
        assert_eq!(apply(DOC, &[insert(2, "mid")]), "alpha\nbeta\nmid\ngamma");
        assert_eq!(apply(DOC, &[insert(99, "end")]), "alpha\nbeta\ngamma\nend");
        assert_eq!(apply(DOC, &[insert(-4, "neg")]), "neg\nalpha\nbeta\ngamma");
    }

    #[test]
    fn test_empty_document_is_one_empty_line() {
        assert_eq!(apply("", &[insert(0, "top")]), "top\n");
        assert_eq!(apply("", &[insert(3, "end")]), "\nend");
        let replace = PatchOperation::ReplaceLine {
            line: 1,
            content: "X".into(),
        };
        assert_eq!(apply("", &[replace]), "X");
        let beyond = PatchOperation::ReplaceLine {
            line: 2,
            content: "X".into(),
        };
        assert_eq!(apply("", &[beyond]), "");
        assert_eq!(apply("", &[PatchOperation::DeleteLine { line: 1 }]), "");
    }

    #[test]
    fn test_replace_line_out_of_range_is_noop() {
        let ok = PatchOperation::ReplaceLine {
            line: 2,
            content: "BETA".into(),
        };
        assert_eq!(apply(DOC, &[ok]), "alpha\nBETA\ngamma");

        for line in [0, 4, -1, i64::MAX] {
            let op = PatchOperation::ReplaceLine {
                line,
                content: "nope".into(),
            };
            assert_eq!(apply(DOC, &[op]), DOC);
        }
    }

    #[test]
    fn test_delete_line_out_of_range_is_noop() {
        assert_eq!(apply(DOC, &[PatchOperation::DeleteLine { line: 1 }]), "beta\ngamma");
        assert_eq!(apply(DOC, &[PatchOperation::DeleteLine { line: 3 }]), "alpha\nbeta");
        for line in [0, 4, i64::MIN] {
            assert_eq!(apply(DOC, &[PatchOperation::DeleteLine { line }]), DOC);
        }
    }

    #[test]
    fn test_delete_then_insert_restores_line() {
        let ops = [
            PatchOperation::DeleteLine { line: 2 },
            insert(1, "replacement"),
        ];
        assert_eq!(apply(DOC, &ops), "alpha\nreplacement\ngamma");
    }

    #[test]
    fn test_search_replace_first_and_all() {
        let doc = "a-b a-b a-b";
        let first = PatchOperation::SearchReplace {
            find: "a-b".into(),
            with: "X".into(),
            all: false,
        };
        let every = PatchOperation::SearchReplace {
            find: "a-b".into(),
            with: "X".into(),
            all: true,
        };
        assert_eq!(apply(doc, &[first]), "X a-b a-b");
        assert_eq!(apply(doc, &[every]), "X X X");
    }

    #[test]
    fn test_search_replace_is_literal_and_absent_find_is_noop() {
        let doc = "cost: $5 (approx.)";
        let literal = PatchOperation::SearchReplace {
            find: "$5 (approx.)".into(),
            with: "$6".into(),
            all: false,
        };
        assert_eq!(apply(doc, &[literal]), "cost: $6");

        let missing = PatchOperation::SearchReplace {
            find: ".*".into(),
            with: "boom".into(),
            all: true,
        };
        assert_eq!(apply(doc, &[missing]), doc);
    }

    #[test]
    fn test_operations_observe_previous_shifts() {
        let ops = [
            PatchOperation::Prepend {
                content: "header".into(),
            },
            PatchOperation::ReplaceLine {
                line: 2,
                content: "ALPHA".into(),
            },
            PatchOperation::DeleteLine { line: 4 },
        ];
        assert_eq!(apply(DOC, &ops), "header\nALPHA\nbeta");
    }

    #[test]
    fn test_no_op_keeps_trailing_newlines_byte_identical() {
        let doc = "one\ntwo\n";
        let ops = [
            PatchOperation::ReplaceLine {
                line: 7,
                content: "x".into(),
            },
            PatchOperation::DeleteLine { line: 0 },
        ];
        assert_eq!(apply(doc, &ops), doc);
    }
}
