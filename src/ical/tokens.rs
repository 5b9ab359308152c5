//! Line unfolding and flat property tokenization (RFC 5545 §3.1).

use std::collections::HashMap;

/// Removes RFC 5545 line folding: any `CRLF`/`LF` followed by a single space
/// or tab is a continuation and is spliced into the previous line.
#[must_use]
pub fn unfold(raw: &str) -> String {
    let normalized = raw.replace("\r\n", "\n");
    let mut out = String::with_capacity(normalized.len());
    let mut chars = normalized.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            if matches!(chars.peek(), Some(' ') | Some('\t')) {
                chars.next();
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Splits an unfolded document into the line groups belonging to each
/// top-level occurrence of `BEGIN:<component>` / `END:<component>`, excluding
/// the BEGIN/END lines themselves.
#[must_use]
pub fn split_components<'a>(unfolded: &'a str, component: &str) -> Vec<Vec<String>> {
    let begin = format!("BEGIN:{component}");
    let end = format!("END:{component}");
    let mut blocks = Vec::new();
    let mut current: Option<Vec<String>> = None;

    for line in unfolded.lines() {
        if line.eq_ignore_ascii_case(&begin) {
            current = Some(Vec::new());
            continue;
        }
        if line.eq_ignore_ascii_case(&end) {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            continue;
        }
        if let Some(block) = current.as_mut() {
            if !line.is_empty() {
                block.push(line.to_string());
            }
        }
    }

    let _ = unfolded;
    blocks
}

/// Flat property map for a single component's lines: base `NAME`,
/// `NAME;PARAM`, and `NAME;VALUE` for parameters written without `=`.
#[derive(Debug, Default)]
pub struct PropMap {
    values: HashMap<String, String>,
}

impl PropMap {
    /// The value stored under the bare property name.
    #[must_use]
    pub fn get_value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// The value of `NAME;PARAM=...` for the given parameter name.
    #[must_use]
    pub fn param(&self, name: &str, param: &str) -> Option<&str> {
        self.values
            .get(&format!("{name};{param}"))
            .map(String::as_str)
    }
}

/// Tokenizes a component's unfolded, non-empty lines into a `PropMap`.
/// Last occurrence wins for any given key.
#[must_use]
pub fn tokenize(lines: &[String]) -> PropMap {
    let mut values = HashMap::new();

    for line in lines {
        let Some((name_part, value)) = line.split_once(':') else {
            continue;
        };
        let mut segments = name_part.split(';');
        let Some(base_name) = segments.next() else {
            continue;
        };
        let base_name = base_name.to_ascii_uppercase();
        values.insert(base_name.clone(), value.to_string());

        for segment in segments {
            if let Some((param_name, param_value)) = segment.split_once('=') {
                values.insert(
                    format!("{base_name};{}", param_name.to_ascii_uppercase()),
                    param_value.to_string(),
                );
            } else {
                // Positional parameter with no `=`, e.g. `VALUE` alone.
                values.insert(
                    format!("{base_name};{}", segment.to_ascii_uppercase()),
                    value.to_string(),
                );
            }
        }
    }

    PropMap { values }
}

/// Scans lines beginning with `EXDATE` and collects every comma-separated
/// value in document order, discarding empty fragments.
#[must_use]
pub fn collect_exdate(lines: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    for line in lines {
        let Some(rest) = strip_exdate_prefix(line) else {
            continue;
        };
        let Some((_, value)) = rest.split_once(':') else {
            continue;
        };
        out.extend(
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string),
        );
    }
    out
}

fn strip_exdate_prefix(line: &str) -> Option<&str> {
    if line.len() >= 6 && line[..6].eq_ignore_ascii_case("EXDATE") {
        Some(line)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfolds_space_continuation() {
        let raw = "DESCRIPTION:long\r\n text that wraps";
        assert_eq!(unfold(raw), "DESCRIPTION:long text that wraps");
    }

    #[test]
    fn unfolds_tab_continuation() {
        let raw = "DESCRIPTION:long\n\ttext";
        assert_eq!(unfold(raw), "DESCRIPTION:longtext");
    }

    #[test]
    fn tokenizes_value_date_positional_parameter() {
        let lines = vec!["DTSTART;VALUE=DATE:20260101".to_string()];
        let props = tokenize(&lines);
        assert_eq!(props.get_value("DTSTART"), Some("20260101"));
        assert_eq!(props.param("DTSTART", "VALUE"), Some("DATE"));
    }

    #[test]
    fn collects_multiple_exdate_lines_in_order() {
        let lines = vec![
            "EXDATE:20260101T090000Z,20260102T090000Z".to_string(),
            "EXDATE:20260103T090000Z".to_string(),
        ];
        assert_eq!(
            collect_exdate(&lines),
            vec!["20260101T090000Z", "20260102T090000Z", "20260103T090000Z"]
        );
    }
}
