//! TEXT value escaping (RFC 5545 §3.3.11) and XML attribute/text escaping.

/// Escapes a TEXT value for embedding in an iCalendar property: `\` first,
/// then newline, comma, semicolon.
#[must_use]
pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            ',' => out.push_str("\\,"),
            ';' => out.push_str("\\;"),
            other => out.push(other),
        }
    }
    out
}

/// Reverses [`escape_text`]: `\n`/`\N` and `\,`/`\;`/`\\` decode to their
/// unescaped form.
#[must_use]
pub fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(',') => out.push(','),
            Some(';') => out.push(';'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Escapes a string for safe embedding in generated XML text/attribute
/// content.
#[must_use]
pub fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_in_correct_order() {
        assert_eq!(escape_text("a,b;c\nd\\e"), "a\\,b\\;c\\nd\\\\e");
    }

    #[test]
    fn round_trips_text() {
        let original = "Line one\nLine two, with; punctuation\\ and stuff";
        assert_eq!(unescape_text(&escape_text(original)), original);
    }

    #[test]
    fn xml_escapes_reserved_characters() {
        assert_eq!(xml_escape("<a & b>\"x\"'y'"), "&lt;a &amp; b&gt;&quot;x&quot;&apos;y&apos;");
    }
}
