//! Minimal HTML serialization helpers.

/// Elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] =
    &["area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr"];

pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub fn escape_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

pub fn escape_attr(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

/// Write `<name a="b" ...>` with attributes sorted by name.
pub fn open_tag<'a>(out: &mut String, name: &str, attrs: impl IntoIterator<Item = (&'a str, &'a str)>) {
    let mut attrs: Vec<_> = attrs.into_iter().collect();
    attrs.sort_by(|a, b| a.0.cmp(b.0));

    out.push('<');
    out.push_str(name);
    for (key, value) in attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        escape_attr(out, value);
        out.push('"');
    }
    out.push('>');
}

pub fn close_tag(out: &mut String, name: &str) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        let mut out = String::new();
        escape_text(&mut out, "Faith & <works>");
        assert_eq!(out, "Faith &amp; &lt;works&gt;");
    }

    #[test]
    fn test_open_tag_sorts_and_escapes() {
        let mut out = String::new();
        open_tag(&mut out, "img", [("src", "a.jpg?x=1&y=2"), ("alt", "\"Saint\"")]);
        assert_eq!(out, r#"<img alt="&quot;Saint&quot;" src="a.jpg?x=1&amp;y=2">"#);
    }

    #[test]
    fn test_void() {
        assert!(is_void("img"));
        assert!(is_void("br"));
        assert!(!is_void("p"));
    }
}
