//! HTML subset parser
//!
//! Produces a small element / text / comment tree. Supported: start and end
//! tags, quoted / unquoted / bare attributes, self-closing tags, void
//! elements, comments and character references. No doctype, no CDATA, no raw
//! text elements.

use html_escape::decode_html_entities;

/// Parsed node
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

/// Parsed element
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    /// Tag as written (case preserved so that component names survive)
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Elements that never have content or an end tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|void| void.eq_ignore_ascii_case(tag))
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ParseOptions {
    /// Decode `&#10;` in attribute values into a newline
    pub decode_newlines: bool,
    /// Keep comment nodes
    pub comments: bool,
}

/// Parse `source` into top-level nodes
///
/// All problems are collected; the tree is only returned when there were none.
pub fn parse(source: &str, options: ParseOptions) -> Result<Vec<Node>, Vec<String>> {
    let mut parser = Parser {
        src: source,
        pos: 0,
        options,
        errors: Vec::new(),
    };
    let nodes = parser.parse_nodes(None);
    if parser.errors.is_empty() {
        Ok(nodes)
    } else {
        Err(parser.errors)
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    options: ParseOptions,
    errors: Vec<String>,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    /// Parse children until the end tag of `open` (or end of input at top level)
    fn parse_nodes(&mut self, open: Option<&str>) -> Vec<Node> {
        let mut nodes = Vec::new();
        loop {
            if self.eof() {
                if let Some(tag) = open {
                    self.errors.push(format!("tag <{}> has no matching end tag", tag));
                }
                break;
            }
            let rest = self.rest();
            if rest.starts_with("</") {
                let end = rest.find('>').unwrap_or(rest.len());
                let closing = rest[2..end].trim();
                match open {
                    Some(tag) if tag == closing => {
                        self.pos += (end + 1).min(rest.len());
                        break;
                    }
                    Some(tag) => {
                        self.errors.push(format!("tag <{}> has no matching end tag (found </{}>)", tag, closing));
                        self.pos += (end + 1).min(rest.len());
                        break;
                    }
                    None => {
                        self.errors.push(format!("stray end tag </{}>", closing));
                        self.pos += (end + 1).min(rest.len());
                        continue;
                    }
                }
            }
            if rest.starts_with("<!--") {
                let body_end = rest[4..].find("-->");
                let Some(body_end) = body_end else {
                    self.errors.push("unterminated comment".to_string());
                    self.pos = self.src.len();
                    break;
                };
                let text = &rest[4..4 + body_end];
                self.pos += 4 + body_end + 3;
                if self.options.comments {
                    nodes.push(Node::Comment(text.to_string()));
                }
                continue;
            }
            if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                if let Some(element) = self.parse_element() {
                    nodes.push(Node::Element(element));
                }
                continue;
            }

            // Text up to the next tag-like `<`
            let mut end = rest.len();
            for (index, _) in rest.match_indices('<').skip_while(|(i, _)| *i == 0) {
                let after = &rest[index + 1..];
                if after.starts_with('/') || after.starts_with("!--") || after.starts_with(|c: char| c.is_ascii_alphabetic()) {
                    end = index;
                    break;
                }
            }
            let raw = &rest[..end];
            self.pos += end;
            push_text(&mut nodes, raw);
        }
        trim_trailing_whitespace(&mut nodes);
        nodes
    }

    fn parse_element(&mut self) -> Option<Element> {
        // Skip '<'
        self.pos += 1;
        let rest = self.rest();
        let name_len = rest
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(rest.len());
        let tag = rest[..name_len].to_string();
        self.pos += name_len;

        let mut element = Element {
            tag,
            ..Default::default()
        };

        loop {
            self.skip_whitespace();
            if self.eof() {
                self.errors.push(format!("unclosed start tag <{}>", element.tag));
                return None;
            }
            let rest = self.rest();
            if rest.starts_with("/>") {
                self.pos += 2;
                return Some(element);
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break;
            }
            match self.parse_attribute() {
                Some((name, value)) => {
                    if element.attrs.iter().any(|(existing, _)| *existing == name) {
                        self.errors.push(format!("duplicate attribute: {}", name));
                    } else {
                        element.attrs.push((name, value));
                    }
                }
                None => {
                    self.errors.push(format!("malformed attribute in <{}>", element.tag));
                    return None;
                }
            }
        }

        if is_void(&element.tag) {
            return Some(element);
        }
        let tag = element.tag.clone();
        element.children = self.parse_nodes(Some(&tag));
        Some(element)
    }

    fn parse_attribute(&mut self) -> Option<(String, String)> {
        let rest = self.rest();
        let name_len = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
            .unwrap_or(rest.len());
        if name_len == 0 {
            return None;
        }
        let name = rest[..name_len].to_string();
        self.pos += name_len;
        self.skip_whitespace();

        if !self.rest().starts_with('=') {
            return Some((name, String::new()));
        }
        self.pos += 1;
        self.skip_whitespace();

        let rest = self.rest();
        let raw = if let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') {
            let close = rest[1..].find(quote)?;
            self.pos += close + 2;
            &rest[1..1 + close]
        } else {
            let len = rest.find(|c: char| c.is_whitespace() || c == '>').unwrap_or(rest.len());
            self.pos += len;
            &rest[..len]
        };
        Some((name, decode_attr(raw, self.options.decode_newlines)))
    }
}

/// Decode character references in an attribute value
///
/// `&#10;` stays encoded unless `decode_newlines` is set.
pub fn decode_attr(raw: &str, decode_newlines: bool) -> String {
    if decode_newlines {
        return decode_html_entities(raw).into_owned();
    }
    raw.split("&#10;")
        .map(|piece| decode_html_entities(piece).into_owned())
        .collect::<Vec<_>>()
        .join("&#10;")
}

/// Whitespace-only text collapses to one space between siblings and vanishes
/// at the start of a parent
fn push_text(nodes: &mut Vec<Node>, raw: &str) {
    if raw.is_empty() {
        return;
    }
    if raw.trim().is_empty() {
        if !nodes.is_empty() && !matches!(nodes.last(), Some(Node::Text(_))) {
            nodes.push(Node::Text(" ".to_string()));
        }
        return;
    }
    let text = decode_html_entities(raw).into_owned();
    match nodes.last_mut() {
        Some(Node::Text(previous)) => previous.push_str(&text),
        _ => nodes.push(Node::Text(text)),
    }
}

fn trim_trailing_whitespace(nodes: &mut Vec<Node>) {
    if matches!(nodes.last(), Some(Node::Text(text)) if text.trim().is_empty()) {
        nodes.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn element(node: &Node) -> &Element {
        match node {
            Node::Element(el) => el,
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_elements_and_attributes() {
        let nodes = parse(
            r#"<div id="app" class='box' hidden data-x=1><span>hi</span><br><img src="a.png"/></div>"#,
            ParseOptions::default(),
        )
        .unwrap();

        assert_eq!(nodes.len(), 1);
        let div = element(&nodes[0]);
        assert_eq!(div.attr("id"), Some("app"));
        assert_eq!(div.attr("class"), Some("box"));
        assert_eq!(div.attr("hidden"), Some(""));
        assert_eq!(div.attr("data-x"), Some("1"));
        assert_eq!(div.children.len(), 3);
        assert_eq!(element(&div.children[1]).tag, "br");
        assert_eq!(element(&div.children[2]).attr("src"), Some("a.png"));
    }

    #[test]
    fn test_whitespace_condensing() {
        let nodes = parse("<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>", ParseOptions::default()).unwrap();
        let ul = element(&nodes[0]);
        assert_eq!(ul.children.len(), 3);
        assert_eq!(ul.children[1], Node::Text(" ".into()));
    }

    #[test]
    fn test_entities_decoded() {
        let nodes = parse(r#"<p title="a &amp; b">1 &lt; 2</p>"#, ParseOptions::default()).unwrap();
        let p = element(&nodes[0]);
        assert_eq!(p.attr("title"), Some("a & b"));
        assert_eq!(p.children[0], Node::Text("1 < 2".into()));
    }

    #[test]
    fn test_newline_decoding_is_opt_in() {
        let source = r#"<p title="a&#10;b"></p>"#;
        let kept = parse(source, ParseOptions::default()).unwrap();
        assert_eq!(element(&kept[0]).attr("title"), Some("a&#10;b"));

        let decoded = parse(
            source,
            ParseOptions {
                decode_newlines: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(element(&decoded[0]).attr("title"), Some("a\nb"));
    }

    #[test]
    fn test_comments_dropped_unless_kept() {
        let source = "<div><!-- note -->x</div>";
        let dropped = parse(source, ParseOptions::default()).unwrap();
        assert_eq!(element(&dropped[0]).children, vec![Node::Text("x".into())]);

        let kept = parse(
            source,
            ParseOptions {
                comments: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(element(&kept[0]).children[0], Node::Comment(" note ".into()));
    }

    #[test]
    fn test_errors_are_collected() {
        let errors = parse("<div><span></div>", ParseOptions::default()).unwrap_err();
        assert_eq!(errors[0], "tag <span> has no matching end tag (found </div>)");

        let errors = parse("<div>", ParseOptions::default()).unwrap_err();
        assert_eq!(errors, vec!["tag <div> has no matching end tag".to_string()]);
    }

    #[test]
    fn test_less_than_in_text() {
        let nodes = parse("<p>{{ a < b }}</p>", ParseOptions::default()).unwrap();
        assert_eq!(element(&nodes[0]).children[0], Node::Text("{{ a < b }}".into()));
    }
}
