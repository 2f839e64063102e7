use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::Regex;

/// Converts chapter XHTML into the plain text shown in a chapter page.
///
/// Block elements become line breaks, headings and paragraphs are separated
/// by a blank line and list items get a `* ` bullet. Everything inside
/// `head`, `script` and `style` is dropped.
pub struct HtmlToText {
    multi_space_re: Regex,
    multi_newline_re: Regex,
    line_leading_space_re: Regex,
    line_trailing_space_re: Regex,
}

const SKIPPED_TAGS: &[&str] = &["head", "script", "style", "title"];

const SPACED_BLOCKS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre"];

const BLOCKS: &[&str] = &[
    "div", "section", "article", "li", "tr", "ul", "ol", "dl", "dt", "dd", "table", "hr",
    "figure", "figcaption", "header", "footer", "aside", "nav",
];

impl Default for HtmlToText {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlToText {
    pub fn new() -> Self {
        HtmlToText {
            multi_space_re: Regex::new(r"[ \t]+").expect("Failed to compile multi space regex"),
            multi_newline_re: Regex::new(r"\n{3,}").expect("Failed to compile multi newline regex"),
            line_leading_space_re: Regex::new(r"\n +")
                .expect("Failed to compile line leading space regex"),
            line_trailing_space_re: Regex::new(r" +\n")
                .expect("Failed to compile line trailing space regex"),
        }
    }

    pub fn convert(&self, html: &str) -> std::io::Result<String> {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())?;

        let mut raw = String::with_capacity(html.len() / 2);
        self.visit(&dom.document, &mut raw);
        Ok(self.cleanup(&raw))
    }

    fn visit(&self, node: &Handle, out: &mut String) {
        match &node.data {
            NodeData::Document => self.visit_children(node, out),
            NodeData::Text { contents } => {
                let contents = contents.borrow();
                for ch in contents.chars() {
                    match ch {
                        '\n' | '\r' | '\t' => out.push(' '),
                        '\u{a0}' => out.push(' '),
                        _ => out.push(ch),
                    }
                }
            }
            NodeData::Element { name, .. } => {
                let tag: &str = &name.local;
                if SKIPPED_TAGS.contains(&tag) {
                    return;
                }
                if tag == "br" {
                    out.push('\n');
                    return;
                }

                if SPACED_BLOCKS.contains(&tag) {
                    out.push_str("\n\n");
                    self.visit_children(node, out);
                    out.push_str("\n\n");
                } else if BLOCKS.contains(&tag) {
                    ensure_newline(out);
                    if tag == "li" {
                        out.push_str("* ");
                    }
                    self.visit_children(node, out);
                    ensure_newline(out);
                } else {
                    self.visit_children(node, out);
                }
            }
            _ => {}
        }
    }

    fn visit_children(&self, node: &Handle, out: &mut String) {
        for child in node.children.borrow().iter() {
            self.visit(child, out);
        }
    }

    fn cleanup(&self, raw: &str) -> String {
        let text = self.multi_space_re.replace_all(raw, " ");
        let text = self.line_leading_space_re.replace_all(&text, "\n");
        let text = self.line_trailing_space_re.replace_all(&text, "\n");
        let text = self.multi_newline_re.replace_all(&text, "\n\n");
        text.trim().to_string()
    }
}

fn ensure_newline(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}
