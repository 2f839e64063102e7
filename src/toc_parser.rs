use crate::document::TocEntry;
use epub::doc::NavPoint;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use log::debug;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::collections::HashSet;
use std::path::Path;

/// Archive path as a `/`-separated url.
pub fn path_to_url(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Flattens an NCX navigation tree depth-first: each entry, then its children.
/// Targets keep their `#fragment` so sections inside one file stay distinct.
pub fn flatten_nav_points(points: &[NavPoint], out: &mut Vec<TocEntry>) {
    for point in points {
        out.push(TocEntry::new(
            point.label.trim(),
            path_to_url(&point.content),
        ));
        flatten_nav_points(&point.children, out);
    }
}

/// Reads the table of contents out of an EPUB3 navigation document.
///
/// Uses the `<nav>` typed `toc`, or the first `<nav>` when none is typed.
/// Links are resolved against `base_dir`, the archive directory holding the
/// navigation document, and nested lists are flattened depth-first.
pub fn parse_nav_document(markup: &str, base_dir: &str) -> std::io::Result<Vec<TocEntry>> {
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut markup.as_bytes())?;

    let Some(nav) = find_toc_nav(&dom.document).or_else(|| find_element(&dom.document, "nav"))
    else {
        debug!("navigation document has no <nav> element");
        return Ok(Vec::new());
    };

    let mut entries = Vec::new();
    for child in nav.children.borrow().iter() {
        if is_list(child) {
            collect_list(child, base_dir, &mut entries);
        }
    }
    Ok(entries)
}

/// Keeps the first entry for every target. Later entries pointing at the
/// same place would be indistinguishable pages.
pub fn drop_repeated_targets(entries: Vec<TocEntry>) -> Vec<TocEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| {
            let fresh = seen.insert(entry.url.clone());
            if !fresh {
                debug!("Skipping repeated toc entry {:?} -> {}", entry.name, entry.url);
            }
            fresh
        })
        .collect()
}

/// Resolves `href` relative to `base_dir`, folding `.` and `..` segments.
pub fn resolve_href(base_dir: &str, href: &str) -> String {
    if href.contains("://") {
        return href.to_string();
    }
    let (path, fragment) = match href.find('#') {
        Some(pos) => (&href[..pos], &href[pos..]),
        None => (href, ""),
    };

    let mut parts: Vec<&str> = if path.starts_with('/') {
        Vec::new()
    } else {
        base_dir.split('/').filter(|p| !p.is_empty()).collect()
    };
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("{}{fragment}", parts.join("/"))
}

fn tag_name(node: &Handle) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(&*name.local),
        _ => None,
    }
}

fn attribute(node: &Handle, matches: impl Fn(&str) -> bool) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| matches(&*attr.name.local))
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

fn is_list(node: &Handle) -> bool {
    matches!(tag_name(node), Some("ol" | "ul"))
}

fn find_element(node: &Handle, tag: &str) -> Option<Handle> {
    for child in node.children.borrow().iter() {
        if tag_name(child) == Some(tag) {
            return Some(child.clone());
        }
        if let Some(found) = find_element(child, tag) {
            return Some(found);
        }
    }
    None
}

fn find_toc_nav(node: &Handle) -> Option<Handle> {
    for child in node.children.borrow().iter() {
        if tag_name(child) == Some("nav") {
            let kind = attribute(child, |name| name == "type" || name.ends_with(":type"));
            if kind.is_some_and(|kind| kind.split_whitespace().any(|k| k == "toc")) {
                return Some(child.clone());
            }
        }
        if let Some(found) = find_toc_nav(child) {
            return Some(found);
        }
    }
    None
}

fn collect_list(list: &Handle, base_dir: &str, out: &mut Vec<TocEntry>) {
    for item in list.children.borrow().iter() {
        if tag_name(item) != Some("li") {
            continue;
        }
        if let Some(anchor) = find_anchor(item) {
            if let Some(href) = attribute(&anchor, |name| name == "href") {
                out.push(TocEntry::new(
                    text_content(&anchor),
                    resolve_href(base_dir, &href),
                ));
            }
        }
        for child in item.children.borrow().iter() {
            if is_list(child) {
                collect_list(child, base_dir, out);
            }
        }
    }
}

/// The link of a list item, ignoring links inside its nested lists.
fn find_anchor(node: &Handle) -> Option<Handle> {
    for child in node.children.borrow().iter() {
        match tag_name(child) {
            Some("a") => return Some(child.clone()),
            Some("ol" | "ul") | None => {}
            Some(_) => {
                if let Some(found) = find_anchor(child) {
                    return Some(found);
                }
            }
        }
    }
    None
}

fn text_content(node: &Handle) -> String {
    fn gather(node: &Handle, out: &mut String) {
        match &node.data {
            NodeData::Text { contents } => out.push_str(&contents.borrow()),
            _ => {
                for child in node.children.borrow().iter() {
                    gather(child, out);
                }
            }
        }
    }

    let mut raw = String::new();
    gather(node, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
