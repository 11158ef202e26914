//! Read-only snapshot of a markup document.
//!
//! Patterns never touch a live DOM. A document is parsed once into an
//! [`Element`] tree and queried with a small selector engine that covers
//! what the patterns need: tag names, `.class`, `#id`, `[attr]`,
//! `[attr=value]`, comma groups and the descendant combinator.

use crate::error::{markup_error, PatternResult};
use std::iter::Peekable;
use std::str::CharIndices;

/// A node in the snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element with its attributes and children, in document order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// Parse well-formed (X)HTML markup and return its root element
pub fn parse_document(markup: &str) -> PatternResult<Element> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let document = roxmltree::Document::parse_with_options(markup, options)?;
    Ok(convert(document.root_element()))
}

fn convert(node: roxmltree::Node<'_, '_>) -> Element {
    let attributes = node
        .attributes()
        .map(|attr| (attr.name().to_string(), attr.value().to_string()))
        .collect();

    let children = node
        .children()
        .filter_map(|child| {
            if child.is_element() {
                Some(Node::Element(convert(child)))
            } else if child.is_text() {
                child.text().map(|text| Node::Text(text.to_string()))
            } else {
                None
            }
        })
        .collect();

    Element {
        tag: node.tag_name().name().to_ascii_lowercase(),
        attributes,
        children,
    }
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Direct element children
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Concatenated text of all descendants
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) => element.collect_text(out),
            }
        }
    }

    /// Serialized markup of the children
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            write_node(child, &mut out);
        }
        out
    }

    /// All descendants matching `selector`, in document order
    pub fn select(&self, selector: &Selector) -> Vec<&Element> {
        self.select_with_ancestors(selector)
            .into_iter()
            .map(|(element, _)| element)
            .collect()
    }

    /// First descendant matching `selector`
    pub fn select_first(&self, selector: &Selector) -> Option<&Element> {
        self.select(selector).into_iter().next()
    }

    /// Matching descendants together with their ancestor chain, which
    /// starts at `self` and ends at the match's parent.
    pub fn select_with_ancestors(&self, selector: &Selector) -> Vec<(&Element, Vec<&Element>)> {
        let mut found = Vec::new();
        let mut ancestors = vec![self];
        walk(self, &mut ancestors, selector, &mut found);
        found
    }
}

fn walk<'a>(
    element: &'a Element,
    ancestors: &mut Vec<&'a Element>,
    selector: &Selector,
    found: &mut Vec<(&'a Element, Vec<&'a Element>)>,
) {
    for child in element.child_elements() {
        if selector.matches(child, ancestors) {
            found.push((child, ancestors.clone()));
        }
        ancestors.push(child);
        walk(child, ancestors, selector, found);
        ancestors.pop();
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&escape(text, false)),
        Node::Element(element) => {
            out.push('<');
            out.push_str(&element.tag);
            for (key, value) in &element.attributes {
                out.push_str(&format!(" {}=\"{}\"", key, escape(value, true)));
            }
            if element.children.is_empty() {
                out.push_str("/>");
            } else {
                out.push('>');
                out.push_str(&element.inner_html());
                out.push_str(&format!("</{}>", element.tag));
            }
        }
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// One compound selector such as `input.check[type=checkbox]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

impl Compound {
    pub fn tag(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_ascii_lowercase()),
            ..Default::default()
        }
    }

    pub fn class(class: &str) -> Self {
        Self::default().with_class(class)
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn with_attr(mut self, name: &str, value: Option<&str>) -> Self {
        self.attributes
            .push((name.to_string(), value.map(str::to_string)));
        self
    }

    fn matches(&self, element: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if &element.tag != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.id() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }
        self.attributes.iter().all(|(name, value)| match value {
            Some(expected) => element.attr(name) == Some(expected.as_str()),
            None => element.has_attr(name),
        })
    }
}

/// A selector group: alternatives separated by commas, each a chain of
/// compounds joined by the descendant combinator.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    alternatives: Vec<Vec<Compound>>,
}

impl From<Compound> for Selector {
    fn from(compound: Compound) -> Self {
        Self {
            alternatives: vec![vec![compound]],
        }
    }
}

impl Selector {
    /// Descendant chain, outermost compound first
    pub fn chain(compounds: Vec<Compound>) -> Self {
        Self {
            alternatives: vec![compounds],
        }
    }

    pub fn class(class: &str) -> Self {
        Compound::class(class).into()
    }

    pub fn parse(input: &str) -> PatternResult<Self> {
        let mut alternatives = Vec::new();
        for group in input.split(',') {
            let chain = group
                .split_whitespace()
                .map(parse_compound)
                .collect::<PatternResult<Vec<_>>>()?;
            if chain.is_empty() {
                return Err(markup_error(&format!("Empty selector in '{}'", input)));
            }
            alternatives.push(chain);
        }
        Ok(Self { alternatives })
    }

    /// Match `element` given its ancestors, outermost first
    pub fn matches(&self, element: &Element, ancestors: &[&Element]) -> bool {
        self.alternatives
            .iter()
            .any(|chain| chain_matches(chain, element, ancestors))
    }
}

fn chain_matches(chain: &[Compound], element: &Element, ancestors: &[&Element]) -> bool {
    let Some((last, rest)) = chain.split_last() else {
        return false;
    };
    if !last.matches(element) {
        return false;
    }

    // Descendant combinators only, so the nearest matching ancestor is
    // always the right choice.
    let mut remaining = rest.iter().rev().peekable();
    for ancestor in ancestors.iter().rev() {
        match remaining.peek() {
            Some(compound) if compound.matches(ancestor) => {
                remaining.next();
            }
            Some(_) => {}
            None => break,
        }
    }
    remaining.peek().is_none()
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_name(chars: &mut Peekable<CharIndices<'_>>) -> String {
    let mut name = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if !is_name_char(c) {
            break;
        }
        name.push(c);
        chars.next();
    }
    name
}

fn parse_compound(input: &str) -> PatternResult<Compound> {
    let mut compound = Compound::default();
    let mut chars = input.char_indices().peekable();

    while let Some(&(_, c)) = chars.peek() {
        match c {
            '*' => {
                chars.next();
            }
            '.' | '#' => {
                chars.next();
                let name = take_name(&mut chars);
                if name.is_empty() {
                    return Err(markup_error(&format!("Missing name after '{}' in '{}'", c, input)));
                }
                if c == '.' {
                    compound.classes.push(name);
                } else {
                    compound.id = Some(name);
                }
            }
            '[' => {
                chars.next();
                let name = take_name(&mut chars);
                let mut value = None;
                if let Some(&(_, '=')) = chars.peek() {
                    chars.next();
                    let mut raw = String::new();
                    for (_, c) in chars.by_ref() {
                        if c == ']' {
                            break;
                        }
                        raw.push(c);
                    }
                    value = Some(raw.trim_matches(|c| c == '"' || c == '\'').to_string());
                } else if let Some(&(_, ']')) = chars.peek() {
                    chars.next();
                } else {
                    return Err(markup_error(&format!("Unterminated attribute selector in '{}'", input)));
                }
                if name.is_empty() {
                    return Err(markup_error(&format!("Missing attribute name in '{}'", input)));
                }
                compound.attributes.push((name, value));
            }
            c if is_name_char(c) && compound.tag.is_none() => {
                compound.tag = Some(take_name(&mut chars).to_ascii_lowercase());
            }
            _ => {
                return Err(markup_error(&format!("Unsupported selector '{}'", input)));
            }
        }
    }

    Ok(compound)
}
