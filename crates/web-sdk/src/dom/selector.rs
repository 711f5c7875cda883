//! CSS selector subset: comma groups, descendant and child combinators,
//! and compound selectors made of type, `*`, `#id`, `.class`, `[attr]` and
//! `[attr=value]`.

use std::iter::Peekable;
use std::str::Chars;

use beacon_core::{BeaconError, BeaconResult};

use super::document::{Document, Element, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    groups: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    /// Each compound with the combinator linking it to the previous one.
    parts: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttributeMatch {
    Exists(String),
    Equals(String, String),
}

impl Selector {
    pub fn parse(input: &str) -> BeaconResult<Self> {
        let groups = split_groups(input)
            .into_iter()
            .map(|group| parse_complex(group.trim(), input))
            .collect::<BeaconResult<Vec<_>>>()?;
        Ok(Self { groups })
    }

    /// True if `node` matches any group of the selector.
    pub fn matches(&self, document: &Document, node: NodeId) -> bool {
        self.groups
            .iter()
            .any(|complex| matches_part(document, node, &complex.parts, complex.parts.len() - 1))
    }
}

fn matches_part(
    document: &Document,
    node: NodeId,
    parts: &[(Combinator, Compound)],
    index: usize,
) -> bool {
    let (combinator, compound) = &parts[index];
    let Some(element) = document.element(node) else {
        return false;
    };
    if !compound.matches(element.element()) {
        return false;
    }
    if index == 0 {
        return true;
    }
    match combinator {
        Combinator::Child => document
            .parent(node)
            .is_some_and(|parent| matches_part(document, parent, parts, index - 1)),
        Combinator::Descendant => {
            let mut current = document.parent(node);
            while let Some(ancestor) = current {
                if matches_part(document, ancestor, parts, index - 1) {
                    return true;
                }
                current = document.parent(ancestor);
            }
            false
        }
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attributes.is_empty()
    }

    fn matches(&self, element: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if tag != "*" && !tag.eq_ignore_ascii_case(element.tag()) {
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
        self.attributes.iter().all(|attribute| match attribute {
            AttributeMatch::Exists(name) => element.attribute(name).is_some(),
            AttributeMatch::Equals(name, value) => element.attribute(name) == Some(value.as_str()),
        })
    }
}

/// Split at top-level commas; commas inside brackets or quotes belong to
/// an attribute value.
fn split_groups(input: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                groups.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    groups.push(&input[start..]);
    groups
}

fn parse_complex(group: &str, input: &str) -> BeaconResult<Complex> {
    if group.is_empty() {
        return Err(invalid(input, "empty selector"));
    }

    let mut chars = group.chars().peekable();
    let mut parts: Vec<(Combinator, Compound)> = Vec::new();
    let mut pending: Option<Combinator> = None;

    loop {
        let mut saw_space = false;
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
            saw_space = true;
        }
        match chars.peek() {
            None => break,
            Some('>') => {
                if parts.is_empty() || pending == Some(Combinator::Child) {
                    return Err(invalid(input, "dangling '>'"));
                }
                chars.next();
                pending = Some(Combinator::Child);
                continue;
            }
            Some(_) => {
                if saw_space && !parts.is_empty() && pending.is_none() {
                    pending = Some(Combinator::Descendant);
                }
            }
        }

        let compound = parse_compound(&mut chars, input)?;
        let combinator = if parts.is_empty() {
            Combinator::Descendant
        } else {
            pending
                .take()
                .ok_or_else(|| invalid(input, "missing combinator"))?
        };
        parts.push((combinator, compound));
    }

    if pending.is_some() {
        return Err(invalid(input, "selector ends with a combinator"));
    }
    Ok(Complex { parts })
}

fn parse_compound(chars: &mut Peekable<Chars<'_>>, input: &str) -> BeaconResult<Compound> {
    let mut compound = Compound::default();

    while let Some(&c) = chars.peek() {
        match c {
            '*' => {
                chars.next();
                compound.tag = Some("*".into());
            }
            '#' => {
                chars.next();
                compound.id = Some(identifier(chars, input)?);
            }
            '.' => {
                chars.next();
                compound.classes.push(identifier(chars, input)?);
            }
            '[' => {
                chars.next();
                compound.attributes.push(attribute(chars, input)?);
            }
            c if c.is_whitespace() || c == '>' => break,
            c if is_identifier_char(c) && compound.is_empty() => {
                compound.tag = Some(identifier(chars, input)?);
            }
            other => return Err(invalid(input, &format!("unexpected character '{other}'"))),
        }
    }

    if compound.is_empty() {
        return Err(invalid(input, "empty compound selector"));
    }
    Ok(compound)
}

fn attribute(chars: &mut Peekable<Chars<'_>>, input: &str) -> BeaconResult<AttributeMatch> {
    let name = identifier(chars, input)?;
    match chars.next() {
        Some(']') => Ok(AttributeMatch::Exists(name)),
        Some('=') => {
            let value = match chars.peek() {
                Some(&quote @ ('"' | '\'')) => {
                    chars.next();
                    let mut value = String::new();
                    loop {
                        match chars.next() {
                            Some(c) if c == quote => break,
                            Some(c) => value.push(c),
                            None => return Err(invalid(input, "unterminated string")),
                        }
                    }
                    value
                }
                _ => identifier(chars, input)?,
            };
            match chars.next() {
                Some(']') => Ok(AttributeMatch::Equals(name, value)),
                _ => Err(invalid(input, "expected ']'")),
            }
        }
        _ => Err(invalid(input, "malformed attribute selector")),
    }
}

fn identifier(chars: &mut Peekable<Chars<'_>>, input: &str) -> BeaconResult<String> {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if !is_identifier_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    if ident.is_empty() {
        return Err(invalid(input, "expected identifier"));
    }
    Ok(ident)
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn invalid(input: &str, reason: &str) -> BeaconError {
    BeaconError::Selector(format!("'{input}': {reason}"))
}
