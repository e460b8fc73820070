//! Incremental text → rules builder.
//!
//! Consumes raw Geoff source left to right: skips blank space and `#`
//! comments, carves out descriptor fragments at their matching delimiters,
//! folds connector continuations into the previous rule, and hands `{…}`
//! property literals to `serde_json`.

use crate::ast::{Descriptor, PropertyMap, Rule, Subgraph};
use crate::error::{Error, Result};
use crate::lexer::Lexer;

const CONNECTOR_CHARS: &[char] = &['-', '<', '=', '>'];

pub fn parse(source: &str) -> Result<Subgraph> {
    let mut subgraph = Subgraph::new();
    parse_into(&mut subgraph, source)?;
    Ok(subgraph)
}

pub(crate) fn parse_into(subgraph: &mut Subgraph, source: &str) -> Result<()> {
    let mut pos = 0;

    while let Some(char) = source[pos..].chars().next() {
        if char.is_whitespace() {
            pos += char.len_utf8();
            continue;
        }
        match char {
            '#' => {
                pos = match source[pos..].find('\n') {
                    Some(nl) => pos + nl + 1,
                    None => source.len(),
                };
            }
            '(' => pos = parse_fragment(subgraph, source, pos, ')')?,
            '[' => pos = parse_fragment(subgraph, source, pos, ']')?,
            '|' => pos = parse_fragment(subgraph, source, pos, '|')?,
            '-' | '<' | '=' | '>' => pos = parse_connector_run(subgraph, source, pos)?,
            '{' => pos = parse_property_literal(subgraph, source, pos)?,
            other => {
                return Err(Error::syntax(
                    pos,
                    format!("unexpected character {other:?}"),
                ));
            }
        }
    }
    Ok(())
}

fn tokenize_fragment(fragment: &str, offset: usize) -> Result<Descriptor> {
    let tokens = Lexer::new(fragment).tokenize().map_err(|e| match e {
        Error::Syntax { position, message } => Error::syntax(offset + position, message),
        other => other,
    })?;
    Ok(Descriptor::new(tokens))
}

/// One delimited fragment (`(…)`, `[…]`, `|…|`). Appended to the previous
/// rule when that rule's descriptor ends with a connector, otherwise it
/// starts a new rule.
fn parse_fragment(subgraph: &mut Subgraph, source: &str, pos: usize, close: char) -> Result<usize> {
    let Some(rel) = source[pos + 1..].find(close) else {
        return Err(Error::syntax(
            pos,
            format!("unterminated descriptor, expected {close:?}"),
        ));
    };
    let end = pos + 1 + rel + close.len_utf8();
    let descriptor = tokenize_fragment(&source[pos..end], pos)?;

    match subgraph.last_mut() {
        Some(rule) if rule.descriptor.ends_with_connector() => rule.descriptor.concat(descriptor),
        _ => subgraph.push(Rule::new(descriptor, None)),
    }
    Ok(end)
}

/// A run over `-<=>` is its own connector-only fragment; it always continues
/// the previous rule's descriptor.
fn parse_connector_run(subgraph: &mut Subgraph, source: &str, pos: usize) -> Result<usize> {
    let rel = source[pos..]
        .find(|c| !CONNECTOR_CHARS.contains(&c))
        .unwrap_or(source.len() - pos);
    let end = pos + rel;
    let descriptor = tokenize_fragment(&source[pos..end], pos)?;

    let Some(rule) = subgraph.last_mut() else {
        return Err(Error::syntax(pos, "connector with no rule to continue"));
    };
    rule.descriptor.concat(descriptor);
    Ok(end)
}

/// `{…}` property literal, merged into the last rule's data.
///
/// Object values may themselves contain `}`, so the literal's extent is not
/// known up front: each successive `}` is tried as the end until one slice
/// parses as a JSON object.
fn parse_property_literal(subgraph: &mut Subgraph, source: &str, pos: usize) -> Result<usize> {
    for (close, _) in source[pos..].match_indices('}') {
        let end = pos + close + 1;
        if let Ok(data) = serde_json::from_str::<PropertyMap>(&source[pos..end]) {
            subgraph.merge_data(data, pos)?;
            return Ok(end);
        }
    }
    Err(Error::syntax(pos, "unparsable property literal"))
}
