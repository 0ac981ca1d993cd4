//! Directive expansion for query templates.
//!
//! Supported tags: `{{if key}}`, `{{else}}`, `{{end}}` and `{{key}}`. Conditionals nest.
//! Value tags only splice [`SqlValue::Ident`] values; everything else goes through
//! positional binding.

use super::value::{QueryParams, SqlValue};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug)]
enum Node<'a> {
    Text(&'a str),
    Value(&'a str),
    If {
        key: &'a str,
        then: Vec<Node<'a>>,
        otherwise: Vec<Node<'a>>,
    },
}

struct Frame<'a> {
    key: &'a str,
    then: Vec<Node<'a>>,
    otherwise: Option<Vec<Node<'a>>>,
}

/// Expand directives in `template`. `None` renders with no data at all.
pub(crate) fn expand(template: &str, params: Option<&QueryParams>) -> Result<String, String> {
    let nodes = parse(template)?;
    let mut out = String::with_capacity(template.len());
    emit(&nodes, params, &mut out)?;
    Ok(out)
}

fn parse(template: &str) -> Result<Vec<Node<'_>>, String> {
    let mut root = Vec::new();
    let mut stack: Vec<Frame<'_>> = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        if start > 0 {
            sink(&mut root, &mut stack).push(Node::Text(&rest[..start]));
        }

        let after = &rest[start + OPEN.len()..];
        let end = after
            .find(CLOSE)
            .ok_or_else(|| "unterminated `{{` directive".to_string())?;
        let tag = after[..end].trim();
        rest = &after[end + CLOSE.len()..];

        match tag {
            "end" => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| "`{{end}}` without a matching `{{if}}`".to_string())?;
                let node = Node::If {
                    key: frame.key,
                    then: frame.then,
                    otherwise: frame.otherwise.unwrap_or_default(),
                };
                sink(&mut root, &mut stack).push(node);
            }
            "else" => {
                let frame = stack
                    .last_mut()
                    .ok_or_else(|| "`{{else}}` outside of an `{{if}}` block".to_string())?;
                if frame.otherwise.is_some() {
                    return Err(format!("duplicate `{{{{else}}}}` in `if {}`", frame.key));
                }
                frame.otherwise = Some(Vec::new());
            }
            _ => {
                if let Some(key) = tag.strip_prefix("if ") {
                    let key = key.trim();
                    if !is_identifier(key) {
                        return Err(format!("invalid condition key `{key}`"));
                    }
                    stack.push(Frame {
                        key,
                        then: Vec::new(),
                        otherwise: None,
                    });
                } else if is_identifier(tag) {
                    sink(&mut root, &mut stack).push(Node::Value(tag));
                } else {
                    return Err(format!("unknown directive `{{{{{tag}}}}}`"));
                }
            }
        }
    }

    if !rest.is_empty() {
        sink(&mut root, &mut stack).push(Node::Text(rest));
    }

    if let Some(frame) = stack.pop() {
        return Err(format!("`{{{{if {}}}}}` is never closed", frame.key));
    }

    Ok(root)
}

fn sink<'s, 'a>(root: &'s mut Vec<Node<'a>>, stack: &'s mut [Frame<'a>]) -> &'s mut Vec<Node<'a>> {
    match stack.last_mut() {
        Some(frame) => match frame.otherwise.as_mut() {
            Some(otherwise) => otherwise,
            None => &mut frame.then,
        },
        None => root,
    }
}

fn emit(nodes: &[Node<'_>], params: Option<&QueryParams>, out: &mut String) -> Result<(), String> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Value(key) => match params.and_then(|params| params.get(key)) {
                Some(SqlValue::Ident(ident)) => out.push_str(ident),
                Some(_) => {
                    return Err(format!(
                        "`{{{{{key}}}}}` can only interpolate identifiers; bind it as `${key}`"
                    ));
                }
                None => return Err(format!("no value for `{{{{{key}}}}}`")),
            },
            Node::If {
                key,
                then,
                otherwise,
            } => {
                let truthy = params
                    .and_then(|params| params.get(key))
                    .is_some_and(SqlValue::is_truthy);
                emit(if truthy { then } else { otherwise }, params, out)?;
            }
        }
    }
    Ok(())
}

pub(crate) fn is_identifier_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn is_identifier(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.bytes().all(is_identifier_byte)
}
