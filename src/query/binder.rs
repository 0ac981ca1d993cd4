use std::sync::Arc;

use thiserror::Error;

use super::{
    render::{expand, is_identifier_byte},
    store::TemplateStore,
    value::{QueryParams, SqlValue},
};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query template `{0}` not found")]
    TemplateNotFound(String),
    #[error("failed to render query template `{name}`: {reason}")]
    Render { name: String, reason: String },
}

/// Rendered SQL plus its positional arguments; `args[n - 1]` binds `$n`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

/// Turns named templates and named values into driver-ready statements.
#[derive(Debug, Clone)]
pub struct QueryBinder {
    templates: Arc<TemplateStore>,
}

impl QueryBinder {
    pub fn new(templates: TemplateStore) -> Self {
        Self {
            templates: Arc::new(templates),
        }
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Render template `name` against `params`.
    ///
    /// Every `$key` outside string literals and comments whose key is present in `params`
    /// becomes a positional marker, numbered in order of first appearance. Repeated keys
    /// share one marker and one argument. Keys the template never mentions are dropped, and
    /// `$key` with no matching entry is left as written.
    pub fn render(&self, name: &str, params: &QueryParams) -> Result<BoundStatement, QueryError> {
        let template = self.template(name)?;
        let sql = expand(template, Some(params)).map_err(|reason| QueryError::Render {
            name: name.to_string(),
            reason,
        })?;
        Ok(bind_positional(&sql, params))
    }

    /// Render template `name` with no data. Conditionals are all false and no
    /// placeholder is rewritten.
    pub fn render_unbound(&self, name: &str) -> Result<BoundStatement, QueryError> {
        let template = self.template(name)?;
        let sql = expand(template, None).map_err(|reason| QueryError::Render {
            name: name.to_string(),
            reason,
        })?;
        Ok(BoundStatement {
            sql,
            args: Vec::new(),
        })
    }

    fn template(&self, name: &str) -> Result<&str, QueryError> {
        self.templates
            .get(name)
            .ok_or_else(|| QueryError::TemplateNotFound(name.to_string()))
    }
}

fn bind_positional(sql: &str, params: &QueryParams) -> BoundStatement {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut seen: Vec<&str> = Vec::new();
    let mut args = Vec::new();
    let mut in_literal = false;
    let mut copied = 0;
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'\'' => in_literal = !in_literal,
            b'-' if !in_literal && bytes.get(index + 1) == Some(&b'-') => {
                index = skip_line_comment(bytes, index);
                continue;
            }
            b'/' if !in_literal && bytes.get(index + 1) == Some(&b'*') => {
                index = skip_block_comment(bytes, index);
                continue;
            }
            b'$' if !in_literal => {
                let start = index + 1;
                let mut end = start;
                while end < bytes.len() && is_identifier_byte(bytes[end]) {
                    end += 1;
                }

                let key = &sql[start..end];
                if let Some(value) = params.get(key).filter(|value| !value.is_ident()) {
                    let position = match seen.iter().position(|known| *known == key) {
                        Some(existing) => existing + 1,
                        None => {
                            seen.push(key);
                            args.push(value.clone());
                            seen.len()
                        }
                    };
                    out.push_str(&sql[copied..index]);
                    out.push('$');
                    out.push_str(&position.to_string());
                    copied = end;
                }

                index = end;
                continue;
            }
            _ => {}
        }
        index += 1;
    }

    out.push_str(&sql[copied..]);
    BoundStatement { sql: out, args }
}

/// Index just past the newline ending the `--` comment at `start`.
fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|byte| *byte == b'\n')
        .map_or(bytes.len(), |offset| start + offset + 1)
}

/// Index just past the `*/` closing the comment at `start`; an unclosed comment runs
/// to the end.
fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start + 2..]
        .windows(2)
        .position(|pair| pair == b"*/")
        .map_or(bytes.len(), |offset| start + 2 + offset + 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binder(body: &str) -> QueryBinder {
        QueryBinder::new(TemplateStore::parse(&format!("-- name: Q\n{body}\n")))
    }

    #[test]
    fn markers_follow_first_appearance() {
        let params = QueryParams::new()
            .with("a", 1)
            .with("b", "two")
            .with("unused", true);
        let bound = binder("SELECT $b, $a, $b").render("Q", &params).expect("bind");

        assert_eq!(bound.sql, "SELECT $1, $2, $1");
        assert_eq!(
            bound.args,
            vec![SqlValue::Text("two".into()), SqlValue::Int(1)]
        );
    }

    #[test]
    fn longest_key_run_is_used() {
        let params = QueryParams::new().with("name", "a").with("name_full", "b");
        let bound = binder("$name_full = $name").render("Q", &params).expect("bind");
        assert_eq!(bound.sql, "$1 = $2");
        assert_eq!(
            bound.args,
            vec![SqlValue::Text("b".into()), SqlValue::Text("a".into())]
        );
    }

    #[test]
    fn unknown_placeholders_are_left_alone() {
        let params = QueryParams::new().with("id", 7_i64);
        let bound = binder("WHERE id = $id AND tag = $tag AND cost > $")
            .render("Q", &params)
            .expect("bind");
        assert_eq!(bound.sql, "WHERE id = $1 AND tag = $tag AND cost > $");
        assert_eq!(bound.args, vec![SqlValue::BigInt(7)]);
    }

    #[test]
    fn string_literals_are_not_scanned() {
        let params = QueryParams::new().with("name", "ann");
        let bound = binder("SELECT '$name', 'it''s $name', $name")
            .render("Q", &params)
            .expect("bind");
        assert_eq!(bound.sql, "SELECT '$name', 'it''s $name', $1");
        assert_eq!(bound.args.len(), 1);
    }

    #[test]
    fn comments_are_copied_without_scanning() {
        let params = QueryParams::new().with("id", 7_i64);
        let bound = binder("SELECT id FROM users -- the user's row, not $id\nWHERE id = $id")
            .render("Q", &params)
            .expect("bind");
        assert_eq!(
            bound.sql,
            "SELECT id FROM users -- the user's row, not $id\nWHERE id = $1"
        );
        assert_eq!(bound.args, vec![SqlValue::BigInt(7)]);

        let bound = binder("SELECT /* don't bind $id */ $id, 'a--b' || $id /* open")
            .render("Q", &params)
            .expect("bind");
        assert_eq!(bound.sql, "SELECT /* don't bind $id */ $1, 'a--b' || $1 /* open");
        assert_eq!(bound.args.len(), 1);
    }

    #[test]
    fn directives_and_placeholders_combine() {
        let params = QueryParams::new()
            .with("Name", "ann")
            .with("name", "ann")
            .with("SortBy", SqlValue::ident("age"))
            .with("limit", 10_i64);
        let bound = binder(
            "SELECT * FROM users WHERE 1 = 1{{if Name}} AND name ILIKE '%' || $name || '%'{{end}} ORDER BY {{SortBy}} LIMIT $limit",
        )
        .render("Q", &params)
        .expect("bind");

        assert_eq!(
            bound.sql,
            "SELECT * FROM users WHERE 1 = 1 AND name ILIKE '%' || $1 || '%' ORDER BY age LIMIT $2"
        );
        assert_eq!(
            bound.args,
            vec![SqlValue::Text("ann".into()), SqlValue::BigInt(10)]
        );
    }

    #[test]
    fn identifiers_are_never_bound_positionally() {
        let params = QueryParams::new().with("SortBy", SqlValue::ident("age"));
        let bound = binder("ORDER BY $SortBy").render("Q", &params).expect("bind");
        assert_eq!(bound.sql, "ORDER BY $SortBy");
        assert!(bound.args.is_empty());
    }

    #[test]
    fn missing_template_is_reported() {
        let err = binder("SELECT 1")
            .render("Nope", &QueryParams::new())
            .expect_err("missing");
        assert!(matches!(err, QueryError::TemplateNotFound(name) if name == "Nope"));
    }

    #[test]
    fn render_errors_carry_template_name() {
        let err = binder("SELECT 1{{if x}}")
            .render("Q", &QueryParams::new())
            .expect_err("unclosed");
        assert!(matches!(err, QueryError::Render { ref name, .. } if name == "Q"));
    }

    #[test]
    fn unbound_render_keeps_placeholders() {
        let bound = binder("SELECT $id{{if id}} AND x{{end}}")
            .render_unbound("Q")
            .expect("render");
        assert_eq!(bound.sql, "SELECT $id");
        assert!(bound.args.is_empty());
    }
}
