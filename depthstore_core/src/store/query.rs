//! Query evaluation for the bundled emulators
//!
//! Understands the subset of the document store's SQL dialect that the
//! emulators need:
//!
//! ```text
//! SELECT [TOP n] * FROM <alias> [WHERE <alias>.<prop>[.<prop>...] (= | != | <>) <literal> [AND ...]]
//! ```
//!
//! Literals are single- or double-quoted strings, numbers, `true`, `false` and
//! `null`. Keywords are case-insensitive. A predicate over a missing property is
//! false, whatever the operator.
//!
//! The repository layer never calls into this module: query text travels to the
//! store untouched, and it is the store that interprets it.

use serde_json::{Number, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("unexpected character '{found}' at offset {offset}")]
    UnexpectedCharacter { found: char, offset: usize },

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("expected {expected}, found {found}")]
    Expected { expected: String, found: String },

    #[error("unknown alias '{found}', the collection is aliased as '{alias}'")]
    UnknownAlias { alias: String, found: String },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(Number),
    Star,
    Dot,
    Eq,
    Ne,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("'{s}'"),
            Token::Str(s) => format!("string '{s}'"),
            Token::Num(n) => format!("number {n}"),
            Token::Star => "'*'".to_string(),
            Token::Dot => "'.'".to_string(),
            Token::Eq => "'='".to_string(),
            Token::Ne => "'!='".to_string(),
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Ident(s) if s.eq_ignore_ascii_case(keyword))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
}

/// `<alias>.<path> <op> <value>`
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub path: Vec<String>,
    pub op: Comparison,
    pub value: Value,
}

impl Predicate {
    fn matches(&self, document: &Value) -> bool {
        let mut current = document;
        for segment in &self.path {
            match current.get(segment) {
                Some(next) => current = next,
                None => return false,
            }
        }

        let equal = values_equal(current, &self.value);
        match self.op {
            Comparison::Eq => equal,
            Comparison::Ne => !equal,
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// A parsed query
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub top: Option<usize>,
    pub alias: String,
    pub filters: Vec<Predicate>,
}

impl Query {
    pub fn parse(text: &str) -> Result<Self, QueryError> {
        let tokens = tokenize(text)?;
        Parser { tokens, pos: 0 }.query()
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.filters.iter().all(|p| p.matches(document))
    }

    /// Filter `documents` in their given order, honouring `TOP`
    pub fn execute<'a, I>(&self, documents: I) -> Vec<Value>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let matching = documents.into_iter().filter(|doc| self.matches(doc)).cloned();
        match self.top {
            Some(n) => matching.take(n).collect(),
            None => matching.collect(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, QueryError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Eq);
                i += 1;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::Ne);
                i += 2;
            }
            '<' if next == Some('>') => {
                tokens.push(Token::Ne);
                i += 2;
            }
            '\'' | '"' => {
                let quote = c;
                let mut literal = String::new();
                i += 1;
                loop {
                    let Some(&ch) = chars.get(i) else {
                        return Err(QueryError::UnterminatedString);
                    };
                    if ch == quote {
                        if chars.get(i + 1) == Some(&quote) {
                            literal.push(quote);
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    if ch == '\\' {
                        if let Some(&escaped) = chars.get(i + 1) {
                            literal.push(escaped);
                            i += 2;
                            continue;
                        }
                        return Err(QueryError::UnterminatedString);
                    }
                    literal.push(ch);
                    i += 1;
                }
                tokens.push(Token::Str(literal));
            }
            c if c.is_ascii_digit() || (c == '-' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while i < chars.len()
                    && (chars[i].is_ascii_digit() || matches!(chars[i], '.' | 'e' | 'E' | '+' | '-'))
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let number = text
                    .parse::<Number>()
                    .map_err(|_| QueryError::InvalidNumber(text.clone()))?;
                tokens.push(Token::Num(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => {
                return Err(QueryError::UnexpectedCharacter {
                    found: other,
                    offset: i,
                });
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn found(&self) -> String {
        self.peek()
            .map(Token::describe)
            .unwrap_or_else(|| "end of query".to_string())
    }

    fn expected(&self, expected: &str) -> QueryError {
        QueryError::Expected {
            expected: expected.to_string(),
            found: self.found(),
        }
    }

    fn keyword(&mut self, keyword: &str) -> Result<(), QueryError> {
        if self.peek().is_some_and(|t| t.is_keyword(keyword)) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.expected(keyword))
        }
    }

    fn optional_keyword(&mut self, keyword: &str) -> bool {
        self.keyword(keyword).is_ok()
    }

    fn token(&mut self, token: Token) -> Result<(), QueryError> {
        if self.peek() == Some(&token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.expected(&token.describe()))
        }
    }

    fn identifier(&mut self, what: &str) -> Result<String, QueryError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.expected(what)),
        }
    }

    fn query(mut self) -> Result<Query, QueryError> {
        self.keyword("SELECT")?;

        let top = if self.optional_keyword("TOP") {
            match self.peek() {
                Some(Token::Num(n)) if n.as_u64().is_some() => {
                    let n = n.as_u64().unwrap_or_default() as usize;
                    self.pos += 1;
                    Some(n)
                }
                _ => return Err(self.expected("a non-negative integer after TOP")),
            }
        } else {
            None
        };

        self.token(Token::Star)?;
        self.keyword("FROM")?;
        let alias = self.identifier("collection alias")?;

        let mut filters = Vec::new();
        if self.optional_keyword("WHERE") {
            loop {
                filters.push(self.predicate(&alias)?);
                if !self.optional_keyword("AND") {
                    break;
                }
            }
        }

        if self.peek().is_some() {
            return Err(self.expected("end of query"));
        }

        Ok(Query {
            top,
            alias,
            filters,
        })
    }

    fn predicate(&mut self, alias: &str) -> Result<Predicate, QueryError> {
        let root = self.identifier("property reference")?;
        if root != alias {
            return Err(QueryError::UnknownAlias {
                alias: alias.to_string(),
                found: root,
            });
        }

        let mut path = Vec::new();
        while self.peek() == Some(&Token::Dot) {
            self.pos += 1;
            path.push(self.identifier("property name")?);
        }
        if path.is_empty() {
            return Err(self.expected("'.'"));
        }

        let op = match self.peek() {
            Some(Token::Eq) => Comparison::Eq,
            Some(Token::Ne) => Comparison::Ne,
            _ => return Err(self.expected("'=' or '!='")),
        };
        self.pos += 1;

        let value = match self.peek() {
            Some(Token::Str(s)) => Value::String(s.clone()),
            Some(Token::Num(n)) => Value::Number(n.clone()),
            Some(t) if t.is_keyword("true") => Value::Bool(true),
            Some(t) if t.is_keyword("false") => Value::Bool(false),
            Some(t) if t.is_keyword("null") => Value::Null,
            _ => return Err(self.expected("a literal")),
        };
        self.pos += 1;

        Ok(Predicate { path, op, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn docs() -> Vec<Value> {
        vec![
            json!({"id": "1", "name": "Milk", "description": "2%", "completed": false}),
            json!({"id": "2", "name": "Bread", "description": "rye", "completed": true}),
            json!({"id": "3", "name": "Eggs", "description": "dozen", "completed": false, "qty": 12}),
        ]
    }

    #[test]
    fn test_select_all() {
        let query = Query::parse("SELECT * FROM c").unwrap();
        assert_eq!(query.alias, "c");
        assert!(query.filters.is_empty());
        assert_eq!(query.execute(&docs()).len(), 3);
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let query = Query::parse("select top 2 * from items where items.completed = FALSE").unwrap();
        assert_eq!(query.top, Some(2));
        let ids: Vec<_> = query
            .execute(&docs())
            .into_iter()
            .map(|d| d["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!("1"), json!("3")]);
    }

    #[test]
    fn test_where_and_preserves_order() {
        let query =
            Query::parse("SELECT * FROM c WHERE c.completed = false AND c.name != 'Milk'").unwrap();
        let result = query.execute(&docs());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0]["name"], "Eggs");
    }

    #[test]
    fn test_numbers_compare_numerically() {
        let query = Query::parse("SELECT * FROM c WHERE c.qty = 12.0").unwrap();
        assert_eq!(query.execute(&docs()).len(), 1);
    }

    #[test]
    fn test_missing_property_never_matches() {
        let eq = Query::parse("SELECT * FROM c WHERE c.qty = 1").unwrap();
        let ne = Query::parse("SELECT * FROM c WHERE c.qty <> 1").unwrap();
        assert_eq!(eq.execute(&docs()).len(), 0);
        assert_eq!(ne.execute(&docs()).len(), 1);
    }

    #[test]
    fn test_string_escapes() {
        let query = Query::parse(r#"SELECT * FROM c WHERE c.name = 'O''Brien' AND c.note = "a\"b""#)
            .unwrap();
        assert_eq!(query.filters[0].value, json!("O'Brien"));
        assert_eq!(query.filters[1].value, json!("a\"b"));
    }

    #[test]
    fn test_nested_paths() {
        let query = Query::parse("SELECT * FROM c WHERE c.address.city = 'Oslo'").unwrap();
        assert_eq!(query.filters[0].path, vec!["address", "city"]);
        assert!(query.matches(&json!({"address": {"city": "Oslo"}})));
        assert!(!query.matches(&json!({"address": "Oslo"})));
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            Query::parse("DELETE FROM c"),
            Err(QueryError::Expected { .. })
        ));
        assert!(matches!(
            Query::parse("SELECT * FROM c WHERE d.id = '1'"),
            Err(QueryError::UnknownAlias { .. })
        ));
        assert!(matches!(
            Query::parse("SELECT * FROM c WHERE c.id = 'open"),
            Err(QueryError::UnterminatedString)
        ));
        assert!(matches!(
            Query::parse("SELECT * FROM c; DROP"),
            Err(QueryError::UnexpectedCharacter { found: ';', .. })
        ));
        assert!(matches!(
            Query::parse("SELECT * FROM c ORDER BY c.id"),
            Err(QueryError::Expected { .. })
        ));
        assert!(Query::parse("SELECT TOP -1 * FROM c").is_err());
        assert!(Query::parse("").is_err());
    }

    proptest! {
        #[test]
        fn parse_never_panics(text in "\\PC{0,64}") {
            let _ = Query::parse(&text);
        }

        #[test]
        fn generated_filters_parse(
            alias in "[a-z][a-z0-9_]{0,6}",
            prop in "[a-z][a-zA-Z0-9_]{0,8}",
            value in "[a-zA-Z0-9 %]{0,12}",
            top in proptest::option::of(0usize..1000),
        ) {
            prop_assume!(!["select", "top", "from", "where", "and", "true", "false", "null"]
                .contains(&alias.as_str()));
            let top_clause = top.map(|n| format!("TOP {n} ")).unwrap_or_default();
            let text = format!("SELECT {top_clause}* FROM {alias} WHERE {alias}.{prop} = '{value}'");
            let query = Query::parse(&text).unwrap();
            prop_assert_eq!(query.top, top);
            prop_assert_eq!(&query.alias, &alias);
            prop_assert_eq!(&query.filters[0].path, &vec![prop.clone()]);
            prop_assert_eq!(&query.filters[0].value, &Value::String(value.clone()));
        }
    }
}
