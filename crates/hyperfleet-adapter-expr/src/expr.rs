//! The field-access expression language: field access (`a.b.c`), optional
//! chaining (`a?.b.c`), `orValue(default)`, equality (`==`/`!=`) and the boolean
//! combinators `&&`/`||`. Hand-rolled recursive-descent parser and tree-walking
//! evaluator, there is no grammar complex enough here to earn a parser-combinator
//! dependency.
//!
//! A bare leading identifier is resolved against the scope tree's top level first
//! (`event`, `params`, `resources`, `adapter`); anything else is treated as shorthand
//! for `params.<ident>`, since most `when` guards and payload expressions read a
//! step's own captured params directly (`clusterPhase == "Ready"` rather than the
//! more verbose `params.clusterPhase == "Ready"`).

use hyperfleet_adapter_core::ExpressionError;

pub(crate) const NAMESPACES: [&str; 4] = ["event", "params", "resources", "adapter"];

/// Evaluates `expr` against `scope` and requires a boolean result, used for `when`
/// guards.
pub fn eval_bool(expr: &str, scope: &serde_json::Value) -> Result<bool, ExpressionError> {
    let value = eval_value(expr, scope)?;
    match value {
        serde_json::Value::Bool(b) => Ok(b),
        other => Err(ExpressionError::TypeMismatch {
            expected: "bool".to_string(),
            got: type_name(&other).to_string(),
        }),
    }
}

/// Evaluates `expr` against `scope` and returns whatever JSON value it produces,/// used inside `payload` step leaves, where any scalar or object is valid.
pub fn eval_value(expr: &str, scope: &serde_json::Value) -> Result<serde_json::Value, ExpressionError> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser { tokens: &tokens, pos: 0, expr };
    let ast = parser.parse_or()?;
    parser.expect_eof()?;
    ast.eval(scope, expr)
}

fn type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    True,
    False,
    Null,
    Dot,
    QDot,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, ExpressionError> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let parse_err = |message: String| ExpressionError::Parse { expr: expr.to_string(), message };

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '?' => {
                if chars.get(i + 1) == Some(&'.') {
                    tokens.push(Token::QDot);
                    i += 2;
                } else {
                    return Err(parse_err("stray '?' not followed by '.'".to_string()));
                }
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::EqEq);
                    i += 2;
                } else {
                    return Err(parse_err("'=' must be '=='".to_string()));
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::NotEq);
                    i += 2;
                } else {
                    return Err(parse_err("'!' must be '!='".to_string()));
                }
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Token::AndAnd);
                    i += 2;
                } else {
                    return Err(parse_err("'&' must be '&&'".to_string()));
                }
            }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Token::OrOr);
                    i += 2;
                } else {
                    return Err(parse_err("'|' must be '||'".to_string()));
                }
            }
            '"' => {
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(parse_err("unterminated string literal".to_string())),
                        Some('"') => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            s.push(*ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let num = text
                    .parse::<f64>()
                    .map_err(|_| parse_err(format!("invalid number literal {text:?}")))?;
                tokens.push(Token::Num(num));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(match text.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    _ => Token::Ident(text),
                });
            }
            other => return Err(parse_err(format!("unexpected character {other:?}"))),
        }
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct PathSeg {
    name: String,
    optional: bool,
}

#[derive(Debug, Clone)]
enum Literal {
    Bool(bool),
    Num(f64),
    Str(String),
    Null,
}

impl Literal {
    fn into_value(self) -> serde_json::Value {
        match self {
            Literal::Bool(b) => serde_json::Value::Bool(b),
            Literal::Num(n) => serde_json::json!(n),
            Literal::Str(s) => serde_json::Value::String(s),
            Literal::Null => serde_json::Value::Null,
        }
    }
}

#[derive(Debug, Clone)]
enum Ast {
    Lit(Literal),
    Path(Vec<PathSeg>),
    OrValue(Vec<PathSeg>, Literal),
    Eq(Box<Ast>, Box<Ast>, bool),
    And(Box<Ast>, Box<Ast>),
    Or(Box<Ast>, Box<Ast>),
}

impl Ast {
    fn eval(&self, scope: &serde_json::Value, expr: &str) -> Result<serde_json::Value, ExpressionError> {
        match self {
            Ast::Lit(lit) => Ok(lit.clone().into_value()),
            Ast::Path(segments) => {
                let resolved = resolve_path(segments, scope, expr)?;
                resolved.ok_or_else(|| ExpressionError::Eval {
                    expr: expr.to_string(),
                    message: "optional chain produced no value and is missing orValue(...)".to_string(),
                })
            }
            Ast::OrValue(segments, default) => {
                let resolved = resolve_path(segments, scope, expr)?;
                Ok(resolved.unwrap_or_else(|| default.clone().into_value()))
            }
            Ast::Eq(lhs, rhs, negate) => {
                let l = lhs.eval(scope, expr)?;
                let r = rhs.eval(scope, expr)?;
                let equal = l == r;
                Ok(serde_json::Value::Bool(if *negate { !equal } else { equal }))
            }
            Ast::And(lhs, rhs) => {
                let l = lhs.eval_bool(scope, expr)?;
                Ok(serde_json::Value::Bool(l && rhs.eval_bool(scope, expr)?))
            }
            Ast::Or(lhs, rhs) => {
                let l = lhs.eval_bool(scope, expr)?;
                Ok(serde_json::Value::Bool(l || rhs.eval_bool(scope, expr)?))
            }
        }
    }

    fn eval_bool(&self, scope: &serde_json::Value, expr: &str) -> Result<bool, ExpressionError> {
        match self.eval(scope, expr)? {
            serde_json::Value::Bool(b) => Ok(b),
            other => Err(ExpressionError::TypeMismatch {
                expected: "bool".to_string(),
                got: type_name(&other).to_string(),
            }),
        }
    }
}

fn resolve_path(
    segments: &[PathSeg],
    scope: &serde_json::Value,
    expr: &str,
) -> Result<Option<serde_json::Value>, ExpressionError> {
    let mut current: Option<serde_json::Value> = Some(scope.clone());
    for seg in segments {
        current = match current {
            None => None,
            Some(v) => match v.get(&seg.name) {
                Some(found) => Some(found.clone()),
                None => {
                    if seg.optional {
                        None
                    } else {
                        return Err(ExpressionError::Eval {
                            expr: expr.to_string(),
                            message: format!("field not found: {}", seg.name),
                        });
                    }
                }
            },
        };
    }
    Ok(current)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    expr: &'a str,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_err(&self, message: impl Into<String>) -> ExpressionError {
        ExpressionError::Parse {
            expr: self.expr.to_string(),
            message: message.into(),
        }
    }

    fn expect_eof(&self) -> Result<(), ExpressionError> {
        if self.pos != self.tokens.len() {
            return Err(self.parse_err(format!("unexpected trailing tokens at position {}", self.pos)));
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Ast, ExpressionError> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Some(Token::OrOr)) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Ast::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Ast, ExpressionError> {
        let mut lhs = self.parse_eq()?;
        while matches!(self.peek(), Some(Token::AndAnd)) {
            self.advance();
            let rhs = self.parse_eq()?;
            lhs = Ast::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_eq(&mut self) -> Result<Ast, ExpressionError> {
        let mut lhs = self.parse_postfix()?;
        loop {
            let negate = match self.peek() {
                Some(Token::EqEq) => false,
                Some(Token::NotEq) => true,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_postfix()?;
            lhs = Ast::Eq(Box::new(lhs), Box::new(rhs), negate);
        }
        Ok(lhs)
    }

    /// Parses a literal or a dotted path, optionally terminated by `.orValue(lit)`.
    fn parse_postfix(&mut self) -> Result<Ast, ExpressionError> {
        if let Some(lit) = self.try_parse_literal()? {
            return Ok(Ast::Lit(lit));
        }

        let first = match self.advance() {
            Some(Token::Ident(name)) => name.clone(),
            other => return Err(self.parse_err(format!("expected an identifier or literal, got {other:?}"))),
        };
        let mut segments = vec![PathSeg { name: first, optional: false }];

        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.advance();
                    match self.advance() {
                        Some(Token::Ident(name)) if name == "orValue" => {
                            return self.parse_or_value_call(segments);
                        }
                        Some(Token::Ident(name)) => {
                            segments.push(PathSeg { name: name.clone(), optional: false });
                        }
                        other => return Err(self.parse_err(format!("expected field name after '.', got {other:?}"))),
                    }
                }
                Some(Token::QDot) => {
                    self.advance();
                    match self.advance() {
                        Some(Token::Ident(name)) => {
                            segments.push(PathSeg { name: name.clone(), optional: true });
                        }
                        other => return Err(self.parse_err(format!("expected field name after '?.', got {other:?}"))),
                    }
                }
                _ => break,
            }
        }

        Ok(normalize_root(segments))
    }

    fn parse_or_value_call(&mut self, segments: Vec<PathSeg>) -> Result<Ast, ExpressionError> {
        match self.advance() {
            Some(Token::LParen) => {}
            other => return Err(self.parse_err(format!("expected '(' after orValue, got {other:?}"))),
        }
        let default = self
            .try_parse_literal()?
            .ok_or_else(|| self.parse_err("orValue(...) requires a literal default"))?;
        match self.advance() {
            Some(Token::RParen) => {}
            other => return Err(self.parse_err(format!("expected ')' to close orValue(...), got {other:?}"))),
        }
        let segments = match normalize_root(segments) {
            Ast::Path(segs) => segs,
            _ => unreachable!("normalize_root always returns Ast::Path for a raw segment list"),
        };
        Ok(Ast::OrValue(segments, default))
    }

    fn try_parse_literal(&mut self) -> Result<Option<Literal>, ExpressionError> {
        let lit = match self.peek() {
            Some(Token::Str(s)) => Literal::Str(s.clone()),
            Some(Token::Num(n)) => Literal::Num(*n),
            Some(Token::True) => Literal::Bool(true),
            Some(Token::False) => Literal::Bool(false),
            Some(Token::Null) => Literal::Null,
            _ => return Ok(None),
        };
        self.advance();
        Ok(Some(lit))
    }
}

/// If the first segment names one of the reserved namespace roots, the path is used
/// as-is; otherwise the whole path is relative to `params`.
fn normalize_root(segments: Vec<PathSeg>) -> Ast {
    match segments.first() {
        Some(first) if NAMESPACES.contains(&first.name.as_str()) => Ast::Path(segments),
        _ => {
            let mut full = vec![PathSeg { name: "params".to_string(), optional: false }];
            full.extend(segments);
            Ast::Path(full)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> serde_json::Value {
        serde_json::json!({
            "event": {"clusterId": "c-1"},
            "params": {"clusterPhase": "Ready", "healthy": true},
            "resources": {},
            "adapter": {"errorReason": null},
        })
    }

    #[test]
    fn bare_ident_resolves_against_params() {
        assert!(eval_bool("clusterPhase == \"Ready\"", &scope()).unwrap());
    }

    #[test]
    fn namespaced_ident_resolves_against_its_own_tree() {
        assert_eq!(eval_value("event.clusterId", &scope()).unwrap(), serde_json::json!("c-1"));
    }

    #[test]
    fn not_equal_operator() {
        assert!(eval_bool("clusterPhase != \"Pending\"", &scope()).unwrap());
    }

    #[test]
    fn and_or_combinators() {
        assert!(eval_bool("healthy && clusterPhase == \"Ready\"", &scope()).unwrap());
        assert!(eval_bool("healthy || clusterPhase == \"Pending\"", &scope()).unwrap());
    }

    #[test]
    fn missing_required_field_is_an_eval_error() {
        let err = eval_value("params.missingField", &scope()).unwrap_err();
        assert!(matches!(err, ExpressionError::Eval { .. }));
    }

    #[test]
    fn optional_chain_without_or_value_on_missing_field_errors() {
        let err = eval_value("adapter?.missing", &scope()).unwrap_err();
        assert!(matches!(err, ExpressionError::Eval { .. }));
    }

    #[test]
    fn or_value_substitutes_default_when_missing() {
        assert_eq!(
            eval_value("adapter?.missingField.orValue(\"fallback\")", &scope()).unwrap(),
            serde_json::json!("fallback")
        );
    }

    #[test]
    fn or_value_passes_through_present_value() {
        let mut present = scope();
        present["adapter"]["errorReason"] = serde_json::json!("ResourcesCreated");
        assert_eq!(
            eval_value("adapter?.errorReason.orValue(\"fallback\")", &present).unwrap(),
            serde_json::json!("ResourcesCreated")
        );
    }

    #[test]
    fn null_value_present_still_counts_as_present_for_or_value() {
        // errorReason exists (it's JSON null), so the optional segment does not
        // short-circuit and orValue's default is not used.
        assert_eq!(
            eval_value("adapter?.errorReason.orValue(\"fallback\")", &scope()).unwrap(),
            serde_json::Value::Null
        );
    }

    #[test]
    fn top_level_non_bool_in_when_position_is_a_type_mismatch() {
        let err = eval_bool("event.clusterId", &scope()).unwrap_err();
        assert!(matches!(err, ExpressionError::TypeMismatch { .. }));
    }

    #[test]
    fn rejects_malformed_expression() {
        let err = eval_value("clusterPhase ==", &scope()).unwrap_err();
        assert!(matches!(err, ExpressionError::Parse { .. }));
    }

    #[test]
    fn rejects_trailing_garbage() {
        let err = eval_value("clusterPhase == \"Ready\" junk", &scope()).unwrap_err();
        assert!(matches!(err, ExpressionError::Parse { .. }));
    }
}
