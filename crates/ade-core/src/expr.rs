// crates/ade-core/src/expr.rs
// ============================================================================
// Module: ADE Expression Evaluator
// Description: Restricted formula sublanguage for derivations, guardrail
// conditions, and scoring objectives.
// Purpose: Evaluate scenario formulas purely and deterministically without
// any host eval.
// Dependencies: crate::core::action, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The formula sublanguage is deliberately narrow: dotted path reads,
//! comparisons against literals, flat `||` / `&&` composition, arithmetic
//! with parentheses, and the three named forms `if_else`, `coalesce`, and
//! `clamp`. A hand-written lexer feeds a recursive-descent parser producing
//! a small AST; evaluation is a tree walk over an [`EvalScope`].
//!
//! Evaluation is total. Unreadable paths resolve to the configured
//! missing-value sentinel, division by zero yields `0`, and a syntactically
//! invalid formula never escapes as an error: callers fall back to declared
//! defaults (derivations, scoring) or `false` (guardrails).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::core::action::ActionCandidate;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Formula lexing and parsing errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Never escapes evaluation; callers translate to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    /// Unexpected character during lexing.
    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedChar {
        /// Offending character.
        found: char,
        /// Byte offset in the source.
        offset: usize,
    },
    /// Unterminated string literal.
    #[error("unterminated string literal at offset {0}")]
    UnterminatedString(usize),
    /// Unexpected token during parsing.
    #[error("unexpected token: {0}")]
    UnexpectedToken(String),
    /// Input ended before the expression was complete.
    #[error("unexpected end of formula")]
    UnexpectedEnd,
    /// Unknown named form.
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    /// Named form called with the wrong argument count.
    #[error("{name} expects {expected} arguments, got {actual}")]
    Arity {
        /// Function name.
        name: String,
        /// Expected argument count.
        expected: usize,
        /// Observed argument count.
        actual: usize,
    },
}

// ============================================================================
// SECTION: Values
// ============================================================================

/// Value produced by formula evaluation.
///
/// # Invariants
/// - `Missing` marks unreadable paths before sentinel substitution.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    /// Unreadable or absent value.
    Missing,
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// String value.
    Str(String),
}

impl EvalValue {
    /// Converts a JSON value into an evaluation value.
    ///
    /// Arrays, objects, and nulls are not addressable by the sublanguage and
    /// convert to `Missing`.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Bool(flag) => Self::Bool(*flag),
            Value::Number(number) => number.as_f64().map_or(Self::Missing, Self::Number),
            Value::String(text) => Self::Str(text.clone()),
            Value::Null | Value::Array(_) | Value::Object(_) => Self::Missing,
        }
    }

    /// Returns the numeric view of the value, `None` when not numeric.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            Self::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
            Self::Missing | Self::Str(_) => None,
        }
    }

    /// Returns the truthiness of the value.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::Missing => false,
            Self::Bool(flag) => *flag,
            Self::Number(number) => *number != 0.0,
            Self::Str(text) => !text.is_empty(),
        }
    }
}

// ============================================================================
// SECTION: Tokens
// ============================================================================

/// Lexical token of the formula sublanguage.
#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Numeric literal.
    Number(f64),
    /// Quoted string literal.
    Str(String),
    /// Identifier or keyword (`true`/`false` are folded to booleans).
    Ident(String),
    /// Boolean literal.
    Bool(bool),
    /// `.`
    Dot,
    /// `,`
    Comma,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `||`
    OrOr,
    /// `&&`
    AndAnd,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
}

/// Tokenizes formula source text.
fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let bytes: Vec<char> = source.chars().collect();
    let mut index = 0usize;
    while index < bytes.len() {
        let ch = bytes[index];
        match ch {
            ' ' | '\t' | '\r' | '\n' => index += 1,
            '.' => {
                tokens.push(Token::Dot);
                index += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                index += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                index += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                index += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                index += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                index += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                index += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                index += 1;
            }
            '|' => {
                if bytes.get(index + 1) == Some(&'|') {
                    tokens.push(Token::OrOr);
                    index += 2;
                } else {
                    return Err(ExprError::UnexpectedChar {
                        found: ch,
                        offset: index,
                    });
                }
            }
            '&' => {
                if bytes.get(index + 1) == Some(&'&') {
                    tokens.push(Token::AndAnd);
                    index += 2;
                } else {
                    return Err(ExprError::UnexpectedChar {
                        found: ch,
                        offset: index,
                    });
                }
            }
            '<' => {
                if bytes.get(index + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    index += 2;
                } else {
                    tokens.push(Token::Lt);
                    index += 1;
                }
            }
            '>' => {
                if bytes.get(index + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    index += 2;
                } else {
                    tokens.push(Token::Gt);
                    index += 1;
                }
            }
            '=' => {
                if bytes.get(index + 1) == Some(&'=') {
                    tokens.push(Token::EqEq);
                    index += 2;
                } else {
                    return Err(ExprError::UnexpectedChar {
                        found: ch,
                        offset: index,
                    });
                }
            }
            '!' => {
                if bytes.get(index + 1) == Some(&'=') {
                    tokens.push(Token::NotEq);
                    index += 2;
                } else {
                    return Err(ExprError::UnexpectedChar {
                        found: ch,
                        offset: index,
                    });
                }
            }
            '"' | '\'' => {
                let quote = ch;
                let start = index;
                index += 1;
                let mut text = String::new();
                loop {
                    match bytes.get(index) {
                        Some(&next) if next == quote => {
                            index += 1;
                            break;
                        }
                        Some(&next) => {
                            text.push(next);
                            index += 1;
                        }
                        None => return Err(ExprError::UnterminatedString(start)),
                    }
                }
                tokens.push(Token::Str(text));
            }
            _ if ch.is_ascii_digit() => {
                let start = index;
                while index < bytes.len()
                    && (bytes[index].is_ascii_digit() || bytes[index] == '.')
                {
                    // A dot followed by an identifier head ends the number
                    // (path segments are lexed separately).
                    if bytes[index] == '.'
                        && bytes
                            .get(index + 1)
                            .is_some_and(|next| next.is_ascii_alphabetic() || *next == '_')
                    {
                        break;
                    }
                    index += 1;
                }
                let text: String = bytes[start .. index].iter().collect();
                let number = text
                    .parse::<f64>()
                    .map_err(|_| ExprError::UnexpectedToken(text.clone()))?;
                tokens.push(Token::Number(number));
            }
            _ if ch.is_ascii_alphabetic() || ch == '_' => {
                let start = index;
                while index < bytes.len()
                    && (bytes[index].is_ascii_alphanumeric() || bytes[index] == '_')
                {
                    index += 1;
                }
                let text: String = bytes[start .. index].iter().collect();
                match text.as_str() {
                    "true" => tokens.push(Token::Bool(true)),
                    "false" => tokens.push(Token::Bool(false)),
                    _ => tokens.push(Token::Ident(text)),
                }
            }
            _ => {
                return Err(ExprError::UnexpectedChar {
                    found: ch,
                    offset: index,
                });
            }
        }
    }
    Ok(tokens)
}

// ============================================================================
// SECTION: AST
// ============================================================================

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Ne,
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

/// Parsed formula expression.
#[derive(Debug, Clone, PartialEq)]
enum Expr {
    /// Literal value.
    Literal(EvalValue),
    /// Dotted path read.
    Path(Vec<String>),
    /// Comparison node.
    Compare {
        /// Operator.
        op: CompareOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// Disjunction over two or more operands.
    Or(Vec<Expr>),
    /// Conjunction over two or more operands.
    And(Vec<Expr>),
    /// Arithmetic node.
    Arith {
        /// Operator.
        op: ArithOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// Unary negation.
    Neg(Box<Expr>),
    /// `if_else(cond, then, else)`.
    IfElse {
        /// Condition operand.
        cond: Box<Expr>,
        /// Value when the condition is truthy.
        then: Box<Expr>,
        /// Value when the condition is falsy.
        otherwise: Box<Expr>,
    },
    /// `coalesce(expr, default)`.
    Coalesce {
        /// Primary operand.
        value: Box<Expr>,
        /// Substitute when the primary is missing.
        default: Box<Expr>,
    },
    /// `clamp(x, min, max)`.
    Clamp {
        /// Value operand.
        value: Box<Expr>,
        /// Lower bound operand.
        min: Box<Expr>,
        /// Upper bound operand.
        max: Box<Expr>,
    },
}

// ============================================================================
// SECTION: Parser
// ============================================================================

/// Recursive-descent parser over the token stream.
struct Parser {
    /// Token stream.
    tokens: Vec<Token>,
    /// Cursor into the stream.
    position: usize,
}

impl Parser {
    /// Peeks the current token.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    /// Consumes and returns the current token.
    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Consumes the expected token or fails.
    fn expect(&mut self, expected: &Token) -> Result<(), ExprError> {
        match self.advance() {
            Some(token) if &token == expected => Ok(()),
            Some(token) => Err(ExprError::UnexpectedToken(format!("{token:?}"))),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    /// Parses `or := and ('||' and)*`.
    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let first = self.parse_and()?;
        let mut operands = vec![first];
        while self.peek() == Some(&Token::OrOr) {
            self.position += 1;
            operands.push(self.parse_and()?);
        }
        if operands.len() == 1 {
            Ok(operands.swap_remove(0))
        } else {
            Ok(Expr::Or(operands))
        }
    }

    /// Parses `and := cmp ('&&' cmp)*`.
    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let first = self.parse_compare()?;
        let mut operands = vec![first];
        while self.peek() == Some(&Token::AndAnd) {
            self.position += 1;
            operands.push(self.parse_compare()?);
        }
        if operands.len() == 1 {
            Ok(operands.swap_remove(0))
        } else {
            Ok(Expr::And(operands))
        }
    }

    /// Parses `cmp := sum (op sum)?`.
    fn parse_compare(&mut self) -> Result<Expr, ExprError> {
        let lhs = self.parse_sum()?;
        let op = match self.peek() {
            Some(Token::Lt) => CompareOp::Lt,
            Some(Token::Le) => CompareOp::Le,
            Some(Token::Gt) => CompareOp::Gt,
            Some(Token::Ge) => CompareOp::Ge,
            Some(Token::EqEq) => CompareOp::Eq,
            Some(Token::NotEq) => CompareOp::Ne,
            _ => return Ok(lhs),
        };
        self.position += 1;
        let rhs = self.parse_sum()?;
        Ok(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    /// Parses `sum := product (('+'|'-') product)*`.
    fn parse_sum(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_product()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => return Ok(lhs),
            };
            self.position += 1;
            let rhs = self.parse_product()?;
            lhs = Expr::Arith {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    /// Parses `product := unary (('*'|'/') unary)*`.
    fn parse_product(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => ArithOp::Mul,
                Some(Token::Slash) => ArithOp::Div,
                _ => return Ok(lhs),
            };
            self.position += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Arith {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    /// Parses `unary := '-' unary | primary`.
    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if self.peek() == Some(&Token::Minus) {
            self.position += 1;
            let operand = self.parse_unary()?;
            return Ok(Expr::Neg(Box::new(operand)));
        }
        self.parse_primary()
    }

    /// Parses literals, paths, named forms, and parenthesized expressions.
    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        match self.advance() {
            Some(Token::Number(number)) => Ok(Expr::Literal(EvalValue::Number(number))),
            Some(Token::Str(text)) => Ok(Expr::Literal(EvalValue::Str(text))),
            Some(Token::Bool(flag)) => Ok(Expr::Literal(EvalValue::Bool(flag))),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(head)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.position += 1;
                    return self.parse_call(&head);
                }
                let mut segments = vec![head];
                while self.peek() == Some(&Token::Dot) {
                    self.position += 1;
                    match self.advance() {
                        Some(Token::Ident(segment)) => segments.push(segment),
                        Some(token) => {
                            return Err(ExprError::UnexpectedToken(format!("{token:?}")));
                        }
                        None => return Err(ExprError::UnexpectedEnd),
                    }
                }
                Ok(Expr::Path(segments))
            }
            Some(token) => Err(ExprError::UnexpectedToken(format!("{token:?}"))),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    /// Parses a named form's argument list after its opening parenthesis.
    fn parse_call(&mut self, name: &str) -> Result<Expr, ExprError> {
        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                args.push(self.parse_or()?);
                match self.peek() {
                    Some(Token::Comma) => self.position += 1,
                    _ => break,
                }
            }
        }
        self.expect(&Token::RParen)?;
        let arity = |expected: usize, actual: usize| ExprError::Arity {
            name: name.to_string(),
            expected,
            actual,
        };
        match name {
            "if_else" => {
                if args.len() != 3 {
                    return Err(arity(3, args.len()));
                }
                let otherwise = Box::new(args.pop().ok_or(ExprError::UnexpectedEnd)?);
                let then = Box::new(args.pop().ok_or(ExprError::UnexpectedEnd)?);
                let cond = Box::new(args.pop().ok_or(ExprError::UnexpectedEnd)?);
                Ok(Expr::IfElse {
                    cond,
                    then,
                    otherwise,
                })
            }
            "coalesce" => {
                if args.len() != 2 {
                    return Err(arity(2, args.len()));
                }
                let default = Box::new(args.pop().ok_or(ExprError::UnexpectedEnd)?);
                let value = Box::new(args.pop().ok_or(ExprError::UnexpectedEnd)?);
                Ok(Expr::Coalesce {
                    value,
                    default,
                })
            }
            "clamp" => {
                if args.len() != 3 {
                    return Err(arity(3, args.len()));
                }
                let max = Box::new(args.pop().ok_or(ExprError::UnexpectedEnd)?);
                let min = Box::new(args.pop().ok_or(ExprError::UnexpectedEnd)?);
                let value = Box::new(args.pop().ok_or(ExprError::UnexpectedEnd)?);
                Ok(Expr::Clamp {
                    value,
                    min,
                    max,
                })
            }
            _ => Err(ExprError::UnknownFunction(name.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Formula
// ============================================================================

/// Parsed formula ready for repeated evaluation.
///
/// # Invariants
/// - Parsing is pure; equal source yields an equal AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    /// Original source text.
    source: String,
    /// Parsed expression tree.
    ast: Expr,
}

impl Formula {
    /// Parses formula source into an AST.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError`] when the source is not in the sublanguage.
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            position: 0,
        };
        let ast = parser.parse_or()?;
        if parser.position != parser.tokens.len() {
            return Err(ExprError::UnexpectedToken(format!(
                "trailing input at token {}",
                parser.position
            )));
        }
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    /// Returns the original source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the formula against a scope.
    #[must_use]
    pub fn evaluate(&self, scope: &EvalScope<'_>, options: &EvalOptions) -> EvalValue {
        eval_expr(&self.ast, scope, options)
    }
}

// ============================================================================
// SECTION: Scope and Options
// ============================================================================

/// Read-only view resolved by dotted paths.
///
/// # Invariants
/// - Absent sections resolve every read beneath them to the missing sentinel.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalScope<'a> {
    /// Core state dimensions (`state.core.<name>`).
    pub state_core: Option<&'a BTreeMap<String, Value>>,
    /// Scenario extension dimensions (`state.scenario_extensions.<name>`).
    pub state_extensions: Option<&'a BTreeMap<String, Value>>,
    /// Request signals (`signals.<name>`).
    pub signals: Option<&'a BTreeMap<String, Value>>,
    /// Request context (`context.<name>`).
    pub context: Option<&'a BTreeMap<String, Value>>,
    /// Candidate action (`action.attributes.<name>`).
    pub action: Option<&'a ActionCandidate>,
    /// Flattened memory view (`memory.<key>`).
    pub memory: Option<&'a BTreeMap<String, Value>>,
}

impl EvalScope<'_> {
    /// Resolves a dotted path against the scope.
    fn resolve(&self, segments: &[String]) -> EvalValue {
        let mut parts = segments.iter().map(String::as_str);
        match parts.next() {
            Some("state") => match parts.next() {
                Some("core") => lookup(self.state_core, &join(parts)),
                Some("scenario_extensions") => lookup(self.state_extensions, &join(parts)),
                _ => EvalValue::Missing,
            },
            Some("signals") => lookup(self.signals, &join(parts)),
            Some("context") => lookup(self.context, &join(parts)),
            Some("action") => match parts.next() {
                Some("attributes") => {
                    let key = join(parts);
                    self.action
                        .and_then(|action| action.attributes.get(&key))
                        .map_or(EvalValue::Missing, EvalValue::from_json)
                }
                _ => EvalValue::Missing,
            },
            Some("memory") => lookup(self.memory, &join(parts)),
            _ => EvalValue::Missing,
        }
    }
}

/// Joins remaining path segments with dots (memory keys are namespaced).
fn join<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.collect::<Vec<&str>>().join(".")
}

/// Looks a key up in an optional section.
fn lookup(section: Option<&BTreeMap<String, Value>>, key: &str) -> EvalValue {
    if key.is_empty() {
        return EvalValue::Missing;
    }
    section
        .and_then(|map| map.get(key))
        .map_or(EvalValue::Missing, EvalValue::from_json)
}

/// Evaluation options carrying the missing-value sentinel.
///
/// # Invariants
/// - The sentinel substitutes for every unreadable path before any operator
///   applies.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalOptions {
    /// Sentinel substituted for unreadable paths.
    pub on_missing: EvalValue,
}

impl EvalOptions {
    /// Options for scoring formulas: missing state fields read as `0.5`.
    #[must_use]
    pub const fn for_scoring() -> Self {
        Self {
            on_missing: EvalValue::Number(0.5),
        }
    }

    /// Options for guardrail conditions: missing reads are `false`.
    #[must_use]
    pub const fn for_guardrail() -> Self {
        Self {
            on_missing: EvalValue::Bool(false),
        }
    }

    /// Options for derivations: missing reads take the declared default.
    #[must_use]
    pub const fn for_derivation(default: EvalValue) -> Self {
        Self {
            on_missing: default,
        }
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Walks the expression tree; total over every input.
fn eval_expr(expr: &Expr, scope: &EvalScope<'_>, options: &EvalOptions) -> EvalValue {
    match expr {
        Expr::Literal(value) => value.clone(),
        Expr::Path(segments) => match scope.resolve(segments) {
            EvalValue::Missing => options.on_missing.clone(),
            value => value,
        },
        Expr::Compare {
            op,
            lhs,
            rhs,
        } => {
            let left = eval_expr(lhs, scope, options);
            let right = eval_expr(rhs, scope, options);
            EvalValue::Bool(compare(*op, &left, &right))
        }
        Expr::Or(operands) => EvalValue::Bool(
            operands
                .iter()
                .any(|operand| eval_expr(operand, scope, options).truthy()),
        ),
        Expr::And(operands) => EvalValue::Bool(
            operands
                .iter()
                .all(|operand| eval_expr(operand, scope, options).truthy()),
        ),
        Expr::Arith {
            op,
            lhs,
            rhs,
        } => {
            let left = eval_expr(lhs, scope, options).as_number().unwrap_or(0.0);
            let right = eval_expr(rhs, scope, options).as_number().unwrap_or(0.0);
            let result = match op {
                ArithOp::Add => left + right,
                ArithOp::Sub => left - right,
                ArithOp::Mul => left * right,
                ArithOp::Div => {
                    if right == 0.0 {
                        0.0
                    } else {
                        left / right
                    }
                }
            };
            EvalValue::Number(result)
        }
        Expr::Neg(operand) => {
            let value = eval_expr(operand, scope, options).as_number().unwrap_or(0.0);
            EvalValue::Number(-value)
        }
        Expr::IfElse {
            cond,
            then,
            otherwise,
        } => {
            if eval_expr(cond, scope, options).truthy() {
                eval_expr(then, scope, options)
            } else {
                eval_expr(otherwise, scope, options)
            }
        }
        Expr::Coalesce {
            value,
            default,
        } => {
            // Coalesce inspects the raw path read, bypassing the sentinel.
            let raw = match value.as_ref() {
                Expr::Path(segments) => scope.resolve(segments),
                other => eval_expr(other, scope, options),
            };
            if raw == EvalValue::Missing {
                eval_expr(default, scope, options)
            } else {
                raw
            }
        }
        Expr::Clamp {
            value,
            min,
            max,
        } => {
            let raw = eval_expr(value, scope, options).as_number().unwrap_or(0.0);
            let low = eval_expr(min, scope, options).as_number().unwrap_or(0.0);
            let high = eval_expr(max, scope, options).as_number().unwrap_or(0.0);
            if low > high {
                EvalValue::Number(raw)
            } else {
                EvalValue::Number(raw.clamp(low, high))
            }
        }
    }
}

/// Applies a comparison operator to two values.
fn compare(op: CompareOp, left: &EvalValue, right: &EvalValue) -> bool {
    match op {
        CompareOp::Eq => values_equal(left, right),
        CompareOp::Ne => !values_equal(left, right),
        CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
            let (Some(lhs), Some(rhs)) = (left.as_number(), right.as_number()) else {
                return false;
            };
            match op {
                CompareOp::Lt => lhs < rhs,
                CompareOp::Le => lhs <= rhs,
                CompareOp::Gt => lhs > rhs,
                CompareOp::Ge => lhs >= rhs,
                CompareOp::Eq | CompareOp::Ne => false,
            }
        }
    }
}

/// Structural equality with numeric coercion for booleans.
fn values_equal(left: &EvalValue, right: &EvalValue) -> bool {
    match (left, right) {
        (EvalValue::Str(lhs), EvalValue::Str(rhs)) => lhs == rhs,
        (EvalValue::Missing, EvalValue::Missing) => true,
        (EvalValue::Missing, _) | (_, EvalValue::Missing) => false,
        _ => match (left.as_number(), right.as_number()) {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            _ => false,
        },
    }
}

// ============================================================================
// SECTION: Entry Points
// ============================================================================

/// Parses and evaluates a formula as a number; total over every input.
///
/// Invalid source yields `fallback`; non-numeric results coerce through
/// [`EvalValue::as_number`] with `fallback` as the last resort.
#[must_use]
pub fn eval_number(
    source: &str,
    scope: &EvalScope<'_>,
    options: &EvalOptions,
    fallback: f64,
) -> f64 {
    Formula::parse(source).map_or(fallback, |formula| {
        formula.evaluate(scope, options).as_number().unwrap_or(fallback)
    })
}

/// Parses and evaluates a formula as a boolean; total over every input.
///
/// Invalid source yields `false`.
#[must_use]
pub fn eval_bool(source: &str, scope: &EvalScope<'_>, options: &EvalOptions) -> bool {
    Formula::parse(source).is_ok_and(|formula| formula.evaluate(scope, options).truthy())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
