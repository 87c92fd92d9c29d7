//! Typed boolean predicates over transaction facts
//!
//! Rule conditions are written as small boolean expressions over fact
//! names, e.g. `sca_required and not sca_applied` or
//! `merchant_region in ["EU", "UK"] and amount >= 30`. They are parsed
//! once at configuration load into an expression tree; evaluation is a
//! pure lookup against a [`FactSource`]. A predicate that cannot be
//! evaluated for a row (unknown field, type mismatch) yields `None`,
//! which callers treat as a non-match; rule-authoring mistakes never
//! abort a run.

use std::fmt;

/// A fact/attribute value as seen by predicates
#[derive(Debug, Clone, PartialEq)]
pub enum FactValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Field-name lookup over one row's canonical and derived attributes
pub trait FactSource {
    fn fact(&self, name: &str) -> Option<FactValue>;
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A literal appearing in a predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// One side of a comparison: a field reference or a literal
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Field(String),
    Literal(Literal),
}

/// Parsed predicate expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
    Compare {
        left: Operand,
        op: CmpOp,
        right: Operand,
    },
    /// Membership test: `field in [a, b, c]`, optionally negated
    In {
        left: Operand,
        values: Vec<Literal>,
        negated: bool,
    },
    /// Bare boolean field reference
    Field(String),
    /// Boolean literal
    Const(bool),
}

/// Predicate parse failure (a load-time configuration concern)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredicateError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unexpected end of predicate")]
    UnexpectedEnd,
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
}

impl Predicate {
    /// Parse a predicate expression
    ///
    /// Boolean combinators accept both the word forms (`and`, `or`,
    /// `not`) and the operator forms (`&`, `|`, `~`).
    pub fn parse(input: &str) -> Result<Self, PredicateError> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(PredicateError::UnexpectedToken(tok.to_string())),
        }
    }

    /// Evaluate against one row's facts
    ///
    /// `None` means the predicate could not be evaluated for this row
    /// and must be treated as a non-match.
    pub fn evaluate(&self, facts: &dyn FactSource) -> Option<bool> {
        match self {
            // both sides resolve before combining: an unevaluable
            // operand poisons the whole expression, never short-circuits
            Predicate::And(lhs, rhs) => {
                let lhs = lhs.evaluate(facts)?;
                let rhs = rhs.evaluate(facts)?;
                Some(lhs && rhs)
            }
            Predicate::Or(lhs, rhs) => {
                let lhs = lhs.evaluate(facts)?;
                let rhs = rhs.evaluate(facts)?;
                Some(lhs || rhs)
            }
            Predicate::Not(inner) => Some(!inner.evaluate(facts)?),
            Predicate::Compare { left, op, right } => {
                let lhs = resolve(left, facts)?;
                let rhs = resolve(right, facts)?;
                compare(&lhs, *op, &rhs)
            }
            Predicate::In {
                left,
                values,
                negated,
            } => {
                let lhs = resolve(left, facts)?;
                let contained = values
                    .iter()
                    .any(|lit| compare(&lhs, CmpOp::Eq, &lit.to_value()) == Some(true));
                Some(contained != *negated)
            }
            Predicate::Field(name) => match facts.fact(name)? {
                FactValue::Bool(value) => Some(value),
                _ => None,
            },
            Predicate::Const(value) => Some(*value),
        }
    }
}

impl Literal {
    fn to_value(&self) -> FactValue {
        match self {
            Literal::Bool(b) => FactValue::Bool(*b),
            Literal::Number(n) => FactValue::Number(*n),
            Literal::Text(t) => FactValue::Text(t.clone()),
        }
    }
}

fn resolve(operand: &Operand, facts: &dyn FactSource) -> Option<FactValue> {
    match operand {
        Operand::Field(name) => facts.fact(name),
        Operand::Literal(lit) => Some(lit.to_value()),
    }
}

/// Typed comparison; `None` on a type mismatch
///
/// Booleans coerce to 0/1 when compared against numbers; text only
/// compares against text.
fn compare(left: &FactValue, op: CmpOp, right: &FactValue) -> Option<bool> {
    if let (FactValue::Text(lhs), FactValue::Text(rhs)) = (left, right) {
        return Some(match op {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
        });
    }
    let lhs = numeric(left)?;
    let rhs = numeric(right)?;
    let ordering = lhs.partial_cmp(&rhs)?;
    Some(match op {
        CmpOp::Eq => ordering.is_eq(),
        CmpOp::Ne => !ordering.is_eq(),
        CmpOp::Lt => ordering.is_lt(),
        CmpOp::Le => ordering.is_le(),
        CmpOp::Gt => ordering.is_gt(),
        CmpOp::Ge => ordering.is_ge(),
    })
}

fn numeric(value: &FactValue) -> Option<f64> {
    match value {
        FactValue::Number(n) => Some(*n),
        FactValue::Bool(true) => Some(1.0),
        FactValue::Bool(false) => Some(0.0),
        FactValue::Text(_) => None,
    }
}

// ---- lexer ----

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    True,
    False,
    And,
    Or,
    Not,
    In,
    Cmp(CmpOp),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "{name}"),
            Token::Number(n) => write!(f, "{n}"),
            Token::Str(s) => write!(f, "\"{s}\""),
            Token::True => f.write_str("true"),
            Token::False => f.write_str("false"),
            Token::And => f.write_str("and"),
            Token::Or => f.write_str("or"),
            Token::Not => f.write_str("not"),
            Token::In => f.write_str("in"),
            Token::Cmp(op) => f.write_str(match op {
                CmpOp::Eq => "==",
                CmpOp::Ne => "!=",
                CmpOp::Lt => "<",
                CmpOp::Le => "<=",
                CmpOp::Gt => ">",
                CmpOp::Ge => ">=",
            }),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::LBracket => f.write_str("["),
            Token::RBracket => f.write_str("]"),
            Token::Comma => f.write_str(","),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, PredicateError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '&' => {
                chars.next();
                tokens.push(Token::And);
            }
            '|' => {
                chars.next();
                tokens.push(Token::Or);
            }
            '~' => {
                chars.next();
                tokens.push(Token::Not);
            }
            '=' => {
                chars.next();
                match chars.next() {
                    Some('=') => tokens.push(Token::Cmp(CmpOp::Eq)),
                    _ => return Err(PredicateError::UnexpectedChar('=')),
                }
            }
            '!' => {
                chars.next();
                match chars.next() {
                    Some('=') => tokens.push(Token::Cmp(CmpOp::Ne)),
                    _ => return Err(PredicateError::UnexpectedChar('!')),
                }
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Cmp(CmpOp::Le));
                } else {
                    tokens.push(Token::Cmp(CmpOp::Lt));
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Cmp(CmpOp::Ge));
                } else {
                    tokens.push(Token::Cmp(CmpOp::Gt));
                }
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => break,
                        Some(c) => text.push(c),
                        None => return Err(PredicateError::UnterminatedString),
                    }
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut text = String::new();
                if c == '-' {
                    text.push(c);
                    chars.next();
                    if !chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                        return Err(PredicateError::UnexpectedChar('-'));
                    }
                }
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        text.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = text
                    .parse::<f64>()
                    .map_err(|_| PredicateError::UnexpectedToken(text.clone()))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match name.to_lowercase().as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    "true" => Token::True,
                    "false" => Token::False,
                    _ => Token::Ident(name),
                });
            }
            other => return Err(PredicateError::UnexpectedChar(other)),
        }
    }
    Ok(tokens)
}

// ---- parser ----

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), PredicateError> {
        match self.next() {
            Some(ref token) if token == expected => Ok(()),
            Some(token) => Err(PredicateError::UnexpectedToken(token.to_string())),
            None => Err(PredicateError::UnexpectedEnd),
        }
    }

    fn parse_or(&mut self) -> Result<Predicate, PredicateError> {
        let mut expr = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.next();
            let rhs = self.parse_and()?;
            expr = Predicate::Or(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Predicate, PredicateError> {
        let mut expr = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.next();
            let rhs = self.parse_unary()?;
            expr = Predicate::And(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Predicate, PredicateError> {
        if self.peek() == Some(&Token::Not) {
            self.next();
            let inner = self.parse_unary()?;
            return Ok(Predicate::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Predicate, PredicateError> {
        if self.peek() == Some(&Token::LParen) {
            self.next();
            let expr = self.parse_or()?;
            self.expect(&Token::RParen)?;
            return Ok(expr);
        }

        let operand = self.parse_operand()?;

        match self.peek() {
            Some(Token::Cmp(op)) => {
                let op = *op;
                self.next();
                let right = self.parse_operand()?;
                Ok(Predicate::Compare {
                    left: operand,
                    op,
                    right,
                })
            }
            Some(Token::In) => {
                self.next();
                let values = self.parse_literal_list()?;
                Ok(Predicate::In {
                    left: operand,
                    values,
                    negated: false,
                })
            }
            Some(Token::Not) => {
                // `x not in [..]`
                self.next();
                self.expect(&Token::In)?;
                let values = self.parse_literal_list()?;
                Ok(Predicate::In {
                    left: operand,
                    values,
                    negated: true,
                })
            }
            _ => match operand {
                Operand::Field(name) => Ok(Predicate::Field(name)),
                Operand::Literal(Literal::Bool(value)) => Ok(Predicate::Const(value)),
                Operand::Literal(other) => {
                    Err(PredicateError::UnexpectedToken(format!("{other:?}")))
                }
            },
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, PredicateError> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(Operand::Field(name)),
            Some(Token::Number(value)) => Ok(Operand::Literal(Literal::Number(value))),
            Some(Token::Str(text)) => Ok(Operand::Literal(Literal::Text(text))),
            Some(Token::True) => Ok(Operand::Literal(Literal::Bool(true))),
            Some(Token::False) => Ok(Operand::Literal(Literal::Bool(false))),
            Some(token) => Err(PredicateError::UnexpectedToken(token.to_string())),
            None => Err(PredicateError::UnexpectedEnd),
        }
    }

    fn parse_literal_list(&mut self) -> Result<Vec<Literal>, PredicateError> {
        self.expect(&Token::LBracket)?;
        let mut values = Vec::new();
        if self.peek() == Some(&Token::RBracket) {
            self.next();
            return Ok(values);
        }
        loop {
            match self.parse_operand()? {
                Operand::Literal(lit) => values.push(lit),
                Operand::Field(name) => {
                    return Err(PredicateError::UnexpectedToken(name));
                }
            }
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RBracket) => break,
                Some(token) => return Err(PredicateError::UnexpectedToken(token.to_string())),
                None => return Err(PredicateError::UnexpectedEnd),
            }
        }
        Ok(values)
    }
}
