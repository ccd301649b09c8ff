//! Recursive-descent parser producing the expression AST.
//!
//! Precedence, loosest first: conditional, `or`, `and`, `not`, comparison,
//! additive, multiplicative, unary minus, postfix (`.attr`, `[index]`, call).

use super::lexer::{tokenize, Token};
use serde_json::Value;

/// Limit on AST depth. Sub-expressions and every link of an operator,
/// attribute, subscript or call chain count towards it.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    List(Vec<Expr>),
    Name(String),
    Attr(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional {
        then: Box<Expr>,
        condition: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

impl Expr {
    /// Source-like rendering of name/attribute/subscript chains for messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            Expr::Name(name) => name.clone(),
            Expr::Attr(base, attr) => format!("{}.{}", base.describe(), attr),
            Expr::Index(base, _) => format!("{}[...]", base.describe()),
            Expr::Call(name, _) => format!("{}(...)", name),
            _ => "expression".to_string(),
        }
    }
}

pub(crate) fn parse(input: &str) -> Result<Expr, String> {
    let tokens = tokenize(input).map_err(|e| e.to_string())?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.conditional()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(format!("unexpected '{}'", token.describe())),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(s)) if s == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(format!(
                "expected '{}', found '{}'",
                expected.describe(),
                token.describe()
            )),
            None => Err(format!("expected '{}', found end of input", expected.describe())),
        }
    }

    fn enter(&mut self) -> Result<(), String> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err("expression nested too deeply".to_string());
        }
        Ok(())
    }

    /// Restore the depth recorded before a chain was parsed.
    fn leave_chain(&mut self, mark: usize, expr: Expr) -> Result<Expr, String> {
        self.depth = mark;
        Ok(expr)
    }

    fn conditional(&mut self) -> Result<Expr, String> {
        self.enter()?;
        let then = self.or()?;
        let expr = if self.eat_keyword("if") {
            let condition = self.or()?;
            if !self.eat_keyword("else") {
                return Err("expected 'else' in conditional expression".to_string());
            }
            let otherwise = self.conditional()?;
            Expr::Conditional {
                then: Box::new(then),
                condition: Box::new(condition),
                otherwise: Box::new(otherwise),
            }
        } else {
            then
        };
        self.depth -= 1;
        Ok(expr)
    }

    fn or(&mut self) -> Result<Expr, String> {
        let mut left = self.and()?;
        let mark = self.depth;
        while self.eat_keyword("or") {
            self.enter()?;
            let right = self.and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.leave_chain(mark, left)
    }

    fn and(&mut self) -> Result<Expr, String> {
        let mut left = self.not()?;
        let mark = self.depth;
        while self.eat_keyword("and") {
            self.enter()?;
            let right = self.not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.leave_chain(mark, left)
    }

    fn not(&mut self) -> Result<Expr, String> {
        if self.eat_keyword("not") {
            self.enter()?;
            let inner = self.not()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, String> {
        let left = self.additive()?;
        let op = match self.peek() {
            Some(Token::EqEq) => BinaryOp::Eq,
            Some(Token::NotEq) => BinaryOp::NotEq,
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Le) => BinaryOp::Le,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Ge) => BinaryOp::Ge,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.additive()?;
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn additive(&mut self) -> Result<Expr, String> {
        let mut left = self.multiplicative()?;
        let mark = self.depth;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return self.leave_chain(mark, left),
            };
            self.pos += 1;
            self.enter()?;
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, String> {
        let mut left = self.unary()?;
        let mark = self.depth;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => return self.leave_chain(mark, left),
            };
            self.pos += 1;
            self.enter()?;
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::Minus) {
            self.enter()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, String> {
        let mut expr = self.primary()?;
        let mark = self.depth;
        loop {
            if matches!(
                self.peek(),
                Some(Token::Dot | Token::LBracket | Token::LParen)
            ) {
                self.enter()?;
            }
            if self.eat(&Token::Dot) {
                match self.advance() {
                    Some(Token::Ident(attr)) => expr = Expr::Attr(Box::new(expr), attr),
                    Some(token) => {
                        return Err(format!(
                            "expected attribute name after '.', found '{}'",
                            token.describe()
                        ))
                    }
                    None => return Err("expected attribute name after '.'".to_string()),
                }
            } else if self.eat(&Token::LBracket) {
                let index = self.conditional()?;
                self.expect(Token::RBracket)?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.peek() == Some(&Token::LParen) {
                let name = match expr {
                    Expr::Name(name) => name,
                    other => {
                        return Err(format!(
                            "only index functions can be called, not '{}'",
                            other.describe()
                        ))
                    }
                };
                self.pos += 1;
                let args = self.sequence(Token::RParen)?;
                expr = Expr::Call(name, args);
            } else {
                return self.leave_chain(mark, expr);
            }
        }
    }

    /// Comma separated expressions up to `close`; a trailing comma is allowed.
    fn sequence(&mut self, close: Token) -> Result<Vec<Expr>, String> {
        let mut items = Vec::new();
        loop {
            if self.eat(&close) {
                return Ok(items);
            }
            items.push(self.conditional()?);
            if !self.eat(&Token::Comma) {
                self.expect(close)?;
                return Ok(items);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Some(Token::Int(n)) => Ok(Expr::Literal(Value::from(n))),
            Some(Token::Float(f)) => serde_json::Number::from_f64(f)
                .map(|n| Expr::Literal(Value::Number(n)))
                .ok_or_else(|| format!("invalid float literal {}", f)),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Ident(name)) => Ok(match name.as_str() {
                "True" | "true" => Expr::Literal(Value::Bool(true)),
                "False" | "false" => Expr::Literal(Value::Bool(false)),
                "None" | "null" => Expr::Literal(Value::Null),
                "and" | "or" | "not" | "if" | "else" => {
                    return Err(format!("unexpected keyword '{}'", name))
                }
                _ => Expr::Name(name),
            }),
            Some(Token::LParen) => {
                let inner = self.conditional()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::LBracket) => {
                self.enter()?;
                let items = self.sequence(Token::RBracket)?;
                self.depth -= 1;
                Ok(Expr::List(items))
            }
            Some(token) => Err(format!("unexpected '{}'", token.describe())),
            None => Err("unexpected end of input".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Box<Expr> {
        Box::new(Expr::Name(s.to_string()))
    }

    #[test]
    fn test_attribute_and_subscript() {
        assert_eq!(
            parse("metadata.category").unwrap(),
            Expr::Attr(name("metadata"), "category".into())
        );
        assert_eq!(
            parse("metadata['category']").unwrap(),
            Expr::Index(
                name("metadata"),
                Box::new(Expr::Literal(Value::String("category".into())))
            )
        );
    }

    #[test]
    fn test_call_with_args() {
        let expr = parse("substring(metadata.client, 0, 3)").unwrap();
        match expr {
            Expr::Call(name, args) => {
                assert_eq!(name, "substring");
                assert_eq!(args.len(), 3);
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        let expr = parse("1 + 2 * 3 == 7 and not False").unwrap();
        match expr {
            Expr::And(left, right) => {
                assert!(matches!(*left, Expr::Binary(BinaryOp::Eq, _, _)));
                assert!(matches!(*right, Expr::Not(_)));
            }
            other => panic!("unexpected tree {other:?}"),
        }
    }

    #[test]
    fn test_conditional() {
        let expr = parse("'big' if metadata.size > 10 else 'small'").unwrap();
        assert!(matches!(expr, Expr::Conditional { .. }));
    }

    #[test]
    fn test_method_call_rejected() {
        let err = parse("metadata.category.upper()").unwrap_err();
        assert!(err.contains("only index functions can be called"));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse("").is_err());
        assert!(parse("metadata[").is_err());
        assert!(parse("a b").is_err());
        assert!(parse("1 if 2").is_err());
        assert!(parse("metadata.").is_err());
    }

    #[test]
    fn test_long_chains_hit_nesting_limit() {
        let sum = format!("1{}", " + 1".repeat(10_000));
        assert_eq!(parse(&sum).unwrap_err(), "expression nested too deeply");

        let attrs = format!("metadata{}", ".a".repeat(10_000));
        assert_eq!(parse(&attrs).unwrap_err(), "expression nested too deeply");

        let either = format!("a{}", " or a".repeat(10_000));
        assert_eq!(parse(&either).unwrap_err(), "expression nested too deeply");

        let subscripts = format!("metadata{}", "[0]".repeat(10_000));
        assert_eq!(parse(&subscripts).unwrap_err(), "expression nested too deeply");
    }

    #[test]
    fn test_short_chains_parse() {
        assert!(parse(&format!("1{}", " + 1".repeat(20))).is_ok());
        assert!(parse("concat(metadata.a, '-', metadata.b) + '-' + metadata.c.d[0]").is_ok());

        // Sibling chains do not add up
        let sums = vec!["1 + 1 + 1 + 1"; 40].join(", ");
        assert!(parse(&format!("[{}]", sums)).is_ok());
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(parse(&deep).unwrap_err(), "expression nested too deeply");

        let fine = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        assert!(parse(&fine).is_ok());
    }
}
