// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{Number, Value};

use crate::errors::EvalError;
use crate::expression::ast::{
    BinaryOp, CompareOp, Comprehension, Expr, FPart, Statement, Subscript, Target, UnaryOp,
};
use crate::expression::lexer::{tokenize, FStrPart, Spanned, Token};

/// Parse a program: one or more statements separated by newlines or `;`.
pub fn parse_program(source: &str) -> Result<Vec<Statement>, EvalError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(tokens, source.len());
    let mut statements = Vec::new();
    while !parser.at_end() {
        if parser.match_token(&Token::Separator) {
            continue;
        }
        statements.push(parser.parse_statement()?);
        if !parser.at_end() {
            parser.expect_token(&Token::Separator)?;
        }
    }
    Ok(statements)
}

/// Parse a single expression embedded at `offset` of an enclosing source.
fn parse_embedded(source: &str, offset: usize) -> Result<Expr, EvalError> {
    let shifted = |err: EvalError| match err {
        EvalError::Syntax { message, position } => EvalError::Syntax {
            message,
            position: position + offset,
        },
        other => other,
    };
    let tokens = tokenize(source).map_err(shifted)?;
    let mut parser = Parser::new(tokens, source.len());
    let expr = parser.parse_expr().map_err(shifted)?;
    if !parser.at_end() {
        return Err(shifted(parser.unexpected()));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    index: usize,
    end: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>, end: usize) -> Self {
        Parser { tokens, index: 0, end }
    }

    fn parse_statement(&mut self) -> Result<Statement, EvalError> {
        let position = self.position();
        let expr = self.parse_expr()?;
        if self.match_token(&Token::Assign) {
            if !expr.is_place() {
                return Err(EvalError::syntax("cannot assign to expression", position));
            }
            let value = self.parse_expr()?;
            return Ok(Statement::Assign { target: expr, value });
        }
        Ok(Statement::Expr(expr))
    }

    fn parse_expr(&mut self) -> Result<Expr, EvalError> {
        let expr = self.parse_or()?;
        if self.match_token(&Token::If) {
            let condition = self.parse_or()?;
            self.expect_token(&Token::Else)?;
            let otherwise = self.parse_expr()?;
            return Ok(Expr::Conditional {
                condition: Box::new(condition),
                then: Box::new(expr),
                otherwise: Box::new(otherwise),
            });
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_and()?;
        while self.match_token(&Token::Or) {
            let rhs = self.parse_and()?;
            expr = Expr::Or(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_not()?;
        while self.match_token(&Token::And) {
            let rhs = self.parse_not()?;
            expr = Expr::And(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_not(&mut self) -> Result<Expr, EvalError> {
        if self.match_token(&Token::Not) {
            let operand = self.parse_not()?;
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, EvalError> {
        let first = self.parse_additive()?;
        let mut rest = Vec::new();
        while let Some(op) = self.compare_op() {
            rest.push((op, self.parse_additive()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn compare_op(&mut self) -> Option<CompareOp> {
        let op = match self.peek()? {
            Token::Eq => CompareOp::Eq,
            Token::Ne => CompareOp::Ne,
            Token::Lt => CompareOp::Lt,
            Token::Le => CompareOp::Le,
            Token::Gt => CompareOp::Gt,
            Token::Ge => CompareOp::Ge,
            Token::In => CompareOp::In,
            Token::Is => {
                self.index += 1;
                return Some(if self.match_token(&Token::Not) {
                    CompareOp::IsNot
                } else {
                    CompareOp::Is
                });
            }
            Token::Not if self.peek_at(1) == Some(&Token::In) => {
                self.index += 2;
                return Some(CompareOp::NotIn);
            }
            _ => return None,
        };
        self.index += 1;
        Some(op)
    }

    fn parse_additive(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(expr),
            };
            self.index += 1;
            let rhs = self.parse_multiplicative()?;
            expr = Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(rhs),
            };
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::SlashSlash) => BinaryOp::FloorDiv,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => return Ok(expr),
            };
            self.index += 1;
            let rhs = self.parse_unary()?;
            expr = Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(rhs),
            };
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        let op = if self.match_token(&Token::Minus) {
            UnaryOp::Neg
        } else if self.match_token(&Token::Plus) {
            UnaryOp::Pos
        } else {
            return self.parse_postfix();
        };
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.match_token(&Token::Dot) {
                let name = self.expect_ident()?;
                expr = Expr::Attribute {
                    target: Box::new(expr),
                    name,
                };
            } else if self.match_token(&Token::LParen) {
                let (args, kwargs) = self.parse_args()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    kwargs,
                };
            } else if self.match_token(&Token::LBracket) {
                let index = self.parse_subscript()?;
                self.expect_token(&Token::RBracket)?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_subscript(&mut self) -> Result<Subscript, EvalError> {
        let start = if self.peek() == Some(&Token::Colon) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        if !self.match_token(&Token::Colon) {
            return match start {
                Some(index) => Ok(Subscript::Single(index)),
                None => Err(self.unexpected()),
            };
        }
        let stop = if self.peek() == Some(&Token::RBracket) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        Ok(Subscript::Slice { start, stop })
    }

    fn parse_args(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>), EvalError> {
        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expr)> = Vec::new();
        if self.match_token(&Token::RParen) {
            return Ok((args, kwargs));
        }
        loop {
            let position = self.position();
            match (self.peek(), self.peek_at(1)) {
                (Some(Token::Name(name)), Some(Token::Assign)) => {
                    let name = name.clone();
                    self.index += 2;
                    kwargs.push((name, self.parse_expr()?));
                }
                _ => {
                    if !kwargs.is_empty() {
                        return Err(EvalError::syntax(
                            "positional argument follows keyword argument",
                            position,
                        ));
                    }
                    args.push(self.parse_expr()?);
                }
            }
            if self.match_token(&Token::Comma) {
                if self.match_token(&Token::RParen) {
                    return Ok((args, kwargs));
                }
                continue;
            }
            self.expect_token(&Token::RParen)?;
            return Ok((args, kwargs));
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        let position = self.position();
        match self.next_token() {
            Some(Token::Int(value)) => Ok(Expr::Literal(Value::from(value))),
            Some(Token::Float(value)) => Number::from_f64(value)
                .map(|n| Expr::Literal(Value::Number(n)))
                .ok_or_else(|| EvalError::syntax("invalid float literal", position)),
            Some(Token::Str(value)) => {
                let mut text = value;
                // adjacent literals concatenate
                while let Some(Token::Str(next)) = self.peek() {
                    text.push_str(next);
                    self.index += 1;
                }
                Ok(Expr::Literal(Value::String(text)))
            }
            Some(Token::FStr(parts)) => self.parse_fstring(parts),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::None) => Ok(Expr::Literal(Value::Null)),
            Some(Token::Name(name)) => Ok(Expr::Name(name)),
            Some(Token::LParen) => self.parse_group(),
            Some(Token::LBracket) => self.parse_list(),
            Some(Token::LBrace) => self.parse_dict(),
            _ => {
                self.index = self.index.saturating_sub(1);
                Err(self.unexpected())
            }
        }
    }

    fn parse_fstring(&mut self, parts: Vec<FStrPart>) -> Result<Expr, EvalError> {
        let mut result = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                FStrPart::Text(text) => result.push(FPart::Text(text)),
                FStrPart::Expr { source, offset } => {
                    result.push(FPart::Expr(Box::new(parse_embedded(&source, offset)?)));
                }
            }
        }
        Ok(Expr::FString(result))
    }

    /// `( expr )` or a parenthesized tuple, which evaluates as a list.
    fn parse_group(&mut self) -> Result<Expr, EvalError> {
        if self.match_token(&Token::RParen) {
            return Ok(Expr::List(Vec::new()));
        }
        let first = self.parse_expr()?;
        if self.match_token(&Token::RParen) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.match_token(&Token::Comma) {
            if self.peek() == Some(&Token::RParen) {
                break;
            }
            items.push(self.parse_expr()?);
        }
        self.expect_token(&Token::RParen)?;
        Ok(Expr::List(items))
    }

    fn parse_list(&mut self) -> Result<Expr, EvalError> {
        let mut items = Vec::new();
        if self.match_token(&Token::RBracket) {
            return Ok(Expr::List(items));
        }
        let first = self.parse_expr()?;
        if self.match_token(&Token::For) {
            let clause = self.parse_comprehension()?;
            self.expect_token(&Token::RBracket)?;
            return Ok(Expr::ListComp {
                element: Box::new(first),
                clause,
            });
        }
        items.push(first);
        loop {
            if self.match_token(&Token::Comma) {
                if self.match_token(&Token::RBracket) {
                    return Ok(Expr::List(items));
                }
                items.push(self.parse_expr()?);
                continue;
            }
            self.expect_token(&Token::RBracket)?;
            return Ok(Expr::List(items));
        }
    }

    fn parse_dict(&mut self) -> Result<Expr, EvalError> {
        let mut pairs = Vec::new();
        if self.match_token(&Token::RBrace) {
            return Ok(Expr::Dict(pairs));
        }
        let key = self.parse_expr()?;
        self.expect_token(&Token::Colon)?;
        let value = self.parse_expr()?;
        if self.match_token(&Token::For) {
            let clause = self.parse_comprehension()?;
            self.expect_token(&Token::RBrace)?;
            return Ok(Expr::DictComp {
                key: Box::new(key),
                value: Box::new(value),
                clause,
            });
        }
        pairs.push((key, value));
        loop {
            if self.match_token(&Token::Comma) {
                if self.match_token(&Token::RBrace) {
                    return Ok(Expr::Dict(pairs));
                }
                let key = self.parse_expr()?;
                self.expect_token(&Token::Colon)?;
                let value = self.parse_expr()?;
                pairs.push((key, value));
                continue;
            }
            self.expect_token(&Token::RBrace)?;
            return Ok(Expr::Dict(pairs));
        }
    }

    /// Everything after `for` in `[element for target in iter if cond]`.
    fn parse_comprehension(&mut self) -> Result<Comprehension, EvalError> {
        let target = self.parse_target()?;
        self.expect_token(&Token::In)?;
        let iter = self.parse_or()?;
        let mut conditions = Vec::new();
        while self.match_token(&Token::If) {
            conditions.push(self.parse_or()?);
        }
        Ok(Comprehension {
            target,
            iter: Box::new(iter),
            conditions,
        })
    }

    fn parse_target(&mut self) -> Result<Target, EvalError> {
        let parenthesized = self.match_token(&Token::LParen);
        let mut names = vec![self.expect_ident()?];
        while self.match_token(&Token::Comma) {
            names.push(self.expect_ident()?);
        }
        if parenthesized {
            self.expect_token(&Token::RParen)?;
        }
        if names.len() == 1 && !parenthesized {
            Ok(Target::Name(names.remove(0)))
        } else {
            Ok(Target::Tuple(names))
        }
    }

    fn at_end(&self) -> bool {
        self.index >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.index + ahead).map(|s| &s.token)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.index)
            .map(|s| s.position)
            .unwrap_or(self.end)
    }

    fn match_token(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn expect_token(&mut self, token: &Token) -> Result<(), EvalError> {
        if self.match_token(token) {
            Ok(())
        } else {
            let position = self.position();
            let found = match self.peek() {
                Some(found) => format!("{:?}", found),
                None => "end of input".to_string(),
            };
            Err(EvalError::syntax(
                format!("expected {:?}, found {}", token, found),
                position,
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<String, EvalError> {
        match self.peek() {
            Some(Token::Name(name)) => {
                let name = name.clone();
                self.index += 1;
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index)?.token.clone();
        self.index += 1;
        Some(token)
    }

    fn unexpected(&self) -> EvalError {
        match self.peek() {
            Some(token) => EvalError::syntax(format!("unexpected token {:?}", token), self.position()),
            None => EvalError::syntax("unexpected end of input", self.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn single(source: &str) -> Expr {
        match parse_program(source).unwrap().remove(0) {
            Statement::Expr(expr) => expr,
            other => panic!("expected expression, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let expr = single("1 + 2 * 3");
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                left: Box::new(Expr::Literal(json!(1))),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: Box::new(Expr::Literal(json!(2))),
                    right: Box::new(Expr::Literal(json!(3))),
                }),
            }
        );
    }

    #[test]
    fn test_not_in_and_is_not() {
        let expr = single("a not in b and c is not None");
        match expr {
            Expr::And(left, right) => {
                assert!(matches!(*left, Expr::Compare { ref rest, .. } if rest[0].0 == CompareOp::NotIn));
                assert!(matches!(*right, Expr::Compare { ref rest, .. } if rest[0].0 == CompareOp::IsNot));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_statements_and_assignment() {
        let program = parse_program("x = 1; y = x + 1\ny").unwrap();
        assert_eq!(program.len(), 3);
        assert!(matches!(program[0], Statement::Assign { .. }));
        assert!(matches!(program[2], Statement::Expr(Expr::Name(ref n)) if n == "y"));
    }

    #[test]
    fn test_call_with_keyword_arguments() {
        let expr = single("factory.get_component_by_name('vm', raise_not_found=False)");
        match expr {
            Expr::Call { args, kwargs, .. } => {
                assert_eq!(args.len(), 1);
                assert_eq!(kwargs[0].0, "raise_not_found");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_comprehension_with_tuple_target() {
        let expr = single("[k for k, v in d.items() if v]");
        match expr {
            Expr::ListComp { clause, .. } => {
                assert_eq!(clause.target, Target::Tuple(vec!["k".into(), "v".into()]));
                assert_eq!(clause.conditions.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid_programs() {
        struct TestCase {
            source: &'static str,
            description: &'static str,
        }

        let cases = vec![
            TestCase { source: "1 +", description: "dangling operator" },
            TestCase { source: "f(a=1, 2)", description: "positional after keyword" },
            TestCase { source: "1 = x", description: "assignment to literal" },
            TestCase { source: "[1, 2", description: "unclosed list" },
            TestCase { source: "a b", description: "missing separator" },
            TestCase { source: "f'{}'", description: "empty f-string field" },
        ];

        for case in cases {
            let result = parse_program(case.source);
            assert!(
                matches!(result, Err(EvalError::Syntax { .. })),
                "{} should fail to parse",
                case.description
            );
        }
    }

    #[test]
    fn test_fstring_error_positions_are_absolute() {
        let err = parse_program("x = f'abc{1 +}'").unwrap_err();
        match err {
            EvalError::Syntax { position, .. } => assert!(position >= 10, "position {}", position),
            other => panic!("unexpected {:?}", other),
        }
    }
}
