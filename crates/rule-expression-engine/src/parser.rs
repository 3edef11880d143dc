//! 规则字符串解析器
//!
//! 递归下降实现，文法（优先级从低到高）：
//!
//! ```text
//! expr        := orExpr
//! orExpr      := andExpr ( 'OR' andExpr )*
//! andExpr     := primary ( 'AND' primary )*
//! primary     := '(' expr ')' | comparison
//! comparison  := operand comparator operand
//! comparator  := '>' | '<' | '>=' | '<=' | '='
//! operand     := IDENT | NUMBER | STRING_LITERAL
//! ```
//!
//! OR / AND 逐层向左折叠，比较表达式的两个操作数是叶子节点，不再
//! 继续解析。整个 token 流必须被完全消费，否则报错，不存在部分解析。

use crate::ast::{Node, Operator};
use crate::error::{Result, RuleError};
use crate::lexer::{tokenize, Token};
use std::sync::Arc;

/// 把规则字符串解析为语法树
pub fn parse_rule(input: &str) -> Result<Arc<Node>> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens);
    let ast = parser.parse_expression()?;

    if let Some(token) = parser.peek() {
        return Err(RuleError::ParseError(format!(
            "规则末尾存在多余的 token '{}'",
            token
        )));
    }

    Ok(ast)
}

/// token 流游标
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

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

    /// 当前 token 若为 AND / OR 关键字（大小写无关）则返回对应操作符
    fn peek_logical(&self) -> Option<Operator> {
        match self.peek() {
            Some(Token::Ident(name)) if name.eq_ignore_ascii_case("AND") => Some(Operator::And),
            Some(Token::Ident(name)) if name.eq_ignore_ascii_case("OR") => Some(Operator::Or),
            _ => None,
        }
    }

    /// orExpr := andExpr ( 'OR' andExpr )*
    fn parse_expression(&mut self) -> Result<Arc<Node>> {
        let mut left = self.parse_and()?;

        while self.peek_logical() == Some(Operator::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Node::operator(Operator::Or, left, right);
        }

        Ok(left)
    }

    /// andExpr := primary ( 'AND' primary )*
    fn parse_and(&mut self) -> Result<Arc<Node>> {
        let mut left = self.parse_primary()?;

        while self.peek_logical() == Some(Operator::And) {
            self.advance();
            let right = self.parse_primary()?;
            left = Node::operator(Operator::And, left, right);
        }

        Ok(left)
    }

    /// primary := '(' expr ')' | comparison
    fn parse_primary(&mut self) -> Result<Arc<Node>> {
        match self.peek() {
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_expression()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    Some(token) => Err(RuleError::ParseError(format!(
                        "需要 ')'，得到 '{}'",
                        token
                    ))),
                    None => Err(RuleError::ParseError("缺少匹配的 ')'".to_string())),
                }
            }
            _ => self.parse_comparison(),
        }
    }

    /// comparison := operand comparator operand
    fn parse_comparison(&mut self) -> Result<Arc<Node>> {
        let left = self.parse_operand()?;

        let op = match self.advance() {
            Some(Token::Comparator(op)) => op,
            Some(token) => {
                return Err(RuleError::ParseError(format!(
                    "需要比较操作符，得到 '{}'",
                    token
                )));
            }
            None => {
                return Err(RuleError::ParseError(
                    "需要比较操作符，但输入已结束".to_string(),
                ));
            }
        };

        let right = self.parse_operand()?;
        Ok(Node::operator(op, left, right))
    }

    /// operand := IDENT | NUMBER | STRING_LITERAL
    ///
    /// 标识符成为属性引用，数值和引号字符串成为字面量。
    fn parse_operand(&mut self) -> Result<Arc<Node>> {
        match self.advance() {
            Some(Token::Ident(name)) => {
                if name.eq_ignore_ascii_case("AND") || name.eq_ignore_ascii_case("OR") {
                    Err(RuleError::ParseError(format!(
                        "需要操作数，得到逻辑操作符 '{}'",
                        name
                    )))
                } else {
                    Ok(Node::attribute(name))
                }
            }
            Some(Token::Number(n)) => Ok(Node::number(n)),
            Some(Token::Text(s)) => Ok(Node::text(s)),
            Some(token) => Err(RuleError::ParseError(format!(
                "需要操作数，得到 '{}'",
                token
            ))),
            None => Err(RuleError::ParseError(
                "需要操作数，但输入已结束".to_string(),
            )),
        }
    }
}
