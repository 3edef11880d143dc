//! 规则字符串词法分析
//!
//! 单趟扫描，把规则文本切分为括号、标识符、数值、引号字符串和比较
//! 操作符。AND / OR 在这一层仍是普通标识符，由解析器按大小写无关
//! 的方式识别。空白直接丢弃。

use crate::ast::Operator;
use crate::error::{Result, RuleError};
use std::fmt;

/// 词法 token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    /// 标识符（属性名，或 AND / OR 关键字）
    Ident(String),
    /// 数值字面量
    Number(f64),
    /// 引号字符串字面量（引号已去除）
    Text(String),
    /// 比较操作符
    Comparator(Operator),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::Ident(name) => write!(f, "{}", name),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "'{}'", s),
            Self::Comparator(op) => write!(f, "{}", op),
        }
    }
}

/// 把规则字符串切分为 token 序列
///
/// 无法归入任何 token 模式的片段（包括未闭合的引号）返回
/// `TokenizeError`，并携带出错位置和片段内容。
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
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
            '>' | '<' => {
                chars.next();
                let op = match (c, chars.peek()) {
                    ('>', Some(&(_, '='))) => {
                        chars.next();
                        Operator::Gte
                    }
                    ('<', Some(&(_, '='))) => {
                        chars.next();
                        Operator::Lte
                    }
                    ('>', _) => Operator::Gt,
                    _ => Operator::Lt,
                };
                tokens.push(Token::Comparator(op));
            }
            '=' => {
                chars.next();
                tokens.push(Token::Comparator(Operator::Eq));
            }
            quote @ ('\'' | '"') => {
                chars.next();
                let mut content = String::new();
                let mut closed = false;
                for (_, ch) in chars.by_ref() {
                    if ch == quote {
                        closed = true;
                        break;
                    }
                    content.push(ch);
                }
                if !closed {
                    return Err(RuleError::TokenizeError {
                        position: pos,
                        fragment: format!("{}{}", quote, content),
                    });
                }
                tokens.push(Token::Text(content));
            }
            c if c.is_ascii_digit() => {
                let mut lexeme = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if ch.is_ascii_digit() || ch == '.' {
                        lexeme.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = lexeme.parse::<f64>().map_err(|_| RuleError::TokenizeError {
                    position: pos,
                    fragment: lexeme.clone(),
                })?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(name));
            }
            _ => {
                return Err(RuleError::TokenizeError {
                    position: pos,
                    fragment: c.to_string(),
                });
            }
        }
    }

    Ok(tokens)
}
