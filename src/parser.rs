use std::fmt;

use crate::ast::{
    BinaryExpr, BinaryOp, Expr, FunctionCall, Identifier, KeyValue, Literal, Node, ObjectLiteral,
    SelectStatement, Spanned,
};
use crate::token::{Token, TokenKind};

/// Classifies a parser error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The query contains no statements.
    EmptyQuery,
    /// A `)` or `}` with no open bracket of the same kind.
    UnmatchedClose { bracket: char },
    /// A `(` or `{` that is never closed.
    UnclosedOpen { bracket: char },
    /// A token that cannot start a statement or expression.
    UnexpectedToken { found: String },
    /// A statement where an expression is required.
    ExpectedExpression { context: String, found: &'static str },
    /// `+` with nothing after it.
    MissingOperand,
    /// `select` followed by no expressions.
    EmptySelect,
    /// Function name not followed by `(`.
    ExpectedOpenParen {
        function: String,
        found: Option<String>,
    },
    /// Function argument not followed by `,` or `)`.
    ExpectedArgumentDelimiter {
        function: String,
        found: Option<String>,
    },
    /// Function call never closed.
    UnclosedCall { function: String },
    /// Object key not followed by `:`.
    ExpectedColon { key: String, found: Option<String> },
    /// Object value not followed by `,` or `}`.
    ExpectedEntryDelimiter { key: String, found: Option<String> },
    /// Object key with no value before the end of input.
    MissingValue { key: String },
    /// A token inside `{}` that does not start an entry.
    UnexpectedObjectToken { found: String },
    /// Object literal never closed.
    UnclosedObject,
    /// Calls, objects, or selects nested deeper than the limit.
    NestingTooDeep { limit: usize },
}

fn found_or_eof(found: Option<&String>) -> String {
    found.map_or_else(|| "end of input".to_string(), |t| format!("'{t}'"))
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyQuery => write!(f, "empty query is not allowed"),
            Self::UnmatchedClose { bracket } => {
                write!(f, "closing '{bracket}' has no matching opening bracket")
            }
            Self::UnclosedOpen { bracket } => {
                write!(f, "opening '{bracket}' is never closed")
            }
            Self::UnexpectedToken { found } => {
                write!(f, "unexpected token '{found}'")
            }
            Self::ExpectedExpression { context, found } => {
                write!(f, "expected an expression for {context}, got a {found}")
            }
            Self::MissingOperand => {
                write!(f, "operator '+' is missing its right operand")
            }
            Self::EmptySelect => {
                write!(f, "select must be followed by at least one expression")
            }
            Self::ExpectedOpenParen { function, found } => {
                write!(
                    f,
                    "expected '(' after function name '{function}', got {}",
                    found_or_eof(found.as_ref())
                )
            }
            Self::ExpectedArgumentDelimiter { function, found } => {
                write!(
                    f,
                    "expected ',' or ')' after argument of '{function}', got {}",
                    found_or_eof(found.as_ref())
                )
            }
            Self::UnclosedCall { function } => {
                write!(f, "function '{function}' has no closing ')'")
            }
            Self::ExpectedColon { key, found } => {
                write!(
                    f,
                    "expected ':' after object key '{key}', got {}",
                    found_or_eof(found.as_ref())
                )
            }
            Self::ExpectedEntryDelimiter { key, found } => {
                write!(
                    f,
                    "expected ',' or '}}' after value of '{key}', got {}",
                    found_or_eof(found.as_ref())
                )
            }
            Self::MissingValue { key } => {
                write!(f, "object key '{key}' has no value")
            }
            Self::UnexpectedObjectToken { found } => {
                write!(f, "unexpected token '{found}' in object literal")
            }
            Self::UnclosedObject => {
                write!(f, "object literal has no closing '}}'")
            }
            Self::NestingTooDeep { limit } => {
                write!(f, "expression nesting exceeds the limit of {limit} levels")
            }
        }
    }
}

/// Error produced during parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at byte {pos}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub pos: usize,
}

/// Parse a token stream into a forest of top-level nodes.
///
/// # Errors
///
/// Returns `ParseError` on unbalanced brackets, misplaced tokens,
/// statements where an expression is required, or an empty query.
pub fn parse(tokens: &[Token]) -> Result<Vec<Node>, ParseError> {
    check_brackets(tokens)?;
    Parser::new(tokens).parse()
}

/// Verify that every `(`/`{` is closed by a bracket of the same kind.
///
/// Reports the offending close bracket, or the first open bracket
/// left on the stack.
pub fn check_brackets(tokens: &[Token]) -> Result<(), ParseError> {
    // Open bracket character and its offset.
    let mut stack: Vec<(char, usize)> = Vec::new();

    for token in tokens {
        let (opener, bracket) = match token.kind {
            TokenKind::OpenParen => {
                stack.push(('(', token.pos));
                continue;
            }
            TokenKind::OpenBrace => {
                stack.push(('{', token.pos));
                continue;
            }
            TokenKind::CloseParen => ('(', ')'),
            TokenKind::CloseBrace => ('{', '}'),
            _ => continue,
        };

        match stack.last() {
            Some(&(open, _)) if open == opener => {
                stack.pop();
            }
            _ => {
                return Err(ParseError {
                    kind: ParseErrorKind::UnmatchedClose { bracket },
                    pos: token.pos,
                });
            }
        }
    }

    stack.first().map_or(Ok(()), |&(bracket, pos)| {
        Err(ParseError {
            kind: ParseErrorKind::UnclosedOpen { bracket },
            pos,
        })
    })
}

/// Deepest allowed nesting of calls, objects, and select statements.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Result of a sub-parser: the node (if any) and the index of
/// the last token it consumed.
type Parsed = (Option<Node>, usize);

struct Parser<'a> {
    tokens: &'a [Token],
}

impl<'a> Parser<'a> {
    const fn new(tokens: &'a [Token]) -> Self {
        Self { tokens }
    }

    fn parse(self) -> Result<Vec<Node>, ParseError> {
        let mut forest = Vec::new();

        let mut i = 0;
        while i < self.tokens.len() {
            let (node, last) = self.parse_from(i, 0)?;
            if let Some(node) = node {
                forest.push(node);
            }
            i = last + 1;
        }

        if forest.is_empty() {
            return Err(ParseError {
                kind: ParseErrorKind::EmptyQuery,
                pos: 0,
            });
        }

        Ok(forest)
    }

    /// Parse one statement or expression starting at `start`,
    /// including any trailing `+ rhs` chain.
    fn parse_from(&self, start: usize, depth: usize) -> Result<Parsed, ParseError> {
        let (node, last) = self.parse_operand(start, depth)?;
        node.map_or(Ok((None, last)), |lhs| self.parse_binary(lhs, last, depth))
    }

    /// Parse a single statement or expression, without looking for `+`.
    fn parse_operand(&self, start: usize, depth: usize) -> Result<Parsed, ParseError> {
        let mut last = start.saturating_sub(1);
        let mut node = None;

        for (i, token) in self.tokens.iter().enumerate().skip(start) {
            match token.kind {
                TokenKind::Comment => {
                    last = i;
                    continue;
                }
                TokenKind::FunctionName => {
                    let (call, end) = self.parse_call(i, depth)?;
                    node = Some(Node::Expr(Expr::Call(call)));
                    last = end;
                }
                TokenKind::String | TokenKind::Int | TokenKind::Float | TokenKind::Bool => {
                    node = Some(Node::Expr(Expr::Literal(Literal {
                        pos: token.pos,
                        kind: token.kind,
                        value: token.value.clone(),
                    })));
                    last = i;
                }
                TokenKind::Keyword if token.value == "select" => {
                    let (select, end) = self.parse_select(i, depth)?;
                    node = Some(Node::Select(select));
                    last = end;
                }
                TokenKind::OpenBrace => {
                    let (object, end) = self.parse_object(i, depth)?;
                    node = Some(Node::Expr(Expr::Object(object)));
                    last = end;
                }
                _ => {
                    return Err(ParseError {
                        kind: ParseErrorKind::UnexpectedToken {
                            found: token.value.clone(),
                        },
                        pos: token.pos,
                    });
                }
            }
            break;
        }

        Ok((node, last))
    }

    /// Collect `lhs + a + b ...` operands in a loop, then fold them
    /// into a right-nested chain: `lhs + (a + b)`.
    fn parse_binary(&self, lhs: Node, last: usize, depth: usize) -> Result<Parsed, ParseError> {
        let is_plus = |i: &usize| self.tokens[*i].kind == TokenKind::Plus;
        let Some(mut plus_index) = self.next_significant(last + 1).filter(is_plus) else {
            return Ok((Some(lhs), last));
        };

        let mut pending = expect_expr(lhs, "the left side of '+'")?;
        let mut lefts = Vec::new();
        let mut last = last;
        loop {
            let plus = &self.tokens[plus_index];
            let (rhs, rhs_last) = self.parse_operand(plus_index + 1, depth)?;
            let Some(rhs) = rhs else {
                return Err(ParseError {
                    kind: ParseErrorKind::MissingOperand,
                    pos: plus.pos,
                });
            };
            let rhs = expect_expr(rhs, "the right side of '+'")?;
            lefts.push((plus.pos, std::mem::replace(&mut pending, rhs)));
            last = rhs_last;

            match self.next_significant(last + 1).filter(is_plus) {
                Some(next) => plus_index = next,
                None => break,
            }
        }

        let chain = lefts
            .into_iter()
            .rev()
            .fold(pending, |right, (op_pos, left)| {
                Expr::Binary(BinaryExpr {
                    op: BinaryOp::Concat,
                    op_pos,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            });
        Ok((Some(Node::Expr(chain)), last))
    }

    fn parse_select(
        &self,
        index: usize,
        depth: usize,
    ) -> Result<(SelectStatement, usize), ParseError> {
        let keyword = &self.tokens[index];
        check_depth(depth, keyword)?;
        let mut select = SelectStatement {
            pos: keyword.pos,
            expressions: Vec::new(),
        };

        let mut last = index;
        let mut i = index + 1;
        while i < self.tokens.len() {
            if self.closes_enclosing(i) {
                break;
            }

            let (node, end) = self.parse_from(i, depth + 1)?;
            last = end;
            let Some(node) = node else {
                break;
            };

            let expr = expect_expr(node, "select")?;
            select.expressions.push(expr);
            i = end + 1;
        }

        if select.expressions.is_empty() {
            return Err(ParseError {
                kind: ParseErrorKind::EmptySelect,
                pos: keyword.pos,
            });
        }

        Ok((select, last))
    }

    fn parse_call(&self, index: usize, depth: usize) -> Result<(FunctionCall, usize), ParseError> {
        let name = &self.tokens[index];
        check_depth(depth, name)?;

        let open = match self.tokens.get(index + 1) {
            Some(t) if t.kind == TokenKind::OpenParen => t,
            other => {
                return Err(ParseError {
                    kind: ParseErrorKind::ExpectedOpenParen {
                        function: name.value.clone(),
                        found: other.map(|t| t.value.clone()),
                    },
                    pos: name.pos,
                });
            }
        };

        let mut arguments = Vec::new();
        let mut i = index + 2;
        while let Some(j) = self.next_significant(i) {
            let token = &self.tokens[j];
            if token.kind == TokenKind::CloseParen {
                let call = FunctionCall {
                    pos: name.pos,
                    callee: Identifier {
                        name: name.value.clone(),
                        pos: name.pos,
                    },
                    arguments,
                    open_paren_pos: open.pos,
                    close_paren_pos: token.pos,
                };
                return Ok((call, j));
            }

            let (node, end) = self.parse_from(j, depth + 1)?;
            let Some(node) = node else {
                break;
            };
            let context = format!("an argument of '{}'", name.value);
            arguments.push(expect_expr(node, &context)?);

            let delimiter = self.next_significant(end + 1).map(|k| (k, &self.tokens[k]));
            match delimiter {
                Some((k, t)) if t.kind == TokenKind::Comma => i = k + 1,
                Some((k, t)) if t.kind == TokenKind::CloseParen => i = k,
                other => {
                    return Err(ParseError {
                        kind: ParseErrorKind::ExpectedArgumentDelimiter {
                            function: name.value.clone(),
                            found: other.map(|(_, t)| t.value.clone()),
                        },
                        pos: other.map_or(token.pos, |(_, t)| t.pos),
                    });
                }
            }
        }

        Err(ParseError {
            kind: ParseErrorKind::UnclosedCall {
                function: name.value.clone(),
            },
            pos: name.pos,
        })
    }

    fn parse_object(
        &self,
        index: usize,
        depth: usize,
    ) -> Result<(ObjectLiteral, usize), ParseError> {
        let open = &self.tokens[index];
        check_depth(depth, open)?;
        let mut entries = Vec::new();

        let mut i = index + 1;
        while i < self.tokens.len() {
            let token = &self.tokens[i];
            match token.kind {
                TokenKind::CloseBrace => {
                    let object = ObjectLiteral {
                        open_brace_pos: open.pos,
                        close_brace_pos: token.pos,
                        entries,
                    };
                    return Ok((object, i));
                }
                TokenKind::Comment => i += 1,
                TokenKind::ObjectParamKey => {
                    let (entry, next) = self.parse_entry(i, depth + 1)?;
                    entries.push(entry);
                    i = next;
                }
                _ => {
                    return Err(ParseError {
                        kind: ParseErrorKind::UnexpectedObjectToken {
                            found: token.value.clone(),
                        },
                        pos: token.pos,
                    });
                }
            }
        }

        Err(ParseError {
            kind: ParseErrorKind::UnclosedObject,
            pos: open.pos,
        })
    }

    /// Parse `key: value` followed by `,` or `}`. Returns the entry and
    /// the index to resume at (past a comma, or at the closing brace).
    fn parse_entry(&self, index: usize, depth: usize) -> Result<(KeyValue, usize), ParseError> {
        let key = &self.tokens[index];

        let colon = match self.tokens.get(index + 1) {
            Some(t) if t.kind == TokenKind::Colon => t,
            other => {
                return Err(ParseError {
                    kind: ParseErrorKind::ExpectedColon {
                        key: key.value.clone(),
                        found: other.map(|t| t.value.clone()),
                    },
                    pos: key.pos,
                });
            }
        };

        let (node, end) = self.parse_from(index + 2, depth)?;
        let Some(node) = node else {
            return Err(ParseError {
                kind: ParseErrorKind::MissingValue {
                    key: key.value.clone(),
                },
                pos: key.pos,
            });
        };
        let context = format!("the value of '{}'", key.value);
        let value = expect_expr(node, &context)?;

        let next = match self.next_significant(end + 1).map(|k| (k, &self.tokens[k])) {
            Some((k, t)) if t.kind == TokenKind::Comma => k + 1,
            Some((k, t)) if t.kind == TokenKind::CloseBrace => k,
            other => {
                return Err(ParseError {
                    kind: ParseErrorKind::ExpectedEntryDelimiter {
                        key: key.value.clone(),
                        found: other.map(|(_, t)| t.value.clone()),
                    },
                    pos: other.map_or(key.pos, |(_, t)| t.pos),
                });
            }
        };

        let entry = KeyValue {
            key: Identifier {
                name: key.value.clone(),
                pos: key.pos,
            },
            value,
            colon_pos: colon.pos,
        };
        Ok((entry, next))
    }

    /// Whether the next significant token ends an enclosing call or object.
    fn closes_enclosing(&self, from: usize) -> bool {
        self.next_significant(from).is_some_and(|i| {
            matches!(
                self.tokens[i].kind,
                TokenKind::Comma | TokenKind::CloseParen | TokenKind::CloseBrace
            )
        })
    }

    /// Index of the first non-comment token at or after `from`.
    fn next_significant(&self, from: usize) -> Option<usize> {
        (from..self.tokens.len()).find(|&i| self.tokens[i].kind != TokenKind::Comment)
    }
}

fn check_depth(depth: usize, token: &Token) -> Result<(), ParseError> {
    if depth < MAX_NESTING_DEPTH {
        return Ok(());
    }
    Err(ParseError {
        kind: ParseErrorKind::NestingTooDeep {
            limit: MAX_NESTING_DEPTH,
        },
        pos: token.pos,
    })
}

fn expect_expr(node: Node, context: &str) -> Result<Expr, ParseError> {
    node.into_expr().map_err(|node| ParseError {
        kind: ParseErrorKind::ExpectedExpression {
            context: context.to_string(),
            found: node.describe(),
        },
        pos: node.start(),
    })
}
