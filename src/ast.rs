use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

use crate::token::TokenKind;

/// Anything that covers a byte range of the query.
pub trait Spanned {
    /// Offset of the first byte belonging to this node.
    fn start(&self) -> usize;
    /// Offset one past the last byte belonging to this node.
    fn end(&self) -> usize;
}

/// Top-level node of a parsed query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Node {
    Select(SelectStatement),
    Expr(Expr),
}

/// Expression nodes: anything that can be lowered to a regex fragment
/// or passed as an argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Expr {
    Identifier(Identifier),
    Call(FunctionCall),
    Binary(BinaryExpr),
    Literal(Literal),
    Object(ObjectLiteral),
}

/// `select <expr>+`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectStatement {
    pub pos: usize,
    pub expressions: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identifier {
    pub name: String,
    pub pos: usize,
}

/// `name(arg, ...)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionCall {
    pub pos: usize,
    pub callee: Identifier,
    pub arguments: Vec<Expr>,
    pub open_paren_pos: usize,
    pub close_paren_pos: usize,
}

/// Binary operators. Concatenation is the only one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Concat,
}

impl BinaryOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Concat => "+",
        }
    }
}

/// `left + right`.
///
/// Chains are right-nested: `a + b + c` is `a + (b + c)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    /// Offset of the operator token.
    pub op_pos: usize,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

impl BinaryExpr {
    /// Operands of the chain starting here, left to right.
    #[must_use]
    pub fn operands(&self) -> Vec<&Expr> {
        let mut operands = vec![self.left.as_ref()];
        let mut right = self.right.as_ref();
        while let Expr::Binary(next) = right {
            operands.push(next.left.as_ref());
            right = next.right.as_ref();
        }
        operands.push(right);
        operands
    }
}

impl Drop for BinaryExpr {
    // Unlink the right spine one node at a time; long chains would
    // otherwise drop recursively.
    fn drop(&mut self) {
        let mut right = std::mem::replace(self.right.as_mut(), Expr::placeholder());
        while let Expr::Binary(mut next) = right {
            right = std::mem::replace(next.right.as_mut(), Expr::placeholder());
        }
    }
}

/// Serialized flat as `{op, op_pos, operands}`.
impl Serialize for BinaryExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BinaryExpr", 3)?;
        state.serialize_field("op", &self.op)?;
        state.serialize_field("op_pos", &self.op_pos)?;
        state.serialize_field("operands", &self.operands())?;
        state.end()
    }
}

/// String, integer, float or boolean literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Literal {
    pub pos: usize,
    pub kind: TokenKind,
    pub value: String,
}

/// `key: value` inside an object literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyValue {
    pub key: Identifier,
    pub value: Expr,
    pub colon_pos: usize,
}

/// `{key: value, ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectLiteral {
    pub open_brace_pos: usize,
    pub close_brace_pos: usize,
    pub entries: Vec<KeyValue>,
}

impl Node {
    /// Short human-readable name of the node kind, used in diagnostics.
    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Select(_) => "select statement",
            Self::Expr(expr) => expr.describe(),
        }
    }

    /// Return the expression, or give the node back if it is a statement.
    pub fn into_expr(self) -> Result<Expr, Self> {
        match self {
            Self::Expr(expr) => Ok(expr),
            other @ Self::Select(_) => Err(other),
        }
    }
}

impl Expr {
    const fn placeholder() -> Self {
        Self::Identifier(Identifier {
            name: String::new(),
            pos: 0,
        })
    }

    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Identifier(_) => "identifier",
            Self::Call(_) => "function call",
            Self::Binary(_) => "binary expression",
            Self::Literal(_) => "literal",
            Self::Object(_) => "object literal",
        }
    }
}

impl Spanned for Node {
    fn start(&self) -> usize {
        match self {
            Self::Select(s) => s.start(),
            Self::Expr(e) => e.start(),
        }
    }

    fn end(&self) -> usize {
        match self {
            Self::Select(s) => s.end(),
            Self::Expr(e) => e.end(),
        }
    }
}

impl Spanned for Expr {
    fn start(&self) -> usize {
        match self {
            Self::Identifier(e) => e.start(),
            Self::Call(e) => e.start(),
            Self::Binary(e) => e.start(),
            Self::Literal(e) => e.start(),
            Self::Object(e) => e.start(),
        }
    }

    fn end(&self) -> usize {
        match self {
            Self::Identifier(e) => e.end(),
            Self::Call(e) => e.end(),
            Self::Binary(e) => e.end(),
            Self::Literal(e) => e.end(),
            Self::Object(e) => e.end(),
        }
    }
}

impl Spanned for SelectStatement {
    fn start(&self) -> usize {
        self.pos
    }

    fn end(&self) -> usize {
        self.expressions
            .last()
            .map_or(self.pos + 1, Spanned::end)
    }
}

impl Spanned for Identifier {
    fn start(&self) -> usize {
        self.pos
    }

    fn end(&self) -> usize {
        self.pos + self.name.len()
    }
}

impl Spanned for FunctionCall {
    fn start(&self) -> usize {
        self.pos
    }

    fn end(&self) -> usize {
        self.close_paren_pos + 1
    }
}

impl Spanned for BinaryExpr {
    fn start(&self) -> usize {
        self.left.start()
    }

    fn end(&self) -> usize {
        let mut right = self.right.as_ref();
        while let Expr::Binary(next) = right {
            right = next.right.as_ref();
        }
        right.end()
    }
}

impl Spanned for Literal {
    fn start(&self) -> usize {
        self.pos
    }

    fn end(&self) -> usize {
        self.pos + self.value.len()
    }
}

impl Spanned for KeyValue {
    fn start(&self) -> usize {
        self.key.start()
    }

    fn end(&self) -> usize {
        self.value.end()
    }
}

impl Spanned for ObjectLiteral {
    fn start(&self) -> usize {
        self.open_brace_pos
    }

    fn end(&self) -> usize {
        self.close_brace_pos + 1
    }
}

/// Render a forest as pretty-printed JSON.
pub fn to_json(forest: &[Node]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(forest)
}
