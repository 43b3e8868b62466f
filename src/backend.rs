//! Lowering of a parsed query into regular-expression syntax.
//!
//! The top level may hold `set_options(...)` calls and exactly one
//! `select` statement. Expressions are rendered by dispatching on a
//! closed table of builtin functions.

use std::fmt;

use crate::ast::{Expr, FunctionCall, Node, ObjectLiteral, SelectStatement, Spanned};

/// Flags collected from `set_options` while lowering one query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Match case exactly. Off by default, so queries are case-insensitive.
    pub case_sensitive: bool,
    /// Report every match rather than only the first. The engine has no
    /// inline flag for this; it selects which search API is used.
    pub find_all_matches: bool,
}

impl CompilerOptions {
    /// Inline flag group that prefixes the rendered pattern.
    #[must_use]
    pub const fn flag_group(self) -> &'static str {
        if self.case_sensitive { "(?)" } else { "(?i)" }
    }
}

/// Number of arguments a builtin accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    Any,
}

impl Arity {
    #[must_use]
    pub const fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exactly(n) => n == count,
            Self::Any => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "exactly {n}"),
            Self::Any => write!(f, "any number of"),
        }
    }
}

/// The closed set of functions a query may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    SetOptions,
    AnyStringsOf,
    AnyCharsOf,
    StartsWith,
    EndsWith,
    AnyChars,
    ZeroPlusOf,
    OnePlusOf,
    FromTo,
    CountBetween,
}

impl Builtin {
    pub const ALL: [Self; 10] = [
        Self::SetOptions,
        Self::AnyStringsOf,
        Self::AnyCharsOf,
        Self::StartsWith,
        Self::EndsWith,
        Self::AnyChars,
        Self::ZeroPlusOf,
        Self::OnePlusOf,
        Self::FromTo,
        Self::CountBetween,
    ];

    /// Look up a builtin by the name used in queries.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SetOptions => "set_options",
            Self::AnyStringsOf => "any_strings_of",
            Self::AnyCharsOf => "any_chars_of",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::AnyChars => "any_chars",
            Self::ZeroPlusOf => "zero_plus_of",
            Self::OnePlusOf => "one_plus_of",
            Self::FromTo => "from_to",
            Self::CountBetween => "count_between",
        }
    }

    #[must_use]
    pub const fn arity(self) -> Arity {
        match self {
            Self::AnyStringsOf | Self::AnyCharsOf => Arity::Any,
            Self::AnyChars => Arity::Exactly(0),
            Self::SetOptions | Self::StartsWith | Self::EndsWith | Self::ZeroPlusOf | Self::OnePlusOf => {
                Arity::Exactly(1)
            }
            Self::FromTo => Arity::Exactly(2),
            Self::CountBetween => Arity::Exactly(3),
        }
    }
}

/// Classifies a semantic error found while lowering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticErrorKind {
    /// Nothing to lower.
    EmptyQuery,
    /// No `select` statement at the top level.
    MissingSelect,
    /// More than one `select` statement at the top level.
    MultipleSelect,
    /// A bare expression at the top level.
    TopLevelNotAllowed { found: &'static str },
    /// A call other than `set_options` at the top level.
    TopLevelCall { function: String },
    /// `set_options` used inside an expression.
    ConfigNotTopLevel,
    /// `set_options` given something other than an object literal.
    ConfigArgumentNotObject { found: &'static str },
    /// Object key not recognised by `set_options`.
    UnknownOption { key: String },
    /// Option value that is not exactly `true` or `false`.
    InvalidBool { key: String, value: String },
    /// Call to a function outside the builtin table.
    UnknownFunction { name: String },
    /// Builtin called with the wrong number of arguments.
    ArityMismatch {
        function: &'static str,
        expected: Arity,
        found: usize,
    },
    /// Node that has no regex rendering.
    NotRenderable { found: &'static str },
}

impl fmt::Display for SemanticErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyQuery => write!(f, "query must have at least one statement"),
            Self::MissingSelect => write!(f, "query has no select statement"),
            Self::MultipleSelect => {
                write!(f, "only one select statement is allowed per query")
            }
            Self::TopLevelNotAllowed { found } => {
                write!(
                    f,
                    "only 'select' and 'set_options' can be at the top level, got a {found}"
                )
            }
            Self::TopLevelCall { function } => {
                write!(
                    f,
                    "only the function 'set_options' can be used at the top level, got '{function}'"
                )
            }
            Self::ConfigNotTopLevel => {
                write!(f, "'set_options' can only be used at the top level")
            }
            Self::ConfigArgumentNotObject { found } => {
                write!(
                    f,
                    "'set_options' expects an object (e.g. {{case_sensitive: true}}), got a {found}"
                )
            }
            Self::UnknownOption { key } => {
                write!(f, "unknown parameter '{key}' in the function set_options")
            }
            Self::InvalidBool { key, value } => {
                write!(
                    f,
                    "invalid value '{value}' for {key}, only 'true' and 'false' are allowed"
                )
            }
            Self::UnknownFunction { name } => {
                write!(f, "trying to call unknown function '{name}'")
            }
            Self::ArityMismatch {
                function,
                expected,
                found,
            } => {
                write!(
                    f,
                    "function '{function}' takes {expected} argument(s) but was passed {found}"
                )
            }
            Self::NotRenderable { found } => {
                write!(f, "a {found} cannot be converted to a regex")
            }
        }
    }
}

/// Error produced while lowering a forest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at byte {pos}")]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub pos: usize,
}

/// A lowered query: the regex body and the options that apply to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lowered {
    pub body: String,
    pub options: CompilerOptions,
}

impl Lowered {
    /// Body prefixed with the inline flag group, e.g. `(?i)^friend`.
    #[must_use]
    pub fn pattern(&self) -> String {
        format!("{}{}", self.options.flag_group(), self.body)
    }
}

/// Lower a parsed forest into a regex body and its options.
///
/// # Errors
///
/// Returns `SemanticError` for unknown functions, wrong argument
/// counts, invalid `set_options` input, or a top level that is not
/// `set_options(...)` calls plus exactly one `select`.
pub fn lower(forest: &[Node]) -> Result<Lowered, SemanticError> {
    Backend::default().lower(forest)
}

/// Escape the regex metacharacters `.()[]{}\` in a literal.
#[must_use]
pub fn escape_literal(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for ch in literal.chars() {
        if matches!(ch, '.' | '(' | ')' | '[' | ']' | '{' | '}' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[derive(Default)]
struct Backend {
    options: CompilerOptions,
}

impl Backend {
    fn lower(mut self, forest: &[Node]) -> Result<Lowered, SemanticError> {
        if forest.is_empty() {
            return Err(SemanticError {
                kind: SemanticErrorKind::EmptyQuery,
                pos: 0,
            });
        }

        let mut body = None;
        for node in forest {
            match node {
                Node::Select(select) => {
                    if body.is_some() {
                        return Err(SemanticError {
                            kind: SemanticErrorKind::MultipleSelect,
                            pos: select.pos,
                        });
                    }
                    body = Some(Self::render_select(select)?);
                }
                Node::Expr(Expr::Call(call)) => {
                    if call.callee.name != Builtin::SetOptions.name() {
                        return Err(SemanticError {
                            kind: SemanticErrorKind::TopLevelCall {
                                function: call.callee.name.clone(),
                            },
                            pos: call.pos,
                        });
                    }
                    self.apply_options(call)?;
                }
                Node::Expr(expr) => {
                    return Err(SemanticError {
                        kind: SemanticErrorKind::TopLevelNotAllowed {
                            found: expr.describe(),
                        },
                        pos: expr.start(),
                    });
                }
            }
        }

        let Some(body) = body else {
            return Err(SemanticError {
                kind: SemanticErrorKind::MissingSelect,
                pos: forest[0].start(),
            });
        };

        tracing::debug!(
            body = %body,
            case_sensitive = self.options.case_sensitive,
            find_all_matches = self.options.find_all_matches,
            "lowered query"
        );

        Ok(Lowered {
            body,
            options: self.options,
        })
    }

    fn apply_options(&mut self, call: &FunctionCall) -> Result<(), SemanticError> {
        check_arity(Builtin::SetOptions, call)?;

        match &call.arguments[0] {
            Expr::Object(object) => self.apply_object(object),
            other => Err(SemanticError {
                kind: SemanticErrorKind::ConfigArgumentNotObject {
                    found: other.describe(),
                },
                pos: other.start(),
            }),
        }
    }

    fn apply_object(&mut self, object: &ObjectLiteral) -> Result<(), SemanticError> {
        for entry in &object.entries {
            let key = &entry.key.name;
            let value = Self::render(&entry.value)?;

            let flag = match key.as_str() {
                "case_sensitive" => &mut self.options.case_sensitive,
                "find_all_matches" => &mut self.options.find_all_matches,
                _ => {
                    return Err(SemanticError {
                        kind: SemanticErrorKind::UnknownOption { key: key.clone() },
                        pos: entry.key.pos,
                    });
                }
            };

            *flag = match value.as_str() {
                "true" => true,
                "false" => false,
                _ => {
                    return Err(SemanticError {
                        kind: SemanticErrorKind::InvalidBool {
                            key: key.clone(),
                            value,
                        },
                        pos: entry.value.start(),
                    });
                }
            };
        }
        Ok(())
    }

    fn render_select(select: &SelectStatement) -> Result<String, SemanticError> {
        let mut out = String::new();
        for expr in &select.expressions {
            out.push_str(&Self::render(expr)?);
        }
        Ok(out)
    }

    fn render(expr: &Expr) -> Result<String, SemanticError> {
        match expr {
            Expr::Literal(literal) => Ok(escape_literal(&literal.value)),
            Expr::Binary(binary) => binary
                .operands()
                .into_iter()
                .map(Self::render)
                .collect(),
            Expr::Call(call) => Self::render_call(call),
            Expr::Identifier(_) | Expr::Object(_) => Err(SemanticError {
                kind: SemanticErrorKind::NotRenderable {
                    found: expr.describe(),
                },
                pos: expr.start(),
            }),
        }
    }

    fn render_call(call: &FunctionCall) -> Result<String, SemanticError> {
        let Some(builtin) = Builtin::from_name(&call.callee.name) else {
            return Err(SemanticError {
                kind: SemanticErrorKind::UnknownFunction {
                    name: call.callee.name.clone(),
                },
                pos: call.pos,
            });
        };

        match builtin {
            Builtin::SetOptions => Err(SemanticError {
                kind: SemanticErrorKind::ConfigNotTopLevel,
                pos: call.pos,
            }),
            Builtin::AnyStringsOf => Self::render_args(builtin, call).map(|args| args.join("|")),
            Builtin::AnyCharsOf => Self::render_args(builtin, call).map(|args| {
                if args.is_empty() {
                    String::new()
                } else {
                    format!("[{}]", args.concat())
                }
            }),
            Builtin::StartsWith => Self::render_args(builtin, call)
                .map(|args| format!("^{}", args[0])),
            Builtin::EndsWith => Self::render_args(builtin, call)
                .map(|args| format!("{}$", args[0])),
            Builtin::AnyChars => Self::render_args(builtin, call).map(|_| ".*".to_string()),
            // Non-capturing groups: nothing reads the captures.
            Builtin::ZeroPlusOf => Self::render_args(builtin, call)
                .map(|args| format!("(?:{})*", args[0])),
            Builtin::OnePlusOf => Self::render_args(builtin, call)
                .map(|args| format!("(?:{})+", args[0])),
            Builtin::FromTo => Self::render_args(builtin, call)
                .map(|args| format!("{}-{}", args[0], args[1])),
            Builtin::CountBetween => Self::render_args(builtin, call)
                .map(|args| format!("{}{{{},{}}}", args[0], args[1], args[2])),
        }
    }

    /// Check the argument count, then render each argument.
    fn render_args(builtin: Builtin, call: &FunctionCall) -> Result<Vec<String>, SemanticError> {
        check_arity(builtin, call)?;
        call.arguments.iter().map(Self::render).collect()
    }
}

fn check_arity(builtin: Builtin, call: &FunctionCall) -> Result<(), SemanticError> {
    let expected = builtin.arity();
    let found = call.arguments.len();
    if expected.accepts(found) {
        return Ok(());
    }
    Err(SemanticError {
        kind: SemanticErrorKind::ArityMismatch {
            function: builtin.name(),
            expected,
            found,
        },
        pos: call.pos,
    })
}
