//! Compiler for a small declarative query language that lowers to
//! regular expressions.
//!
//! Queries are built from a fixed vocabulary of pattern functions
//! instead of raw regex syntax. A query is lexed into tokens, parsed
//! into a forest of nodes, lowered into a pattern string, and handed
//! to the [`regex`] crate.
//!
//! # Quick start
//!
//! ```
//! let query = regexl::compile(
//!     "set_options({case_sensitive: false}) select starts_with('friend')",
//! )
//! .unwrap();
//!
//! assert_eq!(query.pattern(), "(?i)^friend");
//! assert!(query.is_match("Friend, how are you?"));
//! ```
//!
//! ## Running the stages by hand
//!
//! ```
//! use regexl::{lower, parse, tokenize};
//!
//! let tokens = tokenize("select 'Hell' + one_plus_of('o')").unwrap();
//! let forest = parse(&tokens).unwrap();
//! let lowered = lower(&forest).unwrap();
//! assert_eq!(lowered.pattern(), "(?i)Hell(?:o)+");
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

use std::fmt;

use regex::{Regex, RegexBuilder};

pub mod ast;
pub mod backend;
pub mod formatter;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{
    BinaryExpr, BinaryOp, Expr, FunctionCall, Identifier, KeyValue, Literal, Node, ObjectLiteral,
    SelectStatement, Spanned,
};
pub use backend::{
    Arity, Builtin, CompilerOptions, Lowered, SemanticError, SemanticErrorKind, escape_literal,
    lower,
};
pub use formatter::diagram;
pub use lexer::{LexError, LexErrorKind, tokenize};
pub use parser::{MAX_NESTING_DEPTH, ParseError, ParseErrorKind, parse};
pub use token::{Token, TokenKind};

/// Unified error type covering every compilation stage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A lexer error.
    #[error("{0}")]
    Lex(#[from] LexError),
    /// A parser error.
    #[error("{0}")]
    Parse(#[from] ParseError),
    /// A lowering error.
    #[error("{0}")]
    Semantic(#[from] SemanticError),
    /// The regex engine rejected the generated pattern.
    #[error("compiling regexp failed, pattern={pattern}: {source}")]
    Engine {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl Error {
    /// Byte offset into the query the error points at, if any.
    #[must_use]
    pub const fn position(&self) -> Option<usize> {
        match self {
            Self::Lex(e) => Some(e.pos),
            Self::Parse(e) => Some(e.pos),
            Self::Semantic(e) => Some(e.pos),
            Self::Engine { .. } => None,
        }
    }
}

/// Debug dumps emitted while compiling, as `info` events on the
/// `regexl::debug` tracing target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugOptions {
    /// Dump the token sequence as JSON.
    pub print_tokens: bool,
    /// Dump the parsed forest as JSON.
    pub print_tree_json: bool,
    /// Dump the parsed forest as an indented tree diagram.
    pub print_tree_diagram: bool,
}

/// A query compiled into a ready-to-use regex.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pattern: String,
    regex: Regex,
    options: CompilerOptions,
}

impl CompiledQuery {
    /// Generated pattern including the inline flag group, e.g. `(?i)^friend`.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The compiled engine object.
    #[must_use]
    pub const fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Options set by the query's `set_options` call.
    #[must_use]
    pub const fn options(&self) -> CompilerOptions {
        self.options
    }

    #[must_use]
    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }

    /// Matches in `haystack`: every non-overlapping match when the query
    /// set `find_all_matches`, otherwise at most the first one.
    #[must_use]
    pub fn find_matches<'h>(&self, haystack: &'h str) -> Vec<&'h str> {
        if self.options.find_all_matches {
            self.regex.find_iter(haystack).map(|m| m.as_str()).collect()
        } else {
            self.regex.find(haystack).map(|m| m.as_str()).into_iter().collect()
        }
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// Compile a query string into a regex.
pub fn compile(query: &str) -> Result<CompiledQuery, Error> {
    compile_with(query, DebugOptions::default())
}

/// Compile a query string, emitting the debug dumps enabled in `debug`.
pub fn compile_with(query: &str, debug: DebugOptions) -> Result<CompiledQuery, Error> {
    let tokens = tokenize(query)?;
    tracing::debug!(count = tokens.len(), "tokenized query");
    if debug.print_tokens {
        dump("tokens", token::to_json(&tokens));
    }

    let forest = parse(&tokens)?;
    tracing::debug!(nodes = forest.len(), "parsed query");
    if debug.print_tree_json {
        dump("tree", ast::to_json(&forest));
    }
    if debug.print_tree_diagram {
        dump("tree diagram", Ok(diagram(&forest)));
    }

    let lowered = lower(&forest)?;
    let pattern = lowered.pattern();

    // The engine rejects an empty flag group, so case folding is
    // configured on the builder instead of inline.
    let regex = RegexBuilder::new(&lowered.body)
        .case_insensitive(!lowered.options.case_sensitive)
        .build()
        .map_err(|source| Error::Engine {
            pattern: pattern.clone(),
            source,
        })?;

    tracing::debug!(pattern = %pattern, "compiled query");
    Ok(CompiledQuery {
        pattern,
        regex,
        options: lowered.options,
    })
}

/// Compile a query string that is known to be valid.
///
/// # Panics
///
/// Panics if the query does not compile.
#[must_use]
pub fn must_compile(query: &str) -> CompiledQuery {
    compile(query).unwrap_or_else(|err| panic!("invalid query: {err}"))
}

fn dump(what: &str, rendered: Result<String, serde_json::Error>) {
    match rendered {
        Ok(text) => tracing::info!(target: "regexl::debug", "{what}:\n{text}"),
        Err(err) => tracing::warn!(target: "regexl::debug", %err, "failed to serialize {what}"),
    }
}

/// A query string together with its compiled form.
///
/// The compiled regex is only stored once compilation succeeds.
#[derive(Debug, Clone)]
pub struct Regexl {
    query: String,
    debug: DebugOptions,
    compiled: Option<CompiledQuery>,
}

impl Regexl {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            debug: DebugOptions::default(),
            compiled: None,
        }
    }

    #[must_use]
    pub fn with_debug(mut self, debug: DebugOptions) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The compiled query, if `compile` has succeeded.
    #[must_use]
    pub const fn compiled(&self) -> Option<&CompiledQuery> {
        self.compiled.as_ref()
    }

    /// Compile the query. On error the previous result is kept.
    pub fn compile(&mut self) -> Result<&CompiledQuery, Error> {
        let compiled = compile_with(&self.query, self.debug)?;
        Ok(self.compiled.insert(compiled))
    }

    /// Compile the query, panicking on error.
    ///
    /// # Panics
    ///
    /// Panics if the query does not compile.
    #[must_use]
    pub fn must_compile(mut self) -> Self {
        if let Err(err) = self.compile() {
            panic!("invalid query: {err}");
        }
        self
    }
}
