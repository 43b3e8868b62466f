#![allow(dead_code)]

use regexl::{CompiledQuery, Error, compile};

/// Compile a query and return its pattern, failing the test on error.
pub fn pattern_of(query: &str) -> String {
    compile(query)
        .unwrap_or_else(|e| panic!("compile failed: {e}\n--- query ---\n{query}"))
        .pattern()
        .to_string()
}

/// Compile a query, failing the test on error.
pub fn compiled(query: &str) -> CompiledQuery {
    compile(query).unwrap_or_else(|e| panic!("compile failed: {e}\n--- query ---\n{query}"))
}

/// Compile a query that must be rejected.
pub fn compile_err(query: &str) -> Error {
    match compile(query) {
        Ok(q) => panic!(
            "expected an error, got pattern {}\n--- query ---\n{query}",
            q.pattern()
        ),
        Err(e) => e,
    }
}
