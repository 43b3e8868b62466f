//! Lowering tests: builtin rendering, options, and semantic errors.

use regexl::{
    Arity, Builtin, CompilerOptions, Lowered, SemanticError, SemanticErrorKind, lower, parse,
    tokenize,
};

fn lower_input(input: &str) -> Result<Lowered, SemanticError> {
    let tokens = tokenize(input).expect("tokenize failed");
    let forest = parse(&tokens).expect("parse failed");
    lower(&forest)
}

fn body(input: &str) -> String {
    lower_input(input)
        .unwrap_or_else(|e| panic!("lower failed: {e}\n--- input ---\n{input}"))
        .body
}

#[test]
fn arity_table() {
    let arities: Vec<_> = Builtin::ALL.iter().map(|b| (b.name(), b.arity())).collect();
    assert_eq!(
        arities,
        vec![
            ("set_options", Arity::Exactly(1)),
            ("any_strings_of", Arity::Any),
            ("any_chars_of", Arity::Any),
            ("starts_with", Arity::Exactly(1)),
            ("ends_with", Arity::Exactly(1)),
            ("any_chars", Arity::Exactly(0)),
            ("zero_plus_of", Arity::Exactly(1)),
            ("one_plus_of", Arity::Exactly(1)),
            ("from_to", Arity::Exactly(2)),
            ("count_between", Arity::Exactly(3)),
        ]
    );
}

#[test]
fn default_options() {
    let options = CompilerOptions::default();
    assert!(!options.case_sensitive);
    assert!(!options.find_all_matches);
    assert_eq!(options.flag_group(), "(?i)");
}

#[test]
fn later_options_override_earlier() {
    let lowered = lower_input(
        "set_options({case_sensitive: true})\n\
         set_options({case_sensitive: false, find_all_matches: true})\n\
         select 'a'",
    )
    .expect("lower failed");
    assert_eq!(
        lowered.options,
        CompilerOptions {
            case_sensitive: false,
            find_all_matches: true,
        }
    );
    assert_eq!(lowered.pattern(), "(?i)a");
}

#[test]
fn select_absorbs_trailing_set_options() {
    let err = lower_input("select 'a' set_options({case_sensitive: true})").unwrap_err();
    assert_eq!(err.kind, SemanticErrorKind::ConfigNotTopLevel);
    assert_eq!(err.pos, 11);
}

#[test]
fn empty_options_object() {
    let lowered = lower_input("set_options({}) select 'a'").expect("lower failed");
    assert_eq!(lowered.options, CompilerOptions::default());
}

#[test]
fn numbers_render_verbatim() {
    assert_eq!(body("select from_to(0, 9)"), "0-9");
    assert_eq!(body("select 1.5"), r"1\.5");
    assert_eq!(body("select -- n\n 42"), "42");
}

#[test]
fn nested_quantifiers() {
    assert_eq!(
        body("select zero_plus_of(one_plus_of(any_strings_of('ab', 'cd')))"),
        "(?:(?:ab|cd)+)*"
    );
}

#[test]
fn char_class_concatenates_arguments() {
    assert_eq!(
        body("select any_chars_of(from_to('a', 'f'), from_to(0, 9), '_')"),
        "[a-f0-9_]"
    );
}

#[test]
fn escaping_inside_calls() {
    assert_eq!(body(r"select starts_with('C:\dir')"), r"^C:\\dir");
    assert_eq!(body("select any_strings_of('a.b', '(c)')"), r"a\.b|\(c\)");
}

#[test]
fn unknown_function_in_argument() {
    let err = lower_input("select one_plus_of(two_plus_of('a'))").unwrap_err();
    assert_eq!(
        err.kind,
        SemanticErrorKind::UnknownFunction {
            name: "two_plus_of".to_string()
        }
    );
    assert_eq!(err.pos, 19);
}

#[test]
fn arity_error_display() {
    let err = lower_input("select any_chars('x')").unwrap_err();
    assert_eq!(
        err.to_string(),
        "function 'any_chars' takes exactly 0 argument(s) but was passed 1 at byte 7"
    );
}

#[test]
fn set_options_arity() {
    let err = lower_input("set_options() select 'a'").unwrap_err();
    assert_eq!(
        err.kind,
        SemanticErrorKind::ArityMismatch {
            function: "set_options",
            expected: Arity::Exactly(1),
            found: 0,
        }
    );
}

#[test]
fn object_as_function_argument() {
    let err = lower_input("select starts_with({case_sensitive: true})").unwrap_err();
    assert_eq!(
        err.kind,
        SemanticErrorKind::NotRenderable {
            found: "object literal"
        }
    );
    assert_eq!(err.pos, 19);
}

#[test]
fn option_value_from_call() {
    let err = lower_input("set_options({case_sensitive: any_chars()}) select 'a'").unwrap_err();
    assert_eq!(
        err.kind,
        SemanticErrorKind::InvalidBool {
            key: "case_sensitive".to_string(),
            value: ".*".to_string(),
        }
    );
}

#[test]
fn top_level_object() {
    let err = lower_input("{case_sensitive: true} select 'a'").unwrap_err();
    assert_eq!(
        err.kind,
        SemanticErrorKind::TopLevelNotAllowed {
            found: "object literal"
        }
    );
    assert_eq!(err.pos, 0);
}

#[test]
fn top_level_concatenation() {
    let err = lower_input("'a' + 'b' select 'c'").unwrap_err();
    assert_eq!(
        err.kind,
        SemanticErrorKind::TopLevelNotAllowed {
            found: "binary expression"
        }
    );
}

#[test]
fn set_options_in_concatenation() {
    let err = lower_input("select 'a' + set_options({})").unwrap_err();
    assert_eq!(err.kind, SemanticErrorKind::ConfigNotTopLevel);
    assert_eq!(err.pos, 13);
}

#[test]
fn missing_select_display() {
    let err = lower_input("set_options({find_all_matches: true})").unwrap_err();
    assert_eq!(err.to_string(), "query has no select statement at byte 0");
}
