//! Tree diagram and JSON dump tests.

use regexl::{Node, ast, diagram, parse, token, tokenize};

fn forest(input: &str) -> Vec<Node> {
    let tokens = tokenize(input).expect("tokenize failed");
    parse(&tokens).expect("parse failed")
}

#[test]
fn diagram_email_fragment() {
    let out = diagram(&forest(
        "select one_plus_of(any_chars_of(from_to('A', 'Z'), '.-')) + '@'",
    ));
    let expected = "\
|-- select
|   |-- +
|   |   |-- one_plus_of
|   |   |   |-- any_chars_of
|   |   |   |   |-- from_to
|   |   |   |   |   |-- A
|   |   |   |   |   |-- Z
|   |   |   |   |-- .-
|   |   |-- @
";
    assert_eq!(out, expected);
}

#[test]
fn diagram_ignores_comments() {
    let with = diagram(&forest("-- head\nselect 'a' -- tail\n + 'b'"));
    let without = diagram(&forest("select 'a' + 'b'"));
    assert_eq!(with, without);
}

#[test]
fn diagram_multiple_select_expressions() {
    assert_eq!(
        diagram(&forest("select 'a' 10 2.5")),
        "|-- select\n|   |-- a\n|   |-- 10\n|   |-- 2.5\n"
    );
}

#[test]
fn diagram_empty_forest() {
    assert_eq!(diagram(&[]), "");
}

#[test]
fn tokens_json_shape() {
    let tokens = tokenize("select 'a'").expect("tokenize failed");
    let json = token::to_json(&tokens).expect("serialize failed");
    let value: serde_json::Value = serde_json::from_str(&json).expect("invalid json");
    let first = &value[0];
    assert_eq!(first["kind"], "Keyword");
    assert_eq!(first["value"], "select");
    assert_eq!(first["pos"], 0);
    assert_eq!(value.as_array().map(Vec::len), Some(2));
}

#[test]
fn tree_json_is_valid() {
    let json = ast::to_json(&forest("set_options({case_sensitive: true}) select 'a' + any_chars()"))
        .expect("serialize failed");
    let value: serde_json::Value = serde_json::from_str(&json).expect("invalid json");
    assert_eq!(value.as_array().map(Vec::len), Some(2));
    assert!(json.contains("case_sensitive"));
    assert!(json.contains("any_chars"));
}
