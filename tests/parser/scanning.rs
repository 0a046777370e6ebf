//! Integration tests for line splitting and token scanning

use std::collections::HashMap;

use parley_foundation::{ErrorKind, NoProperties};
use parley_parser::{Scanner, Token, split_arguments};

fn texts(line: &str) -> Vec<String> {
    split_arguments(line)
        .unwrap()
        .into_iter()
        .map(|a| a.text)
        .collect()
}

fn scan(source: &str) -> Token {
    Scanner::scan(source, 0, &NoProperties).unwrap()
}

fn plain(s: &str) -> Token {
    Token::Plain(s.to_string())
}

// =============================================================================
// Splitting
// =============================================================================

#[test]
fn split_respects_delimiters() {
    assert_eq!(
        texts("tag [red, green] \"a note\" {x: 1, y: 2}"),
        ["tag", "[red, green]", "\"a note\"", "{x: 1, y: 2}"]
    );
}

#[test]
fn split_records_offsets() {
    let args = split_arguments("give  sword 3").unwrap();
    let starts: Vec<_> = args.iter().map(|a| a.start).collect();
    assert_eq!(starts, [0, 6, 12]);
    assert_eq!(args[1].end(), 11);
}

#[test]
fn split_empty_line() {
    assert!(split_arguments("   ").unwrap().is_empty());
}

#[test]
fn unterminated_bracket_names_position() {
    let err = split_arguments("tag [red,green").unwrap_err();
    let ErrorKind::Scan {
        message,
        fragment,
        position,
    } = err.kind
    else {
        panic!("expected scan error");
    };
    assert_eq!(message, "unterminated '['");
    assert_eq!(fragment, "[red,green");
    assert_eq!(position, 4);
}

#[test]
fn stray_closing_delimiters_fail() {
    assert!(split_arguments("tag red]").is_err());
    assert!(split_arguments("tag [red}").is_err());
    assert!(split_arguments("say \"open").is_err());
}

// =============================================================================
// Scanning
// =============================================================================

#[test]
fn scans_nested_structures() {
    let token = scan("{loot:[sword,shield],name:\"old orc\"}");
    assert_eq!(
        token,
        Token::Dictionary(vec![
            (plain("loot"), Token::Collection(vec![plain("sword"), plain("shield")])),
            (plain("name"), Token::StringLiteral("old orc".to_string())),
        ])
    );
}

#[test]
fn empty_collections() {
    assert_eq!(scan("[]"), Token::Collection(Vec::new()));
    assert_eq!(scan("{ }"), Token::Dictionary(Vec::new()));
}

#[test]
fn empty_items_and_duplicate_keys_fail() {
    assert!(Scanner::scan("[a,,b]", 0, &NoProperties).is_err());
    let err = Scanner::scan("{a:1,a:2}", 10, &NoProperties).unwrap_err();
    let ErrorKind::Scan { message, position, .. } = err.kind else {
        panic!("expected scan error");
    };
    assert_eq!(message, "duplicate key `a`");
    assert_eq!(position, 15);
}

#[test]
fn trailing_text_after_delimiter_fails() {
    assert!(Scanner::scan("[a]b", 0, &NoProperties).is_err());
    assert!(Scanner::scan("{a}", 0, &NoProperties).is_err());
}

#[test]
fn properties_substitute_from_source() {
    let mut table = HashMap::new();
    table.insert("home".to_string(), "spawn".to_string());

    let token = Scanner::scan("[${home},x]", 0, &table).unwrap();
    assert_eq!(
        token,
        Token::Collection(vec![
            Token::Property {
                name: "home".to_string(),
                value: "spawn".to_string(),
            },
            plain("x"),
        ])
    );

    let err = Scanner::scan("${away}", 0, &table).unwrap_err();
    assert!(err.to_string().contains("unknown property `away`"));
}

#[test]
fn string_literals_keep_text_verbatim() {
    assert_eq!(scan("\"a [b] {c}\""), Token::StringLiteral("a [b] {c}".to_string()));
}
