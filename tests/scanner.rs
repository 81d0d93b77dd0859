use treelox as lox;

use lox::scanner::Scanner;
use lox::token::{Token, TokenType};

fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
    let scanner = Scanner::new(source.as_bytes());
    let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

    assert_eq!(
        tokens.len(),
        expected.len(),
        "token count mismatch for {:?}: {:?}",
        source,
        tokens
    );

    for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
        assert_eq!(actual.token_type, *expected_type);
        assert_eq!(actual.lexeme, *expected_lexeme);
    }
}

fn scan_all(source: &str) -> Vec<Result<Token<'_>, lox::error::LoxError>> {
    Scanner::new(source.as_bytes()).collect()
}

#[test]
fn scans_single_character_symbols() {
    assert_token_sequence(
        "({*.,+*})",
        &[
            (TokenType::LEFT_PAREN, "("),
            (TokenType::LEFT_BRACE, "{"),
            (TokenType::STAR, "*"),
            (TokenType::DOT, "."),
            (TokenType::COMMA, ","),
            (TokenType::PLUS, "+"),
            (TokenType::STAR, "*"),
            (TokenType::RIGHT_BRACE, "}"),
            (TokenType::RIGHT_PAREN, ")"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn scans_one_and_two_character_operators() {
    assert_token_sequence(
        "! != = == < <= > >=",
        &[
            (TokenType::BANG, "!"),
            (TokenType::BANG_EQUAL, "!="),
            (TokenType::EQUAL, "="),
            (TokenType::EQUAL_EQUAL, "=="),
            (TokenType::LESS, "<"),
            (TokenType::LESS_EQUAL, "<="),
            (TokenType::GREATER, ">"),
            (TokenType::GREATER_EQUAL, ">="),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn slash_starts_comment_or_divides() {
    assert_token_sequence(
        "1 / 2 // the rest is ignored / * (\n3",
        &[
            (TokenType::NUMBER(1.0), "1"),
            (TokenType::SLASH, "/"),
            (TokenType::NUMBER(2.0), "2"),
            (TokenType::NUMBER(3.0), "3"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn keywords_are_not_identifiers() {
    assert_token_sequence(
        "class classy for fortune var _var",
        &[
            (TokenType::CLASS, "class"),
            (TokenType::IDENTIFIER, "classy"),
            (TokenType::FOR, "for"),
            (TokenType::IDENTIFIER, "fortune"),
            (TokenType::VAR, "var"),
            (TokenType::IDENTIFIER, "_var"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn number_literals_carry_values() {
    let results = scan_all("42 3.14 0.5");

    let values: Vec<f64> = results
        .iter()
        .filter_map(|r| match r {
            Ok(Token {
                token_type: TokenType::NUMBER(n),
                ..
            }) => Some(*n),
            _ => None,
        })
        .collect();

    assert_eq!(values, vec![42.0, 3.14, 0.5]);
}

#[test]
fn string_literal_payload_excludes_quotes() {
    let results = scan_all("\"hello world\"");

    match &results[0] {
        Ok(Token {
            token_type: TokenType::STRING(s),
            lexeme,
            line,
        }) => {
            assert_eq!(s, "hello world");
            assert_eq!(*lexeme, "\"hello world\"");
            assert_eq!(*line, 1);
        }
        other => panic!("expected string token, got {:?}", other),
    }
}

#[test]
fn strings_may_span_lines() {
    let results = scan_all("\"a\nb\"\nident");

    assert!(matches!(
        &results[0],
        Ok(Token {
            token_type: TokenType::STRING(_),
            ..
        })
    ));

    // The newline inside the string counts: 'ident' sits on line 3.
    match &results[1] {
        Ok(token) => {
            assert_eq!(token.token_type, TokenType::IDENTIFIER);
            assert_eq!(token.line, 3);
        }
        other => panic!("expected identifier, got {:?}", other),
    }
}

#[test]
fn unterminated_string_is_a_lexical_error() {
    let results = scan_all("\"no closing quote");

    let err = results[0].as_ref().expect_err("should fail to scan");

    assert!(
        err.to_string().contains("Unterminated string"),
        "unexpected message: {}",
        err
    );
}

#[test]
fn unexpected_characters_are_reported_and_scanning_continues() {
    let results = scan_all(",.$(#");

    // , . <err $> ( <err #> EOF
    assert_eq!(results.len(), 6);

    assert!(matches!(&results[0], Ok(t) if t.token_type == TokenType::COMMA));
    assert!(matches!(&results[1], Ok(t) if t.token_type == TokenType::DOT));
    assert!(matches!(&results[3], Ok(t) if t.token_type == TokenType::LEFT_PAREN));
    assert!(matches!(&results[5], Ok(t) if t.token_type == TokenType::EOF));

    let errors: Vec<String> = results
        .iter()
        .filter_map(|r| r.as_ref().err().map(|e| e.to_string()))
        .collect();

    assert_eq!(errors.len(), 2);

    for message in &errors {
        assert!(
            message.contains("Unexpected character"),
            "unexpected message: {}",
            message
        );
    }
}

#[test]
fn newlines_advance_the_line_counter() {
    let results = scan_all("a\nb\n\nc");

    let lines: Vec<usize> = results
        .iter()
        .filter_map(|r| match r {
            Ok(token) if token.token_type == TokenType::IDENTIFIER => Some(token.line),
            _ => None,
        })
        .collect();

    assert_eq!(lines, vec![1, 2, 4]);
}

#[test]
fn empty_source_yields_only_eof() {
    assert_token_sequence("", &[(TokenType::EOF, "")]);
}
