use treelox as lox;

use lox::parser::Parser;
use lox::resolver::{Bindings, Resolver};
use lox::scanner::Scanner;
use lox::token::Token;

/// Run scan → parse → resolve, returning the diagnostics as strings
/// (empty means the program is statically valid).
fn resolve_errors(source: &str) -> Vec<String> {
    let tokens: Vec<Token<'_>> = Scanner::new(source.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .expect("source lexes cleanly");

    let (statements, parse_errors) = Parser::new(&tokens).parse();
    assert!(
        parse_errors.is_empty(),
        "unexpected parse errors: {:?}",
        parse_errors
    );

    match Resolver::new().resolve(&statements) {
        Ok(_) => Vec::new(),
        Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
    }
}

/// Like [`resolve_errors`] but expects success and returns the table.
fn resolve_bindings(source: &str) -> Bindings {
    let tokens: Vec<Token<'_>> = Scanner::new(source.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .expect("source lexes cleanly");

    let (statements, parse_errors) = Parser::new(&tokens).parse();
    assert!(parse_errors.is_empty());

    Resolver::new()
        .resolve(&statements)
        .expect("source resolves cleanly")
}

#[test]
fn duplicate_declaration_in_one_scope_is_an_error() {
    let errors = resolve_errors("{ var a = 1; var a = 2; }");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("already declared"));
}

#[test]
fn shadowing_in_a_nested_scope_is_fine() {
    assert!(resolve_errors("{ var a = 1; { var a = 2; print a; } }").is_empty());
}

#[test]
fn global_redeclaration_is_permitted() {
    assert!(resolve_errors("var a = 1; var a = 2;").is_empty());
}

#[test]
fn reading_a_variable_in_its_own_initializer_is_an_error() {
    let errors = resolve_errors("{ var a = a; }");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("own initializer"));
}

#[test]
fn return_outside_a_function_is_an_error() {
    let errors = resolve_errors("return 1;");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("'return' used outside of function"));
}

#[test]
fn returning_a_value_from_init_is_an_error() {
    let errors = resolve_errors("class A { init() { return 1; } }");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Cannot return a value from an initializer"));
}

#[test]
fn bare_return_from_init_is_fine() {
    assert!(resolve_errors("class A { init() { return; } }").is_empty());
}

#[test]
fn this_outside_a_class_is_an_error() {
    let errors = resolve_errors("print this;");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Cannot use 'this' outside of a class"));
}

#[test]
fn super_outside_a_class_is_an_error() {
    let errors = resolve_errors("fun f() { return super.g(); }");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Cannot use 'super' outside of a class"));
}

#[test]
fn super_without_a_superclass_is_an_error() {
    let errors = resolve_errors("class A { f() { return super.f(); } }");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Cannot use 'super' in a class with no superclass"));
}

#[test]
fn a_class_cannot_inherit_from_itself() {
    let errors = resolve_errors("class A < A {}");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("cannot inherit from itself"));
}

#[test]
fn sibling_statements_keep_resolving_after_an_error() {
    // Both broken statements are reported in one pass.
    let errors = resolve_errors("return 1;\nprint this;");

    assert_eq!(errors.len(), 2, "errors: {:?}", errors);
}

#[test]
fn globals_stay_out_of_the_binding_table() {
    let bindings = resolve_bindings("var g = 1; { print g + g; }");

    // Both references to g resolve dynamically against the globals.
    assert!(bindings.is_empty());
}

#[test]
fn a_local_one_scope_up_gets_distance_one_not_global() {
    let bindings = resolve_bindings("{ var a = 1; { print a; } }");

    let distances: Vec<usize> = bindings.values().copied().collect();
    assert_eq!(distances, vec![1]);
}

#[test]
fn closure_captures_record_their_hop_counts() {
    let bindings = resolve_bindings(
        "fun outer() { var x = 1; fun inner() { print x; } inner(); }",
    );

    let mut distances: Vec<usize> = bindings.values().copied().collect();
    distances.sort_unstable();

    // 'x' one function scope up; the 'inner()' call site sees its own scope.
    assert_eq!(distances, vec![0, 1]);
}

#[test]
fn resolution_is_pure_and_stable() {
    let source = "fun make() { var n = 0; fun bump() { n = n + 1; return n; } return bump; } \
                  var f = make(); print f();";

    assert_eq!(resolve_bindings(source), resolve_bindings(source));
}
