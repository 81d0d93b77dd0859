use treelox as lox;

use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;
use lox::token::Token;

/// Full pipeline over `source`, capturing everything `print` wrote plus the
/// runtime error (if any) that stopped the program.
fn try_run(source: &str) -> (String, Option<String>) {
    let tokens: Vec<Token<'_>> = Scanner::new(source.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .expect("source lexes cleanly");

    let (statements, parse_errors) = Parser::new(&tokens).parse();
    assert!(
        parse_errors.is_empty(),
        "unexpected parse errors: {:?}",
        parse_errors
    );

    let bindings = Resolver::new()
        .resolve(&statements)
        .expect("source resolves cleanly");

    let mut interpreter = Interpreter::with_output(Vec::new());
    interpreter.set_bindings(bindings);

    let error = interpreter.interpret(&statements).err().map(|e| e.to_string());
    let output = String::from_utf8(interpreter.into_output()).expect("output is UTF-8");

    (output, error)
}

/// Like [`try_run`] but the program must finish without a runtime error.
fn run(source: &str) -> String {
    let (output, error) = try_run(source);

    if let Some(error) = error {
        panic!("unexpected runtime error: {}", error);
    }

    output
}

/// Expect a runtime error; returns (output so far, error message).
fn run_expecting_error(source: &str) -> (String, String) {
    let (output, error) = try_run(source);

    match error {
        Some(error) => (output, error),
        None => panic!("expected a runtime error, got output {:?}", output),
    }
}

// ───────────────────────── arithmetic and printing ─────────────────────────

#[test]
fn evaluates_arithmetic() {
    assert_eq!(run("var a = 2 - 1; print a;"), "1\n");
}

#[test]
fn number_stringification_drops_zero_fraction() {
    assert_eq!(run("print 4.0; print 4.25; print 2.5 + 0.5;"), "4\n4.25\n3\n");
}

#[test]
fn string_concatenation() {
    assert_eq!(run("print \"foo\" + \"bar\";"), "foobar\n");
}

#[test]
fn division_by_zero_follows_ieee_semantics() {
    assert_eq!(run("print 1 / 0;"), "inf\n");
}

#[test]
fn equality_never_coerces() {
    assert_eq!(
        run("print 1 == \"1\"; print nil == nil; print \"a\" == \"a\"; print 1 != 2;"),
        "false\ntrue\ntrue\ntrue\n"
    );
}

#[test]
fn only_nil_and_false_are_falsy() {
    let source = "\
        if (0) print \"zero is truthy\";\n\
        if (\"\") print \"empty string is truthy\";\n\
        if (nil) print \"unreachable\"; else print \"nil is falsy\";\n\
        if (false) print \"unreachable\"; else print \"false is falsy\";\n\
        print !0;\n";

    assert_eq!(
        run(source),
        "zero is truthy\nempty string is truthy\nnil is falsy\nfalse is falsy\nfalse\n"
    );
}

#[test]
fn logical_operators_return_operands() {
    assert_eq!(
        run("print \"hi\" or 2; print nil or \"yes\"; print nil and \"no\";"),
        "hi\nyes\nnil\n"
    );
}

// ───────────────────────── control flow ─────────────────────────

#[test]
fn for_loop_prints_each_index() {
    assert_eq!(
        run("for (var i = 0; i < 5; i = i + 1) print i;"),
        "0\n1\n2\n3\n4\n"
    );
}

#[test]
fn while_loop_with_mutation() {
    assert_eq!(
        run("var n = 3; while (n > 0) { print n; n = n - 1; }"),
        "3\n2\n1\n"
    );
}

#[test]
fn block_scopes_do_not_leak_into_siblings() {
    let (output, error) = run_expecting_error("{ var a = 1; print a; } print a;");

    assert_eq!(output, "1\n");
    assert!(error.contains("Undefined variable 'a'"));
}

// ───────────────────────── functions and closures ─────────────────────────

#[test]
fn recursion_works() {
    assert_eq!(
        run("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);"),
        "55\n"
    );
}

#[test]
fn functions_print_their_header() {
    assert_eq!(run("fun f() {} print f; print clock;"), "<fn f>\n<native fn>\n");
}

#[test]
fn closures_outlive_their_defining_call() {
    let source = "\
        fun makeCounter() {\n\
          var count = 0;\n\
          fun increment() { count = count + 1; return count; }\n\
          return increment;\n\
        }\n\
        var counter = makeCounter();\n\
        print counter();\n\
        print counter();\n";

    assert_eq!(run(source), "1\n2\n");
}

#[test]
fn closures_observe_mutation_of_captured_variables() {
    let source = "\
        var f;\n\
        {\n\
          var x = 1;\n\
          fun g() { print x; }\n\
          x = 2;\n\
          f = g;\n\
        }\n\
        f();\n";

    assert_eq!(run(source), "2\n");
}

#[test]
fn static_resolution_pins_references_to_their_scope() {
    // Both calls must see the global: the later shadowing declaration in the
    // block must not capture the already-resolved reference.
    let source = "\
        var a = \"global\";\n\
        {\n\
          fun showA() { print a; }\n\
          showA();\n\
          var a = \"block\";\n\
          showA();\n\
        }\n";

    assert_eq!(run(source), "global\nglobal\n");
}

#[test]
fn a_local_one_scope_up_is_not_confused_with_a_global() {
    let source = "\
        var x = \"global\";\n\
        {\n\
          var x = \"outer\";\n\
          {\n\
            print x;\n\
          }\n\
        }\n";

    assert_eq!(run(source), "outer\n");
}

#[test]
fn arity_mismatch_names_both_counts() {
    let (_, error) = run_expecting_error("fun add(a, b) { return a + b; } add(1);");

    assert!(
        error.contains("Expected 2 arguments but got 1."),
        "unexpected message: {}",
        error
    );
}

#[test]
fn calling_a_non_callable_is_an_error() {
    let (_, error) = run_expecting_error("var x = \"nope\"; x();");

    assert!(error.contains("Can only call functions and classes"));
}

// ───────────────────────── classes and instances ─────────────────────────

#[test]
fn fields_and_methods_with_this() {
    let source = "\
        class Cake {\n\
          taste() { print \"The \" + this.flavor + \" cake is delicious!\"; }\n\
        }\n\
        var cake = Cake();\n\
        cake.flavor = \"chocolate\";\n\
        cake.taste();\n";

    assert_eq!(run(source), "The chocolate cake is delicious!\n");
}

#[test]
fn initializer_binds_this_and_yields_the_instance() {
    let source = "\
        class Point {\n\
          init(x, y) { this.x = x; this.y = y; }\n\
        }\n\
        var p = Point(3, 4);\n\
        print p.x + p.y;\n\
        print Point(1, 2).x;\n";

    assert_eq!(run(source), "7\n1\n");
}

#[test]
fn class_and_instance_stringification() {
    assert_eq!(
        run("class Bagel {} print Bagel; print Bagel();"),
        "Bagel\nBagel instance\n"
    );
}

#[test]
fn bound_methods_remember_their_instance() {
    let source = "\
        class Person {\n\
          init(name) { this.name = name; }\n\
          sayName() { print this.name; }\n\
        }\n\
        var jane = Person(\"Jane\");\n\
        var method = jane.sayName;\n\
        method();\n";

    assert_eq!(run(source), "Jane\n");
}

#[test]
fn setting_creates_fields_on_first_write() {
    assert_eq!(run("class A {} var a = A(); a.b = 5; print a.b;"), "5\n");
}

#[test]
fn undefined_property_is_a_runtime_error() {
    let (_, error) = run_expecting_error("class A {} var a = A(); print a.b;");

    assert!(error.contains("Undefined property 'b'"));
}

#[test]
fn property_access_requires_an_instance() {
    let (_, error) = run_expecting_error("var x = 1; print x.y;");

    assert!(error.contains("Only instances have properties"));
}

// ───────────────────────── inheritance ─────────────────────────

#[test]
fn subclasses_inherit_methods() {
    let source = "\
        class A { greet() { print \"hello\"; } }\n\
        class B < A {}\n\
        B().greet();\n";

    assert_eq!(run(source), "hello\n");
}

#[test]
fn super_runs_before_the_rest_of_the_method() {
    let source = "\
        class A { method() { print \"A method\"; } }\n\
        class B < A {\n\
          method() { print \"B method\"; }\n\
          test() { super.method(); print \"after super\"; }\n\
        }\n\
        B().test();\n";

    assert_eq!(run(source), "A method\nafter super\n");
}

#[test]
fn super_dispatch_through_an_inherited_method() {
    let source = "\
        class Doughnut {\n\
          cook() { print \"Fry until golden brown.\"; }\n\
        }\n\
        class BostonCream < Doughnut {\n\
          cook() {\n\
            super.cook();\n\
            print \"Pipe full of custard and coat with chocolate.\";\n\
          }\n\
        }\n\
        BostonCream().cook();\n";

    assert_eq!(
        run(source),
        "Fry until golden brown.\nPipe full of custard and coat with chocolate.\n"
    );
}

#[test]
fn a_non_class_superclass_is_a_runtime_error() {
    let (_, error) = run_expecting_error("var NotAClass = \"str\"; class Sub < NotAClass {}");

    assert!(error.contains("Superclass must be a class"));
}

// ───────────────────────── error behaviour ─────────────────────────

#[test]
fn output_before_a_runtime_error_is_preserved() {
    let (output, error) = run_expecting_error("print \"first\"; print 1 + nil; print \"never\";");

    assert_eq!(output, "first\n");
    assert!(error.contains("Operands must be two numbers or two strings"));
}

#[test]
fn ordering_comparisons_require_numbers() {
    let (_, error) = run_expecting_error("print 1 < \"2\";");

    assert!(error.contains("Operands must be numbers"));
}

#[test]
fn unary_minus_requires_a_number() {
    let (_, error) = run_expecting_error("print -\"oops\";");

    assert!(error.contains("Operand must be a number"));
}

#[test]
fn undefined_variable_reads_and_writes_are_errors() {
    let (_, read_error) = run_expecting_error("print missing;");
    assert!(read_error.contains("Undefined variable 'missing'"));

    // Assignment never implicitly declares.
    let (_, write_error) = run_expecting_error("missing = 1;");
    assert!(write_error.contains("Undefined variable 'missing'"));
}
