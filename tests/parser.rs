use rustlox as lox;

use lox::ast::Stmt;
use lox::ast_printer::AstPrinter;
use lox::error::Reporter;
use lox::parser::Parser;
use lox::scanner::scan;

fn parse(source: &str, repl: bool) -> (Vec<Stmt>, Reporter) {
    let mut reporter = Reporter::new();
    let tokens = scan(source.as_bytes().to_vec(), &mut reporter);
    let statements = Parser::new(tokens, &mut reporter).parse(repl);

    (statements, reporter)
}

fn parse_clean(source: &str) -> Vec<Stmt> {
    let (statements, reporter) = parse(source, false);
    assert!(
        !reporter.had_error(),
        "unexpected parse errors: {:?}",
        reporter.diagnostics()
    );

    statements
}

fn printed(source: &str) -> String {
    let statements = parse_clean(source);
    assert_eq!(statements.len(), 1);

    AstPrinter.print_stmt(&statements[0])
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(printed("1 + 2 * 3;"), "(; (+ 1.0 (* 2.0 3.0)))");
}

#[test]
fn grouping_overrides_precedence() {
    assert_eq!(printed("(1 + 2) * 3;"), "(; (* (group (+ 1.0 2.0)) 3.0))");
}

#[test]
fn binary_operators_are_left_associative() {
    assert_eq!(printed("1 - 2 - 3;"), "(; (- (- 1.0 2.0) 3.0))");
}

#[test]
fn ternary_is_right_associative() {
    assert_eq!(printed("a ? b : c ? d : e;"), "(; (?: a b (?: c d e)))");
}

#[test]
fn assignment_is_right_associative() {
    assert_eq!(printed("a = b = 3;"), "(; (= a (= b 3.0)))");
}

#[test]
fn property_assignment_becomes_set() {
    assert_eq!(printed("a.b = 3;"), "(; (set a b 3.0))");
}

#[test]
fn call_and_property_chains() {
    assert_eq!(printed("a.b(1).c;"), "(; (get (call (get a b) 1.0) c))");
}

#[test]
fn logical_operators_nest_under_ternary() {
    assert_eq!(
        printed("a or b and c ? 1 : 2;"),
        "(; (?: (or a (and b c)) 1.0 2.0))"
    );
}

#[test]
fn anonymous_function_expression() {
    assert_eq!(
        printed("var f = fun (x) { return x; };"),
        "(var f (fun (x) (return x)))"
    );
}

#[test]
fn for_desugars_to_while() {
    assert_eq!(
        printed("for (var i = 0; i < 3; i = i + 1) print i;"),
        "(block (var i 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"
    );
}

#[test]
fn class_with_superclass_and_static_method() {
    assert_eq!(
        printed("class B < A { m() { return 1; } class s() { return 2; } }"),
        "(class B (< A) (m () (return 1.0)) (class s () (return 2.0)))"
    );
}

#[test]
fn invalid_assignment_target_is_reported_without_unwinding() {
    let (statements, reporter) = parse("1 = 2;", false);

    assert!(reporter.had_error());
    assert!(reporter
        .diagnostics()
        .iter()
        .any(|d| d.contains("Invalid assignment target.")));

    // The already-parsed left side stands.
    assert_eq!(statements.len(), 1);
}

#[test]
fn unary_plus_is_rejected_but_operand_parses() {
    let (statements, reporter) = parse("+1;", false);

    assert!(reporter.had_error());
    assert!(reporter
        .diagnostics()
        .iter()
        .any(|d| d.contains("Lox does not support unary '+'.")));
    assert_eq!(statements.len(), 1);
}

#[test]
fn leading_binary_operator_is_reported_but_right_operand_parses() {
    let (statements, reporter) = parse("* 3;", false);

    assert!(reporter.had_error());
    assert!(reporter
        .diagnostics()
        .iter()
        .any(|d| d.contains("left operand missing")));
    assert_eq!(statements.len(), 1);
    assert_eq!(AstPrinter.print_stmt(&statements[0]), "(; 3.0)");
}

#[test]
fn missing_semicolon_is_an_error_outside_the_repl() {
    let (_, reporter) = parse("1 + 2", false);

    assert!(reporter.had_error());
    assert!(reporter
        .diagnostics()
        .iter()
        .any(|d| d.contains("Expect ';' after expression.")));
}

#[test]
fn repl_trailing_expression_becomes_print() {
    let (statements, reporter) = parse("1 + 2", true);

    assert!(!reporter.had_error());
    assert_eq!(statements.len(), 1);
    assert_eq!(AstPrinter.print_stmt(&statements[0]), "(print (+ 1.0 2.0))");
}

#[test]
fn repl_expression_with_semicolon_stays_an_expression_statement() {
    let (statements, reporter) = parse("1 + 2;", true);

    assert!(!reporter.had_error());
    assert_eq!(AstPrinter.print_stmt(&statements[0]), "(; (+ 1.0 2.0))");
}

#[test]
fn repl_rejects_trailing_garbage() {
    let (_, reporter) = parse("1 + 2 3", true);

    assert!(reporter.had_error());
    assert!(reporter
        .diagnostics()
        .iter()
        .any(|d| d.contains("Unexpected token after expression.")));
}

#[test]
fn panic_mode_recovers_at_the_next_statement() {
    let (statements, reporter) = parse("var = 1; print 2;", false);

    assert!(reporter.had_error());
    assert!(reporter
        .diagnostics()
        .iter()
        .any(|d| d.contains("Expect variable name.")));

    // The bad declaration is dropped, the next statement survives.
    assert_eq!(statements.len(), 1);
    assert_eq!(AstPrinter.print_stmt(&statements[0]), "(print 2.0)");
}

#[test]
fn argument_limit_is_reported_but_parsing_continues() {
    let args: Vec<String> = (0..260).map(|i| i.to_string()).collect();
    let source = format!("f({});", args.join(", "));

    let (statements, reporter) = parse(&source, false);

    assert!(reporter.had_error());
    assert!(reporter
        .diagnostics()
        .iter()
        .any(|d| d.contains("Can't have more than 255 arguments.")));
    assert_eq!(statements.len(), 1);
}

#[test]
fn super_requires_a_method_name() {
    let (_, reporter) = parse("class B < A { m() { return super; } }", false);

    assert!(reporter.had_error());
    assert!(reporter
        .diagnostics()
        .iter()
        .any(|d| d.contains("Expect '.' after 'super'.")));
}
