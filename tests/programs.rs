use std::cell::RefCell;
use std::rc::Rc;

use rustlox as lox;

use lox::error::Reporter;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::scan;
use lox::value::Value;

/// Run a whole program through the scanner/parser/resolver/interpreter
/// pipeline, capturing everything `print` writes.
fn run_with(
    source: &str,
    interpreter: &mut Interpreter,
    reporter: &mut Reporter,
    repl: bool,
) {
    let tokens = scan(source.as_bytes().to_vec(), reporter);
    let statements = Parser::new(tokens, reporter).parse(repl);

    if reporter.had_error() {
        return;
    }

    let mut resolver = Resolver::new(interpreter, reporter);
    resolver.resolve(&statements);

    if reporter.had_error() {
        return;
    }

    interpreter.interpret(&statements, reporter);
}

fn capturing_interpreter() -> (Interpreter, Rc<RefCell<Vec<u8>>>) {
    let buffer: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
    let interpreter = Interpreter::with_output(buffer.clone());

    (interpreter, buffer)
}

fn run(source: &str) -> (String, Reporter) {
    let (mut interpreter, buffer) = capturing_interpreter();
    let mut reporter = Reporter::new();

    run_with(source, &mut interpreter, &mut reporter, false);

    let output = String::from_utf8(buffer.borrow().clone()).unwrap();
    (output, reporter)
}

fn run_ok(source: &str) -> String {
    let (output, reporter) = run(source);

    assert!(
        !reporter.had_error() && !reporter.had_runtime_error(),
        "unexpected errors: {:?}",
        reporter.diagnostics()
    );

    output
}

fn run_runtime_error(source: &str) -> (String, Reporter) {
    let (output, reporter) = run(source);

    assert!(!reporter.had_error(), "unexpected static errors");
    assert!(reporter.had_runtime_error(), "expected a runtime error");

    (output, reporter)
}

#[test]
fn arithmetic_precedence() {
    assert_eq!(run_ok("print 1 + 2 * 3;"), "7\n");
}

#[test]
fn block_scoping_shadows_and_restores() {
    assert_eq!(
        run_ok("var a = 1; { var a = 2; print a; } print a;"),
        "2\n1\n"
    );
}

#[test]
fn closures_capture_their_environment() {
    let source = "
fun make() {
  var x = 0;
  fun inc() {
    x = x + 1;
    return x;
  }
  return inc;
}
var c = make();
print c();
print c();
print c();
";
    assert_eq!(run_ok(source), "1\n2\n3\n");
}

#[test]
fn inherited_method_dispatch() {
    let source = "
class A {
  greet() {
    print \"hi\";
  }
}
class B < A {}
B().greet();
";
    assert_eq!(run_ok(source), "hi\n");
}

#[test]
fn initializer_binds_fields() {
    let source = "
class Counter {
  init(n) {
    this.n = n;
  }
  bump() {
    this.n = this.n + 1;
    return this.n;
  }
}
var c = Counter(10);
print c.bump();
print c.bump();
";
    assert_eq!(run_ok(source), "11\n12\n");
}

#[test]
fn string_concatenation_coerces() {
    assert_eq!(run_ok("print \"a\" + 1;"), "a1\n");
    assert_eq!(run_ok("print 1 + \"a\";"), "1a\n");
    assert_eq!(run_ok("print \"n=\" + 4.0;"), "n=4\n");
    assert_eq!(run_ok("print \"is \" + true;"), "is true\n");
}

#[test]
fn number_stringification_strips_integral_suffix() {
    assert_eq!(run_ok("print 4.0; print 2.5; print -0.5 * 2;"), "4\n2.5\n-1\n");
}

#[test]
fn nil_and_booleans_print_as_keywords() {
    assert_eq!(run_ok("print nil; print true; print false;"), "nil\ntrue\nfalse\n");
}

#[test]
fn truthiness_double_negation() {
    assert_eq!(
        run_ok("print !!0; print !!\"\"; print !!nil; print !!false;"),
        "true\ntrue\nfalse\nfalse\n"
    );
}

#[test]
fn equality_is_type_aware() {
    assert_eq!(
        run_ok("print 1 == \"1\"; print nil == nil; print 1 == 1; print \"a\" != \"b\";"),
        "false\ntrue\ntrue\ntrue\n"
    );
}

#[test]
fn logical_operators_short_circuit_and_keep_raw_values() {
    let source = "
var n = 0;
fun bump() {
  n = n + 1;
  return true;
}
var a = false and bump();
var b = true or bump();
print n;
print a;
print 1 or 2;
print nil and 3;
";
    assert_eq!(run_ok(source), "0\nfalse\n1\nnil\n");
}

#[test]
fn ternary_evaluates_only_the_chosen_branch() {
    let source = "
var n = 0;
fun bump() {
  n = n + 1;
  return 9;
}
print true ? 1 : bump();
print false ? bump() : 2;
print n;
";
    assert_eq!(run_ok(source), "1\n2\n0\n");
}

#[test]
fn while_loop_with_break() {
    let source = "
var i = 0;
while (true) {
  i = i + 1;
  if (i > 3) break;
}
print i;
";
    assert_eq!(run_ok(source), "4\n");
}

#[test]
fn for_loop_desugars_and_runs() {
    assert_eq!(
        run_ok("for (var i = 0; i < 3; i = i + 1) print i;"),
        "0\n1\n2\n"
    );
}

#[test]
fn break_exits_only_the_innermost_loop() {
    let source = "
for (var i = 0; i < 2; i = i + 1) {
  for (var j = 0; j < 5; j = j + 1) {
    if (j > 0) break;
    print i + j;
  }
}
";
    assert_eq!(run_ok(source), "0\n1\n");
}

#[test]
fn functions_fall_off_to_nil() {
    assert_eq!(run_ok("fun f() {} print f();"), "nil\n");
}

#[test]
fn anonymous_functions_are_values() {
    let source = "
var twice = fun (f, x) { return f(f(x)); };
var inc = fun (x) { return x + 1; };
print twice(inc, 5);
";
    assert_eq!(run_ok(source), "7\n");
}

#[test]
fn recursion_resolves_through_the_declaring_scope() {
    let source = "
fun fib(n) {
  if (n < 2) return n;
  return fib(n - 2) + fib(n - 1);
}
print fib(10);
";
    assert_eq!(run_ok(source), "55\n");
}

#[test]
fn bound_methods_remember_their_instance() {
    let source = "
class Person {
  init(name) {
    this.name = name;
  }
  greet() {
    print this.name;
  }
}
var p = Person(\"Ada\");
var m = p.greet;
m();
";
    assert_eq!(run_ok(source), "Ada\n");
}

#[test]
fn fields_are_created_on_first_write() {
    let source = "
class Box {}
var b = Box();
b.value = 42;
print b.value;
";
    assert_eq!(run_ok(source), "42\n");
}

#[test]
fn calling_the_initializer_again_returns_this() {
    let source = "
class C {
  init() {
    this.x = 1;
  }
}
var c = C();
print c.init() == c;
";
    assert_eq!(run_ok(source), "true\n");
}

#[test]
fn super_calls_the_superclass_method() {
    let source = "
class A {
  method() {
    print \"A method\";
  }
}
class B < A {
  method() {
    print \"B method\";
  }
  test() {
    super.method();
  }
}
B().test();
";
    assert_eq!(run_ok(source), "A method\n");
}

#[test]
fn super_binds_this_to_the_caller() {
    let source = "
class A {
  name() {
    return this.label;
  }
}
class B < A {
  init() {
    this.label = \"from B\";
  }
  name() {
    return super.name();
  }
}
print B().name();
";
    assert_eq!(run_ok(source), "from B\n");
}

#[test]
fn static_methods_are_called_on_the_class() {
    let source = "
class Math {
  class square(n) {
    return n * n;
  }
}
print Math.square(3);
";
    assert_eq!(run_ok(source), "9\n");
}

#[test]
fn static_methods_are_inherited() {
    let source = "
class A {
  class make() {
    return \"made\";
  }
}
class B < A {}
print B.make();
";
    assert_eq!(run_ok(source), "made\n");
}

#[test]
fn class_and_instance_values_print_readably() {
    let source = "
class Thing {}
print Thing;
print Thing();
fun named() {}
print named;
print clock;
";
    assert_eq!(
        run_ok(source),
        "Thing\nThing instance\n<fn named>\n<native fn clock>\n"
    );
}

#[test]
fn clock_returns_seconds() {
    assert_eq!(run_ok("print clock() > 0;"), "true\n");
}

#[test]
fn globals_are_late_bound_in_functions() {
    let source = "
fun show() {
  print value;
}
var value = 3;
show();
";
    assert_eq!(run_ok(source), "3\n");
}

#[test]
fn get_global_reflects_program_state() {
    let (mut interpreter, _buffer) = capturing_interpreter();
    let mut reporter = Reporter::new();

    run_with("var volume = 3 * 4 * 5;", &mut interpreter, &mut reporter, false);

    assert!(!reporter.had_error() && !reporter.had_runtime_error());
    assert_eq!(interpreter.get_global("volume"), Some(Value::Number(60.0)));
}

#[test]
fn repl_lines_share_one_interpreter() {
    let (mut interpreter, buffer) = capturing_interpreter();
    let mut reporter = Reporter::new();

    run_with("var a = 1;", &mut interpreter, &mut reporter, true);
    reporter.reset();
    run_with("a + 2", &mut interpreter, &mut reporter, true);
    reporter.reset();
    run_with("{ var x = 5; print x; }", &mut interpreter, &mut reporter, true);

    assert!(!reporter.had_error() && !reporter.had_runtime_error());
    assert_eq!(String::from_utf8(buffer.borrow().clone()).unwrap(), "3\n5\n");
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let (output, reporter) = run_runtime_error("print 1/0;");

    assert_eq!(output, "");
    assert!(reporter
        .diagnostics()
        .iter()
        .any(|d| d.contains("Division by zero.") && d.contains("[line 1]")));
}

#[test]
fn undefined_variable_is_a_runtime_error() {
    let (_, reporter) = run_runtime_error("print missing;");

    assert!(reporter
        .diagnostics()
        .iter()
        .any(|d| d.contains("Undefined variable 'missing'.")));
}

#[test]
fn calling_a_non_callable() {
    let (_, reporter) = run_runtime_error("var x = 1; x();");

    assert!(reporter
        .diagnostics()
        .iter()
        .any(|d| d.contains("Can only call functions and classes.")));
}

#[test]
fn arity_mismatch() {
    let (_, reporter) = run_runtime_error("fun f(a, b) { return a + b; } f(1);");

    assert!(reporter
        .diagnostics()
        .iter()
        .any(|d| d.contains("Expected 2 arguments but got 1.")));
}

#[test]
fn comparison_operand_types_are_checked() {
    let (_, reporter) = run_runtime_error("print 1 < \"2\";");

    assert!(reporter
        .diagnostics()
        .iter()
        .any(|d| d.contains("Right operand must be a number.")));
}

#[test]
fn addition_of_incompatible_operands() {
    let (_, reporter) = run_runtime_error("print true + 1;");

    assert!(reporter.diagnostics().iter().any(|d| {
        d.contains("Operands must be two numbers or one of them must be a string.")
    }));
}

#[test]
fn unary_minus_requires_a_number() {
    let (_, reporter) = run_runtime_error("print -\"oops\";");

    assert!(reporter
        .diagnostics()
        .iter()
        .any(|d| d.contains("Operand must be a number.")));
}

#[test]
fn property_access_on_a_non_instance() {
    let (_, reporter) = run_runtime_error("print 1.foo;");

    assert!(reporter
        .diagnostics()
        .iter()
        .any(|d| d.contains("Only instances have properties.")));
}

#[test]
fn field_write_on_a_non_instance() {
    let (_, reporter) = run_runtime_error("var s = \"str\"; s.field = 1;");

    assert!(reporter
        .diagnostics()
        .iter()
        .any(|d| d.contains("Only instances have fields.")));
}

#[test]
fn undefined_property() {
    let (_, reporter) = run_runtime_error("class A {} print A().missing;");

    assert!(reporter
        .diagnostics()
        .iter()
        .any(|d| d.contains("Undefined property 'missing'.")));
}

#[test]
fn superclass_must_be_a_class() {
    let (_, reporter) = run_runtime_error("var NotAClass = 1; class B < NotAClass {} B();");

    assert!(reporter
        .diagnostics()
        .iter()
        .any(|d| d.contains("Superclass must be a class.")));
}

#[test]
fn execution_stops_after_a_runtime_error() {
    let (output, reporter) = run_runtime_error("print 1; print 1/0; print 2;");

    assert_eq!(output, "1\n");
    assert!(reporter.had_runtime_error());
}

#[test]
fn environment_is_restored_after_an_error_inside_a_block() {
    // The first line fails inside a nested scope; the interpreter survives
    // to run another program against the same globals.
    let (mut interpreter, buffer) = capturing_interpreter();
    let mut reporter = Reporter::new();

    run_with("var a = 1; { var a = 2; print a / 0; }", &mut interpreter, &mut reporter, true);
    assert!(reporter.had_runtime_error());

    reporter.reset();
    run_with("print a;", &mut interpreter, &mut reporter, true);

    assert_eq!(String::from_utf8(buffer.borrow().clone()).unwrap(), "1\n");
}

#[test]
fn self_initializer_read_is_a_static_error() {
    let (output, reporter) = run("{ var x = x; }");

    assert_eq!(output, "");
    assert!(reporter.had_error());
    assert!(reporter
        .diagnostics()
        .iter()
        .any(|d| d.contains("Can't read local variable in its own initializer.")));
}
