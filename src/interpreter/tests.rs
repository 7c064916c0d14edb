use indoc::indoc;

use super::*;
use crate::lexer::tokenize;
use crate::parser::parse_tokens;

fn interpret(interpreter: &mut Interpreter, source: &str) -> Result<Vec<Value>, RuntimeError> {
    let tokens = tokenize(source).expect("tokenize failed");
    let program = parse_tokens(tokens).expect("parse failed");
    interpreter.run(&program)
}

/// Value of the last top-level statement.
fn eval(source: &str) -> Value {
    let mut interpreter = Interpreter::new(Config::default());
    let mut values = interpret(&mut interpreter, source).expect("evaluation failed");
    values.pop().expect("program had no statements")
}

fn eval_err(source: &str) -> RuntimeError {
    let mut interpreter = Interpreter::new(Config::default());
    interpret(&mut interpreter, source).expect_err("evaluation unexpectedly succeeded")
}

fn printed(source: &str) -> Vec<String> {
    let mut interpreter = Interpreter::new(Config::default());
    interpret(&mut interpreter, source).expect("evaluation failed");
    interpreter.take_output()
}

fn numbers(values: &[f64]) -> Value {
    Value::list(values.iter().map(|&value| Value::Number(value)).collect())
}

#[test]
fn power_binds_tighter_than_multiplication() {
    assert_eq!(eval("5 ** 3"), Value::Number(125.0));
    assert_eq!(eval("5 ^ 3"), Value::Number(125.0));
    assert_eq!(eval("2 * 2 ** 3"), Value::Number(16.0));
    assert_eq!(eval("2 ** 3 ** 2"), Value::Number(512.0));
}

#[test]
fn chained_postfix_increments_accumulate() {
    let source = indoc! {"
        var a = 5
        a++++
        a
    "};
    assert_eq!(eval(source), Value::Number(7.0));
}

#[test]
fn compound_assignment_updates_lists_and_dicts() {
    let source = indoc! {"
        var xs = [1, 2, 3]
        xs[1] *= 10
        var d = {count: 1}
        d.count += 4
        xs[1] + d.count
    "};
    assert_eq!(eval(source), Value::Number(25.0));
}

#[test]
fn for_loop_defaults_start_and_direction() {
    assert_eq!(
        eval("for i to 10: i"),
        numbers(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0])
    );
    assert_eq!(
        eval("for i = 10 to 0: i"),
        numbers(&[10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0])
    );
    assert_eq!(eval("for i = 0 to 10 step 4: i"), numbers(&[0.0, 4.0, 8.0]));
}

#[test]
fn zero_step_is_an_error() {
    let error = eval_err("for i = 0 to 3 step 0: i");
    assert_eq!(error.kind, RuntimeErrorKind::ZeroStep);
}

#[test]
fn block_loops_yield_none_and_honour_break_and_continue() {
    let source = indoc! {"
        var total = 0
        var i = 0
        var result = while i < 10:
            i += 1
            if i == 2: continue
            if i == 4: break
            total += i
        end
        [total, result]
    "};
    assert_eq!(eval(source).to_string(), "[4, none]");
}

#[test]
fn foreach_walks_lists_and_dicts() {
    assert_eq!(
        eval("foreach [10, 20] as i, v: i + v"),
        numbers(&[10.0, 21.0])
    );
    assert_eq!(
        eval("foreach {a: 1, b: 2} as k, v: `{k}={v}`").to_string(),
        r#"["a=1", "b=2"]"#
    );
    assert_eq!(eval("foreach {a: 1, b: 2} as k: k").to_string(), r#"["a", "b"]"#);
}

#[test]
fn loop_iterations_capture_their_own_bindings() {
    let source = indoc! {"
        var fns = for i to 3: func () -> i
        foreach fns as f: f()
    "};
    assert_eq!(eval(source), numbers(&[0.0, 1.0, 2.0]));
}

#[test]
fn division_and_modulo_by_zero_fail() {
    for source in ["1 / 0", "1 % 0"] {
        let error = eval_err(source);
        assert_eq!(error.kind, RuntimeErrorKind::DivisionByZero);
        assert_eq!(error.to_string(), "Division by Zero");
    }
}

#[test]
fn slices_and_negative_indices() {
    assert_eq!(eval("[1, 2, 3, 4][1:3]"), numbers(&[2.0, 3.0]));
    assert_eq!(eval("[1, 2, 3, 4][:-1]"), numbers(&[1.0, 2.0, 3.0]));
    assert_eq!(eval("[1, 2, 3][-1]"), Value::Number(3.0));
    assert_eq!(eval("\"hello\"[1:3]"), Value::string("el"));
    let error = eval_err("[1, 2, 3][2:1]");
    assert!(matches!(error.kind, RuntimeErrorKind::IllegalSliceBounds { .. }));
}

#[test]
fn slice_of_slice_is_stable() {
    let source = indoc! {"
        var xs = [5, 6, 7, 8, 9]
        xs[1:4][0:3] == xs[1:4]
    "};
    assert_eq!(eval(source), Value::Boolean(true));
}

#[test]
fn push_marker_appends() {
    let source = indoc! {"
        var xs = [1]
        xs[] = 2
        xs
    "};
    assert_eq!(eval(source), numbers(&[1.0, 2.0]));
}

#[test]
fn dict_merge_is_associative_and_right_biased() {
    let source = indoc! {"
        var a = {x: 1}
        var b = {y: 2}
        var c = {x: 3}
        [(a + b) + c == a + (b + c), (a + c).x]
    "};
    assert_eq!(eval(source).to_string(), "[true, 3]");
}

#[test]
fn lists_are_shared_between_aliases() {
    let source = indoc! {"
        var a = [1, 2]
        var b = a
        b[0] = 9
        a[0]
    "};
    assert_eq!(eval(source), Value::Number(9.0));
}

#[test]
fn closures_modify_enclosing_bindings() {
    let source = indoc! {"
        func counter():
            var count = 0
            func increment():
                count += 1
                return count
            end
            return increment
        end
        var next = counter()
        next()
        next()
    "};
    assert_eq!(eval(source), Value::Number(2.0));
}

#[test]
fn constants_are_write_once() {
    let error = eval_err("define PI = 3\nPI = 4");
    assert_eq!(
        error.kind,
        RuntimeErrorKind::ConstantReassignment {
            name: "PI".to_string()
        }
    );
    assert!(matches!(
        eval_err("define PI = 3\nvar PI = 4").kind,
        RuntimeErrorKind::ConstantReassignment { .. }
    ));
    assert!(matches!(
        eval_err("define PI = 3\ndelete PI").kind,
        RuntimeErrorKind::ConstantReassignment { .. }
    ));
}

#[test]
fn undefined_variables_are_reported_by_name() {
    let error = eval_err("missing + 1");
    assert_eq!(error.to_string(), "'missing' is not defined");
}

#[test]
fn logical_operators_yield_the_deciding_operand() {
    assert_eq!(eval("0 or \"fallback\""), Value::string("fallback"));
    assert_eq!(eval("1 and 2"), Value::Number(2.0));
    assert_eq!(eval("none ?? 5"), Value::Number(5.0));
    assert_eq!(eval("0 ?? 5"), Value::Number(0.0));
    // The right side is never evaluated once the result is decided.
    assert_eq!(eval("false and missing()"), Value::Boolean(false));
}

#[test]
fn optional_chaining_cancels_the_rest_of_the_chain() {
    let source = indoc! {"
        var n = none
        n?.inner.value()
    "};
    assert_eq!(eval(source), Value::None);
}

#[test]
fn functions_bind_optional_rest_and_default_parameters() {
    let source = indoc! {"
        func f(a, b?, c = a * 2, ...rest) -> [a, b, c, rest]
        [f(1), f(1, 2, 3, 4, 5)]
    "};
    assert_eq!(
        eval(source).to_string(),
        "[[1, none, 2, []], [1, 2, 3, [4, 5]]]"
    );
}

#[test]
fn arity_and_type_mismatches() {
    let error = eval_err("func f(a, b?) -> a\nf()");
    assert_eq!(error.to_string(), "f() expected 1 to 2 argument(s), got 0");

    let error = eval_err("func f(x: number) -> x\nf(\"a\")");
    assert_eq!(error.name(), "Type Error");
    assert!(matches!(error.kind, RuntimeErrorKind::ArgumentType { .. }));
}

#[test]
fn switch_runs_the_matching_case() {
    let source = indoc! {"
        var out = \"\"
        switch 2:
            case 1:
                out = \"one\"
            case 2:
                out = \"two\"
            default:
                out = \"other\"
        end
        out
    "};
    assert_eq!(eval(source), Value::string("two"));
}

#[test]
fn enums_are_constant_dictionaries() {
    let source = indoc! {"
        enum Color: red, green, blue
        Color.blue
    "};
    assert_eq!(eval(source), Value::Number(2.0));
    assert!(matches!(
        eval_err("enum Color: red\nColor = 1").kind,
        RuntimeErrorKind::ConstantReassignment { .. }
    ));
}

#[test]
fn print_collects_output_lines() {
    let output = printed(indoc! {"
        print(\"a\", 1, [1, \"x\"])
        print(`sum {1 + 2}`)
    "});
    assert_eq!(output, vec!["a 1 [1, \"x\"]".to_string(), "sum 3".to_string()]);
}

#[test]
fn builtins_cover_lists_and_dicts() {
    let source = indoc! {"
        var xs = [3, 1]
        append(xs, 4)
        insert(xs, 0, 0)
        var last = pop(xs)
        [xs, last, len(xs), keys({a: 1, b: 2}), values({a: 1}), num(\"2.5\"), round(3.14159, 2)]
    "};
    assert_eq!(
        eval(source).to_string(),
        r#"[[0, 3, 1], 4, 3, ["a", "b"], [1], 2.5, 3.14]"#
    );
}

#[test]
fn error_builtin_raises_with_message() {
    let error = eval_err("error(\"boom\")");
    assert_eq!(
        error.kind,
        RuntimeErrorKind::Raised {
            message: "boom".to_string()
        }
    );
}

#[test]
fn constructor_defaults_read_seeded_properties() {
    let source = indoc! {"
        class Dog:
            property default_name = \"rex\"
            property name = none
            method __init(name?=self.default_name):
                self.name = name
            end
        end
        [new Dog().name, new Dog(\"fido\").name]
    "};
    assert_eq!(eval(source).to_string(), r#"["rex", "fido"]"#);
}

#[test]
fn static_properties_are_read_from_the_class() {
    let source = indoc! {"
        class Test:
            static property static_property = 42
            static method double() -> Test::static_property * 2
        end
        Test::static_property = 21
        [Test::static_property, Test::double()]
    "};
    assert_eq!(eval(source), numbers(&[21.0, 42.0]));
}

#[test]
fn private_members_are_hidden_outside_the_class() {
    let source = indoc! {"
        class Account:
            private property balance = 10
            method total() -> self.balance
        end
        var account = new Account()
    "};
    let mut interpreter = Interpreter::new(Config::default());
    interpret(&mut interpreter, source).expect("definition failed");
    let total = interpret(&mut interpreter, "account.total()").expect("method call failed");
    assert_eq!(total, vec![Value::Number(10.0)]);

    let error = interpret(&mut interpreter, "account.balance").expect_err("private read allowed");
    assert_eq!(error.to_string(), "'balance' is private in class 'Account'");
}

#[test]
fn protected_members_are_visible_to_subclasses() {
    let source = indoc! {"
        class Base:
            protected property secret = 7
        end
        class Child extends Base:
            method reveal() -> self.secret
        end
        new Child().reveal()
    "};
    assert_eq!(eval(source), Value::Number(7.0));

    let error = eval_err(indoc! {"
        class Base:
            protected property secret = 7
        end
        new Base().secret
    "});
    assert!(matches!(error.kind, RuntimeErrorKind::Visibility { .. }));
}

#[test]
fn undeclared_properties_cannot_be_assigned() {
    let error = eval_err(indoc! {"
        class Empty:
            pass
        end
        var e = new Empty()
        e.extra = 1
    "});
    assert_eq!(error.to_string(), "'Empty' has no member 'extra'");
}

#[test]
fn super_dispatches_to_the_parent() {
    let source = indoc! {"
        class Animal:
            property sound = \"...\"
            method __init(sound):
                self.sound = sound
            end
            method speak() -> \"says \" + self.sound
        end
        class Dog extends Animal:
            method __init():
                super(\"woof\")
            end
            override method speak() -> \"Dog \" + super.speak()
        end
        var dog = new Dog()
        [dog.speak(), dog instanceof Animal, typeof dog]
    "};
    assert_eq!(eval(source).to_string(), r#"["Dog says woof", true, "Dog"]"#);
}

#[test]
fn overrides_must_be_declared() {
    let error = eval_err(indoc! {"
        class A:
            method f() -> 1
        end
        class B extends A:
            method f() -> 2
        end
    "});
    assert!(matches!(error.kind, RuntimeErrorKind::InvalidClass { .. }));

    let error = eval_err(indoc! {"
        class A:
            override method f() -> 1
        end
    "});
    assert!(matches!(error.kind, RuntimeErrorKind::InvalidClass { .. }));
}

#[test]
fn getters_and_setters_wrap_properties() {
    let source = indoc! {"
        class Temperature:
            property celsius = 0
            getter fahrenheit -> self.celsius * 9 / 5 + 32
            setter fahrenheit(value):
                self.celsius = (value - 32) * 5 / 9
            end
        end
        var t = new Temperature()
        t.fahrenheit = 212
        [t.celsius, t.fahrenheit]
    "};
    assert_eq!(eval(source), numbers(&[100.0, 212.0]));
}

#[test]
fn repr_method_controls_printing() {
    let output = printed(indoc! {"
        class Point:
            property x = 1
            method __repr() -> `Point({self.x})`
        end
        print(new Point(), [new Point()])
    "});
    assert_eq!(output, vec!["Point(1) [Point(1)]".to_string()]);
}

#[test]
fn runaway_recursion_hits_the_depth_limit() {
    // Debug builds use large frames; give the interpreter room to reach the guard.
    let error = std::thread::Builder::new()
        .stack_size(256 * 1024 * 1024)
        .spawn(|| eval_err("func f(n) -> f(n + 1)\nf(0)"))
        .expect("spawn failed")
        .join()
        .expect("interpreter thread panicked");
    assert_eq!(error.kind, RuntimeErrorKind::RecursionLimit { limit: 256 });
    assert_eq!(error.name(), "Recursion Error");
}

#[test]
fn traceback_lists_frames_outermost_first() {
    let error = eval_err(indoc! {"
        func inner() -> 1 / 0
        func outer() -> inner()
        outer()
    "});
    let names: Vec<&str> = error
        .traceback
        .iter()
        .map(|frame| frame.display_name.as_str())
        .collect();
    assert_eq!(names, vec!["<program>", "outer", "inner"]);
    assert_eq!(error.traceback[0].position.line, 2);
    assert_eq!(error.traceback[1].position.line, 1);
}

#[test]
fn control_signals_outside_their_construct_are_errors() {
    assert_eq!(eval_err("return 1").kind, RuntimeErrorKind::ReturnOutsideFunction);
    assert_eq!(
        eval_err("break").kind,
        RuntimeErrorKind::LoopControlOutsideLoop { keyword: "break" }
    );
}

#[test]
fn global_scope_persists_between_runs() {
    let mut interpreter = Interpreter::new(Config::default());
    interpret(&mut interpreter, "var x = 40").expect("first run failed");
    let values = interpret(&mut interpreter, "x + 2").expect("second run failed");
    assert_eq!(values, vec![Value::Number(42.0)]);
    assert!(interpreter.global.symbols.get("x").is_some());
}

#[test]
fn oversized_collections_raise_runtime_errors() {
    for source in [
        "var l = []\nl[10 ** 18] = 1",
        "[1, 2] * 10 ** 19",
        "\"ab\" * 10 ** 18",
    ] {
        let error = eval_err(source);
        assert!(matches!(error.kind, RuntimeErrorKind::TooLarge { .. }), "{source}: {error}");
        assert_eq!(error.name(), "Runtime Error");
    }
}

#[test]
fn concatenation_renders_like_print() {
    let output = printed(indoc! {r#"
        class Tag:
            method __repr() -> "<tag>"
        end
        var l = [1]
        l[] = l
        var m = [1]
        m[] = m
        print("x" + l)
        print("t=" + new Tag(), new Tag() + "!")
        print(l == m, l)
    "#});
    assert_eq!(
        output,
        vec![
            "x[1, [...]]".to_string(),
            "t=<tag> <tag>!".to_string(),
            "true [1, [...]]".to_string(),
        ]
    );
}
