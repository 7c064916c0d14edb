use indoc::indoc;

use super::*;
use crate::ast::{BinaryOp, Index, UnaryOp, Visibility};
use crate::lexer::tokenize;

fn parse(source: &str) -> ParseResult<Program> {
    parse_tokens(tokenize(source).expect("tokenize failed"))
}

fn parse_one(source: &str) -> Node {
    let mut program = parse(source).expect("parse failed");
    assert_eq!(program.statements.len(), 1, "expected a single statement");
    program.statements.remove(0)
}

fn parse_err(source: &str) -> SyntaxError {
    parse(source).expect_err("parse unexpectedly succeeded")
}

fn number(node: &Node) -> f64 {
    match node.kind {
        NodeKind::Number(value) => value,
        ref other => panic!("expected a number, got {other:?}"),
    }
}

fn binary_parts(node: &Node) -> (BinaryOp, &Node, &Node) {
    match &node.kind {
        NodeKind::Binary { op, left, right } => (*op, left, right),
        other => panic!("expected a binary node, got {other:?}"),
    }
}

fn assert_spans_nested(node: &Node) {
    assert!(
        node.span.start.index <= node.span.end.index,
        "inverted span on {:?}",
        node.kind
    );
    let children: Vec<&Node> = match &node.kind {
        NodeKind::Binary { left, right, .. } => vec![left, right],
        NodeKind::Unary { operand, .. } => vec![operand],
        NodeKind::Call { callee, args, .. } => {
            let mut nodes = vec![callee.as_ref()];
            nodes.extend(args.iter());
            nodes
        }
        NodeKind::Property { target, .. } | NodeKind::StaticProperty { target, .. } => {
            vec![target]
        }
        NodeKind::VarModify { value, .. } | NodeKind::VarDeclare { value, .. } => vec![value],
        NodeKind::List(elements) => elements.iter().collect(),
        _ => Vec::new(),
    };
    for child in children {
        assert!(
            node.span.start.index <= child.span.start.index
                && child.span.end.index <= node.span.end.index,
            "{:?} does not contain {:?}",
            node.kind,
            child.kind
        );
        assert_spans_nested(child);
    }
}

#[test]
fn parses_caret_as_power_over_parenthesized_sum() {
    let node = parse_one("5 ^ (1 + 2 * 10 / 10)");
    let (op, base, exponent) = binary_parts(&node);
    assert_eq!(op, BinaryOp::Pow);
    assert_eq!(number(base), 5.0);

    let (op, one, product) = binary_parts(exponent);
    assert_eq!(op, BinaryOp::Add);
    assert_eq!(number(one), 1.0);
    let (op, _, _) = binary_parts(product);
    assert_eq!(op, BinaryOp::Div);
}

#[test]
fn power_is_right_associative() {
    let node = parse_one("2 ** 3 ** 2");
    let (op, base, exponent) = binary_parts(&node);
    assert_eq!(op, BinaryOp::Pow);
    assert_eq!(number(base), 2.0);
    let (op, three, two) = binary_parts(exponent);
    assert_eq!(op, BinaryOp::Pow);
    assert_eq!((number(three), number(two)), (3.0, 2.0));
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let node = parse_one("1 + 2 * 3 - 4");
    let (op, left, four) = binary_parts(&node);
    assert_eq!(op, BinaryOp::Sub);
    assert_eq!(number(four), 4.0);
    let (op, one, product) = binary_parts(left);
    assert_eq!(op, BinaryOp::Add);
    assert_eq!(number(one), 1.0);
    assert_eq!(binary_parts(product).0, BinaryOp::Mul);
}

#[test]
fn not_wraps_the_whole_comparison() {
    let node = parse_one("not a == b");
    let NodeKind::Unary { op, operand } = &node.kind else {
        panic!("expected unary, got {:?}", node.kind);
    };
    assert_eq!(*op, UnaryOp::Not);
    assert_eq!(binary_parts(operand).0, BinaryOp::Equal);
}

#[test]
fn rewrites_compound_assignment_on_variables() {
    let node = parse_one("total += 2");
    let NodeKind::VarModify { name, value } = &node.kind else {
        panic!("expected var modify, got {:?}", node.kind);
    };
    assert_eq!(name, "total");
    let (op, left, right) = binary_parts(value);
    assert_eq!(op, BinaryOp::Add);
    assert_eq!(left.kind, NodeKind::VarAccess("total".to_string()));
    assert_eq!(number(right), 2.0);
}

#[test]
fn combines_postfix_increments_into_one_delta() {
    let program = parse("var a = 5; a++++").expect("parse failed");
    assert_eq!(program.statements.len(), 2);
    let NodeKind::VarModify { name, value } = &program.statements[1].kind else {
        panic!("expected var modify");
    };
    assert_eq!(name, "a");
    let (op, _, delta) = binary_parts(value);
    assert_eq!(op, BinaryOp::Add);
    assert_eq!(number(delta), 2.0);
}

#[test]
fn prefix_decrement_rewrites_to_negative_delta() {
    let node = parse_one("--count");
    let NodeKind::VarModify { value, .. } = &node.kind else {
        panic!("expected var modify");
    };
    assert_eq!(number(binary_parts(value).2), -1.0);
}

#[test]
fn rewrites_compound_assignment_per_target_kind() {
    let node = parse_one("xs[0] *= 3");
    let NodeKind::IndexAssign { index, value, .. } = &node.kind else {
        panic!("expected index assign, got {:?}", node.kind);
    };
    assert!(matches!(index, Index::Single(_)));
    assert_eq!(binary_parts(value).0, BinaryOp::Mul);

    let node = parse_one("self.hits ??= 1");
    let NodeKind::PropertyAssign { name, value, .. } = &node.kind else {
        panic!("expected property assign, got {:?}", node.kind);
    };
    assert_eq!(name, "hits");
    assert_eq!(binary_parts(value).0, BinaryOp::Nullish);

    let node = parse_one("Counter::total <<= 1");
    assert!(matches!(node.kind, NodeKind::StaticPropertyAssign { .. }));
}

#[test]
fn push_marker_is_an_assignment_target() {
    let node = parse_one("items[] = 4");
    assert!(matches!(
        node.kind,
        NodeKind::IndexAssign {
            index: Index::Push,
            ..
        }
    ));

    let error = parse_err("print(items[])");
    assert!(error.details.contains("push marker"), "{}", error.details);
}

#[test]
fn parses_slices_with_open_bounds() {
    let node = parse_one("xs[1:]");
    let NodeKind::IndexAccess {
        index: Index::Slice { start, end },
        ..
    } = &node.kind
    else {
        panic!("expected slice, got {:?}", node.kind);
    };
    assert!(start.is_some());
    assert!(end.is_none());

    let node = parse_one("xs[:-1]");
    assert!(matches!(
        node.kind,
        NodeKind::IndexAccess {
            index: Index::Slice { start: None, end: Some(_) },
            ..
        }
    ));
}

#[test]
fn optional_chaining_sticks_to_the_rest_of_the_chain() {
    let node = parse_one("user?.address.street");
    let NodeKind::Property {
        target,
        name,
        optional,
    } = &node.kind
    else {
        panic!("expected property, got {:?}", node.kind);
    };
    assert_eq!(name, "street");
    assert!(*optional);
    assert!(matches!(
        target.kind,
        NodeKind::Property { optional: true, .. }
    ));

    let node = parse_one("callback?.()");
    assert!(matches!(node.kind, NodeKind::Call { optional: true, .. }));
}

#[test]
fn optional_chain_cannot_be_assigned() {
    let error = parse_err("user?.name = 4");
    assert_eq!(error.details, "Invalid assignment target");
    let error = parse_err("1 = 2");
    assert_eq!(error.details, "Invalid assignment target");
}

#[test]
fn statements_split_on_newlines_and_semicolons() {
    let program = parse(indoc! {"
        var a = 1; var b = 2

        # comment line
        a + b
    "})
    .expect("parse failed");
    assert_eq!(program.statements.len(), 3);
}

#[test]
fn statements_on_one_line_without_separator_fail() {
    let error = parse_err("a b");
    assert!(error.details.starts_with("Expected"), "{}", error.details);
}

#[test]
fn parses_inline_if_chain() {
    let node = parse_one("if a: 1 elif b: 2 else: 3");
    let NodeKind::If {
        branches,
        else_body,
        else_discard,
    } = &node.kind
    else {
        panic!("expected if, got {:?}", node.kind);
    };
    assert_eq!(branches.len(), 2);
    assert!(branches.iter().all(|branch| !branch.discard));
    assert!(else_body.is_some());
    assert!(!else_discard);
}

#[test]
fn parses_block_if_chain_with_single_end() {
    let node = parse_one(indoc! {"
        if a:
            print(1)
        elif b:
            print(2)
        else:
            print(3)
        end
    "});
    let NodeKind::If {
        branches,
        else_discard,
        ..
    } = &node.kind
    else {
        panic!("expected if");
    };
    assert_eq!(branches.len(), 2);
    assert!(branches[0].discard);
    assert!(*else_discard);
}

#[test]
fn inline_if_followed_by_next_statement() {
    let program = parse(indoc! {"
        if a: print(1)
        print(2)
    "})
    .expect("parse failed");
    assert_eq!(program.statements.len(), 2);
}

#[test]
fn block_if_requires_end() {
    let error = parse_err(indoc! {"
        if a:
            print(1)
    "});
    assert!(error.details.contains("'end'"), "{}", error.details);
}

#[test]
fn empty_block_requires_pass() {
    let error = parse_err("while true:\nend");
    assert!(error.details.contains("pass"), "{}", error.details);

    let node = parse_one("while true:\n    pass\nend");
    let NodeKind::While { body, discard, .. } = &node.kind else {
        panic!("expected while");
    };
    assert!(*discard);
    assert!(matches!(&body.kind, NodeKind::Block(statements) if statements[0].kind == NodeKind::Pass));
}

#[test]
fn parses_for_loops_with_optional_start_and_step() {
    let node = parse_one("for i to 10: i");
    let NodeKind::For {
        var,
        start,
        step,
        discard,
        ..
    } = &node.kind
    else {
        panic!("expected for");
    };
    assert_eq!(var, "i");
    assert!(start.is_none());
    assert!(step.is_none());
    assert!(!discard);

    let node = parse_one("for i = 10 to 0 step -2: i");
    assert!(matches!(
        node.kind,
        NodeKind::For {
            start: Some(_),
            step: Some(_),
            ..
        }
    ));
}

#[test]
fn parses_foreach_with_key_and_value() {
    let node = parse_one("foreach scores as name, score: print(name)");
    let NodeKind::Foreach { key, value, .. } = &node.kind else {
        panic!("expected foreach");
    };
    assert_eq!(key.as_deref(), Some("name"));
    assert_eq!(value, "score");
}

#[test]
fn switch_desugars_cases_into_equality_tests() {
    let node = parse_one(indoc! {"
        switch day:
            case 1:
                print(\"mon\")
            case 2:
                print(\"tue\")
            default:
                print(\"other\")
        end
    "});
    let NodeKind::Switch { cases, default } = &node.kind else {
        panic!("expected switch");
    };
    assert_eq!(cases.len(), 2);
    let (op, subject, value) = binary_parts(&cases[1].0);
    assert_eq!(op, BinaryOp::Equal);
    assert_eq!(subject.kind, NodeKind::VarAccess("day".to_string()));
    assert_eq!(number(value), 2.0);
    assert!(default.is_some());
}

#[test]
fn switch_default_must_be_last() {
    let error = parse_err(indoc! {"
        switch day:
            default:
                pass
            case 1:
                pass
        end
    "});
    assert!(error.details.contains("last"), "{}", error.details);
}

#[test]
fn parses_function_parameters() {
    let node = parse_one("func f(a, b: number, c?, d?=5, ...rest) -> a");
    let NodeKind::FuncDef(function) = &node.kind else {
        panic!("expected function");
    };
    assert_eq!(function.name.as_deref(), Some("f"));
    assert!(function.auto_return);
    let params = &function.params;
    assert_eq!(params.len(), 5);
    assert_eq!(params[1].type_name.as_deref(), Some("number"));
    assert!(params[2].is_optional && params[2].default.is_none());
    assert!(params[3].is_optional && params[3].default.is_some());
    assert!(params[4].is_rest);
    assert_eq!(params[4].type_name.as_deref(), Some("list"));
}

#[test]
fn rejects_invalid_parameter_lists() {
    let error = parse_err("func f(...rest, a) -> a");
    assert!(error.details.contains("rest parameter"), "{}", error.details);

    let error = parse_err("func f(a?, b) -> a");
    assert!(error.details.contains("Mandatory"), "{}", error.details);

    let error = parse_err("func f(a, a) -> a");
    assert!(error.details.contains("Duplicate parameter"), "{}", error.details);
}

#[test]
fn rejects_duplicate_dictionary_keys() {
    let error = parse_err("{a: 1, \"a\": 2}");
    assert!(error.details.contains("Duplicate key 'a'"), "{}", error.details);
}

#[test]
fn parses_class_members_with_modifiers() {
    let node = parse_one(indoc! {"
        class Dog extends Animal:
            private property name = \"rex\"
            static property count = 0
            method __init(name?=self.name):
                super(name)
            end
            override method speak() -> \"woof\"
            getter label -> \"dog \" + self.name
            setter label(value):
                self.name = value
            end
        end
    "});
    let NodeKind::ClassDef(class) = &node.kind else {
        panic!("expected class");
    };
    assert_eq!(class.name, "Dog");
    assert_eq!(class.parent.as_deref(), Some("Animal"));
    assert_eq!(class.properties.len(), 2);
    assert_eq!(class.properties[0].flags.visibility, Visibility::Private);
    assert!(class.properties[1].flags.is_static);
    assert_eq!(class.methods.len(), 2);
    assert!(class.methods[1].flags.is_override);
    assert_eq!(class.getters.len(), 1);
    assert_eq!(class.setters.len(), 1);

    let constructor = &class.methods[0].function;
    let NodeKind::Block(statements) = &constructor.body.kind else {
        panic!("expected block body");
    };
    assert!(matches!(statements[0].kind, NodeKind::SuperCall(_)));
}

#[test]
fn class_body_must_be_block_form() {
    let error = parse_err("class A: pass");
    assert!(error.details.contains("new line"), "{}", error.details);

    let error = parse_err("class A:\nend");
    assert!(error.details.contains("pass"), "{}", error.details);

    let program = parse("class A:\n    pass\nend").expect("parse failed");
    assert_eq!(program.statements.len(), 1);
}

#[test]
fn rejects_duplicate_members() {
    let error = parse_err(indoc! {"
        class A:
            property x = 1
            method x() -> 2
        end
    "});
    assert!(error.details.contains("Duplicate member 'x'"), "{}", error.details);
}

#[test]
fn super_call_is_only_legal_in_constructors() {
    let error = parse_err(indoc! {"
        class A extends B:
            method run():
                super()
            end
        end
    "});
    assert!(error.details.contains("constructor"), "{}", error.details);

    let error = parse_err("super()");
    assert!(error.details.contains("constructor"), "{}", error.details);
}

#[test]
fn parses_enums_inline_and_block() {
    let node = parse_one("enum Color: red, green, blue");
    assert_eq!(
        node.kind,
        NodeKind::Enum {
            name: "Color".to_string(),
            members: vec!["red".into(), "green".into(), "blue".into()],
        }
    );

    let node = parse_one(indoc! {"
        enum Size:
            small
            large
        end
    "});
    assert!(matches!(&node.kind, NodeKind::Enum { members, .. } if members.len() == 2));
}

#[test]
fn parses_template_interpolation() {
    let node = parse_one("`sum: {a + b}!`");
    let NodeKind::Template(parts) = &node.kind else {
        panic!("expected template, got {:?}", node.kind);
    };
    assert_eq!(parts.len(), 3);
    assert!(matches!(&parts[1], crate::ast::TemplatePart::Expr(expr) if binary_parts(expr).0 == BinaryOp::Add));
}

#[test]
fn rejects_runaway_nesting() {
    // Debug builds use large frames; give the parser room to reach the guard.
    let error = std::thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(|| {
            let depth = MAX_NESTING + 8;
            let source = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
            parse_err(&source)
        })
        .expect("spawn failed")
        .join()
        .expect("parser thread panicked");
    assert!(error.details.contains("nesting"), "{}", error.details);
}

#[test]
fn spans_contain_their_children() {
    let program = parse(indoc! {"
        var total = compute(1 + 2 * x, -y).value ** 2
        [1, f(2), a?.b]
    "})
    .expect("parse failed");
    for statement in &program.statements {
        assert_spans_nested(statement);
    }
}

#[test]
fn parsing_is_deterministic() {
    let source = indoc! {"
        func fib(n) -> if n < 2: n else: fib(n - 1) + fib(n - 2)
        print(fib(10))
    "};
    assert_eq!(
        parse(source).expect("parse failed"),
        parse(source).expect("parse failed")
    );
}
