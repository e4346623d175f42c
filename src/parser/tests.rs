//! Parser tests.

use crate::ast::{ExprKind, Program, StmtKind};
use crate::error::ParserError;
use crate::lexer::Scanner;
use crate::parser::Parser;

fn parse(source: &str) -> Program {
    let tokens = Scanner::new(source).scan_tokens().expect("lexer error");
    Parser::new(tokens).parse().expect("parser error")
}

fn parse_err(source: &str) -> ParserError {
    let tokens = Scanner::new(source).scan_tokens().expect("lexer error");
    Parser::new(tokens).parse().expect_err("expected parse error")
}

#[test]
fn test_let_statements() {
    let program = parse("let x = 5; let y = true; let foobar = y;");
    assert_eq!(program.statements.len(), 3);

    let expected = [("x", "5"), ("y", "true"), ("foobar", "y")];
    for (stmt, (name, value)) in program.statements.iter().zip(expected) {
        match &stmt.kind {
            StmtKind::Let { name: n, value: v } => {
                assert_eq!(n, name);
                assert_eq!(v.to_string(), value);
            }
            other => panic!("expected let statement, got {:?}", other),
        }
    }
}

#[test]
fn test_return_statements() {
    let program = parse("return 5; return foobar;");
    assert_eq!(program.statements.len(), 2);
    for stmt in &program.statements {
        assert!(matches!(stmt.kind, StmtKind::Return(_)));
    }
}

#[test]
fn test_operator_precedence() {
    let cases = [
        ("-a * b", "((-a) * b)"),
        ("!-a", "(!(-a))"),
        ("a + b + c", "((a + b) + c)"),
        ("a + b - c", "((a + b) - c)"),
        ("a * b * c", "((a * b) * c)"),
        ("a + b / c", "(a + (b / c))"),
        ("a + b * c + d / e - f", "(((a + (b * c)) + (d / e)) - f)"),
        ("3 + 4; -5 * 5", "(3 + 4)((-5) * 5)"),
        ("5 > 4 == 3 < 4", "((5 > 4) == (3 < 4))"),
        ("5 < 4 != 3 > 4", "((5 < 4) != (3 > 4))"),
        (
            "3 + 4 * 5 == 3 * 1 + 4 * 5",
            "((3 + (4 * 5)) == ((3 * 1) + (4 * 5)))",
        ),
        ("3 > 5 == false", "((3 > 5) == false)"),
        ("1 + (2 + 3) + 4", "((1 + (2 + 3)) + 4)"),
        ("(5 + 5) * 2", "((5 + 5) * 2)"),
        ("2 / (5 + 5)", "(2 / (5 + 5))"),
        ("-(5 + 5)", "(-(5 + 5))"),
        ("!(true == true)", "(!(true == true))"),
        ("a + add(b * c) + d", "((a + add((b * c))) + d)"),
        (
            "add(a, b, 1, 2 * 3, 4 + 5, add(6, 7 * 8))",
            "add(a, b, 1, (2 * 3), (4 + 5), add(6, (7 * 8)))",
        ),
        (
            "a * [1, 2, 3, 4][b * c] * d",
            "((a * ([1, 2, 3, 4][(b * c)])) * d)",
        ),
        (
            "add(a * b[2], b[1], 2 * [1, 2][1])",
            "add((a * (b[2])), (b[1]), (2 * ([1, 2][1])))",
        ),
    ];

    for (source, expected) in cases {
        assert_eq!(parse(source).to_string(), expected, "source: {}", source);
    }
}

#[test]
fn test_if_expression() {
    let program = parse("if (x < y) { x }");
    assert_eq!(program.to_string(), "if (x < y) x");

    let StmtKind::Expression(expr) = &program.statements[0].kind else {
        panic!("expected expression statement");
    };
    let ExprKind::If {
        condition,
        consequence,
        alternative,
    } = &expr.kind
    else {
        panic!("expected if expression");
    };
    assert_eq!(condition.to_string(), "(x < y)");
    assert_eq!(consequence.statements.len(), 1);
    assert!(alternative.is_none());
}

#[test]
fn test_if_else_expression() {
    let program = parse("if (x < y) { x } else { y }");
    assert_eq!(program.to_string(), "if (x < y) x else y");
}

#[test]
fn test_function_literal() {
    let program = parse("fn(x, y) { x + y; }");
    let StmtKind::Expression(expr) = &program.statements[0].kind else {
        panic!("expected expression statement");
    };
    let ExprKind::Function { parameters, body } = &expr.kind else {
        panic!("expected function literal");
    };
    assert_eq!(parameters, &["x", "y"]);
    assert_eq!(body.statements.len(), 1);
}

#[test]
fn test_function_parameter_lists() {
    let cases: [(&str, &[&str]); 3] = [
        ("fn() {};", &[]),
        ("fn(x) {};", &["x"]),
        ("fn(x, y, z) {};", &["x", "y", "z"]),
    ];

    for (source, expected) in cases {
        let program = parse(source);
        let StmtKind::Expression(expr) = &program.statements[0].kind else {
            panic!("expected expression statement");
        };
        let ExprKind::Function { parameters, .. } = &expr.kind else {
            panic!("expected function literal");
        };
        assert_eq!(parameters, expected);
    }
}

#[test]
fn test_call_expression() {
    let program = parse("add(1, 2 * 3, 4 + 5);");
    assert_eq!(program.to_string(), "add(1, (2 * 3), (4 + 5))");
}

#[test]
fn test_array_literal() {
    let program = parse("[1, 2 * 2, 3 + 3]");
    assert_eq!(program.to_string(), "[1, (2 * 2), (3 + 3)]");
}

#[test]
fn test_empty_array_literal() {
    let program = parse("[]");
    assert_eq!(program.to_string(), "[]");
}

#[test]
fn test_hash_literal() {
    let program = parse(r#"{"one": 1, "two": 2, "three": 3}"#);
    let StmtKind::Expression(expr) = &program.statements[0].kind else {
        panic!("expected expression statement");
    };
    let ExprKind::Hash(pairs) = &expr.kind else {
        panic!("expected hash literal");
    };
    assert_eq!(pairs.len(), 3);
    assert_eq!(pairs[0].0.to_string(), "one");
    assert_eq!(pairs[0].1.to_string(), "1");
}

#[test]
fn test_empty_hash_literal() {
    let program = parse("{}");
    let StmtKind::Expression(expr) = &program.statements[0].kind else {
        panic!("expected expression statement");
    };
    assert!(matches!(&expr.kind, ExprKind::Hash(pairs) if pairs.is_empty()));
}

#[test]
fn test_hash_with_expression_values() {
    let program = parse(r#"{"one": 0 + 1, "two": 10 - 8}"#);
    assert_eq!(program.to_string(), "{one: (0 + 1), two: (10 - 8)}");
}

#[test]
fn test_missing_let_value_is_error() {
    let err = parse_err("let x;");
    assert!(matches!(err, ParserError::UnexpectedToken { .. }));
}

#[test]
fn test_dangling_infix_is_error() {
    let err = parse_err("1 +");
    assert!(matches!(err, ParserError::ExpectedExpression { .. }));
}

#[test]
fn test_unclosed_paren_is_error() {
    let err = parse_err("(1 + 2");
    assert!(matches!(err, ParserError::UnexpectedToken { .. }));
}
