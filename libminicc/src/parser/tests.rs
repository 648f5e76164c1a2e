// Copyright 2025-2026 Neil Henderson
//
//! Unit tests for the MiniC parser.

use crate::compiler_driver::Driver;
use crate::lexer;

use super::abstract_syntax_tree::*;
use super::recursive_descent::parse;

fn parse_ok(source: &str) -> AstCompileUnit {
    let mut driver = Driver::for_testing();
    let tokens = lexer::lex(&mut driver, source);
    assert!(!driver.has_error_diagnostics(), "lexer reported errors for {source:?}");
    let unit = parse(&mut driver, tokens);
    assert!(!driver.has_error_diagnostics(), "parser reported errors for {source:?}");
    unit.expect("expected a successful parse")
}

fn parse_err(source: &str) {
    let mut driver = Driver::for_testing();
    let tokens = lexer::lex(&mut driver, source);
    let unit = parse(&mut driver, tokens);
    assert!(
        unit.is_none() || driver.has_error_diagnostics(),
        "expected a syntax error for {source:?}"
    );
}

#[test]
fn empty_function() {
    let unit = parse_ok("void f() { }");
    assert_eq!(unit.items.len(), 1);
    let AstTopLevel::Function(function) = &unit.items[0] else {
        panic!("expected a function");
    };
    assert_eq!(function.name, "f");
    assert_eq!(function.return_type, AstType::Void);
    assert!(function.params.is_empty());
    assert!(function.body.as_ref().unwrap().items.is_empty());
}

#[test]
fn function_declaration_has_no_body() {
    let unit = parse_ok("int h(int, int);");
    let AstTopLevel::Function(function) = &unit.items[0] else {
        panic!("expected a function");
    };
    assert!(function.body.is_none());
    assert_eq!(function.params.len(), 2);
    assert!(function.params[0].name.is_none());
}

#[test]
fn array_parameter_decays() {
    let unit = parse_ok("int g(int a[][4]) { return a[0][0]; }");
    let AstTopLevel::Function(function) = &unit.items[0] else {
        panic!("expected a function");
    };
    assert_eq!(function.params[0].dims, vec![0, 4]);
}

#[test]
fn global_arrays_carry_dimensions() {
    let unit = parse_ok("int a[3][4], b;");
    let AstTopLevel::GlobalVars(defs) = &unit.items[0] else {
        panic!("expected globals");
    };
    assert_eq!(defs.len(), 2);
    assert_eq!(defs[0].dims, vec![3, 4]);
    assert!(defs[1].dims.is_empty());
}

#[test]
fn precedence_groups_multiplication_first() {
    let unit = parse_ok("int f() { return 1 + 2 * 3; }");
    let AstTopLevel::Function(function) = &unit.items[0] else {
        panic!("expected a function");
    };
    let AstBlockItem::Stmt(AstStatement::Return { value: Some(expr), .. }) =
        &function.body.as_ref().unwrap().items[0]
    else {
        panic!("expected a return statement");
    };
    let AstExpression::Binary { op: AstBinaryOp::Add, rhs, .. } = expr else {
        panic!("expected the addition at the root");
    };
    assert!(matches!(**rhs, AstExpression::Binary { op: AstBinaryOp::Multiply, .. }));
}

#[test]
fn assignment_statement_requires_lvalue_target() {
    parse_err("int f() { 1 + 2 = 3; }");
}

#[test]
fn assignment_to_array_element() {
    let unit = parse_ok("int f() { int a[10]; a[2] = 5; return a[2]; }");
    let AstTopLevel::Function(function) = &unit.items[0] else {
        panic!("expected a function");
    };
    let AstBlockItem::Stmt(AstStatement::Assign { target, .. }) =
        &function.body.as_ref().unwrap().items[1]
    else {
        panic!("expected an assignment");
    };
    assert_eq!(target.name, "a");
    assert_eq!(target.indices.len(), 1);
}

#[test]
fn dangling_else_binds_to_nearest_if() {
    let unit = parse_ok("int f(int x) { if (x) if (x) return 1; else return 2; return 3; }");
    let AstTopLevel::Function(function) = &unit.items[0] else {
        panic!("expected a function");
    };
    let AstBlockItem::Stmt(AstStatement::If { else_stmt, then_stmt, .. }) =
        &function.body.as_ref().unwrap().items[0]
    else {
        panic!("expected an if statement");
    };
    assert!(else_stmt.is_none());
    assert!(matches!(**then_stmt, AstStatement::If { ref else_stmt, .. } if else_stmt.is_some()));
}

#[test]
fn global_initialiser_is_rejected() {
    parse_err("int g = 1;");
}

#[test]
fn zero_array_dimension_is_rejected() {
    parse_err("int f() { int a[0]; }");
}

#[test]
fn missing_semicolon_is_rejected() {
    parse_err("int f() { return 0 }");
}

#[test]
fn void_variable_is_rejected() {
    parse_err("void v;");
}
