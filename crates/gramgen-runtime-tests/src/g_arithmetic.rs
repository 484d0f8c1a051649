#[allow(dead_code, unused_variables, clippy::all)]
mod typed {
    include!(concat!(env!("OUT_DIR"), "/arithmetic/typed.rs"));
}

#[allow(dead_code, unused_variables, clippy::all)]
mod typed_default {
    include!(concat!(env!("OUT_DIR"), "/arithmetic/typed_default.rs"));
}

#[allow(dead_code, unused_variables, clippy::all)]
mod dynamic {
    include!(concat!(env!("OUT_DIR"), "/arithmetic/dynamic.rs"));
}

use gramgen_runtime::{
    dynamic::{Builder, Token, TokenList, Value},
    ParseError,
};
use typed::concrete::Expr;

fn tokens(src: &str) -> Vec<typed::Token> {
    src.split_whitespace()
        .map(|t| match t {
            "+" => typed::Token::PlusSign,
            "*" => typed::Token::Asterisk,
            "(" => typed::Token::LeftParenthesis,
            ")" => typed::Token::RightParenthesis,
            n => typed::Token::Num(n.to_owned()),
        })
        .collect()
}

fn lexer(src: &str) -> TokenList {
    let mut lexer = TokenList::new();
    for t in src.split_whitespace() {
        match t {
            "+" | "*" | "(" | ")" => lexer.push(t),
            n => lexer.push_token(Token::new("NUM", Value::token(n)), false),
        };
    }
    lexer
}

struct Eval;

impl typed::Handler for Eval {
    type Expr = i64;

    fn add(&self, a0: i64, a1: i64) -> i64 {
        a0 + a1
    }

    fn mul(&self, a0: i64, a1: i64) -> i64 {
        a0 * a1
    }

    fn num(&self, a0: String) -> i64 {
        a0.parse().unwrap()
    }
}

#[test]
fn typed_evaluates() {
    let eval = |src: &str| typed::parse_expr(&Eval, tokens(src).into_iter());
    assert_eq!(eval("1 + 2 * 3"), Ok(7));
    assert_eq!(eval("( 1 + 2 ) * 3"), Ok(9));
    assert_eq!(eval("2 * ( 3 + 4 ) * 5 + 6"), Ok(76));
    assert_eq!(eval("42"), Ok(42));
}

#[test]
fn typed_builds_concrete_tree() {
    let num = |n: &str| Box::new(Expr::Num(n.to_owned()));
    let ast = typed::parse_expr(&typed::DefaultHandler, tokens("1 + 2 * 3").into_iter());
    assert_eq!(
        ast,
        Ok(Box::new(Expr::Add(
            num("1"),
            Box::new(Expr::Mul(num("2"), num("3")))
        )))
    );
}

#[test]
fn typed_specialized_to_default_handler() {
    use typed_default::{concrete::Expr, Token::*};
    let ast = typed_default::parse_expr(
        vec![
            LeftParenthesis,
            Num("1".into()),
            RightParenthesis,
            Asterisk,
            Num("2".into()),
        ]
        .into_iter(),
    );
    assert_eq!(
        ast,
        Ok(Box::new(Expr::Mul(
            Box::new(Expr::Num("1".into())),
            Box::new(Expr::Num("2".into()))
        )))
    );
}

#[test]
fn typed_errors() {
    let parse = |src: &str| typed::parse_expr(&Eval, tokens(src).into_iter());
    assert_eq!(parse("1 +"), Err(ParseError::UnexpectedEnd));
    assert_eq!(parse("( 1"), Err(ParseError::UnexpectedEnd));
    assert_eq!(parse(""), Err(ParseError::UnexpectedEnd));
    assert_eq!(parse("+ 1"), Err(ParseError::SyntaxError));
    assert_eq!(parse("1 )"), Err(ParseError::SyntaxError));
    assert_eq!(parse("1 2"), Err(ParseError::SyntaxError));
}

#[test]
fn dynamic_default_builder() {
    let value = dynamic::parse_expr(&mut lexer("1 + 2 * 3"), None).unwrap();
    let num = |n: &str| Value::node("num", vec![Value::token(n)]);
    assert_eq!(
        value,
        Value::node(
            "add",
            vec![num("1"), Value::node("mul", vec![num("2"), num("3")])]
        )
    );
}

#[test]
fn dynamic_custom_builder() {
    let int = |v: &Value| v.downcast_ref::<i64>().copied().unwrap();
    let builder = Builder::new()
        .with("num", |args| {
            Value::custom(args[0].as_token().unwrap().parse::<i64>().unwrap())
        })
        .with("add", move |args| Value::custom(int(&args[0]) + int(&args[1])))
        .with("mul", move |args| Value::custom(int(&args[0]) * int(&args[1])));
    let value = dynamic::parse_expr(&mut lexer("( 1 + 2 ) * 3 + 4"), Some(&builder)).unwrap();
    assert_eq!(value.downcast_ref::<i64>(), Some(&13));
}

#[test]
fn dynamic_errors() {
    assert_eq!(
        dynamic::parse_expr(&mut lexer("1 +"), None),
        Err(ParseError::UnexpectedEnd)
    );
    assert_eq!(
        dynamic::parse_expr(&mut lexer("1 ) 2"), None),
        Err(ParseError::SyntaxError)
    );

    let incomplete = Builder::new().with("num", |args| args[0].clone());
    assert_eq!(
        dynamic::parse_expr(&mut lexer("1"), Some(&incomplete)),
        Err(ParseError::MissingMethod("add".into()))
    );
}
