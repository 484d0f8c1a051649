#[allow(dead_code, unused_variables, clippy::all)]
mod dynamic {
    include!(concat!(env!("OUT_DIR"), "/bracketed/dynamic.rs"));
}

use gramgen_runtime::{
    dynamic::{Builder, Token, TokenList, Value},
    ParseError,
};

fn lexer(src: &str) -> TokenList {
    let mut lexer = TokenList::new();
    for t in src.split_whitespace() {
        match t {
            "[" | "]" | "," => lexer.push(t),
            n => lexer.push_token(Token::new("NUM", Value::token(n)), false),
        };
    }
    lexer
}

fn num(n: &str) -> Value {
    Value::node("num", vec![Value::token(n)])
}

fn single(item: Value) -> Value {
    Value::node("single", vec![item])
}

fn append(list: Value, item: Value) -> Value {
    Value::node("append", vec![list, item])
}

fn group(list: Value) -> Value {
    Value::node("group", vec![list])
}

#[test]
fn single_number() {
    assert_eq!(dynamic::parse_item(&mut lexer("7"), None), Ok(num("7")));
}

#[test]
fn lists_inside_brackets() {
    let value = dynamic::parse_item(&mut lexer("[ 1 ]"), None).unwrap();
    assert_eq!(value, group(single(num("1"))));

    let value = dynamic::parse_item(&mut lexer("[ 1 , 2 , 3 ]"), None).unwrap();
    assert_eq!(
        value,
        group(append(append(single(num("1")), num("2")), num("3")))
    );
}

#[test]
fn flags_are_restored_after_nested_brackets() {
    let value = dynamic::parse_item(&mut lexer("[ [ 1 ] , 2 ]"), None).unwrap();
    assert_eq!(
        value,
        group(append(single(group(single(num("1")))), num("2")))
    );

    let value = dynamic::parse_item(&mut lexer("[ 1 , [ 2 , 3 ] ]"), None).unwrap();
    assert_eq!(
        value,
        group(append(
            single(num("1")),
            group(append(single(num("2")), num("3")))
        ))
    );
}

#[test]
fn comma_at_the_top_level() {
    assert_eq!(
        dynamic::parse_item(&mut lexer("1 , 2"), None),
        Err(ParseError::SyntaxError)
    );
    assert_eq!(
        dynamic::parse_item(&mut lexer("[ 1 ] , 2"), None),
        Err(ParseError::SyntaxError)
    );
}

#[test]
fn malformed_brackets() {
    assert_eq!(
        dynamic::parse_item(&mut lexer("[ ]"), None),
        Err(ParseError::SyntaxError)
    );
    assert_eq!(
        dynamic::parse_item(&mut lexer("[ 1"), None),
        Err(ParseError::UnexpectedEnd)
    );
    assert_eq!(
        dynamic::parse_item(&mut lexer("[ 1 ] ]"), None),
        Err(ParseError::SyntaxError)
    );
}

#[test]
fn custom_builder_sums() {
    let int = |v: &Value| v.downcast_ref::<i64>().copied().unwrap();
    let builder = Builder::new()
        .with("num", |args| {
            Value::custom(args[0].as_token().unwrap().parse::<i64>().unwrap())
        })
        .with("single", |args| args[0].clone())
        .with("group", |args| args[0].clone())
        .with("append", move |args| Value::custom(int(&args[0]) + int(&args[1])));
    let value =
        dynamic::parse_item(&mut lexer("[ 1 , [ 2 , 3 ] , 4 ]"), Some(&builder)).unwrap();
    assert_eq!(value.downcast_ref::<i64>(), Some(&10));
}
