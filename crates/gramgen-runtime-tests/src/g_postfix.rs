#[allow(dead_code, unused_variables, clippy::all)]
mod dynamic {
    include!(concat!(env!("OUT_DIR"), "/postfix/dynamic.rs"));
}

use gramgen_runtime::{
    dynamic::{Token, TokenList, Value},
    ParseError,
};

fn ident(name: &str) -> Value {
    Value::node("ident", vec![Value::token(name)])
}

fn postinc(value: Value) -> Value {
    Value::node("postinc", vec![value])
}

#[test]
fn increments_on_the_same_line() {
    let mut lexer = TokenList::new();
    lexer
        .push_token(Token::new("Identifier", Value::token("i")), false)
        .push("++")
        .push("++");
    let value = dynamic::parse_expr(&mut lexer, None).unwrap();
    assert_eq!(value, postinc(postinc(ident("i"))));
}

#[test]
fn bare_identifier() {
    let mut lexer = TokenList::new();
    lexer.push_token(Token::new("Identifier", Value::token("i")), false);
    assert_eq!(dynamic::parse_expr(&mut lexer, None), Ok(ident("i")));
}

#[test]
fn line_break_before_operator() {
    let mut lexer = TokenList::new();
    lexer
        .push_token(Token::new("Identifier", Value::token("i")), false)
        .push_after_newline("++");
    assert_eq!(
        dynamic::parse_expr(&mut lexer, None),
        Err(ParseError::SyntaxError)
    );

    let mut lexer = TokenList::new();
    lexer
        .push_token(Token::new("Identifier", Value::token("i")), false)
        .push("++")
        .push_after_newline("++");
    assert_eq!(
        dynamic::parse_expr(&mut lexer, None),
        Err(ParseError::SyntaxError)
    );
}
