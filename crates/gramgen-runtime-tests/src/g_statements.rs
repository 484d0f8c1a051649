#[allow(dead_code, unused_variables, clippy::all)]
mod typed {
    include!(concat!(env!("OUT_DIR"), "/statements/typed.rs"));
}

#[allow(dead_code, unused_variables, clippy::all)]
mod dynamic {
    include!(concat!(env!("OUT_DIR"), "/statements/dynamic.rs"));
}

use gramgen_runtime::{
    dynamic::{Token, TokenList, Value},
    ParseError,
};

/// `x ; y` with `\n` marking a line break before the next token.
fn lexer(src: &str) -> TokenList {
    let mut lexer = TokenList::new();
    let mut newline = false;
    for t in src.split(' ') {
        match t {
            "\n" => newline = true,
            ";" => {
                lexer.push_token(Token::new(";", Value::token(";")), newline);
                newline = false;
            }
            name => {
                lexer.push_token(Token::new("Identifier", Value::token(name)), newline);
                newline = false;
            }
        }
    }
    lexer
}

fn stmt(name: &str) -> Value {
    Value::node("Statement", vec![Value::token(name)])
}

fn script(stmts: &[&str]) -> Value {
    let mut list = Value::node("StatementList 0", vec![stmt(stmts[0])]);
    for name in &stmts[1..] {
        list = Value::node("StatementList 1", vec![list, stmt(name)]);
    }
    Value::node("Script", vec![list])
}

#[test]
fn explicit_semicolons() {
    let value = dynamic::parse_script(&mut lexer("x ; y ;"), None).unwrap();
    assert_eq!(value, script(&["x", "y"]));
}

#[test]
fn semicolon_inserted_after_line_break() {
    let value = dynamic::parse_script(&mut lexer("x \n y ; \n z"), None).unwrap();
    assert_eq!(value, script(&["x", "y", "z"]));
}

#[test]
fn semicolon_inserted_at_end() {
    let value = dynamic::parse_script(&mut lexer("x"), None).unwrap();
    assert_eq!(value, script(&["x"]));
}

#[test]
fn no_insertion_on_the_same_line() {
    assert_eq!(
        dynamic::parse_script(&mut lexer("x y"), None),
        Err(ParseError::SyntaxError)
    );
    assert_eq!(
        dynamic::parse_script(&mut lexer("x ; ;"), None),
        Err(ParseError::SyntaxError)
    );
}

#[test]
fn typed_recovers_through_error_token() {
    use typed::{
        concrete::{Script, Stmt},
        Token::*,
    };
    let ast = typed::parse_script(
        &typed::DefaultHandler,
        vec![
            Identifier("x".into()),
            Semicolon,
            Identifier("y".into()),
        ]
        .into_iter(),
    );
    let stmt = |name: &str| Box::new(Stmt::Statement(name.into()));
    assert_eq!(
        ast,
        Ok(Box::new(Script::Script(Box::new(Script::StatementListP1(
            Box::new(Script::StatementListP0(stmt("x"))),
            stmt("y"),
        )))))
    );

    assert_eq!(
        typed::parse_script(&typed::DefaultHandler, vec![Semicolon].into_iter()),
        Err(ParseError::SyntaxError)
    );
}
