//! Reading rendered production bodies back into elements.

use super::{ArgValue, Element, Grammar, GrammarError, LookaheadRule, Nt, RecoveryCode};
use crate::types::Set;

impl Grammar {
    /// Parse a body in the notation produced by [`Grammar::body_to_str`].
    ///
    /// Quoted strings are terminals, bare names are variable terminals or
    /// parameterless nonterminals, `Name[+a, ~b, ?c]` applies a nonterminal,
    /// and a trailing `?` makes the preceding element optional. Lookahead
    /// restrictions, `[no LineTerminator here]` and the error symbols are
    /// accepted too.
    pub fn parse_body(&self, text: &str) -> Result<Vec<Element>, GrammarError> {
        let text = text.trim();
        if text == "[empty]" {
            return Ok(vec![]);
        }
        let mut scanner = Scanner { text, pos: 0 };
        let mut raw = vec![];
        while let Some(e) = scanner.element()? {
            raw.push(e);
        }

        let mut vars = vec![];
        raw.iter().for_each(|e| collect_vars(e, &mut vars));
        let mut used = Set::default();
        let body = self.resolve_body(&raw, &vars, &mut used)?;
        if let Some(t) = used.iter().find(|t| !self.terminals.contains(*t)) {
            return Err(format!("unknown terminal {:?} in {:?}", t, text).into());
        }
        Ok(body)
    }
}

fn collect_vars(e: &Element, vars: &mut Vec<String>) {
    match e {
        Element::Nt(nt) => {
            for (_, value) in &nt.args {
                if let ArgValue::Var(var) = value {
                    if !vars.contains(var) {
                        vars.push(var.clone());
                    }
                }
            }
        }
        Element::Optional(inner) => collect_vars(inner, vars),
        _ => {}
    }
}

struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().map_or(false, char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, s: &str) -> Result<(), GrammarError> {
        self.skip_ws();
        if self.eat(s) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {:?}", s)))
        }
    }

    fn error(&self, what: &str) -> GrammarError {
        format!("{} at offset {} of {:?}", what, self.pos, self.text).into()
    }

    fn element(&mut self) -> Result<Option<Element>, GrammarError> {
        self.skip_ws();
        let ch = match self.peek() {
            Some(ch) => ch,
            None => return Ok(None),
        };
        let mut e = if ch == '"' {
            Element::Terminal(self.quoted()?)
        } else if self.eat("[no LineTerminator here]") {
            Element::NoLineTerminatorHere
        } else if self.eat("[lookahead ") {
            self.lookahead()?
        } else if ch == '_' || unicode_ident::is_xid_start(ch) {
            let name = self.ident();
            match name {
                "ErrorToken" => Element::ErrorToken,
                "ErrorSymbol" => {
                    self.expect("(")?;
                    let code = match self.ident() {
                        "asi" => RecoveryCode::Asi,
                        "do_while_asi" => RecoveryCode::DoWhileAsi,
                        _ => return Err(self.error("unknown recovery code")),
                    };
                    self.expect(")")?;
                    Element::ErrorSymbol(code)
                }
                _ if self.peek() == Some('[') => {
                    self.bump();
                    Element::nt(Nt::with_args(name, self.args()?))
                }
                _ => Element::Terminal(name.to_owned()),
            }
        } else {
            return Err(self.error(&format!("unexpected character {:?}", ch)));
        };
        if self.eat("?") {
            e = Element::optional(e);
        }
        Ok(Some(e))
    }

    fn ident(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == '_' || unicode_ident::is_xid_continue(ch) {
                self.bump();
            } else {
                break;
            }
        }
        &self.text[start..self.pos]
    }

    /// The argument list after `[`, through the closing `]`.
    fn args(&mut self) -> Result<Vec<(String, ArgValue)>, GrammarError> {
        let mut args = vec![];
        loop {
            self.skip_ws();
            let arg = match self.bump() {
                Some('+') => {
                    let name = self.ident().to_owned();
                    (name, ArgValue::Bool(true))
                }
                Some('~') => {
                    let name = self.ident().to_owned();
                    (name, ArgValue::Bool(false))
                }
                Some('?') => {
                    let name = self.ident().to_owned();
                    (name.clone(), ArgValue::Var(name))
                }
                Some(ch) if ch == '_' || unicode_ident::is_xid_start(ch) => {
                    self.pos -= ch.len_utf8();
                    let name = self.ident().to_owned();
                    self.expect("=")?;
                    self.skip_ws();
                    let var = self.ident().to_owned();
                    (name, ArgValue::Var(var))
                }
                _ => return Err(self.error("malformed argument list")),
            };
            if arg.0.is_empty() {
                return Err(self.error("missing parameter name"));
            }
            args.push(arg);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(args),
                _ => return Err(self.error("expected ',' or ']'")),
            }
        }
    }

    /// The rest of a lookahead restriction after `[lookahead `.
    fn lookahead(&mut self) -> Result<Element, GrammarError> {
        let (positive, multi) = if self.eat("==") {
            (true, false)
        } else if self.eat("!=") {
            (false, false)
        } else if self.eat("in") {
            (true, true)
        } else if self.eat("not in") {
            (false, true)
        } else {
            return Err(self.error("unknown lookahead operator"));
        };
        let mut set = vec![];
        if multi {
            self.expect("{")?;
            loop {
                self.skip_ws();
                if self.eat("}") {
                    break;
                }
                set.push(self.quoted()?);
                self.skip_ws();
                self.eat(",");
            }
        } else {
            self.skip_ws();
            set.push(self.quoted()?);
        }
        self.expect("]")?;
        Ok(Element::Lookahead(LookaheadRule::new(set, positive).into()))
    }

    /// A double-quoted string with Rust-style escapes.
    fn quoted(&mut self) -> Result<String, GrammarError> {
        if !self.eat("\"") {
            return Err(self.error("expected a quoted terminal"));
        }
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('"') => return Ok(out),
                Some('\\') => {
                    let ch = match self.bump() {
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some('0') => '\0',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some('\'') => '\'',
                        Some('u') => self.unicode_escape()?,
                        _ => return Err(self.error("unknown escape sequence")),
                    };
                    out.push(ch);
                }
                Some(ch) => out.push(ch),
            }
        }
    }

    fn unicode_escape(&mut self) -> Result<char, GrammarError> {
        if !self.eat("{") {
            return Err(self.error("expected '{' after \\u"));
        }
        let start = self.pos;
        while self.peek().map_or(false, |ch| ch.is_ascii_hexdigit()) {
            self.bump();
        }
        let digits = &self.text[start..self.pos];
        let ch = u32::from_str_radix(digits, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error("invalid unicode escape"))?;
        if !self.eat("}") {
            return Err(self.error("expected '}'"));
        }
        Ok(ch)
    }
}
