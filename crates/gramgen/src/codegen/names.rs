//! Identifier spelling for generated code.

use super::CodegenError;
use crate::{
    grammar::{ArgValue, Nt, NtName},
    states::Term,
    types::Map,
    util::is_identifier,
};
use regex::Regex;

/// Converts grammar names to Rust identifiers.
#[derive(Debug, Clone)]
pub struct CaseConverter {
    word: Regex,
    hump: Regex,
}

impl Default for CaseConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl CaseConverter {
    pub fn new() -> Self {
        Self {
            word: Regex::new(r"([^_])([A-Z][a-z]+)").unwrap_or_else(|e| unreachable!("{}", e)),
            hump: Regex::new(r"([a-z0-9])([A-Z])").unwrap_or_else(|e| unreachable!("{}", e)),
        }
    }

    /// `IfStatement` -> `if_statement`, `HTMLComment` -> `html_comment`.
    pub fn to_snake(&self, name: &str) -> String {
        let name = self.word.replace_all(name, "${1}_${2}");
        let name = self.hump.replace_all(&name, "${1}_${2}");
        name.to_lowercase()
    }

    /// `if_statement` -> `IfStatement`. Names without underscores only get
    /// their first letter capitalized.
    pub fn to_camel(&self, name: &str) -> String {
        name.split('_').filter(|part| !part.is_empty()).map(capitalize).collect()
    }

    /// The CamelCase spelling of a nonterminal identity.
    ///
    /// Arguments bound to `true` contribute their parameter name, arguments
    /// bound to `false` contribute nothing.
    pub fn nt_to_camel(&self, nt: &Nt) -> String {
        let mut out = match &nt.name {
            NtName::Plain(name) => self.to_camel(name),
            NtName::Init(goal) => format!("Start{}", self.nt_to_camel(goal)),
        };
        for (param, value) in &nt.args {
            match value {
                ArgValue::Bool(true) => out += &self.to_camel(param),
                ArgValue::Bool(false) => {}
                ArgValue::Var(..) => {
                    out += &self.to_camel(param);
                    out += "Param";
                }
            }
        }
        out
    }

    /// The snake_case spelling of a nonterminal identity, for use as part
    /// of a longer identifier.
    pub fn nt_to_snake(&self, nt: &Nt) -> String {
        let mut out = match &nt.name {
            NtName::Plain(name) => self.to_snake(name),
            NtName::Init(goal) => format!("start_{}", self.nt_to_snake(goal)),
        };
        for (param, value) in &nt.args {
            match value {
                ArgValue::Bool(true) => {
                    out.push('_');
                    out += &self.to_snake(param);
                }
                ArgValue::Bool(false) => {}
                ArgValue::Var(..) => {
                    out.push('_');
                    out += &self.to_snake(param);
                    out += "_param";
                }
            }
        }
        out
    }

    /// The variant name of a terminal.
    pub fn terminal_name(&self, term: &Term) -> String {
        match term {
            Term::End => "End".into(),
            Term::ErrorToken => "ErrorToken".into(),
            Term::Terminal(t) if t == "=>" => "Arrow".into(),
            Term::Terminal(t) if is_identifier(t) => {
                escape_keyword(self.to_camel(&self.to_snake(t)))
            }
            Term::Terminal(t) => t.chars().map(char_name).collect(),
        }
    }

    /// The Rust name of a builder method. `"Statement 2"` becomes
    /// `statement_p2`.
    pub fn method_name(&self, method: &str) -> String {
        let name = match method.split_once(' ') {
            Some((base, n)) => format!("{}_p{}", self.to_snake(base), n),
            None => self.to_snake(method),
        };
        escape_keyword(name)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "Self", "static", "struct", "super", "trait", "true", "try", "type",
    "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Make `name` usable as an identifier even if it is a keyword.
pub(super) fn escape_keyword(name: String) -> String {
    if !KEYWORDS.contains(&&*name) {
        return name;
    }
    match &*name {
        // not allowed as raw identifiers
        "self" | "Self" | "super" | "crate" => name + "_",
        _ => format!("r#{}", name),
    }
}

fn char_name(ch: char) -> String {
    const DIGITS: [&str; 10] = [
        "Zero", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine",
    ];
    let name = match ch {
        '!' => "ExclamationMark",
        '"' => "QuotationMark",
        '#' => "NumberSign",
        '$' => "DollarSign",
        '%' => "PercentSign",
        '&' => "Ampersand",
        '\'' => "Apostrophe",
        '(' => "LeftParenthesis",
        ')' => "RightParenthesis",
        '*' => "Asterisk",
        '+' => "PlusSign",
        ',' => "Comma",
        '-' => "HyphenMinus",
        '.' => "FullStop",
        '/' => "Solidus",
        ':' => "Colon",
        ';' => "Semicolon",
        '<' => "LessThanSign",
        '=' => "EqualsSign",
        '>' => "GreaterThanSign",
        '?' => "QuestionMark",
        '@' => "CommercialAt",
        '[' => "LeftSquareBracket",
        '\\' => "ReverseSolidus",
        ']' => "RightSquareBracket",
        '^' => "CircumflexAccent",
        '_' => "LowLine",
        '`' => "GraveAccent",
        '{' => "LeftCurlyBracket",
        '|' => "VerticalLine",
        '}' => "RightCurlyBracket",
        '~' => "Tilde",
        ' ' => "Space",
        '0'..='9' => return format!("Digit{}", DIGITS[ch as usize - '0' as usize]),
        'a'..='z' => return format!("LatinSmallLetter{}", ch.to_ascii_uppercase()),
        'A'..='Z' => return format!("LatinCapitalLetter{}", ch),
        _ => return format!("U{:04X}", ch as u32),
    };
    name.into()
}

/// The generated identifiers of one namespace.
#[derive(Debug, Default)]
pub(super) struct Spellings {
    seen: Map<String, String>,
}

impl Spellings {
    /// Record that `name` is spelled `spelling`, failing if a different
    /// name already took that spelling.
    pub(super) fn claim(&mut self, name: String, spelling: &str) -> Result<(), CodegenError> {
        match self.seen.get(spelling) {
            Some(first) if *first != name => Err(CodegenError::AmbiguousIdentifierSpelling {
                first: first.clone(),
                second: name,
                spelling: spelling.into(),
            }),
            Some(..) => Ok(()),
            None => {
                self.seen.insert(spelling.into(), name);
                Ok(())
            }
        }
    }
}
