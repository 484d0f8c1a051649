use std::fmt;

/// Render through `f` wherever a `Display` value is expected.
///
/// Grammar and state dumps use this to print borrowed pieces (a body, a
/// follow set) without building intermediate strings.
pub fn display_fn<F>(f: F) -> impl fmt::Display
where
    F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    struct Rendered<F>(F);

    impl<F> fmt::Display for Rendered<F>
    where
        F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
    {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            (self.0)(f)
        }
    }

    Rendered(f)
}

/// Write `items` separated by `sep`.
pub fn write_separated<I, T>(f: &mut fmt::Formatter<'_>, sep: &str, items: I) -> fmt::Result
where
    I: IntoIterator<Item = T>,
    T: fmt::Display,
{
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Whether `s` is a valid identifier (XID_Start/`_` followed by XID_Continue).
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(ch) if ch == '_' || unicode_ident::is_xid_start(ch) => {}
        _ => return false,
    }
    chars.all(unicode_ident::is_xid_continue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_lists() {
        let items = ["expr", "\"+\"", "term"];
        let body = display_fn(|f| write_separated(f, " ", &items));
        assert_eq!(body.to_string(), "expr \"+\" term");
        assert_eq!(format!("[{}]", body), "[expr \"+\" term]");
        assert_eq!(display_fn(|f| write_separated(f, ", ", None::<&str>)).to_string(), "");
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("Expression"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("nt2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2nt"));
        assert!(!is_identifier("Expression 0"));
        assert!(!is_identifier("a-b"));
    }
}
