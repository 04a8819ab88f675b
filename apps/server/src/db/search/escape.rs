//! LIKE pattern helpers.
//!
//! User input is always matched literally: `\`, `%` and `_` are escaped with
//! `\` and the rendered SQL declares the escape character.

pub(crate) fn escape_like_pattern(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' | '%' | '_' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

pub(crate) fn contains_pattern(s: &str) -> String {
    format!("%{}%", escape_like_pattern(s))
}

pub(crate) fn prefix_pattern(s: &str) -> String {
    format!("{}%", escape_like_pattern(s))
}

pub(crate) fn suffix_pattern(s: &str) -> String {
    format!("%{}", escape_like_pattern(s))
}
