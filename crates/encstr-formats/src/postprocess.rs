//! Cleanup applied to decoded text
//!
//! Decoded strings may start with a grammar tag such as `[M]` or `[plur]`
//! that selects gender or number variants elsewhere in the client; it is
//! dropped here. Literal brackets are escaped in the tables as `[lbracket]`
//! and `[rbracket]`.

/// Leading grammar tags that are stripped
pub const GRAMMAR_TAGS: &[&str] = &[
    "M", "F", "N", "U", "P", "PM", "PF", "PN", "m", "u", "null", "proper", "plur", "sing",
];

/// Literal substitutions, applied in order after tag stripping
pub const SUBSTITUTIONS: &[(&str, &str)] = &[("[lbracket]", "["), ("[rbracket]", "]")];

/// Remove one leading grammar tag, if present.
pub fn strip_grammar_tag(text: &str) -> &str {
    let Some(rest) = text.strip_prefix('[') else {
        return text;
    };
    let Some(close) = rest.find(']') else {
        return text;
    };
    if GRAMMAR_TAGS.contains(&&rest[..close]) {
        &rest[close + 1..]
    } else {
        text
    }
}

/// Strip the grammar tag and apply the bracket substitutions.
pub fn process(text: &str) -> String {
    let mut out = strip_grammar_tag(text).to_string();
    for (pattern, replacement) in SUBSTITUTIONS {
        if out.contains(pattern) {
            out = out.replace(pattern, replacement);
        }
    }
    out
}
