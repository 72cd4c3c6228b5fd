//! Identifier helpers: labels for the UI, id-suffix stripping and pluralization for relation inference.

use regex::Regex;
use std::sync::OnceLock;

fn id_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?P<base>.+?)(?:_id|_ID|Id)$").expect("static regex"))
}

/// Convert a single identifier from camelCase to snake_case.
/// e.g. "userId" -> "user_id", "createdAt" -> "created_at"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev: Option<char> = None;
    for c in s.chars() {
        if c.is_uppercase() {
            if prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

/// Human label from an identifier: "blog_posts" -> "Blog Posts", "userProfiles" -> "User Profiles".
pub fn to_title_case(s: &str) -> String {
    to_snake_case(s)
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Base name of a foreign-key style column: "author_id" -> "author", "authorId" -> "author".
/// Returns None when the column carries no id suffix (including a bare "id").
pub fn strip_id_suffix(column: &str) -> Option<&str> {
    id_suffix()
        .captures(column)
        .and_then(|c| c.name("base"))
        .map(|m| m.as_str().trim_end_matches('_'))
        .filter(|base| !base.is_empty())
}

/// Naive English plural, enough to match `user` against a `users` table.
pub fn pluralize(word: &str) -> String {
    let lower = word.to_lowercase();
    if lower.ends_with('y')
        && !matches!(lower.chars().rev().nth(1), Some('a' | 'e' | 'i' | 'o' | 'u'))
        && word.len() > 1
    {
        format!("{}ies", &word[..word.len() - 1])
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| lower.ends_with(suffix)) {
        format!("{}es", word)
    } else {
        format!("{}s", word)
    }
}
