//! Best-effort SQL dialect rewriting.
//!
//! Nothing here parses SQL. A small state machine skips string literals,
//! quoted identifiers, comments and dollar-quoted bodies so that rewrites only
//! touch plain SQL text; the `LIMIT`/`NOW()` rewrites are regex heuristics on
//! top of that and will get complex statements wrong.
use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;

mod scanner;

use scanner::{Rewriter, State, at, closes_dollar_tag, dollar_tag, scan_digits};

use crate::types::PlaceholderStyle;

lazy_static! {
    static ref LIMIT_TO_TOP: Regex =
        Regex::new(r"(?is)^(\s*SELECT\s+)(DISTINCT\s+)?(.*?)\s+LIMIT\s+(\d+)\s*(;?)\s*$")
            .expect("valid LIMIT regex");
    static ref NOW_CALL: Regex = Regex::new(r"(?i)\bNOW\(\s*\)").expect("valid NOW regex");
    static ref IFNULL_CALL: Regex = Regex::new(r"(?i)\bIFNULL\s*\(").expect("valid IFNULL regex");
}

#[derive(Debug, Clone, Copy, Default)]
struct Rewrites {
    placeholders: Option<PlaceholderStyle>,
    backticks_to_brackets: bool,
    backslash_escapes: bool,
}

/// Rewrite placeholders to the `target` style.
///
/// Recognizes bare `?` (numbered left to right), `?N` and `$N`. Text inside
/// literals, quoted identifiers, comments and dollar-quoted blocks is left alone.
/// Returns a borrowed `Cow` when nothing changed.
///
/// ```rust
/// use sql_dbal::conversion::translate_placeholders;
/// use sql_dbal::prelude::*;
///
/// let sql = translate_placeholders("SELECT * FROM t WHERE a = ? AND b = '?'", PlaceholderStyle::Dollar);
/// assert_eq!(sql, "SELECT * FROM t WHERE a = $1 AND b = '?'");
/// ```
#[must_use]
pub fn translate_placeholders(sql: &str, target: PlaceholderStyle) -> Cow<'_, str> {
    rewrite(
        sql,
        Rewrites {
            placeholders: Some(target),
            ..Rewrites::default()
        },
    )
}

/// Convert `MySQL` flavoured SQL into something SQL Server will accept.
///
/// Backtick identifiers become `[bracketed]`, `?` placeholders become `@PN`,
/// `NOW()` becomes `GETDATE()`, `IFNULL(` becomes `ISNULL(` and a trailing
/// `LIMIT n` on a plain `SELECT` becomes `SELECT TOP n`. `LIMIT offset, n` is
/// left untouched.
#[must_use]
pub fn mysql_to_mssql(sql: &str) -> Cow<'_, str> {
    let scanned = rewrite(
        sql,
        Rewrites {
            placeholders: Some(PlaceholderStyle::AtP),
            backticks_to_brackets: true,
            backslash_escapes: true,
        },
    );

    let mut converted = scanned.into_owned();
    if let Cow::Owned(s) = NOW_CALL.replace_all(&converted, "GETDATE()") {
        converted = s;
    }
    if let Cow::Owned(s) = IFNULL_CALL.replace_all(&converted, "ISNULL(") {
        converted = s;
    }
    if let Cow::Owned(s) = LIMIT_TO_TOP.replace(&converted, "${1}${2}TOP $4 $3$5") {
        converted = s;
    }

    if converted == sql {
        Cow::Borrowed(sql)
    } else {
        Cow::Owned(converted)
    }
}

fn rewrite(sql: &str, rewrites: Rewrites) -> Cow<'_, str> {
    let mut out = Rewriter::new(sql);
    let mut state = State::Normal;
    let mut next_param = 1usize;
    let mut idx = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'`' => {
                    state = State::Backticked;
                    if rewrites.backticks_to_brackets {
                        out.replace(idx, idx + 1, "[");
                    }
                }
                _ if at(bytes, idx, b"--") => state = State::LineComment,
                _ if at(bytes, idx, b"/*") => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' => {
                    if let Some((tag, close)) = dollar_tag(sql, idx) {
                        state = State::DollarQuoted(tag);
                        idx = close;
                    } else if let Some(target) = rewrites.placeholders
                        && let Some((digits_end, digits)) = scan_digits(bytes, idx + 1)
                        && let Ok(n) = digits.parse::<usize>()
                    {
                        out.replace(idx, digits_end, &target.render(n));
                        next_param = next_param.max(n + 1);
                        idx = digits_end - 1;
                    }
                }
                b'?' => {
                    if let Some(target) = rewrites.placeholders {
                        match scan_digits(bytes, idx + 1) {
                            Some((digits_end, digits)) => {
                                if let Ok(n) = digits.parse::<usize>() {
                                    out.replace(idx, digits_end, &target.render(n));
                                    next_param = next_param.max(n + 1);
                                }
                                idx = digits_end - 1;
                            }
                            None => {
                                out.replace(idx, idx + 1, &target.render(next_param));
                                next_param += 1;
                            }
                        }
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\\' && rewrites.backslash_escapes {
                    idx += 1;
                } else if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Backticked => {
                if b == b'`' {
                    state = State::Normal;
                    if rewrites.backticks_to_brackets {
                        out.replace(idx, idx + 1, "]");
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if at(bytes, idx, b"/*") {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if at(bytes, idx, b"*/") {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(tag) => {
                if closes_dollar_tag(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    out.finish()
}
