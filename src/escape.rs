//! String escaping and literal rendering per dialect.

use std::fmt::Write;

use crate::types::{DatabaseType, RowValues};

/// Escape `text` for use inside a single-quoted literal.
///
/// `MySQL` gets backslash escapes (the `mysql_real_escape_string` set); every
/// other dialect doubles single quotes.
#[must_use]
pub fn escape(db_type: DatabaseType, text: &str) -> String {
    if db_type.uses_backslash_escapes() {
        escape_backslash(text)
    } else {
        text.replace('\'', "''")
    }
}

/// Inverse of [`escape`].
#[must_use]
pub fn unescape(db_type: DatabaseType, text: &str) -> String {
    if db_type.uses_backslash_escapes() {
        unescape_backslash(text)
    } else {
        text.replace("''", "'")
    }
}

fn escape_backslash(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\x1a' => out.push_str("\\Z"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_backslash(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('\0'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('Z') => out.push('\x1a'),
            Some(other) => out.push(other),
            // trailing lone backslash
            None => out.push('\\'),
        }
    }
    out
}

/// Escaped text wrapped in single quotes.
#[must_use]
pub fn quote(db_type: DatabaseType, text: &str) -> String {
    format!("'{}'", escape(db_type, text))
}

/// Render a value as an inline SQL literal for `db_type`.
#[must_use]
pub fn literal(db_type: DatabaseType, value: &RowValues) -> String {
    match value {
        RowValues::Int(i) => i.to_string(),
        RowValues::Float(f) => f.to_string(),
        RowValues::Text(s) => quote(db_type, s),
        RowValues::Bool(b) => match db_type {
            DatabaseType::Postgres => String::from(if *b { "TRUE" } else { "FALSE" }),
            _ => i32::from(*b).to_string(),
        },
        RowValues::Timestamp(dt) => quote(db_type, &dt.format("%F %T%.f").to_string()),
        RowValues::Null => "NULL".to_string(),
        RowValues::JSON(v) => quote(db_type, &v.to_string()),
        RowValues::Blob(bytes) => blob_literal(db_type, bytes),
    }
}

fn blob_literal(db_type: DatabaseType, bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(hex, "{b:02X}");
    }
    match db_type {
        DatabaseType::Postgres => format!("'\\x{hex}'::bytea"),
        DatabaseType::Mssql | DatabaseType::Sybase => format!("0x{hex}"),
        DatabaseType::Oracle => format!("HEXTORAW('{hex}')"),
        DatabaseType::Mysql | DatabaseType::Sqlite => format!("X'{hex}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "plain",
        "O'Brien",
        "it''s",
        r"C:\temp\new",
        "say \"hi\"",
        "line1\nline2\r\n",
        "nul\0byte",
        "ctrl-z\x1a",
        "trailing\\",
        "",
    ];

    #[test]
    fn unescape_inverts_escape_for_every_dialect() {
        for db in [DatabaseType::Mysql, DatabaseType::Postgres, DatabaseType::Mssql] {
            for s in SAMPLES {
                let escaped = escape(db, s);
                assert_eq!(unescape(db, &escaped), *s, "{db:?} {s:?}");
                // escaping is stable across an unescape of its own output
                assert_eq!(escape(db, &unescape(db, &escaped)), escaped);
            }
        }
    }

    #[test]
    fn mysql_uses_backslashes() {
        assert_eq!(escape(DatabaseType::Mysql, "a'b\\c\n"), "a\\'b\\\\c\\n");
        assert_eq!(escape(DatabaseType::Sqlite, "a'b\\c"), "a''b\\c");
    }

    #[test]
    fn literals_per_dialect() {
        assert_eq!(literal(DatabaseType::Postgres, &RowValues::Bool(true)), "TRUE");
        assert_eq!(literal(DatabaseType::Mysql, &RowValues::Bool(true)), "1");
        assert_eq!(literal(DatabaseType::Sqlite, &RowValues::Null), "NULL");
        assert_eq!(
            literal(DatabaseType::Sqlite, &RowValues::Text("x'y".into())),
            "'x''y'"
        );
        assert_eq!(
            literal(DatabaseType::Mssql, &RowValues::Blob(vec![0xde, 0xad])),
            "0xDEAD"
        );
    }
}
