#[derive(Clone, Copy)]
pub(super) enum State<'a> {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Backticked,
    LineComment,
    BlockComment(u32),
    /// Inside `$tag$ ... $tag$`; holds the tag.
    DollarQuoted(&'a str),
}

/// Whether `pattern` occurs at `idx`.
pub(super) fn at(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    bytes.get(idx..idx + pattern.len()) == Some(pattern)
}

/// Opening `$tag$` at `start`: the tag and the index of its closing `$`.
///
/// Tags are identifier characters and may be empty (`$$`). A digit after the
/// `$` makes it a positional parameter instead.
pub(super) fn dollar_tag(sql: &str, start: usize) -> Option<(&str, usize)> {
    let rest = sql.get(start + 1..)?;
    let len = rest.find('$')?;
    let tag = &rest[..len];
    if tag.starts_with(|c: char| c.is_ascii_digit())
        || !tag.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
    {
        return None;
    }
    Some((tag, start + 1 + len))
}

/// Closing `$tag$` at `idx`.
pub(super) fn closes_dollar_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    at(bytes, idx, b"$") && at(bytes, idx + 1, tag.as_bytes()) && at(bytes, idx + 1 + tag.len(), b"$")
}

pub(super) fn scan_digits(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let mut idx = start;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    if idx == start {
        None
    } else {
        std::str::from_utf8(&bytes[start..idx])
            .ok()
            .map(|digits| (idx, digits))
    }
}

/// Output buffer that is only allocated once the first rewrite happens.
pub(super) struct Rewriter<'a> {
    sql: &'a str,
    out: Option<String>,
    copied_to: usize,
}

impl<'a> Rewriter<'a> {
    pub(super) fn new(sql: &'a str) -> Self {
        Self {
            sql,
            out: None,
            copied_to: 0,
        }
    }

    /// Replace `sql[start..end]` with `replacement`.
    pub(super) fn replace(&mut self, start: usize, end: usize, replacement: &str) {
        let sql = self.sql;
        let buf = self
            .out
            .get_or_insert_with(|| String::with_capacity(sql.len() + 16));
        buf.push_str(&sql[self.copied_to..start]);
        buf.push_str(replacement);
        self.copied_to = end;
    }

    pub(super) fn finish(self) -> std::borrow::Cow<'a, str> {
        match self.out {
            Some(mut buf) => {
                buf.push_str(&self.sql[self.copied_to..]);
                std::borrow::Cow::Owned(buf)
            }
            None => std::borrow::Cow::Borrowed(self.sql),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_tags() {
        assert_eq!(dollar_tag("$$ body $$", 0), Some(("", 1)));
        assert_eq!(dollar_tag("x $fn_1$ body", 2), Some(("fn_1", 7)));
        assert_eq!(dollar_tag("$1 AND $2", 0), None);
        assert_eq!(dollar_tag("$a b$", 0), None);
        assert_eq!(dollar_tag("$open", 0), None);
        assert!(closes_dollar_tag(b"x $fn$", 2, "fn"));
        assert!(!closes_dollar_tag(b"x $fn", 2, "fn"));
    }

    #[test]
    fn rewriter_copies_untouched_text() {
        let mut out = Rewriter::new("SELECT `a` FROM t");
        out.replace(7, 8, "[");
        out.replace(9, 10, "]");
        assert_eq!(out.finish(), "SELECT [a] FROM t");
        assert!(matches!(
            Rewriter::new("SELECT 1").finish(),
            std::borrow::Cow::Borrowed(_)
        ));
        assert!(at(b"-- c", 0, b"--"));
        assert!(!at(b"-", 0, b"--"));
    }
}
