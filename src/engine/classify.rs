use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref MUTATION: Regex =
        Regex::new(r"(?i)^(insert|delete|update|replace|truncate|drop|create|alter)\b")
            .expect("valid mutation regex");
    static ref TRANSACTION: Regex =
        Regex::new(r"(?i)^(begin|start\s+transaction|commit|rollback|savepoint|release|set\s+transaction)\b")
            .expect("valid transaction regex");
    static ref TRANSACTION_OPEN: Regex =
        Regex::new(r"(?i)^(begin|start\s+transaction)\b").expect("valid open regex");
    static ref TRANSACTION_CLOSE: Regex =
        Regex::new(r"(?i)^(commit|rollback)\b").expect("valid close regex");
    static ref ROLLBACK_TO_SAVEPOINT: Regex =
        Regex::new(r"(?i)^rollback(\s+(work|transaction))?\s+to\b").expect("valid savepoint regex");
}

/// How the engine runs a statement, decided by its leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Row-returning; materialized into a result set.
    Read,
    /// Reports rows affected. `returns_id` for `INSERT` / `REPLACE`.
    Mutation { returns_id: bool },
    /// Transaction control; executed, never cached.
    Transaction,
}

impl StatementKind {
    /// Classify already-trimmed SQL.
    #[must_use]
    pub fn classify(sql: &str) -> Self {
        if let Some(m) = MUTATION.captures(sql).and_then(|c| c.get(1)) {
            let keyword = m.as_str();
            return StatementKind::Mutation {
                returns_id: keyword.eq_ignore_ascii_case("insert")
                    || keyword.eq_ignore_ascii_case("replace"),
            };
        }
        if TRANSACTION.is_match(sql) {
            return StatementKind::Transaction;
        }
        StatementKind::Read
    }

    #[must_use]
    pub fn is_mutation(self) -> bool {
        matches!(self, StatementKind::Mutation { .. })
    }
}

/// `Some(true)` when a transaction-control statement opens a transaction,
/// `Some(false)` when it ends one, `None` for savepoints and the like.
#[must_use]
pub(crate) fn transaction_effect(sql: &str) -> Option<bool> {
    if TRANSACTION_OPEN.is_match(sql) {
        Some(true)
    } else if TRANSACTION_CLOSE.is_match(sql) && !ROLLBACK_TO_SAVEPOINT.is_match(sql) {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_keyword_decides() {
        assert_eq!(
            StatementKind::classify("INSERT INTO t VALUES (1)"),
            StatementKind::Mutation { returns_id: true }
        );
        assert_eq!(
            StatementKind::classify("replace into t values (1)"),
            StatementKind::Mutation { returns_id: true }
        );
        for sql in ["Update t set a = 1", "DELETE FROM t", "truncate table t", "drop table t",
            "CREATE TABLE t (a INT)", "alter table t add b int"]
        {
            assert_eq!(
                StatementKind::classify(sql),
                StatementKind::Mutation { returns_id: false },
                "{sql}"
            );
        }
    }

    #[test]
    fn reads_and_transactions() {
        assert_eq!(StatementKind::classify("SELECT 1"), StatementKind::Read);
        assert_eq!(StatementKind::classify("with x as (select 1) select * from x"), StatementKind::Read);
        // keyword must be a whole word
        assert_eq!(StatementKind::classify("inserted_rows"), StatementKind::Read);
        assert_eq!(StatementKind::classify("BEGIN"), StatementKind::Transaction);
        assert_eq!(StatementKind::classify("START TRANSACTION"), StatementKind::Transaction);
        assert_eq!(StatementKind::classify("rollback transaction"), StatementKind::Transaction);
    }

    #[test]
    fn transaction_boundaries() {
        assert_eq!(transaction_effect("BEGIN"), Some(true));
        assert_eq!(transaction_effect("begin transaction"), Some(true));
        assert_eq!(transaction_effect("START TRANSACTION"), Some(true));
        assert_eq!(transaction_effect("COMMIT TRANSACTION"), Some(false));
        assert_eq!(transaction_effect("rollback"), Some(false));
        assert_eq!(transaction_effect("ROLLBACK TO SAVEPOINT s1"), None);
        assert_eq!(transaction_effect("rollback work to s1"), None);
        assert_eq!(transaction_effect("SAVEPOINT s1"), None);
        assert_eq!(transaction_effect("RELEASE SAVEPOINT s1"), None);
    }
}
