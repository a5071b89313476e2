use super::Binder;
use crate::error::SqlDbalError;
use crate::types::RowValues;

/// A single column condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: String,
        op: &'static str,
        value: RowValues,
    },
    Between {
        column: String,
        low: RowValues,
        high: RowValues,
        negated: bool,
    },
    InList {
        column: String,
        values: Vec<RowValues>,
        negated: bool,
    },
    Null {
        column: String,
        negated: bool,
    },
}

fn compare(column: &str, op: &'static str, value: impl Into<RowValues>) -> Predicate {
    Predicate::Compare {
        column: column.to_string(),
        op,
        value: value.into(),
    }
}

/// `column = value`
pub fn eq(column: &str, value: impl Into<RowValues>) -> Predicate {
    compare(column, "=", value)
}

/// `column <> value`
pub fn neq(column: &str, value: impl Into<RowValues>) -> Predicate {
    compare(column, "<>", value)
}

pub fn lt(column: &str, value: impl Into<RowValues>) -> Predicate {
    compare(column, "<", value)
}

pub fn lte(column: &str, value: impl Into<RowValues>) -> Predicate {
    compare(column, "<=", value)
}

pub fn gt(column: &str, value: impl Into<RowValues>) -> Predicate {
    compare(column, ">", value)
}

pub fn gte(column: &str, value: impl Into<RowValues>) -> Predicate {
    compare(column, ">=", value)
}

pub fn like(column: &str, pattern: impl Into<RowValues>) -> Predicate {
    compare(column, "LIKE", pattern)
}

pub fn not_like(column: &str, pattern: impl Into<RowValues>) -> Predicate {
    compare(column, "NOT LIKE", pattern)
}

pub fn between(column: &str, low: impl Into<RowValues>, high: impl Into<RowValues>) -> Predicate {
    Predicate::Between {
        column: column.to_string(),
        low: low.into(),
        high: high.into(),
        negated: false,
    }
}

pub fn not_between(
    column: &str,
    low: impl Into<RowValues>,
    high: impl Into<RowValues>,
) -> Predicate {
    Predicate::Between {
        column: column.to_string(),
        low: low.into(),
        high: high.into(),
        negated: true,
    }
}

/// `column IN (...)`. An empty list is rejected when the clause is rendered.
pub fn in_list<V: Into<RowValues>>(column: &str, values: impl IntoIterator<Item = V>) -> Predicate {
    Predicate::InList {
        column: column.to_string(),
        values: values.into_iter().map(Into::into).collect(),
        negated: false,
    }
}

pub fn not_in<V: Into<RowValues>>(column: &str, values: impl IntoIterator<Item = V>) -> Predicate {
    Predicate::InList {
        column: column.to_string(),
        values: values.into_iter().map(Into::into).collect(),
        negated: true,
    }
}

pub fn is_null(column: &str) -> Predicate {
    Predicate::Null {
        column: column.to_string(),
        negated: false,
    }
}

pub fn is_not_null(column: &str) -> Predicate {
    Predicate::Null {
        column: column.to_string(),
        negated: true,
    }
}

impl Predicate {
    fn render(&self, binder: &mut Binder) -> Result<String, SqlDbalError> {
        Ok(match self {
            Predicate::Compare { column, op, value } => {
                // `= NULL` never matches; spell it the way the caller meant it
                if value.is_null() && (*op == "=" || *op == "<>") {
                    let not = if *op == "<>" { " NOT" } else { "" };
                    format!("{column} IS{not} NULL")
                } else {
                    format!("{column} {op} {}", binder.bind(value))
                }
            }
            Predicate::Between {
                column,
                low,
                high,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                let low = binder.bind(low);
                let high = binder.bind(high);
                format!("{column} {not}BETWEEN {low} AND {high}")
            }
            Predicate::InList {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return Err(SqlDbalError::ParameterError(format!(
                        "IN list for column {column} is empty"
                    )));
                }
                let not = if *negated { "NOT " } else { "" };
                let items: Vec<String> = values.iter().map(|v| binder.bind(v)).collect();
                format!("{column} {not}IN ({})", items.join(", "))
            }
            Predicate::Null { column, negated } => {
                let not = if *negated { " NOT" } else { "" };
                format!("{column} IS{not} NULL")
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conjunction {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
enum Term {
    Predicate(Predicate),
    Group(Where),
}

/// Predicates joined by `AND` / `OR`, left to right, with parenthesized groups.
///
/// The conjunction of the first term is ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Where {
    terms: Vec<(Conjunction, Term)>,
}

impl Where {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.terms.push((Conjunction::And, Term::Predicate(predicate)));
        self
    }

    #[must_use]
    pub fn or(mut self, predicate: Predicate) -> Self {
        self.terms.push((Conjunction::Or, Term::Predicate(predicate)));
        self
    }

    /// `AND ( group )`
    #[must_use]
    pub fn and_group(mut self, group: Where) -> Self {
        self.terms.push((Conjunction::And, Term::Group(group)));
        self
    }

    /// `OR ( group )`
    #[must_use]
    pub fn or_group(mut self, group: Where) -> Self {
        self.terms.push((Conjunction::Or, Term::Group(group)));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Render without the leading `WHERE`. Empty groups are skipped.
    pub(crate) fn render(&self, binder: &mut Binder) -> Result<String, SqlDbalError> {
        let mut sql = String::new();
        for (conjunction, term) in &self.terms {
            let fragment = match term {
                Term::Predicate(p) => p.render(binder)?,
                Term::Group(g) if g.is_empty() => continue,
                Term::Group(g) => format!("({})", g.render(binder)?),
            };
            if !sql.is_empty() {
                sql.push_str(match conjunction {
                    Conjunction::And => " AND ",
                    Conjunction::Or => " OR ",
                });
            }
            sql.push_str(&fragment);
        }
        Ok(sql)
    }
}

impl From<Predicate> for Where {
    fn from(predicate: Predicate) -> Self {
        Where::new().and(predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::QueryBuilder;
    use crate::types::DatabaseType;

    fn render(db: DatabaseType, prepare: bool, w: &Where) -> (String, Vec<RowValues>) {
        let mut binder = QueryBuilder::new(db, prepare).binder();
        let sql = w.render(&mut binder).unwrap();
        let q = binder.finish(sql);
        (q.query, q.params)
    }

    #[test]
    fn groups_are_parenthesized() {
        let w = Where::new()
            .and(eq("a", 1))
            .or_group(Where::new().and(lt("b", 2)).and(is_null("c")));
        let (sql, params) = render(DatabaseType::Mysql, true, &w);
        assert_eq!(sql, "a = ? OR (b < ? AND c IS NULL)");
        assert_eq!(params, vec![RowValues::Int(1), RowValues::Int(2)]);
    }

    #[test]
    fn placeholders_follow_text_order() {
        let w = Where::new()
            .and(between("age", 18, 65))
            .and(not_in("id", [3, 4]))
            .or(like("name", "a%"));
        let (sql, params) = render(DatabaseType::Mssql, true, &w);
        assert_eq!(
            sql,
            "age BETWEEN @P1 AND @P2 AND id NOT IN (@P3, @P4) OR name LIKE @P5"
        );
        assert_eq!(params.len(), 5);
    }

    #[test]
    fn inline_mode_escapes_literals() {
        let w = Where::new()
            .and(eq("name", "O'Brien"))
            .and(neq("flag", true))
            .and(not_between("n", 1.5, 2.5));
        let (sql, params) = render(DatabaseType::Postgres, false, &w);
        assert_eq!(
            sql,
            "name = 'O''Brien' AND flag <> TRUE AND n NOT BETWEEN 1.5 AND 2.5"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn comparing_with_null_becomes_is_null() {
        let w = Where::new()
            .and(eq("a", RowValues::Null))
            .and(neq("b", RowValues::Null))
            .and(is_not_null("c"));
        let (sql, params) = render(DatabaseType::Sqlite, true, &w);
        assert_eq!(sql, "a IS NULL AND b IS NOT NULL AND c IS NOT NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn empty_in_list_is_an_error() {
        let w = Where::new().and(in_list::<i64>("id", []));
        let mut binder = QueryBuilder::new(DatabaseType::Mysql, true).binder();
        assert!(matches!(
            w.render(&mut binder),
            Err(SqlDbalError::ParameterError(_))
        ));
    }

    #[test]
    fn remaining_comparisons_render() {
        let w = Where::new()
            .and(lte("a", 1))
            .and(gte("b", 2))
            .and(gt("c", 3))
            .and(not_like("d", "x%"))
            .and(in_list("e", ["p", "q"]));
        let (sql, _) = render(DatabaseType::Oracle, true, &w);
        assert_eq!(
            sql,
            "a <= :1 AND b >= :2 AND c > :3 AND d NOT LIKE :4 AND e IN (:5, :6)"
        );
    }
}
