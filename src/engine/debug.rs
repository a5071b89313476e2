use std::io::{self, Write};

use comfy_table::{Cell, Table, presets::UTF8_FULL};

use super::Database;
use crate::types::RowValues;

impl Database {
    /// Human-readable dump of the last statement and its result.
    #[must_use]
    pub fn debug(&self) -> String {
        let mut buf = Vec::new();
        // writing into a Vec cannot fail
        let _ = self.debug_to(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Write the [`debug`](Self::debug) dump to `out`.
    ///
    /// # Errors
    /// Returns any error from `out`.
    pub fn debug_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self.registry.last_error() {
            Some(err) => writeln!(out, "Last error: {err}")?,
            None => writeln!(out, "Last error: none")?,
        }
        match &self.last_query {
            Some(record) => {
                writeln!(out, "Query [{}]: {}", self.num_queries, record.normalized)?;
                writeln!(out, "Called from: {}", record.call_site)?;
            }
            None => writeln!(out, "Query: none")?,
        }
        writeln!(
            out,
            "Elapsed: {:?} (total {:?}){}",
            self.profiler.last_elapsed(),
            self.profiler.total(),
            if self.from_cache { " [cached]" } else { "" }
        )?;
        writeln!(out, "Rows affected: {}", self.rows_affected)?;
        if let Some(id) = self.insert_id {
            writeln!(out, "Insert id: {id}")?;
        }

        let columns = self.last_result.columns();
        if columns.is_empty() {
            writeln!(out, "No results")?;
            return Ok(());
        }

        let mut info = Table::new();
        info.load_preset(UTF8_FULL);
        info.set_header(["column", "type", "max length"]);
        for col in columns {
            info.add_row([
                Cell::new(&col.name),
                Cell::new(col.declared_type.as_deref().unwrap_or("")),
                Cell::new(col.max_length.map(|l| l.to_string()).unwrap_or_default()),
            ]);
        }
        writeln!(out, "{info}")?;

        let mut rows = Table::new();
        rows.load_preset(UTF8_FULL);
        rows.set_header(columns.iter().map(|c| Cell::new(&c.name)));
        for row in &self.last_result.results {
            rows.add_row(row.rows.iter().map(Cell::new));
        }
        writeln!(out, "{rows}")?;
        writeln!(out, "{} row(s)", self.last_result.len())
    }

    /// One value with its type, plus the statement it came from.
    #[must_use]
    pub fn vardump(&self, value: &RowValues) -> String {
        let kind = value.type_name();
        let query = self
            .last_query
            .as_ref()
            .map_or("none", |q| q.normalized.as_str());
        format!(
            "Value: {value}\nType: {kind}\nLast query [{}]: {query}\nRows: {}",
            self.num_queries,
            self.last_result.len()
        )
    }
}
