use crate::warehouse::pool::{quote_ident, quote_literal};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static BACKTICK_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("valid backtick path pattern"));

/// Translates BigQuery-style table references into DuckDB identifiers.
///
/// `` `p.d.t` `` becomes `"p"."d"."t"`, and a dataset-scoped
/// `` `p.d.INFORMATION_SCHEMA.COLUMNS` `` view becomes an aliased sub-select over
/// `information_schema.columns` restricted to that catalog and schema.
pub fn to_duckdb(sql: &str) -> String {
    BACKTICK_PATH
        .replace_all(sql, |caps: &Captures| {
            let parts: Vec<&str> = caps[1].split('.').map(str::trim).collect();
            rewrite_path(&parts)
        })
        .into_owned()
}

fn rewrite_path(parts: &[&str]) -> String {
    if parts.len() >= 4
        && parts[parts.len() - 2].eq_ignore_ascii_case("information_schema")
        && parts[parts.len() - 1].eq_ignore_ascii_case("columns")
    {
        let catalog = parts[parts.len() - 4];
        let schema = parts[parts.len() - 3];
        return format!(
            "(SELECT * FROM information_schema.columns WHERE table_catalog = {} AND table_schema = {}) AS columns",
            quote_literal(catalog),
            quote_literal(schema)
        );
    }

    parts
        .iter()
        .map(|p| quote_ident(p))
        .collect::<Vec<_>>()
        .join(".")
}
