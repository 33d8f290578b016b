//! Proximity and time-window query builder
//!
//! Turns a center position and compiled parameters into one SQL
//! statement over the union of the selected partition tables. Every
//! user-supplied value is bound as a numbered parameter; only validated
//! partition names are spliced into the text.

use crate::db::quote_ident;
use crate::query::params::{CompiledParam, ParamValue};
use rusqlite::types::Value;

/// Radius used when no `range` parameter is given
pub const DEFAULT_RANGE: i64 = 1;

/// Columns returned for each matching row
pub const RESULT_COLUMNS: &str = "world, x, y, z, interaction, username, unix_time, block";

/// Total order over result rows: newest first, ties broken by the
/// uniqueness key
const ORDER_BY: &str =
    "ORDER BY unix_time DESC, world, x, y, z, interaction, username, block";

/// Center of a proximity search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Center {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Center {
    pub fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }
}

/// `SELECT <columns>, <name> AS world FROM <table>` for each partition,
/// joined with UNION ALL. Returns the SQL and the bound partition names.
pub fn partition_union(partitions: &[String], columns: &str, first_param: usize) -> (String, Vec<Value>) {
    let mut values = Vec::with_capacity(partitions.len());
    let selects: Vec<String> = partitions
        .iter()
        .map(|p| {
            values.push(Value::Text(p.clone()));
            format!(
                "SELECT {columns}, ?{} AS world FROM {}",
                first_param + values.len() - 1,
                quote_ident(p)
            )
        })
        .collect();
    (selects.join(" UNION ALL "), values)
}

/// A compiled search, ready to execute page by page
#[derive(Debug, Clone)]
pub struct SearchQuery {
    partitions: Vec<String>,
    from: String,
    predicate: String,
    values: Vec<Value>,
}

impl SearchQuery {
    /// Build the search for `center` filtered by `params`
    pub fn build(center: Center, params: &[CompiledParam], partitions: &[String]) -> Self {
        let selected = select_partitions(params, partitions);

        let (from, mut values) = partition_union(
            &selected,
            "x, y, z, interaction, username, lower_username, unix_time, block",
            1,
        );

        let mut bind = |v: Value| -> String {
            values.push(v);
            format!("?{}", values.len())
        };

        let range = params
            .iter()
            .find_map(|p| match p.value {
                ParamValue::Range(r) => Some(r),
                _ => None,
            })
            .unwrap_or(DEFAULT_RANGE);

        let cx = bind(Value::Integer(center.x));
        let cy = bind(Value::Integer(center.y));
        let cz = bind(Value::Integer(center.z));
        let r2 = bind(Value::Integer(range.saturating_mul(range)));

        let mut clauses = vec![format!(
            "((x - {cx}) * (x - {cx}) + (y - {cy}) * (y - {cy}) + (z - {cz}) * (z - {cz})) <= {r2}"
        )];

        for param in params {
            let op = if param.negated { "!=" } else { "=" };
            let clause = match &param.value {
                ParamValue::Action(kind) => {
                    format!("interaction {op} {}", bind(Value::Text(kind.code().to_string())))
                }
                ParamValue::Object(name) => format!("block {op} {}", bind(Value::Text(name.clone()))),
                ParamValue::Source(name) => {
                    format!("lower_username {op} {}", bind(Value::Text(name.clone())))
                }
                ParamValue::Before(t) => format!("unix_time <= {}", bind(Value::Integer(*t))),
                ParamValue::After(t) => format!("unix_time >= {}", bind(Value::Integer(*t))),
                ParamValue::World(_) | ParamValue::Range(_) => continue,
            };
            clauses.push(clause);
        }

        Self {
            partitions: selected,
            from,
            predicate: clauses.join(" AND "),
            values,
        }
    }

    /// Partitions the search covers, in configured order
    pub fn partitions(&self) -> &[String] {
        &self.partitions
    }

    /// True when world filters excluded every partition
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// WHERE clause text (without the keyword)
    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    /// Bound values for [`SearchQuery::count_sql`]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// `SELECT COUNT(*)` over the same predicate
    pub fn count_sql(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM ({}) WHERE {}",
            self.from, self.predicate
        )
    }

    /// Page statement; LIMIT and OFFSET are the last two parameters
    pub fn page_sql(&self) -> String {
        let n = self.values.len();
        format!(
            "SELECT {RESULT_COLUMNS} FROM ({}) WHERE {} {ORDER_BY} LIMIT ?{} OFFSET ?{}",
            self.from,
            self.predicate,
            n + 1,
            n + 2
        )
    }

    /// Bound values for [`SearchQuery::page_sql`]
    pub fn page_values(&self, page: usize, page_size: usize) -> Vec<Value> {
        let mut values = self.values.clone();
        values.push(Value::Integer(page_size as i64));
        values.push(Value::Integer(page.saturating_mul(page_size) as i64));
        values
    }
}

/// Apply `world` filters to the configured partition list.
///
/// Positive values union their partitions; negative values remove theirs.
/// Without positive values the search starts from every partition.
fn select_partitions(params: &[CompiledParam], partitions: &[String]) -> Vec<String> {
    let mut included: Vec<&str> = Vec::new();
    let mut excluded: Vec<&str> = Vec::new();

    for param in params {
        if let ParamValue::World(name) = &param.value {
            if param.negated {
                excluded.push(name);
            } else {
                included.push(name);
            }
        }
    }

    partitions
        .iter()
        .filter(|p| included.is_empty() || included.contains(&p.as_str()))
        .filter(|p| !excluded.contains(&p.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Interaction;

    fn partitions() -> Vec<String> {
        vec!["overworld".into(), "nether".into(), "the_end".into()]
    }

    fn world(name: &str, negated: bool) -> CompiledParam {
        CompiledParam {
            value: ParamValue::World(name.into()),
            negated,
        }
    }

    #[test]
    fn test_default_range_and_all_partitions() {
        let q = SearchQuery::build(Center::new(1, 2, 3), &[], &partitions());
        assert_eq!(q.partitions(), partitions().as_slice());

        // 3 partition names, then cx, cy, cz, range²
        assert_eq!(q.values().len(), 7);
        assert_eq!(q.values()[6], Value::Integer(1));
        assert!(q.count_sql().contains("UNION ALL"));
    }

    #[test]
    fn test_world_union_and_exclusion() {
        let q = SearchQuery::build(
            Center::new(0, 0, 0),
            &[world("the_end", false), world("overworld", false)],
            &partitions(),
        );
        assert_eq!(q.partitions(), &["overworld".to_string(), "the_end".to_string()]);

        let q = SearchQuery::build(Center::new(0, 0, 0), &[world("nether", true)], &partitions());
        assert_eq!(q.partitions(), &["overworld".to_string(), "the_end".to_string()]);

        let q = SearchQuery::build(
            Center::new(0, 0, 0),
            &[world("nether", false), world("nether", true)],
            &partitions(),
        );
        assert!(q.is_empty());
    }

    #[test]
    fn test_clauses_are_bound() {
        let params = vec![
            CompiledParam {
                value: ParamValue::Range(5),
                negated: false,
            },
            CompiledParam {
                value: ParamValue::Action(Interaction::Break),
                negated: false,
            },
            CompiledParam {
                value: ParamValue::Source("steve'; DROP TABLE overworld; --".into()),
                negated: true,
            },
            CompiledParam {
                value: ParamValue::After(100),
                negated: false,
            },
        ];
        let q = SearchQuery::build(Center::new(0, 0, 0), &params, &["overworld".to_string()]);

        assert!(!q.predicate().contains("DROP"));
        assert!(q.predicate().contains("interaction = ?6"));
        assert!(q.predicate().contains("lower_username != ?7"));
        assert!(q.predicate().contains("unix_time >= ?8"));
        assert_eq!(q.values()[4], Value::Integer(25));
    }

    #[test]
    fn test_page_values() {
        let q = SearchQuery::build(Center::new(0, 0, 0), &[], &["overworld".to_string()]);
        let sql = q.page_sql();
        assert!(sql.contains("ORDER BY unix_time DESC"));
        assert!(sql.ends_with("LIMIT ?6 OFFSET ?7"));

        let values = q.page_values(2, 10);
        assert_eq!(values[5], Value::Integer(10));
        assert_eq!(values[6], Value::Integer(20));
    }
}
