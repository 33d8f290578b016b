//! Query compilation and execution
//!
//! ```text
//! "cx cy cz key:value ..."
//!        │
//!        ├── coordinates ─────────────┐
//!        ▼                            ▼
//!   params::compile ──▶ CompiledParam ──▶ SearchQuery::build
//!                                            │  (parameterized SQL over
//!                                            │   UNION ALL of partitions)
//!                                            ▼
//!                                 executor::fetch_page
//! ```

pub mod builder;
pub mod executor;
pub mod params;
pub mod stats;

pub use builder::{Center, SearchQuery, DEFAULT_RANGE};
pub use executor::{count_matches, fetch_page, fetch_rows, LogRow, Page};
pub use params::{compile, CompileContext, CompiledParam, ParamDef, ParamKind, ParamValue, PARAM_TABLE};
pub use stats::{overview, player_summary, Overview, PlayerSummary};

use crate::error::{CompileError, CompileResult};

/// Parse a full query line: `<cx> <cy> <cz> <params>`
///
/// Coordinate errors are reported at positions 1 to 3 under the keys
/// `cx`, `cy` and `cz`; parameter token positions count from the first
/// token after the coordinates.
pub fn parse_query_line(
    line: &str,
    ctx: &CompileContext<'_>,
) -> CompileResult<(Center, Vec<CompiledParam>)> {
    let mut rest = line.trim_start();
    let mut coords = [0i64; 3];

    for (i, key) in ["cx", "cy", "cz"].into_iter().enumerate() {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let token = &rest[..end];

        coords[i] = token.parse().map_err(|_| CompileError::InvalidValue {
            position: i + 1,
            key: key.to_string(),
            value: token.to_string(),
            reason: "expected integer coordinate".to_string(),
        })?;

        rest = rest[end..].trim_start();
    }

    let params = compile(rest, ctx)?;
    Ok((Center::new(coords[0], coords[1], coords[2]), params))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_line() {
        let parts = vec!["overworld".to_string()];
        let ctx = CompileContext { partitions: &parts, now: 0 };

        let (center, params) = parse_query_line("10 -64 5 range:3 !source:Steve", &ctx).unwrap();
        assert_eq!(center, Center::new(10, -64, 5));
        assert_eq!(params.len(), 2);

        let (_, params) = parse_query_line("  1 2 3", &ctx).unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn test_parse_query_line_bad_coordinates() {
        let parts = vec!["overworld".to_string()];
        let ctx = CompileContext { partitions: &parts, now: 0 };

        let err = parse_query_line("1 two 3", &ctx).unwrap_err();
        assert!(matches!(err, CompileError::InvalidValue { position: 2, .. }));

        let err = parse_query_line("1 2", &ctx).unwrap_err();
        assert!(matches!(err, CompileError::InvalidValue { position: 3, .. }));
    }
}
