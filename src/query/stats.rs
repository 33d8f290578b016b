//! Player and store statistics
//!
//! Aggregates shown by the `player` and `overview` shell commands.

use crate::db::{count_rows, quote_ident};
use crate::error::{AppError, DbError, DbResult, Result};
use crate::query::builder::partition_union;
use crate::record::Interaction;
use rusqlite::{params, params_from_iter, Connection};

/// Interaction counts for one player across all partitions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerSummary {
    pub username: String,
    pub total: u64,
    pub placed: u64,
    pub broken: u64,
    pub opened: u64,
}

/// Whole-store overview
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overview {
    /// Distinct actor names
    pub players: u64,
    /// Top 3 actors by row count
    pub top_players: Vec<(String, u64)>,
    pub total_rows: u64,
    /// Top 4 partitions by row count
    pub top_partitions: Vec<(String, u64)>,
}

/// Count a player's interactions (case-insensitive)
///
/// Returns [`AppError::NotFound`] when the player has no rows.
pub fn player_summary(conn: &Connection, partitions: &[String], username: &str) -> Result<PlayerSummary> {
    let lower = username.to_lowercase();
    let placed_code = Interaction::Place.code().to_string();
    let broken_code = Interaction::Break.code().to_string();
    let opened_code = Interaction::Open.code().to_string();
    let mut summary = PlayerSummary {
        username: username.to_string(),
        ..Default::default()
    };

    for partition in partitions {
        let sql = format!(
            "SELECT COUNT(*), \
                COALESCE(SUM(interaction = ?2), 0), \
                COALESCE(SUM(interaction = ?3), 0), \
                COALESCE(SUM(interaction = ?4), 0) \
             FROM {} WHERE lower_username = ?1",
            quote_ident(partition)
        );
        let (total, placed, broken, opened): (i64, i64, i64, i64) =
            conn.query_row(&sql, params![lower, placed_code, broken_code, opened_code], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .map_err(DbError::from)?;

        summary.total += total as u64;
        summary.placed += placed as u64;
        summary.broken += broken as u64;
        summary.opened += opened as u64;
    }

    if summary.total == 0 {
        return Err(AppError::NotFound {
            username: username.to_string(),
        });
    }
    Ok(summary)
}

/// Compute the store overview
pub fn overview(conn: &Connection, partitions: &[String]) -> DbResult<Overview> {
    let mut overview = Overview::default();
    if partitions.is_empty() {
        return Ok(overview);
    }

    let (union, values) = partition_union(partitions, "username", 1);

    overview.players = conn.query_row(
        &format!("SELECT COUNT(DISTINCT username) FROM ({union})"),
        params_from_iter(values.iter()),
        |row| row.get::<_, i64>(0),
    )? as u64;

    let mut stmt = conn.prepare(&format!(
        "SELECT username, COUNT(*) AS n FROM ({union}) \
         GROUP BY username ORDER BY n DESC, username LIMIT 3"
    ))?;
    overview.top_players = stmt
        .query_map(params_from_iter(values.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut counts = Vec::with_capacity(partitions.len());
    for partition in partitions {
        let n = count_rows(conn, partition)?;
        overview.total_rows += n;
        counts.push((partition.clone(), n));
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(4);
    overview.top_partitions = counts;

    Ok(overview)
}
