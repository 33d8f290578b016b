//! Interactive query shell
//!
//! Menu-driven front end over the query compiler:
//!
//! ```text
//! QUERY DATABASE
//! 1. query     cx cy cz <params>, paged results
//! 2. player    per-player interaction counts
//! 3. overview  store-wide totals
//! 4. exit
//! ```
//!
//! Bad input is reported and the prompt repeats; an empty line returns
//! to the menu and end of input exits.

use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::progress::format_number;
use crate::query::{
    fetch_page, overview, parse_query_line, player_summary, CompileContext, SearchQuery,
    PARAM_TABLE,
};
use console::style;
use rusqlite::Connection;
use std::io::{BufRead, Write};

const MENU: &[&str] = &["query", "player", "overview", "exit"];

/// Menu-driven shell reading from `input` and writing to `out`
pub struct Shell<'a, R, W> {
    conn: &'a Connection,
    settings: &'a Settings,
    page_size: usize,
    input: R,
    out: W,
}

impl<'a, R: BufRead, W: Write> Shell<'a, R, W> {
    pub fn new(conn: &'a Connection, settings: &'a Settings, page_size: usize, input: R, out: W) -> Self {
        Self {
            conn,
            settings,
            page_size,
            input,
            out,
        }
    }

    /// Run until `exit` or end of input
    pub fn run(&mut self) -> Result<()> {
        loop {
            writeln!(self.out, "{}", style("QUERY DATABASE").cyan().bold())?;
            for (i, option) in MENU.iter().enumerate() {
                writeln!(self.out, "{}. {}", i + 1, option)?;
            }

            let Some(choice) = self.prompt("> ")? else {
                return Ok(());
            };

            match choice.parse::<usize>().ok().and_then(|n| MENU.get(n.wrapping_sub(1))) {
                Some(&"query") => self.query()?,
                Some(&"player") => self.player()?,
                Some(&"overview") => self.overview()?,
                Some(&"exit") => {
                    writeln!(self.out, "Exiting...")?;
                    return Ok(());
                }
                _ => writeln!(self.out, "{}", style("Not a valid choice").yellow())?,
            }
        }
    }

    /// Print `text` and read one trimmed line; None at end of input
    fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        write!(self.out, "{}", text)?;
        self.out.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn print_param_help(&mut self) -> Result<()> {
        writeln!(self.out, "{}", style("Parameters:").bold())?;
        for def in PARAM_TABLE {
            writeln!(self.out, "  {:<8} {}", def.name, style(def.description).dim())?;
        }
        Ok(())
    }

    fn query(&mut self) -> Result<()> {
        self.print_param_help()?;

        loop {
            let Some(line) = self.prompt("cx cy cz <params>: ")? else {
                return Ok(());
            };
            if line.is_empty() {
                return Ok(());
            }

            let ctx = CompileContext::new(&self.settings.partitions);
            match parse_query_line(&line, &ctx) {
                Ok((center, params)) => {
                    let search = SearchQuery::build(center, &params, &self.settings.partitions);
                    return self.browse(&search);
                }
                Err(e) => writeln!(self.out, "{} {}", style("Error:").red().bold(), e)?,
            }
        }
    }

    fn browse(&mut self, search: &SearchQuery) -> Result<()> {
        let mut page = 0usize;

        loop {
            let result = fetch_page(self.conn, search, page, self.page_size)?;

            if result.total_rows == 0 {
                writeln!(self.out, "{}", style("No results").yellow())?;
                return Ok(());
            }

            for row in &result.rows {
                writeln!(self.out, "{}", row)?;
            }
            writeln!(
                self.out,
                "{}",
                style(format!(
                    "Page {}/{} ({} rows)",
                    page + 1,
                    result.total_pages(),
                    format_number(result.total_rows)
                ))
                .dim()
            )?;

            let Some(cmd) = self.prompt("[n]ext [p]rev [q]uit: ")? else {
                return Ok(());
            };
            match cmd.as_str() {
                "n" if result.has_next() => page += 1,
                "p" if result.has_prev() => page -= 1,
                "n" | "p" => writeln!(self.out, "{}", style("No more pages").yellow())?,
                _ => return Ok(()),
            }
        }
    }

    fn player(&mut self) -> Result<()> {
        loop {
            let Some(name) = self.prompt("username: ")? else {
                return Ok(());
            };
            if name.is_empty() {
                return Ok(());
            }

            match player_summary(self.conn, &self.settings.partitions, &name) {
                Ok(s) => {
                    writeln!(self.out, "{}", style(&s.username).bold())?;
                    writeln!(self.out, "  Total:  {}", format_number(s.total))?;
                    writeln!(self.out, "  Placed: {}", format_number(s.placed))?;
                    writeln!(self.out, "  Broken: {}", format_number(s.broken))?;
                    writeln!(self.out, "  Opened: {}", format_number(s.opened))?;
                    return Ok(());
                }
                Err(e @ AppError::NotFound { .. }) => {
                    writeln!(self.out, "{}", style(e).yellow())?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn overview(&mut self) -> Result<()> {
        let o = overview(self.conn, &self.settings.partitions)?;

        writeln!(self.out, "{}", style("Overview").bold())?;
        writeln!(self.out, "  Players: {}", format_number(o.players))?;
        writeln!(self.out, "  Entries: {}", format_number(o.total_rows))?;
        writeln!(self.out, "  Top players:")?;
        for (i, (name, n)) in o.top_players.iter().enumerate() {
            writeln!(self.out, "    {}. {} ({})", i + 1, name, format_number(*n))?;
        }
        writeln!(self.out, "  Top tables:")?;
        for (i, (name, n)) in o.top_partitions.iter().enumerate() {
            writeln!(self.out, "    {}. {} ({})", i + 1, name, format_number(*n))?;
        }
        Ok(())
    }
}
