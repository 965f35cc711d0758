//! Interactive prompt loop.
//!
//! One identifier per line, resolved start to finish before the next line
//! is read. `q` ends the session. At a yes/no prompt an answer starting
//! with `n` or `N` declines; anything else accepts.

use std::io::{BufRead, Write};

use anyhow::Result;
use chrono::Utc;
use tracing::warn;

use crate::core::Resolver;
use crate::domain::Isbn;

/// Line that ends the session
pub const QUIT: &str = "q";

/// Reply to a yes/no prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Accept,
    Decline,
    /// Input closed before an answer arrived
    Closed,
}

/// Whether a prompt answer accepts the proposed action
pub fn accepts(answer: &str) -> bool {
    !matches!(answer.trim().chars().next(), Some('n' | 'N'))
}

/// Counters reported when the session ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub created: usize,
    pub skipped: usize,
    pub not_found: usize,
    pub failed: usize,
}

/// Interactive session over any line-based input and output
pub struct Session<'a, R, W> {
    resolver: &'a Resolver,
    input: R,
    output: W,
    summary: SessionSummary,
}

impl<'a, R: BufRead, W: Write> Session<'a, R, W> {
    pub fn new(resolver: &'a Resolver, input: R, output: W) -> Self {
        Self {
            resolver,
            input,
            output,
            summary: SessionSummary::default(),
        }
    }

    /// Read identifiers until `q` or end of input
    pub async fn run(mut self) -> Result<SessionSummary> {
        writeln!(self.output, "=========================================")?;
        writeln!(self.output, "Book Populator")?;
        writeln!(self.output, "=========================================")?;
        writeln!(self.output, "Please enter ISBN ('{}' to quit): ", QUIT)?;
        writeln!(self.output, "=========================================")?;

        while let Some(line) = self.read_line()? {
            let line = line.trim();

            if line == QUIT {
                writeln!(self.output, "Quit")?;
                break;
            }
            if line.is_empty() {
                continue;
            }

            // A failed identifier never ends the session
            if let Err(e) = self.handle(line).await {
                warn!(isbn = line, error = %format!("{:#}", e), "Resolution failed");
                writeln!(self.output, "Error: {:#}", e)?;
                self.summary.failed += 1;
            }
        }

        Ok(self.summary)
    }

    async fn handle(&mut self, raw: &str) -> Result<()> {
        let isbn = match Isbn::parse(raw) {
            Ok(isbn) => isbn,
            Err(e) => {
                writeln!(self.output, "{}", e)?;
                self.summary.failed += 1;
                return Ok(());
            }
        };

        if let Some(existing) = self.resolver.check_existing(&isbn).await? {
            writeln!(self.output, "Title: '{}' found already.", existing.title)?;
            writeln!(self.output, "Skip? (default) or add? [n = add]")?;

            match self.ask()? {
                Answer::Decline => {}
                Answer::Accept | Answer::Closed => {
                    writeln!(self.output, "Skipped: {} - ({})", existing.title, isbn)?;
                    self.summary.skipped += 1;
                    return Ok(());
                }
            }
        }

        let today = Utc::now().date_naive();
        let Some(record) = self.resolver.fetch(&isbn, today).await? else {
            writeln!(self.output, "No records found for: {}", isbn)?;
            self.summary.not_found += 1;
            return Ok(());
        };

        writeln!(
            self.output,
            "Title: '{}' found ({}). Process this?",
            record.title, record.source
        )?;

        if self.ask()? != Answer::Accept {
            writeln!(self.output, "Skipped: {}", record.title)?;
            self.summary.skipped += 1;
            return Ok(());
        }

        let id = self.resolver.save(&record).await?;
        writeln!(self.output, "({}) Created record for: '{}'", id, record.title)?;
        self.summary.created += 1;

        Ok(())
    }

    fn ask(&mut self) -> Result<Answer> {
        Ok(match self.read_line()? {
            None => Answer::Closed,
            Some(answer) if accepts(&answer) => Answer::Accept,
            Some(_) => Answer::Decline,
        })
    }

    /// Prompt and read one line; `None` at end of input
    fn read_line(&mut self) -> Result<Option<String>> {
        write!(self.output, " -> ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        Ok(Some(line))
    }
}
