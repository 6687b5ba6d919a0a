//! Rendering of request results
//!
//! Output goes through the [`Presenter`] trait so the CLI can switch between
//! plain text and JSON, and tests can capture output in memory.

use anyhow::Result;
use std::io::Write;

use crate::talent::BossNeedTally;

/// Trait for output implementations
pub trait Presenter {
    /// Show the final per-boss tally
    fn tally(&mut self, tally: &BossNeedTally) -> Result<()>;

    /// Show an informational message (e.g. no account bound)
    fn notice(&mut self, message: &str) -> Result<()>;
}

/// One `BOSS： N` line per boss
pub struct TextPresenter<W: Write> {
    out: W,
}

impl<W: Write> TextPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presenter for TextPresenter<W> {
    fn tally(&mut self, tally: &BossNeedTally) -> Result<()> {
        for (boss, need) in tally.iter() {
            writeln!(self.out, "{}： {}", boss, need)?;
        }
        Ok(())
    }

    fn notice(&mut self, message: &str) -> Result<()> {
        writeln!(self.out, "{}", message)?;
        Ok(())
    }
}

/// Tally as a JSON object, notices as `{"notice": ...}`
pub struct JsonPresenter<W: Write> {
    out: W,
}

impl<W: Write> JsonPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presenter for JsonPresenter<W> {
    fn tally(&mut self, tally: &BossNeedTally) -> Result<()> {
        let map: serde_json::Map<String, serde_json::Value> = tally
            .iter()
            .map(|(boss, need)| (boss.to_string(), need.into()))
            .collect();
        serde_json::to_writer_pretty(&mut self.out, &map)?;
        writeln!(self.out)?;
        Ok(())
    }

    fn notice(&mut self, message: &str) -> Result<()> {
        serde_json::to_writer(&mut self.out, &serde_json::json!({ "notice": message }))?;
        writeln!(self.out)?;
        Ok(())
    }
}
