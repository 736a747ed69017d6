use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Result};
use serde::Serialize;

// Cash of one player at the end of a round. Round 0 is the starting cash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub round: usize,
    pub cash: i64,
}

// Append-only balance history, one series per seat
#[derive(Clone, Debug, Default)]
pub struct History {
    names: Vec<String>,
    series: Vec<Vec<Snapshot>>,
}

impl History {
    pub fn new(names: Vec<String>) -> Self {
        let series = vec![Vec::new(); names.len()];
        History { names, series }
    }

    pub fn record(&mut self, player: usize, round: usize, cash: i64) -> Result<()> {
        let series = self.series
            .get_mut(player)
            .ok_or_else(|| anyhow!("No history for seat {}", player))?;

        if let Some(last) = series.last() {
            if round <= last.round {
                bail!("Round {} is already in the history of {}", round, self.names[player]);
            }
        }

        series.push(Snapshot { round, cash });
        Ok(())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn series(&self, player: usize) -> &[Snapshot] {
        &self.series[player]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Snapshot])> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.series.iter().map(Vec::as_slice))
    }

    pub fn last_round(&self) -> usize {
        self.series
            .iter()
            .filter_map(|s| s.last())
            .map(|s| s.round)
            .max()
            .unwrap_or(0)
    }

    // Lowest and highest cash seen across all players
    pub fn cash_bounds(&self) -> (i64, i64) {
        let mut values = self.series.iter().flatten().map(|s| s.cash);
        match values.next() {
            None => (0, 0),
            Some(first) => values.fold((first, first), |(low, high), c| (low.min(c), high.max(c))),
        }
    }
}

// One line in the history log. Games are told apart by their id.
#[derive(Debug, Clone, Serialize)]
struct HistoryLine<'a> {
    game_id: usize,
    player: &'a str,
    round: usize,
    cash: i64,
}

pub fn write_history_log(games: &[History], file: &Path) -> Result<()> {
    let file = File::create(file)?;
    let mut writer = BufWriter::new(file);

    for (game_id, history) in games.iter().enumerate() {
        for (player, series) in history.iter() {
            for snapshot in series {
                let line = HistoryLine {
                    game_id,
                    player,
                    round: snapshot.round,
                    cash: snapshot.cash,
                };
                jsonl::write(&mut writer, &line)?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> History {
        let mut history = History::new(vec!["Alice".to_string(), "Bob".to_string()]);
        history.record(0, 0, 1000).unwrap();
        history.record(1, 0, 1000).unwrap();
        history.record(0, 1, 1250).unwrap();
        history.record(1, 1, 700).unwrap();
        history.record(0, 2, 1700).unwrap();
        history
    }

    #[test]
    fn test_record_is_append_only() {
        let mut history = sample();
        assert!(history.record(0, 2, 10).is_err());
        assert!(history.record(1, 0, 10).is_err());
        assert!(history.record(2, 3, 10).is_err());

        assert_eq!(history.series(0).len(), 3);
        assert_eq!(history.series(1).last(), Some(&Snapshot { round: 1, cash: 700 }));
    }

    #[test]
    fn test_bounds() {
        let history = sample();
        assert_eq!(history.last_round(), 2);
        assert_eq!(history.cash_bounds(), (700, 1700));
        assert_eq!(History::new(Vec::new()).cash_bounds(), (0, 0));
    }

    #[test]
    fn test_write_history_log() {
        let path = std::env::temp_dir().join(format!("estate-history-{}.jsonl", std::process::id()));
        write_history_log(&[sample(), sample()], &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0].as_object().unwrap().len(), 4);
        assert_eq!(lines[0]["game_id"], 0);
        assert_eq!(lines[0]["player"], "Alice");
        assert_eq!(lines[2]["cash"], 1700);
        assert_eq!(lines[5]["game_id"], 1);
    }
}
