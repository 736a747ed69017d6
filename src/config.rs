use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::games::estate::{Dice, BOARD_SIZE};

pub const DEFAULT_GO_CASH: i64 = 50;
pub const DEFAULT_START_CASH: i64 = 1000;
pub const DEFAULT_RENTS: [i64; BOARD_SIZE - 1] = [
    50, 50, 50, 75, 75, 75, 100, 100, 100, 150, 150, 150,
    200, 200, 200, 250, 250, 250, 300, 300, 300, 350, 350, 350,
];

// Board layout as read from a JSON file. Space 0 is always "Go", the rents
// describe spaces 1 to 24 in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub go_cash: i64,
    pub rents: Vec<i64>,
    #[serde(default)]
    pub names: Option<Vec<String>>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            go_cash: DEFAULT_GO_CASH,
            rents: DEFAULT_RENTS.to_vec(),
            names: None,
        }
    }
}

impl BoardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Could not open board file {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Could not parse board file {}", path.display()))
    }

    // Names for all 25 spaces, "Go" followed by "Place 1" .. "Place 24" unless
    // the file gives its own.
    pub fn space_names(&self) -> Result<Vec<String>> {
        match &self.names {
            Some(names) => {
                if names.len() != BOARD_SIZE {
                    bail!("Board needs exactly {} space names, got {}", BOARD_SIZE, names.len());
                }
                Ok(names.clone())
            },
            None => Ok((0..BOARD_SIZE)
                .map(|i| if i == 0 { "Go".to_string() } else { format!("Place {}", i) })
                .collect()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub board: BoardConfig,
    pub start_cash: i64,
    pub dice: Dice,
    pub max_rounds: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names() {
        let names = BoardConfig::default().space_names().unwrap();
        assert_eq!(names.len(), BOARD_SIZE);
        assert_eq!(names[0], "Go");
        assert_eq!(names[1], "Place 1");
        assert_eq!(names[24], "Place 24");
    }

    #[test]
    fn test_parse_board_file() {
        let json = r#"{"go_cash": 200, "rents": [10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120,
                       130, 140, 150, 160, 170, 180, 190, 200, 210, 220, 230, 240]}"#;
        let board: BoardConfig = serde_json::from_str(json).unwrap();
        assert_eq!(board.go_cash, 200);
        assert_eq!(board.rents.len(), 24);
        assert_eq!(board.names, None);
    }

    #[test]
    fn test_load_board_file() {
        let path = std::env::temp_dir().join(format!("estate-board-{}.json", std::process::id()));
        std::fs::write(&path, serde_json::to_string(&BoardConfig::default()).unwrap()).unwrap();

        let board = BoardConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(board, BoardConfig::default());
    }

    #[test]
    fn test_wrong_name_count() {
        let board = BoardConfig {
            names: Some(vec!["Go".to_string(), "Elsewhere".to_string()]),
            ..BoardConfig::default()
        };
        assert!(board.space_names().is_err());
    }
}
