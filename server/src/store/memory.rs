use dashmap::{DashMap, Entry};

use multisweeper_common::models::{CellRecord, GameCode, GameRecord};

use crate::error::GameError;

use super::GameStore;

struct StoredGame {
    meta: GameRecord,
    cells: Option<Vec<CellRecord>>,
}

// Every operation works under a single map entry's lock.
#[derive(Default)]
pub struct MemoryStore {
    games: DashMap<GameCode, StoredGame>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl GameStore for MemoryStore {
    async fn create_game(&self, game: GameRecord) -> Result<(), GameError> {
        match self.games.entry(game.code) {
            Entry::Occupied(_) => Err(GameError::GameExists { code: game.code }),
            Entry::Vacant(entry) => {
                entry.insert(StoredGame {
                    meta: game,
                    cells: None,
                });
                Ok(())
            }
        }
    }

    async fn game(&self, code: GameCode) -> Result<Option<GameRecord>, GameError> {
        Ok(self.games.get(&code).map(|stored| stored.meta.clone()))
    }

    async fn game_exists(&self, code: GameCode) -> Result<bool, GameError> {
        Ok(self.games.contains_key(&code))
    }

    async fn has_cells(&self, code: GameCode) -> Result<bool, GameError> {
        Ok(self
            .games
            .get(&code)
            .is_some_and(|stored| stored.cells.is_some()))
    }

    async fn insert_cells(&self, code: GameCode, cells: Vec<CellRecord>) -> Result<(), GameError> {
        match self.games.get_mut(&code) {
            None => Err(GameError::GameNotFound { code }),
            Some(mut stored) => {
                stored.cells = Some(cells);
                Ok(())
            }
        }
    }

    async fn cell(
        &self,
        code: GameCode,
        col: usize,
        row: usize,
    ) -> Result<Option<CellRecord>, GameError> {
        Ok(self.games.get(&code).and_then(|stored| {
            let cells = stored.cells.as_ref()?;
            if col >= stored.meta.n_cols || row >= stored.meta.n_rows {
                return None;
            }
            cells.get(col + row * stored.meta.n_cols).cloned()
        }))
    }

    async fn cells(&self, code: GameCode) -> Result<Vec<CellRecord>, GameError> {
        Ok(self
            .games
            .get(&code)
            .and_then(|stored| stored.cells.clone())
            .unwrap_or_default())
    }

    async fn write_cells(&self, code: GameCode, cells: &[CellRecord]) -> Result<(), GameError> {
        let Some(mut stored) = self.games.get_mut(&code) else {
            return Err(GameError::GameNotFound { code });
        };
        let n_cols = stored.meta.n_cols;
        let n_rows = stored.meta.n_rows;

        // Validate the whole batch before applying any of it.
        if let Some(record) = cells
            .iter()
            .find(|record| record.col >= n_cols || record.row >= n_rows)
        {
            return Err(GameError::CellNotFound {
                code,
                col: record.col,
                row: record.row,
            });
        }
        let Some(existing) = stored.cells.as_mut() else {
            return Err(GameError::CorruptedField {
                code,
                reason: "cell records were never generated".to_string(),
            });
        };
        for record in cells {
            existing[record.col + record.row * n_cols] = record.clone();
        }
        Ok(())
    }

    async fn delete_game(&self, code: GameCode) -> Result<(), GameError> {
        self.games.remove(&code);
        Ok(())
    }
}
