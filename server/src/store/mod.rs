mod memory;

pub use memory::MemoryStore;

use multisweeper_common::models::{CellRecord, GameCode, GameRecord};

use crate::error::GameError;

#[rocket::async_trait]
pub trait GameStore: Send + Sync {
    async fn create_game(&self, game: GameRecord) -> Result<(), GameError>;

    async fn game(&self, code: GameCode) -> Result<Option<GameRecord>, GameError>;

    async fn game_exists(&self, code: GameCode) -> Result<bool, GameError>;

    async fn has_cells(&self, code: GameCode) -> Result<bool, GameError>;

    async fn insert_cells(&self, code: GameCode, cells: Vec<CellRecord>) -> Result<(), GameError>;

    async fn cell(
        &self,
        code: GameCode,
        col: usize,
        row: usize,
    ) -> Result<Option<CellRecord>, GameError>;

    async fn cells(&self, code: GameCode) -> Result<Vec<CellRecord>, GameError>;

    // The whole batch applies atomically, never cell by cell.
    async fn write_cells(&self, code: GameCode, cells: &[CellRecord]) -> Result<(), GameError>;

    // Unknown codes are a no-op.
    async fn delete_game(&self, code: GameCode) -> Result<(), GameError>;
}
