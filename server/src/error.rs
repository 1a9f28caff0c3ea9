use thiserror::Error;

use multisweeper_common::models::GameCode;

#[derive(Error, Clone, PartialEq, Eq, Debug)]
pub enum GameError {
    #[error("{reason}")]
    Validation { reason: String },

    #[error("The game you requested does not exist")]
    GameNotFound { code: GameCode },

    #[error("The cell you requested does not exist")]
    CellNotFound {
        code: GameCode,
        col: usize,
        row: usize,
    },

    // Creation-time validation keeps this unreachable through the routes.
    #[error("cannot place {requested} mines in {eligible} eligible cells")]
    InsufficientEligibleCells { requested: usize, eligible: usize },

    #[error("A game with this code already exists")]
    GameExists { code: GameCode },

    #[error("stored field for game {code} is corrupted: {reason}")]
    CorruptedField { code: GameCode, reason: String },
}

impl GameError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }
}
