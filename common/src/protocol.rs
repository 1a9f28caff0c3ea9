use serde::{Deserialize, Serialize};

use crate::models::CellRecord;

pub const WIN_STATUS: &str = "You Won!";
pub const LOSS_STATUS: &str = "lost";

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "intent", rename_all = "lowercase")]
pub enum ClientIntent {
    Open { col: usize, row: usize },
    Flag { col: usize, row: usize },
    Restart { n_cols: usize, n_rows: usize, n_mines: usize },
    Name { name: String },
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum FlagUpdate {
    Set { success: bool, col: usize, row: usize },
    Removed { remove: bool, col: usize, row: usize },
    AlreadyOpened { status: String },
}

impl FlagUpdate {
    pub fn set(col: usize, row: usize) -> Self {
        Self::Set {
            success: true,
            col,
            row,
        }
    }

    pub fn removed(col: usize, row: usize) -> Self {
        Self::Removed {
            remove: true,
            col,
            row,
        }
    }

    pub fn already_opened() -> Self {
        Self::AlreadyOpened {
            status: "Cell is already opened".to_string(),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum GameEvent {
    FieldSnapshot {
        field: Vec<CellRecord>,
        n_cols: usize,
        n_rows: usize,
        n_mines: usize,
    },
    FieldPending {
        n_cols: usize,
        n_rows: usize,
        n_mines: usize,
    },
    FieldCreated {
        field: Vec<CellRecord>,
    },
    Opened {
        opened: Vec<CellRecord>,
    },
    Won {
        status: String,
    },
    Lost {
        game_status: String,
        message: String,
    },
    Flagged {
        flagged: FlagUpdate,
    },
    Error {
        error: String,
    },
}

impl GameEvent {
    pub fn won() -> Self {
        Self::Won {
            status: WIN_STATUS.to_string(),
        }
    }

    pub fn lost(player: &str) -> Self {
        let who = if player.is_empty() { "Someone" } else { player };
        Self::Lost {
            game_status: LOSS_STATUS.to_string(),
            message: format!("{who} threw the game"),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum OpenResponse {
    Opened(Vec<CellRecord>),
    Loss { game_status: String },
    Win { status: String },
    // A direct-mode open that did not lose; serializes as a bare null.
    Null,
}

impl OpenResponse {
    pub fn loss() -> Self {
        Self::Loss {
            game_status: LOSS_STATUS.to_string(),
        }
    }

    pub fn win() -> Self {
        Self::Win {
            status: WIN_STATUS.to_string(),
        }
    }
}
