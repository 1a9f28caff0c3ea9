use serde::{Deserialize, Serialize};

pub type GameCode = u32;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct Pos {
    pub col: usize,
    pub row: usize,
}

impl Pos {
    pub fn new(col: usize, row: usize) -> Self {
        Self { col, row }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct GameParams {
    pub n_cols: usize,
    pub n_rows: usize,
    pub n_mines: usize,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct GameRecord {
    pub code: GameCode,
    pub n_cols: usize,
    pub n_rows: usize,
    pub solvable: bool,
    pub n_mines: usize,
}

// In CellRecord, n_mines is the cell's adjacent-mine count; in GameRecord
// it is the game's total.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct CellRecord {
    pub code: GameCode,
    pub col: usize,
    pub row: usize,
    pub opened: bool,
    pub mine: bool,
    pub n_mines: u8,
    pub flagged: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CreateRequest {
    pub code: GameCode,
    pub n_cols: usize,
    pub n_rows: usize,
    pub n_mines: usize,
    #[serde(default)]
    pub solvable: bool,
}

impl CreateRequest {
    pub fn params(&self) -> GameParams {
        GameParams {
            n_cols: self.n_cols,
            n_rows: self.n_rows,
            n_mines: self.n_mines,
        }
    }
}

impl From<&CreateRequest> for GameRecord {
    fn from(request: &CreateRequest) -> Self {
        Self {
            code: request.code,
            n_cols: request.n_cols,
            n_rows: request.n_rows,
            solvable: request.solvable,
            n_mines: request.n_mines,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct JoinRequest {
    pub code: GameCode,
}

#[derive(Serialize, Debug)]
pub struct JoinResponse {
    pub exists: bool,
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum CreateResponse {
    Created { success: String },
    Rejected { error: String },
}

impl CreateResponse {
    pub fn created() -> Self {
        Self::Created {
            success: "Game successfully created".to_string(),
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self::Rejected {
            error: error.into(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
