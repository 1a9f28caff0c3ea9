mod generate;
mod reveal;

pub use reveal::{FlagResult, OpenMode, RevealResult};

use multisweeper_common::models::{CellRecord, GameCode, GameRecord, Pos};

use crate::error::GameError;

#[derive(Clone, Default, Debug)]
pub struct Cell {
    pub mine: bool,
    pub adjacent: u8,
    pub opened: bool,
    pub flagged: bool,
}

// Row-major, col is the fast axis. Records don't persist `start`, so
// rehydrated fields carry None there.
#[derive(Debug)]
pub struct Field {
    code: GameCode,
    n_cols: usize,
    n_rows: usize,
    n_mines: usize,
    start: Option<Pos>,
    cells: Vec<Cell>,
}

#[rustfmt::skip]
const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1), (0, -1), (1, -1),
    (-1,  0),          (1,  0),
    (-1,  1), (0,  1), (1,  1),
];

impl Field {
    pub fn code(&self) -> GameCode {
        self.code
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_mines(&self) -> usize {
        self.n_mines
    }

    pub fn start(&self) -> Option<Pos> {
        self.start
    }

    pub fn contains(&self, pos: Pos) -> bool {
        pos.col < self.n_cols && pos.row < self.n_rows
    }

    fn index(&self, pos: Pos) -> usize {
        debug_assert!(self.contains(pos));
        pos.col + pos.row * self.n_cols
    }

    pub fn cell(&self, pos: Pos) -> &Cell {
        &self.cells[self.index(pos)]
    }

    fn cell_mut(&mut self, pos: Pos) -> &mut Cell {
        let index = self.index(pos);
        &mut self.cells[index]
    }

    pub fn neighbors(&self, pos: Pos) -> impl Iterator<Item = Pos> + '_ {
        NEIGHBOR_OFFSETS.iter().filter_map(move |&(dc, dr)| {
            let col = pos.col as i32 + dc;
            let row = pos.row as i32 + dr;
            if col >= 0 && (col as usize) < self.n_cols && row >= 0 && (row as usize) < self.n_rows {
                Some(Pos::new(col as usize, row as usize))
            } else {
                None
            }
        })
    }

    // The records must cover the board exactly once.
    pub fn from_records(game: &GameRecord, records: &[CellRecord]) -> Result<Self, GameError> {
        let total = game.n_cols * game.n_rows;
        if records.len() != total {
            return Err(GameError::CorruptedField {
                code: game.code,
                reason: format!("expected {} cells, found {}", total, records.len()),
            });
        }

        let mut cells = vec![Cell::default(); total];
        let mut seen = vec![false; total];
        for record in records {
            if record.col >= game.n_cols || record.row >= game.n_rows {
                return Err(GameError::CorruptedField {
                    code: game.code,
                    reason: format!("cell ({}, {}) is out of bounds", record.col, record.row),
                });
            }
            let index = record.col + record.row * game.n_cols;
            if seen[index] {
                return Err(GameError::CorruptedField {
                    code: game.code,
                    reason: format!("duplicate cell ({}, {})", record.col, record.row),
                });
            }
            seen[index] = true;
            cells[index] = Cell {
                mine: record.mine,
                adjacent: record.n_mines,
                opened: record.opened,
                flagged: record.flagged,
            };
        }

        Ok(Self {
            code: game.code,
            n_cols: game.n_cols,
            n_rows: game.n_rows,
            n_mines: game.n_mines,
            start: None,
            cells,
        })
    }

    pub fn record_at(&self, pos: Pos) -> CellRecord {
        let cell = self.cell(pos);
        CellRecord {
            code: self.code,
            col: pos.col,
            row: pos.row,
            opened: cell.opened,
            mine: cell.mine,
            n_mines: cell.adjacent,
            flagged: cell.flagged,
        }
    }

    pub fn records(&self) -> Vec<CellRecord> {
        let mut records = Vec::with_capacity(self.cells.len());
        for row in 0..self.n_rows {
            for col in 0..self.n_cols {
                records.push(self.record_at(Pos::new(col, row)));
            }
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_round_trip_through_from_records() {
        let field = Field::generate(7, 8, 6, Pos::new(3, 3), Some(11)).unwrap();
        let game = GameRecord {
            code: 7,
            n_cols: 8,
            n_rows: 6,
            solvable: false,
            n_mines: 11,
        };

        let rebuilt = Field::from_records(&game, &field.records()).unwrap();
        for row in 0..6 {
            for col in 0..8 {
                let pos = Pos::new(col, row);
                assert_eq!(rebuilt.cell(pos).mine, field.cell(pos).mine);
                assert_eq!(rebuilt.cell(pos).adjacent, field.cell(pos).adjacent);
            }
        }
    }

    #[test]
    fn from_records_rejects_incomplete_sets() {
        let game = GameRecord {
            code: 1,
            n_cols: 6,
            n_rows: 6,
            solvable: false,
            n_mines: 5,
        };
        let records = Field::generate(1, 6, 6, Pos::new(0, 0), Some(5))
            .unwrap()
            .records();

        let error = Field::from_records(&game, &records[1..]).unwrap_err();
        assert!(matches!(error, GameError::CorruptedField { code: 1, .. }));
    }

    #[test]
    fn from_records_rejects_duplicate_cells() {
        let game = GameRecord {
            code: 2,
            n_cols: 6,
            n_rows: 6,
            solvable: false,
            n_mines: 5,
        };
        let mut records = Field::generate(2, 6, 6, Pos::new(0, 0), Some(5))
            .unwrap()
            .records();
        records[1] = records[0].clone();

        let error = Field::from_records(&game, &records).unwrap_err();
        assert!(matches!(error, GameError::CorruptedField { code: 2, .. }));
    }

    #[test]
    fn neighbors_clip_at_corners_and_edges() {
        let field = Field::generate(3, 8, 8, Pos::new(4, 4), Some(10)).unwrap();

        assert_eq!(field.neighbors(Pos::new(0, 0)).count(), 3);
        assert_eq!(field.neighbors(Pos::new(4, 0)).count(), 5);
        assert_eq!(field.neighbors(Pos::new(7, 7)).count(), 3);
        assert_eq!(field.neighbors(Pos::new(4, 4)).count(), 8);
    }
}
