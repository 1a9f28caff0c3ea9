use rand::Rng;

use multisweeper_common::models::{GameCode, Pos};

use crate::error::GameError;

use super::{Cell, Field};

// Used when the caller passes no count, zero, or the whole board.
fn default_mine_count(total: usize) -> usize {
    (total as f64 / 6.0).round_ties_even() as usize
}

// The clipped 3x3 block around the start cell stays mine-free.
fn in_start_zone(pos: Pos, start: Pos) -> bool {
    pos.col.abs_diff(start.col) <= 1 && pos.row.abs_diff(start.row) <= 1
}

impl Field {
    // Dimension and mine-range validation happens on the create/restart
    // path; only the eligible-pool capacity is checked here.
    pub fn generate(
        code: GameCode,
        n_cols: usize,
        n_rows: usize,
        start: Pos,
        requested_mines: Option<usize>,
    ) -> Result<Self, GameError> {
        let total = n_cols * n_rows;
        let n_mines = match requested_mines {
            None | Some(0) => default_mine_count(total),
            Some(count) if count == total => default_mine_count(total),
            Some(count) => count,
        };

        let mut field = Self {
            code,
            n_cols,
            n_rows,
            n_mines,
            start: Some(start),
            cells: vec![Cell::default(); total],
        };

        let eligible: Vec<usize> = (0..total)
            .filter(|&index| {
                let pos = Pos::new(index % n_cols, index / n_cols);
                !in_start_zone(pos, start)
            })
            .collect();

        if n_mines > eligible.len() {
            return Err(GameError::InsufficientEligibleCells {
                requested: n_mines,
                eligible: eligible.len(),
            });
        }

        // Selection sampling: keep each eligible cell with probability
        // mines_left / cells_left, which picks exactly n_mines distinct
        // cells uniformly.
        let mut rng = rand::rng();
        let mut mines_left = n_mines;
        for (drawn, &index) in eligible.iter().enumerate() {
            if mines_left == 0 {
                break;
            }
            let pool_left = (eligible.len() - drawn) as u32;
            if rng.random_ratio(mines_left as u32, pool_left) {
                field.cells[index].mine = true;
                mines_left -= 1;
            }
        }

        // Mines bump the counts of their non-mine neighbors only.
        for index in 0..total {
            if !field.cells[index].mine {
                continue;
            }
            let pos = Pos::new(index % n_cols, index / n_cols);
            let neighbors: Vec<Pos> = field.neighbors(pos).collect();
            for neighbor in neighbors {
                let cell = field.cell_mut(neighbor);
                if !cell.mine {
                    cell.adjacent += 1;
                }
            }
        }

        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::super::{OpenMode, RevealResult};
    use super::*;

    fn mine_positions(field: &Field) -> Vec<Pos> {
        let mut mines = Vec::new();
        for row in 0..field.n_rows() {
            for col in 0..field.n_cols() {
                let pos = Pos::new(col, row);
                if field.cell(pos).mine {
                    mines.push(pos);
                }
            }
        }
        mines
    }

    #[test]
    fn places_exactly_the_requested_mines_outside_the_start_zone() {
        for _ in 0..25 {
            let field = Field::generate(1, 9, 9, Pos::new(4, 4), Some(20)).unwrap();
            let mines = mine_positions(&field);
            assert_eq!(mines.len(), 20);
            assert!(
                mines
                    .iter()
                    .all(|pos| pos.col.abs_diff(4) > 1 || pos.row.abs_diff(4) > 1)
            );
        }
    }

    #[test]
    fn start_cell_always_opens_on_a_zero() {
        for _ in 0..25 {
            let field = Field::generate(1, 12, 8, Pos::new(0, 0), Some(15)).unwrap();
            let start = field.cell(Pos::new(0, 0));
            assert!(!start.mine);
            assert_eq!(start.adjacent, 0);
        }
    }

    #[test]
    fn adjacent_counts_match_the_neighborhood() {
        let field = Field::generate(3, 10, 10, Pos::new(5, 5), Some(30)).unwrap();
        for row in 0..10 {
            for col in 0..10 {
                let pos = Pos::new(col, row);
                if field.cell(pos).mine {
                    continue;
                }
                let expected = field.neighbors(pos).filter(|&n| field.cell(n).mine).count();
                assert_eq!(field.cell(pos).adjacent as usize, expected);
            }
        }
    }

    #[test]
    fn corner_start_clips_the_exclusion_zone() {
        // A corner start only excludes a 2x2 block, leaving 32 of 36 cells.
        let field = Field::generate(1, 6, 6, Pos::new(0, 0), Some(32)).unwrap();
        assert_eq!(mine_positions(&field).len(), 32);

        let error = Field::generate(1, 6, 6, Pos::new(0, 0), Some(33)).unwrap_err();
        assert_eq!(
            error,
            GameError::InsufficientEligibleCells {
                requested: 33,
                eligible: 32,
            }
        );
    }

    #[test]
    fn defaults_to_a_sixth_of_the_board() {
        let field = Field::generate(1, 10, 9, Pos::new(4, 4), None).unwrap();
        assert_eq!(field.n_mines(), 15);
        assert_eq!(mine_positions(&field).len(), 15);

        let zero = Field::generate(1, 10, 9, Pos::new(4, 4), Some(0)).unwrap();
        assert_eq!(zero.n_mines(), 15);

        let full = Field::generate(1, 10, 9, Pos::new(4, 4), Some(90)).unwrap();
        assert_eq!(full.n_mines(), 15);
    }

    #[test]
    fn default_mine_count_rounds_ties_to_even() {
        // 63 / 6 = 10.5 rounds down to 10, 105 / 6 = 17.5 rounds up to 18.
        let down = Field::generate(1, 7, 9, Pos::new(3, 4), None).unwrap();
        assert_eq!(down.n_mines(), 10);
        assert_eq!(mine_positions(&down).len(), 10);

        let up = Field::generate(1, 15, 7, Pos::new(7, 3), None).unwrap();
        assert_eq!(up.n_mines(), 18);
    }

    #[test]
    fn a_single_mine_lands_outside_the_start_block() {
        for _ in 0..50 {
            let field = Field::generate(1, 5, 5, Pos::new(1, 1), Some(1)).unwrap();
            assert_eq!(field.start(), Some(Pos::new(1, 1)));

            let mines = mine_positions(&field);
            assert_eq!(mines.len(), 1);
            assert!(mines[0].col > 2 || mines[0].row > 2);
        }
    }

    #[test]
    fn first_open_at_the_start_never_loses() {
        for _ in 0..50 {
            let mut field = Field::generate(1, 6, 6, Pos::new(1, 1), Some(10)).unwrap();
            let result = field.open(Pos::new(1, 1), OpenMode::Cascade);
            assert!(matches!(
                result,
                RevealResult::Revealed(_) | RevealResult::Won(_)
            ));
        }
    }
}
