use std::collections::VecDeque;

use multisweeper_common::models::Pos;

use super::Field;

// Revealed and Won carry only the cells newly opened by this call.
#[derive(PartialEq, Eq, Debug)]
pub enum RevealResult {
    Lost,
    AlreadyResolved,
    Revealed(Vec<Pos>),
    Won(Vec<Pos>),
}

#[derive(PartialEq, Eq, Debug)]
pub enum FlagResult {
    AlreadyOpened,
    Removed,
    Set,
}

// Direct runs the mine check only and reveals nothing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OpenMode {
    Cascade,
    Direct,
}

impl Field {
    pub fn open(&mut self, pos: Pos, mode: OpenMode) -> RevealResult {
        // A flagged mine counts as safe and reveals nothing.
        let target = self.cell(pos);
        if target.mine && !target.flagged {
            return RevealResult::Lost;
        }

        if mode == OpenMode::Direct {
            return RevealResult::AlreadyResolved;
        }

        let mut opened = Vec::new();
        let mut queue = VecDeque::from([pos]);

        while let Some(current) = queue.pop_front() {
            let cell = self.cell_mut(current);

            if cell.adjacent != 0 {
                // Numbered cells reveal themselves but never their
                // neighbors.
                if !cell.opened {
                    cell.opened = true;
                    opened.push(current);
                }
                continue;
            }

            if cell.opened || cell.flagged {
                continue;
            }
            cell.opened = true;
            opened.push(current);

            let expand: Vec<Pos> = self
                .neighbors(current)
                .filter(|&neighbor| {
                    let next = self.cell(neighbor);
                    !next.opened && !next.flagged
                })
                .collect();
            queue.extend(expand);
        }

        if self.all_safe_cells_opened() {
            return RevealResult::Won(opened);
        }
        if opened.is_empty() {
            return RevealResult::AlreadyResolved;
        }
        RevealResult::Revealed(opened)
    }

    pub fn toggle_flag(&mut self, pos: Pos) -> FlagResult {
        let cell = self.cell_mut(pos);
        if cell.opened {
            FlagResult::AlreadyOpened
        } else if cell.flagged {
            cell.flagged = false;
            FlagResult::Removed
        } else {
            cell.flagged = true;
            FlagResult::Set
        }
    }

    fn all_safe_cells_opened(&self) -> bool {
        self.cells.iter().all(|cell| cell.mine || cell.opened)
    }
}

#[cfg(test)]
mod tests {
    use multisweeper_common::models::{CellRecord, GameRecord};

    use super::*;

    // Hand-placed mines, with the neighbor counts computed the long way.
    fn field_with_mines(n_cols: usize, n_rows: usize, mines: &[(usize, usize)]) -> Field {
        let game = GameRecord {
            code: 9,
            n_cols,
            n_rows,
            solvable: false,
            n_mines: mines.len(),
        };
        let records: Vec<CellRecord> = (0..n_rows)
            .flat_map(|row| {
                (0..n_cols).map(move |col| {
                    let mine = mines.contains(&(col, row));
                    let mut adjacent = 0u8;
                    for dr in -1i32..=1 {
                        for dc in -1i32..=1 {
                            if dr == 0 && dc == 0 {
                                continue;
                            }
                            let nc = col as i32 + dc;
                            let nr = row as i32 + dr;
                            if nc >= 0
                                && nr >= 0
                                && (nc as usize) < n_cols
                                && (nr as usize) < n_rows
                                && mines.contains(&(nc as usize, nr as usize))
                            {
                                adjacent += 1;
                            }
                        }
                    }
                    CellRecord {
                        code: 9,
                        col,
                        row,
                        opened: false,
                        mine,
                        n_mines: if mine { 0 } else { adjacent },
                        flagged: false,
                    }
                })
            })
            .collect();
        Field::from_records(&game, &records).unwrap()
    }

    #[test]
    fn opening_an_unflagged_mine_loses() {
        let mut field = field_with_mines(3, 3, &[(1, 1)]);
        assert_eq!(field.open(Pos::new(1, 1), OpenMode::Cascade), RevealResult::Lost);
        // The loss leaves the board to the orchestrator; nothing is opened.
        assert!(!field.cell(Pos::new(1, 1)).opened);
    }

    #[test]
    fn flag_shields_a_mine_from_loss() {
        let mut field = field_with_mines(3, 3, &[(1, 1)]);
        assert_eq!(field.toggle_flag(Pos::new(1, 1)), FlagResult::Set);
        assert_eq!(
            field.open(Pos::new(1, 1), OpenMode::Cascade),
            RevealResult::AlreadyResolved
        );
        assert!(!field.cell(Pos::new(1, 1)).opened);
    }

    #[test]
    fn numbered_cell_reveals_only_itself() {
        let mut field = field_with_mines(3, 3, &[(0, 0)]);
        let result = field.open(Pos::new(1, 1), OpenMode::Cascade);
        assert_eq!(result, RevealResult::Revealed(vec![Pos::new(1, 1)]));
        assert!(!field.cell(Pos::new(2, 2)).opened);
    }

    #[test]
    fn zero_cascade_reveals_the_connected_region() {
        // Mine in the far corner: every safe cell is reachable from (0, 0),
        // so the first open already wins.
        let mut field = field_with_mines(3, 3, &[(2, 2)]);
        match field.open(Pos::new(0, 0), OpenMode::Cascade) {
            RevealResult::Won(opened) => {
                assert_eq!(opened.len(), 8);
                assert!(!field.cell(Pos::new(2, 2)).opened);
            }
            other => panic!("expected a win, got {other:?}"),
        }
    }

    #[test]
    fn reveal_set_is_the_zero_region_plus_its_rim() {
        // A mine wall down column 2 splits the board; opening the left
        // pocket must reveal exactly columns 0 and 1.
        let mut field = field_with_mines(5, 5, &[(2, 0), (2, 1), (2, 2), (2, 3), (2, 4)]);
        match field.open(Pos::new(0, 0), OpenMode::Cascade) {
            RevealResult::Revealed(opened) => {
                assert_eq!(opened.len(), 10);
                assert!(opened.iter().all(|pos| pos.col < 2));
            }
            other => panic!("expected a partial reveal, got {other:?}"),
        }
    }

    #[test]
    fn cascade_skips_flagged_cells() {
        let mut field = field_with_mines(4, 1, &[(3, 0)]);
        field.toggle_flag(Pos::new(1, 0));
        let result = field.open(Pos::new(0, 0), OpenMode::Cascade);
        assert_eq!(result, RevealResult::Revealed(vec![Pos::new(0, 0)]));
        assert!(!field.cell(Pos::new(1, 0)).opened);
    }

    #[test]
    fn reopening_is_idempotent() {
        let mut field = field_with_mines(5, 1, &[(2, 0)]);
        assert!(matches!(
            field.open(Pos::new(0, 0), OpenMode::Cascade),
            RevealResult::Revealed(_)
        ));
        assert_eq!(
            field.open(Pos::new(0, 0), OpenMode::Cascade),
            RevealResult::AlreadyResolved
        );
        assert_eq!(
            field.open(Pos::new(1, 0), OpenMode::Cascade),
            RevealResult::AlreadyResolved
        );
    }

    #[test]
    fn finishing_the_last_safe_cell_wins() {
        let mut field = field_with_mines(4, 1, &[(0, 0), (3, 0)]);
        assert_eq!(
            field.open(Pos::new(1, 0), OpenMode::Cascade),
            RevealResult::Revealed(vec![Pos::new(1, 0)])
        );
        assert_eq!(
            field.open(Pos::new(2, 0), OpenMode::Cascade),
            RevealResult::Won(vec![Pos::new(2, 0)])
        );
    }

    #[test]
    fn direct_mode_skips_the_cascade() {
        let mut field = field_with_mines(3, 3, &[(2, 2)]);
        assert_eq!(
            field.open(Pos::new(0, 0), OpenMode::Direct),
            RevealResult::AlreadyResolved
        );
        assert!(!field.cell(Pos::new(0, 0)).opened);
        // The mine check still applies without a flag.
        assert_eq!(field.open(Pos::new(2, 2), OpenMode::Direct), RevealResult::Lost);
    }

    #[test]
    fn flag_toggle_cycle() {
        let mut field = field_with_mines(5, 1, &[(2, 0)]);
        let pos = Pos::new(4, 0);
        assert_eq!(field.toggle_flag(pos), FlagResult::Set);
        assert!(field.cell(pos).flagged);
        assert_eq!(field.toggle_flag(pos), FlagResult::Removed);
        assert!(!field.cell(pos).flagged);

        field.open(pos, OpenMode::Cascade);
        assert_eq!(field.toggle_flag(pos), FlagResult::AlreadyOpened);
    }
}
