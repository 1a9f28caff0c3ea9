use std::sync::Arc;

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, instrument, warn};

use multisweeper_common::models::{
    CellRecord, CreateRequest, GameCode, GameParams, GameRecord, Pos,
};
use multisweeper_common::protocol::{FlagUpdate, GameEvent};

use crate::error::GameError;
use crate::field::{Field, FlagResult, OpenMode, RevealResult};
use crate::session::{self, ConnectionId, SessionRegistry, SessionState, WsSink};
use crate::store::GameStore;

#[derive(Clone)]
pub struct GameService {
    store: Arc<dyn GameStore>,
    registry: Arc<SessionRegistry>,
}

// The mine ceiling keeps room for the mine-free start zone.
pub fn validate_params(params: &GameParams) -> Result<(), GameError> {
    if params.n_cols <= 5 {
        return Err(GameError::validation("Number of columns is too small"));
    }
    if params.n_cols > 60 {
        return Err(GameError::validation("Number of columns must be at or below 60"));
    }
    if params.n_rows <= 5 {
        return Err(GameError::validation("Number of rows is too small"));
    }
    if params.n_rows > 60 {
        return Err(GameError::validation("Number of rows must be at or below 60"));
    }
    if params.n_mines < 1 {
        return Err(GameError::validation("Number of mines is too small"));
    }
    if params.n_mines >= params.n_rows * params.n_cols - 9 {
        return Err(GameError::validation("Number of mines is too big"));
    }
    Ok(())
}

#[derive(PartialEq, Eq, Debug)]
pub enum OpenOutcome {
    Lost,
    Won,
    Opened(Vec<CellRecord>),
    Untouched,
}

impl GameService {
    pub fn new(store: Arc<dyn GameStore>, registry: Arc<SessionRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    // A session torn down between the registry lookup and the lock
    // acquisition comes back closed; retry through the registry.
    async fn acquire(&self, code: GameCode) -> OwnedMutexGuard<SessionState> {
        loop {
            let session = self.registry.get_or_create(code);
            let state = session.lock_owned().await;
            if !state.is_closed() {
                return state;
            }
        }
    }

    #[instrument(level = "trace", skip(self, request), fields(code = request.code))]
    pub async fn create_game(&self, request: &CreateRequest) -> Result<(), GameError> {
        validate_params(&request.params())?;
        self.store.create_game(GameRecord::from(request)).await?;
        info!(
            "Created game {}: {}x{} with {} mines",
            request.code, request.n_cols, request.n_rows, request.n_mines
        );
        Ok(())
    }

    pub async fn game_exists(&self, code: GameCode) -> Result<bool, GameError> {
        self.store.game_exists(code).await
    }

    pub async fn fetch_cell(&self, code: GameCode, pos: Pos) -> Result<CellRecord, GameError> {
        self.store
            .cell(code, pos.col, pos.row)
            .await?
            .ok_or(GameError::CellNotFound {
                code,
                col: pos.col,
                row: pos.row,
            })
    }

    // A terminal outcome here leaves the stored game in place; only the
    // realtime surface wipes finished games.
    #[instrument(level = "trace", skip(self), fields(col = pos.col, row = pos.row))]
    pub async fn open_cell(
        &self,
        code: GameCode,
        pos: Pos,
        mode: OpenMode,
    ) -> Result<OpenOutcome, GameError> {
        let _state = self.acquire(code).await;
        self.open_on_store(code, pos, mode).await
    }

    #[instrument(level = "trace", skip(self), fields(col = pos.col, row = pos.row))]
    pub async fn flag_cell(&self, code: GameCode, pos: Pos) -> Result<FlagUpdate, GameError> {
        let _state = self.acquire(code).await;
        self.flag_on_store(code, pos).await
    }

    // Snapshot and registration happen under one lock hold; no event can
    // slip between the two.
    pub async fn connect(&self, code: GameCode, sink: WsSink) -> Option<ConnectionId> {
        let mut state = self.acquire(code).await;
        match self.snapshot(code).await {
            Ok(Some(welcome)) => Some(state.register(sink, &welcome).await),
            Ok(None) => {
                debug!("Rejected connection to unknown game {}", code);
                let rejection = GameError::GameNotFound { code };
                session::send_once(sink, &GameEvent::error(rejection.to_string())).await;
                None
            }
            Err(error) => {
                warn!("Failed to build snapshot of game {}: {}", code, error);
                session::send_once(sink, &GameEvent::error(error.to_string())).await;
                None
            }
        }
    }

    pub async fn disconnect(&self, code: GameCode, id: ConnectionId) {
        self.registry.detach(code, id).await;
    }

    // A terminal outcome wipes the stored game before the broadcast; the
    // code is free again by the time anyone sees the final event.
    #[instrument(level = "trace", skip(self, player, conn), fields(col = pos.col, row = pos.row))]
    pub async fn live_open(&self, code: GameCode, pos: Pos, player: &str, conn: ConnectionId) {
        let mut state = self.acquire(code).await;
        state.touch();

        match self.prepare_field(code, pos).await {
            Ok(Some(records)) => {
                state.broadcast(&GameEvent::FieldCreated { field: records }).await;
            }
            Ok(None) => {}
            Err(error) => {
                debug!("Open in game {} rejected: {}", code, error);
                state.send_to(&conn, &GameEvent::error(error.to_string())).await;
                return;
            }
        }

        match self.open_on_store(code, pos, OpenMode::Cascade).await {
            Ok(OpenOutcome::Opened(records)) => {
                state.broadcast(&GameEvent::Opened { opened: records }).await;
            }
            Ok(OpenOutcome::Untouched) => {
                state.broadcast(&GameEvent::Opened { opened: Vec::new() }).await;
            }
            Ok(OpenOutcome::Won) => {
                self.wipe(code).await;
                state.broadcast(&GameEvent::won()).await;
                info!("Game {} won", code);
            }
            Ok(OpenOutcome::Lost) => {
                self.wipe(code).await;
                state.broadcast(&GameEvent::lost(player)).await;
                info!("Game {} lost", code);
            }
            Err(error) => {
                debug!("Open in game {} rejected: {}", code, error);
                state.send_to(&conn, &GameEvent::error(error.to_string())).await;
            }
        }
    }

    // Rejections go back to the sender only; applied toggles go to the
    // whole session.
    #[instrument(level = "trace", skip(self, conn), fields(col = pos.col, row = pos.row))]
    pub async fn live_flag(&self, code: GameCode, pos: Pos, conn: ConnectionId) {
        let mut state = self.acquire(code).await;
        state.touch();

        if let Err(error) = self.ensure_flaggable(code).await {
            debug!("Flag in game {} rejected: {}", code, error);
            state.send_to(&conn, &GameEvent::error(error.to_string())).await;
            return;
        }
        match self.flag_on_store(code, pos).await {
            Ok(update) => state.broadcast(&GameEvent::Flagged { flagged: update }).await,
            Err(error) => {
                debug!("Flag in game {} rejected: {}", code, error);
                state.send_to(&conn, &GameEvent::error(error.to_string())).await;
            }
        }
    }

    // The new field appears on the next first open.
    #[instrument(level = "trace", skip(self, conn))]
    pub async fn live_restart(&self, code: GameCode, params: GameParams, conn: ConnectionId) {
        let mut state = self.acquire(code).await;
        state.touch();

        if let Err(error) = validate_params(&params) {
            debug!("Restart of game {} rejected: {}", code, error);
            state.send_to(&conn, &GameEvent::error(error.to_string())).await;
            return;
        }

        let replaced: Result<(), GameError> = async {
            self.store.delete_game(code).await?;
            self.store
                .create_game(GameRecord {
                    code,
                    n_cols: params.n_cols,
                    n_rows: params.n_rows,
                    solvable: false,
                    n_mines: params.n_mines,
                })
                .await
        }
        .await;
        if let Err(error) = replaced {
            warn!("Restart of game {} failed: {}", code, error);
            state.send_to(&conn, &GameEvent::error(error.to_string())).await;
            return;
        }

        state
            .broadcast(&GameEvent::FieldPending {
                n_cols: params.n_cols,
                n_rows: params.n_rows,
                n_mines: params.n_mines,
            })
            .await;
        info!(
            "Restarted game {}: {}x{} with {} mines",
            code, params.n_cols, params.n_rows, params.n_mines
        );
    }

    async fn snapshot(&self, code: GameCode) -> Result<Option<GameEvent>, GameError> {
        let Some(game) = self.store.game(code).await? else {
            return Ok(None);
        };
        let records = self.store.cells(code).await?;
        if records.is_empty() {
            Ok(Some(GameEvent::FieldPending {
                n_cols: game.n_cols,
                n_rows: game.n_rows,
                n_mines: game.n_mines,
            }))
        } else {
            Ok(Some(GameEvent::FieldSnapshot {
                field: records,
                n_cols: game.n_cols,
                n_rows: game.n_rows,
                n_mines: game.n_mines,
            }))
        }
    }

    // Returns the fresh records for the creation broadcast when this open
    // was the one that generated the field.
    async fn prepare_field(
        &self,
        code: GameCode,
        start: Pos,
    ) -> Result<Option<Vec<CellRecord>>, GameError> {
        let Some(game) = self.store.game(code).await? else {
            return Err(GameError::GameNotFound { code });
        };
        if start.col >= game.n_cols || start.row >= game.n_rows {
            return Err(GameError::CellNotFound {
                code,
                col: start.col,
                row: start.row,
            });
        }
        if self.store.has_cells(code).await? {
            return Ok(None);
        }

        let field = Field::generate(code, game.n_cols, game.n_rows, start, Some(game.n_mines))?;
        let records = field.records();
        self.store.insert_cells(code, records.clone()).await?;
        info!(
            "Generated field of game {} around ({}, {})",
            code, start.col, start.row
        );
        Ok(Some(records))
    }

    async fn open_on_store(
        &self,
        code: GameCode,
        pos: Pos,
        mode: OpenMode,
    ) -> Result<OpenOutcome, GameError> {
        let mut field = self.load_field(code, pos).await?;
        match field.open(pos, mode) {
            RevealResult::Lost => Ok(OpenOutcome::Lost),
            RevealResult::AlreadyResolved => Ok(OpenOutcome::Untouched),
            RevealResult::Revealed(positions) => {
                let records = self.commit(code, &field, &positions).await?;
                Ok(OpenOutcome::Opened(records))
            }
            RevealResult::Won(positions) => {
                self.commit(code, &field, &positions).await?;
                Ok(OpenOutcome::Won)
            }
        }
    }

    async fn flag_on_store(&self, code: GameCode, pos: Pos) -> Result<FlagUpdate, GameError> {
        let mut field = self.load_field(code, pos).await?;
        match field.toggle_flag(pos) {
            FlagResult::AlreadyOpened => Ok(FlagUpdate::already_opened()),
            FlagResult::Removed => {
                self.commit(code, &field, &[pos]).await?;
                Ok(FlagUpdate::removed(pos.col, pos.row))
            }
            FlagResult::Set => {
                self.commit(code, &field, &[pos]).await?;
                Ok(FlagUpdate::set(pos.col, pos.row))
            }
        }
    }

    async fn load_field(&self, code: GameCode, pos: Pos) -> Result<Field, GameError> {
        let Some(game) = self.store.game(code).await? else {
            return Err(GameError::GameNotFound { code });
        };
        let records = self.store.cells(code).await?;
        if records.is_empty() {
            return Err(GameError::CellNotFound {
                code,
                col: pos.col,
                row: pos.row,
            });
        }
        let field = Field::from_records(&game, &records)?;
        if !field.contains(pos) {
            return Err(GameError::CellNotFound {
                code,
                col: pos.col,
                row: pos.row,
            });
        }
        Ok(field)
    }

    async fn commit(
        &self,
        code: GameCode,
        field: &Field,
        positions: &[Pos],
    ) -> Result<Vec<CellRecord>, GameError> {
        let records: Vec<CellRecord> = positions.iter().map(|&pos| field.record_at(pos)).collect();
        self.store.write_cells(code, &records).await?;
        Ok(records)
    }

    async fn ensure_flaggable(&self, code: GameCode) -> Result<(), GameError> {
        if self.store.game(code).await?.is_none() {
            return Err(GameError::GameNotFound { code });
        }
        if !self.store.has_cells(code).await? {
            return Err(GameError::validation("Can't set a flag on the first move"));
        }
        Ok(())
    }

    async fn wipe(&self, code: GameCode) {
        if let Err(error) = self.store.delete_game(code).await {
            warn!("Failed to wipe finished game {}: {}", code, error);
        }
    }
}
