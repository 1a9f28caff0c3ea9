mod ws;

pub use ws::game_socket;

use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, get, post, put};
use tracing::{info, instrument, warn};

use multisweeper_common::models::{
    CellRecord, CreateRequest, CreateResponse, ErrorResponse, GameCode, JoinRequest, JoinResponse,
    Pos,
};
use multisweeper_common::protocol::{FlagUpdate, OpenResponse};

use crate::error::GameError;
use crate::field::OpenMode;
use crate::logic::{GameService, OpenOutcome};
use crate::rate_limit::{ClientIp, RateLimiter};

type ErrorBody = (Status, Json<ErrorResponse>);

fn error_response(error: GameError) -> ErrorBody {
    let status = match &error {
        GameError::GameNotFound { .. } | GameError::CellNotFound { .. } => Status::NotFound,
        GameError::Validation { .. } | GameError::GameExists { .. } => Status::UnprocessableEntity,
        GameError::InsufficientEligibleCells { .. } | GameError::CorruptedField { .. } => {
            Status::InternalServerError
        }
    };
    (status, Json(ErrorResponse::new(error.to_string())))
}

#[post("/create", data = "<request>")]
#[instrument(level = "trace", skip_all, fields(client_ip = %client_ip.0, code = request.code))]
pub async fn create_game(
    request: Json<CreateRequest>,
    service: &State<GameService>,
    rate_limiter: &State<RateLimiter>,
    client_ip: ClientIp,
) -> Result<Json<CreateResponse>, Status> {
    info!(
        "Game creation request from {}: code {} ({}x{} with {} mines)",
        client_ip.0, request.code, request.n_cols, request.n_rows, request.n_mines
    );
    rate_limiter.check(client_ip.0)?;

    match service.create_game(&request).await {
        Ok(()) => Ok(Json(CreateResponse::created())),
        Err(error @ (GameError::Validation { .. } | GameError::GameExists { .. })) => {
            Ok(Json(CreateResponse::rejected(error.to_string())))
        }
        Err(error) => {
            warn!("Game creation for code {} failed: {}", request.code, error);
            Err(Status::InternalServerError)
        }
    }
}

#[post("/join", data = "<request>")]
#[instrument(level = "trace", skip(service, request), fields(code = request.code))]
pub async fn join_game(
    request: Json<JoinRequest>,
    service: &State<GameService>,
) -> Result<Json<JoinResponse>, Status> {
    match service.game_exists(request.code).await {
        Ok(exists) => Ok(Json(JoinResponse { exists })),
        Err(error) => {
            warn!("Join check for code {} failed: {}", request.code, error);
            Err(Status::InternalServerError)
        }
    }
}

#[get("/field/<code>/<col>/<row>")]
#[instrument(level = "trace", skip(service))]
pub async fn get_cell(
    code: GameCode,
    col: usize,
    row: usize,
    service: &State<GameService>,
) -> Result<Json<CellRecord>, ErrorBody> {
    service
        .fetch_cell(code, Pos::new(col, row))
        .await
        .map(Json)
        .map_err(error_response)
}

#[get("/field/open/<code>/<col>/<row>?<double_click>")]
#[instrument(level = "trace", skip(service))]
pub async fn open_cell(
    code: GameCode,
    col: usize,
    row: usize,
    double_click: Option<bool>,
    service: &State<GameService>,
) -> Result<Json<OpenResponse>, ErrorBody> {
    let mode = if double_click.unwrap_or(false) {
        OpenMode::Direct
    } else {
        OpenMode::Cascade
    };

    match service.open_cell(code, Pos::new(col, row), mode).await {
        Ok(OpenOutcome::Opened(records)) => Ok(Json(OpenResponse::Opened(records))),
        Ok(OpenOutcome::Untouched) if mode == OpenMode::Direct => Ok(Json(OpenResponse::Null)),
        Ok(OpenOutcome::Untouched) => Ok(Json(OpenResponse::Opened(Vec::new()))),
        Ok(OpenOutcome::Lost) => Ok(Json(OpenResponse::loss())),
        Ok(OpenOutcome::Won) => Ok(Json(OpenResponse::win())),
        Err(error) => Err(error_response(error)),
    }
}

#[put("/field/set-flag/<code>/<col>/<row>")]
#[instrument(level = "trace", skip(service))]
pub async fn set_flag(
    code: GameCode,
    col: usize,
    row: usize,
    service: &State<GameService>,
) -> Result<Json<FlagUpdate>, ErrorBody> {
    service
        .flag_cell(code, Pos::new(col, row))
        .await
        .map(Json)
        .map_err(error_response)
}
