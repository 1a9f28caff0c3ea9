use rocket::futures::StreamExt;
use rocket::{State, get};
use rocket_ws::{Channel, Message, WebSocket};
use tracing::{debug, error, info, instrument, warn};

use multisweeper_common::models::{GameCode, GameParams, Pos};
use multisweeper_common::protocol::ClientIntent;

use crate::logic::GameService;

// Unknown codes are accepted at the handshake and answered with an error
// event before the socket closes.
#[get("/ws/game/<code>")]
#[instrument(level = "trace", skip(ws, service))]
pub fn game_socket(ws: WebSocket, code: GameCode, service: &State<GameService>) -> Channel<'static> {
    let service = service.inner().clone();

    ws.channel(move |stream| {
        Box::pin(async move {
            let (write, mut read) = stream.split();

            let Some(connection) = service.connect(code, write).await else {
                return Ok(());
            };

            // Attribution for loss broadcasts, set by the name intent.
            let mut player_name = String::new();

            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ClientIntent>(&text) {
                        Ok(ClientIntent::Open { col, row }) => {
                            debug!("Opening ({}, {}) in game {}", col, row, code);
                            service
                                .live_open(code, Pos::new(col, row), &player_name, connection)
                                .await;
                        }
                        Ok(ClientIntent::Flag { col, row }) => {
                            debug!("Flagging ({}, {}) in game {}", col, row, code);
                            service.live_flag(code, Pos::new(col, row), connection).await;
                        }
                        Ok(ClientIntent::Restart {
                            n_cols,
                            n_rows,
                            n_mines,
                        }) => {
                            info!(
                                "Restart of game {} requested: {}x{} with {} mines",
                                code, n_cols, n_rows, n_mines
                            );
                            service
                                .live_restart(
                                    code,
                                    GameParams {
                                        n_cols,
                                        n_rows,
                                        n_mines,
                                    },
                                    connection,
                                )
                                .await;
                        }
                        Ok(ClientIntent::Name { name }) => {
                            debug!("Connection {} in game {} is now named {}", connection, code, name);
                            player_name = name;
                        }
                        Err(e) => {
                            warn!(
                                "Invalid message format in game {}: {} - Error: {}",
                                code, text, e
                            );
                        }
                    },
                    Ok(Message::Close(_)) => {
                        info!(
                            "WebSocket connection closed for game {} (connection: {})",
                            code, connection
                        );
                        break;
                    }
                    Ok(_) => {
                        debug!("Received non-text message in game {}, ignoring", code);
                    }
                    Err(e) => {
                        error!(
                            "WebSocket error in game {} (connection: {}): {}",
                            code, connection, e
                        );
                        break;
                    }
                }
            }

            service.disconnect(code, connection).await;
            info!(
                "Client disconnected from game {} (connection: {})",
                code, connection
            );
            Ok(())
        })
    })
}
