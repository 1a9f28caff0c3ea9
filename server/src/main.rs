use std::sync::Arc;

use multisweeper_server::logic::GameService;
use multisweeper_server::session::SessionRegistry;
use multisweeper_server::store::MemoryStore;
use rocket::{Build, Rocket};
use tracing::info;

#[rocket::launch]
fn rocket() -> Rocket<Build> {
    tracing_subscriber::fmt::init();
    info!("Starting multisweeper server");

    let service = GameService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(SessionRegistry::new()),
    );

    let rocket = multisweeper_server::rocket(service);
    info!("Endpoints: POST /create, POST /join, GET /field/..., GET /ws/game/<code>");
    rocket
}
