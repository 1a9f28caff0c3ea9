pub mod cleanup;
pub mod cors;
pub mod error;
pub mod field;
pub mod logic;
pub mod rate_limit;
pub mod routes;
pub mod session;
pub mod store;

use rocket::{Build, Rocket, routes};

use crate::cleanup::JanitorFairing;
use crate::logic::GameService;
use crate::rate_limit::RateLimiter;

pub fn rocket(service: GameService) -> Rocket<Build> {
    rocket::build()
        .attach(cors::create_cors())
        .attach(JanitorFairing)
        .manage(service)
        .manage(RateLimiter::new())
        .mount(
            "/",
            routes![
                routes::create_game,
                routes::join_game,
                routes::get_cell,
                routes::open_cell,
                routes::set_flag,
                routes::game_socket,
            ],
        )
}
