use std::{env, sync::Arc, time::Duration};

use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Build, Rocket};
use tokio::time;
use tracing::info;

use crate::logic::GameService;
use crate::session::SessionRegistry;

fn env_seconds(name: &str, default: u64) -> u64 {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or(default)
}

// Reaps only the realtime session state; the stored games stay.
pub async fn start_cleanup_task(registry: Arc<SessionRegistry>) {
    let cleanup_interval_secs = env_seconds("CLEANUP_INTERVAL_SECONDS", 60);
    let idle_timeout = Duration::from_secs(env_seconds("INACTIVE_SESSION_TIMEOUT_SECONDS", 600));
    let stale_timeout = Duration::from_secs(env_seconds("ACTIVE_SESSION_TIMEOUT_SECONDS", 86_400));

    let mut interval = time::interval(Duration::from_secs(cleanup_interval_secs));

    info!(
        "Started session cleanup task: checking every {}s, idle timeout: {}s, stale timeout: {}s",
        cleanup_interval_secs,
        idle_timeout.as_secs(),
        stale_timeout.as_secs()
    );

    loop {
        interval.tick().await;
        let reaped = registry.reap_stale(idle_timeout, stale_timeout);
        if reaped > 0 {
            info!("Cleaned up {} stale sessions", reaped);
        }
    }
}

pub struct JanitorFairing;

#[rocket::async_trait]
impl Fairing for JanitorFairing {
    fn info(&self) -> Info {
        Info {
            name: "Session Cleanup Task",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        if let Some(service) = rocket.state::<GameService>() {
            let registry = service.registry();
            tokio::spawn(async move {
                start_cleanup_task(registry).await;
            });
        }
        Ok(rocket)
    }
}
