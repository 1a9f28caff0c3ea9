use std::env;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rocket::http::Status;
use rocket::request::{self, FromRequest, Request};
use tracing::{debug, warn};

const WINDOW: Duration = Duration::from_secs(60);

// Proxy headers take precedence over the socket address.
pub struct ClientIp(pub IpAddr);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let ip = req
            .headers()
            .get_one("X-Forwarded-For")
            .and_then(|raw| raw.split(',').next())
            .and_then(|ip| ip.trim().parse().ok())
            .or_else(|| {
                req.headers()
                    .get_one("X-Real-IP")
                    .and_then(|ip| ip.parse().ok())
            })
            .or_else(|| req.client_ip())
            .unwrap_or_else(|| "127.0.0.1".parse().unwrap());

        request::Outcome::Success(ClientIp(ip))
    }
}

struct Window {
    started: Instant,
    count: u32,
}

#[derive(Default)]
pub struct RateLimiter {
    windows: DashMap<IpAddr, Window>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, ip: IpAddr) -> Result<(), Status> {
        let limit: u32 = env::var("RATE_LIMIT_GAMES_PER_MINUTE")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let mut window = self.windows.entry(ip).or_insert_with(|| Window {
            started: Instant::now(),
            count: 0,
        });
        if window.started.elapsed() >= WINDOW {
            window.started = Instant::now();
            window.count = 0;
        }
        window.count += 1;

        if window.count > limit {
            warn!("Rate limit exceeded for {} - rejecting request", ip);
            Err(Status::TooManyRequests)
        } else {
            debug!(
                "Rate limit check passed for {} ({}/{} this window)",
                ip, window.count, limit
            );
            Ok(())
        }
    }
}
