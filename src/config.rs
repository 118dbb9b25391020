use std::env;

use crate::group::ActivityWindow;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    pub activity_window: ActivityWindow,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a number"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            activity_window: parse_activity_window(
                env::var("LOCATION_TIME_LIMIT_HOURS").ok().as_deref(),
            ),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Parse the activity window, falling back to the default on bad input
pub fn parse_activity_window(raw: Option<&str>) -> ActivityWindow {
    let Some(raw) = raw else {
        return ActivityWindow::default();
    };

    match raw.trim().parse::<i64>().ok().and_then(ActivityWindow::from_hours) {
        Some(window) => window,
        None => {
            tracing::warn!(
                value = raw,
                max_hours = ActivityWindow::MAX_HOURS,
                default_hours = ActivityWindow::DEFAULT_HOURS,
                "LOCATION_TIME_LIMIT_HOURS must be a positive integer of at most one year, using default"
            );
            ActivityWindow::default()
        }
    }
}
