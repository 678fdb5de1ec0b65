use anyhow::Result;

pub struct AppConfig {
    pub database: DatabaseConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        let database = DatabaseConfig {
            host: std::env::var("DATABASE_HOST").unwrap_or_else(|_| "localhost".into()),
            port: std::env::var("DATABASE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5432),
            username: std::env::var("DATABASE_USERNAME").unwrap_or_else(|_| "app".into()),
            password: std::env::var("DATABASE_PASSWORD").unwrap_or_else(|_| "passwd".into()),
            database: std::env::var("DATABASE_NAME").unwrap_or_else(|_| "app".into()),
        };
        Ok(Self { database })
    }
}

pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}
