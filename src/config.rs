use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    // Telegram
    pub telegram_bot_token: Secret<String>,
    pub telegram_chat_id: i64,
    pub telegram_api_url: String,

    // Fio bank
    pub fio_api_token: Secret<String>,
    pub fio_api_url: String,

    // XContest
    pub xcontest_api_url: String,
    pub takeoff: String,

    // Watch schedules (sec min hour day month weekday)
    pub transaction_watch_cron: String,
    pub flight_watch_cron: String,
    pub flight_watch_days_back: i64,

    pub user_agent: String,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Ok(Self {
            database_url: config.get("database_url")?,

            telegram_bot_token: Secret::new(config.get("telegram_bot_token")?),
            telegram_chat_id: config.get("telegram_chat_id")?,
            telegram_api_url: config
                .get("telegram_api_url")
                .unwrap_or_else(|_| "https://api.telegram.org".to_string()),

            fio_api_token: Secret::new(config.get("fio_api_token")?),
            fio_api_url: config
                .get("fio_api_url")
                .unwrap_or_else(|_| "https://fioapi.fio.cz/v1/rest".to_string()),

            xcontest_api_url: config
                .get("xcontest_api_url")
                .unwrap_or_else(|_| "https://www.xcontest.org".to_string()),
            takeoff: config
                .get("takeoff")
                .unwrap_or_else(|_| "doubrava".to_string()),

            // Hourly transactions, flights every day at 20:00.
            transaction_watch_cron: config
                .get("transaction_watch_cron")
                .unwrap_or_else(|_| "0 0 * * * *".to_string()),
            flight_watch_cron: config
                .get("flight_watch_cron")
                .unwrap_or_else(|_| "0 0 20 * * *".to_string()),
            flight_watch_days_back: config.get("flight_watch_days_back").unwrap_or(2),

            user_agent: config
                .get("user_agent")
                .unwrap_or_else(|_| concat!("cashier/", env!("CARGO_PKG_VERSION")).to_string()),
        })
    }
}
