use std::env;

/// Local-only fallback for the token signing secret.
pub const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";

/// Port used when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 8080;

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// immutable afterwards; handlers and the auth extractor pull it out of `AppState`
/// through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls which variables are mandatory.
    pub env: Env,
    // Postgres connection string. `None` selects the in-memory store (local only).
    pub db_url: Option<String>,
    // Secret key used to sign and verify issued JWTs.
    pub jwt_secret: String,
    // TCP port the HTTP server binds to.
    pub port: u16,
    // bcrypt work factor applied when hashing signup passwords.
    pub bcrypt_cost: u32,
}

/// Env
///
/// Defines the runtime context. Production refuses to start with missing secrets.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Safe, non-panicking values for test scaffolding. Uses the in-memory store
    /// and the cheapest bcrypt cost so signup/signin tests stay fast.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            port: DEFAULT_PORT,
            bcrypt_cost: 4,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads all parameters from environment variables and implements the **fail-fast**
    /// principle for production.
    ///
    /// # Panics
    /// Panics in production when `SECRET_KEY` or `DATABASE_URL` is missing, and in any
    /// environment when `PORT` or `BCRYPT_COST` is set but unparseable.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match env {
            Env::Production => {
                env::var("SECRET_KEY").expect("FATAL: SECRET_KEY must be set in production.")
            }
            Env::Local => env::var("SECRET_KEY").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
        };

        let db_url = match env {
            Env::Production => Some(
                env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod"),
            ),
            // Without a database the local server runs against the in-memory store.
            Env::Local => env::var("DATABASE_URL").ok(),
        };

        let port = env::var("PORT")
            .map(|p| p.parse().expect("FATAL: PORT must be a valid port number"))
            .unwrap_or(DEFAULT_PORT);

        let bcrypt_cost = env::var("BCRYPT_COST")
            .map(|c| c.parse().expect("FATAL: BCRYPT_COST must be an integer"))
            .unwrap_or(bcrypt::DEFAULT_COST);

        Self {
            env,
            db_url,
            jwt_secret,
            port,
            bcrypt_cost,
        }
    }
}
