use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub workers: usize,
    pub server_port: u16,
    pub default_processor_url: String,
    pub fallback_processor_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            redis_url: normalize_redis_url(
                &env::var("REDIS_URL").unwrap_or_else(|_| "localhost:6379".to_string()),
            ),
            workers: env::var("WORKERS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .unwrap_or(20),
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            default_processor_url: env::var("DEFAULT_PROCESSOR_URL")
                .unwrap_or_else(|_| "http://payment-processor-default:8080".to_string()),
            fallback_processor_url: env::var("FALLBACK_PROCESSOR_URL")
                .unwrap_or_else(|_| "http://payment-processor-fallback:8080".to_string()),
        }
    }
}

// O client redis espera uma URL completa; o deployment passa host:port
// ou já com o prefixo redis://
pub fn normalize_redis_url(raw: &str) -> String {
    if raw.starts_with("redis://") {
        raw.to_string()
    } else {
        format!("redis://{}", raw)
    }
}
