// src/utils/env.rs
use log::{debug, info};
use std::env;
use std::str::FromStr;

/// Load variables from a `.env` file if one is present.
pub fn load_env() {
    match dotenv::dotenv() {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) => debug!("No .env file loaded: {}", e),
    }
}

/// Read and parse an environment variable, falling back to `default` when the
/// variable is missing or does not parse.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        env::set_var("RESOLVER_TEST_ENV_OR_NUMBER", "not-a-number");
        assert_eq!(env_or("RESOLVER_TEST_ENV_OR_NUMBER", 7usize), 7);
        env::set_var("RESOLVER_TEST_ENV_OR_NUMBER", " 12 ");
        assert_eq!(env_or("RESOLVER_TEST_ENV_OR_NUMBER", 7usize), 12);
        env::remove_var("RESOLVER_TEST_ENV_OR_NUMBER");
        assert_eq!(env_or("RESOLVER_TEST_ENV_OR_NUMBER", 7usize), 7);
    }
}
