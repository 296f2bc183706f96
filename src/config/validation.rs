//! Configuration validation.

use std::fmt;

use crate::config::schema::ServerConfig;

/// One validation failure, with enough context to fix the config file.
#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a loaded configuration. Returns every problem found, not just
/// the first.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address".to_string(),
            message: format!("'{}' is not a valid socket address", config.listener.bind_address),
        });
    }
    if config.limits.max_upload_bytes == 0 {
        errors.push(ValidationError {
            field: "limits.max_upload_bytes".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    if config.limits.request_timeout_secs == 0 {
        errors.push(ValidationError {
            field: "limits.request_timeout_secs".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    if config.expiry.ttl_secs == 0 {
        errors.push(ValidationError {
            field: "expiry.ttl_secs".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    if config.expiry.sweep_interval_secs == 0 {
        errors.push(ValidationError {
            field: "expiry.sweep_interval_secs".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    if config.storage.data_dir == config.storage.premium_data_dir {
        errors.push(ValidationError {
            field: "storage.premium_data_dir".to_string(),
            message: "must differ from storage.data_dir (data_dir is wiped at startup)".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
