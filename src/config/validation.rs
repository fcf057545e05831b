//! Semantic checks that serde cannot express.

use crate::config::schema::HopperConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a merged config, collecting every problem rather than stopping at the first.
pub fn validate_config(config: &HopperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(message) = check_address(&config.listen) {
        errors.push(ValidationError { field: "listen", message });
    }
    if let Some(addr) = &config.metrics_listen {
        if let Err(message) = check_address(addr) {
            errors.push(ValidationError { field: "metrics_listen", message });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `host:port` or `:port`, with a numeric port.
fn check_address(addr: &str) -> Result<(), String> {
    if addr.trim().is_empty() {
        return Err("address is empty".to_string());
    }
    let Some((_, port)) = addr.rsplit_once(':') else {
        return Err(format!("'{}' has no port", addr));
    };
    port.parse::<u16>()
        .map(|_| ())
        .map_err(|_| format!("'{}' is not a valid port", port))
}
