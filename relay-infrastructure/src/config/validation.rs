use anyhow::{anyhow, Result};

pub fn validate_upstream_url(value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("upstream event url is empty"));
    }
    if !trimmed.starts_with("ws://") && !trimmed.starts_with("wss://") {
        return Err(anyhow!(
            "upstream event url must start with ws:// or wss://: {}",
            trimmed
        ));
    }
    Ok(())
}

pub fn validate_capacity(value: usize, field: &str) -> Result<()> {
    if value == 0 {
        return Err(anyhow!("{} must be greater than 0", field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_url_requires_websocket_scheme() {
        assert!(validate_upstream_url("ws://127.0.0.1:9000/events").is_ok());
        assert!(validate_upstream_url("wss://feed.example.com").is_ok());
        assert!(validate_upstream_url("http://feed.example.com").is_err());
        assert!(validate_upstream_url("  ").is_err());
    }

    #[test]
    fn capacity_must_be_positive() {
        assert!(validate_capacity(1, "connection_queue_capacity").is_ok());
        assert!(validate_capacity(0, "connection_queue_capacity").is_err());
    }
}
