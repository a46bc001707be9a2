use crate::domain::model::CommuteAddress;
use crate::utils::error::{Result, SyncError};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(SyncError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(SyncError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(SyncError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(SyncError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(SyncError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(SyncError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SyncError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_address_ids(field_name: &str, addresses: &[CommuteAddress]) -> Result<()> {
    let mut seen = HashSet::new();
    for address in addresses {
        if address.id.trim().is_empty() {
            return Err(SyncError::ValidationError {
                field: field_name.to_string(),
                value: address.id.clone(),
                reason: "Address id cannot be empty".to_string(),
            });
        }
        if !seen.insert(address.id.as_str()) {
            return Err(SyncError::ValidationError {
                field: field_name.to_string(),
                value: address.id.clone(),
                reason: "Duplicate address id".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("api.base_url", "https://example.com").is_ok());
        assert!(validate_url("api.base_url", "http://localhost:5002").is_ok());
        assert!(validate_url("api.base_url", "").is_err());
        assert!(validate_url("api.base_url", "invalid-url").is_err());
        assert!(validate_url("api.base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("api.timeout_seconds", 5, 1).is_ok());
        assert!(validate_positive_number("api.timeout_seconds", 0, 1).is_err());
    }

    #[test]
    fn test_validate_address_ids() {
        let unique = vec![
            CommuteAddress::new("home", "Damrak 1, Amsterdam"),
            CommuteAddress::new("work", "Coolsingel 40, Rotterdam"),
        ];
        assert!(validate_address_ids("addresses", &unique).is_ok());

        let duplicated = vec![
            CommuteAddress::new("home", "Damrak 1, Amsterdam"),
            CommuteAddress::new("home", "Coolsingel 40, Rotterdam"),
        ];
        assert!(matches!(
            validate_address_ids("addresses", &duplicated),
            Err(SyncError::ValidationError { .. })
        ));

        let blank = vec![CommuteAddress::new("  ", "Nowhere")];
        assert!(matches!(
            validate_address_ids("addresses", &blank),
            Err(SyncError::ValidationError { .. })
        ));
    }
}
