//! Configuration validation logic.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};

/// Host that serves `pin.it` short links.
const SHORT_HOST: &str = "https://pin.it";

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]{3,30}$").unwrap());

static PIN_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://(?:www\.|\w+\.)?pinterest\.[a-z.]+/pin/(\d{16,21})/?|https?://(?:www\.)?pin\.it/([a-zA-Z0-9]+)/?|(\d{16,21}))$",
    )
    .unwrap()
});

/// How a pin reference was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinRefFormat {
    Long,
    Short,
    Id,
}

/// A parsed pin reference and the page to fetch for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinRef {
    pub format: PinRefFormat,
    /// Pin id, or the short code for `pin.it` links.
    pub id: String,
    pub url: String,
}

impl PinRef {
    /// Pin id when the reference carries one directly.
    pub fn pin_id(&self) -> Option<&str> {
        match self.format {
            PinRefFormat::Short => None,
            PinRefFormat::Long | PinRefFormat::Id => Some(&self.id),
        }
    }
}

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_host(&config.site.host)?;

    if config.site.user_agent.trim().is_empty() {
        return Err(Error::ConfigValidation {
            field: "user_agent".to_string(),
            message: "User agent must not be empty".to_string(),
        });
    }

    if config.options.pages == 0 {
        return Err(Error::ConfigValidation {
            field: "pages".to_string(),
            message: "Page budget must be at least 1".to_string(),
        });
    }

    if config.retry.max_attempts == 0 {
        return Err(Error::ConfigValidation {
            field: "max_attempts".to_string(),
            message: "At least one attempt is required".to_string(),
        });
    }

    Ok(())
}

fn validate_host(host: &str) -> Result<()> {
    let url = Url::parse(host).map_err(|e| Error::ConfigValidation {
        field: "host".to_string(),
        message: format!("'{}' is not a valid URL: {}", host, e),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::ConfigValidation {
            field: "host".to_string(),
            message: format!("Host must use http or https (got '{}')", url.scheme()),
        });
    }

    Ok(())
}

/// Validate a creator username and return it without a leading `@`.
pub fn validate_username(username: &str) -> Result<String> {
    let clean = username.trim().trim_start_matches('@');

    if !USERNAME_PATTERN.is_match(clean) {
        return Err(Error::ConfigValidation {
            field: "username".to_string(),
            message: format!(
                "Username '{}' is invalid. Use 3-30 letters, digits, '.', '-' or '_'.",
                username
            ),
        });
    }

    Ok(clean.to_string())
}

/// Parse a pin url, `pin.it` short link, or bare 16-21 digit id.
///
/// Bare ids are expanded to `{host}/pin/{id}/`.
pub fn parse_pin_ref(input: &str, host: &str) -> Result<PinRef> {
    let input = input.trim();

    let captures = PIN_URL_PATTERN
        .captures(input)
        .ok_or_else(|| Error::InvalidPinRef(input.to_string()))?;

    if let Some(id) = captures.get(1) {
        return Ok(PinRef {
            format: PinRefFormat::Long,
            id: id.as_str().to_string(),
            url: input.to_string(),
        });
    }

    if let Some(code) = captures.get(2) {
        return Ok(PinRef {
            format: PinRefFormat::Short,
            id: code.as_str().to_string(),
            url: format!("{}/{}/", SHORT_HOST, code.as_str()),
        });
    }

    match captures.get(3) {
        Some(id) => Ok(PinRef {
            format: PinRefFormat::Id,
            id: id.as_str().to_string(),
            url: format!("{}/pin/{}/", host.trim_end_matches('/'), id.as_str()),
        }),
        None => Err(Error::InvalidPinRef(input.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "https://id.pinterest.com";

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_pages_rejected() {
        let mut config = Config::default();
        config.options.pages = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { ref field, .. } if field == "pages"));
    }

    #[test]
    fn test_bad_host_rejected() {
        let mut config = Config::default();
        config.site.host = "ftp://pinterest.com".into();
        assert!(validate_config(&config).is_err());

        config.site.host = "not a url".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_username() {
        assert_eq!(validate_username("@artist_01").unwrap(), "artist_01");
        assert_eq!(validate_username("some.one").unwrap(), "some.one");
        assert!(validate_username("ab").is_err());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("../etc").is_err());
    }

    #[test]
    fn test_long_pin_url() {
        let pin = parse_pin_ref("https://www.pinterest.com/pin/1234567890123456/", HOST).unwrap();
        assert_eq!(pin.format, PinRefFormat::Long);
        assert_eq!(pin.pin_id(), Some("1234567890123456"));
        assert_eq!(pin.url, "https://www.pinterest.com/pin/1234567890123456/");

        let regional = parse_pin_ref("https://id.pinterest.com/pin/123456789012345678", HOST).unwrap();
        assert_eq!(regional.id, "123456789012345678");
    }

    #[test]
    fn test_short_link() {
        let pin = parse_pin_ref("https://pin.it/4AbCdEf", HOST).unwrap();
        assert_eq!(pin.format, PinRefFormat::Short);
        assert_eq!(pin.id, "4AbCdEf");
        assert_eq!(pin.pin_id(), None);
        assert_eq!(pin.url, "https://pin.it/4AbCdEf/");
    }

    #[test]
    fn test_bare_id_expands_to_host() {
        let pin = parse_pin_ref(" 1234567890123456 ", "https://id.pinterest.com/").unwrap();
        assert_eq!(pin.format, PinRefFormat::Id);
        assert_eq!(pin.url, "https://id.pinterest.com/pin/1234567890123456/");
    }

    #[test]
    fn test_invalid_pin_refs() {
        for input in [
            "",
            "12345",
            "1234567890123456789012",
            "https://example.com/pin/1234567890123456/",
            "https://www.pinterest.com/artist/",
        ] {
            assert!(
                matches!(parse_pin_ref(input, HOST), Err(Error::InvalidPinRef(_))),
                "{input:?} should be rejected"
            );
        }
    }
}
