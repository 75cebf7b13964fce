//! Connection string helpers.

use url::Url;

/// Strip a driver suffix from a DSN scheme: `mysql+aiomysql://` becomes `mysql://`.
pub fn normalize_dsn_scheme(dsn: &str) -> String {
    match dsn.split_once("://") {
        Some((scheme, rest)) if scheme.contains('+') => {
            let base = scheme.split('+').next().unwrap_or(scheme);
            format!("{base}://{rest}")
        }
        _ => dsn.to_string(),
    }
}

/// Render a connection string for logs with the password replaced.
pub fn redact_credentials(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() && url.set_password(Some("***")).is_err() {
                return "<unparseable url>".to_string();
            }
            url.to_string()
        }
        Err(_) => "<unparseable url>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_dsn_scheme() {
        assert_eq!(
            normalize_dsn_scheme("mysql+aiomysql://u:p@db/app"),
            "mysql://u:p@db/app"
        );
        assert_eq!(normalize_dsn_scheme("redis://cache:6379/0"), "redis://cache:6379/0");
    }

    #[test]
    fn test_redact_credentials() {
        assert_eq!(
            redact_credentials("amqp://guest:guest@mq:5672/%2f"),
            "amqp://guest:***@mq:5672/%2f"
        );
        assert_eq!(redact_credentials("redis://cache:6379"), "redis://cache:6379");
        assert_eq!(redact_credentials("not a url"), "<unparseable url>");
    }
}
