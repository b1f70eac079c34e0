//! Layered application configuration.
//!
//! Sources, later ones overriding earlier ones:
//! built-in defaults, `config/crm.toml` (optional), then `CRM__*`
//! environment variables with `__` separating nested keys, e.g.
//! `CRM__DATABASE__URL` or `CRM__NOTIFIER__KIND=smtp`.

use config::{Config, ConfigError, Environment, File};
use crm_db::DbConfig;
use crm_leads::{CrmConfig, SmtpConfig};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DbConfig,
    pub leads: CrmConfig,
    pub notifier: NotifierConfig,
    /// Server-side pepper mixed into password hashes.
    pub password_pepper: Option<String>,
    /// Default `tracing` directive when `RUST_LOG` is unset.
    pub log_level: Option<String>,
}

/// Which notifier delivers outbound messages.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotifierConfig {
    /// Log notifications instead of sending them.
    #[default]
    Log,
    Smtp(SmtpConfig),
}

impl AppConfig {
    /// Load `.env`, then build the layered configuration.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name("config/crm").required(false))
                .add_source(
                    Environment::with_prefix("CRM")
                        .separator("__")
                        .try_parsing(true)
                        .list_separator(",")
                        .with_list_parse_key("leads.notification.lead_created_to"),
                ),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn parse(toml: &str) -> AppConfig {
        AppConfig::from_builder(
            Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
        )
        .unwrap()
    }

    #[test]
    fn empty_source_yields_defaults() {
        let config = parse("");
        assert_eq!(config.database.namespace, "crm");
        assert_eq!(config.leads.min_password_length, 8);
        assert!(matches!(config.notifier, NotifierConfig::Log));
        assert!(config.password_pepper.is_none());
    }

    #[test]
    fn nested_values_override_defaults() {
        let config = parse(
            r#"
            [database]
            url = "db.internal:8000"

            [leads.notification]
            lead_created_to = ["ops@example.com", "sales@example.com"]

            [notifier]
            kind = "smtp"
            host = "smtp.example.com"
            port = 2525
            starttls = false
            "#,
        );

        assert_eq!(config.database.url, "db.internal:8000");
        assert_eq!(config.database.database, "main");
        assert_eq!(config.leads.notification.lead_created_to.len(), 2);
        assert_eq!(
            config.leads.notification.lead_created_subject,
            "A lead has been created"
        );
        match config.notifier {
            NotifierConfig::Smtp(smtp) => {
                assert_eq!(smtp.host, "smtp.example.com");
                assert_eq!(smtp.port, 2525);
                assert!(!smtp.starttls);
                assert!(smtp.username.is_none());
            }
            other => panic!("expected smtp notifier, got {other:?}"),
        }
    }
}
