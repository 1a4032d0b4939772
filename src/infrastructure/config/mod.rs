use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Immutable service configuration, loaded once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub warehouse: WarehouseConfig,
    pub jwt: JwtConfig,
    pub services: ServicesConfig,
    pub credentials: CredentialsConfig,
    pub templates: TemplateConfig,
    pub environment: EnvironmentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
    pub max_lifetime_seconds: u64,
    pub test_before_acquire: bool,
    pub sqlx_logging: bool,
    pub run_migrations: bool,
}

/// Read-only COLIN warehouse used by the business sync job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Shared secret for HS256 tokens
    pub secret: Option<String>,
    /// PEM public key for RS256 tokens; wins over `secret`
    pub public_key: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

/// Base URLs of sibling services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// OAuth token endpoint used for client-credentials grants
    pub auth_svc_url: String,
    pub auth_api_url: String,
    pub pay_api_url: String,
    pub colin_api_url: String,
    pub notify_api_url: String,
    pub report_api_url: String,
    /// This service's own API, called by the paid-filing job
    pub business_ar_api_url: String,
    /// Public base URL used for document links
    pub business_ar_api_base_url: String,
    /// Front end that reminder links point at
    pub bar_app_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub auth_svc: ClientCredentials,
    pub colin_api: ClientCredentials,
    pub notify_api: ClientCredentials,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub email_template_path: String,
    pub report_template_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub deployment_environment: String,
    pub pod_namespace: String,
    pub legislative_timezone: String,
    pub registrar_name: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok());
        config.environment.legislation_tz()?;
        Ok(config)
    }

    /// Builds configuration from an arbitrary key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let credentials = |prefix: &str| ClientCredentials {
            client_id: lookup(&format!("{prefix}_CLIENT_ID")).unwrap_or_default(),
            client_secret: lookup(&format!("{prefix}_CLIENT_SECRET")).unwrap_or_default(),
        };

        Config {
            database_url: string("DATABASE_URL", "postgresql://localhost/business_ar"),

            server: ServerConfig {
                port: parse_or(lookup("PORT"), 5000),
                host: string("HOST", "0.0.0.0"),
            },

            database: DatabaseConfig {
                max_connections: parse_or(lookup("DB_MAX_CONNECTIONS"), 10),
                min_connections: parse_or(lookup("DB_MIN_CONNECTIONS"), 1),
                acquire_timeout_seconds: parse_or(lookup("DB_ACQUIRE_TIMEOUT"), 30),
                idle_timeout_seconds: parse_or(lookup("DB_IDLE_TIMEOUT"), 600),
                max_lifetime_seconds: parse_or(lookup("DB_MAX_LIFETIME"), 1800),
                test_before_acquire: parse_or(lookup("DB_TEST_BEFORE_ACQUIRE"), true),
                sqlx_logging: parse_or(lookup("DB_SQLX_LOGGING"), false),
                run_migrations: parse_or(lookup("DB_RUN_MIGRATIONS"), false),
            },

            warehouse: WarehouseConfig {
                url: optional("WAREHOUSE_URL"),
            },

            jwt: JwtConfig {
                secret: optional("JWT_SECRET"),
                public_key: optional("JWT_OIDC_PUBLIC_KEY"),
                issuer: optional("JWT_OIDC_ISSUER"),
                audience: optional("JWT_OIDC_AUDIENCE"),
            },

            services: ServicesConfig {
                auth_svc_url: string("AUTH_SVC_URL", "http://localhost:8081/auth/realms/bcregistry/protocol/openid-connect/token"),
                auth_api_url: string("AUTH_API_URL", "http://localhost:8082/api/v1"),
                pay_api_url: string("PAY_API_URL", "http://localhost:8083/api/v1"),
                colin_api_url: string("COLIN_API_URL", "http://localhost:8084/api/v1"),
                notify_api_url: string("NOTIFY_API_URL", "http://localhost:8085/api/v1/notify"),
                report_api_url: string("REPORT_API_URL", "http://localhost:8086/api/v1/reports"),
                business_ar_api_url: string("BUSINESS_AR_API_URL", "http://localhost:5000/v1"),
                business_ar_api_base_url: string("BUSINESS_AR_API_BASE_URL", "http://localhost:5000"),
                bar_app_url: string("BAR_APP_URL", "http://localhost:3000"),
                timeout_seconds: parse_or(lookup("SERVICE_TIMEOUT_SECONDS"), 20),
            },

            credentials: CredentialsConfig {
                auth_svc: credentials("AUTH_SVC"),
                colin_api: credentials("COLIN_API_SVC"),
                notify_api: credentials("NOTIFY_API_SVC"),
            },

            templates: TemplateConfig {
                email_template_path: string("EMAIL_TEMPLATE_PATH", "templates/email"),
                report_template_path: string("REPORT_TEMPLATE_PATH", "templates/report"),
            },

            environment: EnvironmentConfig {
                deployment_environment: string("DEPLOYMENT_ENVIRONMENT", "development"),
                pod_namespace: string("POD_NAMESPACE", "unknown"),
                legislative_timezone: string("LEGISLATIVE_TIMEZONE", "America/Vancouver"),
                registrar_name: string("REGISTRAR_NAME", "Registrar of Companies"),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl EnvironmentConfig {
    /// Timezone used for every date printed to users
    pub fn legislation_tz(&self) -> anyhow::Result<Tz> {
        Tz::from_str(&self.legislative_timezone)
            .map_err(|e| anyhow::anyhow!("invalid LEGISLATIVE_TIMEZONE {}: {}", self.legislative_timezone, e))
    }

    pub fn is_production(&self) -> bool {
        self.deployment_environment.eq_ignore_ascii_case("production")
    }

    /// "DEV" or "TEST" from the namespace suffix; empty in production
    pub fn report_environment_label(&self) -> String {
        let suffix = self.pod_namespace.rsplit('-').next().unwrap_or_default();
        match suffix.to_lowercase().as_str() {
            "dev" => "DEV".to_string(),
            "test" => "TEST".to_string(),
            _ => String::new(),
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.environment.legislative_timezone, "America/Vancouver");
        assert!(config.environment.legislation_tz().is_ok());
        assert!(config.jwt.secret.is_none());
        assert!(!config.environment.is_production());
    }

    #[test]
    fn test_lookup_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("PORT", "8080"),
            ("PAY_API_URL", "http://pay"),
            ("COLIN_API_SVC_CLIENT_ID", "colin"),
            ("DEPLOYMENT_ENVIRONMENT", "production"),
            ("DB_RUN_MIGRATIONS", "true"),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.services.pay_api_url, "http://pay");
        assert_eq!(config.credentials.colin_api.client_id, "colin");
        assert!(config.environment.is_production());
        assert!(config.database.run_migrations);
    }

    #[test]
    fn test_report_environment_label() {
        let mut env = Config::default().environment;
        env.pod_namespace = "cc892f-dev".into();
        assert_eq!(env.report_environment_label(), "DEV");
        env.pod_namespace = "cc892f-prod".into();
        assert_eq!(env.report_environment_label(), "");
    }
}
