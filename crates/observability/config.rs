use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service_context: ServiceContext,
    /// Filter directive used when `RUST_LOG` is not set.
    pub(crate) default_directive: String,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::from_lookup(component, |key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(component: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let component = component.trim().to_string();

        let service_name = non_empty("SERVICE_NAME").unwrap_or_else(|| component.clone());

        let environment = non_empty("STAGE").unwrap_or_else(|| "unknown".to_string());

        let default_directive = non_empty("LOG_LEVEL")
            .map(|level| level.to_ascii_lowercase())
            .unwrap_or_else(|| "info".to_string());

        Self {
            service_context: ServiceContext {
                service_name,
                environment,
                component,
            },
            default_directive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_follow_component_name() {
        let config = ObservabilityConfig::from_lookup(" backend ", lookup(&[]));
        assert_eq!(config.service_context.service_name, "backend");
        assert_eq!(config.service_context.component, "backend");
        assert_eq!(config.service_context.environment, "unknown");
        assert_eq!(config.default_directive, "info");
    }

    #[test]
    fn env_overrides_are_applied() {
        let config = ObservabilityConfig::from_lookup(
            "backend",
            lookup(&[
                ("SERVICE_NAME", "subscriptions"),
                ("STAGE", "production"),
                ("LOG_LEVEL", "DEBUG"),
            ]),
        );
        assert_eq!(config.service_context.service_name, "subscriptions");
        assert_eq!(config.service_context.environment, "production");
        assert_eq!(config.default_directive, "debug");
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config =
            ObservabilityConfig::from_lookup(
                "backend",
                lookup(&[("STAGE", "  "), ("LOG_LEVEL", "")]),
            );
        assert_eq!(config.service_context.environment, "unknown");
        assert_eq!(config.default_directive, "info");
    }
}
