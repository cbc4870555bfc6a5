//! Settings read from the environment.

use crate::errors::SettingsError;

/// Default model name.
pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Environment-backed settings for the LLM binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// API key; only required by the OpenAI binding.
    pub api_key: Option<String>,
    /// Model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// API base URL.
    pub base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidVar` if `OPENAI_TEMPERATURE` is set but
    /// does not parse.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidVar` for an unparseable temperature.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut settings = Self::default();

        settings.api_key = get("OPENAI_API_KEY");
        if let Some(model) = get("OPENAI_MODEL") {
            settings.model = model;
        }
        if let Some(base_url) = get("OPENAI_BASE_URL") {
            settings.base_url = base_url;
        }
        if let Some(raw) = get("OPENAI_TEMPERATURE") {
            settings.temperature = raw
                .parse::<f32>()
                .ok()
                .filter(|t| t.is_finite() && *t >= 0.0)
                .ok_or_else(|| SettingsError::InvalidVar {
                    name: "OPENAI_TEMPERATURE".to_string(),
                    value: raw.clone(),
                    reason: "expected a non-negative number".to_string(),
                })?;
        }

        Ok(settings)
    }

    /// Returns the API key.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::MissingVar` if `OPENAI_API_KEY` was not set.
    pub fn require_api_key(&self) -> Result<&str, SettingsError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| SettingsError::MissingVar("OPENAI_API_KEY".to_string()))
    }

    /// Builds the OpenAI binding config.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::MissingVar` without an API key.
    #[cfg(feature = "openai")]
    pub fn openai_config(&self) -> Result<crate::executor::OpenAiConfig, SettingsError> {
        Ok(crate::executor::OpenAiConfig::new(self.require_api_key()?, &self.model)
            .with_temperature(self.temperature)
            .with_base_url(&self.base_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.model, "gpt-4-turbo-preview");
        assert!(matches!(
            settings.require_api_key(),
            Err(SettingsError::MissingVar(ref name)) if name == "OPENAI_API_KEY"
        ));
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("OPENAI_TEMPERATURE", "0.2"),
            ("OPENAI_BASE_URL", "http://localhost:9000/v1"),
        ]))
        .unwrap();

        assert_eq!(settings.require_api_key().unwrap(), "sk-test");
        assert_eq!(settings.model, "gpt-4o");
        assert!((settings.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(settings.base_url, "http://localhost:9000/v1");
    }

    #[test]
    fn test_empty_values_are_unset() {
        let settings = Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "  "), ("OPENAI_MODEL", "")])).unwrap();

        assert!(settings.api_key.is_none());
        assert_eq!(settings.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_invalid_temperature() {
        for raw in ["hot", "-1", "NaN"] {
            let err = Settings::from_lookup(lookup(&[("OPENAI_TEMPERATURE", raw)])).unwrap_err();
            assert!(matches!(err, SettingsError::InvalidVar { ref value, .. } if value == raw));
        }
    }

    #[cfg(feature = "openai")]
    #[test]
    fn test_openai_config() {
        let settings = Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        let config = settings.openai_config().unwrap();

        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_API_BASE_URL);

        assert!(Settings::default().openai_config().is_err());
    }
}
