use std::{collections::HashMap, fs, path::Path};

pub const DEFAULT_CONFIG_FILE: &str = "projects.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub cognito_region: String,
    pub cognito_client_id: String,
    /// Overrides the regional user-pool endpoint, e.g. for a local emulator.
    pub cognito_endpoint: Option<String>,
    pub graphql_endpoint: String,
    pub graphql_api_key: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            cognito_region: "us-east-1".into(),
            cognito_client_id: String::new(),
            cognito_endpoint: None,
            graphql_endpoint: "http://127.0.0.1:20002/graphql".into(),
            graphql_api_key: None,
        }
    }
}

impl ClientSettings {
    pub fn cognito_url(&self) -> String {
        match &self.cognito_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://cognito-idp.{}.amazonaws.com/", self.cognito_region),
        }
    }
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(DEFAULT_CONFIG_FILE))
}

/// Defaults, then the flat `key = "value"` table in `path` (if readable), then
/// environment overrides. `APP__`-prefixed variables win over the bare ones.
pub fn load_settings_from(path: &Path) -> ClientSettings {
    load_layered(path, |key| std::env::var(key).ok())
}

fn load_layered(path: &Path, lookup: impl Fn(&str) -> Option<String>) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            apply_file_values(&mut settings, &file_cfg);
        }
    }

    apply_env_overrides(&mut settings, lookup);
    settings
}

fn apply_file_values(settings: &mut ClientSettings, file_cfg: &HashMap<String, String>) {
    if let Some(v) = file_cfg.get("cognito_region") {
        settings.cognito_region = v.clone();
    }
    if let Some(v) = file_cfg.get("cognito_client_id") {
        settings.cognito_client_id = v.clone();
    }
    if let Some(v) = file_cfg.get("cognito_endpoint") {
        settings.cognito_endpoint = non_empty(v);
    }
    if let Some(v) = file_cfg.get("graphql_endpoint") {
        settings.graphql_endpoint = v.clone();
    }
    if let Some(v) = file_cfg.get("graphql_api_key") {
        settings.graphql_api_key = non_empty(v);
    }
}

fn apply_env_overrides(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    let lookup_pair = |name: &str| lookup(&format!("APP__{name}")).or_else(|| lookup(name));

    if let Some(v) = lookup_pair("COGNITO_REGION") {
        settings.cognito_region = v;
    }
    if let Some(v) = lookup_pair("COGNITO_CLIENT_ID") {
        settings.cognito_client_id = v;
    }
    if let Some(v) = lookup_pair("COGNITO_ENDPOINT") {
        settings.cognito_endpoint = non_empty(&v);
    }
    if let Some(v) = lookup_pair("GRAPHQL_ENDPOINT") {
        settings.graphql_endpoint = v;
    }
    if let Some(v) = lookup_pair("GRAPHQL_API_KEY") {
        settings.graphql_api_key = non_empty(&v);
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
