//! Format-Konfiguration fuer Parser und Writer.
//!
//! Eine unveraenderliche Schluessel-Wert-Tasche. Handler muessen fuer jede
//! Option, die sie nicht kennen oder nicht lesen koennen, auf ihren
//! dokumentierten Default zurueckfallen — eine unbekannte Option ist nie
//! ein Fehler.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Optionstasche fuer Format-Handler.
///
/// Bekannte Optionen der eingebauten Handler:
/// - `decimal_precision` (osm): Nachkommastellen der Koordinaten, Default 11
/// - `write_elevation` (osm): `ele`-Tags schreiben, Default `true`
/// - `pretty` (json): eingerueckt schreiben, Default `true`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct IoConfiguration {
    values: BTreeMap<String, String>,
}

impl IoConfiguration {
    /// Leere Konfiguration (alle Handler nutzen ihre Defaults).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-artiges Setzen einer Option.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Laedt eine Konfiguration aus einem TOML-String. Werte beliebigen Typs
    /// werden als Strings uebernommen.
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let raw: BTreeMap<String, toml::Value> = toml::from_str(input)?;
        let values = raw
            .into_iter()
            .map(|(key, value)| {
                let text = match value {
                    toml::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, text)
            })
            .collect();
        Ok(Self { values })
    }

    /// Roher Wert einer Option.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// String-Wert mit Default.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Bool-Wert mit Default. Faellt auch bei nicht lesbarem Wert auf den
    /// Default zurueck.
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// f64-Wert mit Default.
    pub fn get_f64_or(&self, key: &str, default: f64) -> f64 {
        self.get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// usize-Wert mit Default.
    pub fn get_usize_or(&self, key: &str, default: usize) -> usize {
        self.get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_option_falls_back_to_default() {
        let config = IoConfiguration::new();
        assert_eq!(config.get_usize_or("decimal_precision", 11), 11);
        assert!(config.get_bool_or("write_elevation", true));
    }

    #[test]
    fn test_unparsable_option_falls_back_to_default() {
        let config = IoConfiguration::new().with("decimal_precision", "viele");
        assert_eq!(config.get_usize_or("decimal_precision", 11), 11);
    }

    #[test]
    fn test_set_option_is_read() {
        let config = IoConfiguration::new().with("pretty", "false");
        assert!(!config.get_bool_or("pretty", true));
    }

    #[test]
    fn test_from_toml_accepts_mixed_value_types() {
        let config = IoConfiguration::from_toml_str(
            r#"
            decimal_precision = 7
            write_elevation = false
            comment = "test"
            "#,
        )
        .expect("TOML lesbar");

        assert_eq!(config.get_usize_or("decimal_precision", 11), 7);
        assert!(!config.get_bool_or("write_elevation", true));
        assert_eq!(config.get("comment"), Some("test"));
    }
}
