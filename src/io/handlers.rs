//! Registry der Format-Handler (Parser/Writer-Paare).
//!
//! Handler werden unter Dateiendung (inklusive Punkt, z.B. `.osm`) und
//! Handler-Name registriert und pro Aufruf frisch aus ihren Factories
//! gebaut. Sie sind zustandslos: Projektion und Konfiguration kommen als
//! geliehene Argumente in jeden Aufruf und duerfen nicht gehalten werden.

use super::configuration::IoConfiguration;
use super::projection::Projector;
use super::Diagnostic;
use crate::core::LaneletMap;
use crate::error::MapError;
use indexmap::IndexMap;
use std::sync::{LazyLock, RwLock};

/// Parser-Seite eines Format-Handlers.
pub trait MapParser {
    /// Parsed eine Karte aus dem Eingabetext.
    ///
    /// Mit `diagnostics = None` (strikter Modus) bricht der erste
    /// Element-Fehler den Aufruf ab. Mit `Some(..)` (robuster Modus) wird
    /// jedes fehlerhafte Element uebersprungen und genau einmal in der
    /// Diagnostik vermerkt; die zurueckgegebene Karte enthaelt nie halb
    /// aufgebaute Elemente.
    fn parse_map(
        &self,
        input: &str,
        projector: &dyn Projector,
        config: &IoConfiguration,
        diagnostics: Option<&mut Vec<Diagnostic>>,
    ) -> Result<LaneletMap, MapError>;
}

/// Writer-Seite eines Format-Handlers.
pub trait MapWriter {
    /// Serialisiert eine Karte in den Ausgabetext.
    ///
    /// Diagnostik-Semantik wie bei [`MapParser::parse_map`]: im robusten
    /// Modus werden nicht serialisierbare Elemente uebersprungen, die
    /// Ausgabe bleibt fuer die uebrigen Elemente wohlgeformt.
    fn write_map(
        &self,
        map: &LaneletMap,
        projector: &dyn Projector,
        config: &IoConfiguration,
        diagnostics: Option<&mut Vec<Diagnostic>>,
    ) -> Result<String, MapError>;
}

/// Factory fuer die Parser-Seite.
pub type ParserFactory = fn() -> Box<dyn MapParser>;
/// Factory fuer die Writer-Seite.
pub type WriterFactory = fn() -> Box<dyn MapWriter>;

struct HandlerEntry {
    extension: String,
    name: String,
    parser: ParserFactory,
    writer: WriterFactory,
}

/// Registry aller Format-Handler, adressierbar ueber Endung und Name.
#[derive(Default)]
pub struct FormatHandlerRegistry {
    entries: Vec<HandlerEntry>,
    by_extension: IndexMap<String, usize>,
    by_name: IndexMap<String, usize>,
}

impl FormatHandlerRegistry {
    /// Leere Registry (fuer Tests; der normale Weg ist die globale Tabelle).
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry mit den eingebauten Handlern (`.osm` und `.json`).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.insert_entry(
            ".osm",
            "osm_handler",
            || Box::new(super::osm::OsmParser::new()),
            || Box::new(super::osm::OsmWriter::new()),
        );
        registry.insert_entry(
            ".json",
            "json_handler",
            || Box::new(super::json::JsonParser::new()),
            || Box::new(super::json::JsonWriter::new()),
        );
        registry
    }

    // Eingebaute Eintraege kollidieren nicht, daher ohne Fehlerpfad
    fn insert_entry(
        &mut self,
        extension: &str,
        name: &str,
        parser: ParserFactory,
        writer: WriterFactory,
    ) {
        let index = self.entries.len();
        self.entries.push(HandlerEntry {
            extension: extension.to_string(),
            name: name.to_string(),
            parser,
            writer,
        });
        self.by_extension.insert(extension.to_string(), index);
        self.by_name.insert(name.to_string(), index);
    }

    /// Registriert einen Handler. Doppelte Endung oder doppelter Name sind
    /// Programmierfehler und schlagen deterministisch fehl.
    pub fn register(
        &mut self,
        extension: &str,
        name: &str,
        parser: ParserFactory,
        writer: WriterFactory,
    ) -> Result<(), MapError> {
        if self.by_extension.contains_key(extension) {
            return Err(MapError::DuplicateRegistration {
                name: extension.to_string(),
            });
        }
        if self.by_name.contains_key(name) {
            return Err(MapError::DuplicateRegistration {
                name: name.to_string(),
            });
        }
        self.insert_entry(extension, name, parser, writer);
        Ok(())
    }

    /// Handler-Factories zu einer Dateiendung (exakter Match inkl. Punkt,
    /// case-sensitiv).
    pub fn by_extension(&self, extension: &str) -> Option<(ParserFactory, WriterFactory)> {
        self.by_extension
            .get(extension)
            .map(|&i| (self.entries[i].parser, self.entries[i].writer))
    }

    /// Handler-Factories zu einem Handler-Namen (exakter Match).
    pub fn by_name(&self, name: &str) -> Option<(ParserFactory, WriterFactory)> {
        self.by_name
            .get(name)
            .map(|&i| (self.entries[i].parser, self.entries[i].writer))
    }

    /// Alle registrierten (Endung, Name)-Paare in Registrierungsreihenfolge.
    pub fn handlers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.extension.as_str(), e.name.as_str()))
    }
}

static FORMAT_REGISTRY: LazyLock<RwLock<FormatHandlerRegistry>> =
    LazyLock::new(|| RwLock::new(FormatHandlerRegistry::with_builtins()));

/// Registriert einen Format-Handler in der globalen Registry.
pub fn register_format_handler(
    extension: &str,
    name: &str,
    parser: ParserFactory,
    writer: WriterFactory,
) -> Result<(), MapError> {
    let mut registry = FORMAT_REGISTRY
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    registry.register(extension, name, parser, writer)
}

/// Baut einen Parser zu einer Dateiendung oder meldet `UnsupportedFormat`.
pub fn parser_for_extension(extension: &str) -> Result<Box<dyn MapParser>, MapError> {
    factories_for_extension(extension).map(|(parser, _)| parser())
}

/// Baut einen Writer zu einer Dateiendung oder meldet `UnsupportedFormat`.
pub fn writer_for_extension(extension: &str) -> Result<Box<dyn MapWriter>, MapError> {
    factories_for_extension(extension).map(|(_, writer)| writer())
}

/// Baut einen Parser zu einem Handler-Namen oder meldet `UnsupportedFormat`.
pub fn parser_by_name(name: &str) -> Result<Box<dyn MapParser>, MapError> {
    factories_by_name(name).map(|(parser, _)| parser())
}

/// Baut einen Writer zu einem Handler-Namen oder meldet `UnsupportedFormat`.
pub fn writer_by_name(name: &str) -> Result<Box<dyn MapWriter>, MapError> {
    factories_by_name(name).map(|(_, writer)| writer())
}

fn factories_for_extension(extension: &str) -> Result<(ParserFactory, WriterFactory), MapError> {
    let registry = FORMAT_REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    registry
        .by_extension(extension)
        .ok_or_else(|| MapError::UnsupportedFormat {
            requested: extension.to_string(),
        })
}

fn factories_by_name(name: &str) -> Result<(ParserFactory, WriterFactory), MapError> {
    let registry = FORMAT_REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    registry
        .by_name(name)
        .ok_or_else(|| MapError::UnsupportedFormat {
            requested: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_found_by_extension_and_name() {
        let registry = FormatHandlerRegistry::with_builtins();
        assert!(registry.by_extension(".osm").is_some());
        assert!(registry.by_extension(".json").is_some());
        assert!(registry.by_name("osm_handler").is_some());
        assert!(registry.by_name("json_handler").is_some());
    }

    #[test]
    fn test_extension_match_is_exact_and_case_sensitive() {
        let registry = FormatHandlerRegistry::with_builtins();
        assert!(registry.by_extension("osm").is_none(), "Punkt gehoert dazu");
        assert!(registry.by_extension(".OSM").is_none());
    }

    #[test]
    fn test_duplicate_extension_is_rejected() {
        let mut registry = FormatHandlerRegistry::with_builtins();
        let err = registry
            .register(
                ".osm",
                "zweiter_osm_handler",
                || Box::new(super::super::osm::OsmParser::new()),
                || Box::new(super::super::osm::OsmWriter::new()),
            )
            .expect_err("Doppelte Endung");
        assert!(matches!(err, MapError::DuplicateRegistration { .. }));
    }

    #[test]
    fn test_unknown_extension_is_unsupported_format() {
        let err = parser_for_extension(".pbf").err().expect("Unbekannte Endung");
        assert!(matches!(err, MapError::UnsupportedFormat { requested } if requested == ".pbf"));
    }
}
