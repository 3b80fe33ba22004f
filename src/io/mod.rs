//! Datei-I/O fuer Karten: Handler-Registry, Projektion, Konfiguration und
//! die Lade-/Schreib-Pipeline.
//!
//! Die Pipeline waehlt den Handler ueber die Dateiendung, fuehrt Parse bzw.
//! Serialisierung unter der uebergebenen Projektion aus und propagiert im
//! strikten Modus den ersten Fehler. Die `*_robust`-Varianten sammeln
//! element-bezogene Fehler als Diagnostik und liefern das bestmoegliche
//! Ergebnis — empfohlen fuer fremde oder extern gepflegte Karten.

pub mod configuration;
pub mod handlers;
pub mod json;
pub mod osm;
pub mod projection;

pub use configuration::IoConfiguration;
pub use handlers::{
    parser_by_name, parser_for_extension, register_format_handler, writer_by_name,
    writer_for_extension, FormatHandlerRegistry, MapParser, MapWriter, ParserFactory,
    WriterFactory,
};
pub use projection::{Origin, Projector, SphericalMercatorProjector};

use crate::core::LaneletMap;
use crate::error::MapError;
use std::fmt;
use std::path::Path;

/// Diagnostik eines uebersprungenen Elements im robusten Modus.
///
/// Pro fehlerhaftem Element entsteht genau ein Eintrag; eine Reihenfolge
/// ueber Elemente hinweg wird nicht zugesichert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Kennung des betroffenen Elements (z.B. "Relation 301")
    pub element: String,
    /// Fehlerbeschreibung
    pub message: String,
}

impl Diagnostic {
    /// Erstellt eine Diagnostik.
    pub fn new(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.element, self.message)
    }
}

/// Gemeinsame Fehlerweiche der Handler: im robusten Modus wird das Element
/// uebersprungen und genau eine Diagnostik vermerkt, im strikten Modus
/// bricht der erste Fehler ab.
pub(crate) fn skip_or_fail(
    diagnostics: &mut Option<&mut Vec<Diagnostic>>,
    element: &str,
    error: MapError,
) -> Result<(), MapError> {
    match diagnostics {
        Some(list) => {
            log::warn!("Ueberspringe {element}: {error}");
            list.push(Diagnostic::new(element, error.to_string()));
            Ok(())
        }
        None => Err(error),
    }
}

/// Dateiendung (inkl. Punkt) eines Pfads, oder `UnsupportedFormat`.
fn path_extension(path: &Path) -> Result<String, MapError> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .ok_or_else(|| MapError::UnsupportedFormat {
            requested: path.display().to_string(),
        })
}

/// Laedt eine Karte. Der Handler wird ueber die Dateiendung gewaehlt, der
/// erste Parse-Fehler bricht ab.
pub fn load(path: impl AsRef<Path>, projector: &dyn Projector) -> Result<LaneletMap, MapError> {
    load_with_config(path, projector, &IoConfiguration::new())
}

/// Wie [`load`], mit expliziter Format-Konfiguration.
pub fn load_with_config(
    path: impl AsRef<Path>,
    projector: &dyn Projector,
    config: &IoConfiguration,
) -> Result<LaneletMap, MapError> {
    let path = path.as_ref();
    let parser = parser_for_extension(&path_extension(path)?)?;
    let input = std::fs::read_to_string(path)?;
    parser.parse_map(&input, projector, config, None)
}

/// Laedt eine Karte mit der Standard-Projektion um den angegebenen Ursprung.
pub fn load_from_origin(path: impl AsRef<Path>, origin: Origin) -> Result<LaneletMap, MapError> {
    let projector = SphericalMercatorProjector::new(origin);
    load(path, &projector)
}

/// Laedt eine Karte robust: fehlerhafte Elemente werden uebersprungen und
/// als Diagnostik zurueckgegeben. Top-Level-Fehler (unbekannte Endung,
/// unlesbare Datei, kaputtes Dokument) schlagen weiterhin fehl.
pub fn load_robust(
    path: impl AsRef<Path>,
    projector: &dyn Projector,
) -> Result<(LaneletMap, Vec<Diagnostic>), MapError> {
    load_robust_with_config(path, projector, &IoConfiguration::new())
}

/// Wie [`load_robust`], mit expliziter Format-Konfiguration.
pub fn load_robust_with_config(
    path: impl AsRef<Path>,
    projector: &dyn Projector,
    config: &IoConfiguration,
) -> Result<(LaneletMap, Vec<Diagnostic>), MapError> {
    let path = path.as_ref();
    let parser = parser_for_extension(&path_extension(path)?)?;
    let input = std::fs::read_to_string(path)?;
    let mut diagnostics = Vec::new();
    let map = parser.parse_map(&input, projector, config, Some(&mut diagnostics))?;
    Ok((map, diagnostics))
}

/// Schreibt eine Karte. Der Handler wird ueber die Dateiendung gewaehlt, der
/// erste Schreib-Fehler bricht ab.
pub fn write(
    path: impl AsRef<Path>,
    map: &LaneletMap,
    projector: &dyn Projector,
) -> Result<(), MapError> {
    write_with_config(path, map, projector, &IoConfiguration::new())
}

/// Wie [`write`], mit expliziter Format-Konfiguration.
pub fn write_with_config(
    path: impl AsRef<Path>,
    map: &LaneletMap,
    projector: &dyn Projector,
    config: &IoConfiguration,
) -> Result<(), MapError> {
    let path = path.as_ref();
    let writer = writer_for_extension(&path_extension(path)?)?;
    let output = writer.write_map(map, projector, config, None)?;
    std::fs::write(path, output)?;
    Ok(())
}

/// Schreibt eine Karte robust: nicht serialisierbare Elemente werden
/// uebersprungen und als Diagnostik zurueckgegeben; die Datei bleibt fuer
/// die uebrigen Elemente wohlgeformt.
pub fn write_robust(
    path: impl AsRef<Path>,
    map: &LaneletMap,
    projector: &dyn Projector,
) -> Result<Vec<Diagnostic>, MapError> {
    write_robust_with_config(path, map, projector, &IoConfiguration::new())
}

/// Wie [`write_robust`], mit expliziter Format-Konfiguration.
pub fn write_robust_with_config(
    path: impl AsRef<Path>,
    map: &LaneletMap,
    projector: &dyn Projector,
    config: &IoConfiguration,
) -> Result<Vec<Diagnostic>, MapError> {
    let path = path.as_ref();
    let writer = writer_for_extension(&path_extension(path)?)?;
    let mut diagnostics = Vec::new();
    let output = writer.write_map(map, projector, config, Some(&mut diagnostics))?;
    std::fs::write(path, output)?;
    Ok(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::projection::{Origin, SphericalMercatorProjector};

    #[test]
    fn test_load_with_unknown_extension_is_unsupported_format() {
        let projector = SphericalMercatorProjector::new(Origin::default());
        // Der Handler-Lookup schlaegt vor jedem Dateizugriff fehl
        let err = load("karte.pbf", &projector).expect_err("Unbekannte Endung");
        assert!(matches!(err, MapError::UnsupportedFormat { requested } if requested == ".pbf"));
    }

    #[test]
    fn test_load_without_extension_is_unsupported_format() {
        let projector = SphericalMercatorProjector::new(Origin::default());
        let err = load("karte", &projector).expect_err("Fehlende Endung");
        assert!(matches!(err, MapError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let projector = SphericalMercatorProjector::new(Origin::default());
        let err = load("/nicht/vorhanden/karte.osm", &projector).expect_err("Datei fehlt");
        assert!(matches!(err, MapError::Io(_)));
    }
}
