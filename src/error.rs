//! Zentrale Fehlertypen der Bibliothek.
//!
//! Alle oeffentlichen Operationen geben `Result<_, MapError>` zurueck.
//! Im robusten I/O-Modus werden element-bezogene Fehler nicht propagiert,
//! sondern als Diagnostik gesammelt (siehe `io::Diagnostic`).

use crate::core::Id;
use thiserror::Error;

/// Fehler, die beim Aufbau von Regeln oder beim Laden/Schreiben von Karten
/// auftreten koennen.
#[derive(Debug, Error)]
pub enum MapError {
    /// Die Rule-Registry kennt den angefragten Regeltyp nicht.
    #[error("Unbekannter Regeltyp '{name}'")]
    UnknownRuleType {
        /// Name, unter dem der Typ gesucht wurde
        name: String,
    },

    /// Eine strukturelle Invariante einer Regel ist bei der Konstruktion verletzt.
    #[error("Regel {id}: {message}")]
    InvariantViolation {
        /// Id der betroffenen Regel
        id: Id,
        /// Beschreibung der verletzten Invariante
        message: String,
    },

    /// Kein Format-Handler passt zu Dateiendung bzw. Handler-Name.
    #[error("Kein Format-Handler fuer '{requested}' registriert")]
    UnsupportedFormat {
        /// Angefragte Endung (inkl. Punkt) oder Handler-Name
        requested: String,
    },

    /// Doppelte Registrierung in einer Registry (Programmierfehler bei der
    /// Initialisierung, keine Laufzeitbedingung).
    #[error("'{name}' ist bereits registriert")]
    DuplicateRegistration {
        /// Bereits vergebener Name bzw. Endung
        name: String,
    },

    /// Ein Eingabe-Element konnte nicht geparst werden.
    #[error("Parse-Fehler bei {location}: {message}")]
    Parse {
        /// Ort des Fehlers (Element-Kennung oder Byte-Position)
        location: String,
        /// Fehlerbeschreibung
        message: String,
    },

    /// Ein Element konnte nicht serialisiert werden.
    #[error("Schreib-Fehler bei {element}: {message}")]
    Write {
        /// Kennung des betroffenen Elements
        element: String,
        /// Fehlerbeschreibung
        message: String,
    },

    /// Dateisystem-Fehler beim Lesen oder Schreiben der Zieldatei.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MapError {
    /// Kurzform fuer einen Parse-Fehler an einer benannten Stelle.
    pub fn parse(location: impl Into<String>, message: impl Into<String>) -> Self {
        MapError::Parse {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Kurzform fuer einen Schreib-Fehler an einem benannten Element.
    pub fn write(element: impl Into<String>, message: impl Into<String>) -> Self {
        MapError::Write {
            element: element.into(),
            message: message.into(),
        }
    }

    /// Kurzform fuer eine Invarianten-Verletzung.
    pub fn invariant(id: Id, message: impl Into<String>) -> Self {
        MapError::InvariantViolation {
            id,
            message: message.into(),
        }
    }
}
