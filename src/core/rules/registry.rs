//! Registry der Regel-Varianten.
//!
//! Format-Handler rekonstruieren Regeln ueber diese Tabelle per Namen aus
//! generischen [`RuleData`]-Saetzen — die Varianten-Menge ist offen:
//! nachgelagerter Code registriert eigene Typen ueber
//! [`register_rule_type`], ohne diese Datei anzufassen.
//!
//! Die globale Tabelle wird beim ersten Zugriff einmalig mit den
//! eingebauten Varianten gefuellt; danach sind Lookups nebenlaeufig lesbar.
//! Registrierungen gehoeren in die Initialisierungsphase, bevor geladen
//! oder geschrieben wird.

use super::rule::{RegulatoryRule, RuleData};
use super::{RightOfWay, SpeedLimit, TrafficLight, TrafficSign};
use crate::error::MapError;
use indexmap::IndexMap;
use std::sync::{LazyLock, RwLock};

/// Factory, die eine Variante aus generischen Rollen-Daten baut.
pub type RuleFactory = fn(RuleData) -> Result<Box<dyn RegulatoryRule>, MapError>;

/// Tabelle Regeltyp-Name → Factory. IndexMap haelt die Reihenfolge der
/// Registrierung fuer deterministische Iteration.
#[derive(Default)]
pub struct RuleRegistry {
    factories: IndexMap<String, RuleFactory>,
}

impl RuleRegistry {
    /// Leere Registry (fuer Tests; der normale Weg ist die globale Tabelle).
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry mit den eingebauten Varianten.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        // Eingebaute Namen sind statisch verschieden, Kollision unmoeglich
        for (name, factory) in [
            (TrafficLight::RULE_NAME, TrafficLight::construct as RuleFactory),
            (RightOfWay::RULE_NAME, RightOfWay::construct as RuleFactory),
            (TrafficSign::RULE_NAME, TrafficSign::construct as RuleFactory),
            (SpeedLimit::RULE_NAME, SpeedLimit::construct as RuleFactory),
        ] {
            registry.factories.insert(name.to_string(), factory);
        }
        registry
    }

    /// Registriert eine Variante. Doppelte Registrierung ist ein
    /// Programmierfehler und schlaegt deterministisch fehl.
    pub fn register(&mut self, name: &str, factory: RuleFactory) -> Result<(), MapError> {
        if self.factories.contains_key(name) {
            return Err(MapError::DuplicateRegistration {
                name: name.to_string(),
            });
        }
        self.factories.insert(name.to_string(), factory);
        Ok(())
    }

    /// Baut eine Regel-Variante aus generischen Rollen-Daten.
    pub fn construct(
        &self,
        name: &str,
        data: RuleData,
    ) -> Result<Box<dyn RegulatoryRule>, MapError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| MapError::UnknownRuleType {
                name: name.to_string(),
            })?;
        factory(data)
    }

    /// Ob ein Regeltyp registriert ist.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Alle registrierten Regeltyp-Namen in Registrierungsreihenfolge.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

static RULE_REGISTRY: LazyLock<RwLock<RuleRegistry>> =
    LazyLock::new(|| RwLock::new(RuleRegistry::with_builtins()));

/// Registriert eine Regel-Variante in der globalen Registry.
pub fn register_rule_type(name: &str, factory: RuleFactory) -> Result<(), MapError> {
    let mut registry = RULE_REGISTRY
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    registry.register(name, factory)
}

/// Baut eine Regel-Variante ueber die globale Registry.
pub fn construct_rule(name: &str, data: RuleData) -> Result<Box<dyn RegulatoryRule>, MapError> {
    let registry = RULE_REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    registry.construct(name, data)
}

/// Ob die globale Registry einen Regeltyp kennt.
pub fn is_rule_type_registered(name: &str) -> bool {
    let registry = RULE_REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    registry.contains(name)
}
