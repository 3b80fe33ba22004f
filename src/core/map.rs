//! Die LaneletMap: Container fuer Linienzuege, Lanelets und Regeln.

use super::rules::RegulatoryRule;
use super::{Id, Lanelet, LineString3d};
use std::collections::HashMap;
use std::sync::Arc;

/// Vollstaendige Karte, wie sie durch die I/O-Pipeline fliesst.
///
/// Die Karte besitzt ihre Regeln; Lanelets referenzieren Regeln nur per Id.
/// Linienzuege und Lanelets liegen in `Arc`, damit Regeln dieselben Elemente
/// referenzieren koennen wie die Karte.
#[derive(Debug, Default)]
pub struct LaneletMap {
    line_strings: HashMap<Id, Arc<LineString3d>>,
    lanelets: HashMap<Id, Arc<Lanelet>>,
    rules: HashMap<Id, Box<dyn RegulatoryRule>>,
}

impl LaneletMap {
    /// Erstellt eine leere Karte.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fuegt einen Linienzug hinzu (ersetzt bei gleicher Id).
    pub fn add_line_string(&mut self, line_string: Arc<LineString3d>) {
        self.line_strings.insert(line_string.id, line_string);
    }

    /// Fuegt ein Lanelet hinzu (ersetzt bei gleicher Id).
    pub fn add_lanelet(&mut self, lanelet: Arc<Lanelet>) {
        self.lanelets.insert(lanelet.id, lanelet);
    }

    /// Fuegt eine Regel hinzu (ersetzt bei gleicher Id).
    pub fn add_rule(&mut self, rule: Box<dyn RegulatoryRule>) {
        self.rules.insert(rule.id(), rule);
    }

    /// Linienzug nach Id.
    pub fn line_string(&self, id: Id) -> Option<&Arc<LineString3d>> {
        self.line_strings.get(&id)
    }

    /// Lanelet nach Id.
    pub fn lanelet(&self, id: Id) -> Option<&Arc<Lanelet>> {
        self.lanelets.get(&id)
    }

    /// Regel nach Id.
    pub fn rule(&self, id: Id) -> Option<&dyn RegulatoryRule> {
        self.rules.get(&id).map(|rule| &**rule)
    }

    /// Veraenderliche Regel nach Id (fuer Downcast auf die Variante).
    pub fn rule_mut(&mut self, id: Id) -> Option<&mut Box<dyn RegulatoryRule>> {
        self.rules.get_mut(&id)
    }

    /// Entfernt eine Regel. Gibt zurueck, ob sie vorhanden war.
    pub fn remove_rule(&mut self, id: Id) -> bool {
        self.rules.remove(&id).is_some()
    }

    /// Iterator ueber alle Linienzuege (read-only).
    pub fn line_strings_iter(&self) -> impl Iterator<Item = &Arc<LineString3d>> {
        self.line_strings.values()
    }

    /// Iterator ueber alle Lanelets (read-only).
    pub fn lanelets_iter(&self) -> impl Iterator<Item = &Arc<Lanelet>> {
        self.lanelets.values()
    }

    /// Iterator ueber alle Regeln (read-only).
    pub fn rules_iter(&self) -> impl Iterator<Item = &dyn RegulatoryRule> {
        self.rules.values().map(|rule| &**rule)
    }

    /// Anzahl Linienzuege.
    pub fn line_string_count(&self) -> usize {
        self.line_strings.len()
    }

    /// Anzahl Lanelets.
    pub fn lanelet_count(&self) -> usize {
        self.lanelets.len()
    }

    /// Anzahl Regeln.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Regeln, die fuer ein Lanelet gelten. Referenzen auf Regeln, die nicht
    /// (mehr) in der Karte liegen, werden uebersprungen.
    pub fn rules_for_lanelet(&self, lanelet_id: Id) -> Vec<&dyn RegulatoryRule> {
        let Some(lanelet) = self.lanelets.get(&lanelet_id) else {
            return Vec::new();
        };
        lanelet
            .regulatory_refs
            .iter()
            .filter_map(|id| self.rule(*id))
            .collect()
    }

    /// Berechnet die naechste freie Element-Id.
    pub fn next_free_id(&self) -> Id {
        let max = self
            .line_strings
            .keys()
            .chain(self.lanelets.keys())
            .chain(self.rules.keys())
            .copied()
            .max()
            .unwrap_or(0);
        max.max(0) + 1
    }
}
