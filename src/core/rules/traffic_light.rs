//! Ampel-Regel: eine oder mehrere Ampeln plus genau eine Haltelinie.

use super::rule::{role, RegulatoryRule, RuleData, RuleRef};
use crate::core::{AttributeMap, Id, LineString3d};
use crate::error::MapError;
use std::any::Any;
use std::sync::Arc;

/// Ampel-Restriktion auf einem Lanelet.
///
/// Die Ampeln sind Linienzuege von der linken zur rechten Kante der
/// Leuchtflaeche. Mehrere Ampeln muessen dasselbe Signal zeigen.
/// Die Haltelinie ist singulaer: sie kann ersetzt, aber nie entfernt werden.
#[derive(Debug, Clone)]
pub struct TrafficLight {
    data: RuleData,
}

impl TrafficLight {
    /// Registry-Name dieser Variante.
    pub const RULE_NAME: &'static str = "traffic_light";

    /// Erstellt eine gueltige Ampel-Regel.
    ///
    /// Schlaegt mit `InvariantViolation` fehl, wenn `traffic_lights` leer ist.
    pub fn new(
        id: Id,
        attributes: AttributeMap,
        traffic_lights: Vec<Arc<LineString3d>>,
        stop_line: Arc<LineString3d>,
    ) -> Result<Self, MapError> {
        let mut data = RuleData::new(id, attributes);
        for light in traffic_lights {
            data.add_ref_unique(role::REFERS, RuleRef::LineString(light));
        }
        data.set_singular(role::REF_LINE, RuleRef::LineString(stop_line));
        Self::from_data(data)
    }

    /// Rekonstruiert die Regel aus generischen Rollen-Daten (Registry-Factory).
    pub fn from_data(data: RuleData) -> Result<Self, MapError> {
        let rule = Self { data };
        rule.check_invariants()?;
        Ok(rule)
    }

    /// Factory fuer die Rule-Registry.
    pub(crate) fn construct(data: RuleData) -> Result<Box<dyn RegulatoryRule>, MapError> {
        Ok(Box::new(Self::from_data(data)?))
    }

    fn check_invariants(&self) -> Result<(), MapError> {
        let refers = self.data.role(role::REFERS);
        if refers.is_empty() {
            return Err(MapError::invariant(
                self.data.id,
                "Ampel-Regel ohne Ampeln (Rolle 'refers' ist leer)",
            ));
        }
        if refers.iter().any(|r| r.as_line_string().is_none()) {
            return Err(MapError::invariant(
                self.data.id,
                "Rolle 'refers' einer Ampel-Regel darf nur Linienzuege enthalten",
            ));
        }

        let ref_line = self.data.role(role::REF_LINE);
        if ref_line.len() != 1 || ref_line[0].as_line_string().is_none() {
            return Err(MapError::invariant(
                self.data.id,
                "Ampel-Regel braucht genau eine Haltelinie (Rolle 'ref_line')",
            ));
        }
        Ok(())
    }

    /// Die zugehoerigen Ampeln.
    pub fn traffic_lights(&self) -> Vec<Arc<LineString3d>> {
        self.data.line_strings(role::REFERS)
    }

    /// Die Haltelinie.
    pub fn stop_line(&self) -> Arc<LineString3d> {
        // Invariante: ref_line enthaelt nach Konstruktion immer genau ein Element
        self.data
            .first_line_string(role::REF_LINE)
            .expect("ref_line ist nach Konstruktion nie leer")
    }

    /// Fuegt eine weitere Ampel hinzu.
    ///
    /// Gibt `false` zurueck, wenn dieselbe Ampel bereits referenziert ist —
    /// ein Duplikat derselben Leuchtflaeche traegt keine Bedeutung.
    pub fn add_traffic_light(&mut self, light: Arc<LineString3d>) -> bool {
        self.data.add_ref_unique(role::REFERS, RuleRef::LineString(light))
    }

    /// Entfernt eine Ampel. Gibt zurueck, ob sie vorhanden war und entfernt
    /// wurde. Die letzte Ampel kann nicht entfernt werden, damit die Regel
    /// nach jeder Mutation gueltig bleibt.
    pub fn remove_traffic_light(&mut self, light: &Arc<LineString3d>) -> bool {
        let reference = RuleRef::LineString(Arc::clone(light));
        if self.data.role(role::REFERS).len() == 1 && self.data.role(role::REFERS)[0] == reference {
            return false;
        }
        self.data.remove_ref(role::REFERS, &reference)
    }

    /// Ersetzt die Haltelinie vollstaendig.
    pub fn set_stop_line(&mut self, stop_line: Arc<LineString3d>) {
        self.data.set_singular(role::REF_LINE, RuleRef::LineString(stop_line));
    }
}

impl RegulatoryRule for TrafficLight {
    fn id(&self) -> Id {
        self.data.id
    }

    fn rule_name(&self) -> &'static str {
        Self::RULE_NAME
    }

    fn attributes(&self) -> &AttributeMap {
        &self.data.attributes
    }

    fn data(&self) -> &RuleData {
        &self.data
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Point3d;
    use glam::DVec3;

    fn line(id: Id) -> Arc<LineString3d> {
        Arc::new(LineString3d::new(id, vec![Point3d::new(id * 10, DVec3::ZERO)]))
    }

    #[test]
    fn test_new_without_lights_is_invariant_violation() {
        let err = TrafficLight::new(1, AttributeMap::new(), Vec::new(), line(9))
            .expect_err("Leere Ampelliste muss abgelehnt werden");
        assert!(matches!(err, MapError::InvariantViolation { id: 1, .. }));
    }

    #[test]
    fn test_from_data_without_stop_line_fails() {
        let mut data = RuleData::new(2, AttributeMap::new());
        data.add_ref(role::REFERS, RuleRef::LineString(line(1)));

        let err = TrafficLight::from_data(data).expect_err("Fehlende Haltelinie");
        assert!(matches!(err, MapError::InvariantViolation { .. }));
    }

    #[test]
    fn test_add_same_light_twice_is_rejected() {
        let mut rule =
            TrafficLight::new(1, AttributeMap::new(), vec![line(1)], line(9)).expect("gueltig");

        assert!(rule.add_traffic_light(line(2)));
        assert!(!rule.add_traffic_light(line(2)));
        assert_eq!(rule.traffic_lights().len(), 2);
    }

    #[test]
    fn test_last_light_cannot_be_removed() {
        let mut rule =
            TrafficLight::new(1, AttributeMap::new(), vec![line(1)], line(9)).expect("gueltig");

        assert!(!rule.remove_traffic_light(&line(1)));
        assert_eq!(rule.traffic_lights().len(), 1);

        rule.add_traffic_light(line(2));
        assert!(rule.remove_traffic_light(&line(1)));
        assert_eq!(rule.traffic_lights().len(), 1);
    }

    #[test]
    fn test_set_stop_line_overwrites() {
        let mut rule =
            TrafficLight::new(1, AttributeMap::new(), vec![line(1)], line(9)).expect("gueltig");

        rule.set_stop_line(line(10));
        assert_eq!(rule.stop_line().id, 10);
    }
}
