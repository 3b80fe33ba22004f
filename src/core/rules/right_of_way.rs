//! Vorfahrts-Regel: vorfahrtsberechtigte und wartepflichtige Lanelets.

use super::rule::{role, RegulatoryRule, RuleData, RuleRef};
use crate::core::{AttributeMap, Id, Lanelet, LineString3d};
use crate::error::MapError;
use std::any::Any;
use std::sync::Arc;

/// Fahrmanoever eines Lanelets in Bezug auf eine Vorfahrts-Regel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManeuverType {
    /// Lanelet hat Vorfahrt
    RightOfWay,
    /// Lanelet muss warten
    Yield,
    /// Lanelet ist nicht Teil der Regel
    Unknown,
}

/// Vorfahrts-Restriktion.
///
/// Haelt zwei Lanelet-Mengen: `right_of_way` (Vorfahrt) und `yield`
/// (wartepflichtig). Optional eine Haltelinie — fehlt sie, wird am Ende des
/// wartepflichtigen Lanelets gehalten — sowie unterstuetzende Schilder.
#[derive(Debug, Clone)]
pub struct RightOfWay {
    data: RuleData,
}

impl RightOfWay {
    /// Registry-Name dieser Variante.
    pub const RULE_NAME: &'static str = "right_of_way";

    /// Erstellt eine Vorfahrts-Regel.
    pub fn new(
        id: Id,
        attributes: AttributeMap,
        right_of_way: Vec<Arc<Lanelet>>,
        yield_lanelets: Vec<Arc<Lanelet>>,
        stop_line: Option<Arc<LineString3d>>,
    ) -> Result<Self, MapError> {
        let mut data = RuleData::new(id, attributes);
        for lanelet in right_of_way {
            data.add_ref(role::RIGHT_OF_WAY, RuleRef::Lanelet(lanelet));
        }
        for lanelet in yield_lanelets {
            data.add_ref(role::YIELD, RuleRef::Lanelet(lanelet));
        }
        if let Some(line) = stop_line {
            data.set_singular(role::REF_LINE, RuleRef::LineString(line));
        }
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
        for (name, label) in [
            (role::RIGHT_OF_WAY, "right_of_way"),
            (role::YIELD, "yield"),
        ] {
            if self.data.role(name).iter().any(|r| r.as_lanelet().is_none()) {
                return Err(MapError::invariant(
                    self.data.id,
                    format!("Rolle '{label}' darf nur Lanelets enthalten"),
                ));
            }
        }

        let ref_line = self.data.role(role::REF_LINE);
        if ref_line.len() > 1 || ref_line.iter().any(|r| r.as_line_string().is_none()) {
            return Err(MapError::invariant(
                self.data.id,
                "Haltelinie einer Vorfahrts-Regel ist hoechstens ein Linienzug",
            ));
        }
        Ok(())
    }

    /// Klassifiziert ein Lanelet als vorfahrtsberechtigt, wartepflichtig oder
    /// unbeteiligt.
    ///
    /// `right_of_way` wird vor `yield` geprueft. Diese Reihenfolge ist
    /// definiert, nicht willkuerlich: ein Lanelet, das faelschlich in beiden
    /// Mengen steht, wird als vorfahrtsberechtigt behandelt — auf einer
    /// Vorfahrtsstrasse faelschlich zu warten ist der harmlosere Fehler als
    /// faelschlich durchzufahren.
    pub fn maneuver(&self, lanelet: &Lanelet) -> ManeuverType {
        let is_member = |name: &str| {
            self.data
                .role(name)
                .iter()
                .any(|r| r.as_lanelet().is_some_and(|ll| ll.id == lanelet.id))
        };

        if is_member(role::RIGHT_OF_WAY) {
            ManeuverType::RightOfWay
        } else if is_member(role::YIELD) {
            ManeuverType::Yield
        } else {
            ManeuverType::Unknown
        }
    }

    /// Die vorfahrtsberechtigten Lanelets.
    pub fn right_of_way_lanelets(&self) -> Vec<Arc<Lanelet>> {
        self.data.lanelets(role::RIGHT_OF_WAY)
    }

    /// Die wartepflichtigen Lanelets.
    pub fn yield_lanelets(&self) -> Vec<Arc<Lanelet>> {
        self.data.lanelets(role::YIELD)
    }

    /// Die Haltelinie, falls vorhanden.
    pub fn stop_line(&self) -> Option<Arc<LineString3d>> {
        self.data.first_line_string(role::REF_LINE)
    }

    /// Unterstuetzende Schilder (Rolle `refers`), falls vorhanden.
    pub fn reference_signs(&self) -> Vec<Arc<LineString3d>> {
        self.data.line_strings(role::REFERS)
    }

    /// Ersetzt die Haltelinie.
    pub fn set_stop_line(&mut self, stop_line: Arc<LineString3d>) {
        self.data.set_singular(role::REF_LINE, RuleRef::LineString(stop_line));
    }

    /// Entfernt die Haltelinie. Gibt zurueck, ob eine vorhanden war.
    pub fn remove_stop_line(&mut self) -> bool {
        match self.data.first_line_string(role::REF_LINE) {
            Some(line) => self.data.remove_ref(role::REF_LINE, &RuleRef::LineString(line)),
            None => false,
        }
    }

    /// Fuegt ein vorfahrtsberechtigtes Lanelet hinzu.
    pub fn add_right_of_way_lanelet(&mut self, lanelet: Arc<Lanelet>) {
        self.data.add_ref(role::RIGHT_OF_WAY, RuleRef::Lanelet(lanelet));
    }

    /// Fuegt ein wartepflichtiges Lanelet hinzu.
    pub fn add_yield_lanelet(&mut self, lanelet: Arc<Lanelet>) {
        self.data.add_ref(role::YIELD, RuleRef::Lanelet(lanelet));
    }

    /// Entfernt ein vorfahrtsberechtigtes Lanelet. Gibt zurueck, ob es
    /// vorhanden war.
    pub fn remove_right_of_way_lanelet(&mut self, lanelet: &Arc<Lanelet>) -> bool {
        self.data
            .remove_ref(role::RIGHT_OF_WAY, &RuleRef::Lanelet(Arc::clone(lanelet)))
    }

    /// Entfernt ein wartepflichtiges Lanelet. Gibt zurueck, ob es vorhanden war.
    pub fn remove_yield_lanelet(&mut self, lanelet: &Arc<Lanelet>) -> bool {
        self.data
            .remove_ref(role::YIELD, &RuleRef::Lanelet(Arc::clone(lanelet)))
    }

    /// Fuegt ein unterstuetzendes Schild hinzu.
    pub fn add_reference_sign(&mut self, sign: Arc<LineString3d>) {
        self.data.add_ref(role::REFERS, RuleRef::LineString(sign));
    }

    /// Entfernt ein unterstuetzendes Schild. Gibt zurueck, ob es vorhanden war.
    pub fn remove_reference_sign(&mut self, sign: &Arc<LineString3d>) -> bool {
        self.data
            .remove_ref(role::REFERS, &RuleRef::LineString(Arc::clone(sign)))
    }
}

impl RegulatoryRule for RightOfWay {
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

    fn lanelet(id: Id) -> Arc<Lanelet> {
        Arc::new(Lanelet::new(id, line(id * 100 + 1), line(id * 100 + 2)))
    }

    #[test]
    fn test_maneuver_classification() {
        let rule = RightOfWay::new(
            1,
            AttributeMap::new(),
            vec![lanelet(10)],
            vec![lanelet(20)],
            None,
        )
        .expect("gueltig");

        assert_eq!(rule.maneuver(&lanelet(10)), ManeuverType::RightOfWay);
        assert_eq!(rule.maneuver(&lanelet(20)), ManeuverType::Yield);
        assert_eq!(rule.maneuver(&lanelet(30)), ManeuverType::Unknown);
    }

    #[test]
    fn test_maneuver_prefers_right_of_way_on_overlap() {
        // Ueberlappung ist zulaessig — right_of_way hat definierten Vorrang
        let rule = RightOfWay::new(
            1,
            AttributeMap::new(),
            vec![lanelet(10)],
            vec![lanelet(10)],
            None,
        )
        .expect("gueltig");

        assert_eq!(rule.maneuver(&lanelet(10)), ManeuverType::RightOfWay);
    }

    #[test]
    fn test_stop_line_is_optional() {
        let mut rule =
            RightOfWay::new(1, AttributeMap::new(), vec![lanelet(10)], Vec::new(), None)
                .expect("gueltig");

        assert!(rule.stop_line().is_none());
        assert!(!rule.remove_stop_line());

        rule.set_stop_line(line(7));
        assert_eq!(rule.stop_line().map(|l| l.id), Some(7));
        assert!(rule.remove_stop_line());
        assert!(rule.stop_line().is_none());
    }

    #[test]
    fn test_remove_unknown_lanelet_returns_false() {
        let mut rule =
            RightOfWay::new(1, AttributeMap::new(), vec![lanelet(10)], Vec::new(), None)
                .expect("gueltig");

        assert!(!rule.remove_yield_lanelet(&lanelet(10)));
        assert!(rule.remove_right_of_way_lanelet(&lanelet(10)));
        assert!(rule.right_of_way_lanelets().is_empty());
    }

    #[test]
    fn test_from_data_rejects_line_string_in_yield_role() {
        let mut data = RuleData::new(4, AttributeMap::new());
        data.add_ref(role::YIELD, RuleRef::LineString(line(1)));

        let err = RightOfWay::from_data(data).expect_err("Linienzug in yield-Rolle");
        assert!(matches!(err, MapError::InvariantViolation { id: 4, .. }));
    }
}
