//! Verkehrszeichen-Regel und die darauf aufbauende Geschwindigkeits-Regel.

use super::rule::{role, RegulatoryRule, RuleData, RuleRef};
use crate::core::{AttributeMap, Id, LineString3d};
use crate::error::MapError;
use regex::Regex;
use std::any::Any;
use std::sync::{Arc, LazyLock};

/// Attribut, das einen explizit gesetzten Schildtyp auf der Regel ablegt.
const ATTR_SIGN_TYPE: &str = "sign_type";
/// Attribut fuer den explizit gesetzten Typ der aufhebenden Schilder.
const ATTR_CANCEL_TYPE: &str = "cancel_type";
/// Attribut, das den Typ auf dem Schild-Linienzug selbst traegt.
const ATTR_SUBTYPE: &str = "subtype";

/// Schildtypen haben die Form Laendercode + Nummer, z.B. `de205` oder
/// `de274-60` (Zusatzwert nach Bindestrich).
static SIGN_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<country>[a-z]{2,3})(?P<number>\d+[\w.]*)(?:-(?P<value>[\d.]+))?$")
        .expect("Schildtyp-Regex ist statisch gueltig")
});

/// Zerlegt einen Schildtyp in Laendercode und Rest.
/// Gibt `None` zurueck, wenn der String nicht dem Schema entspricht.
pub fn split_sign_type(sign_type: &str) -> Option<(&str, &str)> {
    let captures = SIGN_TYPE_RE.captures(sign_type)?;
    let country = captures.name("country")?;
    Some((country.as_str(), &sign_type[country.end()..]))
}

/// Liest den Zusatzwert eines Schildtyps (z.B. 60 aus `de274-60`).
pub fn sign_type_value(sign_type: &str) -> Option<f64> {
    let captures = SIGN_TYPE_RE.captures(sign_type)?;
    captures.name("value")?.as_str().parse().ok()
}

/// Eingabe fuer Schild-Regeln: Schilder plus optional deren expliziter Typ.
///
/// Fehlt `sign_type`, wird der Typ spaeter aus dem `subtype`-Attribut des
/// ersten Schilds abgeleitet.
#[derive(Debug, Clone, Default)]
pub struct SignGroup {
    /// Die Schild-Linienzuege (linke bis rechte Kante des Schilds)
    pub signs: Vec<Arc<LineString3d>>,
    /// Expliziter Typ im Format Laendercode + Nummer
    pub sign_type: Option<String>,
}

impl SignGroup {
    /// Schilder ohne expliziten Typ.
    pub fn new(signs: Vec<Arc<LineString3d>>) -> Self {
        Self {
            signs,
            sign_type: None,
        }
    }

    /// Schilder mit explizitem Typ.
    pub fn with_type(signs: Vec<Arc<LineString3d>>, sign_type: impl Into<String>) -> Self {
        Self {
            signs,
            sign_type: Some(sign_type.into()),
        }
    }
}

/// Generische Verkehrszeichen-Regel.
///
/// Rollen: `refers` (mindestens ein Schild, alle mit demselben Symbol),
/// `cancels` (aufhebende Schilder, optional), `ref_line` (Linien, ab denen
/// die Regel gilt — fehlen sie, gilt sie auf dem ganzen Lanelet) und
/// `cancel_line` (Linien, ab denen die Regel nicht mehr gilt).
#[derive(Debug, Clone)]
pub struct TrafficSign {
    data: RuleData,
}

impl TrafficSign {
    /// Registry-Name dieser Variante.
    pub const RULE_NAME: &'static str = "traffic_sign";

    /// Erstellt eine gueltige Verkehrszeichen-Regel.
    ///
    /// Schlaegt mit `InvariantViolation` fehl, wenn `signs` keine Schilder
    /// enthaelt.
    pub fn new(
        id: Id,
        attributes: AttributeMap,
        signs: SignGroup,
        cancelling_signs: SignGroup,
        ref_lines: Vec<Arc<LineString3d>>,
        cancel_lines: Vec<Arc<LineString3d>>,
    ) -> Result<Self, MapError> {
        let mut data = RuleData::new(id, attributes);
        if let Some(sign_type) = signs.sign_type {
            data.attributes.insert(ATTR_SIGN_TYPE.to_string(), sign_type);
        }
        if let Some(cancel_type) = cancelling_signs.sign_type {
            data.attributes.insert(ATTR_CANCEL_TYPE.to_string(), cancel_type);
        }
        for sign in signs.signs {
            data.add_ref(role::REFERS, RuleRef::LineString(sign));
        }
        for sign in cancelling_signs.signs {
            data.add_ref(role::CANCELS, RuleRef::LineString(sign));
        }
        for line in ref_lines {
            data.add_ref(role::REF_LINE, RuleRef::LineString(line));
        }
        for line in cancel_lines {
            data.add_ref(role::CANCEL_LINE, RuleRef::LineString(line));
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
        if self.data.role(role::REFERS).is_empty() {
            return Err(MapError::invariant(
                self.data.id,
                "Verkehrszeichen-Regel ohne Schilder (Rolle 'refers' ist leer)",
            ));
        }
        for name in [role::REFERS, role::CANCELS, role::REF_LINE, role::CANCEL_LINE] {
            if self.data.role(name).iter().any(|r| r.as_line_string().is_none()) {
                return Err(MapError::invariant(
                    self.data.id,
                    format!("Rolle '{name}' darf nur Linienzuege enthalten"),
                ));
            }
        }
        Ok(())
    }

    /// Typ des Schilds im Format Laendercode + Nummer (z.B. `de205`).
    ///
    /// Ein bei der Konstruktion explizit gesetzter Typ gewinnt unveraendert.
    /// Sonst wird das `subtype`-Attribut des *ersten* Schilds gelesen —
    /// genau eines, denn alle Schilder muessen dasselbe Symbol zeigen.
    /// Leerer String, wenn beides fehlt.
    pub fn sign_type(&self) -> String {
        Self::type_from(&self.data, ATTR_SIGN_TYPE, role::REFERS)
    }

    /// Typ der aufhebenden Schilder, analog zu [`TrafficSign::sign_type`].
    pub fn cancel_type(&self) -> String {
        Self::type_from(&self.data, ATTR_CANCEL_TYPE, role::CANCELS)
    }

    fn type_from(data: &RuleData, attribute: &str, role_name: &str) -> String {
        if let Some(explicit) = data.attributes.get(attribute) {
            return explicit.clone();
        }
        data.first_line_string(role_name)
            .and_then(|sign| sign.attribute(ATTR_SUBTYPE).map(str::to_string))
            .unwrap_or_default()
    }

    /// Die Schilder der Regel.
    pub fn signs(&self) -> Vec<Arc<LineString3d>> {
        self.data.line_strings(role::REFERS)
    }

    /// Die aufhebenden Schilder, falls vorhanden.
    pub fn cancelling_signs(&self) -> Vec<Arc<LineString3d>> {
        self.data.line_strings(role::CANCELS)
    }

    /// Linien, ab denen die Regel gilt.
    pub fn ref_lines(&self) -> Vec<Arc<LineString3d>> {
        self.data.line_strings(role::REF_LINE)
    }

    /// Linien, ab denen die Regel nicht mehr gilt.
    pub fn cancel_lines(&self) -> Vec<Arc<LineString3d>> {
        self.data.line_strings(role::CANCEL_LINE)
    }

    /// Fuegt ein weiteres Schild hinzu.
    pub fn add_sign(&mut self, sign: Arc<LineString3d>) {
        self.data.add_ref(role::REFERS, RuleRef::LineString(sign));
    }

    /// Entfernt ein Schild. Gibt zurueck, ob es vorhanden war.
    pub fn remove_sign(&mut self, sign: &Arc<LineString3d>) -> bool {
        if self.data.role(role::REFERS).len() == 1 {
            // Die letzte Referenz wuerde die Regel ungueltig machen
            return false;
        }
        self.data
            .remove_ref(role::REFERS, &RuleRef::LineString(Arc::clone(sign)))
    }

    /// Fuegt ein aufhebendes Schild hinzu.
    pub fn add_cancelling_sign(&mut self, sign: Arc<LineString3d>) {
        self.data.add_ref(role::CANCELS, RuleRef::LineString(sign));
    }

    /// Entfernt ein aufhebendes Schild. Gibt zurueck, ob es vorhanden war.
    pub fn remove_cancelling_sign(&mut self, sign: &Arc<LineString3d>) -> bool {
        self.data
            .remove_ref(role::CANCELS, &RuleRef::LineString(Arc::clone(sign)))
    }

    /// Fuegt eine Gueltigkeitslinie hinzu.
    pub fn add_ref_line(&mut self, line: Arc<LineString3d>) {
        self.data.add_ref(role::REF_LINE, RuleRef::LineString(line));
    }

    /// Entfernt eine Gueltigkeitslinie. Gibt zurueck, ob sie vorhanden war.
    pub fn remove_ref_line(&mut self, line: &Arc<LineString3d>) -> bool {
        self.data
            .remove_ref(role::REF_LINE, &RuleRef::LineString(Arc::clone(line)))
    }

    /// Fuegt eine Aufhebungslinie hinzu.
    pub fn add_cancel_line(&mut self, line: Arc<LineString3d>) {
        self.data.add_ref(role::CANCEL_LINE, RuleRef::LineString(line));
    }

    /// Entfernt eine Aufhebungslinie. Gibt zurueck, ob sie vorhanden war.
    pub fn remove_cancel_line(&mut self, line: &Arc<LineString3d>) -> bool {
        self.data
            .remove_ref(role::CANCEL_LINE, &RuleRef::LineString(Arc::clone(line)))
    }
}

impl RegulatoryRule for TrafficSign {
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

/// Geschwindigkeits-Regel.
///
/// Strukturell ein Verkehrszeichen mit eigenem Registry-Namen; der Schildtyp
/// kodiert die Hoechstgeschwindigkeit (z.B. `de274-60`). Duenne Huelle statt
/// Vererbung: alle Zugriffe delegieren an das innere [`TrafficSign`].
#[derive(Debug, Clone)]
pub struct SpeedLimit {
    sign: TrafficSign,
}

impl SpeedLimit {
    /// Registry-Name dieser Variante.
    pub const RULE_NAME: &'static str = "speed_limit";

    /// Erstellt eine Geschwindigkeits-Regel. Gleiche Form wie
    /// [`TrafficSign::new`].
    pub fn new(
        id: Id,
        attributes: AttributeMap,
        signs: SignGroup,
        cancelling_signs: SignGroup,
        ref_lines: Vec<Arc<LineString3d>>,
        cancel_lines: Vec<Arc<LineString3d>>,
    ) -> Result<Self, MapError> {
        Ok(Self {
            sign: TrafficSign::new(id, attributes, signs, cancelling_signs, ref_lines, cancel_lines)?,
        })
    }

    /// Rekonstruiert die Regel aus generischen Rollen-Daten (Registry-Factory).
    pub fn from_data(data: RuleData) -> Result<Self, MapError> {
        Ok(Self {
            sign: TrafficSign::from_data(data)?,
        })
    }

    /// Factory fuer die Rule-Registry.
    pub(crate) fn construct(data: RuleData) -> Result<Box<dyn RegulatoryRule>, MapError> {
        Ok(Box::new(Self::from_data(data)?))
    }

    /// Typ des Schilds, siehe [`TrafficSign::sign_type`].
    pub fn sign_type(&self) -> String {
        self.sign.sign_type()
    }

    /// Typ der aufhebenden Schilder, siehe [`TrafficSign::cancel_type`].
    pub fn cancel_type(&self) -> String {
        self.sign.cancel_type()
    }

    /// Grenzwert aus dem Schildtyp, falls er einen Zusatzwert traegt
    /// (`de274-60` → 60).
    pub fn limit_value(&self) -> Option<f64> {
        sign_type_value(&self.sign_type())
    }

    /// Die Schilder der Regel.
    pub fn signs(&self) -> Vec<Arc<LineString3d>> {
        self.sign.signs()
    }

    /// Die aufhebenden Schilder.
    pub fn cancelling_signs(&self) -> Vec<Arc<LineString3d>> {
        self.sign.cancelling_signs()
    }

    /// Linien, ab denen die Regel gilt.
    pub fn ref_lines(&self) -> Vec<Arc<LineString3d>> {
        self.sign.ref_lines()
    }

    /// Linien, ab denen die Regel nicht mehr gilt.
    pub fn cancel_lines(&self) -> Vec<Arc<LineString3d>> {
        self.sign.cancel_lines()
    }

    /// Zugriff auf die Verkehrszeichen-Sicht der Regel (fuer Mutationen).
    pub fn as_sign(&self) -> &TrafficSign {
        &self.sign
    }

    /// Veraenderlicher Zugriff auf die Verkehrszeichen-Sicht der Regel.
    pub fn as_sign_mut(&mut self) -> &mut TrafficSign {
        &mut self.sign
    }
}

impl RegulatoryRule for SpeedLimit {
    fn id(&self) -> Id {
        self.sign.id()
    }

    fn rule_name(&self) -> &'static str {
        Self::RULE_NAME
    }

    fn attributes(&self) -> &AttributeMap {
        self.sign.attributes()
    }

    fn data(&self) -> &RuleData {
        self.sign.data()
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

    fn tagged_sign(id: Id, subtype: &str) -> Arc<LineString3d> {
        let mut attributes = AttributeMap::new();
        attributes.insert("type".to_string(), "traffic_sign".to_string());
        attributes.insert("subtype".to_string(), subtype.to_string());
        Arc::new(LineString3d::with_attributes(id, Vec::new(), attributes))
    }

    #[test]
    fn test_explicit_type_wins_over_sign_attributes() {
        let rule = TrafficSign::new(
            1,
            AttributeMap::new(),
            SignGroup::with_type(vec![tagged_sign(1, "de206")], "de205"),
            SignGroup::default(),
            Vec::new(),
            Vec::new(),
        )
        .expect("gueltig");

        assert_eq!(rule.sign_type(), "de205");
    }

    #[test]
    fn test_type_derivation_reads_only_first_sign() {
        // Erstes Schild ohne subtype, zweites mit — Ergebnis bleibt leer
        let rule = TrafficSign::new(
            1,
            AttributeMap::new(),
            SignGroup::new(vec![line(1), tagged_sign(2, "de205")]),
            SignGroup::default(),
            Vec::new(),
            Vec::new(),
        )
        .expect("gueltig");

        assert_eq!(rule.sign_type(), "");
    }

    #[test]
    fn test_cancel_type_derived_from_cancelling_signs() {
        let rule = TrafficSign::new(
            1,
            AttributeMap::new(),
            SignGroup::new(vec![tagged_sign(1, "de274-60")]),
            SignGroup::new(vec![tagged_sign(2, "de278-60")]),
            Vec::new(),
            Vec::new(),
        )
        .expect("gueltig");

        assert_eq!(rule.sign_type(), "de274-60");
        assert_eq!(rule.cancel_type(), "de278-60");
    }

    #[test]
    fn test_empty_signs_is_invariant_violation() {
        let err = TrafficSign::new(
            3,
            AttributeMap::new(),
            SignGroup::default(),
            SignGroup::default(),
            Vec::new(),
            Vec::new(),
        )
        .expect_err("Leere Schilderliste muss abgelehnt werden");
        assert!(matches!(err, MapError::InvariantViolation { id: 3, .. }));
    }

    #[test]
    fn test_add_remove_sign_roundtrip() {
        let mut rule = TrafficSign::new(
            1,
            AttributeMap::new(),
            SignGroup::new(vec![line(1)]),
            SignGroup::default(),
            Vec::new(),
            Vec::new(),
        )
        .expect("gueltig");

        let before = rule.signs().len();
        rule.add_sign(line(2));
        assert!(rule.remove_sign(&line(2)));
        assert_eq!(rule.signs().len(), before);

        // Nie hinzugefuegt → false, kein Zustandswechsel
        assert!(!rule.remove_sign(&line(99)));
        assert_eq!(rule.signs().len(), before);
    }

    #[test]
    fn test_speed_limit_parses_value_from_type() {
        let rule = SpeedLimit::new(
            2,
            AttributeMap::new(),
            SignGroup::new(vec![tagged_sign(1, "de274-60")]),
            SignGroup::default(),
            Vec::new(),
            Vec::new(),
        )
        .expect("gueltig");

        assert_eq!(rule.rule_name(), "speed_limit");
        assert_eq!(rule.limit_value(), Some(60.0));
    }

    #[test]
    fn test_split_sign_type() {
        assert_eq!(split_sign_type("de205"), Some(("de", "205")));
        assert_eq!(split_sign_type("de274-60"), Some(("de", "274-60")));
        assert_eq!(split_sign_type("kein-schild"), None);
        assert_eq!(sign_type_value("de274-60"), Some(60.0));
        assert_eq!(sign_type_value("de205"), None);
    }
}
