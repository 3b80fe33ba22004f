//! Gemeinsame Basis aller regulatorischen Regeln.
//!
//! Jede Regel-Variante besitzt eine [`RuleData`]: Id, Attribute und eine
//! Rollen-Abbildung (Rollenname → geordnete Referenzliste). Die `RuleData`
//! ist gleichzeitig die generische Zerlegung, ueber die Format-Handler
//! Regeln schreiben und die Registry Regeln rekonstruiert — ein Handler
//! braucht keinerlei Wissen ueber konkrete Varianten.

use crate::core::{AttributeMap, Id, Lanelet, LineString3d};
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Bekannte Rollennamen der eingebauten Regel-Varianten.
pub mod role {
    /// Elemente, auf die sich die Regel bezieht (Ampeln, Schilder)
    pub const REFERS: &str = "refers";
    /// Linie, ab der die Regel gilt (Haltelinie)
    pub const REF_LINE: &str = "ref_line";
    /// Vorfahrtsberechtigte Lanelets
    pub const RIGHT_OF_WAY: &str = "right_of_way";
    /// Wartepflichtige Lanelets
    pub const YIELD: &str = "yield";
    /// Schilder, die die Regel aufheben
    pub const CANCELS: &str = "cancels";
    /// Linien, ab denen die Regel nicht mehr gilt
    pub const CANCEL_LINE: &str = "cancel_line";
}

/// Referenz auf ein Element, das in einer Rolle einer Regel steht.
///
/// Gleichheit ist Element-Gleichheit (Art + Id), nicht Zeiger-Gleichheit.
#[derive(Debug, Clone)]
pub enum RuleRef {
    /// Referenz auf einen Linienzug
    LineString(Arc<LineString3d>),
    /// Referenz auf ein Lanelet
    Lanelet(Arc<Lanelet>),
}

impl RuleRef {
    /// Id des referenzierten Elements.
    pub fn element_id(&self) -> Id {
        match self {
            RuleRef::LineString(ls) => ls.id,
            RuleRef::Lanelet(ll) => ll.id,
        }
    }

    /// Referenzierter Linienzug, falls die Referenz einer ist.
    pub fn as_line_string(&self) -> Option<&Arc<LineString3d>> {
        match self {
            RuleRef::LineString(ls) => Some(ls),
            RuleRef::Lanelet(_) => None,
        }
    }

    /// Referenziertes Lanelet, falls die Referenz eines ist.
    pub fn as_lanelet(&self) -> Option<&Arc<Lanelet>> {
        match self {
            RuleRef::Lanelet(ll) => Some(ll),
            RuleRef::LineString(_) => None,
        }
    }
}

impl PartialEq for RuleRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RuleRef::LineString(a), RuleRef::LineString(b)) => a.id == b.id,
            (RuleRef::Lanelet(a), RuleRef::Lanelet(b)) => a.id == b.id,
            _ => false,
        }
    }
}

impl Eq for RuleRef {}

/// Rollen-Abbildung: Rollenname → geordnete Referenzliste.
/// IndexMap haelt die Rollen-Reihenfolge beim Serialisieren stabil.
pub type RoleMap = IndexMap<String, Vec<RuleRef>>;

/// Generischer Zustand einer Regel: Id, Attribute, Rollen.
#[derive(Debug, Clone, Default)]
pub struct RuleData {
    /// Stabile Id der Regel
    pub id: Id,
    /// Attribute der Regel selbst
    pub attributes: AttributeMap,
    /// Rollen mit ihren Referenzlisten
    pub roles: RoleMap,
}

impl RuleData {
    /// Erstellt eine leere `RuleData`.
    pub fn new(id: Id, attributes: AttributeMap) -> Self {
        Self {
            id,
            attributes,
            roles: RoleMap::new(),
        }
    }

    /// Referenzliste einer Rolle (leer, wenn die Rolle fehlt).
    pub fn role(&self, name: &str) -> &[RuleRef] {
        self.roles.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Haengt eine Referenz an eine Rolle an.
    pub fn add_ref(&mut self, name: &str, reference: RuleRef) {
        self.roles.entry(name.to_string()).or_default().push(reference);
    }

    /// Haengt eine Referenz an, sofern sie nicht bereits enthalten ist.
    /// Gibt `false` zurueck, wenn die identische Referenz schon vorhanden war.
    pub fn add_ref_unique(&mut self, name: &str, reference: RuleRef) -> bool {
        let list = self.roles.entry(name.to_string()).or_default();
        if list.contains(&reference) {
            return false;
        }
        list.push(reference);
        true
    }

    /// Entfernt das erste Vorkommen einer Referenz aus einer Rolle.
    /// Gibt zurueck, ob die Referenz vorhanden war. Leere Rollen bleiben als
    /// leere Liste erhalten, damit die Rollen-Reihenfolge stabil bleibt.
    pub fn remove_ref(&mut self, name: &str, reference: &RuleRef) -> bool {
        let Some(list) = self.roles.get_mut(name) else {
            return false;
        };
        match list.iter().position(|r| r == reference) {
            Some(index) => {
                list.remove(index);
                true
            }
            None => false,
        }
    }

    /// Ersetzt den Inhalt einer Rolle mit Kardinalitaet 1 vollstaendig.
    pub fn set_singular(&mut self, name: &str, reference: RuleRef) {
        let list = self.roles.entry(name.to_string()).or_default();
        list.clear();
        list.push(reference);
    }

    /// Alle Linienzug-Referenzen einer Rolle.
    pub fn line_strings(&self, name: &str) -> Vec<Arc<LineString3d>> {
        self.role(name)
            .iter()
            .filter_map(|r| r.as_line_string().cloned())
            .collect()
    }

    /// Alle Lanelet-Referenzen einer Rolle.
    pub fn lanelets(&self, name: &str) -> Vec<Arc<Lanelet>> {
        self.role(name)
            .iter()
            .filter_map(|r| r.as_lanelet().cloned())
            .collect()
    }

    /// Erste Linienzug-Referenz einer Rolle.
    pub fn first_line_string(&self, name: &str) -> Option<Arc<LineString3d>> {
        self.role(name).first().and_then(|r| r.as_line_string().cloned())
    }
}

/// Gemeinsame Schnittstelle aller Regel-Varianten.
///
/// Varianten werden ueber die [`super::registry`] per Namen rekonstruiert und
/// liegen in der Karte als Trait-Objekte. Konkrete Mutationen laufen ueber
/// die Variante selbst (Downcast via [`RegulatoryRule::as_any_mut`]), damit
/// deren Invarianten nicht umgangen werden koennen.
pub trait RegulatoryRule: fmt::Debug + Send + Sync {
    /// Stabile Id der Regel.
    fn id(&self) -> Id;

    /// Registry-Name des Variantentyps (z.B. `traffic_light`).
    fn rule_name(&self) -> &'static str;

    /// Attribute der Regel.
    fn attributes(&self) -> &AttributeMap;

    /// Generische Zerlegung der Regel fuer Format-Handler.
    fn data(&self) -> &RuleData;

    /// Downcast-Zugriff auf die konkrete Variante.
    fn as_any(&self) -> &dyn Any;

    /// Veraenderlicher Downcast-Zugriff auf die konkrete Variante.
    fn as_any_mut(&mut self) -> &mut dyn Any;
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
    fn test_missing_role_reads_as_empty() {
        let data = RuleData::new(1, AttributeMap::new());
        assert!(data.role(role::REFERS).is_empty());
    }

    #[test]
    fn test_add_ref_unique_rejects_same_element() {
        let mut data = RuleData::new(1, AttributeMap::new());
        assert!(data.add_ref_unique(role::REFERS, RuleRef::LineString(line(5))));
        assert!(!data.add_ref_unique(role::REFERS, RuleRef::LineString(line(5))));
        assert_eq!(data.role(role::REFERS).len(), 1);
    }

    #[test]
    fn test_remove_ref_keeps_order_of_remaining() {
        let mut data = RuleData::new(1, AttributeMap::new());
        data.add_ref(role::REFERS, RuleRef::LineString(line(1)));
        data.add_ref(role::REFERS, RuleRef::LineString(line(2)));
        data.add_ref(role::REFERS, RuleRef::LineString(line(3)));

        assert!(data.remove_ref(role::REFERS, &RuleRef::LineString(line(2))));
        let ids: Vec<Id> = data.role(role::REFERS).iter().map(RuleRef::element_id).collect();
        assert_eq!(ids, vec![1, 3]);

        assert!(!data.remove_ref(role::REFERS, &RuleRef::LineString(line(2))));
    }

    #[test]
    fn test_set_singular_overwrites() {
        let mut data = RuleData::new(1, AttributeMap::new());
        data.set_singular(role::REF_LINE, RuleRef::LineString(line(1)));
        data.set_singular(role::REF_LINE, RuleRef::LineString(line(2)));

        assert_eq!(data.role(role::REF_LINE).len(), 1);
        assert_eq!(data.role(role::REF_LINE)[0].element_id(), 2);
    }
}
