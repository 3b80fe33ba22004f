//! Minimale Geometrie-Traeger: Punkte, Linienzuege und Lanelets.
//!
//! Geometrische Arithmetik ist bewusst nicht Teil dieser Bibliothek — die
//! Typen hier transportieren Ids, Koordinaten und Attribute durch die
//! I/O-Pipeline und dienen Regeln als referenzierbare Elemente.
//! Gleichheit ist ueberall Id-Gleichheit.

use glam::DVec3;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Element-Id. Vorzeichenbehaftet nach OSM-Konvention (negative Ids sind
/// fuer noch nicht hochgeladene Elemente zulaessig).
pub type Id = i64;

/// Attribut-Abbildung eines Elements (Schluessel → Wert).
/// BTreeMap haelt die Serialisierung deterministisch; die Einfuegereihenfolge
/// ist ohne Bedeutung.
pub type AttributeMap = BTreeMap<String, String>;

/// Geographische Koordinate (Breite/Laenge in Grad, Hoehe in Metern).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoPoint {
    /// Breitengrad in Grad
    pub lat: f64,
    /// Laengengrad in Grad
    pub lon: f64,
    /// Hoehe ueber Referenz in Metern
    pub ele: f64,
}

impl GeoPoint {
    /// Erstellt eine Koordinate ohne Hoehenangabe.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon, ele: 0.0 }
    }
}

/// Punkt in lokalen planaren Koordinaten (Ergebnis der Projektion).
#[derive(Debug, Clone, Copy)]
pub struct Point3d {
    /// Eindeutige Id des Punkts
    pub id: Id,
    /// Lokale Koordinaten (x/y planar, z = Hoehe)
    pub position: DVec3,
}

impl Point3d {
    /// Erstellt einen Punkt.
    pub fn new(id: Id, position: DVec3) -> Self {
        Self { id, position }
    }
}

impl PartialEq for Point3d {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Point3d {}

/// Linienzug aus geordneten Punkten.
///
/// Repraesentiert je nach `type`-Attribut z.B. eine Fahrspurgrenze, eine
/// Haltelinie, die Leuchtflaeche einer Ampel (von links nach rechts) oder
/// die Kante eines Verkehrsschilds.
#[derive(Debug, Clone)]
pub struct LineString3d {
    /// Eindeutige Id
    pub id: Id,
    /// Punkte in Zeichenreihenfolge
    pub points: Vec<Point3d>,
    /// Attribute (z.B. `type`, `subtype`)
    pub attributes: AttributeMap,
}

impl LineString3d {
    /// Erstellt einen Linienzug ohne Attribute.
    pub fn new(id: Id, points: Vec<Point3d>) -> Self {
        Self {
            id,
            points,
            attributes: AttributeMap::new(),
        }
    }

    /// Erstellt einen Linienzug mit Attributen.
    pub fn with_attributes(id: Id, points: Vec<Point3d>, attributes: AttributeMap) -> Self {
        Self {
            id,
            points,
            attributes,
        }
    }

    /// Liest ein Attribut.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

impl PartialEq for LineString3d {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for LineString3d {}

/// Fahrspursegment: gerichteter Fahrbahnstreifen zwischen linker und rechter
/// Begrenzung.
///
/// Regeln werden nicht besessen, sondern ueber `regulatory_refs` per Id
/// referenziert — Eigentuemerin der Regeln ist die [`super::LaneletMap`].
#[derive(Debug, Clone)]
pub struct Lanelet {
    /// Eindeutige Id
    pub id: Id,
    /// Linke Begrenzung
    pub left: Arc<LineString3d>,
    /// Rechte Begrenzung
    pub right: Arc<LineString3d>,
    /// Attribute (z.B. `subtype`, `location`)
    pub attributes: AttributeMap,
    /// Ids der regulatorischen Regeln, die fuer dieses Lanelet gelten
    pub regulatory_refs: Vec<Id>,
}

impl Lanelet {
    /// Erstellt ein Lanelet ohne Regel-Referenzen.
    pub fn new(id: Id, left: Arc<LineString3d>, right: Arc<LineString3d>) -> Self {
        Self {
            id,
            left,
            right,
            attributes: AttributeMap::new(),
            regulatory_refs: Vec::new(),
        }
    }

    /// Liest ein Attribut.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

impl PartialEq for Lanelet {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Lanelet {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_by_id() {
        let a = LineString3d::new(7, vec![Point3d::new(1, DVec3::ZERO)]);
        let b = LineString3d::new(7, Vec::new());
        let c = LineString3d::new(8, Vec::new());

        assert_eq!(a, b, "Gleiche Id soll gleiches Element bedeuten");
        assert_ne!(a, c);
    }

    #[test]
    fn test_lanelet_equality_ignores_boundaries() {
        let left = Arc::new(LineString3d::new(1, Vec::new()));
        let right = Arc::new(LineString3d::new(2, Vec::new()));
        let other = Arc::new(LineString3d::new(3, Vec::new()));

        let a = Lanelet::new(10, Arc::clone(&left), Arc::clone(&right));
        let b = Lanelet::new(10, other, right);

        assert_eq!(a, b);
    }
}
