//! Projektion zwischen geographischen und lokalen planaren Koordinaten.
//!
//! Die Projektion ist eine pro Aufruf injizierte Strategie: Parser und
//! Writer erhalten sie geliehen und behalten sie nicht. Als Standard dient
//! eine sphaerische Mercator-Projektion um einen Ursprung.

use crate::core::GeoPoint;
use glam::{DVec2, DVec3};

/// Erdradius in Metern (sphaerisches Modell, WGS84-Aequatorradius).
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Strategie zur Koordinaten-Umrechnung. Beide Richtungen muessen zueinander
/// invers sein.
pub trait Projector: Send + Sync {
    /// Geographisch → lokal planar (x/y in Metern, z = Hoehe).
    fn forward(&self, geo: GeoPoint) -> DVec3;

    /// Lokal planar → geographisch.
    fn reverse(&self, local: DVec3) -> GeoPoint;
}

/// Geographischer Ursprung einer Karte.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Origin {
    /// Position des Ursprungs
    pub position: GeoPoint,
}

impl Origin {
    /// Ursprung aus Breiten- und Laengengrad.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            position: GeoPoint::new(lat, lon),
        }
    }
}

/// Sphaerische Mercator-Projektion um einen Ursprung.
///
/// Fuer kleine Kartenausschnitte ausreichend genau; der Ursprung verschiebt
/// die lokalen Koordinaten in die Naehe von (0, 0).
#[derive(Debug, Clone, Copy)]
pub struct SphericalMercatorProjector {
    origin_offset: DVec2,
}

impl SphericalMercatorProjector {
    /// Erstellt die Projektion um den angegebenen Ursprung.
    pub fn new(origin: Origin) -> Self {
        Self {
            origin_offset: mercator_xy(origin.position),
        }
    }
}

fn mercator_xy(geo: GeoPoint) -> DVec2 {
    let x = EARTH_RADIUS_M * geo.lon.to_radians();
    let y = EARTH_RADIUS_M
        * (std::f64::consts::FRAC_PI_4 + geo.lat.to_radians() / 2.0)
            .tan()
            .ln();
    DVec2::new(x, y)
}

impl Projector for SphericalMercatorProjector {
    fn forward(&self, geo: GeoPoint) -> DVec3 {
        let xy = mercator_xy(geo) - self.origin_offset;
        DVec3::new(xy.x, xy.y, geo.ele)
    }

    fn reverse(&self, local: DVec3) -> GeoPoint {
        let xy = DVec2::new(local.x, local.y) + self.origin_offset;
        let lon = (xy.x / EARTH_RADIUS_M).to_degrees();
        let lat = (2.0 * (xy.y / EARTH_RADIUS_M).exp().atan()
            - std::f64::consts::FRAC_PI_2)
            .to_degrees();
        GeoPoint {
            lat,
            lon,
            ele: local.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_origin_maps_to_zero() {
        let projector = SphericalMercatorProjector::new(Origin::new(49.0, 8.4));
        let local = projector.forward(GeoPoint::new(49.0, 8.4));

        assert_relative_eq!(local.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(local.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_forward_reverse_is_identity() {
        let projector = SphericalMercatorProjector::new(Origin::new(49.0, 8.4));
        let geo = GeoPoint {
            lat: 49.00123,
            lon: 8.40456,
            ele: 113.5,
        };

        let roundtrip = projector.reverse(projector.forward(geo));
        assert_relative_eq!(roundtrip.lat, geo.lat, epsilon = 1e-9);
        assert_relative_eq!(roundtrip.lon, geo.lon, epsilon = 1e-9);
        assert_relative_eq!(roundtrip.ele, geo.ele, epsilon = 1e-9);
    }

    #[test]
    fn test_eastward_offset_is_positive_x() {
        let projector = SphericalMercatorProjector::new(Origin::new(49.0, 8.4));
        let local = projector.forward(GeoPoint::new(49.0, 8.41));
        assert!(local.x > 0.0);
        // Grob: 0.01 Grad Laenge ≈ 1.1 km Mercator-x
        assert!(local.x > 1000.0 && local.x < 1300.0);
    }
}
