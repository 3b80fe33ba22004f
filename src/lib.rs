//! lanemap: Regelwerk und Datei-I/O fuer digitale Fahrspurkarten.
//!
//! Zwei eng verzahnte Kerne: das Modell regulatorischer Regeln (Ampel,
//! Vorfahrt, Verkehrszeichen, Geschwindigkeit) auf Lanelets und das
//! Format-Handler-Framework, das Karten ueber austauschbare Parser/Writer
//! unter einer injizierten Projektion liest und schreibt. Beide haengen an
//! derselben offenen Registry: Parser rekonstruieren beliebige, auch erst
//! nachtraeglich registrierte Regeltypen aus generischen Rollen-Daten.

pub mod core;
pub mod error;
pub mod io;

pub use self::core::{
    construct_rule, is_rule_type_registered, register_rule_type, AttributeMap, GeoPoint, Id,
    Lanelet, LaneletMap, LineString3d, ManeuverType, Point3d, RegulatoryRule, RightOfWay, RoleMap,
    RuleData, RuleFactory, RuleRef, RuleRegistry, SignGroup, SpeedLimit, TrafficLight, TrafficSign,
};
pub use self::error::MapError;
pub use self::io::{
    load, load_from_origin, load_robust, load_robust_with_config, load_with_config,
    register_format_handler, write, write_robust, write_robust_with_config, write_with_config,
    Diagnostic, IoConfiguration, Origin, Projector, SphericalMercatorProjector,
};
