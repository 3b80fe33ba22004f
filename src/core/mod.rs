//! Core-Domaenentypen: Geometrie-Traeger, LaneletMap und regulatorische Regeln.

pub mod map;
pub mod primitives;
pub mod rules;

pub use map::LaneletMap;
pub use primitives::{AttributeMap, GeoPoint, Id, Lanelet, LineString3d, Point3d};
pub use rules::{
    construct_rule, is_rule_type_registered, register_rule_type, ManeuverType, RegulatoryRule,
    RightOfWay, RoleMap, RuleData, RuleFactory, RuleRef, RuleRegistry, SignGroup, SpeedLimit,
    TrafficLight, TrafficSign,
};
