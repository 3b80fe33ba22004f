//! Regulatorische Regeln: Varianten, gemeinsame Basis und Registry.

pub mod registry;
pub mod right_of_way;
pub mod rule;
pub mod traffic_light;
pub mod traffic_sign;

pub use registry::{
    construct_rule, is_rule_type_registered, register_rule_type, RuleFactory, RuleRegistry,
};
pub use right_of_way::{ManeuverType, RightOfWay};
pub use rule::{role, RegulatoryRule, RoleMap, RuleData, RuleRef};
pub use traffic_light::TrafficLight;
pub use traffic_sign::{sign_type_value, split_sign_type, SignGroup, SpeedLimit, TrafficSign};
