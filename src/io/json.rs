//! JSON-Format-Handler (Endung `.json`, Name `json_handler`).
//!
//! Direktes serde-Datenmodell derselben Karte. Regeln reisen als generische
//! Datensaetze (Typname, Id, Attribute, Rollen) und werden beim Laden wie
//! beim OSM-Handler ueber die Rule-Registry rekonstruiert.

use crate::core::rules::{construct_rule, RuleData, RuleRef};
use crate::core::{AttributeMap, GeoPoint, Id, Lanelet, LaneletMap, LineString3d, Point3d};
use crate::error::MapError;
use crate::io::configuration::IoConfiguration;
use crate::io::handlers::{MapParser, MapWriter};
use crate::io::projection::Projector;
use crate::io::{skip_or_fail, Diagnostic};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize, Default)]
struct JsonMap {
    #[serde(default)]
    line_strings: Vec<JsonLineString>,
    #[serde(default)]
    lanelets: Vec<JsonLanelet>,
    #[serde(default)]
    rules: Vec<JsonRule>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonPoint {
    id: Id,
    lat: f64,
    lon: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    ele: f64,
}

fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonLineString {
    id: Id,
    points: Vec<JsonPoint>,
    #[serde(default, skip_serializing_if = "AttributeMap::is_empty")]
    attributes: AttributeMap,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonLanelet {
    id: Id,
    left: Id,
    right: Id,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    regulatory_refs: Vec<Id>,
    #[serde(default, skip_serializing_if = "AttributeMap::is_empty")]
    attributes: AttributeMap,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonRule {
    rule_name: String,
    id: Id,
    #[serde(default, skip_serializing_if = "AttributeMap::is_empty")]
    attributes: AttributeMap,
    #[serde(default)]
    roles: Vec<JsonRole>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonRole {
    name: String,
    members: Vec<JsonRoleMember>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonRoleMember {
    kind: JsonMemberKind,
    id: Id,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum JsonMemberKind {
    LineString,
    Lanelet,
}

/// Parser-Seite des JSON-Handlers.
#[derive(Debug, Default)]
pub struct JsonParser;

impl JsonParser {
    /// Erstellt den Parser.
    pub fn new() -> Self {
        Self
    }
}

/// Writer-Seite des JSON-Handlers.
#[derive(Debug, Default)]
pub struct JsonWriter;

impl JsonWriter {
    /// Erstellt den Writer.
    pub fn new() -> Self {
        Self
    }
}

impl MapParser for JsonParser {
    fn parse_map(
        &self,
        input: &str,
        projector: &dyn Projector,
        _config: &IoConfiguration,
        mut diagnostics: Option<&mut Vec<Diagnostic>>,
    ) -> Result<LaneletMap, MapError> {
        // Syntaxfehler sind Top-Level-Fehler, auch im robusten Modus
        let parsed: JsonMap = serde_json::from_str(input)
            .map_err(|err| MapError::parse("JSON-Dokument", err.to_string()))?;

        let mut map = LaneletMap::new();

        for raw in &parsed.line_strings {
            let points = raw
                .points
                .iter()
                .map(|p| {
                    Point3d::new(
                        p.id,
                        projector.forward(GeoPoint {
                            lat: p.lat,
                            lon: p.lon,
                            ele: p.ele,
                        }),
                    )
                })
                .collect();
            map.add_line_string(Arc::new(LineString3d::with_attributes(
                raw.id,
                points,
                raw.attributes.clone(),
            )));
        }

        for raw in &parsed.lanelets {
            let element = format!("Lanelet {}", raw.id);
            match build_lanelet(raw, &map) {
                Ok(lanelet) => map.add_lanelet(Arc::new(lanelet)),
                Err(err) => skip_or_fail(&mut diagnostics, &element, err)?,
            }
        }

        for raw in &parsed.rules {
            let element = format!("Regel {}", raw.id);
            match build_rule_data(raw, &map) {
                Ok(data) => match construct_rule(&raw.rule_name, data) {
                    Ok(rule) => map.add_rule(rule),
                    Err(err) => skip_or_fail(&mut diagnostics, &element, err)?,
                },
                Err(err) => skip_or_fail(&mut diagnostics, &element, err)?,
            }
        }

        log::info!(
            "JSON-Karte gelesen: {} Linienzuege, {} Lanelets, {} Regeln",
            map.line_string_count(),
            map.lanelet_count(),
            map.rule_count()
        );

        Ok(map)
    }
}

fn build_lanelet(raw: &JsonLanelet, map: &LaneletMap) -> Result<Lanelet, MapError> {
    let element = format!("Lanelet {}", raw.id);
    let resolve = |way_id: Id| {
        map.line_string(way_id).cloned().ok_or_else(|| {
            MapError::parse(
                element.as_str(),
                format!("Verweist auf unbekannten Linienzug {way_id}"),
            )
        })
    };

    Ok(Lanelet {
        id: raw.id,
        left: resolve(raw.left)?,
        right: resolve(raw.right)?,
        attributes: raw.attributes.clone(),
        regulatory_refs: raw.regulatory_refs.clone(),
    })
}

fn build_rule_data(raw: &JsonRule, map: &LaneletMap) -> Result<RuleData, MapError> {
    let element = format!("Regel {}", raw.id);
    let mut data = RuleData::new(raw.id, raw.attributes.clone());
    for role in &raw.roles {
        for member in &role.members {
            let reference = match member.kind {
                JsonMemberKind::LineString => map
                    .line_string(member.id)
                    .map(|ls| RuleRef::LineString(Arc::clone(ls))),
                JsonMemberKind::Lanelet => {
                    map.lanelet(member.id).map(|ll| RuleRef::Lanelet(Arc::clone(ll)))
                }
            }
            .ok_or_else(|| {
                MapError::parse(
                    element.as_str(),
                    format!("Rolle '{}' verweist auf unbekanntes Element {}", role.name, member.id),
                )
            })?;
            data.add_ref(&role.name, reference);
        }
    }
    Ok(data)
}

impl MapWriter for JsonWriter {
    fn write_map(
        &self,
        map: &LaneletMap,
        projector: &dyn Projector,
        config: &IoConfiguration,
        mut diagnostics: Option<&mut Vec<Diagnostic>>,
    ) -> Result<String, MapError> {
        let mut document = JsonMap::default();

        let mut line_string_ids: Vec<Id> = map.line_strings_iter().map(|ls| ls.id).collect();
        line_string_ids.sort_unstable();
        for id in line_string_ids {
            if let Some(line_string) = map.line_string(id) {
                document.line_strings.push(JsonLineString {
                    id,
                    points: line_string
                        .points
                        .iter()
                        .map(|p| {
                            let geo = projector.reverse(p.position);
                            JsonPoint {
                                id: p.id,
                                lat: geo.lat,
                                lon: geo.lon,
                                ele: geo.ele,
                            }
                        })
                        .collect(),
                    attributes: line_string.attributes.clone(),
                });
            }
        }

        let mut lanelet_ids: Vec<Id> = map.lanelets_iter().map(|ll| ll.id).collect();
        lanelet_ids.sort_unstable();
        for id in lanelet_ids {
            let Some(lanelet) = map.lanelet(id) else { continue };
            let element = format!("Lanelet {id}");
            let missing = [lanelet.left.id, lanelet.right.id]
                .into_iter()
                .find(|way_id| map.line_string(*way_id).is_none());
            if let Some(way_id) = missing {
                skip_or_fail(
                    &mut diagnostics,
                    &element,
                    MapError::write(
                        element.as_str(),
                        format!("Begrenzung {way_id} ist nicht Teil der Karte"),
                    ),
                )?;
                continue;
            }
            document.lanelets.push(JsonLanelet {
                id,
                left: lanelet.left.id,
                right: lanelet.right.id,
                regulatory_refs: lanelet.regulatory_refs.clone(),
                attributes: lanelet.attributes.clone(),
            });
        }

        let mut rule_ids: Vec<Id> = map.rules_iter().map(|r| r.id()).collect();
        rule_ids.sort_unstable();
        for id in rule_ids {
            let Some(rule) = map.rule(id) else { continue };
            let element = format!("Regel {id}");
            match build_json_rule(map, rule.rule_name(), rule.data()) {
                Ok(json_rule) => document.rules.push(json_rule),
                Err(err) => skip_or_fail(&mut diagnostics, &element, err)?,
            }
        }

        let serialized = if config.get_bool_or("pretty", true) {
            serde_json::to_string_pretty(&document)
        } else {
            serde_json::to_string(&document)
        };
        let output =
            serialized.map_err(|err| MapError::write("JSON-Dokument", err.to_string()))?;

        log::info!(
            "JSON-Karte geschrieben: {} Linienzuege, {} Lanelets, {} Regeln",
            document.line_strings.len(),
            document.lanelets.len(),
            document.rules.len()
        );

        Ok(output)
    }
}

fn build_json_rule(
    map: &LaneletMap,
    rule_name: &str,
    data: &RuleData,
) -> Result<JsonRule, MapError> {
    let mut roles = Vec::new();
    for (role_name, references) in &data.roles {
        let mut members = Vec::new();
        for reference in references {
            let (kind, present) = match reference {
                RuleRef::LineString(ls) => {
                    (JsonMemberKind::LineString, map.line_string(ls.id).is_some())
                }
                RuleRef::Lanelet(ll) => (JsonMemberKind::Lanelet, map.lanelet(ll.id).is_some()),
            };
            if !present {
                return Err(MapError::write(
                    format!("Regel {}", data.id),
                    format!(
                        "Rolle '{role_name}' verweist auf Element {} ausserhalb der Karte",
                        reference.element_id()
                    ),
                ));
            }
            members.push(JsonRoleMember {
                kind,
                id: reference.element_id(),
            });
        }
        roles.push(JsonRole {
            name: role_name.clone(),
            members,
        });
    }

    Ok(JsonRule {
        rule_name: rule_name.to_string(),
        id: data.id,
        attributes: data.attributes.clone(),
        roles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::TrafficLight;
    use crate::io::projection::{Origin, SphericalMercatorProjector};

    fn projector() -> SphericalMercatorProjector {
        SphericalMercatorProjector::new(Origin::new(49.0, 8.4))
    }

    const MINIMAL: &str = r#"
    {
      "line_strings": [
        {"id": 111, "points": [{"id": 1, "lat": 49.0001, "lon": 8.4001}, {"id": 2, "lat": 49.0002, "lon": 8.4002}]},
        {"id": 110, "points": [{"id": 3, "lat": 49.0001, "lon": 8.4003}, {"id": 4, "lat": 49.0002, "lon": 8.4004}]}
      ],
      "rules": [
        {
          "rule_name": "traffic_light",
          "id": 301,
          "roles": [
            {"name": "refers", "members": [{"kind": "line_string", "id": 111}]},
            {"name": "ref_line", "members": [{"kind": "line_string", "id": 110}]}
          ]
        }
      ]
    }
    "#;

    #[test]
    fn test_parse_minimal_document() {
        let map = JsonParser::new()
            .parse_map(MINIMAL, &projector(), &IoConfiguration::new(), None)
            .expect("Parsen fehlgeschlagen");

        assert_eq!(map.line_string_count(), 2);
        let rule = map.rule(301).expect("Regel 301 erwartet");
        assert!(rule.as_any().downcast_ref::<TrafficLight>().is_some());
    }

    #[test]
    fn test_json_roundtrip_preserves_rule_roles() {
        let parser = JsonParser::new();
        let writer = JsonWriter::new();
        let config = IoConfiguration::new();

        let map = parser
            .parse_map(MINIMAL, &projector(), &config, None)
            .expect("Parsen fehlgeschlagen");
        let written = writer
            .write_map(&map, &projector(), &config, None)
            .expect("Schreiben fehlgeschlagen");
        let reparsed = parser
            .parse_map(&written, &projector(), &config, None)
            .expect("Re-Parsen fehlgeschlagen");

        assert_eq!(reparsed.line_string_count(), map.line_string_count());
        assert_eq!(reparsed.rule_count(), map.rule_count());

        let original = map.rule(301).expect("Regel 301");
        let rebuilt = reparsed.rule(301).expect("Regel 301");
        assert_eq!(original.data().roles, rebuilt.data().roles);
        assert_eq!(original.attributes(), rebuilt.attributes());
    }

    #[test]
    fn test_robust_parse_skips_rule_with_unknown_member() {
        let input = r#"
        {
          "line_strings": [
            {"id": 111, "points": [{"id": 1, "lat": 49.0001, "lon": 8.4001}]}
          ],
          "rules": [
            {
              "rule_name": "traffic_light",
              "id": 301,
              "roles": [{"name": "refers", "members": [{"kind": "line_string", "id": 999}]}]
            }
          ]
        }
        "#;

        let mut diagnostics = Vec::new();
        let map = JsonParser::new()
            .parse_map(
                input,
                &projector(),
                &IoConfiguration::new(),
                Some(&mut diagnostics),
            )
            .expect("Robustes Parsen soll nicht abbrechen");

        assert_eq!(map.rule_count(), 0);
        assert_eq!(map.line_string_count(), 1);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("999"));
    }
}
