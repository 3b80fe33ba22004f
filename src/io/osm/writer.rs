//! Writer fuer OSM-XML-Karten.

use crate::core::{GeoPoint, Id, LaneletMap, RuleRef};
use crate::error::MapError;
use crate::io::configuration::IoConfiguration;
use crate::io::handlers::MapWriter;
use crate::io::projection::Projector;
use crate::io::{skip_or_fail, Diagnostic};
use std::collections::BTreeMap;

/// Nachkommastellen fuer lat/lon, wenn `decimal_precision` fehlt.
const DEFAULT_PRECISION: usize = 11;

/// Writer-Seite des OSM-Handlers. Zustandslos; Projektion und Konfiguration
/// kommen pro Aufruf.
#[derive(Debug, Default)]
pub struct OsmWriter;

impl OsmWriter {
    /// Erstellt den Writer.
    pub fn new() -> Self {
        Self
    }
}

impl MapWriter for OsmWriter {
    fn write_map(
        &self,
        map: &LaneletMap,
        projector: &dyn Projector,
        config: &IoConfiguration,
        mut diagnostics: Option<&mut Vec<Diagnostic>>,
    ) -> Result<String, MapError> {
        let precision = config.get_usize_or("decimal_precision", DEFAULT_PRECISION);
        let write_elevation = config.get_bool_or("write_elevation", true);

        let mut output = String::new();
        output.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        output.push_str("<osm version=\"0.6\" generator=\"lanemap\">\n");

        // Knoten aus allen Linienzuegen einsammeln (erste Definition gewinnt)
        let mut geo_points: BTreeMap<Id, GeoPoint> = BTreeMap::new();
        for line_string in map.line_strings_iter() {
            for point in &line_string.points {
                geo_points
                    .entry(point.id)
                    .or_insert_with(|| projector.reverse(point.position));
            }
        }

        for (id, geo) in &geo_points {
            if write_elevation && geo.ele != 0.0 {
                output.push_str(&format!(
                    "  <node id=\"{id}\" lat=\"{lat:.prec$}\" lon=\"{lon:.prec$}\">\n    <tag k=\"ele\" v=\"{ele:.2}\"/>\n  </node>\n",
                    lat = geo.lat,
                    lon = geo.lon,
                    ele = geo.ele,
                    prec = precision
                ));
            } else {
                output.push_str(&format!(
                    "  <node id=\"{id}\" lat=\"{lat:.prec$}\" lon=\"{lon:.prec$}\"/>\n",
                    lat = geo.lat,
                    lon = geo.lon,
                    prec = precision
                ));
            }
        }

        // Wege in Id-Reihenfolge
        let mut way_ids: Vec<Id> = map.line_strings_iter().map(|ls| ls.id).collect();
        way_ids.sort_unstable();
        for id in way_ids {
            let line_string = map
                .line_string(id)
                .ok_or_else(|| MapError::write(format!("Weg {id}"), "Karte inkonsistent"))?;
            output.push_str(&format!("  <way id=\"{id}\">\n"));
            for point in &line_string.points {
                output.push_str(&format!("    <nd ref=\"{}\"/>\n", point.id));
            }
            write_tags(&mut output, &line_string.attributes);
            output.push_str("  </way>\n");
        }

        // Lanelet-Relationen
        let mut lanelet_ids: Vec<Id> = map.lanelets_iter().map(|ll| ll.id).collect();
        lanelet_ids.sort_unstable();
        for id in lanelet_ids {
            let lanelet = map
                .lanelet(id)
                .ok_or_else(|| MapError::write(format!("Relation {id}"), "Karte inkonsistent"))?;
            let element = format!("Relation {id}");

            match check_lanelet_members(map, lanelet.left.id, lanelet.right.id) {
                Ok(()) => {
                    output.push_str(&format!("  <relation id=\"{id}\">\n"));
                    output.push_str(&format!(
                        "    <member type=\"way\" role=\"left\" ref=\"{}\"/>\n",
                        lanelet.left.id
                    ));
                    output.push_str(&format!(
                        "    <member type=\"way\" role=\"right\" ref=\"{}\"/>\n",
                        lanelet.right.id
                    ));
                    for rule_id in &lanelet.regulatory_refs {
                        if map.rule(*rule_id).is_none() {
                            log::debug!(
                                "Lanelet {id}: Regel-Referenz {rule_id} zeigt ins Leere und wird nicht geschrieben"
                            );
                            continue;
                        }
                        output.push_str(&format!(
                            "    <member type=\"relation\" role=\"regulatory_element\" ref=\"{rule_id}\"/>\n"
                        ));
                    }
                    output.push_str("    <tag k=\"type\" v=\"lanelet\"/>\n");
                    write_tags(&mut output, &lanelet.attributes);
                    output.push_str("  </relation>\n");
                }
                Err(err) => skip_or_fail(&mut diagnostics, &element, err)?,
            }
        }

        // Regel-Relationen: Varianten zerlegen sich selbst in generische
        // Rollen-Daten, der Writer kennt keine konkreten Typen
        let mut rule_ids: Vec<Id> = map.rules_iter().map(|r| r.id()).collect();
        rule_ids.sort_unstable();
        for id in rule_ids {
            let rule = map
                .rule(id)
                .ok_or_else(|| MapError::write(format!("Relation {id}"), "Karte inkonsistent"))?;
            let element = format!("Relation {id}");

            match check_rule_members(map, rule.data()) {
                Ok(()) => {
                    output.push_str(&format!("  <relation id=\"{id}\">\n"));
                    for (role_name, references) in &rule.data().roles {
                        for reference in references {
                            let member_type = match reference {
                                RuleRef::LineString(_) => "way",
                                RuleRef::Lanelet(_) => "relation",
                            };
                            output.push_str(&format!(
                                "    <member type=\"{member_type}\" role=\"{}\" ref=\"{}\"/>\n",
                                escape_xml(role_name),
                                reference.element_id()
                            ));
                        }
                    }
                    output.push_str("    <tag k=\"type\" v=\"regulatory_element\"/>\n");
                    output.push_str(&format!(
                        "    <tag k=\"subtype\" v=\"{}\"/>\n",
                        escape_xml(rule.rule_name())
                    ));
                    write_tags(&mut output, rule.attributes());
                    output.push_str("  </relation>\n");
                }
                Err(err) => skip_or_fail(&mut diagnostics, &element, err)?,
            }
        }

        output.push_str("</osm>\n");

        log::info!(
            "OSM-Karte geschrieben: {} Linienzuege, {} Lanelets, {} Regeln",
            map.line_string_count(),
            map.lanelet_count(),
            map.rule_count()
        );

        Ok(output)
    }
}

fn check_lanelet_members(map: &LaneletMap, left: Id, right: Id) -> Result<(), MapError> {
    for way_id in [left, right] {
        if map.line_string(way_id).is_none() {
            return Err(MapError::write(
                format!("Weg {way_id}"),
                "Begrenzung ist nicht Teil der Karte",
            ));
        }
    }
    Ok(())
}

fn check_rule_members(map: &LaneletMap, data: &crate::core::RuleData) -> Result<(), MapError> {
    for (role_name, references) in &data.roles {
        for reference in references {
            let present = match reference {
                RuleRef::LineString(ls) => map.line_string(ls.id).is_some(),
                RuleRef::Lanelet(ll) => map.lanelet(ll.id).is_some(),
            };
            if !present {
                return Err(MapError::write(
                    format!("Rolle '{role_name}' → Element {}", reference.element_id()),
                    "Referenziertes Element ist nicht Teil der Karte",
                ));
            }
        }
    }
    Ok(())
}

fn write_tags(output: &mut String, attributes: &crate::core::AttributeMap) {
    for (key, value) in attributes {
        output.push_str(&format!(
            "    <tag k=\"{}\" v=\"{}\"/>\n",
            escape_xml(key),
            escape_xml(value)
        ));
    }
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::{RegulatoryRule, SignGroup, TrafficSign};
    use crate::core::{AttributeMap, LineString3d, Point3d};
    use crate::io::projection::{Origin, SphericalMercatorProjector};
    use glam::DVec3;
    use std::sync::Arc;

    fn line(id: Id) -> Arc<LineString3d> {
        Arc::new(LineString3d::new(
            id,
            vec![
                Point3d::new(id * 10, DVec3::new(0.0, 0.0, 0.0)),
                Point3d::new(id * 10 + 1, DVec3::new(1.0, 1.0, 0.0)),
            ],
        ))
    }

    fn sign_rule(id: Id, sign: Arc<LineString3d>) -> Box<dyn RegulatoryRule> {
        Box::new(
            TrafficSign::new(
                id,
                AttributeMap::new(),
                SignGroup::with_type(vec![sign], "de205"),
                SignGroup::default(),
                Vec::new(),
                Vec::new(),
            )
            .expect("gueltig"),
        )
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }

    #[test]
    fn test_robust_write_skips_rule_with_foreign_member() {
        // Das Schild der Regel ist nicht Teil der Karte
        let mut map = LaneletMap::new();
        map.add_line_string(line(101));
        map.add_rule(sign_rule(301, line(999)));

        let projector = SphericalMercatorProjector::new(Origin::new(49.0, 8.4));
        let mut diagnostics = Vec::new();
        let output = OsmWriter::new()
            .write_map(
                &map,
                &projector,
                &IoConfiguration::new(),
                Some(&mut diagnostics),
            )
            .expect("Robustes Schreiben soll nicht abbrechen");

        assert_eq!(diagnostics.len(), 1);
        assert!(output.contains("<way id=\"101\">"));
        assert!(!output.contains("regulatory_element"));

        // Strikter Modus bricht ab
        let err = OsmWriter::new()
            .write_map(&map, &projector, &IoConfiguration::new(), None)
            .expect_err("Strikter Modus muss abbrechen");
        assert!(matches!(err, MapError::Write { .. }));
    }

    #[test]
    fn test_precision_option_controls_coordinates() {
        let mut map = LaneletMap::new();
        map.add_line_string(line(101));

        let projector = SphericalMercatorProjector::new(Origin::new(49.0, 8.4));
        let config = IoConfiguration::new().with("decimal_precision", "3");
        let output = OsmWriter::new()
            .write_map(&map, &projector, &config, None)
            .expect("Schreiben fehlgeschlagen");

        assert!(
            output.contains("lat=\"49.000\""),
            "Drei Nachkommastellen erwartet:\n{output}"
        );
    }
}
