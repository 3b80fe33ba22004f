//! Parser fuer OSM-XML-Karten.

use crate::core::rules::{construct_rule, RuleData, RuleRef};
use crate::core::{AttributeMap, Id, Lanelet, LaneletMap, LineString3d, Point3d};
use crate::error::MapError;
use crate::io::configuration::IoConfiguration;
use crate::io::handlers::MapParser;
use crate::io::projection::Projector;
use crate::io::{skip_or_fail, Diagnostic};
use anyhow::Context;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::sync::Arc;

/// Relations-Tag, das ein Lanelet markiert.
const TYPE_LANELET: &str = "lanelet";
/// Relations-Tag, das eine regulatorische Regel markiert.
const TYPE_REGULATORY: &str = "regulatory_element";

/// Parser-Seite des OSM-Handlers. Zustandslos; Projektion und Konfiguration
/// kommen pro Aufruf.
#[derive(Debug, Default)]
pub struct OsmParser;

impl OsmParser {
    /// Erstellt den Parser.
    pub fn new() -> Self {
        Self
    }
}

impl MapParser for OsmParser {
    fn parse_map(
        &self,
        input: &str,
        projector: &dyn Projector,
        _config: &IoConfiguration,
        diagnostics: Option<&mut Vec<Diagnostic>>,
    ) -> Result<LaneletMap, MapError> {
        let raw = read_osm_document(input)?;
        assemble_map(raw, projector, diagnostics)
    }
}

// ── Rohdaten aus dem XML ───────────────────────────────────────────

#[derive(Debug, Default)]
struct RawNode {
    id: Option<String>,
    lat: Option<String>,
    lon: Option<String>,
    tags: AttributeMap,
}

#[derive(Debug, Default)]
struct RawWay {
    id: Option<String>,
    node_refs: Vec<String>,
    tags: AttributeMap,
}

#[derive(Debug)]
struct RawMember {
    member_type: String,
    reference: String,
    member_role: String,
}

#[derive(Debug, Default)]
struct RawRelation {
    id: Option<String>,
    members: Vec<RawMember>,
    tags: AttributeMap,
}

#[derive(Debug, Default)]
struct RawOsmDocument {
    nodes: Vec<RawNode>,
    ways: Vec<RawWay>,
    relations: Vec<RawRelation>,
}

enum RawElement {
    Node(RawNode),
    Way(RawWay),
    Relation(RawRelation),
}

/// Liest das XML in Rohstrukturen ein. Syntaxfehler sind Top-Level-Fehler
/// und brechen auch den robusten Modus ab — ohne wohlgeformtes Dokument
/// gibt es keine Element-Granularitaet.
fn read_osm_document(input: &str) -> Result<RawOsmDocument, MapError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut buffer = Vec::new();
    let mut document = RawOsmDocument::default();
    let mut current: Option<RawElement> = None;

    loop {
        let position = reader.buffer_position();
        let event = match reader.read_event_into(&mut buffer) {
            Ok(event) => event,
            Err(err) => {
                return Err(MapError::parse(
                    format!("XML-Position {position}"),
                    err.to_string(),
                ))
            }
        };

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let tag = reader
                    .decoder()
                    .decode(e.name().as_ref())
                    .map_err(|err| {
                        MapError::parse(format!("XML-Position {position}"), err.to_string())
                    })?
                    .into_owned();

                let attributes = read_attributes(&reader, e).map_err(|err| {
                    MapError::parse(format!("XML-Position {position}"), format!("{err:#}"))
                })?;

                match tag.as_str() {
                    "node" => {
                        let node = RawNode {
                            id: attributes.get("id").cloned(),
                            lat: attributes.get("lat").cloned(),
                            lon: attributes.get("lon").cloned(),
                            tags: AttributeMap::new(),
                        };
                        if is_empty {
                            document.nodes.push(node);
                        } else {
                            current = Some(RawElement::Node(node));
                        }
                    }
                    "way" => {
                        let way = RawWay {
                            id: attributes.get("id").cloned(),
                            ..RawWay::default()
                        };
                        if is_empty {
                            document.ways.push(way);
                        } else {
                            current = Some(RawElement::Way(way));
                        }
                    }
                    "relation" => {
                        let relation = RawRelation {
                            id: attributes.get("id").cloned(),
                            ..RawRelation::default()
                        };
                        if is_empty {
                            document.relations.push(relation);
                        } else {
                            current = Some(RawElement::Relation(relation));
                        }
                    }
                    "tag" => {
                        let key = attributes.get("k").cloned().unwrap_or_default();
                        let value = attributes.get("v").cloned().unwrap_or_default();
                        match current.as_mut() {
                            Some(RawElement::Node(node)) => {
                                node.tags.insert(key, value);
                            }
                            Some(RawElement::Way(way)) => {
                                way.tags.insert(key, value);
                            }
                            Some(RawElement::Relation(relation)) => {
                                relation.tags.insert(key, value);
                            }
                            // Tags ausserhalb von node/way/relation (z.B. im
                            // Dokumentkopf) sind ohne Bedeutung
                            None => {}
                        }
                    }
                    "nd" => {
                        if let Some(RawElement::Way(way)) = current.as_mut() {
                            if let Some(reference) = attributes.get("ref") {
                                way.node_refs.push(reference.clone());
                            }
                        }
                    }
                    "member" => {
                        if let Some(RawElement::Relation(relation)) = current.as_mut() {
                            relation.members.push(RawMember {
                                member_type: attributes.get("type").cloned().unwrap_or_default(),
                                reference: attributes.get("ref").cloned().unwrap_or_default(),
                                member_role: attributes.get("role").cloned().unwrap_or_default(),
                            });
                        }
                    }
                    // "osm", "bounds" etc. sind fuer die Karte ohne Belang
                    _ => {}
                }
            }
            Event::End(ref e) => {
                let tag = reader
                    .decoder()
                    .decode(e.name().as_ref())
                    .map_err(|err| {
                        MapError::parse(format!("XML-Position {position}"), err.to_string())
                    })?
                    .into_owned();
                match (tag.as_str(), current.take()) {
                    ("node", Some(RawElement::Node(node))) => document.nodes.push(node),
                    ("way", Some(RawElement::Way(way))) => document.ways.push(way),
                    ("relation", Some(RawElement::Relation(relation))) => {
                        document.relations.push(relation)
                    }
                    (_, kept) => current = kept,
                }
            }
            Event::Eof => break,
            _ => {}
        }

        buffer.clear();
    }

    Ok(document)
}

fn read_attributes<R>(reader: &Reader<R>, e: &BytesStart) -> anyhow::Result<AttributeMap> {
    let mut attributes = AttributeMap::new();
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        let key = reader.decoder().decode(attr.key.as_ref())?.into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.insert(key, value);
    }
    Ok(attributes)
}

// ── Zusammenbau der Karte ──────────────────────────────────────────

fn parse_element_id(raw: Option<&String>) -> anyhow::Result<Id> {
    raw.context("Attribut 'id' fehlt")?
        .parse::<Id>()
        .context("Attribut 'id' ist keine Zahl")
}

fn parse_coordinate(raw: Option<&String>, name: &str) -> anyhow::Result<f64> {
    raw.with_context(|| format!("Attribut '{name}' fehlt"))?
        .parse::<f64>()
        .with_context(|| format!("Attribut '{name}' ist keine Zahl"))
}

fn label(kind: &str, raw_id: Option<&String>) -> String {
    match raw_id {
        Some(id) => format!("{kind} {id}"),
        None => format!("{kind} ohne id"),
    }
}

fn assemble_map(
    raw: RawOsmDocument,
    projector: &dyn Projector,
    mut diagnostics: Option<&mut Vec<Diagnostic>>,
) -> Result<LaneletMap, MapError> {
    let mut map = LaneletMap::new();

    // Punkte
    let mut points: HashMap<Id, Point3d> = HashMap::new();
    for raw_node in &raw.nodes {
        let element = label("Knoten", raw_node.id.as_ref());
        match build_point(raw_node, projector) {
            Ok(point) => {
                points.insert(point.id, point);
            }
            Err(err) => {
                skip_or_fail(&mut diagnostics, &element, MapError::parse(element.as_str(), format!("{err:#}")))?;
            }
        }
    }

    // Linienzuege
    for raw_way in &raw.ways {
        let element = label("Weg", raw_way.id.as_ref());
        match build_line_string(raw_way, &points) {
            Ok(line_string) => map.add_line_string(Arc::new(line_string)),
            Err(err) => {
                skip_or_fail(&mut diagnostics, &element, MapError::parse(element.as_str(), format!("{err:#}")))?;
            }
        }
    }

    // Lanelet-Relationen vor den Regel-Relationen: Regeln referenzieren
    // Lanelets, nie umgekehrt (Lanelets halten nur Regel-Ids)
    for raw_relation in &raw.relations {
        if raw_relation.tags.get("type").map(String::as_str) != Some(TYPE_LANELET) {
            continue;
        }
        let element = label("Relation", raw_relation.id.as_ref());
        match build_lanelet(raw_relation, &map) {
            Ok(lanelet) => map.add_lanelet(Arc::new(lanelet)),
            Err(err) => {
                skip_or_fail(&mut diagnostics, &element, MapError::parse(element.as_str(), format!("{err:#}")))?;
            }
        }
    }

    for raw_relation in &raw.relations {
        let relation_type = raw_relation.tags.get("type").map(String::as_str);
        let element = label("Relation", raw_relation.id.as_ref());
        match relation_type {
            Some(TYPE_LANELET) => {}
            Some(TYPE_REGULATORY) => match build_rule_data(raw_relation, &map) {
                Ok((rule_name, data)) => match construct_rule(&rule_name, data) {
                    Ok(rule) => map.add_rule(rule),
                    Err(err) => skip_or_fail(&mut diagnostics, &element, err)?,
                },
                Err(err) => {
                    skip_or_fail(&mut diagnostics, &element, MapError::parse(element.as_str(), format!("{err:#}")))?;
                }
            },
            other => {
                let message = match other {
                    Some(unknown) => format!("Unbekannter Relationstyp '{unknown}'"),
                    None => "Relation ohne 'type'-Tag".to_string(),
                };
                skip_or_fail(&mut diagnostics, &element, MapError::parse(element.as_str(), message))?;
            }
        }
    }

    log::info!(
        "OSM-Karte gelesen: {} Linienzuege, {} Lanelets, {} Regeln",
        map.line_string_count(),
        map.lanelet_count(),
        map.rule_count()
    );

    Ok(map)
}

fn build_point(raw: &RawNode, projector: &dyn Projector) -> anyhow::Result<Point3d> {
    let id = parse_element_id(raw.id.as_ref())?;
    let lat = parse_coordinate(raw.lat.as_ref(), "lat")?;
    let lon = parse_coordinate(raw.lon.as_ref(), "lon")?;
    let ele = match raw.tags.get("ele") {
        Some(text) => text.parse::<f64>().context("Tag 'ele' ist keine Zahl")?,
        None => 0.0,
    };

    let local = projector.forward(crate::core::GeoPoint { lat, lon, ele });
    Ok(Point3d::new(id, local))
}

fn build_line_string(raw: &RawWay, points: &HashMap<Id, Point3d>) -> anyhow::Result<LineString3d> {
    let id = parse_element_id(raw.id.as_ref())?;
    if raw.node_refs.is_empty() {
        anyhow::bail!("Weg ohne Knoten");
    }

    let mut resolved = Vec::with_capacity(raw.node_refs.len());
    for reference in &raw.node_refs {
        let point_id = reference
            .parse::<Id>()
            .with_context(|| format!("Knoten-Referenz '{reference}' ist keine Zahl"))?;
        let point = points
            .get(&point_id)
            .with_context(|| format!("Verweist auf unbekannten Knoten {point_id}"))?;
        resolved.push(*point);
    }

    Ok(LineString3d::with_attributes(id, resolved, raw.tags.clone()))
}

fn build_lanelet(raw: &RawRelation, map: &LaneletMap) -> anyhow::Result<Lanelet> {
    let id = parse_element_id(raw.id.as_ref())?;

    let mut left: Option<Arc<LineString3d>> = None;
    let mut right: Option<Arc<LineString3d>> = None;
    let mut regulatory_refs = Vec::new();

    for member in &raw.members {
        match member.member_role.as_str() {
            "left" | "right" => {
                let way_id = member
                    .reference
                    .parse::<Id>()
                    .with_context(|| format!("Mitglieds-Referenz '{}' ist keine Zahl", member.reference))?;
                let way = map
                    .line_string(way_id)
                    .with_context(|| format!("Verweist auf unbekannten Weg {way_id}"))?;
                if member.member_role == "left" {
                    left = Some(Arc::clone(way));
                } else {
                    right = Some(Arc::clone(way));
                }
            }
            "regulatory_element" => {
                let rule_id = member
                    .reference
                    .parse::<Id>()
                    .with_context(|| format!("Regel-Referenz '{}' ist keine Zahl", member.reference))?;
                regulatory_refs.push(rule_id);
            }
            // Andere Rollen (z.B. centerline) werden nicht abgebildet
            _ => {}
        }
    }

    let left = left.context("Mitglied mit Rolle 'left' fehlt")?;
    let right = right.context("Mitglied mit Rolle 'right' fehlt")?;

    let mut attributes = raw.tags.clone();
    attributes.remove("type");

    Ok(Lanelet {
        id,
        left,
        right,
        attributes,
        regulatory_refs,
    })
}

fn build_rule_data(raw: &RawRelation, map: &LaneletMap) -> anyhow::Result<(String, RuleData)> {
    let id = parse_element_id(raw.id.as_ref())?;
    let rule_name = raw
        .tags
        .get("subtype")
        .context("Regel-Relation ohne 'subtype'-Tag")?
        .clone();

    let mut attributes = raw.tags.clone();
    attributes.remove("type");
    attributes.remove("subtype");

    let mut data = RuleData::new(id, attributes);
    for member in &raw.members {
        let reference = member
            .reference
            .parse::<Id>()
            .with_context(|| format!("Mitglieds-Referenz '{}' ist keine Zahl", member.reference))?;
        let rule_ref = match member.member_type.as_str() {
            "way" => {
                let way = map
                    .line_string(reference)
                    .with_context(|| format!("Verweist auf unbekannten Weg {reference}"))?;
                RuleRef::LineString(Arc::clone(way))
            }
            "relation" => {
                let lanelet = map.lanelet(reference).with_context(|| {
                    format!("Mitglied {reference} ist kein Lanelet dieser Karte")
                })?;
                RuleRef::Lanelet(Arc::clone(lanelet))
            }
            other => anyhow::bail!("Mitgliedstyp '{other}' wird in Regeln nicht unterstuetzt"),
        };
        data.add_ref(&member.member_role, rule_ref);
    }

    Ok((rule_name, data))
}
