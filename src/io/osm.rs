//! OSM-Format-Handler (Endung `.osm`, Name `osm_handler`).
//!
//! Liest und schreibt Karten im OSM-0.6-XML-Format: `<node>` wird zu
//! Punkten (projiziert), `<way>` zu Linienzuegen, `<relation type=lanelet>`
//! zu Lanelets und `<relation type=regulatory_element>` zu Regeln, die
//! ueber die Rule-Registry rekonstruiert werden.

pub mod parser;
pub mod writer;

pub use parser::OsmParser;
pub use writer::OsmWriter;
