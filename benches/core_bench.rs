use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lanemap::io::{IoConfiguration, MapParser, MapWriter};
use lanemap::{ManeuverType, Origin, RightOfWay, SphericalMercatorProjector};
use std::hint::black_box;

fn projector() -> SphericalMercatorProjector {
    SphericalMercatorProjector::new(Origin::new(49.0, 8.4))
}

fn bench_osm_parsing(c: &mut Criterion) {
    let osm_content = include_str!("../tests/fixtures/demo_map.osm");
    let projector = projector();
    let config = IoConfiguration::new();
    let parser = lanemap::io::osm::OsmParser::new();

    c.bench_function("osm_parse_demo_map", |b| {
        b.iter(|| {
            let map = parser
                .parse_map(black_box(osm_content), &projector, &config, None)
                .expect("OSM parse failed");
            black_box(map.rule_count())
        })
    });
}

fn bench_osm_writing(c: &mut Criterion) {
    let osm_content = include_str!("../tests/fixtures/demo_map.osm");
    let projector = projector();
    let config = IoConfiguration::new();
    let map = lanemap::io::osm::OsmParser::new()
        .parse_map(osm_content, &projector, &config, None)
        .expect("OSM parse failed");
    let writer = lanemap::io::osm::OsmWriter::new();

    c.bench_function("osm_write_demo_map", |b| {
        b.iter(|| {
            let output = writer
                .write_map(black_box(&map), &projector, &config, None)
                .expect("OSM write failed");
            black_box(output.len())
        })
    });
}

fn bench_maneuver_queries(c: &mut Criterion) {
    let osm_content = include_str!("../tests/fixtures/demo_map.osm");
    let projector = projector();
    let config = IoConfiguration::new();
    let map = lanemap::io::osm::OsmParser::new()
        .parse_map(osm_content, &projector, &config, None)
        .expect("OSM parse failed");

    let rule = map
        .rule(302)
        .and_then(|r| r.as_any().downcast_ref::<RightOfWay>())
        .expect("Vorfahrts-Regel erwartet");
    let lanelets: Vec<_> = map.lanelets_iter().cloned().collect();

    let mut group = c.benchmark_group("maneuver_queries");
    group.bench_with_input(BenchmarkId::new("classify_all", lanelets.len()), rule, |b, rule| {
        b.iter(|| {
            let mut priority_count = 0usize;
            for lanelet in &lanelets {
                if rule.maneuver(black_box(lanelet)) == ManeuverType::RightOfWay {
                    priority_count += 1;
                }
            }
            black_box(priority_count)
        })
    });
    group.finish();
}

criterion_group!(
    core_benches,
    bench_osm_parsing,
    bench_osm_writing,
    bench_maneuver_queries
);
criterion_main!(core_benches);
