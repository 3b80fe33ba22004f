//! lanemap-convert: Karten laden, pruefen und in ein anderes Format schreiben.
//!
//! Aufruf: `lanemap-convert <eingabe> [ausgabe] [--robust] [--origin LAT,LON]
//! [--config optionen.toml]`
//! Das Zielformat bestimmt die Endung der Ausgabedatei (z.B. `.osm` → `.json`).

use lanemap::{
    load_robust_with_config, load_with_config, write_robust_with_config, write_with_config,
    IoConfiguration, Origin, SphericalMercatorProjector,
};

struct CliArgs {
    input: String,
    output: Option<String>,
    robust: bool,
    origin: Option<Origin>,
    config: IoConfiguration,
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut input = None;
    let mut output = None;
    let mut robust = false;
    let mut origin = None;
    let mut config = IoConfiguration::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--robust" => robust = true,
            "--origin" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--origin erwartet LAT,LON"))?;
                let (lat, lon) = value
                    .split_once(',')
                    .ok_or_else(|| anyhow::anyhow!("--origin erwartet LAT,LON"))?;
                origin = Some(Origin::new(lat.trim().parse()?, lon.trim().parse()?));
            }
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config erwartet eine TOML-Datei"))?;
                let content = std::fs::read_to_string(&path)?;
                config = IoConfiguration::from_toml_str(&content)?;
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other if input.is_none() => input = Some(other.to_string()),
            other if output.is_none() => output = Some(other.to_string()),
            other => anyhow::bail!("Unerwartetes Argument: {other}"),
        }
    }

    let input = input.ok_or_else(|| {
        print_usage();
        anyhow::anyhow!("Keine Eingabedatei angegeben")
    })?;

    Ok(CliArgs {
        input,
        output,
        robust,
        origin,
        config,
    })
}

fn print_usage() {
    eprintln!(
        "lanemap-convert <eingabe> [ausgabe] [--robust] [--origin LAT,LON] [--config optionen.toml]"
    );
}

fn main() -> anyhow::Result<()> {
    // Logger initialisieren
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = parse_args()?;

    let origin = match args.origin {
        Some(origin) => origin,
        None => {
            log::warn!("Kein Origin angegeben — Projektion um (0, 0) ist nur fuer lokale Koordinaten sinnvoll");
            Origin::default()
        }
    };
    let projector = SphericalMercatorProjector::new(origin);

    let map = if args.robust {
        let (map, diagnostics) = load_robust_with_config(&args.input, &projector, &args.config)?;
        for diagnostic in &diagnostics {
            log::warn!("{diagnostic}");
        }
        log::info!("{} Elemente uebersprungen", diagnostics.len());
        map
    } else {
        load_with_config(&args.input, &projector, &args.config)?
    };

    log::info!(
        "Karte geladen: {} Linienzuege, {} Lanelets, {} Regeln",
        map.line_string_count(),
        map.lanelet_count(),
        map.rule_count()
    );
    for rule in map.rules_iter() {
        log::info!("  Regel {} ({})", rule.id(), rule.rule_name());
    }

    if let Some(output) = &args.output {
        if args.robust {
            let diagnostics = write_robust_with_config(output, &map, &projector, &args.config)?;
            for diagnostic in &diagnostics {
                log::warn!("{diagnostic}");
            }
        } else {
            write_with_config(output, &map, &projector, &args.config)?;
        }
        log::info!("Karte geschrieben nach {output}");
    }

    Ok(())
}
