use std::path::Path;

use chrono::NaiveDate;
use tracing::info;
use tracing_subscriber::EnvFilter;

use floodmap::api::{RenderedMap, build_flood_map, catalog_session, demo_session, render_flood_map};
use floodmap::backend::synthetic::demo_backend_for;
use floodmap::core::params::parse_date;
use floodmap::io::writers::graph::write_graph_json;
use floodmap::{AssetCatalog, ExportOptions, FloodParams, export_flood_map, save_catalog};

use super::args::CliArgs;
use super::errors::AppError;

fn init_logging(enabled: bool) {
    if !enabled {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn parse_size(size: &str) -> Result<Option<usize>, AppError> {
    if size == "original" {
        return Ok(None);
    }
    let parsed_size = size.parse::<usize>().map_err(|_| AppError::InvalidSize {
        size: size.to_string(),
    })?;
    if parsed_size == 0 {
        return Err(AppError::ZeroSize { size: parsed_size });
    }
    Ok(Some(parsed_size))
}

fn date_arg(arg: &'static str, value: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    value
        .map(|v| {
            parse_date(arg, v).map_err(|_| AppError::InvalidDate {
                arg,
                value: v.to_string(),
            })
        })
        .transpose()
}

/// Config file first, then individual flags on top.
fn resolve_params(args: &CliArgs) -> Result<FloodParams, AppError> {
    let mut params = match &args.config {
        Some(path) => {
            info!("Loading parameters from {:?}", path);
            FloodParams::from_json_file(path)?
        }
        None => FloodParams::default(),
    };
    if let Some(region) = args.region {
        params.region = region;
    }
    if let Some(d) = date_arg("--good-date", args.good_date.as_deref())? {
        params.baseline.start = d;
    }
    if let Some(d) = date_arg("--flood-date", args.flood_date.as_deref())? {
        params.baseline.end = d;
    }
    if let Some(d) = date_arg("--flood-start", args.flood_start.as_deref())? {
        params.flood.start = d;
    }
    if let Some(d) = date_arg("--flood-end", args.flood_end.as_deref())? {
        params.flood.end = d;
    }
    if let Some(t) = args.threshold {
        params.threshold_db = t;
    }
    if let Some(mode) = args.despeckle {
        params.despeckle = mode;
    }
    Ok(params)
}

fn fmt_value(v: Option<f32>) -> String {
    v.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

fn print_summary(rendered: &RenderedMap, baseline_scenes: usize, flood_scenes: usize) {
    println!(
        "Centre ({:.4}, {:.4}), zoom {}, scenes: baseline {}, flood {}",
        rendered.view.center.0,
        rendered.view.center.1,
        rendered.view.zoom,
        baseline_scenes,
        flood_scenes
    );
    println!(
        "{:<26} {:>7} {:>10} {:>10} {:>10}",
        "Layer", "Visible", "Pixels", "Min", "Max"
    );
    for layer in &rendered.layers {
        println!(
            "{:<26} {:>7} {:>10} {:>10} {:>10}",
            layer.name,
            if layer.shown { "yes" } else { "no" },
            layer.stats.valid_pixels,
            fmt_value(layer.stats.min),
            fmt_value(layer.stats.max),
        );
    }
}

fn write_demo_catalog(dir: &Path, project: &str) -> Result<(), AppError> {
    let backend = demo_backend_for(&AssetCatalog::for_project(project)).allow_project(project);
    save_catalog(dir, &backend)?;
    info!("Synthetic dataset written to {:?}", dir);
    Ok(())
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(args.log);

    if let Some(dir) = &args.save_catalog {
        write_demo_catalog(dir, &args.project)?;
        return Ok(());
    }

    let params = resolve_params(&args)?;
    let size = parse_size(&args.size)?;

    let session = match &args.catalog {
        Some(dir) if !args.demo => catalog_session(dir, &args.project)?,
        _ => demo_session(&args.project)?,
    };

    let map = build_flood_map(&session, &params)?;
    let rendered = render_flood_map(&session, &map)?;
    print_summary(&rendered, map.baseline_scene_count, map.flood_scene_count);

    if let Some(path) = &args.graph {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(AppError::from)?;
        }
        write_graph_json(path, &map)?;
    }

    if let Some(output_dir) = &args.output_dir {
        let options = ExportOptions {
            format: args.format,
            size,
            include_hidden: !args.visible_only,
        };
        let report = export_flood_map(&map, &rendered, output_dir, &options)?;
        info!("Export complete!");
        info!("Written: {}", report.written.len());
        info!("Skipped: {}", report.skipped);
    }

    session.close();
    Ok(())
}
