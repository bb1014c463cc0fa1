//! isobar - quick, labelled maps and charts of gridded weather data
//!
//! Command-line entry point: load one field, or a pair of wind components,
//! draw it and write a PNG.

use anyhow::Context;
use serde_json::json;
use std::time::Instant;
use tracing::{error, info};

use isobar::logging::{init_tracing, log_error, log_operation_end, log_operation_start};
use isobar::render::text;
use isobar::components::Source;
use isobar::sources::{load_field, load_vector_field};
use isobar::{ancillary, quickmap, quickmap_vectors, quickplot, schema, Config, PlotMethod};

fn main() -> anyhow::Result<()> {
    let (config, args) = Config::load().context("failed to read configuration")?;
    init_tracing(&config.log_level);

    info!("Starting isobar v{}", env!("CARGO_PKG_VERSION"));

    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    ancillary::set_ancillary_dir(config.paths.ancillary_dir.clone());
    text::set_font_path(config.render.font_path.clone());
    schema::use_schema(&config.style.schema)
        .with_context(|| format!("failed to load schema '{}'", config.style.schema))?;

    let method: PlotMethod = config.style.method.parse()?;
    let options = json!({ "interpolation": config.data.interpolation_method });

    let start = Instant::now();
    log_operation_start("load", Some(&args.input.display().to_string()));
    let loaded = if method.kind().is_vector() {
        load_vector_field(&args.input, Some(config.data.time_index)).map(Source::from)
    } else {
        load_field(
            &args.input,
            config.data.variable.as_deref(),
            Some(config.data.time_index),
        )
        .map(Source::from)
    };
    let source = loaded.map_err(|e| {
        log_error(&e, "load");
        e
    })
    .with_context(|| format!("failed to load {}", args.input.display()))?;
    log_operation_end("load", start, true);

    let start = Instant::now();
    log_operation_start("plot", Some(method.name()));
    let domain = config.style.domain.as_deref();
    let figure = match &source {
        _ if args.no_map => quickplot(source.clone(), method, &options)?,
        Source::Vectors(vectors) => quickmap_vectors(vectors, method, domain, &options)?,
        Source::Field(field) => quickmap(field, method, domain, &options)?,
        other => quickplot(other.clone(), method, &options)?,
    };
    let figure = figure
        .with_size(config.render.width, config.render.height)
        .with_dpi(config.render.dpi);
    figure
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    log_operation_end("plot", start, true);

    info!(output = %args.output.display(), "Done");
    Ok(())
}
