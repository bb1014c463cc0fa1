//! One-call maps.

use serde_json::Value;
use tracing::{info, warn};

use crate::components::{Figure, Source};
use crate::error::{IsobarError, Result};
use crate::geo::Domain;
use crate::quickplot::PlotMethod;
use crate::schema;
use crate::sources::{GriddedField, VectorField};

/// Map `field` over `domain` and run the schema's `quickmap_workflow`.
///
/// A failing plot method is logged and returned. Finishing steps that fail
/// (say, a missing coastline file) are logged and skipped, so the map is
/// still drawn.
pub fn quickmap(field: &GriddedField, method: PlotMethod, domain: Option<&str>, options: &Value) -> Result<Figure> {
    quickmap_source(Source::Field(field.clone()), method, domain, options)
}

/// Map wind components with [`PlotMethod::Quiver`] or [`PlotMethod::Barbs`].
pub fn quickmap_vectors(
    vectors: &VectorField,
    method: PlotMethod,
    domain: Option<&str>,
    options: &Value,
) -> Result<Figure> {
    if !method.kind().is_vector() {
        return Err(IsobarError::invalid(
            "method",
            format!("{} cannot draw wind components; use quiver or barbs", method),
        ));
    }
    quickmap_source(Source::Vectors(vectors.clone()), method, domain, options)
}

/// A quick map of wind arrows.
pub fn quiver(vectors: &VectorField, domain: Option<&str>, options: &Value) -> Result<Figure> {
    quickmap_vectors(vectors, PlotMethod::Quiver, domain, options)
}

/// A quick map of wind barbs.
pub fn barbs(vectors: &VectorField, domain: Option<&str>, options: &Value) -> Result<Figure> {
    quickmap_vectors(vectors, PlotMethod::Barbs, domain, options)
}

fn quickmap_source(source: Source, method: PlotMethod, domain: Option<&str>, options: &Value) -> Result<Figure> {
    let domain = domain.map(|name| Domain::from_string(name, None)).transpose()?;
    info!(
        source = source.name(),
        method = %method,
        domain = domain.as_ref().map(Domain::title).as_deref().unwrap_or("data extent"),
        "Quick map"
    );

    let mut figure = Figure::default();
    let subplot = figure.add_map(domain)?;
    if let Err(e) = subplot.plot(method, &source, options) {
        warn!(method = %method, error = %e, "Plot method failed");
        return Err(e);
    }
    for step in schema::with_schema(|s| s.workflow("quickmap_workflow")) {
        subplot.try_finishing(&step);
    }
    Ok(figure)
}
