//! Integration tests for isobar
//!
//! These tests drive the public API end-to-end: loading grids from disk,
//! building maps and charts, and writing images.

mod common;

use common::{assertions, image_utils, test_data};
use image::{ImageFormat, Rgba};
use isobar::components::LayerKind;
use isobar::geo::Domain;
use isobar::quickmap::{barbs, quiver};
use isobar::sources::{load_field, load_vector_field, parse_json_grid, AttributeValue};
use isobar::{quickmap, quickplot, quickplot_series, stripes, Animation, Chart, Figure, IsobarError, PlotMethod};
use serde_json::json;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[test]
fn test_quickmap_saves_png() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("europe.png");

    let field = test_data::global_temperature(5.0);
    let figure = quickmap(&field, PlotMethod::Contourf, Some("Europe"), &json!({}))
        .unwrap()
        .with_size(400, 300);
    figure.save(&path).unwrap();

    let image = image_utils::load_image(&path).unwrap();
    image_utils::assert_image_dimensions(&image, 400, 300).unwrap();
    assert!(image_utils::count_non_background(&image, WHITE) > 400 * 300 / 10);
    assert!(image_utils::count_colors(&image) > 5);
}

#[test]
fn test_quickmap_title_uses_time_and_units() {
    let field = test_data::moving_low(2, 10.0).select_step(1).unwrap();
    let figure = quickmap(&field, PlotMethod::Pcolormesh, None, &json!({"units": "hPa"})).unwrap();

    let subplot = &figure.subplots()[0];
    assert!(subplot.is_map());
    assert!(subplot.has_legend());
    let title = subplot.title_text().unwrap();
    assert!(title.contains("06:00 on 2024-07-01"), "unexpected title {:?}", title);

    let grid = subplot.layers()[0].grid().unwrap();
    let min = grid.iter().cloned().fold(f32::INFINITY, f32::min) as f64;
    assertions::assert_in_range(min, 980.0, 1000.0);
}

#[test]
fn test_quiver_arrows_show_on_map() {
    let dir = tempfile::tempdir().unwrap();
    let painted = |u: f32, v: f32, name: &str| {
        let path = dir.path().join(name);
        quiver(&test_data::uniform_wind(5.0, u, v), Some("Europe"), &json!({}))
            .unwrap()
            .with_size(400, 300)
            .save(&path)
            .unwrap();
        let image = image_utils::load_image(&path).unwrap();
        image_utils::count_non_background(&image, WHITE)
    };

    // Calm air draws no arrows but keeps the title, frame and gridlines.
    let calm = painted(0.0, 0.0, "calm.png");
    let windy = painted(10.0, 5.0, "windy.png");
    assert!(windy > calm + 200, "arrows added only {} pixels", windy - calm);
}

#[test]
fn test_barbs_from_json_components() {
    let dir = tempfile::tempdir().unwrap();
    let grids = dir.path().join("wind.json");
    let wind = test_data::uniform_wind(10.0, -15.0, 20.0);
    test_data::write_json_grids(&grids, &[wind.v(), wind.u()]).unwrap();

    let loaded = load_vector_field(&grids, None).unwrap();
    assert_eq!(loaded.name(), "u10/v10");

    let figure = barbs(&loaded, None, &json!({"units": "kt"})).unwrap().with_size(360, 240);
    let subplot = &figure.subplots()[0];
    assert_eq!(subplot.layers()[0].kind(), LayerKind::Barbs);
    assert_eq!(subplot.title_text(), Some("10 metre wind component"));

    let bytes = figure.to_png_bytes().unwrap();
    image_utils::assert_image_format(&bytes, ImageFormat::Png).unwrap();
    let image = image_utils::load_image_from_bytes(&bytes).unwrap();
    assert!(image_utils::count_non_background(&image, WHITE) > 0);
}

#[test]
fn test_quickplot_rejects_gridded_line() {
    let field = test_data::global_temperature(30.0);
    let err = quickplot(field, PlotMethod::Line, &json!({})).unwrap_err();
    assert!(matches!(err, IsobarError::InvalidParameter { .. }));
}

#[test]
fn test_quickplot_series_png() {
    let figure = quickplot_series(&test_data::daily_cycle(90), &json!({}))
        .unwrap()
        .with_size(500, 250);
    let bytes = figure.to_png_bytes().unwrap();
    image_utils::assert_image_format(&bytes, ImageFormat::Png).unwrap();

    let image = image_utils::load_image_from_bytes(&bytes).unwrap();
    image_utils::assert_image_dimensions(&image, 500, 250).unwrap();

    let subplot = &figure.subplots()[0];
    assert_eq!(subplot.layers().len(), 1);
    assert_eq!(subplot.layers()[0].kind(), LayerKind::Line);
}

#[test]
fn test_stripes_levels_are_symmetric() {
    let series = test_data::warming_anomalies(1950, 75);
    let figure = stripes(&series, &json!({})).unwrap();

    let layer = &figure.subplots()[0].layers()[0];
    assert_eq!(layer.kind(), LayerKind::Stripes);
    let levels = layer.levels();
    assertions::assert_increasing(levels);
    assertions::assert_approx_eq(levels[0], -levels[levels.len() - 1], Some(1e-9));

    let image = figure.with_size(300, 100).render().unwrap();
    assert_eq!(image.dimensions(), (300, 100));
}

#[test]
fn test_load_json_grid_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("msl.json");
    let original = test_data::moving_low(3, 30.0);
    test_data::write_json_grid(&path, &original).unwrap();

    let loaded = load_field(&path, None, None).unwrap();
    assert_eq!(loaded.name(), "msl");
    assert_eq!(loaded.units(), Some("Pa"));
    assert_eq!(loaded.n_steps(), 3);
    assert_eq!(loaded.grid_shape(), original.grid_shape());
    assert_eq!(loaded.times(), original.times());

    let second = load_field(&path, None, Some(1)).unwrap();
    assert_eq!(second.n_steps(), 1);
    assert_eq!(second.times(), &original.times()[1..2]);
    assert!(load_field(&path, None, Some(3)).is_err());
}

#[test]
fn test_parse_json_grid_missing_values() {
    let field = parse_json_grid(&test_data::small_grid_json()).unwrap();
    assert_eq!(field.grid_shape(), (2, 3));
    assert!(field.values()[[0, 2]].is_nan());
    assert_eq!(
        field.attribute("institution"),
        Some(&AttributeValue::Text("isobar tests".into()))
    );

    let (min, max) = field.value_range().unwrap();
    assertions::assert_approx_eq(min as f64, 0.0, None);
    assertions::assert_approx_eq(max as f64, 0.008, Some(1e-7));
}

#[test]
fn test_load_field_errors() {
    let dir = tempfile::tempdir().unwrap();

    let missing = load_field(&dir.path().join("absent.json"), None, None).unwrap_err();
    assert!(matches!(missing, IsobarError::Io(_)));

    let csv = dir.path().join("table.csv");
    std::fs::write(&csv, "a,b\n1,2\n").unwrap();
    assert!(matches!(
        load_field(&csv, None, None),
        Err(IsobarError::InvalidParameter { .. })
    ));

    let ragged = dir.path().join("ragged.json");
    std::fs::write(
        &ragged,
        json!({"name": "x", "latitudes": [0.0, 1.0], "longitudes": [0.0], "values": [[1.0]]}).to_string(),
    )
    .unwrap();
    assert!(matches!(load_field(&ragged, None, None), Err(IsobarError::Data { .. })));
}

#[test]
fn test_named_domains() {
    let france = Domain::from_string("France", None).unwrap();
    assert_eq!(france.name().as_deref(), Some("France"));
    assert!(france.is_complete());

    let bbox = france.bbox().unwrap().to_latlon_bbox().unwrap();
    assert!(bbox.contains_point((2.35, 48.85)), "Paris outside {:?}", bbox);
    assert!(!bbox.contains_point((-74.0, 40.7)));
}

#[test]
fn test_figure_footer() {
    let field = test_data::global_temperature(10.0);
    let mut figure = Figure::new(Some(1), Some(2)).with_size(600, 300);
    figure.add_map(None).unwrap().pcolormesh(&field, &json!({})).unwrap();
    figure
        .add_map(Some(Domain::from_string("Europe", None).unwrap()))
        .unwrap()
        .contour(&field, &json!({}))
        .unwrap();

    figure.add_attribution("ERA5").add_attribution("ERA5");
    figure.add_logo("ecmwf").unwrap();
    assert_eq!(figure.attributions(), &["ERA5".to_string()]);
    assert!(figure.add_logo("not-a-logo").unwrap_err().is_not_found());
    assert!(matches!(figure.add_subplot(), Err(IsobarError::Layout { .. })));

    let image = figure.render().unwrap();
    assert_eq!(image.dimensions(), (600, 300));
}

#[test]
fn test_animation_gif() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("low.gif");

    let mut animation = Animation::from_field(&test_data::moving_low(3, 15.0), PlotMethod::Contourf, None).unwrap();
    assert_eq!(animation.len(), 3);
    for frame in animation.frames_mut() {
        *frame = std::mem::take(frame).with_size(240, 180);
    }
    animation.save_gif(&path, Some(200)).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    image_utils::assert_image_format(&bytes, ImageFormat::Gif).unwrap();
}

#[test]
fn test_interactive_chart_html() {
    let series = test_data::warming_anomalies(2000, 10);
    let mut chart = Chart::new();
    chart.add_line(series.clone(), &json!({})).unwrap();
    chart.add_stripes(&series, &json!({})).unwrap();
    chart.title("Warming");

    assert_eq!(chart.traces().len(), 2);
    assert_eq!(chart.traces()[1]["type"], "heatmap");
    let html = chart.to_html();
    assert!(html.contains("Plotly.newPlot"));
    assert!(html.contains("Warming"));
}

#[test]
fn test_plot_method_names() {
    for method in PlotMethod::ALL {
        assert_eq!(method.name().parse::<PlotMethod>().unwrap(), method);
    }
    assert_eq!("CONTOURF".parse::<PlotMethod>().unwrap(), PlotMethod::Contourf);
    assert!("isoline".parse::<PlotMethod>().is_err());
}
