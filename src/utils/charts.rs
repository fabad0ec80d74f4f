//! SVG Chart Generator
//!
//! Renders the two training artifacts as standalone SVG files:
//! - a line chart of mean training loss per epoch
//! - an annotated confusion-matrix heatmap

use std::fs;
use std::path::Path;

use crate::utils::metrics::ConfusionMatrix;

/// Chart styling constants
const CHART_WIDTH: f64 = 800.0;
const CHART_HEIGHT: f64 = 500.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_RIGHT: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 80.0;
const MARGIN_LEFT: f64 = 80.0;

pub const COLOR_PRIMARY: &str = "#3498db";
const COLOR_GRID: &str = "#ecf0f1";
const COLOR_AXIS: &str = "#2c3e50";
const COLOR_TEXT: &str = "#2c3e50";

/// Light and dark ends of the heatmap scale (a "Blues" ramp)
const HEAT_LOW: (u8, u8, u8) = (247, 251, 255);
const HEAT_HIGH: (u8, u8, u8) = (8, 48, 107);

/// A data point for a line chart
#[derive(Debug, Clone)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
    pub label: Option<String>,
}

/// A data series for charts
#[derive(Debug, Clone)]
pub struct DataSeries {
    pub name: String,
    pub points: Vec<DataPoint>,
    pub color: String,
}

impl DataSeries {
    /// Build a series from per-epoch values, numbering epochs from 1
    pub fn from_epoch_values(name: &str, values: &[f64], color: &str) -> Self {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &y)| DataPoint {
                x: (i + 1) as f64,
                y,
                label: Some(format!("{:.3}", y)),
            })
            .collect();

        Self {
            name: name.to_string(),
            points,
            color: color.to_string(),
        }
    }
}

/// Generate a line chart SVG
///
/// The y axis always starts at zero; its top is the largest value in any
/// series (or 1.0 when every value is zero).
pub fn generate_line_chart(
    title: &str,
    x_label: &str,
    y_label: &str,
    series: &[DataSeries],
    output_path: &Path,
) -> std::io::Result<()> {
    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let (x_min, x_max, _, y_max) = find_ranges(series);
    let y_min = 0.0;
    let y_max = if y_max.is_finite() && y_max > 0.0 { y_max * 1.1 } else { 1.0 };
    // A single epoch still needs a non-zero x span
    let (x_min, x_max) = if x_max > x_min {
        (x_min, x_max)
    } else if x_min.is_finite() {
        (x_min - 1.0, x_min + 1.0)
    } else {
        (0.0, 1.0)
    };

    let scale_x = |x: f64| MARGIN_LEFT + ((x - x_min) / (x_max - x_min)) * plot_width;
    let scale_y =
        |y: f64| MARGIN_TOP + plot_height - ((y - y_min) / (y_max - y_min)) * plot_height;

    let mut svg = svg_header(CHART_WIDTH, CHART_HEIGHT);
    svg.push_str(&svg_title(title, CHART_WIDTH));

    // Grid lines and y tick labels
    for i in 0..=5 {
        let value = y_min + (i as f64 / 5.0) * (y_max - y_min);
        let y = scale_y(value);

        svg.push_str(&format!(
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="1"/>"#,
            MARGIN_LEFT, y, MARGIN_LEFT + plot_width, y, COLOR_GRID
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="end" font-family="Arial, sans-serif" font-size="12" fill="{}">{:.3}</text>"#,
            MARGIN_LEFT - 10.0, y + 4.0, COLOR_TEXT, value
        ));
    }

    // Axes
    svg.push_str(&format!(
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        MARGIN_LEFT, MARGIN_TOP + plot_height, MARGIN_LEFT + plot_width, MARGIN_TOP + plot_height, COLOR_AXIS
    ));
    svg.push_str(&format!(
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        MARGIN_LEFT, MARGIN_TOP, MARGIN_LEFT, MARGIN_TOP + plot_height, COLOR_AXIS
    ));

    svg.push_str(&format!(
        r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}">{}</text>"#,
        MARGIN_LEFT + plot_width / 2.0, CHART_HEIGHT - 20.0, COLOR_TEXT, escape_xml(x_label)
    ));
    svg.push_str(&format!(
        r#"<text x="20" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}" transform="rotate(-90 20 {})">{}</text>"#,
        CHART_HEIGHT / 2.0, COLOR_TEXT, CHART_HEIGHT / 2.0, escape_xml(y_label)
    ));

    for series_data in series {
        if series_data.points.is_empty() {
            continue;
        }

        let path: Vec<String> = series_data
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let cmd = if i == 0 { "M" } else { "L" };
                format!("{} {} {}", cmd, scale_x(p.x), scale_y(p.y))
            })
            .collect();

        svg.push_str(&format!(
            r#"<path d="{}" fill="none" stroke="{}" stroke-width="3"/>"#,
            path.join(" "),
            series_data.color
        ));

        for point in &series_data.points {
            let (x, y) = (scale_x(point.x), scale_y(point.y));

            svg.push_str(&format!(
                r#"<circle cx="{}" cy="{}" r="5" fill="{}" stroke="white" stroke-width="2"/>"#,
                x, y, series_data.color
            ));

            if let Some(label) = &point.label {
                svg.push_str(&format!(
                    r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="10" fill="{}">{}</text>"#,
                    x, y - 12.0, COLOR_TEXT, escape_xml(label)
                ));
            }
        }
    }

    // X tick labels from the first series
    if let Some(first) = series.first() {
        for point in &first.points {
            svg.push_str(&format!(
                r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="11" fill="{}">{:.0}</text>"#,
                scale_x(point.x), MARGIN_TOP + plot_height + 20.0, COLOR_TEXT, point.x
            ));
        }
    }

    // Legend
    let mut legend_y = MARGIN_TOP + 10.0;
    for series_data in series {
        svg.push_str(&format!(
            r#"<rect x="{}" y="{}" width="15" height="15" fill="{}"/>"#,
            CHART_WIDTH - MARGIN_RIGHT - 100.0, legend_y, series_data.color
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" font-family="Arial, sans-serif" font-size="12" fill="{}">{}</text>"#,
            CHART_WIDTH - MARGIN_RIGHT - 80.0, legend_y + 12.0, COLOR_TEXT, escape_xml(&series_data.name)
        ));
        legend_y += 25.0;
    }

    svg.push_str("</svg>");

    fs::write(output_path, svg)
}

/// Generate an annotated confusion-matrix heatmap SVG
///
/// Rows are actual classes, columns are predicted classes. Each cell shows
/// its count; shading scales with the largest cell.
pub fn generate_confusion_heatmap(
    title: &str,
    matrix: &ConfusionMatrix,
    class_names: &[String],
    output_path: &Path,
) -> std::io::Result<()> {
    let k = matrix.num_classes.max(1);
    let cell = (480.0 / k as f64).clamp(24.0, 90.0);
    let grid = cell * k as f64;

    let left = 180.0;
    let top = 70.0;
    let width = left + grid + 60.0;
    let height = top + grid + 150.0;

    let max_count = matrix.max_count().max(1) as f64;

    let mut svg = svg_header(width, height);
    svg.push_str(&svg_title(title, width));

    for row in 0..matrix.num_classes {
        for col in 0..matrix.num_classes {
            let count = matrix.get(row, col);
            let intensity = count as f64 / max_count;
            let x = left + col as f64 * cell;
            let y = top + row as f64 * cell;

            svg.push_str(&format!(
                r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}" stroke="white" stroke-width="1"/>"#,
                x, y, cell, cell, heat_color(intensity)
            ));

            let text_color = if intensity > 0.5 { "white" } else { COLOR_TEXT };
            svg.push_str(&format!(
                r#"<text x="{}" y="{}" text-anchor="middle" dominant-baseline="middle" font-family="Arial, sans-serif" font-size="{:.0}" fill="{}">{}</text>"#,
                x + cell / 2.0, y + cell / 2.0, (cell * 0.3).clamp(9.0, 16.0), text_color, count
            ));
        }
    }

    // Row labels (actual)
    for (row, name) in class_names.iter().enumerate().take(matrix.num_classes) {
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="end" dominant-baseline="middle" font-family="Arial, sans-serif" font-size="12" fill="{}">{}</text>"#,
            left - 8.0, top + row as f64 * cell + cell / 2.0, COLOR_TEXT, escape_xml(name)
        ));
    }

    // Column labels (predicted), rotated
    for (col, name) in class_names.iter().enumerate().take(matrix.num_classes) {
        let x = left + col as f64 * cell + cell / 2.0;
        let y = top + grid + 12.0;
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="end" font-family="Arial, sans-serif" font-size="12" fill="{}" transform="rotate(-45 {} {})">{}</text>"#,
            x, y, COLOR_TEXT, x, y, escape_xml(name)
        ));
    }

    svg.push_str(&format!(
        r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}">Predicted</text>"#,
        left + grid / 2.0, height - 15.0, COLOR_TEXT
    ));
    svg.push_str(&format!(
        r#"<text x="20" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}" transform="rotate(-90 20 {})">Actual</text>"#,
        top + grid / 2.0, COLOR_TEXT, top + grid / 2.0
    ));

    svg.push_str("</svg>");

    fs::write(output_path, svg)
}

fn svg_header(width: f64, height: f64) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}"><rect width="{w}" height="{h}" fill="white"/>"#,
        w = width,
        h = height
    )
}

fn svg_title(title: &str, width: f64) -> String {
    format!(
        r#"<text x="{}" y="35" text-anchor="middle" font-family="Arial, sans-serif" font-size="18" font-weight="bold" fill="{}">{}</text>"#,
        width / 2.0,
        COLOR_TEXT,
        escape_xml(title)
    )
}

/// Linear blend between the heatmap end colors, `t` in [0, 1]
fn heat_color(t: f64) -> String {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        mix(HEAT_LOW.0, HEAT_HIGH.0),
        mix(HEAT_LOW.1, HEAT_HIGH.1),
        mix(HEAT_LOW.2, HEAT_HIGH.2)
    )
}

fn find_ranges(series: &[DataSeries]) -> (f64, f64, f64, f64) {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;

    for s in series {
        for p in &s.points {
            x_min = x_min.min(p.x);
            x_max = x_max.max(p.x);
            y_min = y_min.min(p.y);
            y_max = y_max.max(p.y);
        }
    }

    (x_min, x_max, y_min, y_max)
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
