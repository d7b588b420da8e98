use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;

use crate::plan::{Series, SeriesKind, SeriesPlan};
use crate::RenderOptions;

/// Marker colors for extrema, matching the original tool's annotations.
const MAX_MARKER: RGBColor = RGBColor(128, 0, 128);
const MIN_MARKER: RGBColor = RGBColor(255, 165, 0);

/// Cycle of series colors assigned in plan order.
const SERIES_COLORS: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
];

const BAR_WIDTH: f64 = 0.8;
const MARKER_SIZE: i32 = 5;

/// Draw a series plan to PNG bytes.
///
/// The x-axis is categorical over the plan's label values; lines and bars
/// share it by plotting at the row's category index. Every series gets a
/// legend entry, and each extrema set gets its own "Max {column}" /
/// "Min {column}" entry. An empty plan still renders a framed chart.
pub fn render(plan: &SeriesPlan, options: &RenderOptions) -> Result<Vec<u8>> {
    let (width, height) = (options.width, options.height);
    let mut buffer = vec![0u8; (width * height * 3) as usize];

    {
        let root =
            BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).context("Failed to fill background")?;

        let x_range = category_range(plan.labels.len());
        let y_range = value_range(&plan.series);

        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption("Data Visualization", ("sans-serif", 20))
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_range, y_range)
            .context("Failed to build chart")?;

        let labels = plan.labels.clone();
        let x_desc = if plan.label_column.is_empty() {
            "Index".to_string()
        } else {
            plan.label_column.clone()
        };
        chart
            .configure_mesh()
            .x_desc(x_desc)
            .y_desc("Value")
            .x_labels(labels.len().max(1))
            .x_label_formatter(&|x| {
                let index = x.round() as usize;
                if (x - index as f64).abs() < 0.25 {
                    labels.get(index).cloned().unwrap_or_default()
                } else {
                    String::new()
                }
            })
            .draw()
            .context("Failed to draw mesh")?;

        for (index, series) in plan.series.iter().enumerate() {
            let color = SERIES_COLORS[index % SERIES_COLORS.len()];
            match series.kind {
                SeriesKind::Line => draw_line_series(&mut chart, series, color)?,
                SeriesKind::BarWithExtrema => draw_bar_series(&mut chart, series, color)?,
            }
        }

        if plan.series.iter().any(|s| !s.points.is_empty()) {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .context("Failed to draw legend")?;
        }

        root.present().context("Failed to present drawing")?;
    }

    encode_png(&buffer, width, height)
}

type Chart<'a, 'b> =
    ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn draw_line_series(chart: &mut Chart<'_, '_>, series: &Series, color: RGBColor) -> Result<()> {
    if series.points.is_empty() {
        return Ok(());
    }
    let points: Vec<(f64, f64)> = series
        .points
        .iter()
        .map(|&(row, y)| (row as f64, y))
        .collect();

    chart
        .draw_series(LineSeries::new(points, color.stroke_width(2)))
        .context("Failed to draw line series")?
        .label(series.column.clone())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    Ok(())
}

fn draw_bar_series(chart: &mut Chart<'_, '_>, series: &Series, color: RGBColor) -> Result<()> {
    if !series.points.is_empty() {
        let fill = color.mix(0.6);
        chart
            .draw_series(series.points.iter().map(|&(row, y)| {
                let x = row as f64;
                Rectangle::new(
                    [(x - BAR_WIDTH / 2.0, 0.0), (x + BAR_WIDTH / 2.0, y)],
                    fill.filled(),
                )
            }))
            .context("Failed to draw bar series")?
            .label(series.column.clone())
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.mix(0.6).filled())
            });
    }

    if let Some(extrema) = &series.extrema {
        draw_markers(
            chart,
            &extrema.max_rows,
            extrema.max,
            MAX_MARKER,
            format!("Max {}", series.column),
        )?;
        draw_markers(
            chart,
            &extrema.min_rows,
            extrema.min,
            MIN_MARKER,
            format!("Min {}", series.column),
        )?;
    }
    Ok(())
}

fn draw_markers(
    chart: &mut Chart<'_, '_>,
    rows: &[usize],
    value: f64,
    color: RGBColor,
    label: String,
) -> Result<()> {
    chart
        .draw_series(
            rows.iter()
                .map(|&row| Circle::new((row as f64, value), MARKER_SIZE, color.filled())),
        )
        .context("Failed to draw extrema markers")?
        .label(label)
        .legend(move |(x, y)| Circle::new((x + 5, y), 4, color.filled()));
    Ok(())
}

/// Category axis spans half a slot past the outer categories, the usual
/// discrete placement. Degenerate axes still get a drawable span.
fn category_range(count: usize) -> std::ops::Range<f64> {
    if count == 0 {
        -0.5..0.5
    } else {
        -0.5..(count as f64 - 0.5)
    }
}

fn value_range(series: &[Series]) -> std::ops::Range<f64> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut has_bars = false;

    for s in series {
        if s.kind == SeriesKind::BarWithExtrema && !s.points.is_empty() {
            has_bars = true;
        }
        for &(_, y) in &s.points {
            min = min.min(y);
            max = max.max(y);
        }
        if let Some(extrema) = &s.extrema {
            min = min.min(extrema.min);
            max = max.max(extrema.max);
        }
    }

    // Bars are anchored at zero, so the axis must include it.
    if has_bars {
        min = min.min(0.0);
        max = max.max(0.0);
    }

    if min > max {
        return 0.0..1.0;
    }
    if min == max {
        return (min - 1.0)..(max + 1.0);
    }
    let padding = (max - min) * 0.05;
    (min - padding)..(max + padding)
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }
    Ok(png_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::plan;
    use crate::table::{Cell, Table};

    fn is_valid_png(bytes: &[u8]) -> bool {
        bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_render_mixed_series() {
        let table = Table::new(
            vec![
                "Product".to_string(),
                "Quantity".to_string(),
                "Region".to_string(),
            ],
            vec![
                vec![text("A"), Cell::Number(10.0), text("North")],
                vec![text("B"), Cell::Number(20.0), text("South")],
            ],
        )
        .unwrap();
        let plan = plan(&table, "Product").unwrap();
        let png = render(&plan, &RenderOptions::default()).unwrap();
        assert!(is_valid_png(&png));
    }

    #[test]
    fn test_render_empty_plan() {
        let table = Table::new(vec!["Product".to_string()], vec![]).unwrap();
        let plan = plan(&table, "Product").unwrap();
        let png = render(&plan, &RenderOptions::default()).unwrap();
        assert!(is_valid_png(&png));
    }

    #[test]
    fn test_render_custom_size() {
        let table = Table::new(
            vec!["Product".to_string(), "Sold".to_string()],
            vec![vec![text("A"), Cell::Number(1.0)]],
        )
        .unwrap();
        let plan = plan(&table, "Product").unwrap();
        let options = RenderOptions {
            width: 320,
            height: 240,
        };
        let png = render(&plan, &options).unwrap();
        assert!(is_valid_png(&png));
    }

    #[test]
    fn test_value_range_includes_zero_for_bars() {
        let table = Table::new(
            vec!["Product".to_string(), "Grade".to_string()],
            vec![
                vec![text("A"), Cell::Number(5.0)],
                vec![text("B"), text("n/a")],
            ],
        )
        .unwrap();
        let plan = plan(&table, "Product").unwrap();
        let range = value_range(&plan.series);
        assert!(range.start <= 0.0);
        assert!(range.end >= 5.0);
    }
}
