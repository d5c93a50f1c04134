//! SVG rendering of the close price with its SMA overlay.

use crate::domain::bar_series::BarSeries;
use crate::domain::date_range::DATE_FORMAT;
use std::fmt::Write;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 400.0;
const PADDING: f64 = 50.0;

struct Scale {
    min: f64,
    scale_x: f64,
    scale_y: f64,
}

impl Scale {
    fn new(len: usize, min: f64, max: f64) -> Self {
        let plot_width = WIDTH - 2.0 * PADDING;
        let plot_height = HEIGHT - 2.0 * PADDING;
        let range = max - min;
        Self {
            min,
            scale_x: if len > 1 {
                plot_width / (len - 1) as f64
            } else {
                0.0
            },
            scale_y: if range > 0.0 { plot_height / range } else { 1.0 },
        }
    }

    fn point(&self, i: usize, value: f64) -> String {
        let x = PADDING + i as f64 * self.scale_x;
        let y = HEIGHT - PADDING - (value - self.min) * self.scale_y;
        format!("{x:.1},{y:.1}")
    }
}

/// Split an optional series into runs of consecutive defined values.
fn segments(values: &[Option<f64>]) -> Vec<Vec<(usize, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (i, v) in values.iter().enumerate() {
        match v {
            Some(v) if v.is_finite() => current.push((i, *v)),
            _ => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn polyline(scale: &Scale, points: &[(usize, f64)], stroke: &str) -> String {
    let coords: Vec<String> = points.iter().map(|&(i, v)| scale.point(i, v)).collect();
    format!(
        r#"<polyline fill="none" stroke="{stroke}" stroke-width="1.5" points="{}"/>"#,
        coords.join(" ")
    )
}

/// Render close prices and `overlay` as a standalone SVG document. Overlay
/// positions without a value leave a gap in the SMA line.
pub fn render_price_chart(series: &BarSeries, overlay: &[Option<f64>]) -> String {
    let closes = series.closes();
    let defined_overlay = overlay.iter().flatten().copied().filter(|v| v.is_finite());
    let (min, max) = closes
        .iter()
        .copied()
        .chain(defined_overlay)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    let scale = Scale::new(closes.len(), min, max);

    let close_points: Vec<(usize, f64)> = closes.iter().copied().enumerate().collect();

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH:.0}" height="{HEIGHT:.0}" viewBox="0 0 {WIDTH:.0} {HEIGHT:.0}">"#
    );
    let _ = writeln!(
        svg,
        r#"<rect width="100%" height="100%" fill="white"/>"#
    );
    let _ = writeln!(
        svg,
        r#"<text x="{PADDING:.0}" y="25" font-family="sans-serif" font-size="16">{} Stock Price</text>"#,
        escape_xml(series.instrument())
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{PADDING:.0}" y1="{:.0}" x2="{:.0}" y2="{:.0}" stroke="black"/>"#,
        HEIGHT - PADDING,
        WIDTH - PADDING,
        HEIGHT - PADDING
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{PADDING:.0}" y1="{PADDING:.0}" x2="{PADDING:.0}" y2="{:.0}" stroke="black"/>"#,
        HEIGHT - PADDING
    );
    let _ = writeln!(
        svg,
        r#"<text x="5" y="{:.0}" font-family="sans-serif" font-size="10">{max:.2}</text>"#,
        PADDING + 4.0
    );
    let _ = writeln!(
        svg,
        r#"<text x="5" y="{:.0}" font-family="sans-serif" font-size="10">{min:.2}</text>"#,
        HEIGHT - PADDING
    );
    let _ = writeln!(
        svg,
        r#"<text x="{PADDING:.0}" y="{:.0}" font-family="sans-serif" font-size="10">{}</text>"#,
        HEIGHT - PADDING + 15.0,
        series.start_date().format(DATE_FORMAT)
    );
    let _ = writeln!(
        svg,
        r#"<text x="{:.0}" y="{:.0}" font-family="sans-serif" font-size="10" text-anchor="end">{}</text>"#,
        WIDTH - PADDING,
        HEIGHT - PADDING + 15.0,
        series.end_date().format(DATE_FORMAT)
    );

    let _ = writeln!(svg, "{}", polyline(&scale, &close_points, "steelblue"));
    for run in segments(overlay) {
        let _ = writeln!(svg, "{}", polyline(&scale, &run, "darkorange"));
    }

    svg.push_str("</svg>\n");
    svg
}
