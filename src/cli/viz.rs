//! Terminal visualization using braille graphics
//!
//! Renders density curves with Unicode braille characters and summarizes
//! a simulated distribution against a regulatory limit as a range bar.

use drawille::Canvas;

use crate::entities::density::DensityCurve;
use crate::entities::distribution::DistributionSummary;

/// Default canvas size for density plots (braille pixels)
pub const PLOT_WIDTH: u32 = 120;
pub const PLOT_HEIGHT: u32 = 32;

/// Render a density curve on a braille canvas
///
/// `domain` fixes the x range so several curves can share one scale. When
/// `marker` falls inside the domain a dotted vertical line is drawn there.
///
/// # Example Output
/// ```text
/// ⠀⠀⠀⠀⠀⠀⣠⠤⠤⣄⠀⠀⠀⠀⠀⠀
/// ⠀⠀⠀⠀⢀⠎⠀⠀⠀⠀⠱⡀⠀⠀⠀⠀
/// ⠀⠀⣀⠔⠁⠀⠀⠀⠀⠀⠀⠈⠢⣀⠀⠀
/// 12.4                       88.1 mg/kg
/// ```
pub fn render_density_curve(
    curve: &DensityCurve,
    domain: (f64, f64),
    width: u32,
    height: u32,
    marker: Option<f64>,
) -> String {
    let (lo, hi) = domain;
    if curve.is_empty() || lo.is_nan() || hi.is_nan() || hi <= lo {
        return "  (no data)".to_string();
    }

    let mut canvas = Canvas::new(width, height);
    let span = hi - lo;
    let max_x = (width - 1) as f64;
    let max_y = (height - 1) as f64;

    let to_px = |x: f64, y: f64| -> (u32, u32) {
        let px = ((x - lo) / span * max_x).clamp(0.0, max_x);
        // Canvas y grows downward; curve y runs 0..=100
        let py = (max_y - y / 100.0 * max_y).clamp(0.0, max_y);
        (px.round() as u32, py.round() as u32)
    };

    let points: Vec<(u32, u32)> = curve
        .x
        .iter()
        .zip(&curve.y)
        .map(|(&x, &y)| to_px(x, y))
        .collect();

    for pair in points.windows(2) {
        let (x1, y1) = pair[0];
        let (x2, y2) = pair[1];
        canvas.line(x1, y1, x2, y2);
    }

    // Baseline
    for x in 0..width {
        canvas.set(x, height - 1);
    }

    if let Some(m) = marker.filter(|m| (lo..=hi).contains(m)) {
        let (mx, _) = to_px(m, 0.0);
        for y in (0..height).step_by(3) {
            canvas.set(mx, y);
        }
    }

    let frame = canvas.frame();
    let label_width = (width as usize).div_ceil(2);
    let left = format!("{:.2}", lo);
    let right = format!("{:.2} mg/kg", hi);
    let gap = label_width.saturating_sub(left.len() + right.len()).max(1);

    format!("{}\n{}{}{}", frame, left, " ".repeat(gap), right)
}

/// Render the 5th-95th percentile span of a distribution against a limit
///
/// ```text
///   limit=50.000
///   ──────────[═══════════╋══════]─────────
///   P5=41.2034  P95=57.9910
/// ```
pub fn render_range_bar(summary: &DistributionSummary, limit: f64) -> String {
    let bar_width = 60;

    let view_min = summary.min.min(limit);
    let view_max = summary.max.max(limit);
    let margin = (view_max - view_min).abs() * 0.1;
    let view_min = view_min - margin;
    let view_max = view_max + margin;
    let view_range = view_max - view_min;
    if view_range.is_nan() || view_range <= 0.0 {
        return format!("  limit={:.3}  all samples at {:.4}", limit, summary.mean);
    }

    let position = |value: f64| -> usize {
        let pos = ((value - view_min) / view_range * bar_width as f64) as usize;
        pos.min(bar_width - 1)
    };

    let pos_limit = position(limit);
    let pos_lo = position(summary.p5);
    let pos_hi = position(summary.p95);

    let mut bar: Vec<char> = vec!['─'; bar_width];
    bar[pos_limit] = '│';

    for cell in bar.iter_mut().take(pos_hi + 1).skip(pos_lo) {
        *cell = if *cell == '│' { '╋' } else { '═' };
    }

    bar[pos_lo] = if bar[pos_lo] == '╋' { '╟' } else { '[' };
    bar[pos_hi] = if bar[pos_hi] == '╋' { '╢' } else { ']' };

    let bar_str: String = bar.into_iter().collect();

    format!(
        "  limit={:.3}\n  {}\n  P5={:.4}  P95={:.4}",
        limit, bar_str, summary.p5, summary.p95
    )
}
