//! Minimal SVG line-and-point charts.
//!
//! Every chart is drawn on a fixed 7 × 4.5 inch canvas at 96 DPI, with years
//! on the x axis and either a log10 or a linear y axis. A missing value breaks
//! its series' line: no point is drawn and the line resumes at the next
//! available year.

use imaging_core::formatting::{format_compact, format_number};

/// Canvas width in inches.
pub const WIDTH_IN: f64 = 7.0;
/// Canvas height in inches.
pub const HEIGHT_IN: f64 = 4.5;
/// Pixels per inch.
pub const DPI: f64 = 96.0;

const MARGIN_LEFT: f64 = 72.0;
const MARGIN_RIGHT: f64 = 112.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 52.0;

/// Line colours, assigned to series in order.
pub const PALETTE: [&str; 6] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#4d4d4d",
];

/// How values map onto the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YScale {
    Linear,
    /// Powers of ten; ticks at each decade labelled `1K`, `10K`, `1M` …
    /// Non-positive values are treated as missing.
    Log10,
}

/// One line on a chart.
#[derive(Debug, Clone)]
pub struct ChartSeries {
    pub label: String,
    pub color: String,
    /// `(year, value)` pairs; `None` leaves a gap.
    pub points: Vec<(i32, Option<f64>)>,
}

/// A year-on-x line chart.
#[derive(Debug, Clone)]
pub struct LineChart {
    pub title: String,
    pub y_label: String,
    pub y_scale: YScale,
    pub series: Vec<ChartSeries>,
    /// Dashed horizontal line at this value.
    pub reference_line: Option<f64>,
}

impl LineChart {
    pub fn new(title: impl Into<String>, y_label: impl Into<String>, y_scale: YScale) -> Self {
        Self {
            title: title.into(),
            y_label: y_label.into(),
            y_scale,
            series: Vec::new(),
            reference_line: None,
        }
    }

    /// Append a series, colouring it from [`PALETTE`] by position.
    pub fn with_series(mut self, label: impl Into<String>, points: Vec<(i32, Option<f64>)>) -> Self {
        let color = PALETTE[self.series.len() % PALETTE.len()].to_string();
        self.series.push(ChartSeries {
            label: label.into(),
            color,
            points,
        });
        self
    }

    pub fn with_reference_line(mut self, value: f64) -> Self {
        self.reference_line = Some(value);
        self
    }

    /// Canvas size in pixels.
    pub fn size_px() -> (f64, f64) {
        (WIDTH_IN * DPI, HEIGHT_IN * DPI)
    }

    /// Render the chart as a standalone SVG document.
    pub fn render_svg(&self) -> String {
        let (width, height) = Self::size_px();
        let plot = PlotArea {
            left: MARGIN_LEFT,
            right: width - MARGIN_RIGHT,
            top: MARGIN_TOP,
            bottom: height - MARGIN_BOTTOM,
        };
        let years = self.year_range();
        let axis = self.y_axis();

        let mut svg = String::new();
        svg.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" \
             viewBox=\"0 0 {w} {h}\" font-family=\"sans-serif\" font-size=\"11\">\n",
            w = width,
            h = height
        ));
        svg.push_str(&format!(
            "<rect width=\"{}\" height=\"{}\" fill=\"white\"/>\n",
            width, height
        ));
        svg.push_str(&format!(
            "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-size=\"14\" font-weight=\"bold\">{}</text>\n",
            (plot.left + plot.right) / 2.0,
            MARGIN_TOP / 2.0 + 5.0,
            escape(&self.title)
        ));

        // ── Axes and grid ────────────────────────────────────────────────────
        for (value, label) in &axis.ticks {
            let y = plot.y(axis.fraction(*value));
            svg.push_str(&format!(
                "<line x1=\"{l}\" y1=\"{y:.1}\" x2=\"{r}\" y2=\"{y:.1}\" stroke=\"#e0e0e0\"/>\n\
                 <text x=\"{tx}\" y=\"{ty:.1}\" text-anchor=\"end\">{label}</text>\n",
                l = plot.left,
                r = plot.right,
                y = y,
                tx = plot.left - 6.0,
                ty = y + 4.0,
                label = escape(label)
            ));
        }
        if let Some((first, last)) = years {
            for year in first..=last {
                let x = plot.x(year_fraction(year, first, last));
                svg.push_str(&format!(
                    "<text x=\"{:.1}\" y=\"{}\" text-anchor=\"middle\">{}</text>\n",
                    x,
                    plot.bottom + 16.0,
                    year
                ));
            }
        }
        svg.push_str(&format!(
            "<polyline points=\"{l},{t} {l},{b} {r},{b}\" fill=\"none\" stroke=\"black\"/>\n",
            l = plot.left,
            t = plot.top,
            b = plot.bottom,
            r = plot.right
        ));
        svg.push_str(&format!(
            "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\">Year</text>\n",
            (plot.left + plot.right) / 2.0,
            height - 14.0
        ));
        svg.push_str(&format!(
            "<text x=\"16\" y=\"{y}\" text-anchor=\"middle\" transform=\"rotate(-90 16 {y})\">{}</text>\n",
            escape(&self.y_label),
            y = (plot.top + plot.bottom) / 2.0
        ));

        if let Some(value) = self.reference_line {
            if axis.accepts(value) {
                let y = plot.y(axis.fraction(value));
                svg.push_str(&format!(
                    "<line x1=\"{}\" y1=\"{y:.1}\" x2=\"{}\" y2=\"{y:.1}\" stroke=\"#555555\" \
                     stroke-dasharray=\"6,4\"/>\n",
                    plot.left,
                    plot.right,
                    y = y
                ));
            }
        }

        // ── Series ───────────────────────────────────────────────────────────
        if let Some((first, last)) = years {
            for series in &self.series {
                for segment in self.segments(series) {
                    let coords: Vec<String> = segment
                        .iter()
                        .map(|(year, value)| {
                            format!(
                                "{:.1},{:.1}",
                                plot.x(year_fraction(*year, first, last)),
                                plot.y(axis.fraction(*value))
                            )
                        })
                        .collect();
                    if coords.len() > 1 {
                        svg.push_str(&format!(
                            "<polyline points=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\"/>\n",
                            coords.join(" "),
                            series.color
                        ));
                    }
                    for (year, value) in &segment {
                        svg.push_str(&format!(
                            "<circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"3\" fill=\"{}\"/>\n",
                            plot.x(year_fraction(*year, first, last)),
                            plot.y(axis.fraction(*value)),
                            series.color
                        ));
                    }
                }
            }
        }

        // ── Legend ───────────────────────────────────────────────────────────
        for (i, series) in self.series.iter().enumerate() {
            let y = plot.top + 10.0 + i as f64 * 18.0;
            let x = plot.right + 14.0;
            svg.push_str(&format!(
                "<line x1=\"{x}\" y1=\"{y}\" x2=\"{}\" y2=\"{y}\" stroke=\"{c}\" stroke-width=\"2\"/>\n\
                 <circle cx=\"{}\" cy=\"{y}\" r=\"3\" fill=\"{c}\"/>\n\
                 <text x=\"{}\" y=\"{}\">{}</text>\n",
                x + 20.0,
                x + 10.0,
                x + 26.0,
                y + 4.0,
                escape(&series.label),
                x = x,
                y = y,
                c = series.color
            ));
        }

        svg.push_str("</svg>\n");
        svg
    }

    /// Runs of consecutive plottable points.
    fn segments(&self, series: &ChartSeries) -> Vec<Vec<(i32, f64)>> {
        let mut points: Vec<(i32, Option<f64>)> = series.points.clone();
        points.sort_by_key(|(year, _)| *year);

        let mut segments = Vec::new();
        let mut current = Vec::new();
        for (year, value) in points {
            match value.filter(|v| self.plottable(*v)) {
                Some(v) => current.push((year, v)),
                None => {
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    }
                }
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }

    fn plottable(&self, value: f64) -> bool {
        value.is_finite() && (self.y_scale == YScale::Linear || value > 0.0)
    }

    fn year_range(&self) -> Option<(i32, i32)> {
        let years = self.series.iter().flat_map(|s| s.points.iter().map(|(y, _)| *y));
        let first = years.clone().min()?;
        let last = years.max()?;
        Some((first, last))
    }

    fn y_axis(&self) -> YAxis {
        let mut values: Vec<f64> = self
            .series
            .iter()
            .flat_map(|s| s.points.iter().filter_map(|(_, v)| *v))
            .filter(|v| self.plottable(*v))
            .collect();
        if let Some(r) = self.reference_line.filter(|r| self.plottable(*r)) {
            values.push(r);
        }
        match self.y_scale {
            YScale::Log10 => YAxis::log10(&values),
            YScale::Linear => YAxis::linear(&values),
        }
    }
}

// ── Geometry ──────────────────────────────────────────────────────────────────

struct PlotArea {
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
}

impl PlotArea {
    fn x(&self, fraction: f64) -> f64 {
        self.left + fraction * (self.right - self.left)
    }

    fn y(&self, fraction: f64) -> f64 {
        self.bottom - fraction * (self.bottom - self.top)
    }
}

fn year_fraction(year: i32, first: i32, last: i32) -> f64 {
    if first == last {
        0.5
    } else {
        (year - first) as f64 / (last - first) as f64
    }
}

struct YAxis {
    scale: YScale,
    lo: f64,
    hi: f64,
    ticks: Vec<(f64, String)>,
}

impl YAxis {
    /// Whole decades covering `values`, at least one decade tall.
    fn log10(values: &[f64]) -> Self {
        let (min, max) = min_max(values).unwrap_or((1.0, 10.0));
        let lo_exp = min.log10().floor() as i32;
        let mut hi_exp = max.log10().ceil() as i32;
        if hi_exp <= lo_exp {
            hi_exp = lo_exp + 1;
        }
        let ticks = (lo_exp..=hi_exp)
            .map(|e| {
                let v = 10_f64.powi(e);
                (v, format_compact(v))
            })
            .collect();
        Self {
            scale: YScale::Log10,
            lo: 10_f64.powi(lo_exp),
            hi: 10_f64.powi(hi_exp),
            ticks,
        }
    }

    /// Round-number ticks (steps of 1, 2 or 5 × 10ⁿ) covering `values`.
    fn linear(values: &[f64]) -> Self {
        let (mut min, mut max) = min_max(values).unwrap_or((0.0, 1.0));
        if (max - min).abs() < f64::EPSILON {
            min -= 0.5;
            max += 0.5;
        }
        let step = nice_step((max - min) / 5.0);
        // Tolerate float noise so exact multiples of `step` stay on the axis ends.
        let lo = (min / step + 1e-9).floor() * step;
        let hi = (max / step - 1e-9).ceil() * step;
        let n = ((hi - lo) / step).round() as i64;
        let decimals = if step >= 1.0 {
            0
        } else {
            (-step.log10() - 1e-9).ceil() as u32
        };
        let ticks = (0..=n)
            .map(|i| {
                let v = lo + i as f64 * step;
                (v, format_number(v, decimals))
            })
            .collect();
        Self {
            scale: YScale::Linear,
            lo,
            hi,
            ticks,
        }
    }

    fn accepts(&self, value: f64) -> bool {
        let positive = self.scale == YScale::Linear || value > 0.0;
        positive && value >= self.lo && value <= self.hi
    }

    /// Position of `value` between the axis ends, 0 at the bottom.
    fn fraction(&self, value: f64) -> f64 {
        match self.scale {
            YScale::Linear => (value - self.lo) / (self.hi - self.lo),
            YScale::Log10 => (value.log10() - self.lo.log10()) / (self.hi.log10() - self.lo.log10()),
        }
    }
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let min = values.iter().copied().reduce(f64::min)?;
    let max = values.iter().copied().reduce(f64::max)?;
    Some((min, max))
}

fn nice_step(raw: f64) -> f64 {
    let magnitude = 10_f64.powi(raw.log10().floor() as i32);
    let normalized = raw / magnitude;
    let nice = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn volume_chart() -> LineChart {
        LineChart::new("Volume", "Services", YScale::Log10)
            .with_series(
                "Echo",
                vec![(2013, Some(2_000_000.0)), (2014, Some(2_500_000.0))],
            )
            .with_series("PET", vec![(2013, Some(5_000.0)), (2014, Some(8_000.0))])
    }

    #[test]
    fn test_canvas_size() {
        assert_eq!(LineChart::size_px(), (672.0, 432.0));
        let svg = volume_chart().render_svg();
        assert!(svg.starts_with("<svg "));
        assert!(svg.contains("width=\"672\""));
        assert!(svg.contains("height=\"432\""));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_log_ticks_cover_whole_decades() {
        let svg = volume_chart().render_svg();
        for label in [">1K<", ">10K<", ">100K<", ">1M<", ">10M<"] {
            assert!(svg.contains(label), "missing tick {}", label);
        }
        assert!(!svg.contains(">100<"));
    }

    #[test]
    fn test_one_line_per_series() {
        let svg = volume_chart().render_svg();
        assert_eq!(svg.matches("stroke-width=\"2\"/>").count(), 4);
        assert!(svg.contains(">Echo<"));
        assert!(svg.contains(">PET<"));
        assert!(svg.contains(">2013<"));
        assert!(svg.contains(">2014<"));
    }

    #[test]
    fn test_missing_value_breaks_line() {
        let chart = LineChart::new("Ratio", "Ratio", YScale::Linear).with_series(
            "CT",
            vec![
                (2013, Some(1.0)),
                (2014, Some(1.1)),
                (2015, None),
                (2016, Some(1.3)),
                (2017, Some(1.4)),
            ],
        );
        let series = &chart.series[0];
        let segments = chart.segments(series);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], vec![(2013, 1.0), (2014, 1.1)]);
        assert_eq!(segments[1], vec![(2016, 1.3), (2017, 1.4)]);

        let svg = chart.render_svg();
        assert_eq!(svg.matches("<circle").count(), 4 + 1);
    }

    #[test]
    fn test_log_scale_drops_non_positive() {
        let chart = LineChart::new("V", "V", YScale::Log10)
            .with_series("A", vec![(2013, Some(0.0)), (2014, Some(100.0))]);
        let segments = chart.segments(&chart.series[0]);
        assert_eq!(segments, vec![vec![(2014, 100.0)]]);
    }

    #[test]
    fn test_reference_line_is_dashed() {
        let chart = LineChart::new("Ratio", "Ratio", YScale::Linear)
            .with_series("MRI", vec![(2013, Some(1.0)), (2014, Some(0.8))])
            .with_reference_line(1.0);
        let svg = chart.render_svg();
        assert!(svg.contains("stroke-dasharray"));
    }

    #[test]
    fn test_linear_ticks() {
        let axis = YAxis::linear(&[0.8, 1.0, 1.25]);
        let labels: Vec<&str> = axis.ticks.iter().map(|(_, l)| l.as_str()).collect();
        assert_eq!(labels, vec!["0.8", "0.9", "1.0", "1.1", "1.2", "1.3"]);
        assert!((axis.fraction(axis.lo)).abs() < 1e-9);
        assert!((axis.fraction(axis.hi) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_series_still_has_height() {
        let axis = YAxis::linear(&[1.0, 1.0]);
        assert!(axis.hi > axis.lo);
        let axis = YAxis::log10(&[100.0]);
        assert_eq!(axis.lo, 100.0);
        assert_eq!(axis.hi, 1000.0);
    }

    #[test]
    fn test_empty_chart_renders() {
        let svg = LineChart::new("Empty", "None", YScale::Log10).render_svg();
        assert!(svg.contains(">Empty<"));
        assert!(!svg.contains("<circle"));
    }

    #[test]
    fn test_labels_are_escaped() {
        let chart = LineChart::new("A & B <C>", "y", YScale::Linear);
        let svg = chart.render_svg();
        assert!(svg.contains("A &amp; B &lt;C&gt;"));
    }
}
