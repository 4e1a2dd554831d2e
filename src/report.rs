use std::io::{self, Write};

use plotters::prelude::*;

use crate::error::{Error, Result};
use crate::pipeline::EnrichmentRun;
use crate::results::{Analysis, PathwayResult};

/// Value drawn per pathway by [`write_bar_chart`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarMetric {
    IngroupMean,
    Zscore,
    NegLog10Padj,
}

impl BarMetric {
    pub fn label(&self) -> &'static str {
        match self {
            BarMetric::IngroupMean => "ingroup_mean",
            BarMetric::Zscore => "zscore",
            BarMetric::NegLog10Padj => "-log10(padj)",
        }
    }

    fn value(&self, result: &PathwayResult) -> Option<f64> {
        let value = match self {
            BarMetric::IngroupMean => Some(result.ingroup_mean),
            BarMetric::Zscore => result.zscore,
            BarMetric::NegLog10Padj => result.padj.map(|q| -q.max(f64::MIN_POSITIVE).log10()),
        };
        value.filter(|v| v.is_finite())
    }
}

fn fmt_float(x: f64) -> String {
    if x.is_nan() {
        "NA".to_string()
    } else {
        format!("{x:.4}")
    }
}

fn fmt_pvalue(x: Option<f64>) -> String {
    match x {
        Some(p) if !p.is_nan() => format!("{p:.3e}"),
        _ => "NA".to_string(),
    }
}

/// Writes the ranked pathways of a run as an aligned text table
pub fn write_table<W: Write>(writer: &mut W, run: &EnrichmentRun) -> io::Result<()> {
    let mut header = vec!["pathway", "ingroup_n", "ingroup_mean", "outgroup_n", "outgroup_mean"];
    if run.analysis == Analysis::Comparison {
        header.extend(["zscore", "oddsratio"]);
    }
    header.extend(["pvalue", "padj"]);

    let rows = run
        .ranked
        .iter()
        .map(|r| {
            let mut row = vec![
                r.pathway.clone(),
                r.ingroup_n.to_string(),
                fmt_float(r.ingroup_mean),
                r.outgroup_n.to_string(),
                fmt_float(r.outgroup_mean),
            ];
            if run.analysis == Analysis::Comparison {
                row.push(fmt_float(r.zscore.unwrap_or(f64::NAN)));
                row.push(fmt_float(r.oddsratio.unwrap_or(f64::NAN)));
            }
            row.push(fmt_pvalue(Some(r.pvalue)));
            row.push(fmt_pvalue(r.padj));
            row
        })
        .collect::<Vec<_>>();

    let widths = header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .map(|row| row[i].len())
                .chain(std::iter::once(h.len()))
                .max()
                .unwrap_or_default()
        })
        .collect::<Vec<_>>();

    let header = header.iter().map(|h| h.to_string()).collect::<Vec<_>>();
    for row in std::iter::once(&header).chain(rows.iter()) {
        let line = row
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, &width))| {
                // pathway names read left-aligned, numbers right-aligned
                if i == 0 {
                    format!("{cell:<width$}")
                } else {
                    format!("{cell:>width$}")
                }
            })
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(writer, "{}", line.trim_end())?;
    }
    Ok(())
}

/// Writes a horizontal bar chart of `metric` as an SVG document, one bar per
/// pathway
///
/// Bars are scaled so the largest magnitude spans the plot area. When any
/// value is negative the axis moves to the middle and negative bars grow to
/// its left. Pathways without a value get a label and no bar.
pub fn write_bar_chart<W: Write>(
    writer: &mut W,
    results: &[PathwayResult],
    metric: BarMetric,
    width: u32,
) -> Result<()> {
    let svg = render_bar_chart(results, metric, width)?;
    writer.write_all(svg.as_bytes())?;
    Ok(())
}

/// Rough advance of one 12px sans-serif glyph
const GLYPH_WIDTH: i32 = 7;
const ROW_HEIGHT: i32 = 20;
const MARGIN: i32 = 10;
const VALUE_WIDTH: i32 = 8 * GLYPH_WIDTH;
const BAR_COLOR: RGBColor = RGBColor(70, 130, 180);

/// Horizontal pixel span of each bar around one shared axis
#[derive(Debug, PartialEq, Eq)]
struct BarLayout {
    axis: i32,
    spans: Vec<(i32, i32)>,
}

impl BarLayout {
    fn new(values: &[Option<f64>], left: i32, right: i32) -> Self {
        let max = values
            .iter()
            .flatten()
            .fold(0.0f64, |acc, v| acc.max(v.abs()));
        let signed = values.iter().flatten().any(|v| *v < 0.0);
        let axis = if signed { (left + right) / 2 } else { left };
        let room = f64::from(right - axis);
        let spans = values
            .iter()
            .map(|value| {
                let length = match value {
                    Some(v) if max > 0.0 => (v.abs() / max * room).round() as i32,
                    _ => 0,
                };
                match value {
                    Some(v) if *v < 0.0 => (axis - length, axis),
                    _ => (axis, axis + length),
                }
            })
            .collect();
        Self { axis, spans }
    }
}

fn render_bar_chart(results: &[PathwayResult], metric: BarMetric, width: u32) -> Result<String> {
    let values = results.iter().map(|r| metric.value(r)).collect::<Vec<_>>();
    let name_width = results
        .iter()
        .map(|r| r.pathway.chars().count())
        .max()
        .unwrap_or(0) as i32
        * GLYPH_WIDTH;
    let left = 2 * MARGIN + name_width;
    let right = width as i32 - 2 * MARGIN - VALUE_WIDTH;
    if right <= left {
        return Err(Error::chart(format!(
            "a width of {width} pixels leaves no room for bars"
        )));
    }
    let layout = BarLayout::new(&values, left, right);
    let bottom = MARGIN + ROW_HEIGHT * (results.len() as i32 + 1);
    let font = || ("sans-serif", 12).into_font().color(&BLACK);

    let mut svg = String::new();
    {
        let root =
            SVGBackend::with_string(&mut svg, (width, (bottom + MARGIN) as u32)).into_drawing_area();
        root.fill(&WHITE).map_err(Error::chart)?;
        root.draw(&Text::new(metric.label(), (MARGIN, MARGIN), font()))
            .map_err(Error::chart)?;

        let rows = results.iter().zip(&values).zip(&layout.spans);
        for (row, ((result, value), &(start, end))) in rows.enumerate() {
            let top = MARGIN + ROW_HEIGHT * (row as i32 + 1);
            root.draw(&Text::new(result.pathway.as_str(), (MARGIN, top + 4), font()))
                .map_err(Error::chart)?;
            if end > start {
                root.draw(&Rectangle::new(
                    [(start, top + 2), (end, top + ROW_HEIGHT - 2)],
                    BAR_COLOR.filled(),
                ))
                .map_err(Error::chart)?;
            }
            let label = value.map_or_else(|| "NA".to_string(), |v| format!("{v:.3}"));
            root.draw(&Text::new(label, (right + MARGIN, top + 4), font()))
                .map_err(Error::chart)?;
        }

        root.draw(&PathElement::new(
            vec![(layout.axis, MARGIN + ROW_HEIGHT), (layout.axis, bottom)],
            BLACK.stroke_width(1),
        ))
        .map_err(Error::chart)?;
        root.present().map_err(Error::chart)?;
    }
    Ok(svg)
}
