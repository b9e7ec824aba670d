//! Chart rendering for the SNIES summaries.
//!
//! Charts are a byproduct of the analysis: any failure here is reported
//! as a `ChartError` and the caller simply omits that chart key from the
//! bundle. Statistical output never depends on this module succeeding.

use crate::error::ChartError;
use crate::models::{LabelSeries, LocationCount, ProcessSeries, ProgramCostRow};
use plotters::prelude::*;
use std::fmt;
use std::path::Path;

fn draw_err(chart: &'static str, e: impl fmt::Display) -> ChartError {
    ChartError::Draw {
        chart,
        message: e.to_string(),
    }
}

fn pad(max: f64) -> f64 {
    if max <= 0.0 {
        1.0
    } else {
        max * 1.1
    }
}

/// Scatter of mean enrollment vs last observed tuition, one point per
/// institution-program label.
pub fn render_cost_vs_enrollment(rows: &[ProgramCostRow], path: &Path) -> Result<(), ChartError> {
    const NAME: &str = "costo_vs_matriculados";
    if rows.is_empty() {
        return Err(ChartError::EmptySeries(NAME));
    }

    let max_x = rows.iter().map(|r| r.mean_enrollment).fold(0.0, f64::max);
    let max_y = rows.iter().map(|r| r.last_tuition).fold(0.0, f64::max);

    let root = BitMapBackend::new(path, (900, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| draw_err(NAME, e))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Costo vs. Promedio de Matriculados", ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(90)
        .build_cartesian_2d(0.0..pad(max_x), 0.0..pad(max_y))
        .map_err(|e| draw_err(NAME, e))?;

    chart
        .configure_mesh()
        .x_desc("Promedio de estudiantes matriculados")
        .y_desc("Valor último de matrícula pagado")
        .draw()
        .map_err(|e| draw_err(NAME, e))?;

    chart
        .draw_series(
            rows.iter()
                .map(|r| Circle::new((r.mean_enrollment, r.last_tuition), 4, BLUE.filled())),
        )
        .map_err(|e| draw_err(NAME, e))?;

    root.present().map_err(|e| draw_err(NAME, e))?;
    Ok(())
}

/// One line per institution-program label showing mean tuition per
/// period. No legend: with many programs it would swallow the plot.
pub fn render_tuition_evolution(series: &[LabelSeries], path: &Path) -> Result<(), ChartError> {
    const NAME: &str = "evolucion_matricula";
    if series.iter().all(|s| s.points.is_empty()) {
        return Err(ChartError::EmptySeries(NAME));
    }

    // union of period labels, already period-ordered within each series
    let mut periods: Vec<String> = Vec::new();
    for s in series {
        for (period, _) in &s.points {
            if !periods.contains(period) {
                periods.push(period.clone());
            }
        }
    }
    periods.sort();

    let max_y = series
        .iter()
        .flat_map(|s| s.points.iter().map(|(_, v)| *v))
        .fold(0.0, f64::max);

    let root = BitMapBackend::new(path, (900, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| draw_err(NAME, e))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Evolución Valor de Matrícula", ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(90)
        .build_cartesian_2d(0.0..(periods.len().max(2) as f64 - 1.0), 0.0..pad(max_y))
        .map_err(|e| draw_err(NAME, e))?;

    let period_labels = periods.clone();
    chart
        .configure_mesh()
        .x_labels(periods.len().max(2))
        .x_label_formatter(&|x| {
            period_labels
                .get(x.round() as usize)
                .cloned()
                .unwrap_or_default()
        })
        .y_desc("Valor de matrícula")
        .draw()
        .map_err(|e| draw_err(NAME, e))?;

    for (idx, s) in series.iter().enumerate() {
        let color = Palette99::pick(idx);
        let line: Vec<(f64, f64)> = s
            .points
            .iter()
            .filter_map(|(period, value)| {
                periods
                    .iter()
                    .position(|p| p == period)
                    .map(|i| (i as f64, *value))
            })
            .collect();
        chart
            .draw_series(LineSeries::new(line, &color))
            .map_err(|e| draw_err(NAME, e))?;
    }

    root.present().map_err(|e| draw_err(NAME, e))?;
    Ok(())
}

/// Top-10 departments by distinct program count, as a bar chart.
pub fn render_department_bars(counts: &[LocationCount], path: &Path) -> Result<(), ChartError> {
    const NAME: &str = "por_dpto";
    if counts.is_empty() {
        return Err(ChartError::EmptySeries(NAME));
    }

    let top: Vec<&LocationCount> = counts.iter().take(10).collect();
    let max_y = top.iter().map(|c| c.programs as f64).fold(0.0, f64::max);

    let root = BitMapBackend::new(path, (900, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| draw_err(NAME, e))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Programas por Departamento (Top 10)", ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(90)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..top.len() as f64, 0.0..pad(max_y))
        .map_err(|e| draw_err(NAME, e))?;

    let labels: Vec<String> = top.iter().map(|c| c.location.clone()).collect();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(top.len())
        .x_label_formatter(&|x| {
            labels
                .get(x.floor() as usize)
                .cloned()
                .unwrap_or_default()
        })
        .y_desc("Programas distintos")
        .draw()
        .map_err(|e| draw_err(NAME, e))?;

    chart
        .draw_series(top.iter().enumerate().map(|(i, c)| {
            Rectangle::new(
                [(i as f64 + 0.15, 0.0), (i as f64 + 0.85, c.programs as f64)],
                BLUE.filled(),
            )
        }))
        .map_err(|e| draw_err(NAME, e))?;

    root.present().map_err(|e| draw_err(NAME, e))?;
    Ok(())
}

/// Stacked panels, one per process type, each plotting total quantity
/// over time (full cohort, unrestricted by the tuition window).
pub fn render_process_panels(series: &[ProcessSeries], path: &Path) -> Result<(), ChartError> {
    const NAME: &str = "estudiantes_tiempo";
    if series.is_empty() || series.iter().all(|s| s.points.is_empty()) {
        return Err(ChartError::EmptySeries(NAME));
    }

    let height = 220 * series.len() as u32 + 60;
    let root = BitMapBackend::new(path, (1000, height)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| draw_err(NAME, e))?;

    let panels = root.split_evenly((series.len(), 1));

    for (panel, s) in panels.iter().zip(series) {
        let max_y = s.points.iter().map(|p| p.total as f64).fold(0.0, f64::max);
        let len = s.points.len().max(2);

        let mut chart = ChartBuilder::on(panel)
            .caption(&s.process, ("sans-serif", 18))
            .margin(10)
            .x_label_area_size(35)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..(len as f64 - 1.0), 0.0..pad(max_y))
            .map_err(|e| draw_err(NAME, e))?;

        let labels: Vec<String> = s.points.iter().map(|p| p.period.clone()).collect();
        chart
            .configure_mesh()
            .x_labels(len)
            .x_label_formatter(&|x| {
                labels
                    .get(x.round() as usize)
                    .cloned()
                    .unwrap_or_default()
            })
            .draw()
            .map_err(|e| draw_err(NAME, e))?;

        chart
            .draw_series(LineSeries::new(
                s.points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (i as f64, p.total as f64)),
                &BLUE,
            ))
            .map_err(|e| draw_err(NAME, e))?;
    }

    root.present().map_err(|e| draw_err(NAME, e))?;
    Ok(())
}
