// SVG charts for the digest: task status pie and burndown line

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::NaiveDate;

use crate::project_log::LogEntry;
use crate::store::TaskStatus;

const PIE_WIDTH: f64 = 480.0;
const PIE_HEIGHT: f64 = 320.0;
const LINE_WIDTH: f64 = 640.0;
const LINE_HEIGHT: f64 = 360.0;
const MARGIN: f64 = 50.0;

fn status_color(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "lightblue",
        TaskStatus::Backlog => "thistle",
        TaskStatus::InProgress => "orange",
        TaskStatus::Blocked => "salmon",
        TaskStatus::Done => "lightgreen",
    }
}

fn svg_open(out: &mut String, width: f64, height: f64) {
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="Helvetica, Arial, sans-serif">"#,
        w = width,
        h = height
    );
    let _ = write!(out, r#"<rect width="{}" height="{}" fill="white"/>"#, width, height);
}

/// Pie chart of task counts per status; empty input draws a grey "No Data" disc
pub fn status_pie_svg(counts: &BTreeMap<TaskStatus, usize>) -> String {
    let total: usize = counts.values().sum();
    let (cx, cy, r) = (160.0, 175.0, 120.0);

    let mut out = String::new();
    svg_open(&mut out, PIE_WIDTH, PIE_HEIGHT);
    let _ = write!(
        out,
        r#"<text x="{}" y="28" font-size="18" text-anchor="middle">Task Status Distribution</text>"#,
        PIE_WIDTH / 2.0
    );

    if total == 0 {
        let _ = write!(out, r#"<circle cx="{cx}" cy="{cy}" r="{r}" fill="lightgray"/>"#);
        let _ = write!(
            out,
            r#"<text x="{cx}" y="{cy}" font-size="14" text-anchor="middle">No Data</text>"#
        );
        out.push_str("</svg>");
        return out;
    }

    let slices: Vec<(TaskStatus, usize)> = counts
        .iter()
        .filter(|(_, n)| **n > 0)
        .map(|(s, n)| (*s, *n))
        .collect();

    // Start at twelve o'clock and go clockwise
    let mut angle = -std::f64::consts::FRAC_PI_2;
    for (status, count) in &slices {
        let fraction = *count as f64 / total as f64;
        if slices.len() == 1 {
            let _ = write!(
                out,
                r#"<circle cx="{cx}" cy="{cy}" r="{r}" fill="{}" stroke="white"/>"#,
                status_color(*status)
            );
            break;
        }

        let sweep = fraction * std::f64::consts::TAU;
        let (x0, y0) = (cx + r * angle.cos(), cy + r * angle.sin());
        let end = angle + sweep;
        let (x1, y1) = (cx + r * end.cos(), cy + r * end.sin());
        let large_arc = if sweep > std::f64::consts::PI { 1 } else { 0 };
        let _ = write!(
            out,
            r#"<path d="M {cx:.2} {cy:.2} L {x0:.2} {y0:.2} A {r:.2} {r:.2} 0 {large_arc} 1 {x1:.2} {y1:.2} Z" fill="{}" stroke="white"/>"#,
            status_color(*status)
        );
        angle = end;
    }

    // Legend
    for (i, (status, count)) in slices.iter().enumerate() {
        let y = 80.0 + i as f64 * 26.0;
        let percent = *count as f64 / total as f64 * 100.0;
        let _ = write!(
            out,
            r#"<rect x="310" y="{:.0}" width="14" height="14" fill="{}"/><text x="332" y="{:.0}" font-size="13">{} {} ({:.1}%)</text>"#,
            y - 11.0,
            status_color(*status),
            y,
            status,
            count,
            percent
        );
    }

    out.push_str("</svg>");
    out
}

/// Remaining-work series over a date window
#[derive(Debug, Clone, PartialEq)]
pub struct Burndown {
    pub days: Vec<NaiveDate>,
    /// Tasks left at the end of each day; empty when there is no completion data
    pub remaining: Vec<usize>,
    /// Straight line from `total` on the first day to zero on the last
    pub ideal: Vec<f64>,
    pub total: usize,
}

impl Burndown {
    pub fn has_data(&self) -> bool {
        !self.remaining.is_empty()
    }
}

fn is_completion(entry: &LogEntry) -> bool {
    let message = entry.message.to_lowercase();
    message.contains("completed") || message.contains("done")
}

/// Count completion events per day between `start` and `end` (inclusive)
pub fn burndown_series(
    entries: &[LogEntry],
    total: usize,
    start: NaiveDate,
    end: NaiveDate,
) -> Burndown {
    let (start, end) = if start <= end { (start, end) } else { (end, start) };
    let days: Vec<NaiveDate> = start.iter_days().take_while(|d| *d <= end).collect();

    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for entry in entries.iter().filter(|e| is_completion(e)) {
        if let Some(day) = entry.day() {
            if day >= start && day <= end {
                *per_day.entry(day).or_insert(0) += 1;
            }
        }
    }

    let span = days.len().saturating_sub(1).max(1) as f64;
    let ideal = (0..days.len())
        .map(|i| total as f64 * (1.0 - i as f64 / span))
        .collect();

    let remaining = if per_day.is_empty() {
        Vec::new()
    } else {
        let mut left = total;
        days.iter()
            .map(|day| {
                left = left.saturating_sub(per_day.get(day).copied().unwrap_or(0));
                left
            })
            .collect()
    };

    Burndown {
        days,
        remaining,
        ideal,
        total,
    }
}

/// Line chart of a burndown series; ideal line dashed, actual solid
pub fn burndown_svg(burndown: &Burndown) -> String {
    let plot_w = LINE_WIDTH - 2.0 * MARGIN;
    let plot_h = LINE_HEIGHT - 2.0 * MARGIN;
    let max_y = burndown.total.max(1) as f64;
    let steps = burndown.days.len().saturating_sub(1).max(1) as f64;

    let x_at = |i: usize| MARGIN + plot_w * i as f64 / steps;
    let y_at = |v: f64| MARGIN + plot_h * (1.0 - v / max_y);

    let mut out = String::new();
    svg_open(&mut out, LINE_WIDTH, LINE_HEIGHT);

    let title = if burndown.has_data() {
        "Project Burndown Chart"
    } else {
        "Project Burndown Chart (no completion data)"
    };
    let _ = write!(
        out,
        r#"<text x="{}" y="28" font-size="18" text-anchor="middle">{}</text>"#,
        LINE_WIDTH / 2.0,
        title
    );

    // Axes
    let _ = write!(
        out,
        r#"<line x1="{m}" y1="{m}" x2="{m}" y2="{b}" stroke="black"/><line x1="{m}" y1="{b}" x2="{r}" y2="{b}" stroke="black"/>"#,
        m = MARGIN,
        b = MARGIN + plot_h,
        r = MARGIN + plot_w
    );
    let _ = write!(
        out,
        r#"<text x="{}" y="{}" font-size="12" text-anchor="end">{}</text><text x="{}" y="{}" font-size="12" text-anchor="end">0</text>"#,
        MARGIN - 6.0,
        MARGIN + 4.0,
        burndown.total,
        MARGIN - 6.0,
        MARGIN + plot_h + 4.0
    );

    // Label at most ~8 days to keep the axis readable
    let label_every = burndown.days.len().div_ceil(8).max(1);
    for (i, day) in burndown.days.iter().enumerate() {
        if i % label_every == 0 || i + 1 == burndown.days.len() {
            let _ = write!(
                out,
                r#"<text x="{:.2}" y="{:.2}" font-size="11" text-anchor="middle">{}</text>"#,
                x_at(i),
                MARGIN + plot_h + 18.0,
                day.format("%m-%d")
            );
        }
    }

    let points = |values: &mut dyn Iterator<Item = f64>| {
        values
            .enumerate()
            .map(|(i, v)| format!("{:.2},{:.2}", x_at(i), y_at(v)))
            .collect::<Vec<_>>()
            .join(" ")
    };

    let ideal = points(&mut burndown.ideal.iter().copied());
    let _ = write!(
        out,
        r#"<polyline points="{}" fill="none" stroke="red" stroke-dasharray="6 4"/>"#,
        ideal
    );

    if burndown.has_data() {
        let actual = points(&mut burndown.remaining.iter().map(|v| *v as f64));
        let _ = write!(
            out,
            r#"<polyline points="{}" fill="none" stroke="blue" stroke-width="2"/>"#,
            actual
        );
    }

    out.push_str("</svg>");
    out
}
