//! Terminal rendering of catalog listings and query views: ASCII table plus a
//! text chart drawn with block characters, both fitted to the terminal width.

use terminal_size::{terminal_size, Height, Width};

use crate::catalog::{CatalogEntry, CatalogGroups};
use crate::view::QueryView;
use crate::visual::{BarChart, Chart, PieChart, VisualView};

const BAR_CHAR: char = '█';

pub fn get_terminal_width() -> usize {
    if let Some((Width(w), Height(_h))) = terminal_size() {
        return (w as usize).saturating_sub(4).max(20);
    }
    80
}

/// Both catalog groups, numbered from 1 within each group.
pub fn format_catalog(groups: &CatalogGroups) -> String {
    let mut out = String::new();
    push_group(&mut out, "VISUALIZED", &groups.visualized);
    out.push('\n');
    push_group(&mut out, "DATA", &groups.data_only);
    out
}

fn push_group(out: &mut String, title: &str, entries: &[&'static CatalogEntry]) {
    out.push_str(title);
    out.push('\n');
    for (n, e) in entries.iter().enumerate() {
        out.push_str(&format!("  {:>2}. [id {:>2}] {}\n", n + 1, e.id.get(), e.question));
    }
}

pub fn format_view(view: &QueryView, width: usize) -> String {
    let mut out = format!("Q{}: {}\n", view.entry.id, view.entry.question);
    match &view.visual {
        VisualView::TableOnly => {}
        VisualView::Chart { chart, .. } => {
            out.push('\n');
            out.push_str(&format_chart(chart, width));
        }
        VisualView::NoData { reason, .. } => {
            out.push_str(&format!("\n[chart] no data ({})\n", reason));
        }
    }
    out.push('\n');
    out.push_str(&view.table.to_ascii(width));
    out.push('\n');
    out
}

pub fn format_chart(chart: &Chart, width: usize) -> String {
    match chart {
        Chart::Bar(bar) => format_bar(bar, width),
        Chart::Pies(group) => group.pies.iter().map(|p| format_pie(p, width)).collect::<Vec<_>>().join("\n"),
    }
}

fn format_bar(bar: &BarChart, width: usize) -> String {
    let mut out = format!("{}\n", bar.title);
    if let Some(axis) = &bar.value_axis {
        out.push_str(&format!("({})\n", axis));
    }
    let max = bar
        .datasets
        .iter()
        .flat_map(|d| d.values.iter().copied())
        .fold(0.0_f64, f64::max);
    let label_w = bar.labels.iter().map(|l| l.chars().count()).max().unwrap_or(0).min(width / 3);
    for ds in &bar.datasets {
        if bar.datasets.len() > 1 {
            out.push_str(&format!("  {}\n", ds.label));
        }
        let lines: Vec<(String, f64)> = bar.labels.iter().cloned().zip(ds.values.iter().copied()).collect();
        out.push_str(&bar_lines(&lines, label_w, max, width));
    }
    out
}

fn format_pie(pie: &PieChart, width: usize) -> String {
    let mut out = format!("{}\n", pie.title);
    let total: f64 = pie.values.iter().sum();
    let unit = pie.unit.as_deref().unwrap_or("");
    let label_w = pie.labels.iter().map(|l| l.chars().count()).max().unwrap_or(0).min(width / 3);
    // scale by share of the pie so slices are comparable across pies
    let shares: Vec<(String, f64)> = pie
        .labels
        .iter()
        .cloned()
        .zip(pie.values.iter().map(|v| if total > 0.0 { v / total * 100.0 } else { 0.0 }))
        .collect();
    for ((label, share), value) in shares.iter().zip(pie.values.iter()) {
        let bar_w = width.saturating_sub(label_w + 24);
        let filled = ((share / 100.0) * bar_w as f64).round() as usize;
        out.push_str(&format!(
            "  {:<lw$} {} {}{} ({:.1}%)\n",
            clip(label, label_w),
            BAR_CHAR.to_string().repeat(filled),
            format_number(*value),
            unit,
            share,
            lw = label_w
        ));
    }
    out
}

fn bar_lines(lines: &[(String, f64)], label_w: usize, max: f64, width: usize) -> String {
    let mut out = String::new();
    let bar_w = width.saturating_sub(label_w + 16);
    for (label, v) in lines {
        let filled = if max > 0.0 { ((v / max) * bar_w as f64).round().max(0.0) as usize } else { 0 };
        out.push_str(&format!(
            "  {:<lw$} {} {}\n",
            clip(label, label_w),
            BAR_CHAR.to_string().repeat(filled),
            format_number(*v),
            lw = label_w
        ));
    }
    out
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 { format!("{}", v as i64) } else { format!("{:.2}", v) }
}
