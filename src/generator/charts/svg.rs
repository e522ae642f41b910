//! 极简SVG渲染：折线图、柱状图、时间轴

use std::fmt::Write;

use crate::generator::charts::ChartError;

const WIDTH: f64 = 720.0;
const HEIGHT: f64 = 420.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 70.0;
const PALETTE: [&str; 6] = ["#2E86AB", "#F18F01", "#C73E1D", "#3B1F2B", "#6A994E", "#8E7DBE"];

pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

fn check_values(values: impl Iterator<Item = f64>) -> Result<f64, ChartError> {
    let mut max = 0.0_f64;
    for value in values {
        if !value.is_finite() || value < 0.0 {
            return Err(ChartError::InvalidData(format!(
                "value {} cannot be plotted",
                value
            )));
        }
        max = max.max(value);
    }
    Ok(if max == 0.0 { 1.0 } else { max })
}

fn open_document(out: &mut String, title: &str) {
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="Helvetica, Arial, sans-serif">"#,
        w = WIDTH,
        h = HEIGHT
    );
    let _ = writeln!(out, r##"<rect width="100%" height="100%" fill="#ffffff"/>"##);
    let _ = writeln!(
        out,
        r##"<text x="{}" y="32" font-size="18" font-weight="bold" text-anchor="middle" fill="#222">{}</text>"##,
        WIDTH / 2.0,
        escape(title)
    );
}

fn axes(out: &mut String) {
    let bottom = HEIGHT - MARGIN_BOTTOM;
    let right = WIDTH - MARGIN_RIGHT;
    let _ = writeln!(
        out,
        r##"<line x1="{l}" y1="{t}" x2="{l}" y2="{b}" stroke="#444"/><line x1="{l}" y1="{b}" x2="{r}" y2="{b}" stroke="#444"/>"##,
        l = MARGIN_LEFT,
        t = MARGIN_TOP,
        b = bottom,
        r = right
    );
}

fn plot_height() -> f64 {
    HEIGHT - MARGIN_TOP - MARGIN_BOTTOM
}

fn plot_width() -> f64 {
    WIDTH - MARGIN_LEFT - MARGIN_RIGHT
}

/// 折线图，点按给定顺序连接
pub fn line_chart(title: &str, points: &[(String, f64)]) -> Result<String, ChartError> {
    let max = check_values(points.iter().map(|(_, v)| *v))?;
    let step = plot_width() / points.len().max(1) as f64;
    let bottom = HEIGHT - MARGIN_BOTTOM;

    let coords: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, (_, value))| {
            let x = MARGIN_LEFT + step * (i as f64 + 0.5);
            let y = bottom - value / max * plot_height();
            (x, y)
        })
        .collect();

    let mut out = String::new();
    open_document(&mut out, title);
    axes(&mut out);

    let path: Vec<String> = coords
        .iter()
        .map(|(x, y)| format!("{:.1},{:.1}", x, y))
        .collect();
    let _ = writeln!(
        out,
        r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="3"/>"#,
        path.join(" "),
        PALETTE[0]
    );

    for ((label, value), (x, y)) in points.iter().zip(&coords) {
        let _ = writeln!(
            out,
            r#"<circle cx="{x:.1}" cy="{y:.1}" r="5" fill="{}"/>"#,
            PALETTE[0]
        );
        let _ = writeln!(
            out,
            r##"<text x="{x:.1}" y="{:.1}" font-size="12" text-anchor="middle" fill="#222">{}</text>"##,
            y - 10.0,
            format_value(*value)
        );
        let _ = writeln!(
            out,
            r##"<text x="{x:.1}" y="{:.1}" font-size="12" text-anchor="middle" fill="#444">{}</text>"##,
            bottom + 20.0,
            escape(label)
        );
    }

    out.push_str("</svg>\n");
    Ok(out)
}

/// 柱状图，`unit` 附加在数值标签后，例如 `%`
pub fn bar_chart(title: &str, bars: &[(String, f64)], unit: &str) -> Result<String, ChartError> {
    let max = check_values(bars.iter().map(|(_, v)| *v))?;
    let slot = plot_width() / bars.len().max(1) as f64;
    let bar_width = slot * 0.6;
    let bottom = HEIGHT - MARGIN_BOTTOM;

    let mut out = String::new();
    open_document(&mut out, title);
    axes(&mut out);

    for (i, (label, value)) in bars.iter().enumerate() {
        let height = value / max * plot_height();
        let x = MARGIN_LEFT + slot * i as f64 + (slot - bar_width) / 2.0;
        let center = x + bar_width / 2.0;
        let _ = writeln!(
            out,
            r#"<rect x="{x:.1}" y="{:.1}" width="{bar_width:.1}" height="{height:.1}" fill="{}"/>"#,
            bottom - height,
            PALETTE[i % PALETTE.len()]
        );
        let _ = writeln!(
            out,
            r##"<text x="{center:.1}" y="{:.1}" font-size="12" text-anchor="middle" fill="#222">{}{}</text>"##,
            bottom - height - 8.0,
            format_value(*value),
            escape(unit)
        );
        let _ = writeln!(
            out,
            r##"<text x="{center:.1}" y="{:.1}" font-size="12" text-anchor="middle" fill="#444">{}</text>"##,
            bottom + 20.0,
            escape(label)
        );
    }

    out.push_str("</svg>\n");
    Ok(out)
}

/// 水平时间轴，每个里程碑一个节点
pub fn timeline(title: &str, milestones: &[(u16, String)]) -> Result<String, ChartError> {
    if milestones.is_empty() {
        return Err(ChartError::InvalidData("timeline needs milestones".to_string()));
    }

    let axis_y = HEIGHT / 2.0;
    let step = plot_width() / milestones.len() as f64;

    let mut out = String::new();
    open_document(&mut out, title);
    let _ = writeln!(
        out,
        r##"<line x1="{}" y1="{axis_y}" x2="{}" y2="{axis_y}" stroke="#444" stroke-width="2" stroke-dasharray="6 4"/>"##,
        MARGIN_LEFT,
        WIDTH - MARGIN_RIGHT
    );

    for (i, (year, label)) in milestones.iter().enumerate() {
        let x = MARGIN_LEFT + step * (i as f64 + 0.5);
        // 标签上下交替，避免重叠
        let label_y = if i % 2 == 0 { axis_y - 40.0 } else { axis_y + 55.0 };
        let _ = writeln!(
            out,
            r#"<circle cx="{x:.1}" cy="{axis_y}" r="9" fill="{}"/>"#,
            PALETTE[i % PALETTE.len()]
        );
        let _ = writeln!(
            out,
            r##"<text x="{x:.1}" y="{:.1}" font-size="14" font-weight="bold" text-anchor="middle" fill="#222">Phase {} · {}</text>"##,
            label_y,
            i + 1,
            year
        );
        let _ = writeln!(
            out,
            r##"<text x="{x:.1}" y="{:.1}" font-size="11" text-anchor="middle" fill="#444">{}</text>"##,
            label_y + 16.0,
            escape(label)
        );
    }

    out.push_str("</svg>\n");
    Ok(out)
}
