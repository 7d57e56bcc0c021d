use std::fmt::Write;
use std::path::Path;

use sdxf_io::DxfSummary;

const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];

/// 人类可读的文件大小，如 `1.5 KiB`。
pub fn human_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// 转换完成后打印到标准输出的报告。
pub fn render_report(path: &Path, bytes: u64, summary: &DxfSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "已写入 {}（{}）", path.display(), human_size(bytes));
    let _ = writeln!(
        out,
        "版本: {}",
        summary.version.as_deref().unwrap_or("未知")
    );
    if summary.has_layer_table {
        let names: Vec<&str> = summary.layers.iter().map(|layer| layer.name.as_str()).collect();
        let _ = writeln!(out, "图层: {}", names.join(", "));
    } else {
        let _ = writeln!(out, "图层: 无图层表");
    }
    let _ = writeln!(out, "实体总数: {}", summary.entity_total());
    for (tag, count) in &summary.entity_counts {
        let _ = writeln!(out, "  {tag}: {count}");
    }
    out
}
