use std::collections::BTreeSet;
use std::fmt::{Display, Write};

use sdxf_core::entity::Entity;
use sdxf_core::geometry::Point3;
use sdxf_core::strategy::ConversionStrategy;
use tracing::debug;

use crate::DrawingEncoder;

/// ASCII DXF 编码器：HEADER、（非 R12 时）图层表、ENTITIES、EOF。
#[derive(Debug, Default, Clone, Copy)]
pub struct DxfEncoder;

impl DxfEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl DrawingEncoder for DxfEncoder {
    fn encode(&self, entities: &[Entity], strategy: &ConversionStrategy) -> String {
        let version = strategy.format_version;
        let mut writer = GroupWriter::with_capacity(256 + entities.len() * 128);

        writer.begin_section("HEADER");
        writer.pair(9, "$ACADVER");
        writer.pair(1, version);
        writer.end_section();

        if !version.is_legacy() {
            let layers: BTreeSet<&str> = entities.iter().map(Entity::layer_name).collect();
            writer.layer_table(&layers);
            debug!(layers = layers.len(), "已写入图层表");
        }

        writer.begin_section("ENTITIES");
        for entity in entities {
            writer.entity(entity);
        }
        writer.end_section();

        debug!(
            entities = entities.len(),
            version = %version,
            "DXF 编码完成"
        );
        writer.finish()
    }
}

/// 图层表颜色：`(序号 × 7 + 1) mod 256`。
#[inline]
pub fn layer_color(ordinal: usize) -> usize {
    (ordinal * 7 + 1) % 256
}

/// 数值的文本形式：最短可往返表示，`-0` 写作 `0`。
pub fn format_real(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}

struct GroupWriter {
    out: String,
}

impl GroupWriter {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity),
        }
    }

    fn pair(&mut self, code: i32, value: impl Display) {
        // 写入 String 不会失败。
        let _ = write!(self.out, "{code}\n{value}\n");
    }

    fn real(&mut self, code: i32, value: f64) {
        self.pair(code, format_real(value));
    }

    /// 以 `base`、`base + 10`、`base + 20` 写出 X/Y/Z。
    fn point(&mut self, base: i32, point: Point3) {
        self.real(base, point.x());
        self.real(base + 10, point.y());
        self.real(base + 20, point.z());
    }

    fn begin_section(&mut self, name: &str) {
        self.pair(0, "SECTION");
        self.pair(2, name);
    }

    fn end_section(&mut self) {
        self.pair(0, "ENDSEC");
    }

    fn layer_table(&mut self, layers: &BTreeSet<&str>) {
        self.begin_section("TABLES");
        self.pair(0, "TABLE");
        self.pair(2, "LAYER");
        for (ordinal, layer) in layers.iter().enumerate() {
            self.pair(0, "LAYER");
            self.pair(2, layer);
            self.pair(70, 0);
            self.pair(62, layer_color(ordinal));
        }
        self.pair(0, "ENDTAB");
        self.end_section();
    }

    fn entity(&mut self, entity: &Entity) {
        self.pair(0, entity.type_tag());
        self.pair(8, entity.layer_name());
        match entity {
            Entity::Line(line) => {
                self.point(10, line.start);
                self.point(11, line.end);
            }
            Entity::Face(face) => {
                for (offset, vertex) in (0..).zip(face.vertices) {
                    self.point(10 + offset, vertex);
                }
            }
            Entity::Circle(circle) => {
                self.point(10, circle.center);
                self.real(40, circle.radius);
            }
            Entity::Arc(arc) => {
                self.point(10, arc.center);
                self.real(40, arc.radius);
                self.real(50, arc.start_angle_deg);
                self.real(51, arc.end_angle_deg);
            }
            Entity::Point(point) => {
                self.point(10, point.at);
            }
        }
    }

    fn finish(mut self) -> String {
        self.out.push_str("0\nEOF");
        self.out
    }
}
