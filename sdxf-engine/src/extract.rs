use sdxf_core::entity::{Circle, Entity, Face, Line, PointEntity};
use sdxf_core::geometry::Point3;
use sdxf_core::scene::{GeometryBuffer, PrimitiveTag, Transform};
use sdxf_core::strategy::ConversionSettings;

use crate::coordinator::CancellationToken;
use crate::errors::PipelineError;
use crate::transform::{apply, round_to};

/// 把单个几何缓冲展开为实体，所有实体落在设置中的默认图层上。
pub struct EntityExtractor<'a> {
    settings: &'a ConversionSettings,
    token: &'a CancellationToken,
}

impl<'a> EntityExtractor<'a> {
    pub fn new(settings: &'a ConversionSettings, token: &'a CancellationToken) -> Self {
        Self { settings, token }
    }

    /// 网格：圆盘基本体 → 单个 CIRCLE；有索引 → 3DFACE；否则按顶点对生成 LINE。
    pub fn extract_mesh(
        &self,
        buffer: &GeometryBuffer,
        transform: &Transform,
        out: &mut Vec<Entity>,
    ) -> Result<(), PipelineError> {
        if let Some(PrimitiveTag::Disc { radius }) = buffer.primitive {
            return self.extract_disc(radius, transform, out);
        }
        match buffer.triangle_indices() {
            Some(indices) => self.extract_faces(buffer, indices, transform, out),
            None => self.extract_lines(&buffer.positions, transform, out),
        }
    }

    /// 线段集：忽略索引与基本体标记，直接按顶点对连线。
    pub fn extract_line_set(
        &self,
        buffer: &GeometryBuffer,
        transform: &Transform,
        out: &mut Vec<Entity>,
    ) -> Result<(), PipelineError> {
        self.extract_lines(&buffer.positions, transform, out)
    }

    pub fn extract_point_set(
        &self,
        buffer: &GeometryBuffer,
        transform: &Transform,
        out: &mut Vec<Entity>,
    ) -> Result<(), PipelineError> {
        for xyz in buffer.positions.chunks_exact(3) {
            self.token.check()?;
            let at = self.vertex(Point3::new(xyz[0], xyz[1], xyz[2]), transform, "POINT")?;
            out.push(Entity::Point(PointEntity {
                at,
                layer: self.layer(),
            }));
        }
        Ok(())
    }

    fn extract_disc(
        &self,
        radius: f64,
        transform: &Transform,
        out: &mut Vec<Entity>,
    ) -> Result<(), PipelineError> {
        self.token.check()?;
        let center = self.vertex(Point3::ORIGIN, transform, "CIRCLE")?;
        let radius = round_to(radius * transform.scale.x(), self.settings.precision_digits);
        if !radius.is_finite() {
            return Err(PipelineError::NonFinite { kind: "CIRCLE" });
        }
        out.push(Entity::Circle(Circle {
            center,
            radius,
            layer: self.layer(),
        }));
        Ok(())
    }

    fn extract_faces(
        &self,
        buffer: &GeometryBuffer,
        indices: &[u32],
        transform: &Transform,
        out: &mut Vec<Entity>,
    ) -> Result<(), PipelineError> {
        for triple in indices.chunks_exact(3) {
            self.token.check()?;
            let corners = (
                buffer.vertex(triple[0] as usize),
                buffer.vertex(triple[1] as usize),
                buffer.vertex(triple[2] as usize),
            );
            // 越界索引所在的三角形直接跳过
            let (Some(a), Some(b), Some(c)) = corners else {
                continue;
            };
            let a = self.vertex(a, transform, "3DFACE")?;
            let b = self.vertex(b, transform, "3DFACE")?;
            let c = self.vertex(c, transform, "3DFACE")?;
            out.push(Entity::Face(Face::triangle(a, b, c, self.layer())));
        }
        Ok(())
    }

    fn extract_lines(
        &self,
        positions: &[f64],
        transform: &Transform,
        out: &mut Vec<Entity>,
    ) -> Result<(), PipelineError> {
        for pair in positions.chunks_exact(6) {
            self.token.check()?;
            let start = self.vertex(Point3::new(pair[0], pair[1], pair[2]), transform, "LINE")?;
            let end = self.vertex(Point3::new(pair[3], pair[4], pair[5]), transform, "LINE")?;
            out.push(Entity::Line(Line {
                start,
                end,
                layer: self.layer(),
            }));
        }
        Ok(())
    }

    fn vertex(
        &self,
        local: Point3,
        transform: &Transform,
        kind: &'static str,
    ) -> Result<Point3, PipelineError> {
        let point = apply(
            local,
            transform,
            self.settings.precision_digits,
            self.settings.force_2d,
        );
        if point.is_finite() {
            Ok(point)
        } else {
            Err(PipelineError::NonFinite { kind })
        }
    }

    #[inline]
    fn layer(&self) -> String {
        self.settings.layer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdxf_core::geometry::Vector3;
    use sdxf_core::strategy::{AdvancedOptions, ConversionStrategy, StrategyPreset};

    fn settings(precision: u32, force_2d: bool, layer: &str) -> ConversionSettings {
        ConversionSettings::resolve(
            &ConversionStrategy::from(StrategyPreset::Balanced),
            &AdvancedOptions::new(precision, force_2d, layer),
        )
    }

    fn run(
        buffer: &GeometryBuffer,
        transform: &Transform,
        settings: &ConversionSettings,
    ) -> Result<Vec<Entity>, PipelineError> {
        let token = CancellationToken::new();
        let extractor = EntityExtractor::new(settings, &token);
        let mut out = Vec::new();
        extractor.extract_mesh(buffer, transform, &mut out)?;
        Ok(out)
    }

    #[test]
    fn indexed_triangle_becomes_one_face() {
        let buffer = GeometryBuffer::from_positions([0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
            .with_indices([0, 1, 2]);
        let entities = run(&buffer, &Transform::IDENTITY, &settings(4, false, "0")).unwrap();
        assert_eq!(entities.len(), 1);
        let Entity::Face(face) = &entities[0] else {
            panic!("expected a face, got {:?}", entities[0]);
        };
        assert!(face.is_triangle());
        assert_eq!(face.vertices[1], Point3::new(1.0, 0.0, 0.0));
        assert_eq!(face.vertices[2], face.vertices[3]);
    }

    #[test]
    fn out_of_range_triples_are_skipped() {
        let buffer = GeometryBuffer::from_positions([0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
            .with_indices([0, 1, 2, 0, 1, 9, 2, 1, 0, 4]);
        let entities = run(&buffer, &Transform::IDENTITY, &settings(4, false, "0")).unwrap();
        assert_eq!(entities.len(), 2);
        assert!(entities.iter().all(|entity| entity.type_tag() == "3DFACE"));
    }

    #[test]
    fn six_floats_without_indices_become_one_line() {
        let buffer = GeometryBuffer::from_positions([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let transform = Transform::from_position(Vector3::new(1.0, 1.0, 1.0));
        let entities = run(&buffer, &transform, &settings(4, false, "EDGES")).unwrap();
        assert_eq!(
            entities,
            vec![Entity::Line(Line {
                start: Point3::new(2.0, 3.0, 4.0),
                end: Point3::new(5.0, 6.0, 7.0),
                layer: "EDGES".to_string(),
            })]
        );
    }

    #[test]
    fn empty_index_list_falls_back_to_lines() {
        let buffer = GeometryBuffer::from_positions([0.0; 12]).with_indices(Vec::<u32>::new());
        let entities = run(&buffer, &Transform::IDENTITY, &settings(4, false, "0")).unwrap();
        assert_eq!(entities.len(), 2);
        assert!(entities.iter().all(|entity| entity.type_tag() == "LINE"));
    }

    #[test]
    fn disc_primitive_wins_over_indices() {
        let buffer = GeometryBuffer::from_positions([0.0; 9])
            .with_indices([0, 1, 2])
            .with_primitive(PrimitiveTag::Disc { radius: 2.5 });
        let transform = Transform::new(
            Vector3::new(1.0, 2.0, 0.0),
            Vector3::ZERO,
            Vector3::new(2.0, 7.0, 7.0),
        );
        let entities = run(&buffer, &transform, &settings(0, false, "L1")).unwrap();
        assert_eq!(
            entities,
            vec![Entity::Circle(Circle {
                center: Point3::new(1.0, 2.0, 0.0),
                radius: 5.0,
                layer: "L1".to_string(),
            })]
        );
    }

    #[test]
    fn point_set_drops_trailing_partial_vertex() {
        let settings = settings(2, true, "0");
        let token = CancellationToken::new();
        let extractor = EntityExtractor::new(&settings, &token);
        let buffer = GeometryBuffer::from_positions([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let mut out = Vec::new();
        extractor
            .extract_point_set(&buffer, &Transform::IDENTITY, &mut out)
            .unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().flat_map(Entity::points).all(|p| p.z() == 0.0));
    }

    #[test]
    fn line_set_ignores_indices() {
        let settings = settings(4, false, "0");
        let token = CancellationToken::new();
        let extractor = EntityExtractor::new(&settings, &token);
        let buffer = GeometryBuffer::from_positions([0.0; 6]).with_indices([0, 0, 0]);
        let mut out = Vec::new();
        extractor
            .extract_line_set(&buffer, &Transform::IDENTITY, &mut out)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].type_tag(), "LINE");
    }

    #[test]
    fn overflowing_transform_is_a_fault() {
        let buffer = GeometryBuffer::from_positions([1e300, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let transform = Transform::from_scale(Vector3::new(1e300, 1.0, 1.0));
        let err = run(&buffer, &transform, &settings(4, false, "0")).unwrap_err();
        assert_eq!(err, PipelineError::NonFinite { kind: "LINE" });
    }

    #[test]
    fn cancelled_token_stops_extraction() {
        let settings = settings(4, false, "0");
        let token = CancellationToken::new();
        token.cancel();
        let extractor = EntityExtractor::new(&settings, &token);
        let mut out = Vec::new();
        let err = extractor
            .extract_mesh(
                &GeometryBuffer::from_positions([0.0; 6]),
                &Transform::IDENTITY,
                &mut out,
            )
            .unwrap_err();
        assert_eq!(err, PipelineError::Cancelled);
        assert!(out.is_empty());
    }
}
