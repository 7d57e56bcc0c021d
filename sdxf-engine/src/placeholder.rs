use rand::Rng;
use sdxf_core::entity::{Arc, Circle, Entity, Face, Line, PointEntity};
use sdxf_core::geometry::Point3;
use sdxf_core::strategy::ConversionSettings;

use crate::coordinator::CancellationToken;
use crate::errors::PipelineError;
use crate::transform::round_to;

pub const MAX_PLACEHOLDER_ENTITIES: usize = 500;

const COORDINATE_SPAN: f64 = 100.0;
const MIN_RADIUS: f64 = 1.0;
const MAX_RADIUS: f64 = 11.0;
const FULL_TURN_DEG: f64 = 360.0;
const MIN_SWEEP_DEG: f64 = 30.0;
const MAX_SWEEP_DEG: f64 = 210.0;

/// 占位实体数量：`min(500, floor(1000 × (1 − s)))`。
pub fn placeholder_count(simplify_factor: f64) -> usize {
    let raw = (1000.0 * (1.0 - simplify_factor)).floor();
    if raw.is_nan() || raw <= 0.0 {
        return 0;
    }
    (raw as usize).min(MAX_PLACEHOLDER_ENTITIES)
}

/// 场景未产出任何实体时生成随机占位实体，随机源由调用方注入。
pub struct PlaceholderGenerator<'a> {
    settings: &'a ConversionSettings,
    token: &'a CancellationToken,
}

impl<'a> PlaceholderGenerator<'a> {
    pub fn new(settings: &'a ConversionSettings, token: &'a CancellationToken) -> Self {
        Self { settings, token }
    }

    pub fn generate<R: Rng>(
        &self,
        simplify_factor: f64,
        rng: &mut R,
    ) -> Result<Vec<Entity>, PipelineError> {
        let count = placeholder_count(simplify_factor);
        let mut entities = Vec::with_capacity(count);
        for _ in 0..count {
            self.token.check()?;
            entities.push(self.random_entity(rng));
        }
        Ok(entities)
    }

    fn random_entity<R: Rng>(&self, rng: &mut R) -> Entity {
        let layer = self.settings.layer.clone();
        match rng.random_range(0..5u8) {
            0 => Entity::Line(Line {
                start: self.random_point(rng),
                end: self.random_point(rng),
                layer,
            }),
            1 => Entity::Face(Face {
                vertices: [
                    self.random_point(rng),
                    self.random_point(rng),
                    self.random_point(rng),
                    self.random_point(rng),
                ],
                layer,
            }),
            2 => Entity::Circle(Circle {
                center: self.random_point(rng),
                radius: self.random_radius(rng),
                layer,
            }),
            3 => {
                let precision = self.settings.precision_digits;
                // 取整可能把 359.99… 进到 360，折回 0
                let start =
                    round_to(rng.random_range(0.0..FULL_TURN_DEG), precision) % FULL_TURN_DEG;
                let end = round_to(
                    start + rng.random_range(MIN_SWEEP_DEG..MAX_SWEEP_DEG),
                    precision,
                );
                let center = self.random_point(rng);
                let radius = self.random_radius(rng);
                Entity::Arc(Arc {
                    center,
                    radius,
                    start_angle_deg: start,
                    end_angle_deg: end,
                    layer,
                })
            }
            _ => Entity::Point(PointEntity {
                at: self.random_point(rng),
                layer,
            }),
        }
    }

    fn random_point<R: Rng>(&self, rng: &mut R) -> Point3 {
        let x = self.coordinate(rng);
        let y = self.coordinate(rng);
        let z = if self.settings.force_2d {
            0.0
        } else {
            self.coordinate(rng)
        };
        Point3::new(x, y, z)
    }

    #[inline]
    fn coordinate<R: Rng>(&self, rng: &mut R) -> f64 {
        round_to(
            rng.random_range(0.0..COORDINATE_SPAN),
            self.settings.precision_digits,
        )
    }

    #[inline]
    fn random_radius<R: Rng>(&self, rng: &mut R) -> f64 {
        round_to(
            rng.random_range(MIN_RADIUS..MAX_RADIUS),
            self.settings.precision_digits,
        )
    }
}
