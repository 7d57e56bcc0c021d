use sdxf_core::entity::Entity;
use sdxf_core::scene::{GeometryTable, NodeKind, SceneNode, Transform};
use sdxf_core::strategy::ConversionSettings;
use tracing::trace;

use crate::coordinator::CancellationToken;
use crate::errors::PipelineError;
use crate::extract::EntityExtractor;

/// 父子变换的合成：平移与旋转相加，缩放逐分量相乘。
///
/// 这是对真实矩阵合成的近似，父节点的旋转不会作用到子节点的平移上。
pub fn compose(parent: &Transform, local: &Transform) -> Transform {
    Transform {
        position: parent.position.add(local.position),
        rotation: parent.rotation.add(local.rotation),
        scale: parent.scale.mul_componentwise(local.scale),
    }
}

/// 深度优先遍历场景树，按访问顺序收集实体。
pub struct SceneTraverser<'a> {
    geometries: &'a GeometryTable,
    extractor: EntityExtractor<'a>,
    token: &'a CancellationToken,
}

impl<'a> SceneTraverser<'a> {
    pub fn new(
        geometries: &'a GeometryTable,
        settings: &'a ConversionSettings,
        token: &'a CancellationToken,
    ) -> Self {
        Self {
            geometries,
            extractor: EntityExtractor::new(settings, token),
            token,
        }
    }

    /// 以单位变换为父变换遍历根节点列表。
    pub fn collect(&self, roots: &[SceneNode]) -> Result<Vec<Entity>, PipelineError> {
        let mut entities = Vec::new();
        self.visit(roots, &Transform::IDENTITY, &mut entities)?;
        Ok(entities)
    }

    fn visit(
        &self,
        nodes: &[SceneNode],
        parent: &Transform,
        out: &mut Vec<Entity>,
    ) -> Result<(), PipelineError> {
        for node in nodes {
            self.token.check()?;
            let absolute = compose(parent, &node.transform);
            self.dispatch(node, &absolute, out)?;
            self.visit(&node.children, &absolute, out)?;
        }
        Ok(())
    }

    fn dispatch(
        &self,
        node: &SceneNode,
        transform: &Transform,
        out: &mut Vec<Entity>,
    ) -> Result<(), PipelineError> {
        let Some(id) = node.geometry.as_deref() else {
            return Ok(());
        };
        let Some(buffer) = self.geometries.get(id) else {
            trace!(geometry = id, "几何体引用未找到，跳过节点");
            return Ok(());
        };
        match node.kind {
            NodeKind::Mesh => self.extractor.extract_mesh(buffer, transform, out),
            NodeKind::LineSet => self.extractor.extract_line_set(buffer, transform, out),
            NodeKind::PointSet => self.extractor.extract_point_set(buffer, transform, out),
            NodeKind::Group => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdxf_core::geometry::{Point3, Vector3};
    use sdxf_core::scene::{GeometryBuffer, SceneGraph};
    use sdxf_core::strategy::{AdvancedOptions, ConversionStrategy};

    fn settings() -> ConversionSettings {
        ConversionSettings::resolve(&ConversionStrategy::default(), &AdvancedOptions::default())
    }

    fn graph() -> SceneGraph {
        let child = SceneNode::new(NodeKind::PointSet)
            .with_geometry("dot")
            .with_transform(Transform::new(
                Vector3::new(0.0, 5.0, 0.0),
                Vector3::ZERO,
                Vector3::new(3.0, 3.0, 3.0),
            ));
        let parent = SceneNode::group()
            .with_transform(Transform::new(
                Vector3::new(10.0, 0.0, 0.0),
                Vector3::ZERO,
                Vector3::new(2.0, 2.0, 2.0),
            ))
            .with_child(child);
        SceneGraph::new()
            .with_root(parent)
            .with_root(SceneNode::new(NodeKind::Mesh).with_geometry("missing"))
            .with_root(SceneNode::new(NodeKind::LineSet).with_geometry("edge"))
            .with_geometry("dot", GeometryBuffer::from_positions([1.0, 1.0, 1.0]))
            .with_geometry("edge", GeometryBuffer::from_positions([0.0, 0.0, 0.0, 1.0, 0.0, 0.0]))
    }

    #[test]
    fn composition_is_additive_for_position_and_rotation() {
        let parent = Transform::new(
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(0.1, 0.2, 0.3),
            Vector3::new(2.0, 2.0, 2.0),
        );
        let local = Transform::new(
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(0.1, 0.0, 0.0),
            Vector3::new(0.5, 3.0, 1.0),
        );
        let composed = compose(&parent, &local);
        assert_eq!(composed.position, Vector3::new(2.0, 3.0, 4.0));
        assert_eq!(composed.rotation, Vector3::new(0.2, 0.2, 0.3));
        assert_eq!(composed.scale, Vector3::new(1.0, 6.0, 2.0));
    }

    #[test]
    fn traversal_emits_in_depth_first_order_with_composed_transforms() {
        let graph = graph();
        let settings = settings();
        let token = CancellationToken::new();
        let entities = SceneTraverser::new(&graph.geometries, &settings, &token)
            .collect(&graph.roots)
            .unwrap();

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].type_tag(), "POINT");
        // 缩放 2×3 = 6，平移 10 + 0 与 0 + 5
        assert_eq!(entities[0].points(), vec![Point3::new(16.0, 11.0, 6.0)]);
        assert_eq!(entities[1].type_tag(), "LINE");
    }

    #[test]
    fn cancellation_is_observed_between_nodes() {
        let graph = graph();
        let settings = settings();
        let token = CancellationToken::new();
        token.cancel();
        let err = SceneTraverser::new(&graph.geometries, &settings, &token)
            .collect(&graph.roots)
            .unwrap_err();
        assert_eq!(err, PipelineError::Cancelled);
    }
}
