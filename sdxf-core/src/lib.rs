pub mod geometry {
    use glam::DVec3;
    use serde::{Deserialize, Serialize};

    /// 三维点，内部以 `glam::DVec3` 表示，所有输出实体的坐标均使用该类型。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        pub const ORIGIN: Point3 = Point3(DVec3::ZERO);

        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }

        /// 三个分量是否均为有限值（非 NaN、非无穷）。
        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }
    }

    impl From<DVec3> for Point3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    /// 三维向量，用于描述变换中的平移、欧拉角与缩放。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector3(pub DVec3);

    impl Vector3 {
        pub const ZERO: Vector3 = Vector3(DVec3::ZERO);
        pub const ONE: Vector3 = Vector3(DVec3::ONE);

        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }

        /// 分量相加。
        #[inline]
        pub fn add(self, other: Vector3) -> Vector3 {
            Self(self.0 + other.0)
        }

        /// 分量相乘（非点积）。
        #[inline]
        pub fn mul_componentwise(self, other: Vector3) -> Vector3 {
            Self(self.0 * other.0)
        }
    }

    impl From<DVec3> for Vector3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }
}

pub mod scene {
    use std::collections::HashMap;

    use serde::{Deserialize, Serialize};

    use crate::geometry::{Point3, Vector3};

    /// 节点的局部或绝对变换：平移、欧拉角（弧度，X→Y→Z 依次作用）与缩放。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Transform {
        pub position: Vector3,
        pub rotation: Vector3,
        pub scale: Vector3,
    }

    impl Transform {
        pub const IDENTITY: Transform = Transform {
            position: Vector3::ZERO,
            rotation: Vector3::ZERO,
            scale: Vector3::ONE,
        };

        #[inline]
        pub fn new(position: Vector3, rotation: Vector3, scale: Vector3) -> Self {
            Self {
                position,
                rotation,
                scale,
            }
        }

        #[inline]
        pub fn identity() -> Self {
            Self::IDENTITY
        }

        pub fn from_position(position: Vector3) -> Self {
            Self {
                position,
                ..Self::IDENTITY
            }
        }

        pub fn from_rotation(rotation: Vector3) -> Self {
            Self {
                rotation,
                ..Self::IDENTITY
            }
        }

        pub fn from_scale(scale: Vector3) -> Self {
            Self {
                scale,
                ..Self::IDENTITY
            }
        }
    }

    impl Default for Transform {
        fn default() -> Self {
            Self::IDENTITY
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum NodeKind {
        Mesh,
        LineSet,
        PointSet,
        Group,
    }

    /// 场景树中的一个节点。几何体通过标识符引用共享的 [`GeometryTable`]。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SceneNode {
        pub kind: NodeKind,
        pub geometry: Option<String>,
        pub transform: Transform,
        pub children: Vec<SceneNode>,
    }

    impl SceneNode {
        pub fn new(kind: NodeKind) -> Self {
            Self {
                kind,
                geometry: None,
                transform: Transform::IDENTITY,
                children: Vec::new(),
            }
        }

        pub fn group() -> Self {
            Self::new(NodeKind::Group)
        }

        pub fn with_geometry(mut self, id: impl Into<String>) -> Self {
            self.geometry = Some(id.into());
            self
        }

        pub fn with_transform(mut self, transform: Transform) -> Self {
            self.transform = transform;
            self
        }

        pub fn with_child(mut self, child: SceneNode) -> Self {
            self.children.push(child);
            self
        }

        /// 以自身为根统计节点总数（含自身）。
        pub fn subtree_len(&self) -> usize {
            1 + self
                .children
                .iter()
                .map(SceneNode::subtree_len)
                .sum::<usize>()
        }
    }

    /// 几何体上的基本体标记。目前仅识别圆盘（导出为 CIRCLE）。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub enum PrimitiveTag {
        Disc { radius: f64 },
    }

    /// 扁平几何缓冲：位置按三元组组成顶点，可选索引按三元组组成三角形。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct GeometryBuffer {
        pub positions: Vec<f64>,
        pub indices: Option<Vec<u32>>,
        pub primitive: Option<PrimitiveTag>,
    }

    impl GeometryBuffer {
        pub fn from_positions(positions: impl Into<Vec<f64>>) -> Self {
            Self {
                positions: positions.into(),
                indices: None,
                primitive: None,
            }
        }

        pub fn with_indices(mut self, indices: impl Into<Vec<u32>>) -> Self {
            self.indices = Some(indices.into());
            self
        }

        pub fn with_primitive(mut self, primitive: PrimitiveTag) -> Self {
            self.primitive = Some(primitive);
            self
        }

        /// 完整顶点数量，末尾不足三个分量的数据不计入。
        #[inline]
        pub fn vertex_count(&self) -> usize {
            self.positions.len() / 3
        }

        /// 按顶点序号读取位置；越界时返回 `None`。
        pub fn vertex(&self, index: usize) -> Option<Point3> {
            let base = index.checked_mul(3)?;
            let coords = self.positions.get(base..base.checked_add(3)?)?;
            Some(Point3::new(coords[0], coords[1], coords[2]))
        }

        /// 非空索引列表。空列表视为不存在。
        pub fn triangle_indices(&self) -> Option<&[u32]> {
            self.indices
                .as_deref()
                .filter(|indices| !indices.is_empty())
        }
    }

    /// 几何体表，按标识符查找。同一标识符只保留最先登记的条目。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct GeometryTable {
        entries: HashMap<String, GeometryBuffer>,
    }

    impl GeometryTable {
        pub fn new() -> Self {
            Self::default()
        }

        /// 登记几何体，若标识符已存在则忽略并返回 `false`。
        pub fn insert(&mut self, id: impl Into<String>, buffer: GeometryBuffer) -> bool {
            let id = id.into();
            if self.entries.contains_key(&id) {
                return false;
            }
            self.entries.insert(id, buffer);
            true
        }

        #[inline]
        pub fn get(&self, id: &str) -> Option<&GeometryBuffer> {
            self.entries.get(id)
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.entries.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.entries.is_empty()
        }
    }

    /// 已解释的场景图：根节点的子节点列表与共享几何体表。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct SceneGraph {
        pub roots: Vec<SceneNode>,
        pub geometries: GeometryTable,
    }

    impl SceneGraph {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_root(mut self, node: SceneNode) -> Self {
            self.roots.push(node);
            self
        }

        pub fn with_geometry(mut self, id: impl Into<String>, buffer: GeometryBuffer) -> Self {
            self.geometries.insert(id, buffer);
            self
        }

        pub fn node_count(&self) -> usize {
            self.roots.iter().map(SceneNode::subtree_len).sum()
        }
    }

    /// 转换输入：要么是可遍历的场景图，要么是无法识别的文档（走占位路径）。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum SceneInput {
        Scene(SceneGraph),
        Unrecognized,
    }

    impl SceneInput {
        #[inline]
        pub fn as_scene(&self) -> Option<&SceneGraph> {
            match self {
                SceneInput::Scene(graph) => Some(graph),
                SceneInput::Unrecognized => None,
            }
        }
    }
}

pub mod entity {
    use serde::{Deserialize, Serialize};

    use crate::geometry::Point3;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum Entity {
        Line(Line),
        Face(Face),
        Circle(Circle),
        Arc(Arc),
        Point(PointEntity),
    }

    impl Entity {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Line(line) => &line.layer,
                Entity::Face(face) => &face.layer,
                Entity::Circle(circle) => &circle.layer,
                Entity::Arc(arc) => &arc.layer,
                Entity::Point(point) => &point.layer,
            }
        }

        /// DXF 组码 0 对应的实体类型名。
        #[inline]
        pub fn type_tag(&self) -> &'static str {
            match self {
                Entity::Line(_) => "LINE",
                Entity::Face(_) => "3DFACE",
                Entity::Circle(_) => "CIRCLE",
                Entity::Arc(_) => "ARC",
                Entity::Point(_) => "POINT",
            }
        }

        /// 实体携带的全部坐标点，顺序与编码顺序一致。
        pub fn points(&self) -> Vec<Point3> {
            match self {
                Entity::Line(line) => vec![line.start, line.end],
                Entity::Face(face) => face.vertices.to_vec(),
                Entity::Circle(circle) => vec![circle.center],
                Entity::Arc(arc) => vec![arc.center],
                Entity::Point(point) => vec![point.at],
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point3,
        pub end: Point3,
        pub layer: String,
    }

    /// 3DFACE。三角形输入时第四个顶点与第三个相同。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Face {
        pub vertices: [Point3; 4],
        pub layer: String,
    }

    impl Face {
        pub fn triangle(a: Point3, b: Point3, c: Point3, layer: impl Into<String>) -> Self {
            Self {
                vertices: [a, b, c, c],
                layer: layer.into(),
            }
        }

        #[inline]
        pub fn is_triangle(&self) -> bool {
            self.vertices[2] == self.vertices[3]
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point3,
        pub radius: f64,
        pub layer: String,
    }

    /// 圆弧，角度以度为单位储存（与 DXF 组码 50/51 一致）。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point3,
        pub radius: f64,
        pub start_angle_deg: f64,
        pub end_angle_deg: f64,
        pub layer: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct PointEntity {
        pub at: Point3,
        pub layer: String,
    }
}

pub mod strategy {
    use std::fmt;
    use std::str::FromStr;

    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    pub const DEFAULT_LAYER: &str = "0";
    pub const DEFAULT_PRECISION: u32 = 4;

    /// 输出的 DXF 版本。`R12` 为旧版格式，不输出图层表。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum FormatVersion {
        R2018,
        R12,
    }

    impl FormatVersion {
        #[inline]
        pub fn as_str(self) -> &'static str {
            match self {
                FormatVersion::R2018 => "R2018",
                FormatVersion::R12 => "R12",
            }
        }

        #[inline]
        pub fn is_legacy(self) -> bool {
            matches!(self, FormatVersion::R12)
        }
    }

    impl fmt::Display for FormatVersion {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub enum StrategyPreset {
        Balanced,
        HighQuality,
        Performance,
        Mobile,
        Legacy,
    }

    impl StrategyPreset {
        pub const ALL: [StrategyPreset; 5] = [
            StrategyPreset::Balanced,
            StrategyPreset::HighQuality,
            StrategyPreset::Performance,
            StrategyPreset::Mobile,
            StrategyPreset::Legacy,
        ];

        #[inline]
        pub fn as_str(self) -> &'static str {
            match self {
                StrategyPreset::Balanced => "balanced",
                StrategyPreset::HighQuality => "highQuality",
                StrategyPreset::Performance => "performance",
                StrategyPreset::Mobile => "mobile",
                StrategyPreset::Legacy => "legacy",
            }
        }

        pub fn strategy(self) -> ConversionStrategy {
            match self {
                StrategyPreset::Balanced => {
                    ConversionStrategy::new(0.1, FormatVersion::R2018, false)
                }
                StrategyPreset::HighQuality => {
                    ConversionStrategy::new(0.01, FormatVersion::R2018, false)
                }
                StrategyPreset::Performance => {
                    ConversionStrategy::new(0.5, FormatVersion::R2018, false)
                }
                StrategyPreset::Mobile => ConversionStrategy::new(0.2, FormatVersion::R12, false),
                StrategyPreset::Legacy => ConversionStrategy::new(1.0, FormatVersion::R12, true),
            }
        }
    }

    impl Default for StrategyPreset {
        fn default() -> Self {
            StrategyPreset::Balanced
        }
    }

    impl fmt::Display for StrategyPreset {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    #[error("unknown conversion strategy `{0}` (expected one of: balanced, highQuality, performance, mobile, legacy)")]
    pub struct UnknownStrategy(pub String);

    impl FromStr for StrategyPreset {
        type Err = UnknownStrategy;

        fn from_str(raw: &str) -> Result<Self, Self::Err> {
            let name = raw.trim();
            StrategyPreset::ALL
                .into_iter()
                .find(|preset| preset.as_str().eq_ignore_ascii_case(name))
                .ok_or_else(|| UnknownStrategy(raw.to_string()))
        }
    }

    /// 预设展开后的转换策略。`simplify_factor` 仅影响占位实体数量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct ConversionStrategy {
        pub simplify_factor: f64,
        pub format_version: FormatVersion,
        pub force_2d: bool,
    }

    impl ConversionStrategy {
        /// 构造策略，`simplify_factor` 会被限制在 [0, 1]。
        pub fn new(simplify_factor: f64, format_version: FormatVersion, force_2d: bool) -> Self {
            let simplify_factor = if simplify_factor.is_nan() {
                0.0
            } else {
                simplify_factor.clamp(0.0, 1.0)
            };
            Self {
                simplify_factor,
                format_version,
                force_2d,
            }
        }
    }

    impl Default for ConversionStrategy {
        fn default() -> Self {
            StrategyPreset::default().strategy()
        }
    }

    impl From<StrategyPreset> for ConversionStrategy {
        fn from(preset: StrategyPreset) -> Self {
            preset.strategy()
        }
    }

    /// 高级选项：坐标精度、强制 2D 与默认图层。
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AdvancedOptions {
        pub precision_digits: u32,
        pub force_2d: bool,
        pub default_layer: String,
    }

    impl AdvancedOptions {
        /// 图层名会去除首尾空白，空名称回退为 `"0"`。
        pub fn new(precision_digits: u32, force_2d: bool, default_layer: impl AsRef<str>) -> Self {
            Self {
                precision_digits,
                force_2d,
                default_layer: normalize_layer(default_layer.as_ref()),
            }
        }
    }

    impl Default for AdvancedOptions {
        fn default() -> Self {
            Self::new(DEFAULT_PRECISION, false, DEFAULT_LAYER)
        }
    }

    fn normalize_layer(raw: &str) -> String {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            DEFAULT_LAYER.to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// 策略与高级选项合并后的有效设置。
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ConversionSettings {
        pub precision_digits: u32,
        pub force_2d: bool,
        pub layer: String,
    }

    impl ConversionSettings {
        pub fn resolve(strategy: &ConversionStrategy, options: &AdvancedOptions) -> Self {
            Self {
                precision_digits: options.precision_digits,
                force_2d: strategy.force_2d || options.force_2d,
                layer: normalize_layer(&options.default_layer),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::entity::{Entity, Face, Line};
    use super::geometry::{Point3, Vector3};
    use super::scene::{GeometryBuffer, GeometryTable, NodeKind, SceneGraph, SceneNode, Transform};
    use super::strategy::{
        AdvancedOptions, ConversionSettings, ConversionStrategy, FormatVersion, StrategyPreset,
    };

    #[test]
    fn identity_transform_is_default() {
        let identity = Transform::default();
        assert_eq!(identity.position, Vector3::ZERO);
        assert_eq!(identity.rotation, Vector3::ZERO);
        assert_eq!(identity.scale, Vector3::ONE);
    }

    #[test]
    fn geometry_buffer_vertex_lookup_guards_range() {
        let buffer = GeometryBuffer::from_positions(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(buffer.vertex_count(), 2);
        assert_eq!(buffer.vertex(1), Some(Point3::new(3.0, 4.0, 5.0)));
        assert!(buffer.vertex(2).is_none());
        assert!(buffer.vertex(usize::MAX).is_none());
    }

    #[test]
    fn empty_index_list_counts_as_absent() {
        let buffer = GeometryBuffer::from_positions(vec![0.0; 9]).with_indices(Vec::new());
        assert!(buffer.triangle_indices().is_none());
        let buffer = buffer.with_indices(vec![0, 1, 2]);
        assert_eq!(buffer.triangle_indices(), Some(&[0, 1, 2][..]));
    }

    #[test]
    fn geometry_table_keeps_first_entry() {
        let mut table = GeometryTable::new();
        assert!(table.insert("a", GeometryBuffer::from_positions(vec![1.0, 2.0, 3.0])));
        assert!(!table.insert("a", GeometryBuffer::from_positions(vec![9.0, 9.0, 9.0])));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("a").map(|g| g.positions[0]), Some(1.0));
    }

    #[test]
    fn scene_graph_counts_nested_nodes() {
        let graph = SceneGraph::new()
            .with_root(
                SceneNode::group()
                    .with_child(SceneNode::new(NodeKind::Mesh))
                    .with_child(SceneNode::group().with_child(SceneNode::new(NodeKind::PointSet))),
            )
            .with_root(SceneNode::new(NodeKind::LineSet));
        assert_eq!(graph.node_count(), 6);
    }

    #[test]
    fn presets_match_published_table() {
        let legacy = StrategyPreset::Legacy.strategy();
        assert_eq!(legacy.format_version, FormatVersion::R12);
        assert!(legacy.force_2d);
        assert!((legacy.simplify_factor - 1.0).abs() < f64::EPSILON);

        let mobile = StrategyPreset::Mobile.strategy();
        assert!(mobile.format_version.is_legacy());
        assert!(!mobile.force_2d);

        for preset in [
            StrategyPreset::Balanced,
            StrategyPreset::HighQuality,
            StrategyPreset::Performance,
        ] {
            assert_eq!(preset.strategy().format_version, FormatVersion::R2018);
        }
        assert!((StrategyPreset::HighQuality.strategy().simplify_factor - 0.01).abs() < 1e-12);
    }

    #[test]
    fn preset_names_parse_case_insensitively() {
        assert_eq!(
            "highQuality".parse::<StrategyPreset>(),
            Ok(StrategyPreset::HighQuality)
        );
        assert_eq!(
            " LEGACY ".parse::<StrategyPreset>(),
            Ok(StrategyPreset::Legacy)
        );
        assert!("fast".parse::<StrategyPreset>().is_err());
    }

    #[test]
    fn simplify_factor_is_clamped() {
        assert_eq!(ConversionStrategy::new(1.5, FormatVersion::R2018, false).simplify_factor, 1.0);
        assert_eq!(ConversionStrategy::new(-2.0, FormatVersion::R2018, false).simplify_factor, 0.0);
        assert_eq!(
            ConversionStrategy::new(f64::NAN, FormatVersion::R2018, false).simplify_factor,
            0.0
        );
    }

    #[test]
    fn blank_layer_falls_back_to_zero() {
        assert_eq!(AdvancedOptions::new(2, false, "   ").default_layer, "0");
        assert_eq!(AdvancedOptions::new(2, false, " WALLS ").default_layer, "WALLS");
    }

    #[test]
    fn force_2d_comes_from_either_source() {
        let options = AdvancedOptions::default();
        let from_strategy =
            ConversionSettings::resolve(&StrategyPreset::Legacy.strategy(), &options);
        assert!(from_strategy.force_2d);

        let options = AdvancedOptions::new(3, true, "L");
        let from_options =
            ConversionSettings::resolve(&StrategyPreset::Balanced.strategy(), &options);
        assert!(from_options.force_2d);
        assert_eq!(from_options.precision_digits, 3);
        assert_eq!(from_options.layer, "L");

        let neither = ConversionSettings::resolve(
            &StrategyPreset::Balanced.strategy(),
            &AdvancedOptions::default(),
        );
        assert!(!neither.force_2d);
    }

    #[test]
    fn entity_accessors_report_tags_and_points() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(0.0, 1.0, 0.0);
        let face = Entity::Face(Face::triangle(a, b, c, "GEOM"));
        assert_eq!(face.type_tag(), "3DFACE");
        assert_eq!(face.layer_name(), "GEOM");
        assert_eq!(face.points(), vec![a, b, c, c]);

        let line = Entity::Line(Line {
            start: a,
            end: b,
            layer: "0".to_string(),
        });
        assert_eq!(line.type_tag(), "LINE");
        assert_eq!(line.points().len(), 2);
    }
}
