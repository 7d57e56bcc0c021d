use std::collections::HashSet;
use std::fs;
use std::path::Path;

use sdxf_core::geometry::Vector3;
use sdxf_core::scene::{
    GeometryBuffer, GeometryTable, NodeKind, PrimitiveTag, SceneGraph, SceneInput, SceneNode,
    Transform,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{DocumentLoader, IoError};

/// three.js 风格的场景 JSON 加载器。
///
/// 只有 `object.children` 为数组的文档被视为场景图；其余任何形状都返回
/// [`SceneInput::Unrecognized`]，由转换流程走占位路径。
#[derive(Debug, Default, Clone, Copy)]
pub struct SceneLoader;

impl SceneLoader {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_str(&self, source: &str) -> Result<SceneInput, IoError> {
        let value: Value = serde_json::from_str(source)?;
        self.interpret(value)
    }

    pub fn interpret(&self, value: Value) -> Result<SceneInput, IoError> {
        if !has_scene_shape(&value) {
            info!("输入不是场景图结构，将使用占位实体");
            return Ok(SceneInput::Unrecognized);
        }

        let raw: RawDocument = serde_json::from_value(value)
            .map_err(|err| IoError::InvalidDocument(err.to_string()))?;

        let mut geometries = GeometryTable::new();
        let mut seen = HashSet::new();
        let mut skipped = 0usize;
        for entry in raw.geometries {
            let Some(uuid) = entry.uuid.clone() else {
                skipped += 1;
                continue;
            };
            // 同一标识符只看首个条目，即使它没有位置数据
            if !seen.insert(uuid.clone()) {
                debug!(uuid = %uuid, "重复的几何体标识符，保留首个条目");
                continue;
            }
            match entry.into_buffer() {
                Some(buffer) => {
                    geometries.insert(uuid, buffer);
                }
                None => {
                    debug!(uuid = %uuid, "几何体缺少位置数据，已忽略");
                    skipped += 1;
                }
            }
        }

        let roots: Vec<SceneNode> = raw
            .object
            .children
            .into_iter()
            .map(RawNode::into_node)
            .collect();

        let graph = SceneGraph { roots, geometries };
        debug!(
            nodes = graph.node_count(),
            geometries = graph.geometries.len(),
            skipped,
            "场景 JSON 解析完成"
        );
        Ok(SceneInput::Scene(graph))
    }
}

impl DocumentLoader for SceneLoader {
    fn load(&self, path: &Path) -> Result<SceneInput, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_str(&data)
    }
}

fn has_scene_shape(value: &Value) -> bool {
    value
        .get("object")
        .and_then(|object| object.get("children"))
        .is_some_and(Value::is_array)
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    object: RawObject,
    #[serde(default)]
    geometries: Vec<RawGeometry>,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    children: Vec<RawNode>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    geometry: Option<String>,
    #[serde(default)]
    position: Option<RawVector>,
    #[serde(default)]
    rotation: Option<RawVector>,
    #[serde(default)]
    scale: Option<RawVector>,
    #[serde(default)]
    children: Vec<RawNode>,
}

impl RawNode {
    fn into_node(self) -> SceneNode {
        let kind = match self.kind.as_deref() {
            Some("Mesh") => NodeKind::Mesh,
            Some("LineSegments") => NodeKind::LineSet,
            Some("Points") => NodeKind::PointSet,
            _ => NodeKind::Group,
        };
        let [px, py, pz] = RawVector::components(self.position.as_ref());
        let [rx, ry, rz] = RawVector::components(self.rotation.as_ref());
        let [sx, sy, sz] = RawVector::components(self.scale.as_ref());
        let transform = Transform::new(
            Vector3::new(px.unwrap_or(0.0), py.unwrap_or(0.0), pz.unwrap_or(0.0)),
            Vector3::new(rx.unwrap_or(0.0), ry.unwrap_or(0.0), rz.unwrap_or(0.0)),
            Vector3::new(scale_or_one(sx), scale_or_one(sy), scale_or_one(sz)),
        );
        SceneNode {
            kind,
            geometry: self.geometry,
            transform,
            children: self.children.into_iter().map(RawNode::into_node).collect(),
        }
    }
}

// 缺失或为 0 的缩放分量按 1 处理。
fn scale_or_one(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v != 0.0 => v,
        _ => 1.0,
    }
}

/// 向量字段：`{x, y, z}` 对象，或 `[x, y, z]` 数组（欧拉角数组末尾可带顺序字符串）。
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawVector {
    Sequence(Vec<Value>),
    Components {
        #[serde(default)]
        x: Option<f64>,
        #[serde(default)]
        y: Option<f64>,
        #[serde(default)]
        z: Option<f64>,
    },
}

impl RawVector {
    fn components(raw: Option<&RawVector>) -> [Option<f64>; 3] {
        match raw {
            None => [None; 3],
            Some(RawVector::Components { x, y, z }) => [*x, *y, *z],
            Some(RawVector::Sequence(items)) => {
                let at = |index: usize| items.get(index).and_then(Value::as_f64);
                [at(0), at(1), at(2)]
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(default)]
    uuid: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    parameters: Option<RawParameters>,
    #[serde(default)]
    data: Option<RawGeometryData>,
}

impl RawGeometry {
    fn into_buffer(self) -> Option<GeometryBuffer> {
        let data = self.data?;
        let positions = data.attributes?.position?.array;

        let disc = disc_radius(data.kind.as_deref(), data.parameters.as_ref())
            .or_else(|| disc_radius(self.kind.as_deref(), self.parameters.as_ref()));

        Some(GeometryBuffer {
            positions,
            indices: data.index.map(|index| index.array),
            primitive: disc.map(|radius| PrimitiveTag::Disc { radius }),
        })
    }
}

fn disc_radius(kind: Option<&str>, parameters: Option<&RawParameters>) -> Option<f64> {
    if kind != Some("CircleGeometry") {
        return None;
    }
    parameters?.radius
}

#[derive(Debug, Deserialize)]
struct RawParameters {
    #[serde(default)]
    radius: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawGeometryData {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    parameters: Option<RawParameters>,
    #[serde(default)]
    attributes: Option<RawAttributes>,
    #[serde(default)]
    index: Option<RawArray<u32>>,
}

#[derive(Debug, Deserialize)]
struct RawAttributes {
    #[serde(default)]
    position: Option<RawArray<f64>>,
}

#[derive(Debug, Deserialize)]
struct RawArray<T> {
    array: Vec<T>,
}
