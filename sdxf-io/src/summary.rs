use std::collections::BTreeMap;

use crate::IoError;

/// 一个组码/值对。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPair {
    pub code: i32,
    pub value: String,
}

/// 将 DXF 文本按行拆成组码/值对。
pub fn read_pairs(source: &str) -> Result<Vec<GroupPair>, IoError> {
    PairStream::new(source).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerRecord {
    pub name: String,
    pub color: Option<i32>,
}

/// 已编码 DXF 的概览：版本、图层表与各类实体数量。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DxfSummary {
    pub version: Option<String>,
    pub has_layer_table: bool,
    pub layers: Vec<LayerRecord>,
    pub entity_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Header,
    Tables,
    Entities,
    Other,
}

impl DxfSummary {
    pub fn from_text(source: &str) -> Result<Self, IoError> {
        let mut pairs = PairStream::new(source);
        let mut summary = DxfSummary::default();
        let mut section = Section::None;
        let mut reached_eof = false;

        while let Some(pair) = pairs.next() {
            let GroupPair { code, value } = pair?;
            match code {
                0 if value == "SECTION" => {
                    let name = pairs
                        .next()
                        .transpose()?
                        .ok_or_else(|| invalid("SECTION 缺少名称（组码 2）"))?;
                    if name.code != 2 {
                        return Err(invalid(format!(
                            "SECTION 名称使用了组码 {}（期望 2）",
                            name.code
                        )));
                    }
                    section = match name.value.as_str() {
                        "HEADER" => Section::Header,
                        "TABLES" => Section::Tables,
                        "ENTITIES" => Section::Entities,
                        _ => Section::Other,
                    };
                }
                0 if value == "ENDSEC" => section = Section::None,
                0 if value == "EOF" => {
                    reached_eof = true;
                    break;
                }
                _ => match section {
                    Section::Header => {
                        if code == 9 && value == "$ACADVER" {
                            if let Some(GroupPair { code: 1, value }) = pairs.next().transpose()? {
                                summary.version = Some(value);
                            }
                        }
                    }
                    Section::Tables => summary.read_table_pair(code, value)?,
                    Section::Entities => {
                        if code == 0 {
                            *summary.entity_counts.entry(value).or_insert(0) += 1;
                        }
                    }
                    Section::None | Section::Other => {}
                },
            }
        }

        if !reached_eof {
            return Err(invalid("缺少 EOF 结束标记"));
        }
        Ok(summary)
    }

    fn read_table_pair(&mut self, code: i32, value: String) -> Result<(), IoError> {
        match code {
            0 if value == "TABLE" => self.has_layer_table = true,
            0 if value == "LAYER" => self.layers.push(LayerRecord {
                name: String::new(),
                color: None,
            }),
            2 => {
                if let Some(layer) = self.layers.last_mut() {
                    layer.name = value;
                }
            }
            62 => {
                if let Some(layer) = self.layers.last_mut() {
                    let color = value
                        .trim()
                        .parse::<i32>()
                        .map_err(|_| invalid(format!("图层颜色解析失败（值：\"{value}\"）")))?;
                    layer.color = Some(color);
                }
            }
            _ => {}
        }
        Ok(())
    }

    #[inline]
    pub fn count(&self, type_tag: &str) -> usize {
        self.entity_counts.get(type_tag).copied().unwrap_or(0)
    }

    pub fn entity_total(&self) -> usize {
        self.entity_counts.values().sum()
    }
}

fn invalid(message: impl Into<String>) -> IoError {
    IoError::InvalidDrawing(message.into())
}

/// 每次取两行：组码行与值行。行号从 1 开始计，用于错误信息。
struct PairStream<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> PairStream<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines().enumerate(),
        }
    }

    fn pair_at(&mut self, row: usize, code_line: &str) -> Result<GroupPair, IoError> {
        let code_text = code_line.trim();
        let code = code_text
            .parse::<i32>()
            .map_err(|_| invalid(format!("行 {row}：组码应为整数，实际为 \"{code_text}\"")))?;
        let Some((_, value_line)) = self.lines.next() else {
            return Err(invalid(format!("行 {row}：组码 {code} 之后没有值行")));
        };
        Ok(GroupPair {
            code,
            value: value_line.trim_end_matches('\r').to_string(),
        })
    }
}

impl Iterator for PairStream<'_> {
    type Item = Result<GroupPair, IoError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, code_line) = self.lines.next()?;
        Some(self.pair_at(index + 1, code_line))
    }
}
