use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stanli_core::entity::Entity;
use stanli_engine::drawing::Drawing;
use stanli_engine::errors::EngineError;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unsupported description format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid drawing description: {0}")]
    InvalidDescription(String),
    #[error(transparent)]
    Render(#[from] EngineError),
}

pub trait DrawingLoader {
    fn load(&self, path: &Path) -> Result<Drawing, IoError>;
}

pub trait DrawingSaver {
    fn save(&self, drawing: &Drawing, path: &Path) -> Result<(), IoError>;
}

/// 图描述文件的格式，按扩展名识别。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionFormat {
    Toml,
    Json,
}

impl DescriptionFormat {
    pub fn from_path(path: &Path) -> Result<Self, IoError> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            _ => Err(IoError::UnsupportedFormat(format!(
                "{} (期望 .toml 或 .json)",
                path.display()
            ))),
        }
    }
}

/// 描述文件的顶层结构：`[[entity]]` 数组，每项以 `kind` 区分实体种类。
#[derive(Debug, Default, Serialize, Deserialize)]
struct DrawingDescription {
    #[serde(default, rename = "entity")]
    entities: Vec<Entity>,
}

/// 从内存中的描述文本构造图。实体在解析时构造，捕获此刻的宏包标识。
pub fn parse_description(source: &str, format: DescriptionFormat) -> Result<Drawing, IoError> {
    let description: DrawingDescription = match format {
        DescriptionFormat::Toml => toml::from_str(source)
            .map_err(|err| IoError::InvalidDescription(err.to_string()))?,
        DescriptionFormat::Json => serde_json::from_str(source)
            .map_err(|err| IoError::InvalidDescription(err.to_string()))?,
    };

    let mut drawing = Drawing::new();
    for entity in description.entities {
        drawing.add(entity);
    }
    Ok(drawing)
}

/// 将图序列化为描述文本，实体顺序与插入顺序一致。宏包标识不写入描述。
pub fn write_description(drawing: &Drawing, format: DescriptionFormat) -> Result<String, IoError> {
    let description = DrawingDescription {
        entities: drawing.entities().map(|(_, entity)| entity.clone()).collect(),
    };
    match format {
        DescriptionFormat::Toml => toml::to_string(&description)
            .map_err(|err| IoError::InvalidDescription(err.to_string())),
        DescriptionFormat::Json => serde_json::to_string_pretty(&description)
            .map_err(|err| IoError::InvalidDescription(err.to_string())),
    }
}

pub struct DescriptionFacade;

impl DescriptionFacade {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DescriptionFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingLoader for DescriptionFacade {
    fn load(&self, path: &Path) -> Result<Drawing, IoError> {
        let format = DescriptionFormat::from_path(path)?;
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let drawing = parse_description(&data, format)?;
        info!(path = %path.display(), entities = drawing.len(), "已加载图描述");
        Ok(drawing)
    }
}

impl DrawingSaver for DescriptionFacade {
    fn save(&self, drawing: &Drawing, path: &Path) -> Result<(), IoError> {
        let format = DescriptionFormat::from_path(path)?;
        let text = write_description(drawing, format)?;
        write_file(path, &text)
    }
}

/// TeX 输出形态。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TexLayout {
    /// 仅输出 `tikzpicture` 环境，由外部文档 `\input`。
    Picture,
    /// 输出可直接编译的完整文档，每个宏包只声明一次。
    Document { document_class: String },
}

pub struct TexFacade {
    layout: TexLayout,
}

impl TexFacade {
    pub fn new(layout: TexLayout) -> Self {
        Self { layout }
    }

    pub fn picture() -> Self {
        Self::new(TexLayout::Picture)
    }

    pub fn document(document_class: impl Into<String>) -> Self {
        Self::new(TexLayout::Document {
            document_class: document_class.into(),
        })
    }

    pub fn layout(&self) -> &TexLayout {
        &self.layout
    }

    pub fn render(&self, drawing: &Drawing) -> Result<String, IoError> {
        let picture = drawing.render_picture()?;
        match &self.layout {
            TexLayout::Picture => Ok(picture),
            TexLayout::Document { document_class } => {
                let mut output = format!("\\documentclass{{{document_class}}}\n");
                for package in drawing.packages() {
                    output.push_str(&format!("\\usepackage{{{package}}}\n"));
                }
                output.push_str("\\begin{document}\n");
                output.push_str(&picture);
                output.push_str("\\end{document}\n");
                Ok(output)
            }
        }
    }
}

impl Default for TexFacade {
    fn default() -> Self {
        Self::picture()
    }
}

impl DrawingSaver for TexFacade {
    fn save(&self, drawing: &Drawing, path: &Path) -> Result<(), IoError> {
        let text = self.render(drawing)?;
        write_file(path, &text)?;
        debug!(path = %path.display(), bytes = text.len(), "已写出 TeX");
        Ok(())
    }
}

fn write_file(path: &Path, text: &str) -> Result<(), IoError> {
    fs::write(path, text).map_err(|source| IoError::WriteError {
        path: path.to_path_buf(),
        source,
    })
}
