pub mod number {
    use std::fmt;

    use serde::{Deserialize, Serialize};

    /// 数值字段。整数与浮点数分开保存，以便原样写入宏命令（`0` 与 `0.0` 不同）。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum Number {
        Int(i64),
        Float(f64),
    }

    impl Number {
        /// 转换为 `f64`，便于调用方做数值比较。
        #[inline]
        pub fn as_f64(self) -> f64 {
            match self {
                Number::Int(value) => value as f64,
                Number::Float(value) => value,
            }
        }
    }

    impl Default for Number {
        fn default() -> Self {
            Number::Int(0)
        }
    }

    impl fmt::Display for Number {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Number::Int(value) => write!(f, "{value}"),
                // 最短往返表示，整数值保留 `.0` 后缀。
                Number::Float(value) => write!(f, "{value:?}"),
            }
        }
    }

    macro_rules! impl_from_int {
        ($($ty:ty),*) => {
            $(
                impl From<$ty> for Number {
                    #[inline]
                    fn from(value: $ty) -> Self {
                        Number::Int(i64::from(value))
                    }
                }
            )*
        };
    }

    impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

    impl From<f64> for Number {
        #[inline]
        fn from(value: f64) -> Self {
            Number::Float(value)
        }
    }

}

pub mod package {
    use std::fmt;
    use std::path::Path;
    use std::sync::{PoisonError, RwLock};

    use once_cell::sync::Lazy;
    use serde::{Deserialize, Serialize};

    /// 内建的宏包名称。
    pub const DEFAULT_PACKAGE: &str = "stanli";

    /// 宏包标识，即 `\usepackage{...}` 中使用的名称或去掉扩展名的路径。
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct PackageId(String);

    impl PackageId {
        pub fn new(name: impl Into<String>) -> Self {
            Self(name.into())
        }

        /// 由 `.sty` 文件路径构造标识：去掉最后一个扩展名，其余部分原样保留。
        pub fn from_sty_path(path: impl AsRef<Path>) -> Self {
            let stripped = path.as_ref().with_extension("");
            Self(stripped.to_string_lossy().into_owned())
        }

        #[inline]
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl Default for PackageId {
        fn default() -> Self {
            Self(DEFAULT_PACKAGE.to_string())
        }
    }

    impl fmt::Display for PackageId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl AsRef<str> for PackageId {
        fn as_ref(&self) -> &str {
            &self.0
        }
    }

    /// 宏包登记表。可作为普通值显式传递给构造实体的代码，
    /// 也可通过 [`current`] / [`update_global`] 使用进程级实例。
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct PackageRegistry {
        active: PackageId,
    }

    impl PackageRegistry {
        pub fn new() -> Self {
            Self::default()
        }

        #[inline]
        pub fn get(&self) -> &PackageId {
            &self.active
        }

        /// 以 `.sty` 路径覆盖当前标识，返回新的标识。
        /// 只影响之后构造的实体，已有实体保留构造时的值。
        pub fn update(&mut self, sty_path: impl AsRef<Path>) -> PackageId {
            self.active = PackageId::from_sty_path(sty_path);
            self.active.clone()
        }

        pub fn reset(&mut self) {
            self.active = PackageId::default();
        }
    }

    static GLOBAL: Lazy<RwLock<PackageRegistry>> =
        Lazy::new(|| RwLock::new(PackageRegistry::default()));

    /// 读取进程级登记表的当前标识。实体构造时通过它捕获宏包。
    pub fn current() -> PackageId {
        GLOBAL
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get()
            .clone()
    }

    /// 覆盖进程级标识。
    ///
    /// 约定只在启动阶段由单一线程调用；并发写入时以最后一次写入为准，
    /// 与之并发构造的实体捕获哪一个值不作保证。
    pub fn update_global(sty_path: impl AsRef<Path>) -> PackageId {
        GLOBAL
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .update(sty_path)
    }

    /// 恢复进程级标识为 [`DEFAULT_PACKAGE`]。
    pub fn reset_global() {
        GLOBAL
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn registry_defaults_to_stanli() {
            let registry = PackageRegistry::new();
            assert_eq!(registry.get().as_str(), DEFAULT_PACKAGE);
        }

        #[test]
        fn update_strips_extension_only() {
            let mut registry = PackageRegistry::new();
            assert_eq!(registry.update("/a/b/custom.sty").as_str(), "/a/b/custom");
            assert_eq!(registry.get().as_str(), "/a/b/custom");

            assert_eq!(registry.update("stanli-dev").as_str(), "stanli-dev");
            assert_eq!(registry.update("v1.2/pkg.tar.sty").as_str(), "v1.2/pkg.tar");

            registry.reset();
            assert_eq!(registry.get(), &PackageId::default());
        }
    }
}

pub mod markup {
    use std::fmt::{Display, Write};

    /// 拼装单行宏命令：`\name{必选}[可选];`。
    #[derive(Debug, Clone)]
    pub struct MarkupCommand {
        buffer: String,
    }

    impl MarkupCommand {
        pub fn new(name: &str) -> Self {
            let mut buffer = String::with_capacity(48);
            buffer.push('\\');
            buffer.push_str(name);
            Self { buffer }
        }

        /// 追加一个 `{...}` 位置参数。
        pub fn arg(mut self, value: impl Display) -> Self {
            let _ = write!(self.buffer, "{{{value}}}");
            self
        }

        /// 追加一个 `[...]` 可选参数。
        pub fn opt(mut self, value: impl Display) -> Self {
            let _ = write!(self.buffer, "[{value}]");
            self
        }

        /// 仅在值存在时追加 `[...]`。
        pub fn opt_some<T: Display>(self, value: Option<T>) -> Self {
            match value {
                Some(value) => self.opt(value),
                None => self,
            }
        }

        pub fn finish(mut self) -> String {
            self.buffer.push(';');
            self.buffer
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn builds_mixed_arguments() {
            let line = MarkupCommand::new("demo")
                .arg("A")
                .arg(2)
                .opt("x")
                .opt_some(None::<&str>)
                .opt_some(Some(0.5))
                .finish();
            assert_eq!(line, r"\demo{A}{2}[x][0.5];");
        }
    }
}

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum RenderError {
        #[error("invalid type code `{value}` for {entity}.{field} (expected one of {allowed})")]
        InvalidTypeCode {
            entity: &'static str,
            field: &'static str,
            value: String,
            allowed: &'static str,
        },
    }
}

pub mod entity {
    use std::fmt;

    use serde::{Deserialize, Serialize};

    use crate::errors::RenderError;
    use crate::markup::MarkupCommand;
    use crate::number::Number;
    use crate::package::{self, PackageId};

    /// 选择渲染样式的类型码。统一以字符串保存，整数输入会转为十进制文本。
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(from = "RawTypeCode", into = "String")]
    pub struct TypeCode(String);

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTypeCode {
        Int(i64),
        Text(String),
    }

    impl From<RawTypeCode> for TypeCode {
        fn from(raw: RawTypeCode) -> Self {
            match raw {
                RawTypeCode::Int(value) => Self(value.to_string()),
                RawTypeCode::Text(value) => Self(value),
            }
        }
    }

    impl From<TypeCode> for String {
        fn from(code: TypeCode) -> Self {
            code.0
        }
    }

    impl TypeCode {
        #[inline]
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl fmt::Display for TypeCode {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<&str> for TypeCode {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }

    impl From<String> for TypeCode {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<u8> for TypeCode {
        fn from(value: u8) -> Self {
            Self(value.to_string())
        }
    }

    impl From<i32> for TypeCode {
        fn from(value: i32) -> Self {
            Self(value.to_string())
        }
    }

    impl From<u32> for TypeCode {
        fn from(value: u32) -> Self {
            Self(value.to_string())
        }
    }

    const BEAM_CODES: &str = "1, 2, 3, 4";
    const HINGE_CODES: &str = "1, 2, 3, 4, 5";
    const NOTATION_CODES: &str = "1, 2, 3, 4, 5, 6";

    fn invalid_code(entity: &'static str, code: &TypeCode, allowed: &'static str) -> RenderError {
        RenderError::InvalidTypeCode {
            entity,
            field: "type",
            value: code.as_str().to_string(),
            allowed,
        }
    }

    /// 可渲染为单行 stanli 命令的对象。
    pub trait Render {
        /// 生成完整的命令行（含结尾分号）。类型码不在允许范围内时返回错误。
        fn render(&self) -> Result<String, RenderError>;

        /// 构造时捕获的宏包标识，供文档组装方声明依赖。
        fn package(&self) -> &PackageId;
    }

    macro_rules! infallible_render {
        ($ty:ty) => {
            impl Render for $ty {
                fn render(&self) -> Result<String, RenderError> {
                    Ok(self.command().finish())
                }

                fn package(&self) -> &PackageId {
                    &self.package
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.command().finish())
                }
            }
        };
    }

    macro_rules! with_package {
        ($ty:ty) => {
            impl $ty {
                /// 显式指定宏包，替代构造时从进程级登记表捕获的值。
                pub fn in_package(mut self, package: PackageId) -> Self {
                    self.package = package;
                    self
                }
            }
        };
    }

    /// 具名节点 `\point{name}{x}{y};`。其他实体只通过名称引用它。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Point {
        name: String,
        x: Number,
        y: Number,
        #[serde(skip, default = "package::current")]
        package: PackageId,
    }

    impl Point {
        pub fn new(name: impl Into<String>, x: impl Into<Number>, y: impl Into<Number>) -> Self {
            Self {
                name: name.into(),
                x: x.into(),
                y: y.into(),
                package: package::current(),
            }
        }

        #[inline]
        pub fn name(&self) -> &str {
            &self.name
        }

        #[inline]
        pub fn x(&self) -> Number {
            self.x
        }

        #[inline]
        pub fn y(&self) -> Number {
            self.y
        }

        fn command(&self) -> MarkupCommand {
            MarkupCommand::new("point")
                .arg(&self.name)
                .arg(self.x)
                .arg(self.y)
        }
    }

    with_package!(Point);
    infallible_render!(Point);

    /// 支座。旋转角总是输出，缺省为 `0`。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Support {
        #[serde(rename = "type")]
        kind: TypeCode,
        point: String,
        #[serde(default)]
        rotation: Number,
        #[serde(skip, default = "package::current")]
        package: PackageId,
    }

    impl Support {
        pub fn new(kind: impl Into<TypeCode>, point: impl Into<String>) -> Self {
            Self {
                kind: kind.into(),
                point: point.into(),
                rotation: Number::default(),
                package: package::current(),
            }
        }

        pub fn with_rotation(mut self, rotation: impl Into<Number>) -> Self {
            self.rotation = rotation.into();
            self
        }

        #[inline]
        pub fn point(&self) -> &str {
            &self.point
        }

        fn command(&self) -> MarkupCommand {
            MarkupCommand::new("support")
                .arg(&self.kind)
                .arg(&self.point)
                .opt(self.rotation)
        }
    }

    with_package!(Support);
    infallible_render!(Support);

    /// 铰 `\hinge{type}{point};`，类型码 1–5。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Hinge {
        #[serde(rename = "type")]
        kind: TypeCode,
        point: String,
        #[serde(skip, default = "package::current")]
        package: PackageId,
    }

    impl Hinge {
        pub fn new(kind: impl Into<TypeCode>, point: impl Into<String>) -> Self {
            Self {
                kind: kind.into(),
                point: point.into(),
                package: package::current(),
            }
        }

        #[inline]
        pub fn kind(&self) -> &TypeCode {
            &self.kind
        }

        #[inline]
        pub fn point(&self) -> &str {
            &self.point
        }
    }

    with_package!(Hinge);

    impl Render for Hinge {
        fn render(&self) -> Result<String, RenderError> {
            match self.kind.as_str() {
                "1" | "2" | "3" | "4" | "5" => Ok(MarkupCommand::new("hinge")
                    .arg(&self.kind)
                    .arg(&self.point)
                    .finish()),
                _ => Err(invalid_code("hinge", &self.kind, HINGE_CODES)),
            }
        }

        fn package(&self) -> &PackageId {
            &self.package
        }
    }

    /// 杆件。类型 1、2、4 带两个端点圆角标记，类型 3 没有端部。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Beam {
        #[serde(rename = "type")]
        kind: TypeCode,
        start_point: String,
        end_point: String,
        #[serde(default)]
        round_start_point: bool,
        #[serde(default)]
        round_end_point: bool,
        #[serde(skip, default = "package::current")]
        package: PackageId,
    }

    impl Beam {
        pub fn new(
            kind: impl Into<TypeCode>,
            start_point: impl Into<String>,
            end_point: impl Into<String>,
        ) -> Self {
            Self {
                kind: kind.into(),
                start_point: start_point.into(),
                end_point: end_point.into(),
                round_start_point: false,
                round_end_point: false,
                package: package::current(),
            }
        }

        pub fn round_start(mut self, round: bool) -> Self {
            self.round_start_point = round;
            self
        }

        pub fn round_end(mut self, round: bool) -> Self {
            self.round_end_point = round;
            self
        }

        #[inline]
        pub fn start_point(&self) -> &str {
            &self.start_point
        }

        #[inline]
        pub fn end_point(&self) -> &str {
            &self.end_point
        }
    }

    with_package!(Beam);

    impl Render for Beam {
        fn render(&self) -> Result<String, RenderError> {
            let command = MarkupCommand::new("beam")
                .arg(&self.kind)
                .arg(&self.start_point)
                .arg(&self.end_point);
            match self.kind.as_str() {
                "1" | "2" | "4" => Ok(command
                    .opt(u8::from(self.round_start_point))
                    .opt(u8::from(self.round_end_point))
                    .finish()),
                "3" => Ok(command.finish()),
                _ => Err(invalid_code("beam", &self.kind, BEAM_CODES)),
            }
        }

        fn package(&self) -> &PackageId {
            &self.package
        }
    }

    /// 尺寸标注。未给出标签时不输出方括号。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Dimensioning {
        #[serde(rename = "type")]
        kind: TypeCode,
        start_point: String,
        end_point: String,
        origin_dist: Number,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        #[serde(skip, default = "package::current")]
        package: PackageId,
    }

    impl Dimensioning {
        pub fn new(
            kind: impl Into<TypeCode>,
            start_point: impl Into<String>,
            end_point: impl Into<String>,
            origin_dist: impl Into<Number>,
        ) -> Self {
            Self {
                kind: kind.into(),
                start_point: start_point.into(),
                end_point: end_point.into(),
                origin_dist: origin_dist.into(),
                label: None,
                package: package::current(),
            }
        }

        pub fn with_label(mut self, label: impl Into<String>) -> Self {
            self.label = Some(label.into());
            self
        }

        #[inline]
        pub fn start_point(&self) -> &str {
            &self.start_point
        }

        #[inline]
        pub fn end_point(&self) -> &str {
            &self.end_point
        }

        fn command(&self) -> MarkupCommand {
            MarkupCommand::new("dimensioning")
                .arg(&self.kind)
                .arg(&self.start_point)
                .arg(&self.end_point)
                .arg(self.origin_dist)
                .opt_some(self.label.as_deref())
        }
    }

    with_package!(Dimensioning);
    infallible_render!(Dimensioning);

    /// 影响线。`arrow_pos` 缺省时省略，显式给出时（包括 0.5）总是输出。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct InfluenceLine {
        start_point: String,
        end_point: String,
        vert_dist: Number,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        arrow_pos: Option<Number>,
        #[serde(skip, default = "package::current")]
        package: PackageId,
    }

    impl InfluenceLine {
        pub fn new(
            start_point: impl Into<String>,
            end_point: impl Into<String>,
            vert_dist: impl Into<Number>,
        ) -> Self {
            Self {
                start_point: start_point.into(),
                end_point: end_point.into(),
                vert_dist: vert_dist.into(),
                arrow_pos: None,
                package: package::current(),
            }
        }

        pub fn with_arrow_pos(mut self, arrow_pos: impl Into<Number>) -> Self {
            self.arrow_pos = Some(arrow_pos.into());
            self
        }

        #[inline]
        pub fn start_point(&self) -> &str {
            &self.start_point
        }

        #[inline]
        pub fn end_point(&self) -> &str {
            &self.end_point
        }

        fn command(&self) -> MarkupCommand {
            MarkupCommand::new("influenceline")
                .arg(&self.start_point)
                .arg(&self.end_point)
                .arg(self.vert_dist)
                .opt_some(self.arrow_pos)
        }
    }

    with_package!(InfluenceLine);
    infallible_render!(InfluenceLine);

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Scaling {
        scale_factor: Number,
        #[serde(skip, default = "package::current")]
        package: PackageId,
    }

    impl Scaling {
        pub fn new(scale_factor: impl Into<Number>) -> Self {
            Self {
                scale_factor: scale_factor.into(),
                package: package::current(),
            }
        }

        fn command(&self) -> MarkupCommand {
            MarkupCommand::new("scaling").arg(self.scale_factor)
        }
    }

    with_package!(Scaling);
    infallible_render!(Scaling);

    /// 文字注记，类型码 1–6。
    ///
    /// 类型 1、2、6 只输出点与标签（1、2 可附加方向）；类型 3–5 输出固定数量的
    /// 方括号字段，未设置的字段写成空串而不是省略，4、5 另带文字方向。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Notation {
        #[serde(rename = "type")]
        kind: TypeCode,
        point: String,
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_point: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<Number>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        orientation: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text_orientation: Option<String>,
        #[serde(skip, default = "package::current")]
        package: PackageId,
    }

    impl Notation {
        pub fn new(
            kind: impl Into<TypeCode>,
            point: impl Into<String>,
            label: impl Into<String>,
        ) -> Self {
            Self {
                kind: kind.into(),
                point: point.into(),
                label: label.into(),
                end_point: None,
                position: None,
                orientation: None,
                text_orientation: None,
                package: package::current(),
            }
        }

        pub fn with_end_point(mut self, end_point: impl Into<String>) -> Self {
            self.end_point = Some(end_point.into());
            self
        }

        pub fn with_position(mut self, position: impl Into<Number>) -> Self {
            self.position = Some(position.into());
            self
        }

        pub fn with_orientation(mut self, orientation: impl Into<String>) -> Self {
            self.orientation = Some(orientation.into());
            self
        }

        pub fn with_text_orientation(mut self, text_orientation: impl Into<String>) -> Self {
            self.text_orientation = Some(text_orientation.into());
            self
        }

        #[inline]
        pub fn point(&self) -> &str {
            &self.point
        }

        #[inline]
        pub fn end_point(&self) -> Option<&str> {
            self.end_point.as_deref()
        }
    }

    with_package!(Notation);

    impl Render for Notation {
        fn render(&self) -> Result<String, RenderError> {
            let code = self.kind.as_str();
            let mut command = MarkupCommand::new("notation")
                .arg(&self.kind)
                .arg(&self.point);
            match code {
                "1" | "2" | "6" => {
                    command = command.arg(&self.label);
                    let orientation = self.orientation.as_deref().filter(|o| !o.is_empty());
                    if code != "6" {
                        command = command.opt_some(orientation);
                    }
                }
                "3" | "4" | "5" => {
                    let position = self.position.map(|p| p.to_string()).unwrap_or_default();
                    command = command
                        .arg(self.end_point.as_deref().unwrap_or(""))
                        .opt(&self.label)
                        .opt(position)
                        .opt(self.orientation.as_deref().unwrap_or(""));
                    if matches!(code, "4" | "5") {
                        command = command.opt(self.text_orientation.as_deref().unwrap_or(""));
                    }
                }
                _ => return Err(invalid_code("notation", &self.kind, NOTATION_CODES)),
            }
            Ok(command.finish())
        }

        fn package(&self) -> &PackageId {
            &self.package
        }
    }

    /// 封闭的实体集合，便于按描述文件批量构造和统一渲染。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "kind", rename_all = "snake_case")]
    pub enum Entity {
        Point(Point),
        Support(Support),
        Hinge(Hinge),
        Beam(Beam),
        Dimensioning(Dimensioning),
        InfluenceLine(InfluenceLine),
        Scaling(Scaling),
        Notation(Notation),
    }

    impl Entity {
        pub fn kind_name(&self) -> &'static str {
            match self {
                Entity::Point(_) => "point",
                Entity::Support(_) => "support",
                Entity::Hinge(_) => "hinge",
                Entity::Beam(_) => "beam",
                Entity::Dimensioning(_) => "dimensioning",
                Entity::InfluenceLine(_) => "influence_line",
                Entity::Scaling(_) => "scaling",
                Entity::Notation(_) => "notation",
            }
        }

        /// 若实体本身声明了一个点，返回其名称。
        pub fn declared_point(&self) -> Option<&str> {
            match self {
                Entity::Point(point) => Some(point.name()),
                _ => None,
            }
        }

        /// 列出按名称引用的点：`(字段名, 点名)`。空的可选引用不计入。
        pub fn point_references(&self) -> Vec<(&'static str, &str)> {
            match self {
                Entity::Point(_) | Entity::Scaling(_) => Vec::new(),
                Entity::Support(support) => vec![("point", support.point())],
                Entity::Hinge(hinge) => vec![("point", hinge.point())],
                Entity::Beam(beam) => vec![
                    ("start_point", beam.start_point()),
                    ("end_point", beam.end_point()),
                ],
                Entity::Dimensioning(dim) => vec![
                    ("start_point", dim.start_point()),
                    ("end_point", dim.end_point()),
                ],
                Entity::InfluenceLine(line) => vec![
                    ("start_point", line.start_point()),
                    ("end_point", line.end_point()),
                ],
                Entity::Notation(notation) => {
                    let mut refs = vec![("point", notation.point())];
                    if let Some(end) = notation.end_point().filter(|end| !end.is_empty()) {
                        refs.push(("end_point", end));
                    }
                    refs
                }
            }
        }

        fn as_render(&self) -> &dyn Render {
            match self {
                Entity::Point(inner) => inner,
                Entity::Support(inner) => inner,
                Entity::Hinge(inner) => inner,
                Entity::Beam(inner) => inner,
                Entity::Dimensioning(inner) => inner,
                Entity::InfluenceLine(inner) => inner,
                Entity::Scaling(inner) => inner,
                Entity::Notation(inner) => inner,
            }
        }
    }

    impl Render for Entity {
        fn render(&self) -> Result<String, RenderError> {
            self.as_render().render()
        }

        fn package(&self) -> &PackageId {
            self.as_render().package()
        }
    }

    macro_rules! entity_from {
        ($($variant:ident),*) => {
            $(
                impl From<$variant> for Entity {
                    fn from(value: $variant) -> Self {
                        Entity::$variant(value)
                    }
                }
            )*
        };
    }

    entity_from!(
        Point,
        Support,
        Hinge,
        Beam,
        Dimensioning,
        InfluenceLine,
        Scaling,
        Notation
    );

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn point_renders_coordinates_verbatim() {
            assert_eq!(Point::new("A", 0, 0).to_string(), r"\point{A}{0}{0};");
            assert_eq!(
                Point::new("B", -1.5, 2.0).render().unwrap(),
                r"\point{B}{-1.5}{2.0};"
            );
            assert_eq!(Point::new("C", 3, 0.25).to_string(), r"\point{C}{3}{0.25};");
        }

        #[test]
        fn support_always_emits_rotation() {
            assert_eq!(Support::new(1, "A").to_string(), r"\support{1}{A}[0];");
            assert_eq!(
                Support::new("3", "B").with_rotation(90).to_string(),
                r"\support{3}{B}[90];"
            );
            assert_eq!(
                Support::new(2, "B").with_rotation(-45.5).render().unwrap(),
                r"\support{2}{B}[-45.5];"
            );
        }

        #[test]
        fn hinge_keeps_requested_type() {
            assert_eq!(Hinge::new(1, "C").render().unwrap(), r"\hinge{1}{C};");
            assert_eq!(Hinge::new(5, "C").render().unwrap(), r"\hinge{5}{C};");
        }

        #[test]
        fn hinge_rejects_unknown_type() {
            let err = Hinge::new(9, "C").render().unwrap_err();
            assert_eq!(
                err,
                RenderError::InvalidTypeCode {
                    entity: "hinge",
                    field: "type",
                    value: "9".to_string(),
                    allowed: HINGE_CODES,
                }
            );
        }

        #[test]
        fn beam_flags_follow_type_code() {
            assert_eq!(
                Beam::new(1, "A", "B").render().unwrap(),
                r"\beam{1}{A}{B}[0][0];"
            );
            assert_eq!(
                Beam::new(2, "A", "B").round_start(true).render().unwrap(),
                r"\beam{2}{A}{B}[1][0];"
            );
            assert_eq!(
                Beam::new(4, "A", "B")
                    .round_start(true)
                    .round_end(true)
                    .render()
                    .unwrap(),
                r"\beam{4}{A}{B}[1][1];"
            );
            assert_eq!(
                Beam::new(3, "A", "B")
                    .round_start(true)
                    .round_end(true)
                    .render()
                    .unwrap(),
                r"\beam{3}{A}{B};"
            );
        }

        #[test]
        fn beam_rejects_unknown_type() {
            for code in ["0", "5", "x", ""] {
                let err = Beam::new(code, "A", "B").render().unwrap_err();
                let RenderError::InvalidTypeCode { entity, value, .. } = err;
                assert_eq!(entity, "beam");
                assert_eq!(value, code);
            }
        }

        #[test]
        fn dimensioning_label_is_optional() {
            let plain = Dimensioning::new(1, "A", "B", -0.5).to_string();
            assert_eq!(plain, r"\dimensioning{1}{A}{B}{-0.5};");
            assert!(!plain.contains('['));

            let labelled = Dimensioning::new(2, "A", "B", 1)
                .with_label("X")
                .to_string();
            assert_eq!(labelled, r"\dimensioning{2}{A}{B}{1}[X];");
            assert!(labelled.ends_with("[X];"));
        }

        #[test]
        fn influence_line_arrow_is_optional() {
            assert_eq!(
                InfluenceLine::new("A", "B", 1).to_string(),
                r"\influenceline{A}{B}{1};"
            );
            assert_eq!(
                InfluenceLine::new("A", "B", 1.0)
                    .with_arrow_pos(0.5)
                    .to_string(),
                r"\influenceline{A}{B}{1.0}[0.5];"
            );
        }

        #[test]
        fn scaling_renders_single_argument() {
            assert_eq!(Scaling::new(2).to_string(), r"\scaling{2};");
            assert_eq!(Scaling::new(0.75).render().unwrap(), r"\scaling{0.75};");
        }

        #[test]
        fn short_notation_forms() {
            assert_eq!(
                Notation::new(1, "A", "$F$").render().unwrap(),
                r"\notation{1}{A}{$F$};"
            );
            assert_eq!(
                Notation::new("2", "A", "q")
                    .with_orientation("above")
                    .render()
                    .unwrap(),
                r"\notation{2}{A}{q}[above];"
            );
            // 类型 6 不输出方向，也忽略终点与位置
            assert_eq!(
                Notation::new(6, "A", "m")
                    .with_orientation("left")
                    .with_end_point("B")
                    .with_position(0.3)
                    .with_text_orientation("t")
                    .render()
                    .unwrap(),
                r"\notation{6}{A}{m};"
            );
            assert_eq!(
                Notation::new(1, "A", "m")
                    .with_orientation("")
                    .render()
                    .unwrap(),
                r"\notation{1}{A}{m};"
            );
        }

        #[test]
        fn long_notation_forms_keep_field_count() {
            assert_eq!(
                Notation::new("4", "P1", "lbl")
                    .with_end_point("P2")
                    .with_position(0.5)
                    .with_orientation("r")
                    .with_text_orientation("t")
                    .render()
                    .unwrap(),
                r"\notation{4}{P1}{P2}[lbl][0.5][r][t];"
            );
            assert_eq!(
                Notation::new(3, "P1", "lbl").render().unwrap(),
                r"\notation{3}{P1}{}[lbl][][];"
            );
            assert_eq!(
                Notation::new(5, "P1", "lbl")
                    .with_end_point("P2")
                    .render()
                    .unwrap(),
                r"\notation{5}{P1}{P2}[lbl][][][];"
            );
            assert_eq!(
                Notation::new(3, "P1", "lbl")
                    .with_text_orientation("ignored")
                    .with_position(1)
                    .render()
                    .unwrap(),
                r"\notation{3}{P1}{}[lbl][1][];"
            );
        }

        #[test]
        fn notation_rejects_unknown_type() {
            assert!(matches!(
                Notation::new(7, "A", "x").render(),
                Err(RenderError::InvalidTypeCode { entity: "notation", .. })
            ));
        }

        #[test]
        fn render_is_repeatable() {
            let beam = Beam::new(2, "A", "B").round_end(true);
            assert_eq!(beam.render(), beam.render());
            let notation = Notation::new(4, "A", "x").with_end_point("B");
            assert_eq!(notation.render(), notation.render());
        }

        #[test]
        fn explicit_package_overrides_capture() {
            let custom = PackageId::new("vendor/stanli-fork");
            let point = Point::new("A", 0, 0).in_package(custom.clone());
            assert_eq!(point.package(), &custom);
            let entity = Entity::from(Beam::new(1, "A", "B").in_package(custom.clone()));
            assert_eq!(entity.package(), &custom);
        }

        #[test]
        fn entity_lists_point_references() {
            let notation = Entity::from(Notation::new(4, "A", "x").with_end_point("B"));
            assert_eq!(
                notation.point_references(),
                vec![("point", "A"), ("end_point", "B")]
            );
            let short = Entity::from(Notation::new(1, "A", "x").with_end_point(""));
            assert_eq!(short.point_references(), vec![("point", "A")]);
            assert!(Entity::from(Scaling::new(1)).point_references().is_empty());
            assert_eq!(Entity::from(Point::new("A", 0, 0)).declared_point(), Some("A"));
        }

        #[test]
        fn entities_deserialize_from_tagged_tables() {
            let source = r#"
                [[entity]]
                kind = "point"
                name = "A"
                x = 0
                y = 1.5

                [[entity]]
                kind = "beam"
                type = 3
                start_point = "A"
                end_point = "B"

                [[entity]]
                kind = "notation"
                type = "4"
                point = "A"
                label = "lbl"
                end_point = "B"
                position = 0.5
            "#;

            #[derive(Deserialize)]
            struct Wrapper {
                entity: Vec<Entity>,
            }

            let parsed: Wrapper = toml::from_str(source).unwrap();
            let lines: Vec<String> = parsed
                .entity
                .iter()
                .map(|entity| entity.render().unwrap())
                .collect();
            assert_eq!(
                lines,
                vec![
                    r"\point{A}{0}{1.5};".to_string(),
                    r"\beam{3}{A}{B};".to_string(),
                    r"\notation{4}{A}{B}[lbl][0.5][][];".to_string(),
                ]
            );
        }
    }
}
