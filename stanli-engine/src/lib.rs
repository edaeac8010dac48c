pub mod errors {
    use stanli_core::errors::RenderError;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("entity with id {0} not found")]
        EntityNotFound(u64),
        #[error("failed to render entity {id} ({kind}): {source}")]
        Render {
            id: u64,
            kind: &'static str,
            #[source]
            source: RenderError,
        },
    }
}

pub mod drawing {
    use std::collections::HashSet;

    use stanli_core::entity::{
        Beam, Dimensioning, Entity, Hinge, Notation, Point, Render, Support,
    };
    use stanli_core::package::PackageId;
    use tracing::{debug, warn};

    use crate::errors::EngineError;

    const PICTURE_BEGIN: &str = r"\begin{tikzpicture}";
    const PICTURE_END: &str = r"\end{tikzpicture}";
    const PICTURE_INDENT: &str = "  ";

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EntityId(u64);

    impl EntityId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    /// 按名称引用了图中未声明点的字段。
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct UnresolvedReference {
        pub entity: EntityId,
        pub kind: &'static str,
        pub field: &'static str,
        pub name: String,
    }

    /// 一幅 stanli 图：按插入顺序保存实体，负责整体渲染与宏包声明汇总。
    ///
    /// 实体之间仅通过点名称关联，图本身不维护引用关系；
    /// 需要检查时显式调用 [`Drawing::unresolved_references`]。
    #[derive(Debug, Clone, Default)]
    pub struct Drawing {
        entities: Vec<(EntityId, Entity)>,
        next_entity_id: u64,
    }

    #[derive(Debug, Clone, Copy)]
    pub struct DemoEntities {
        pub left: EntityId,
        pub right: EntityId,
        pub beam: EntityId,
        pub pin: EntityId,
        pub roller: EntityId,
        pub hinge: EntityId,
        pub span: EntityId,
        pub load_label: EntityId,
    }

    impl Drawing {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add(&mut self, entity: impl Into<Entity>) -> EntityId {
            let entity = entity.into();
            let id = self.next_id();
            debug!(id = id.get(), kind = entity.kind_name(), "添加实体");
            self.entities.push((id, entity));
            id
        }

        pub fn entity(&self, id: EntityId) -> Option<&Entity> {
            self.entities
                .iter()
                .find(|(entity_id, _)| *entity_id == id)
                .map(|(_, entity)| entity)
        }

        /// 渲染单个实体。
        pub fn render_entity(&self, id: EntityId) -> Result<String, EngineError> {
            let entity = self
                .entity(id)
                .ok_or(EngineError::EntityNotFound(id.get()))?;
            render_one(id, entity)
        }

        pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
            self.entities.iter().map(|(id, entity)| (*id, entity))
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.entities.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.entities.is_empty()
        }

        /// 去重后的宏包标识，按首次出现顺序排列，文档组装方据此各声明一次。
        pub fn packages(&self) -> Vec<PackageId> {
            let mut seen = HashSet::new();
            let mut packages = Vec::new();
            for (_, entity) in &self.entities {
                let package = entity.package();
                if seen.insert(package.clone()) {
                    packages.push(package.clone());
                }
            }
            packages
        }

        /// 按插入顺序渲染所有实体，遇到第一个错误即返回。
        pub fn render_lines(&self) -> Result<Vec<String>, EngineError> {
            self.entities
                .iter()
                .map(|(id, entity)| render_one(*id, entity))
                .collect()
        }

        /// 渲染为 `tikzpicture` 环境，每条命令缩进两个空格。
        pub fn render_picture(&self) -> Result<String, EngineError> {
            let lines = self.render_lines()?;
            let mut output = String::new();
            output.push_str(PICTURE_BEGIN);
            output.push('\n');
            for line in &lines {
                output.push_str(PICTURE_INDENT);
                output.push_str(line);
                output.push('\n');
            }
            output.push_str(PICTURE_END);
            output.push('\n');
            Ok(output)
        }

        /// 可选的引用检查：列出所有引用了图中未声明点名称的字段。
        /// 只做名称匹配，不关心点的声明顺序。
        pub fn unresolved_references(&self) -> Vec<UnresolvedReference> {
            let declared: HashSet<&str> = self
                .entities
                .iter()
                .filter_map(|(_, entity)| entity.declared_point())
                .collect();

            let mut unresolved = Vec::new();
            for (id, entity) in &self.entities {
                for (field, name) in entity.point_references() {
                    if declared.contains(name) {
                        continue;
                    }
                    warn!(
                        id = id.get(),
                        kind = entity.kind_name(),
                        field,
                        point = name,
                        "引用了未声明的点"
                    );
                    unresolved.push(UnresolvedReference {
                        entity: *id,
                        kind: entity.kind_name(),
                        field,
                        name: name.to_string(),
                    });
                }
            }
            unresolved
        }

        /// 填充一根简支梁示例，返回关键实体 ID。
        pub fn populate_demo(&mut self) -> DemoEntities {
            let left = self.add(Point::new("A", 0, 0));
            let right = self.add(Point::new("B", 5, 0));
            let beam = self.add(Beam::new(1, "A", "B"));
            let pin = self.add(Support::new(1, "A"));
            let roller = self.add(Support::new(2, "B"));
            let hinge = self.add(Hinge::new(1, "A"));
            let span = self.add(Dimensioning::new(1, "A", "B", -1).with_label("$l$"));
            let load_label = self.add(
                Notation::new(1, "B", "$F$").with_orientation("above right"),
            );

            let ids = DemoEntities {
                left,
                right,
                beam,
                pin,
                roller,
                hinge,
                span,
                load_label,
            };

            debug!(
                beam = ids.beam.get(),
                span = ids.span.get(),
                count = self.len(),
                "已创建演示实体"
            );

            ids
        }

        fn next_id(&mut self) -> EntityId {
            let id = EntityId::new(self.next_entity_id);
            self.next_entity_id += 1;
            id
        }
    }

    fn render_one(id: EntityId, entity: &Entity) -> Result<String, EngineError> {
        entity.render().map_err(|source| EngineError::Render {
            id: id.get(),
            kind: entity.kind_name(),
            source,
        })
    }

}
