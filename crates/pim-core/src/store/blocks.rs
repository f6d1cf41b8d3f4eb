//! Block store: list per project, create from scratch or from a template.

use anyhow::Context;
use chrono::Utc;
use rusqlite::{params, Connection};

use super::projects::project_exists;
use super::templates::query_template;
use super::{parsed_column, read_elements, write_elements, Db};
use crate::core::{CoreError, CoreResult};
use crate::model::{Block, BlockType, NewBlock, ProjectId, TemplateId};
use crate::validate::{BlockValidator, Validator};

const SELECT_ELEMENTS: &str =
    "SELECT key, value, value_type FROM block_elements WHERE block_id = ? ORDER BY position";
const INSERT_ELEMENT: &str =
    "INSERT INTO block_elements (block_id, position, key, value, value_type) VALUES (?, ?, ?, ?, ?)";

/// Store for information blocks.
pub struct BlockStore<'a> {
    db: &'a Db,
}

impl<'a> BlockStore<'a> {
    pub(crate) const fn new(db: &'a Db) -> Self {
        Self { db }
    }

    /// Blocks of one project, in creation order, each with its ordered elements.
    pub fn list_for_project(&self, project_id: ProjectId) -> CoreResult<Vec<Block>> {
        let conn = self.db.lock()?;
        if !project_exists(&conn, project_id)? {
            return Err(CoreError::ProjectNotFound { project_id });
        }

        let mut stmt = conn
            .prepare_cached(
                "SELECT id, project_id, title, block_type, created_at
                 FROM blocks WHERE project_id = ? ORDER BY id",
            )
            .context("Failed to prepare block list")?;
        let rows = stmt
            .query_map(params![project_id], |row| {
                Ok(Block {
                    id: row.get("id")?,
                    project_id: row.get("project_id")?,
                    title: row.get("title")?,
                    block_type: parsed_column(row, "block_type")?,
                    elements: Vec::new(),
                    created_at: row.get("created_at")?,
                })
            })
            .context("Failed to query blocks")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read blocks")?;

        let mut blocks = rows;
        for block in &mut blocks {
            block.elements = read_elements(&conn, SELECT_ELEMENTS, block.id)?;
        }
        Ok(blocks)
    }

    /// Create a block from scratch.
    ///
    /// The project must exist, and a template-typed block must name an
    /// existing template. Elements keep the order given.
    pub fn create(&self, project_id: ProjectId, block: &NewBlock) -> CoreResult<Block> {
        BlockValidator.validate(block)?;

        let mut conn = self.db.lock()?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        if !project_exists(&tx, project_id)? {
            return Err(CoreError::ProjectNotFound { project_id });
        }
        if let BlockType::Template(template_id) = block.block_type {
            if query_template(&tx, template_id)?.is_none() {
                return Err(CoreError::InvalidTemplate {
                    block_type: block.block_type,
                });
            }
        }

        let created = insert_block(&tx, project_id, block)?;
        tx.commit().context("Failed to commit block")?;

        tracing::info!(
            project_id,
            block_id = created.id,
            block_type = %created.block_type,
            elements = created.elements.len(),
            "block created"
        );
        Ok(created)
    }

    /// Create a block seeded with a copy of a template's elements.
    ///
    /// The block's title is `title_override` when non-blank, otherwise the
    /// template's title. Later changes to the template do not reach the block.
    pub fn create_from_template(
        &self,
        project_id: ProjectId,
        template_id: TemplateId,
        title_override: Option<&str>,
    ) -> CoreResult<Block> {
        let mut conn = self.db.lock()?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        if !project_exists(&tx, project_id)? {
            return Err(CoreError::ProjectNotFound { project_id });
        }
        let template =
            query_template(&tx, template_id)?.ok_or(CoreError::TemplateNotFound { template_id })?;

        let title = title_override
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map_or_else(|| template.title.clone(), str::to_string);
        let block = NewBlock {
            title,
            block_type: BlockType::Template(template.id),
            elements: template.elements,
        };
        BlockValidator.validate(&block)?;

        let created = insert_block(&tx, project_id, &block)?;
        tx.commit().context("Failed to commit block")?;

        tracing::info!(
            project_id,
            block_id = created.id,
            template_id,
            "block created from template"
        );
        Ok(created)
    }

    /// Number of stored blocks across all projects.
    pub fn count(&self) -> CoreResult<i64> {
        let count = self
            .db
            .lock()?
            .query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))
            .context("Failed to count blocks")?;
        Ok(count)
    }
}

fn insert_block(conn: &Connection, project_id: ProjectId, block: &NewBlock) -> CoreResult<Block> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO blocks (project_id, title, block_type, created_at) VALUES (?, ?, ?, ?)",
        params![project_id, block.title, block.block_type.to_string(), now],
    )
    .context("Failed to insert block")?;
    let id = conn.last_insert_rowid();
    write_elements(conn, INSERT_ELEMENT, id, &block.elements)?;

    Ok(Block {
        id,
        project_id,
        title: block.title.clone(),
        block_type: block.block_type,
        elements: block.elements.clone(),
        created_at: Some(now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Element, ProjectFields, TemplateSeed, ValueType};
    use crate::store::Store;

    fn setup() -> (Db, ProjectId) {
        let db = Db::open_in_memory().unwrap();
        db.init_schema().unwrap();
        let project = db.projects().create(&ProjectFields::named("Kickoff")).unwrap();
        let id = project.id.unwrap();
        (db, id)
    }

    fn seed_venue_template(db: &Db) -> TemplateId {
        db.templates()
            .seed(&[TemplateSeed {
                title: "Venue".to_string(),
                elements: vec![
                    Element::new("Name", "", ValueType::Text),
                    Element::new("Capacity", "100", ValueType::Number),
                    Element::new("Booked on", "", ValueType::Date),
                    Element::new("Map", "", ValueType::Url),
                ],
            }])
            .unwrap();
        db.templates().list().unwrap()[0].id
    }

    fn custom_block(title: &str, elements: Vec<Element>) -> NewBlock {
        NewBlock {
            title: title.to_string(),
            block_type: BlockType::Custom,
            elements,
        }
    }

    #[test]
    fn test_create_preserves_element_order() {
        let (db, project_id) = setup();
        let elements = vec![
            Element::new("z-last-alphabetically", "1", ValueType::Number),
            Element::new("a-first-alphabetically", "two", ValueType::Text),
            Element::new("m", "2024-01-01", ValueType::Date),
        ];
        db.blocks()
            .create(project_id, &custom_block("Scope", elements.clone()))
            .unwrap();

        let blocks = db.blocks().list_for_project(project_id).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].elements, elements);
        assert_eq!(blocks[0].block_type, BlockType::Custom);
    }

    #[test]
    fn test_zero_element_block_is_valid() {
        let (db, project_id) = setup();
        let block = db
            .blocks()
            .create(project_id, &custom_block("Notes", vec![]))
            .unwrap();
        assert!(block.elements.is_empty());
    }

    #[test]
    fn test_create_for_missing_project() {
        let (db, _) = setup();
        let err = db
            .blocks()
            .create(999, &custom_block("Notes", vec![]))
            .unwrap_err();
        assert!(matches!(err, CoreError::ProjectNotFound { project_id: 999 }));
    }

    #[test]
    fn test_create_with_unknown_template_type() {
        let (db, project_id) = setup();
        let block = NewBlock {
            title: "Venue".to_string(),
            block_type: BlockType::Template(404),
            elements: vec![],
        };
        let err = db.blocks().create(project_id, &block).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTemplate { .. }));
        assert_eq!(db.blocks().count().unwrap(), 0);
    }

    #[test]
    fn test_create_with_known_template_type() {
        let (db, project_id) = setup();
        let template_id = seed_venue_template(&db);
        let block = NewBlock {
            title: "Venue".to_string(),
            block_type: BlockType::Template(template_id),
            elements: vec![Element::new("Name", "Hall A", ValueType::Text)],
        };
        let created = db.blocks().create(project_id, &block).unwrap();
        assert_eq!(created.block_type, BlockType::Template(template_id));
    }

    #[test]
    fn test_create_from_template_copies_elements_exactly() {
        let (db, project_id) = setup();
        let template_id = seed_venue_template(&db);
        let template = db.templates().get(template_id).unwrap();

        let mut block = db
            .blocks()
            .create_from_template(project_id, template_id, None)
            .unwrap();

        assert_eq!(block.title, "Venue");
        assert_eq!(block.block_type, BlockType::Template(template_id));
        assert_eq!(block.elements, template.elements);

        block.elements[0].value = "Changed".to_string();
        block.elements.pop();
        assert_eq!(db.templates().get(template_id).unwrap(), template);

        let stored = db.blocks().list_for_project(project_id).unwrap();
        assert_eq!(stored[0].elements, template.elements);
    }

    #[test]
    fn test_create_from_template_title_override() {
        let (db, project_id) = setup();
        let template_id = seed_venue_template(&db);

        let named = db
            .blocks()
            .create_from_template(project_id, template_id, Some("Backup venue"))
            .unwrap();
        assert_eq!(named.title, "Backup venue");

        let blank = db
            .blocks()
            .create_from_template(project_id, template_id, Some("  "))
            .unwrap();
        assert_eq!(blank.title, "Venue");
    }

    #[test]
    fn test_create_from_missing_template() {
        let (db, project_id) = setup();
        let err = db
            .blocks()
            .create_from_template(project_id, 12, None)
            .unwrap_err();
        assert!(matches!(err, CoreError::TemplateNotFound { template_id: 12 }));
    }

    #[test]
    fn test_list_for_missing_project() {
        let (db, _) = setup();
        let err = db.blocks().list_for_project(5).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_blocks_are_scoped_to_project() {
        let (db, first) = setup();
        let second = db
            .projects()
            .create(&ProjectFields::named("Wrap-up"))
            .unwrap()
            .id
            .unwrap();
        db.blocks().create(first, &custom_block("A", vec![])).unwrap();
        db.blocks().create(second, &custom_block("B", vec![])).unwrap();
        db.blocks().create(first, &custom_block("C", vec![])).unwrap();

        let titles: Vec<String> = db
            .blocks()
            .list_for_project(first)
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["A", "C"]);
    }
}
