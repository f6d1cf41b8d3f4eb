//! Template store. Templates are read-only at runtime; they enter the
//! database only through [`TemplateStore::seed`].

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::{read_elements, write_elements, Db, Store};
use crate::core::{CoreError, CoreResult};
use crate::model::{Template, TemplateId, TemplateSeed};

const SELECT_ELEMENTS: &str = "SELECT key, default_value AS value, value_type
     FROM template_elements WHERE template_id = ? ORDER BY position";
const INSERT_ELEMENT: &str = "INSERT INTO template_elements
     (template_id, position, key, default_value, value_type) VALUES (?, ?, ?, ?, ?)";

pub struct TemplateStore<'a> {
    db: &'a Db,
}

impl<'a> TemplateStore<'a> {
    pub(crate) const fn new(db: &'a Db) -> Self {
        Self { db }
    }

    /// Insert templates that are not already present, matching by title.
    ///
    /// Existing templates are left untouched so blocks keep pointing at the
    /// same ids across re-seeding. Returns how many templates were added.
    pub fn seed(&self, seeds: &[TemplateSeed]) -> CoreResult<usize> {
        let mut conn = self.db.lock()?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        let mut added = 0;
        for seed in seeds {
            let inserted = tx
                .execute(
                    "INSERT OR IGNORE INTO templates (title) VALUES (?)",
                    params![seed.title],
                )
                .context("Failed to insert template")?;
            if inserted == 0 {
                tracing::debug!(title = %seed.title, "template already present");
                continue;
            }
            let id = tx.last_insert_rowid();
            write_elements(&tx, INSERT_ELEMENT, id, &seed.elements)?;
            added += 1;
        }

        tx.commit().context("Failed to commit templates")?;
        if added > 0 {
            tracing::info!(added, "templates seeded");
        }
        Ok(added)
    }

    pub fn count(&self) -> CoreResult<i64> {
        let count = self
            .db
            .lock()?
            .query_row("SELECT COUNT(*) FROM templates", [], |row| row.get(0))
            .context("Failed to count templates")?;
        Ok(count)
    }
}

impl Store<Template> for TemplateStore<'_> {
    type Id = TemplateId;

    fn list(&self) -> CoreResult<Vec<Template>> {
        let conn = self.db.lock()?;
        let mut stmt = conn
            .prepare_cached("SELECT id, title FROM templates ORDER BY id")
            .context("Failed to prepare template list")?;
        let heads = stmt
            .query_map([], |row| Ok((row.get::<_, TemplateId>(0)?, row.get::<_, String>(1)?)))
            .context("Failed to query templates")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read templates")?;

        let mut templates = Vec::with_capacity(heads.len());
        for (id, title) in heads {
            templates.push(Template {
                id,
                title,
                elements: read_elements(&conn, SELECT_ELEMENTS, id)?,
            });
        }
        Ok(templates)
    }

    fn get(&self, id: TemplateId) -> CoreResult<Template> {
        query_template(&*self.db.lock()?, id)?
            .ok_or(CoreError::TemplateNotFound { template_id: id })
    }
}

/// Load one template with its elements.
pub(super) fn query_template(conn: &Connection, id: TemplateId) -> Result<Option<Template>> {
    let title: Option<String> = conn
        .query_row("SELECT title FROM templates WHERE id = ?", params![id], |row| {
            row.get(0)
        })
        .optional()
        .context("Failed to query template")?;

    let Some(title) = title else {
        return Ok(None);
    };
    Ok(Some(Template {
        id,
        title,
        elements: read_elements(conn, SELECT_ELEMENTS, id)?,
    }))
}
