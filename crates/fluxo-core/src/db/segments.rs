//! Segment (tenant scope) operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Segment;

impl Database {
    /// Create a segment; name must be unique
    pub fn create_segment(&self, name: &str, description: Option<&str>) -> Result<Segment> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("Segment name cannot be empty".into()));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO segments (name, description) VALUES (?, ?)",
            params![name, description],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_segment(id)?
            .ok_or_else(|| Error::NotFound(format!("Segment {}", id)))
    }

    /// Get a segment by ID
    pub fn get_segment(&self, id: i64) -> Result<Option<Segment>> {
        let conn = self.conn()?;
        let segment = conn
            .query_row(
                "SELECT id, name, description, created_at FROM segments WHERE id = ?",
                params![id],
                |row| {
                    let created_at_str: String = row.get(3)?;
                    Ok(Segment {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        created_at: parse_datetime(&created_at_str),
                    })
                },
            )
            .optional()?;
        Ok(segment)
    }

    /// List all segments ordered by name
    pub fn list_segments(&self) -> Result<Vec<Segment>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, description, created_at FROM segments ORDER BY name")?;

        let segments = stmt
            .query_map([], |row| {
                let created_at_str: String = row.get(3)?;
                Ok(Segment {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(segments)
    }

    /// Update a segment's name and description
    ///
    /// Returns false if the segment does not exist.
    pub fn update_segment(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
    ) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("Segment name cannot be empty".into()));
        }

        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE segments SET name = ?, description = ? WHERE id = ?",
            params![name, description, id],
        )?;
        Ok(changed > 0)
    }

    /// Delete a segment; its transactions become global (segment_id = NULL)
    pub fn delete_segment(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;

        conn.execute("BEGIN TRANSACTION", [])?;
        let result = (|| {
            conn.execute(
                "UPDATE transactions SET segment_id = NULL WHERE segment_id = ?",
                params![id],
            )?;
            conn.execute(
                "UPDATE sync_runs SET segment_id = NULL WHERE segment_id = ?",
                params![id],
            )?;
            let changed = conn.execute("DELETE FROM segments WHERE id = ?", params![id])?;
            Ok(changed > 0)
        })();

        match result {
            Ok(deleted) => {
                conn.execute("COMMIT", [])?;
                Ok(deleted)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }
}
