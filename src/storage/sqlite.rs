//! SQLite-backed persistent store.
//!
//! Uses separate reader/writer connections the way the teacher's `Storage`
//! does, so every method takes `&self` and the type stays `Send + Sync`
//! without forcing callers into `Arc<Mutex<Storage>>`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::embeddings;
use crate::model::{EdgeType, Entity, EntityType, Importance, Neighbor, Note};

/// Storage error type.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Underlying SQLite error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// No row exists for the given id.
    #[error("not found: {0}")]
    NotFound(String),
    /// Filesystem error setting up the database file/directory.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Store initialization failed outside of SQLite itself.
    #[error("initialization error: {0}")]
    Init(String),
    /// A connection mutex was poisoned by a panicking holder.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Storage result alias.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Main persistent store: SQLite connections plus the schema in
/// `migrations.rs`.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl Storage {
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Open (creating if necessary) the store at `db_path`, or at the
    /// platform-appropriate data directory when `None`.
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => {
                let proj_dirs = ProjectDirs::from("com", "hippograph", "core").ok_or_else(|| {
                    StorageError::Init("could not determine project directories".to_string())
                })?;
                let data_dir = proj_dirs.data_dir();
                std::fs::create_dir_all(data_dir)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let perms = std::fs::Permissions::from_mode(0o700);
                    let _ = std::fs::set_permissions(data_dir, perms);
                }
                data_dir.join("hippograph.db")
            }
        };

        let writer_conn = Connection::open(&path)?;

        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
        })
    }

    /// Open an in-memory store, used by tests.
    ///
    /// A plain `:memory:` connection is private to the connection that opened
    /// it, so the writer and reader would each see their own empty database.
    /// Instead both connections open the same SQLite shared-cache in-memory
    /// database via a `file:` URI; the database lives as long as at least one
    /// of the two connections stays open, which `Storage` guarantees. Each
    /// call gets a process-unique name so concurrent tests don't share state.
    pub fn open_in_memory() -> Result<Self> {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        let uri = format!("file:hippograph_mem_{id}?mode=memory&cache=shared");
        let flags = OpenFlags::default() | OpenFlags::SQLITE_OPEN_URI;

        let writer_conn = Connection::open_with_flags(&uri, flags)?;
        Self::configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open_with_flags(&uri, flags)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
        })
    }

    fn writer(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| StorageError::LockPoisoned("writer".to_string()))
    }

    fn reader(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.reader
            .lock()
            .map_err(|_| StorageError::LockPoisoned("reader".to_string()))
    }

    // ------------------------------------------------------------------
    // Notes
    // ------------------------------------------------------------------

    fn row_to_note(row: &rusqlite::Row) -> rusqlite::Result<Note> {
        let importance_str: String = row.get("importance")?;
        let importance = match importance_str.as_str() {
            "critical" => Importance::Critical,
            "low" => Importance::Low,
            _ => Importance::Normal,
        };
        Ok(Note {
            id: row.get("id")?,
            content: row.get("content")?,
            category: row.get("category")?,
            importance,
            created_at: parse_ts(&row.get::<_, String>("created_at")?),
            last_accessed: parse_ts(&row.get::<_, String>("last_accessed")?),
            access_count: row.get::<_, i64>("access_count")? as u32,
            emotional_tone: row.get("emotional_tone")?,
            emotional_intensity: row
                .get::<_, Option<i64>>("emotional_intensity")?
                .map(|v| v as u8),
            emotional_reflection: row.get("emotional_reflection")?,
        })
    }

    /// Insert a new note and its embedding, returning the stored row.
    #[allow(clippy::too_many_arguments)]
    pub fn create_note(
        &self,
        content: &str,
        category: &str,
        importance: Importance,
        emotional_tone: Option<&str>,
        emotional_intensity: Option<u8>,
        emotional_reflection: Option<&str>,
        embedding: &[f32],
    ) -> Result<Note> {
        let now = Utc::now();
        let importance_str = match importance {
            Importance::Critical => "critical",
            Importance::Normal => "normal",
            Importance::Low => "low",
        };

        let conn = self.writer()?;
        conn.execute(
            "INSERT INTO nodes (content, category, importance, created_at, last_accessed, \
             access_count, emotional_tone, emotional_intensity, emotional_reflection) \
             VALUES (?1, ?2, ?3, ?4, ?4, 0, ?5, ?6, ?7)",
            params![
                content,
                category,
                importance_str,
                now.to_rfc3339(),
                emotional_tone,
                emotional_intensity.map(|v| v as i64),
                emotional_reflection,
            ],
        )?;
        let id = conn.last_insert_rowid();

        conn.execute(
            "INSERT INTO node_embeddings (node_id, embedding, dimensions, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                id,
                embeddings::to_bytes(embedding),
                embedding.len() as i64,
                now.to_rfc3339(),
            ],
        )?;

        Ok(Note {
            id,
            content: content.to_string(),
            category: category.to_string(),
            importance,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            emotional_tone: emotional_tone.map(str::to_string),
            emotional_intensity,
            emotional_reflection: emotional_reflection.map(str::to_string),
        })
    }

    /// Fetch a single note by id.
    pub fn get_note(&self, id: i64) -> Result<Note> {
        let conn = self.reader()?;
        conn.query_row("SELECT * FROM nodes WHERE id = ?1", params![id], Self::row_to_note)
            .optional()?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    /// Fetch every note in the store.
    pub fn get_all_notes(&self) -> Result<Vec<Note>> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare("SELECT * FROM nodes")?;
        let rows = stmt
            .query_map([], Self::row_to_note)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Fetch every stored `(note_id, embedding)` pair.
    pub fn get_all_embeddings(&self) -> Result<Vec<(i64, Vec<f32>)>> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare("SELECT node_id, embedding FROM node_embeddings")?;
        let rows = stmt
            .query_map([], |row| {
                let node_id: i64 = row.get(0)?;
                let bytes: Vec<u8> = row.get(1)?;
                Ok((node_id, bytes))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows
            .into_iter()
            .filter_map(|(id, bytes)| embeddings::from_bytes(&bytes).map(|v| (id, v)))
            .collect())
    }

    /// Update a note's `last_accessed` timestamp and increment its access
    /// count. Failures are non-fatal to callers (the reference algorithm
    /// treats touch as best-effort bookkeeping).
    pub fn touch_note(&self, id: i64) -> Result<()> {
        let conn = self.writer()?;
        conn.execute(
            "UPDATE nodes SET last_accessed = ?1, access_count = access_count + 1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id],
        )?;
        Ok(())
    }

    /// Update a note's content and/or category in place, recording the
    /// previous content in `note_versions`.
    pub fn update_note(&self, id: i64, content: Option<&str>, category: Option<&str>) -> Result<Note> {
        let existing = self.get_note(id)?;
        let conn = self.writer()?;

        if let Some(new_content) = content {
            conn.execute(
                "INSERT INTO note_versions (node_id, content, recorded_at) VALUES (?1, ?2, ?3)",
                params![id, existing.content, Utc::now().to_rfc3339()],
            )?;
            conn.execute("UPDATE nodes SET content = ?1 WHERE id = ?2", params![new_content, id])?;
        }
        if let Some(new_category) = category {
            conn.execute(
                "UPDATE nodes SET category = ?1 WHERE id = ?2",
                params![new_category, id],
            )?;
        }
        drop(conn);
        self.get_note(id)
    }

    /// Replace a note's stored embedding (after a content update).
    pub fn update_embedding(&self, id: i64, embedding: &[f32]) -> Result<()> {
        let conn = self.writer()?;
        conn.execute(
            "INSERT INTO node_embeddings (node_id, embedding, dimensions, created_at) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(node_id) DO UPDATE SET embedding = excluded.embedding, \
             dimensions = excluded.dimensions, created_at = excluded.created_at",
            params![
                id,
                embeddings::to_bytes(embedding),
                embedding.len() as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Set a note's importance tier.
    pub fn set_importance(&self, id: i64, importance: Importance) -> Result<Note> {
        let importance_str = match importance {
            Importance::Critical => "critical",
            Importance::Normal => "normal",
            Importance::Low => "low",
        };
        let conn = self.writer()?;
        let changed = conn.execute(
            "UPDATE nodes SET importance = ?1 WHERE id = ?2",
            params![importance_str, id],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        drop(conn);
        self.get_note(id)
    }

    /// Delete a note and everything referencing it (embedding, entity
    /// links, edges) via `ON DELETE CASCADE`.
    pub fn delete_note(&self, id: i64) -> Result<()> {
        let conn = self.writer()?;
        let changed = conn.execute("DELETE FROM nodes WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    fn entity_type_str(t: EntityType) -> &'static str {
        match t {
            EntityType::Person => "person",
            EntityType::Organization => "organization",
            EntityType::Location => "location",
            EntityType::Product => "product",
            EntityType::Event => "event",
            EntityType::Tech => "tech",
            EntityType::Concept => "concept",
            EntityType::Temporal => "temporal",
            EntityType::Financial => "financial",
            EntityType::Measurement => "measurement",
            EntityType::Other => "other",
        }
    }

    fn entity_type_from_str(s: &str) -> EntityType {
        match s {
            "person" => EntityType::Person,
            "organization" => EntityType::Organization,
            "location" => EntityType::Location,
            "product" => EntityType::Product,
            "event" => EntityType::Event,
            "tech" => EntityType::Tech,
            "concept" => EntityType::Concept,
            "temporal" => EntityType::Temporal,
            "financial" => EntityType::Financial,
            "measurement" => EntityType::Measurement,
            _ => EntityType::Other,
        }
    }

    /// Find an entity by its normalized name and type, or create it.
    pub fn get_or_create_entity(&self, name: &str, entity_type: EntityType) -> Result<Entity> {
        let normalized = name.trim().to_lowercase();
        let type_str = Self::entity_type_str(entity_type);

        let conn = self.writer()?;
        let existing: Option<(i64, String)> = conn
            .query_row(
                "SELECT id, name FROM entities WHERE normalized_name = ?1 AND entity_type = ?2",
                params![normalized, type_str],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        if let Some((id, display_name)) = existing {
            return Ok(Entity {
                id,
                name: display_name,
                normalized_name: normalized,
                entity_type,
            });
        }

        conn.execute(
            "INSERT INTO entities (name, normalized_name, entity_type) VALUES (?1, ?2, ?3)",
            params![name, normalized, type_str],
        )?;
        let id = conn.last_insert_rowid();

        Ok(Entity {
            id,
            name: name.to_string(),
            normalized_name: normalized,
            entity_type,
        })
    }

    /// Link a note to an entity (idempotent).
    pub fn link_note_to_entity(&self, node_id: i64, entity_id: i64) -> Result<()> {
        let conn = self.writer()?;
        conn.execute(
            "INSERT OR IGNORE INTO node_entities (node_id, entity_id) VALUES (?1, ?2)",
            params![node_id, entity_id],
        )?;
        Ok(())
    }

    /// Every note linked to the given entity.
    pub fn get_notes_by_entity(&self, entity_id: i64) -> Result<Vec<Note>> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare(
            "SELECT n.* FROM nodes n \
             JOIN node_entities ne ON ne.node_id = n.id \
             WHERE ne.entity_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![entity_id], Self::row_to_note)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------

    fn edge_type_str(t: EdgeType) -> &'static str {
        match t {
            EdgeType::Entity => "entity",
            EdgeType::Semantic => "semantic",
        }
    }

    fn edge_type_from_str(s: &str) -> EdgeType {
        match s {
            "entity" => EdgeType::Entity,
            _ => EdgeType::Semantic,
        }
    }

    /// Insert (or replace) one directed edge. Callers that want a symmetric
    /// relation must call this twice, once per direction.
    pub fn create_edge(&self, source_id: i64, target_id: i64, weight: f32, edge_type: EdgeType) -> Result<()> {
        let conn = self.writer()?;
        conn.execute(
            "INSERT INTO edges (source_id, target_id, weight, edge_type) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(source_id, target_id, edge_type) DO UPDATE SET weight = excluded.weight",
            params![source_id, target_id, weight, Self::edge_type_str(edge_type)],
        )?;
        Ok(())
    }

    /// Every edge in the store, both directions.
    pub fn get_all_edges(&self) -> Result<Vec<crate::model::Edge>> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare("SELECT source_id, target_id, weight, edge_type FROM edges")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(crate::model::Edge {
                    source_id: row.get(0)?,
                    target_id: row.get(1)?,
                    weight: row.get(2)?,
                    edge_type: Self::edge_type_from_str(&row.get::<_, String>(3)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Neighbors of a note, read straight from the store (used as a
    /// fallback when the in-memory graph cache hasn't been built yet).
    pub fn get_connected_nodes(&self, node_id: i64) -> Result<Vec<Neighbor>> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare(
            "SELECT target_id, weight, edge_type FROM edges WHERE source_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![node_id], |row| {
                Ok(Neighbor {
                    neighbor_id: row.get(0)?,
                    weight: row.get(1)?,
                    edge_type: Self::edge_type_from_str(&row.get::<_, String>(2)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Remove every directed edge mentioning `node_id`, as either endpoint.
    /// Used by `update_note`'s full re-link when content changes.
    pub fn remove_edges_for(&self, node_id: i64) -> Result<()> {
        let conn = self.writer()?;
        conn.execute(
            "DELETE FROM edges WHERE source_id = ?1 OR target_id = ?1",
            params![node_id],
        )?;
        Ok(())
    }

    /// Drop a note's entity links (but not the entities themselves). Used by
    /// `update_note`'s full re-link when content changes.
    pub fn remove_entity_links_for(&self, node_id: i64) -> Result<()> {
        let conn = self.writer()?;
        conn.execute("DELETE FROM node_entities WHERE node_id = ?1", params![node_id])?;
        Ok(())
    }

    /// Entity types currently linked to a note, used to evaluate the
    /// `entity_type` search filter.
    pub fn get_entity_types_for_node(&self, node_id: i64) -> Result<Vec<EntityType>> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare(
            "SELECT e.entity_type FROM entities e \
             JOIN node_entities ne ON ne.entity_id = e.id \
             WHERE ne.node_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![node_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows.iter().map(|s| Self::entity_type_from_str(s)).collect())
    }
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> Storage {
        Storage::open_in_memory().unwrap()
    }

    #[test]
    fn create_and_get_note_roundtrips() {
        let store = test_store();
        let note = store
            .create_note("hello world", "general", Importance::Normal, None, None, None, &[1.0, 2.0])
            .unwrap();
        let fetched = store.get_note(note.id).unwrap();
        assert_eq!(fetched.content, "hello world");
        assert_eq!(fetched.access_count, 0);
    }

    #[test]
    fn get_note_missing_id_errors() {
        let store = test_store();
        assert!(matches!(store.get_note(999), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn touch_note_increments_access_count() {
        let store = test_store();
        let note = store
            .create_note("hi", "general", Importance::Normal, None, None, None, &[1.0])
            .unwrap();
        store.touch_note(note.id).unwrap();
        store.touch_note(note.id).unwrap();
        let fetched = store.get_note(note.id).unwrap();
        assert_eq!(fetched.access_count, 2);
    }

    #[test]
    fn get_or_create_entity_is_idempotent() {
        let store = test_store();
        let e1 = store.get_or_create_entity("Rust", EntityType::Tech).unwrap();
        let e2 = store.get_or_create_entity("rust", EntityType::Tech).unwrap();
        assert_eq!(e1.id, e2.id);
    }

    #[test]
    fn create_edge_is_directed_and_symmetric_pair_is_two_calls() {
        let store = test_store();
        let a = store
            .create_note("a", "general", Importance::Normal, None, None, None, &[1.0])
            .unwrap();
        let b = store
            .create_note("b", "general", Importance::Normal, None, None, None, &[1.0])
            .unwrap();
        store.create_edge(a.id, b.id, 0.6, EdgeType::Entity).unwrap();
        store.create_edge(b.id, a.id, 0.6, EdgeType::Entity).unwrap();

        let forward = store.get_connected_nodes(a.id).unwrap();
        let backward = store.get_connected_nodes(b.id).unwrap();
        assert_eq!(forward.len(), 1);
        assert_eq!(backward.len(), 1);
        assert_eq!(forward[0].neighbor_id, b.id);
    }

    #[test]
    fn delete_note_cascades_edges() {
        let store = test_store();
        let a = store
            .create_note("a", "general", Importance::Normal, None, None, None, &[1.0])
            .unwrap();
        let b = store
            .create_note("b", "general", Importance::Normal, None, None, None, &[1.0])
            .unwrap();
        store.create_edge(a.id, b.id, 0.6, EdgeType::Semantic).unwrap();
        store.delete_note(a.id).unwrap();
        assert!(store.get_connected_nodes(b.id).unwrap().is_empty());
        assert!(matches!(store.get_note(a.id), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn set_importance_updates_and_returns_note() {
        let store = test_store();
        let note = store
            .create_note("a", "general", Importance::Normal, None, None, None, &[1.0])
            .unwrap();
        let updated = store.set_importance(note.id, Importance::Critical).unwrap();
        assert_eq!(updated.importance, Importance::Critical);
    }
}
