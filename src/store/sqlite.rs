use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const FILE_COLUMNS: &str = "id, local_name, name, namespace_id, size, mime_type, is_public, public_alias, created_at, updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_kind(s: &str) -> LabelKind {
    match s {
        "group" => LabelKind::Group,
        _ => LabelKind::Tag,
    }
}

/// Escapes LIKE metacharacters so user input only matches literally.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Maps a taken public alias to a conflict. Any other violation stays a
/// database error.
fn map_file_write_error(e: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(err, Some(msg)) = &e {
        if err.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains("files.public_alias")
        {
            return Error::Conflict("public name already exists".to_string());
        }
    }
    Error::from(e)
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        capabilities: Capabilities::from(row.get::<_, i64>(2)?),
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn row_to_namespace(row: &Row<'_>) -> rusqlite::Result<Namespace> {
    Ok(Namespace {
        id: row.get(0)?,
        name: row.get(1)?,
        owner_id: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

fn row_to_token(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        is_admin: row.get(3)?,
        user_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
    })
}

fn row_to_label(row: &Row<'_>) -> rusqlite::Result<Label> {
    Ok(Label {
        id: row.get(0)?,
        kind: parse_kind(&row.get::<_, String>(1)?),
        namespace_id: row.get(2)?,
        name: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn row_to_file(row: &Row<'_>) -> rusqlite::Result<File> {
    Ok(File {
        id: row.get(0)?,
        local_name: row.get(1)?,
        name: row.get(2)?,
        namespace_id: row.get(3)?,
        size: row.get(4)?,
        mime_type: row.get(5)?,
        is_public: row.get(6)?,
        public_alias: row.get(7)?,
        tags: Vec::new(),
        groups: Vec::new(),
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        updated_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

fn query_file_labels(conn: &Connection, kind: LabelKind, file_id: i64) -> Result<Vec<Label>> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.kind, l.namespace_id, l.name, l.created_at
         FROM labels l
         JOIN file_labels fl ON l.id = fl.label_id
         WHERE fl.file_id = ?1 AND l.kind = ?2
         ORDER BY l.name",
    )?;

    let rows = stmt.query_map(params![file_id, kind.as_str()], row_to_label)?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

fn with_labels(conn: &Connection, file: Option<File>) -> Result<Option<File>> {
    match file {
        Some(mut file) => {
            file.tags = query_file_labels(conn, LabelKind::Tag, file.id)?;
            file.groups = query_file_labels(conn, LabelKind::Group, file.id)?;
            Ok(Some(file))
        }
        None => Ok(None),
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<i64> {
        let conn = self.conn();
        let result = conn.execute(
            "INSERT INTO users (username, capabilities, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user.username,
                i64::from(user.capabilities),
                format_datetime(&user.created_at),
                format_datetime(&user.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, capabilities, created_at, updated_at FROM users WHERE id = ?1",
            params![id],
            row_to_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, capabilities, created_at, updated_at
             FROM users WHERE username = ?1",
            params![username],
            row_to_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, username, capabilities, created_at, updated_at FROM users ORDER BY id",
        )?;

        let rows = stmt.query_map([], row_to_user)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_user_capabilities(&self, id: i64, capabilities: Capabilities) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET capabilities = ?1, updated_at = ?2 WHERE id = ?3",
            params![
                i64::from(capabilities),
                format_datetime(&Utc::now()),
                id
            ],
        )?;

        if rows == 0 {
            return Err(Error::not_found("user not found"));
        }
        Ok(())
    }

    // Namespace operations

    fn create_namespace(&self, ns: &Namespace) -> Result<i64> {
        let conn = self.conn();
        let result = conn.execute(
            "INSERT INTO namespaces (name, owner_id, created_at) VALUES (?1, ?2, ?3)",
            params![ns.name, ns.owner_id, format_datetime(&ns.created_at)],
        );

        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn ensure_namespace(&self, name: &str, owner_id: i64) -> Result<Namespace> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO namespaces (name, owner_id, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (name) DO NOTHING",
            params![name, owner_id, format_datetime(&Utc::now())],
        )?;

        conn.query_row(
            "SELECT id, name, owner_id, created_at FROM namespaces WHERE name = ?1",
            params![name],
            row_to_namespace,
        )
        .map_err(Error::from)
    }

    fn get_namespace_by_name(&self, name: &str) -> Result<Option<Namespace>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, owner_id, created_at FROM namespaces WHERE name = ?1",
            params![name],
            row_to_namespace,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_user_namespaces(&self, owner_id: i64) -> Result<Vec<Namespace>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, owner_id, created_at FROM namespaces WHERE owner_id = ?1 ORDER BY name",
        )?;

        let rows = stmt.query_map(params![owner_id], row_to_namespace)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.is_admin,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::TokenLookupCollision),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE token_lookup = ?1",
            params![lookup],
            row_to_token,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_user_tokens(&self, user_id: i64) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE user_id = ?1 ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map(params![user_id], row_to_token)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    // Tag and group operations

    fn ensure_label(&self, kind: LabelKind, namespace_id: i64, name: &str) -> Result<Label> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO labels (kind, namespace_id, name, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (kind, namespace_id, name) DO NOTHING",
            params![
                kind.as_str(),
                namespace_id,
                name,
                format_datetime(&Utc::now())
            ],
        )?;

        conn.query_row(
            "SELECT id, kind, namespace_id, name, created_at
             FROM labels WHERE kind = ?1 AND namespace_id = ?2 AND name = ?3",
            params![kind.as_str(), namespace_id, name],
            row_to_label,
        )
        .map_err(Error::from)
    }

    fn get_label_by_name(
        &self,
        kind: LabelKind,
        namespace_id: i64,
        name: &str,
    ) -> Result<Option<Label>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, kind, namespace_id, name, created_at
             FROM labels WHERE kind = ?1 AND namespace_id = ?2 AND name = ?3",
            params![kind.as_str(), namespace_id, name],
            row_to_label,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_labels(&self, kind: LabelKind, namespace_id: i64) -> Result<Vec<Label>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, kind, namespace_id, name, created_at
             FROM labels WHERE kind = ?1 AND namespace_id = ?2 ORDER BY name",
        )?;

        let rows = stmt.query_map(params![kind.as_str(), namespace_id], row_to_label)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn add_file_label(&self, file_id: i64, label_id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            "INSERT OR IGNORE INTO file_labels (file_id, label_id) VALUES (?1, ?2)",
            params![file_id, label_id],
        )?;
        Ok(rows > 0)
    }

    fn remove_file_label(&self, file_id: i64, label_id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM file_labels WHERE file_id = ?1 AND label_id = ?2",
            params![file_id, label_id],
        )?;
        Ok(rows > 0)
    }

    fn list_file_labels(&self, kind: LabelKind, file_id: i64) -> Result<Vec<Label>> {
        query_file_labels(&self.conn(), kind, file_id)
    }

    // File operations

    fn create_file(&self, file: &File) -> Result<i64> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO files (local_name, name, namespace_id, size, mime_type, is_public, public_alias, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                file.local_name,
                file.name,
                file.namespace_id,
                file.size,
                file.mime_type,
                file.is_public,
                file.public_alias,
                format_datetime(&file.created_at),
                format_datetime(&file.updated_at),
            ],
        )
        .map_err(map_file_write_error)?;

        let file_id = tx.last_insert_rowid();

        for label in file.tags.iter().chain(file.groups.iter()) {
            tx.execute(
                "INSERT OR IGNORE INTO file_labels (file_id, label_id) VALUES (?1, ?2)",
                params![file_id, label.id],
            )?;
        }

        tx.commit()?;
        Ok(file_id)
    }

    fn get_file(&self, id: i64) -> Result<Option<File>> {
        let conn = self.conn();
        let file = conn
            .query_row(
                &format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?1"),
                params![id],
                row_to_file,
            )
            .optional()?;
        with_labels(&conn, file)
    }

    fn count_files(&self, namespace_id: i64, name: &str, id: Option<i64>) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM files
             WHERE namespace_id = ?1 AND (?2 = '' OR name = ?2) AND (?3 IS NULL OR id = ?3)",
            params![namespace_id, name, id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn find_file(&self, namespace_id: i64, name: &str, id: Option<i64>) -> Result<Option<File>> {
        let conn = self.conn();
        let file = conn
            .query_row(
                &format!(
                    "SELECT {FILE_COLUMNS} FROM files
                     WHERE namespace_id = ?1 AND (?2 = '' OR name = ?2) AND (?3 IS NULL OR id = ?3)
                     ORDER BY id LIMIT 1"
                ),
                params![namespace_id, name, id],
                row_to_file,
            )
            .optional()?;
        with_labels(&conn, file)
    }

    fn local_name_exists(&self, local_name: &str) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM files WHERE local_name = ?1",
            params![local_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn get_file_by_alias(&self, alias: &str) -> Result<Option<File>> {
        let conn = self.conn();
        let file = conn
            .query_row(
                &format!("SELECT {FILE_COLUMNS} FROM files WHERE public_alias = ?1"),
                params![alias],
                row_to_file,
            )
            .optional()?;
        with_labels(&conn, file)
    }

    fn list_files(&self, namespace_id: i64, name_contains: Option<&str>) -> Result<Vec<File>> {
        let conn = self.conn();
        let pattern = name_contains.filter(|n| !n.is_empty()).map(like_pattern);
        let mut stmt = conn.prepare(&format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE namespace_id = ?1 AND (?2 IS NULL OR name LIKE ?2 ESCAPE '\\')
             ORDER BY id"
        ))?;

        let rows = stmt.query_map(params![namespace_id, pattern], row_to_file)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_file(&self, file: &File) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE files SET name = ?1, is_public = ?2, public_alias = ?3, updated_at = ?4 WHERE id = ?5",
                params![
                    file.name,
                    file.is_public,
                    file.public_alias,
                    format_datetime(&Utc::now()),
                    file.id
                ],
            )
            .map_err(map_file_write_error)?;

        if rows == 0 {
            return Err(Error::not_found("file not found"));
        }
        Ok(())
    }

    fn delete_file(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM files WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn has_admin_token(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM tokens WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
