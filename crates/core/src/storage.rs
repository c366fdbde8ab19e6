use async_trait::async_trait;
use chrono::Utc;
use revos_common::{GradingItem, Result, RevosError, SyllabusRecord, UserRecord};
use sqlx::{migrate::MigrateDatabase, Row, Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[async_trait]
pub trait SyllabusStore: Send + Sync {
    async fn insert_syllabus(&self, record: &SyllabusRecord) -> Result<()>;
    async fn get_syllabus(&self, owner_id: Uuid, id: Uuid) -> Result<Option<SyllabusRecord>>;
    async fn list_syllabi(&self, owner_id: Uuid) -> Result<Vec<SyllabusRecord>>;
    /// Errors with `NotFound` when no row matches (owner, id).
    async fn delete_syllabus(&self, owner_id: Uuid, id: Uuid) -> Result<()>;
    /// Full-array replace of the grading breakdown. Errors with `NotFound`
    /// when no row matches (owner, id).
    async fn replace_grading(&self, owner_id: Uuid, id: Uuid, items: &[GradingItem]) -> Result<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &UserRecord) -> Result<()>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>>;
    /// Matches either username or email, exactly.
    async fn find_user_by_identity(&self, identity: &str) -> Result<Option<UserRecord>>;
    async fn username_exists(&self, username: &str) -> Result<bool>;
    async fn email_exists(&self, email: &str) -> Result<bool>;
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub enable_wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:./data/revos.db".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            enable_wal_mode: true,
        }
    }
}

pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(&config.database_url)
            .await
            .unwrap_or(false)
        {
            info!("Creating database at {}", config.database_url);
            Sqlite::create_database(&config.database_url)
                .await
                .map_err(|e| RevosError::Database(format!("Failed to create database: {}", e)))?;
        }

        // In-memory databases are per-connection; a larger pool would hand out
        // empty databases for every new connection.
        let max_connections = if config.database_url.contains(":memory:") {
            1
        } else {
            config.max_connections
        };

        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(|e| RevosError::Database(format!("Failed to connect to database: {}", e)))?;

        if config.enable_wal_mode {
            sqlx::query("PRAGMA journal_mode = WAL")
                .execute(&pool)
                .await
                .map_err(|e| RevosError::Database(format!("Failed to enable WAL mode: {}", e)))?;
        }

        let storage = Self { pool };
        storage.create_tables().await?;

        info!("SQLite storage initialized successfully");
        Ok(storage)
    }

    async fn create_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS syllabi (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                course_name TEXT NOT NULL,
                course_code TEXT,
                course_id TEXT NOT NULL,
                instructor TEXT,
                semester TEXT,
                key_dates TEXT NOT NULL,
                topics TEXT NOT NULL,
                grading TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RevosError::Database(format!("Failed to create syllabi table: {}", e)))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_syllabi_owner ON syllabi(owner_id)")
            .execute(&self.pool)
            .await
            .map_err(|e| RevosError::Database(format!("Failed to create index: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RevosError::Database(format!("Failed to create users table: {}", e)))?;

        Ok(())
    }

    fn syllabus_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<SyllabusRecord> {
        let id_str: String = row.get("id");
        let owner_str: String = row.get("owner_id");
        let key_dates_json: String = row.get("key_dates");
        let topics_json: String = row.get("topics");
        let grading_json: String = row.get("grading");

        Ok(SyllabusRecord {
            id: Uuid::parse_str(&id_str)
                .map_err(|e| RevosError::Internal(format!("Invalid UUID: {}", e)))?,
            owner_id: Uuid::parse_str(&owner_str)
                .map_err(|e| RevosError::Internal(format!("Invalid UUID: {}", e)))?,
            course_name: row.get("course_name"),
            course_code: row.get("course_code"),
            course_id: row.get("course_id"),
            instructor: row.get("instructor"),
            semester: row.get("semester"),
            key_dates: serde_json::from_str(&key_dates_json)
                .map_err(|e| RevosError::Internal(format!("Failed to deserialize key dates: {}", e)))?,
            topics: serde_json::from_str(&topics_json)
                .map_err(|e| RevosError::Internal(format!("Failed to deserialize topics: {}", e)))?,
            grading: serde_json::from_str(&grading_json)
                .map_err(|e| RevosError::Internal(format!("Failed to deserialize grading: {}", e)))?,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<UserRecord> {
        let id_str: String = row.get("id");

        Ok(UserRecord {
            id: Uuid::parse_str(&id_str)
                .map_err(|e| RevosError::Internal(format!("Invalid UUID: {}", e)))?,
            username: row.get("username"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl SyllabusStore for SqliteStorage {
    async fn insert_syllabus(&self, record: &SyllabusRecord) -> Result<()> {
        let key_dates_json = serde_json::to_string(&record.key_dates)
            .map_err(|e| RevosError::Internal(format!("Failed to serialize key dates: {}", e)))?;
        let topics_json = serde_json::to_string(&record.topics)
            .map_err(|e| RevosError::Internal(format!("Failed to serialize topics: {}", e)))?;
        let grading_json = serde_json::to_string(&record.grading)
            .map_err(|e| RevosError::Internal(format!("Failed to serialize grading: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO syllabi (id, owner_id, course_name, course_code, course_id,
                                 instructor, semester, key_dates, topics, grading,
                                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.owner_id.to_string())
        .bind(&record.course_name)
        .bind(&record.course_code)
        .bind(&record.course_id)
        .bind(&record.instructor)
        .bind(&record.semester)
        .bind(key_dates_json)
        .bind(topics_json)
        .bind(grading_json)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RevosError::Database(format!("Failed to store syllabus: {}", e)))?;

        debug!("Stored syllabus {} for owner {}", record.id, record.owner_id);
        Ok(())
    }

    async fn get_syllabus(&self, owner_id: Uuid, id: Uuid) -> Result<Option<SyllabusRecord>> {
        let row = sqlx::query("SELECT * FROM syllabi WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RevosError::Database(format!("Failed to get syllabus: {}", e)))?;

        match row {
            Some(row) => Ok(Some(Self::syllabus_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_syllabi(&self, owner_id: Uuid) -> Result<Vec<SyllabusRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM syllabi WHERE owner_id = ? ORDER BY created_at DESC",
        )
        .bind(owner_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RevosError::Database(format!("Failed to list syllabi: {}", e)))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(Self::syllabus_from_row(row)?);
        }

        Ok(records)
    }

    async fn delete_syllabus(&self, owner_id: Uuid, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM syllabi WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RevosError::Database(format!("Failed to delete syllabus: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(RevosError::NotFound(format!("Syllabus not found: {}", id)));
        }

        debug!("Deleted syllabus {} for owner {}", id, owner_id);
        Ok(())
    }

    async fn replace_grading(&self, owner_id: Uuid, id: Uuid, items: &[GradingItem]) -> Result<()> {
        let grading_json = serde_json::to_string(items)
            .map_err(|e| RevosError::Internal(format!("Failed to serialize grading: {}", e)))?;

        let result = sqlx::query(
            "UPDATE syllabi SET grading = ?, updated_at = ? WHERE id = ? AND owner_id = ?",
        )
        .bind(grading_json)
        .bind(Utc::now())
        .bind(id.to_string())
        .bind(owner_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RevosError::Database(format!("Failed to update grading: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(RevosError::NotFound(format!("Syllabus not found: {}", id)));
        }

        debug!("Replaced grading on syllabus {} for owner {}", id, owner_id);
        Ok(())
    }
}

#[async_trait]
impl UserStore for SqliteStorage {
    async fn insert_user(&self, user: &UserRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RevosError::Database(format!("Failed to store user: {}", e)))?;

        debug!("Stored user {}", user.id);
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RevosError::Database(format!("Failed to get user: {}", e)))?;

        match row {
            Some(row) => Ok(Some(Self::user_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_user_by_identity(&self, identity: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ? OR email = ?")
            .bind(identity)
            .bind(identity)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RevosError::Database(format!("Failed to look up user: {}", e)))?;

        match row {
            Some(row) => Ok(Some(Self::user_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RevosError::Database(format!("Failed to check username: {}", e)))?;

        Ok(row.is_some())
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RevosError::Database(format!("Failed to check email: {}", e)))?;

        Ok(row.is_some())
    }
}

// Helper to share one SQLite handle across both store traits
pub async fn create_storage(config: &StorageConfig) -> Result<Arc<SqliteStorage>> {
    let storage = SqliteStorage::new(config).await?;
    Ok(Arc::new(storage))
}
