//! SQLite-backed document store emulator
//!
//! An account is a single database file addressed as `sqlite://<path>`. Keys
//! and trusted identity tokens are stored as Argon2 hashes, documents as JSON
//! text with an insertion sequence that fixes query order.

use super::auth::{ClientCredential, Presented};
use super::{
    CreateOutcome, Document, DocumentClient, DocumentStream, Query, StoreConnector, StoreError,
    document_id, partition_key_value,
};
use crate::credential::CredentialMaterial;
use crate::security::SecureString;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use futures::StreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

const URI_SCHEME: &str = "sqlite://";

const KIND_KEY: &str = "key";
const KIND_IDENTITY: &str = "identity";

/// Connector for file-backed accounts
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteStore;

impl SqliteStore {
    pub fn new() -> Self {
        Self
    }

    /// The account URI addressing the file at `path`
    pub fn account_uri(path: &Path) -> String {
        format!("{URI_SCHEME}{}", path.display())
    }

    /// Create the account file if needed and accept `key` on it
    pub async fn init_account(path: &Path, key: &SecureString) -> Result<(), StoreError> {
        let pool = open_for_admin(path).await?;
        add_credential(&pool, KIND_KEY, key).await?;
        log::info!("Initialized store account at {}", path.display());
        pool.close().await;
        Ok(())
    }

    /// Accept identity tokens equal to `token` on the account at `path`
    pub async fn trust_identity(path: &Path, token: &SecureString) -> Result<(), StoreError> {
        let pool = open_for_admin(path).await?;
        add_credential(&pool, KIND_IDENTITY, token).await?;
        log::info!("Trusted an identity on store account {}", path.display());
        pool.close().await;
        Ok(())
    }
}

/// Path of the account file named by a `sqlite://` URI
fn account_path(account_uri: &str) -> Result<PathBuf, StoreError> {
    account_uri
        .trim()
        .strip_prefix(URI_SCHEME)
        .filter(|rest| !rest.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| {
            StoreError::BadRequest(format!(
                "'{account_uri}' is not a {URI_SCHEME}<path> account URI"
            ))
        })
}

async fn open_for_admin(path: &Path) -> Result<SqlitePool, StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::Other(format!("Failed to create {}: {e}", parent.display())))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(map_sqlx)?;

    initialize_schema(&pool).await?;
    Ok(pool)
}

async fn initialize_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    let schema = r#"
        CREATE TABLE IF NOT EXISTS account_credentials (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL CHECK (kind IN ('key', 'identity')),
            hash TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS databases (
            name TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS containers (
            database_name TEXT NOT NULL REFERENCES databases(name) ON DELETE CASCADE,
            name TEXT NOT NULL,
            partition_key_path TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            PRIMARY KEY (database_name, name)
        );

        CREATE TABLE IF NOT EXISTS documents (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            database_name TEXT NOT NULL,
            container_name TEXT NOT NULL,
            id TEXT NOT NULL,
            partition_key TEXT NOT NULL,
            body TEXT NOT NULL,
            UNIQUE(database_name, container_name, id),
            FOREIGN KEY (database_name, container_name)
                REFERENCES containers(database_name, name) ON DELETE CASCADE
        );
    "#;

    sqlx::raw_sql(schema)
        .execute(pool)
        .await
        .map_err(|e| StoreError::Other(format!("Failed to initialize store schema: {e}")))?;
    Ok(())
}

fn hasher() -> Argon2<'static> {
    // Light parameters: these hashes gate an emulator, not user passwords
    let params = Params::new(4096, 1, 1, None).unwrap_or_default();
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

async fn add_credential(
    pool: &SqlitePool,
    kind: &str,
    secret: &SecureString,
) -> Result<(), StoreError> {
    if secret.is_blank() {
        return Err(StoreError::BadRequest(format!("refusing to store a blank {kind}")));
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| StoreError::Other(format!("Failed to hash {kind}: {e}")))?
        .to_string();

    sqlx::query("INSERT INTO account_credentials (kind, hash, created_at) VALUES (?, ?, ?)")
        .bind(kind)
        .bind(hash)
        .bind(now_millis())
        .execute(pool)
        .await
        .map_err(map_sqlx)?;
    Ok(())
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn map_sqlx(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Io(e) => StoreError::Unreachable(e.to_string()),
        sqlx::Error::PoolTimedOut => StoreError::Unreachable("connection pool timed out".into()),
        sqlx::Error::PoolClosed => StoreError::Unreachable("connection pool closed".into()),
        sqlx::Error::Database(e) if e.is_unique_violation() => StoreError::Conflict(e.to_string()),
        other => StoreError::Other(other.to_string()),
    }
}

#[async_trait]
impl StoreConnector for SqliteStore {
    async fn connect(
        &self,
        account_uri: &str,
        material: CredentialMaterial,
    ) -> Result<Arc<dyn DocumentClient>, StoreError> {
        let path = account_path(account_uri)?;
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(false)
            .foreign_keys(true);
        // Nothing is opened until the first request
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_lazy_with(options);

        log::debug!(
            "SQLite store client for {} using {}",
            path.display(),
            material.kind()
        );
        Ok(Arc::new(SqliteClient {
            pool,
            path,
            credential: ClientCredential::new(material),
            verified: Mutex::new(None),
        }))
    }
}

struct SqliteClient {
    pool: SqlitePool,
    path: PathBuf,
    credential: ClientCredential,
    /// Last presented secret that matched a stored hash
    verified: Mutex<Option<SecureString>>,
}

impl SqliteClient {
    async fn authorize(&self) -> Result<(), StoreError> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Err(StoreError::Unreachable(format!(
                "no store answering at {}",
                self.path.display()
            )));
        }

        // Presented on every request so an expired token is exchanged again
        let (kind, secret) = match self.credential.present().await? {
            Presented::Key(key) => (KIND_KEY, key.clone()),
            Presented::Token(token) => (KIND_IDENTITY, token),
        };
        if self.verified.lock().await.as_ref() == Some(&secret) {
            return Ok(());
        }

        let hashes: Vec<String> =
            sqlx::query_scalar("SELECT hash FROM account_credentials WHERE kind = ?")
                .bind(kind)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx)?;

        let candidate = secret.clone();
        let accepted = tokio::task::spawn_blocking(move || {
            hashes.iter().any(|stored| {
                PasswordHash::new(stored)
                    .map(|parsed| hasher().verify_password(candidate.as_bytes(), &parsed).is_ok())
                    .unwrap_or(false)
            })
        })
        .await
        .map_err(|e| StoreError::Other(format!("credential check failed: {e}")))?;

        if !accepted {
            return Err(StoreError::Unauthorized(format!(
                "credentials rejected by {}",
                self.path.display()
            )));
        }
        *self.verified.lock().await = Some(secret);
        Ok(())
    }

    /// Partition key path of an existing container
    async fn container_key(&self, database: &str, container: &str) -> Result<String, StoreError> {
        sqlx::query_scalar(
            "SELECT partition_key_path FROM containers WHERE database_name = ? AND name = ?",
        )
        .bind(database)
        .bind(container)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?
        .ok_or_else(|| {
            StoreError::Other(format!(
                "container '{container}' does not exist in database '{database}'"
            ))
        })
    }
}

/// Partition key value as stored in the `partition_key` column
fn partition_column(document: &Document, path: &str) -> Result<String, StoreError> {
    Ok(partition_key_value(document, path)?.to_string())
}

#[async_trait]
impl DocumentClient for SqliteClient {
    async fn create_database_if_not_exists(
        &self,
        database: &str,
    ) -> Result<CreateOutcome, StoreError> {
        self.authorize().await?;
        let result = sqlx::query(
            "INSERT INTO databases (name, created_at) VALUES (?, ?) ON CONFLICT(name) DO NOTHING",
        )
        .bind(database)
        .bind(now_millis())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(if result.rows_affected() == 1 {
            CreateOutcome::Created
        } else {
            CreateOutcome::Existed
        })
    }

    async fn create_container_if_not_exists(
        &self,
        database: &str,
        container: &str,
        partition_key_path: &str,
    ) -> Result<CreateOutcome, StoreError> {
        self.authorize().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM databases WHERE name = ?")
            .bind(database)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        if exists.is_none() {
            return Err(StoreError::NotFound(format!("database '{database}'")));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO containers (database_name, name, partition_key_path, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(database_name, name) DO NOTHING
            "#,
        )
        .bind(database)
        .bind(container)
        .bind(partition_key_path)
        .bind(now_millis())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        if result.rows_affected() == 1 {
            return Ok(CreateOutcome::Created);
        }

        let existing = self.container_key(database, container).await?;
        if existing != partition_key_path {
            return Err(StoreError::Conflict(format!(
                "container '{container}' is partitioned on {existing}, requested {partition_key_path}"
            )));
        }
        Ok(CreateOutcome::Existed)
    }

    async fn create_document(
        &self,
        database: &str,
        container: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        self.authorize().await?;
        let key_path = self.container_key(database, container).await?;
        let id = document_id(&document)?;
        let partition = partition_column(&document, &key_path)?;

        sqlx::query(
            r#"
            INSERT INTO documents (database_name, container_name, id, partition_key, body)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(database)
        .bind(container)
        .bind(id)
        .bind(partition)
        .bind(document.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn read_document(
        &self,
        database: &str,
        container: &str,
        id: &str,
    ) -> Result<Document, StoreError> {
        self.authorize().await?;
        self.container_key(database, container).await?;

        let row = sqlx::query(
            "SELECT body FROM documents WHERE database_name = ? AND container_name = ? AND id = ?",
        )
        .bind(database)
        .bind(container)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?
        .ok_or_else(|| StoreError::NotFound(format!("document '{id}'")))?;

        let body: String = row.get("body");
        serde_json::from_str(&body)
            .map_err(|e| StoreError::Other(format!("stored document '{id}' is corrupt: {e}")))
    }

    async fn replace_document(
        &self,
        database: &str,
        container: &str,
        id: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        self.authorize().await?;
        let key_path = self.container_key(database, container).await?;
        if document_id(&document)? != id {
            return Err(StoreError::BadRequest(format!(
                "replacement body does not carry id '{id}'"
            )));
        }
        let partition = partition_column(&document, &key_path)?;

        let result = sqlx::query(
            r#"
            UPDATE documents SET body = ?, partition_key = ?
            WHERE database_name = ? AND container_name = ? AND id = ?
            "#,
        )
        .bind(document.to_string())
        .bind(partition)
        .bind(database)
        .bind(container)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("document '{id}'")));
        }
        Ok(())
    }

    async fn delete_document(
        &self,
        database: &str,
        container: &str,
        id: &str,
    ) -> Result<(), StoreError> {
        self.authorize().await?;
        self.container_key(database, container).await?;

        let result = sqlx::query(
            "DELETE FROM documents WHERE database_name = ? AND container_name = ? AND id = ?",
        )
        .bind(database)
        .bind(container)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("document '{id}'")));
        }
        Ok(())
    }

    async fn query_documents(
        &self,
        database: &str,
        container: &str,
        query: &str,
    ) -> Result<DocumentStream, StoreError> {
        self.authorize().await?;
        self.container_key(database, container).await?;
        let query = Query::parse(query)?;

        let bodies: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT body FROM documents
            WHERE database_name = ? AND container_name = ?
            ORDER BY seq
            "#,
        )
        .bind(database)
        .bind(container)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        let documents = bodies
            .iter()
            .map(|body| serde_json::from_str::<Document>(body))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Other(format!("stored document is corrupt: {e}")))?;

        let results = query.execute(documents.iter());
        Ok(futures::stream::iter(results.into_iter().map(Ok)).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use serde_json::json;
    use tempfile::TempDir;

    async fn account(dir: &TempDir, key: &str) -> (String, PathBuf) {
        let path = dir.path().join("account.db");
        SqliteStore::init_account(&path, &SecureString::new(key))
            .await
            .unwrap();
        (SqliteStore::account_uri(&path), path)
    }

    async fn client(uri: &str, key: &str) -> Arc<dyn DocumentClient> {
        SqliteStore::new()
            .connect(uri, CredentialMaterial::SharedKey(SecureString::new(key)))
            .await
            .unwrap()
    }

    #[test]
    fn test_account_path() {
        assert_eq!(
            account_path("sqlite:///tmp/a.db").unwrap(),
            PathBuf::from("/tmp/a.db")
        );
        assert!(account_path("memory://x").is_err());
        assert!(account_path("sqlite://").is_err());
    }

    #[tokio::test]
    async fn test_key_is_hashed_at_rest() {
        let dir = TempDir::new().unwrap();
        let (_, path) = account(&dir, "very-secret-key").await;

        let raw = std::fs::read(&path).unwrap();
        let needle = b"very-secret-key";
        assert!(!raw.windows(needle.len()).any(|w| w == needle));
    }

    #[tokio::test]
    async fn test_wrong_key_rejected() {
        let dir = TempDir::new().unwrap();
        let (uri, _) = account(&dir, "k1").await;
        let err = client(&uri, "k2")
            .await
            .create_database_if_not_exists("Tasks")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_missing_file_is_unreachable() {
        let dir = TempDir::new().unwrap();
        let uri = SqliteStore::account_uri(&dir.path().join("absent.db"));
        let err = client(&uri, "k1")
            .await
            .create_database_if_not_exists("Tasks")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_provisioning_and_documents_persist() {
        let dir = TempDir::new().unwrap();
        let (uri, _) = account(&dir, "k1").await;

        {
            let c = client(&uri, "k1").await;
            assert_eq!(
                c.create_database_if_not_exists("Tasks").await.unwrap(),
                CreateOutcome::Created
            );
            assert_eq!(
                c.create_container_if_not_exists("Tasks", "Items", "/id")
                    .await
                    .unwrap(),
                CreateOutcome::Created
            );
            c.create_document("Tasks", "Items", json!({"id": "2", "name": "Bread"}))
                .await
                .unwrap();
            c.create_document("Tasks", "Items", json!({"id": "1", "name": "Milk"}))
                .await
                .unwrap();
            assert!(matches!(
                c.create_document("Tasks", "Items", json!({"id": "1"})).await,
                Err(StoreError::Conflict(_))
            ));
        }

        let c = client(&uri, "k1").await;
        assert_eq!(
            c.create_database_if_not_exists("Tasks").await.unwrap(),
            CreateOutcome::Existed
        );
        assert!(matches!(
            c.create_container_if_not_exists("Tasks", "Items", "/name").await,
            Err(StoreError::Conflict(_))
        ));

        c.replace_document("Tasks", "Items", "2", json!({"id": "2", "name": "Rye"}))
            .await
            .unwrap();
        let names: Vec<String> = c
            .query_documents("Tasks", "Items", "SELECT * FROM c")
            .await
            .unwrap()
            .map_ok(|doc| doc["name"].as_str().unwrap_or_default().to_string())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(names, vec!["Rye", "Milk"]);

        c.delete_document("Tasks", "Items", "1").await.unwrap();
        assert!(matches!(
            c.read_document("Tasks", "Items", "1").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_query_after_rejected_key() {
        let dir = TempDir::new().unwrap();
        let (uri, _) = account(&dir, "k1").await;
        let c = client(&uri, "k1").await;
        c.create_database_if_not_exists("Tasks").await.unwrap();
        c.create_container_if_not_exists("Tasks", "Items", "/id")
            .await
            .unwrap();

        assert!(matches!(
            client(&uri, "k2")
                .await
                .query_documents("Tasks", "Items", "DROP c")
                .await,
            Err(StoreError::Unauthorized(_))
        ));
        assert!(matches!(
            c.query_documents("Tasks", "Items", "DROP c").await,
            Err(StoreError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_trusted_identity_token() {
        let dir = TempDir::new().unwrap();
        let (uri, path) = account(&dir, "k1").await;
        SqliteStore::trust_identity(&path, &SecureString::new("tok"))
            .await
            .unwrap();

        let c = client(&uri, "tok").await;
        // A token value presented as a key does not match identity hashes
        assert!(matches!(
            c.create_database_if_not_exists("Tasks").await,
            Err(StoreError::Unauthorized(_))
        ));
    }
}
