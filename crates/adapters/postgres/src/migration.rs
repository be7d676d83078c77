//! PostgreSQL 迁移管理模块

use sqlx::PgPool;
use tracing::info;
use vita_errors::{AppError, AppResult};

/// 迁移记录
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    /// 迁移版本
    pub version: i64,
    /// 迁移名称
    pub name: String,
    /// 应用时间
    pub applied_at: chrono::DateTime<chrono::Utc>,
}

/// 迁移定义
#[derive(Debug, Clone)]
pub struct Migration {
    /// 版本号
    pub version: i64,
    /// 名称
    pub name: String,
    /// 升级 SQL
    pub up_sql: String,
}

impl Migration {
    /// 创建新的迁移
    pub fn new(version: i64, name: impl Into<String>, up_sql: impl Into<String>) -> Self {
        Self {
            version,
            name: name.into(),
            up_sql: up_sql.into(),
        }
    }
}

/// 迁移管理器
pub struct MigrationManager {
    pool: PgPool,
    table_name: String,
}

impl MigrationManager {
    /// 创建新的迁移管理器
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table_name: "_migrations".to_string(),
        }
    }

    /// 设置迁移表名
    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }

    /// 初始化迁移表
    pub async fn init(&self) -> AppResult<()> {
        let create_sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            self.table_name
        );

        sqlx::query(&create_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to create migration table: {}", e)))?;

        info!(table = %self.table_name, "Migration table initialized");
        Ok(())
    }

    /// 获取已应用的迁移
    pub async fn get_applied_migrations(&self) -> AppResult<Vec<MigrationRecord>> {
        let sql = format!(
            "SELECT version, name, applied_at FROM {} ORDER BY version ASC",
            self.table_name
        );

        let records = sqlx::query_as::<_, MigrationRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get migrations: {}", e)))?;

        Ok(records)
    }

    /// 应用所有未执行的迁移
    pub async fn apply(&self, migrations: &[Migration]) -> AppResult<()> {
        self.init().await?;

        let applied: Vec<i64> = self
            .get_applied_migrations()
            .await?
            .into_iter()
            .map(|r| r.version)
            .collect();

        for migration in migrations {
            if applied.contains(&migration.version) {
                continue;
            }

            let mut tx = self.pool.begin().await.map_err(|e| {
                AppError::database(format!("Failed to begin migration tx: {}", e))
            })?;

            sqlx::query(&migration.up_sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::database(format!(
                        "Migration {} ({}) failed: {}",
                        migration.version, migration.name, e
                    ))
                })?;

            let record_sql = format!(
                "INSERT INTO {} (version, name) VALUES ($1, $2)",
                self.table_name
            );
            sqlx::query(&record_sql)
                .bind(migration.version)
                .bind(&migration.name)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::database(format!("Failed to record migration: {}", e))
                })?;

            tx.commit()
                .await
                .map_err(|e| AppError::database(format!("Failed to commit migration: {}", e)))?;

            info!(version = migration.version, name = %migration.name, "Migration applied");
        }

        Ok(())
    }
}
