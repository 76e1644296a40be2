// ==========================================
// 菜单目录导入引擎 - 补偿日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// 说明: 补偿日志随导入批次一起持久化,供"撤销上次导入"命令回放;
//       撤销命令本身在 importer::coordinator 实现
// ==========================================

use crate::domain::rollback::{ImportBatch, RollbackOp};
use crate::domain::types::{EntityKind, RollbackAction};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};

fn batch_from_row(row: &Row) -> rusqlite::Result<ImportBatch> {
    Ok(ImportBatch {
        batch_id: row.get(0)?,
        business_id: row.get(1)?,
        file_name: row.get(2)?,
        total_rows: row.get(3)?,
        created_count: row.get(4)?,
        updated_count: row.get(5)?,
        undone: row.get(6)?,
        imported_at: row.get(7)?,
        elapsed_ms: row.get(8)?,
    })
}

const BATCH_COLS: &str = "batch_id, business_id, file_name, total_rows, created_count, \
     updated_count, undone, imported_at, elapsed_ms";

// ==========================================
// 事务内函数（与目录写入共享事务）
// ==========================================

/// 在事务中写入批次 + 全部补偿日志条目（seq 即条目顺序）
pub fn insert_batch_with_ops_tx(
    tx: &Transaction,
    batch: &ImportBatch,
    ops: &[RollbackOp],
) -> RepositoryResult<()> {
    tx.execute(
        r#"
        INSERT INTO import_batch (
            batch_id, business_id, file_name, total_rows, created_count,
            updated_count, undone, imported_at, elapsed_ms
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            batch.batch_id,
            batch.business_id,
            batch.file_name,
            batch.total_rows,
            batch.created_count,
            batch.updated_count,
            batch.undone,
            batch.imported_at,
            batch.elapsed_ms,
        ],
    )?;

    let mut stmt = tx.prepare(
        r#"
        INSERT INTO rollback_op (batch_id, seq, entity_type, action, entity_id, previous_data)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )?;
    for (seq, op) in ops.iter().enumerate() {
        stmt.execute(params![
            batch.batch_id,
            seq as i64,
            op.entity_type.to_string(),
            op.action.to_string(),
            op.id,
            op.previous_data.as_ref().map(|v| v.to_string()),
        ])?;
    }
    Ok(())
}

/// 在事务中按写入顺序加载批次的补偿日志
pub fn load_ops_tx(tx: &Transaction, batch_id: &str) -> RepositoryResult<Vec<RollbackOp>> {
    let mut stmt = tx.prepare(
        "SELECT entity_type, action, entity_id, previous_data \
         FROM rollback_op WHERE batch_id = ?1 ORDER BY seq ASC",
    )?;
    let rows = stmt.query_map(params![batch_id], |row| {
        let entity_type: String = row.get(0)?;
        let action: String = row.get(1)?;
        let id: String = row.get(2)?;
        let previous_raw: Option<String> = row.get(3)?;
        Ok((entity_type, action, id, previous_raw))
    })?;

    let mut ops = Vec::new();
    for row in rows {
        let (entity_type, action, id, previous_raw) = row?;
        let entity_type: EntityKind = entity_type
            .parse()
            .map_err(RepositoryError::InternalError)?;
        let action: RollbackAction = action.parse().map_err(RepositoryError::InternalError)?;
        let previous_data = previous_raw
            .map(|s| serde_json::from_str(&s))
            .transpose()?;
        ops.push(RollbackOp {
            entity_type,
            action,
            id,
            previous_data,
        });
    }
    Ok(ops)
}

pub fn get_batch_tx(tx: &Transaction, batch_id: &str) -> RepositoryResult<Option<ImportBatch>> {
    let sql = format!("SELECT {} FROM import_batch WHERE batch_id = ?1", BATCH_COLS);
    let found = tx
        .query_row(&sql, params![batch_id], batch_from_row)
        .optional()?;
    Ok(found)
}

/// 标记批次已撤销
pub fn mark_undone_tx(tx: &Transaction, batch_id: &str) -> RepositoryResult<()> {
    let rows = tx.execute(
        "UPDATE import_batch SET undone = 1 WHERE batch_id = ?1",
        params![batch_id],
    )?;
    if rows == 0 {
        return Err(RepositoryError::NotFound {
            entity: "ImportBatch".to_string(),
            id: batch_id.to_string(),
        });
    }
    Ok(())
}

// ==========================================
// RollbackLogRepository - 连接级查询接口
// ==========================================
pub struct RollbackLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RollbackLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询商户最近的导入批次（新 → 旧）
    pub fn list_recent_batches(
        &self,
        business_id: &str,
        limit: usize,
    ) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM import_batch WHERE business_id = ?1 \
             ORDER BY imported_at DESC LIMIT ?2",
            BATCH_COLS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![business_id, limit as i64], batch_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 查询商户最近一次未撤销的批次
    pub fn latest_active_batch(&self, business_id: &str) -> RepositoryResult<Option<ImportBatch>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM import_batch WHERE business_id = ?1 AND undone = 0 \
             ORDER BY imported_at DESC LIMIT 1",
            BATCH_COLS
        );
        let found = conn
            .query_row(&sql, params![business_id], batch_from_row)
            .optional()?;
        Ok(found)
    }
}
