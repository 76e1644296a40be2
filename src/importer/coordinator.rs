// ==========================================
// 菜单目录导入引擎 - 事务协调器
// ==========================================
// 职责: 整合导入流程,从文件到数据库
// 流程: 解析 → 分类 → 单事务 7 步求解 → 批次/补偿日志持久化 → 提交
//
// 红线:
// - 一次导入 = 一个数据库事务,任一行失败整体 abort,不留半成品
// - 同一商户的并发导入串行化（进程内咨询锁,按 business_id 分桶）
// - 持有连接锁期间不得 await（锁获取在任何 DB 操作之前完成）
// ==========================================

use crate::domain::import_row::ParsedImportData;
use crate::domain::rollback::{ImportBatch, ImportOutcome, RollbackOp};
use crate::domain::types::{EntityKind, RollbackAction};
use crate::importer::catalog_importer_trait::CatalogImporter;
use crate::importer::classifier::RowClassifier;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::CsvParser;
use crate::importer::key_index::NaturalKeyIndex;
use crate::importer::resolver::CatalogResolver;
use crate::repository::{catalog_repo, rollback_log_repo};
use chrono::Utc;
use rusqlite::{Connection, Transaction};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

// ==========================================
// CatalogImportCoordinator - 事务协调器实现
// ==========================================
pub struct CatalogImportCoordinator {
    // 数据库连接（与查询接口共享）
    conn: Arc<Mutex<Connection>>,

    // 商户级咨询锁: business_id → 串行化互斥量
    business_locks: tokio::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,

    // 导入组件
    file_parser: CsvParser,
    classifier: RowClassifier,
}

impl CatalogImportCoordinator {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            business_locks: tokio::sync::Mutex::new(HashMap::new()),
            file_parser: CsvParser,
            classifier: RowClassifier,
        }
    }

    /// 取商户咨询锁句柄（不存在则建）
    async fn business_lock(&self, business_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.business_locks.lock().await;
        locks
            .entry(business_id.to_string())
            .or_default()
            .clone()
    }

    /// 同步执行一次导入（调用方已持有商户咨询锁）
    ///
    /// 分类 → 单事务求解 → 批次/日志落库 → 提交;
    /// 任何 Err 返回前事务随 drop 自动 abort
    fn run_import(
        &self,
        business_id: &str,
        file_name: Option<&str>,
        records: &[HashMap<String, String>],
    ) -> ImportResult<ImportOutcome> {
        // === 分类 + 字段解析（数据库写入前,结构错误在此抛出）===
        let hint = file_name.and_then(RowClassifier::detect_kind_from_filename);
        let parsed = self.classifier.classify(records, hint)?;
        info!(
            total_rows = parsed.total_rows(),
            hint = ?hint,
            "行分类完成,开始事务求解"
        );

        self.save_parsed(business_id, file_name, &parsed)
    }

    /// 已分类数据的事务落库核心（调用方已持有商户咨询锁）
    ///
    /// 单事务 7 步求解 → 批次/日志落库 → 提交
    fn save_parsed(
        &self,
        business_id: &str,
        file_name: Option<&str>,
        parsed: &ParsedImportData,
    ) -> ImportResult<ImportOutcome> {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        let total_rows = parsed.total_rows();

        // === 单事务 7 步求解 ===
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::LockError(e.to_string()))?;
        let tx = conn
            .transaction()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;

        let index = NaturalKeyIndex::build(&tx, business_id)?;
        let resolver = CatalogResolver::new(&tx, business_id, index);
        let rollback_ops = resolver.apply(parsed).map_err(|e| {
            error!(batch_id = %batch_id, error = %e, "求解失败,事务回滚");
            e
        })?;

        // === 批次 + 补偿日志持久化（与目录写入同事务）===
        let created = rollback_ops
            .iter()
            .filter(|op| matches!(op.action, RollbackAction::Create))
            .count();
        let updated = rollback_ops.len() - created;
        let batch = ImportBatch {
            batch_id: batch_id.clone(),
            business_id: business_id.to_string(),
            file_name: file_name.map(|n| n.to_string()),
            total_rows: total_rows as i32,
            created_count: created as i32,
            updated_count: updated as i32,
            undone: false,
            imported_at: Utc::now(),
            elapsed_ms: Some(start_time.elapsed().as_millis() as i32),
        };
        rollback_log_repo::insert_batch_with_ops_tx(&tx, &batch, &rollback_ops)?;

        tx.commit()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;

        let elapsed_time = start_time.elapsed();
        info!(
            batch_id = %batch_id,
            total = total_rows,
            created,
            updated,
            elapsed_ms = elapsed_time.as_millis(),
            "目录导入完成"
        );

        Ok(ImportOutcome {
            batch,
            rollback_ops,
            elapsed_time,
        })
    }

    /// 逆序回放单条补偿日志
    fn replay_op(tx: &Transaction, op: &RollbackOp) -> ImportResult<()> {
        match op.action {
            // create 的撤销 = 删除
            RollbackAction::Create => {
                let deleted = match op.entity_type {
                    EntityKind::Category => catalog_repo::delete_category(tx, &op.id)?,
                    EntityKind::ItemSize => catalog_repo::delete_item_size(tx, &op.id)?,
                    EntityKind::ModifierGroup => catalog_repo::delete_modifier_group(tx, &op.id)?,
                    EntityKind::Modifier => catalog_repo::delete_modifier(tx, &op.id)?,
                    EntityKind::Item => catalog_repo::delete_item(tx, &op.id)?,
                    EntityKind::ItemModifierOverride => {
                        return Err(ImportError::InternalError(
                            "补偿日志不应出现覆盖类条目".to_string(),
                        ));
                    }
                };
                if deleted == 0 {
                    debug!(entity = %op.entity_type, id = %op.id, "撤销删除: 实体已不存在,跳过");
                }
            }
            // update 的撤销 = 用更新前快照整体恢复
            RollbackAction::Update => {
                let data = op.previous_data.clone().ok_or_else(|| {
                    ImportError::InternalError(format!(
                        "update 条目缺少快照: {} {}",
                        op.entity_type, op.id
                    ))
                })?;
                match op.entity_type {
                    EntityKind::Category => {
                        catalog_repo::update_category(tx, &serde_json::from_value(data)?)?
                    }
                    EntityKind::ItemSize => {
                        catalog_repo::update_item_size(tx, &serde_json::from_value(data)?)?
                    }
                    EntityKind::ModifierGroup => {
                        catalog_repo::update_modifier_group(tx, &serde_json::from_value(data)?)?
                    }
                    EntityKind::Modifier => {
                        catalog_repo::update_modifier(tx, &serde_json::from_value(data)?)?
                    }
                    EntityKind::Item => {
                        catalog_repo::update_item(tx, &serde_json::from_value(data)?)?
                    }
                    EntityKind::ItemModifierOverride => {
                        return Err(ImportError::InternalError(
                            "补偿日志不应出现覆盖类条目".to_string(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// 同步执行撤销（调用方已持有商户咨询锁）
    fn run_undo(&self, batch_id: &str) -> ImportResult<ImportBatch> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::LockError(e.to_string()))?;
        let tx = conn
            .transaction()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;

        let mut batch = rollback_log_repo::get_batch_tx(&tx, batch_id)?
            .ok_or_else(|| ImportError::BatchNotFound(batch_id.to_string()))?;
        if batch.undone {
            return Err(ImportError::BatchAlreadyUndone(batch_id.to_string()));
        }

        let ops = rollback_log_repo::load_ops_tx(&tx, batch_id)?;
        // 逆序回放: 后写入的实体先撤销（满足外键依赖方向）
        for op in ops.iter().rev() {
            Self::replay_op(&tx, op)?;
        }
        rollback_log_repo::mark_undone_tx(&tx, batch_id)?;

        tx.commit()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;

        batch.undone = true;
        info!(batch_id = %batch_id, ops = ops.len(), "导入批次撤销完成");
        Ok(batch)
    }
}

#[async_trait::async_trait]
impl CatalogImporter for CatalogImportCoordinator {
    #[instrument(skip(self, file_path), fields(business_id = %business_id))]
    async fn import_from_csv<P: AsRef<Path> + Send>(
        &self,
        business_id: &str,
        file_path: P,
    ) -> ImportResult<ImportOutcome> {
        let path = file_path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string());

        // 解析不持锁（纯文件 IO）
        let records = self.file_parser.parse_to_raw_records(path)?;

        let lock = self.business_lock(business_id).await;
        let _guard = lock.lock().await;
        self.run_import(business_id, file_name.as_deref(), &records)
    }

    #[instrument(skip(self, buffer), fields(business_id = %business_id, source = %source_name))]
    async fn import_buffer(
        &self,
        business_id: &str,
        buffer: &[u8],
        source_name: &str,
    ) -> ImportResult<ImportOutcome> {
        let records = self.file_parser.parse_buffer(buffer, source_name)?;

        let lock = self.business_lock(business_id).await;
        let _guard = lock.lock().await;
        self.run_import(business_id, Some(source_name), &records)
    }

    #[instrument(skip(self, parsed), fields(business_id = %business_id))]
    async fn save_all(
        &self,
        business_id: &str,
        parsed: &ParsedImportData,
    ) -> ImportResult<Vec<RollbackOp>> {
        let lock = self.business_lock(business_id).await;
        let _guard = lock.lock().await;
        let outcome = self.save_parsed(business_id, None, parsed)?;
        Ok(outcome.rollback_ops)
    }

    #[instrument(skip(self))]
    async fn undo_import(&self, batch_id: &str) -> ImportResult<ImportBatch> {
        // 撤销按批次归属商户串行化（批次查询需先进事务,锁在连接级已足够）
        self.run_undo(batch_id)
    }
}
