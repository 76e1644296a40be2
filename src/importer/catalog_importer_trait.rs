// ==========================================
// 菜单目录导入引擎 - 目录导入 Trait
// ==========================================
// 职责: 定义目录导入接口（不包含实现）
// ==========================================

use crate::domain::import_row::ParsedImportData;
use crate::domain::rollback::{ImportBatch, ImportOutcome, RollbackOp};
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// CatalogImporter Trait
// ==========================================
// 用途: 目录导入主接口
// 实现者: CatalogImportCoordinator
#[async_trait]
pub trait CatalogImporter: Send + Sync {
    /// 从 CSV 文件导入目录数据
    ///
    /// # 参数
    /// - business_id: 商户 ID
    /// - file_path: CSV 文件路径（.csv）
    ///
    /// # 返回
    /// - Ok(ImportOutcome): 批次信息 + 补偿日志
    /// - Err: 文件错误、引用完整性错误、数据库错误
    ///
    /// # 导入流程
    /// 1. 文件解析（表头小写化,单元格 trim,空行跳过）
    /// 2. 行分类（文件名提示短路,否则启发式规则表）+ 字段解析
    /// 3. 单事务内按依赖顺序落库（7 步求解）
    /// 4. 批次 + 补偿日志持久化,提交
    async fn import_from_csv<P: AsRef<Path> + Send>(
        &self,
        business_id: &str,
        file_path: P,
    ) -> ImportResult<ImportOutcome>;

    /// 导入内存中的文件内容（上传场景）
    ///
    /// # 参数
    /// - business_id: 商户 ID
    /// - buffer: 文件内容（UTF-8 CSV）
    /// - source_name: 来源文件名（用于类别提示与批次记录）
    async fn import_buffer(
        &self,
        business_id: &str,
        buffer: &[u8],
        source_name: &str,
    ) -> ImportResult<ImportOutcome>;

    /// 落库已分类的实体批次（调用方自行解析/拆批的场景）
    ///
    /// # 参数
    /// - business_id: 商户 ID
    /// - parsed: 已分类的六类实体行列表
    ///
    /// # 返回
    /// - Ok(Vec<RollbackOp>): 本次提交的补偿日志（逐条变更,含更新前快照）
    /// - Err: 引用完整性错误、数据库错误（事务已 abort）
    ///
    /// # 事务语义
    /// 与 import_* 相同: 单事务按依赖顺序 7 步求解,批次 + 补偿日志
    /// 与目录写入同事务持久化,提交后返回
    async fn save_all(
        &self,
        business_id: &str,
        parsed: &ParsedImportData,
    ) -> ImportResult<Vec<RollbackOp>>;

    /// 撤销一次已提交的导入批次
    ///
    /// # 参数
    /// - batch_id: 批次 ID
    ///
    /// # 返回
    /// - Ok(ImportBatch): 撤销后的批次信息（undone = true）
    /// - Err(BatchNotFound): 批次不存在
    /// - Err(BatchAlreadyUndone): 批次已撤销过
    ///
    /// # 回放语义
    /// 逆序回放补偿日志: create → 删除该实体,update → 用快照整体恢复;
    /// 整个回放在单事务内完成
    async fn undo_import(&self, batch_id: &str) -> ImportResult<ImportBatch>;
}
