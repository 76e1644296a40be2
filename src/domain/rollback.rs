// ==========================================
// 菜单目录导入引擎 - 补偿日志与导入批次
// ==========================================
// 范围: RollbackOp / ImportBatch / ImportOutcome
// 红线: 补偿日志是事务提交后的撤销依据,不是事务内回滚机制
//       （事务内回滚由数据库 abort 完成,日志随之作废丢弃）
// ==========================================

use crate::domain::types::{EntityKind, RollbackAction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ==========================================
// RollbackOp - 补偿日志条目
// ==========================================
// 每次落库变更产生一条:
// - create: 撤销 = 删除 id 对应实体（previous_data 为空）
// - update: 撤销 = 用 previous_data 快照整体恢复
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackOp {
    pub entity_type: EntityKind,
    pub action: RollbackAction,
    pub id: String, // 被变更实体的 UUID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_data: Option<serde_json::Value>, // 更新前整体快照（仅 update）
}

impl RollbackOp {
    pub fn create(entity_type: EntityKind, id: impl Into<String>) -> Self {
        Self {
            entity_type,
            action: RollbackAction::Create,
            id: id.into(),
            previous_data: None,
        }
    }

    pub fn update(
        entity_type: EntityKind,
        id: impl Into<String>,
        previous_data: serde_json::Value,
    ) -> Self {
        Self {
            entity_type,
            action: RollbackAction::Update,
            id: id.into(),
            previous_data: Some(previous_data),
        }
    }
}

// ==========================================
// ImportBatch - 导入批次
// ==========================================
// 用途: 批次元信息 + 持久化补偿日志的归属单位
// 对齐: schema.rs import_batch 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String, // 批次 ID（UUID）
    pub business_id: String,
    pub file_name: Option<String>, // 源文件名
    pub total_rows: i32,           // 解析出的总行数（六类合计）
    pub created_count: i32,        // 新建实体数
    pub updated_count: i32,        // 更新实体数
    pub undone: bool,              // 是否已被撤销
    pub imported_at: DateTime<Utc>,
    pub elapsed_ms: Option<i32>,
}

// ==========================================
// ImportOutcome - 导入结果汇总
// ==========================================
// 返回给调用方: 批次信息 + 补偿日志
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub batch: ImportBatch,
    pub rollback_ops: Vec<RollbackOp>,
    pub elapsed_time: Duration,
}

impl ImportOutcome {
    /// 新建实体数（按补偿日志统计）
    pub fn created(&self) -> usize {
        self.rollback_ops
            .iter()
            .filter(|op| matches!(op.action, RollbackAction::Create))
            .count()
    }

    /// 更新实体数（按补偿日志统计）
    pub fn updated(&self) -> usize {
        self.rollback_ops
            .iter()
            .filter(|op| matches!(op.action, RollbackAction::Update))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollback_op_create_has_no_snapshot() {
        let op = RollbackOp::create(EntityKind::Category, "cat-1");
        assert_eq!(op.action, RollbackAction::Create);
        assert!(op.previous_data.is_none());
    }

    #[test]
    fn test_rollback_op_serde_shape() {
        let op = RollbackOp::update(
            EntityKind::Item,
            "item-1",
            serde_json::json!({ "name": "Burger", "base_price": 12.5 }),
        );
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["entity_type"], "item");
        assert_eq!(json["action"], "update");
        assert_eq!(json["previous_data"]["base_price"], 12.5);
    }
}
