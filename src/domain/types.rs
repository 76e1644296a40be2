// ==========================================
// 菜单目录导入引擎 - 领域类型定义
// ==========================================
// 范围: 实体类别枚举与补偿动作枚举
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 实体类别 (Entity Kind)
// ==========================================
// 红线: 六类实体,分类器输出只能是这六类之一
// 序列化格式: snake_case (与回滚日志 entity_type 字段一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Category,              // 菜单分类
    Item,                  // 菜品
    ItemSize,              // 规格（份量）
    ModifierGroup,         // 加料组
    Modifier,              // 加料项
    ItemModifierOverride,  // 菜品-加料组-加料项 关联（非独立落库实体）
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Category => write!(f, "category"),
            EntityKind::Item => write!(f, "item"),
            EntityKind::ItemSize => write!(f, "item_size"),
            EntityKind::ModifierGroup => write!(f, "modifier_group"),
            EntityKind::Modifier => write!(f, "modifier"),
            EntityKind::ItemModifierOverride => write!(f, "item_modifier_override"),
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    /// 解析补偿日志 entity_type 列的存储标签（与 Display 互逆）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "category" => Ok(EntityKind::Category),
            "item" => Ok(EntityKind::Item),
            "item_size" => Ok(EntityKind::ItemSize),
            "modifier_group" => Ok(EntityKind::ModifierGroup),
            "modifier" => Ok(EntityKind::Modifier),
            "item_modifier_override" => Ok(EntityKind::ItemModifierOverride),
            other => Err(format!("未知实体类型: {}", other)),
        }
    }
}

impl EntityKind {
    /// 解析通用格式 CSV 的 `type` 列取值（CATEGORY/ITEM/SIZE/MOD_GROUP/MODIFIER）
    ///
    /// # 返回
    /// - Some(kind): 识别成功
    /// - None: 未知类型（该行跳过）
    pub fn from_type_column(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "CATEGORY" => Some(EntityKind::Category),
            "ITEM" => Some(EntityKind::Item),
            "SIZE" => Some(EntityKind::ItemSize),
            "MOD_GROUP" => Some(EntityKind::ModifierGroup),
            "MODIFIER" => Some(EntityKind::Modifier),
            _ => None,
        }
    }
}

// ==========================================
// 回滚动作 (Rollback Action)
// ==========================================
// 用途: 补偿日志条目的动作类型
// - Create: 本次导入新建（撤销 = 删除该实体）
// - Update: 本次导入更新（撤销 = 用 previous_data 恢复）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackAction {
    Create,
    Update,
}

impl fmt::Display for RollbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollbackAction::Create => write!(f, "create"),
            RollbackAction::Update => write!(f, "update"),
        }
    }
}

impl std::str::FromStr for RollbackAction {
    type Err = String;

    /// 解析补偿日志 action 列的存储标签（与 Display 互逆）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(RollbackAction::Create),
            "update" => Ok(RollbackAction::Update),
            other => Err(format!("未知回滚动作: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_from_type_column() {
        assert_eq!(
            EntityKind::from_type_column("CATEGORY"),
            Some(EntityKind::Category)
        );
        assert_eq!(
            EntityKind::from_type_column("mod_group"),
            Some(EntityKind::ModifierGroup)
        );
        assert_eq!(
            EntityKind::from_type_column(" size "),
            Some(EntityKind::ItemSize)
        );
        assert_eq!(EntityKind::from_type_column("COMBO"), None);
    }

    #[test]
    fn test_entity_kind_display_matches_rollback_log() {
        assert_eq!(EntityKind::ItemSize.to_string(), "item_size");
        assert_eq!(EntityKind::ModifierGroup.to_string(), "modifier_group");
    }

    #[test]
    fn test_rollback_action_serde_snake_case() {
        let json = serde_json::to_string(&RollbackAction::Create).unwrap();
        assert_eq!(json, "\"create\"");
    }

    #[test]
    fn test_storage_tag_parse_inverts_display() {
        for kind in [
            EntityKind::Category,
            EntityKind::Item,
            EntityKind::ItemSize,
            EntityKind::ModifierGroup,
            EntityKind::Modifier,
            EntityKind::ItemModifierOverride,
        ] {
            assert_eq!(kind.to_string().parse::<EntityKind>(), Ok(kind));
        }
        assert!("combo".parse::<EntityKind>().is_err());

        assert_eq!("create".parse::<RollbackAction>(), Ok(RollbackAction::Create));
        assert_eq!("update".parse::<RollbackAction>(), Ok(RollbackAction::Update));
        assert!("delete".parse::<RollbackAction>().is_err());
    }
}
