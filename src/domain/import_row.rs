// ==========================================
// 菜单目录导入引擎 - 导入行中间结构体
// ==========================================
// 用途: 导入管道中间产物（文件解析 → 分类 → 字段解析 → 此结构）
// 生命周期: 仅在导入流程内,不落库
// ==========================================

use crate::domain::catalog::PriceBySizeCode;
use serde::{Deserialize, Serialize};

// ==========================================
// CategoryRow - 分类导入行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRow {
    pub name: String,
    pub description: Option<String>,
    pub sort_order: Option<i64>,
    pub is_active: Option<bool>,

    // 元信息
    pub row_number: usize, // 原始文件行号
}

// ==========================================
// ItemSizeRow - 规格导入行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSizeRow {
    pub code: String,
    pub name: Option<String>,
    pub display_order: Option<i64>,
    pub is_active: Option<bool>,

    pub row_number: usize,
}

// ==========================================
// ModifierGroupRow - 加料组导入行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifierGroupRow {
    pub name: String,
    pub display_name: Option<String>,
    pub display_type: Option<String>,
    pub min_select: Option<i64>,
    pub max_select: Option<i64>,
    pub sort_order: Option<i64>,
    pub is_active: Option<bool>,

    // 定价子文档（JSON 列,导入行里规格以 code 引用）
    pub quantity_levels: Option<serde_json::Value>,
    pub prices_by_size: Option<Vec<PriceBySizeCode>>,

    pub row_number: usize,
}

// ==========================================
// ModifierRow - 加料项导入行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifierRow {
    pub group_key: String, // 所属加料组的自然键（组名）
    pub name: String,
    pub modifier_key: Option<String>, // 显式加料项键（缺省时用 name）
    pub display_order: Option<i64>,
    pub is_active: Option<bool>,
    pub max_quantity: Option<i64>,

    pub row_number: usize,
}

impl ModifierRow {
    /// 加料项键: 显式 modifier_key 优先,否则退回 name
    pub fn key(&self) -> &str {
        self.modifier_key.as_deref().unwrap_or(&self.name)
    }
}

// ==========================================
// ItemRow - 菜品导入行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRow {
    pub name: String,
    pub category_id: Option<String>,   // 显式分类 id（给定时优先）
    pub category_name: Option<String>, // 分类自然键（缺省 id 时使用）
    pub description: Option<String>,
    pub sort_order: Option<i64>,
    pub is_active: Option<bool>,

    // 定价/规格字段（仅新建时生效,更新不覆盖）
    pub base_price: Option<f64>,
    pub is_sizeable: Option<bool>,
    pub default_size_code: Option<String>, // 默认规格 code（显式列,见设计决策）

    pub row_number: usize,
}

// ==========================================
// ItemModifierOverrideRow - 菜品加料覆盖行
// ==========================================
// 三元自然键 (item_key, group_key, modifier_key)
// 不独立落库,最终物化进 item.modifier_groups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemModifierOverrideRow {
    pub item_key: String,     // 菜品自然键（菜品名,归一化后匹配）
    pub group_key: String,    // 加料组自然键
    pub modifier_key: String, // 加料项自然键

    pub prices_by_size: Option<Vec<PriceBySizeCode>>,
    pub quantity_levels: Option<serde_json::Value>,

    pub row_number: usize,
}

// ==========================================
// ParsedImportData - 分类解析完成的实体批次
// ==========================================
// 六个有序列表,顺序即文件内出现顺序
// 后续求解器严格按 Categories → Sizes → Groups → Modifiers → Items → 默认规格 → 覆盖装配 处理
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedImportData {
    pub categories: Vec<CategoryRow>,
    pub items: Vec<ItemRow>,
    pub item_sizes: Vec<ItemSizeRow>,
    pub modifier_groups: Vec<ModifierGroupRow>,
    pub modifiers: Vec<ModifierRow>,
    pub item_modifier_overrides: Vec<ItemModifierOverrideRow>,
}

impl ParsedImportData {
    /// 批次总行数（六类合计）
    pub fn total_rows(&self) -> usize {
        self.categories.len()
            + self.items.len()
            + self.item_sizes.len()
            + self.modifier_groups.len()
            + self.modifiers.len()
            + self.item_modifier_overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows() == 0
    }
}
