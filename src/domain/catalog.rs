// ==========================================
// 菜单目录导入引擎 - 目录领域模型
// ==========================================
// 范围: 六类目录实体（分类/规格/加料组/加料/菜品/覆盖装配）
// 红线: 所有实体按 business_id 租户隔离
// 对齐: schema.rs 中 category/item_size/modifier_group/modifier/item 表
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Category - 菜单分类
// ==========================================
// 自然键: lowercase(name) within business
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,                  // UUID 主键
    pub business_id: String,         // 所属商户（租户）
    pub name: String,                // 分类名（自然键,匹配时忽略大小写）
    pub description: Option<String>, // 描述
    pub sort_order: i64,             // 排序（默认 0）
    pub is_active: bool,             // 是否启用（默认 true）

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// ItemSize - 规格（份量）
// ==========================================
// 自然键: code within business（全商户共享,按 code 被其他实体引用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSize {
    pub id: String,
    pub business_id: String,
    pub code: String,         // 规格代码（自然键,如 "S"/"M"/"L"）
    pub name: Option<String>, // 展示名
    pub display_order: i64,
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// PriceBySize - 按规格定价条目（落库形态）
// ==========================================
// 落库时 size 以 id 引用；导入行里以 size_code 引用,
// 由解析器/求解器负责 code → id 的翻译（无法解析的条目静默丢弃）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBySize {
    pub size_id: String,
    pub price: f64, // 相对基准价的增量
}

/// 按规格定价条目（导入行形态,以 size_code 引用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBySizeCode {
    #[serde(alias = "sizeCode")]
    pub size_code: String,
    pub price: f64,
}

// ==========================================
// ModifierGroup - 加料组
// ==========================================
// 自然键: name within business
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifierGroup {
    pub id: String,
    pub business_id: String,
    pub name: String,                 // 组名（自然键）
    pub display_name: Option<String>, // 前台展示名
    pub display_type: Option<String>, // 展示方式（single/multi/quantity 等,前端约定）
    pub min_select: i64,
    pub max_select: i64,
    pub sort_order: i64,
    pub is_active: bool,

    // ===== 可选定价子文档 =====
    // 红线: 导入更新时,quantity_levels 仅在导入行显式给出时才覆盖
    pub quantity_levels: Option<serde_json::Value>, // 数量档位（JSON 子文档）
    pub prices_by_size: Option<Vec<PriceBySize>>,   // 按规格定价（size_id + 增量）

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// Modifier - 加料项
// ==========================================
// 自然键: name within 所属加料组（组先解析）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Modifier {
    pub id: String,
    pub business_id: String,
    pub group_id: String, // 所属加料组（FK）
    pub name: String,     // 项名（组内自然键）
    pub display_order: i64,
    pub is_active: bool,
    pub max_quantity: Option<i64>, // 单项最大数量

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// ModifierOverride - 菜品内单个加料项的覆盖配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifierOverride {
    pub modifier_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prices_by_size: Option<Vec<PriceBySize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_levels: Option<serde_json::Value>,
}

// ==========================================
// ModifierGroupAssignment - 菜品的加料组挂载条目
// ==========================================
// 红线: 导入采用整体替换策略（full-replace）——
// 只要本次导入出现该菜品的任一 override 行,item.modifier_groups 整体重建
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifierGroupAssignment {
    pub group_id: String,
    pub display_order: i64, // 该菜品引用的组中的出现位次
    pub modifiers: Vec<ModifierOverride>,
}

// ==========================================
// Item - 菜品
// ==========================================
// 自然键: (name, category) 复合键
// 红线: 更新时只碰 description/is_active/sort_order,
//       定价/规格/可用性字段一经设置不被导入覆盖
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub business_id: String,
    pub category_id: String, // 所属分类（FK,自然键的一半）
    pub name: String,        // 菜品名（自然键的另一半）
    pub description: Option<String>,
    pub sort_order: i64,
    pub is_active: bool,

    // ===== 定价/规格字段（导入只在新建时写入）=====
    pub base_price: f64,                 // 基准价（新建默认 0）
    pub is_sizeable: bool,               // 是否多规格（新建默认 false）
    pub default_size_id: Option<String>, // 默认规格（由 default_size_code 列解析）

    // ===== 加料组挂载（整体替换,JSON 子文档落库）=====
    pub modifier_groups: Vec<ModifierGroupAssignment>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
