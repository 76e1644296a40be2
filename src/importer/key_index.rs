// ==========================================
// 菜单目录导入引擎 - 自然键索引
// ==========================================
// 职责: 一次导入运行内的自然键 → id 查找表
// 构建: save_all 事务开启后、任何求解前,预取商户全部分类与规格;
//       组/项不预取,逐行查库（见设计决策）,但运行内新建的
//       组/项/菜品会写入运行局部映射,保证后续步骤可见
// 红线: 索引随事务创建随事务丢弃,不做跨调用共享
// ==========================================

use crate::repository::catalog_repo;
use crate::repository::error::RepositoryResult;
use rusqlite::Transaction;
use std::collections::HashMap;
use tracing::debug;

/// 自然键归一化: trim + 小写
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// 组合键 "group_key:modifier_key"（两段分别归一化）
pub fn modifier_composite_key(group_key: &str, modifier_key: &str) -> String {
    format!("{}:{}", normalize_key(group_key), normalize_key(modifier_key))
}

// ==========================================
// NaturalKeyIndex - 单次运行的查找表
// ==========================================
#[derive(Debug, Default)]
pub struct NaturalKeyIndex {
    /// lowercase(分类名) → category_id（预取 + 运行内新建）
    pub categories: HashMap<String, String>,
    /// 规格 code（归一化） → size_id（预取 + 运行内新建）
    pub sizes: HashMap<String, String>,
    /// lowercase(组名) → group_id（仅运行内解析出的组）
    pub groups: HashMap<String, String>,
    /// "组键:项键" → modifier_id（仅运行内解析出的项）
    pub modifiers: HashMap<String, String>,
    /// lowercase(菜品名) → item_id（步骤 5 填充,步骤 6/7 消费）
    pub items: HashMap<String, String>,
    /// item_id → 声明的 default_size_code（步骤 5 收集,步骤 6 消费）
    pub item_default_sizes: Vec<(String, String)>,
    /// 本次运行新建的实体 id（用于区分 创建后续内改 与 更新既有实体）
    pub created_this_run: std::collections::HashSet<String>,
}

impl NaturalKeyIndex {
    /// 预取商户既有分类/规格,建立 O(1) 查找表
    ///
    /// # 参数
    /// - tx: save_all 的事务（索引与求解共享）
    /// - business_id: 商户 id
    pub fn build(tx: &Transaction, business_id: &str) -> RepositoryResult<Self> {
        let mut index = Self::default();

        for (id, name) in catalog_repo::fetch_categories(tx, business_id)? {
            index.categories.insert(normalize_key(&name), id);
        }
        for (id, code) in catalog_repo::fetch_item_sizes(tx, business_id)? {
            index.sizes.insert(normalize_key(&code), id);
        }

        debug!(
            categories = index.categories.len(),
            sizes = index.sizes.len(),
            "自然键索引构建完成"
        );
        Ok(index)
    }

    pub fn category_id(&self, name: &str) -> Option<&String> {
        self.categories.get(&normalize_key(name))
    }

    pub fn size_id(&self, code: &str) -> Option<&String> {
        self.sizes.get(&normalize_key(code))
    }

    pub fn group_id(&self, group_key: &str) -> Option<&String> {
        self.groups.get(&normalize_key(group_key))
    }

    pub fn modifier_id(&self, group_key: &str, modifier_key: &str) -> Option<&String> {
        self.modifiers.get(&modifier_composite_key(group_key, modifier_key))
    }

    pub fn item_id(&self, item_key: &str) -> Option<&String> {
        self.items.get(&normalize_key(item_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key_case_insensitive() {
        assert_eq!(normalize_key("Drinks"), "drinks");
        assert_eq!(normalize_key("  DRINKS  "), "drinks");
    }

    #[test]
    fn test_modifier_composite_key() {
        assert_eq!(modifier_composite_key("Toppings", "Cheese"), "toppings:cheese");
    }

    #[test]
    fn test_index_lookups_normalized() {
        let mut index = NaturalKeyIndex::default();
        index.categories.insert("drinks".to_string(), "cat-1".to_string());
        index.sizes.insert("l".to_string(), "size-1".to_string());

        assert_eq!(index.category_id("DRINKS"), Some(&"cat-1".to_string()));
        assert_eq!(index.size_id(" L "), Some(&"size-1".to_string()));
        assert_eq!(index.category_id("mains"), None);
    }
}
