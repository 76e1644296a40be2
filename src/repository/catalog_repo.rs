// ==========================================
// 菜单目录导入引擎 - 目录仓储（事务内函数）
// ==========================================
// 红线: Repository 不含业务规则,只做数据映射
// 约定: 所有函数接收调用方持有的 Transaction,
//       导入一次 save_all 的全部读写共享同一事务
// ==========================================

use crate::domain::catalog::{Category, Item, ItemSize, Modifier, ModifierGroup};
use crate::repository::error::RepositoryResult;
use rusqlite::{params, OptionalExtension, Row, Transaction};
use serde::de::DeserializeOwned;

/// JSON 文本列 → 可选子文档
///
/// 列值为 NULL 时返回 None；反序列化失败视为列类型错误
fn json_column<T: DeserializeOwned>(raw: Option<String>, idx: usize) -> rusqlite::Result<Option<T>> {
    match raw {
        None => Ok(None),
        Some(s) => serde_json::from_str(&s).map(Some).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        }),
    }
}

// ==========================================
// Category
// ==========================================

fn category_from_row(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        business_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        sort_order: row.get(4)?,
        is_active: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const CATEGORY_COLS: &str =
    "id, business_id, name, description, sort_order, is_active, created_at, updated_at";

/// 预取商户全部分类的 (id, name) 对,供自然键索引构建
pub fn fetch_categories(tx: &Transaction, business_id: &str) -> RepositoryResult<Vec<(String, String)>> {
    let mut stmt = tx.prepare("SELECT id, name FROM category WHERE business_id = ?1")?;
    let rows = stmt
        .query_map(params![business_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_category(tx: &Transaction, id: &str) -> RepositoryResult<Option<Category>> {
    let sql = format!("SELECT {} FROM category WHERE id = ?1", CATEGORY_COLS);
    let found = tx
        .query_row(&sql, params![id], category_from_row)
        .optional()?;
    Ok(found)
}

pub fn insert_category(tx: &Transaction, category: &Category) -> RepositoryResult<()> {
    tx.execute(
        r#"
        INSERT INTO category (
            id, business_id, name, description, sort_order, is_active, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            category.id,
            category.business_id,
            category.name,
            category.description,
            category.sort_order,
            category.is_active,
            category.created_at,
            category.updated_at,
        ],
    )?;
    Ok(())
}

/// 整行更新（调用方已从库中加载并只改动允许的字段子集）
pub fn update_category(tx: &Transaction, category: &Category) -> RepositoryResult<()> {
    tx.execute(
        r#"
        UPDATE category
        SET business_id = ?2, name = ?3, description = ?4, sort_order = ?5,
            is_active = ?6, created_at = ?7, updated_at = ?8
        WHERE id = ?1
        "#,
        params![
            category.id,
            category.business_id,
            category.name,
            category.description,
            category.sort_order,
            category.is_active,
            category.created_at,
            category.updated_at,
        ],
    )?;
    Ok(())
}

pub fn delete_category(tx: &Transaction, id: &str) -> RepositoryResult<usize> {
    let rows = tx.execute("DELETE FROM category WHERE id = ?1", params![id])?;
    Ok(rows)
}

// ==========================================
// ItemSize
// ==========================================

fn item_size_from_row(row: &Row) -> rusqlite::Result<ItemSize> {
    Ok(ItemSize {
        id: row.get(0)?,
        business_id: row.get(1)?,
        code: row.get(2)?,
        name: row.get(3)?,
        display_order: row.get(4)?,
        is_active: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const ITEM_SIZE_COLS: &str =
    "id, business_id, code, name, display_order, is_active, created_at, updated_at";

/// 预取商户全部规格的 (id, code) 对,供自然键索引构建
pub fn fetch_item_sizes(tx: &Transaction, business_id: &str) -> RepositoryResult<Vec<(String, String)>> {
    let mut stmt = tx.prepare("SELECT id, code FROM item_size WHERE business_id = ?1")?;
    let rows = stmt
        .query_map(params![business_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_item_size(tx: &Transaction, id: &str) -> RepositoryResult<Option<ItemSize>> {
    let sql = format!("SELECT {} FROM item_size WHERE id = ?1", ITEM_SIZE_COLS);
    let found = tx
        .query_row(&sql, params![id], item_size_from_row)
        .optional()?;
    Ok(found)
}

pub fn insert_item_size(tx: &Transaction, size: &ItemSize) -> RepositoryResult<()> {
    tx.execute(
        r#"
        INSERT INTO item_size (
            id, business_id, code, name, display_order, is_active, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            size.id,
            size.business_id,
            size.code,
            size.name,
            size.display_order,
            size.is_active,
            size.created_at,
            size.updated_at,
        ],
    )?;
    Ok(())
}

pub fn update_item_size(tx: &Transaction, size: &ItemSize) -> RepositoryResult<()> {
    tx.execute(
        r#"
        UPDATE item_size
        SET business_id = ?2, code = ?3, name = ?4, display_order = ?5,
            is_active = ?6, created_at = ?7, updated_at = ?8
        WHERE id = ?1
        "#,
        params![
            size.id,
            size.business_id,
            size.code,
            size.name,
            size.display_order,
            size.is_active,
            size.created_at,
            size.updated_at,
        ],
    )?;
    Ok(())
}

pub fn delete_item_size(tx: &Transaction, id: &str) -> RepositoryResult<usize> {
    let rows = tx.execute("DELETE FROM item_size WHERE id = ?1", params![id])?;
    Ok(rows)
}

// ==========================================
// ModifierGroup
// ==========================================

fn modifier_group_from_row(row: &Row) -> rusqlite::Result<ModifierGroup> {
    Ok(ModifierGroup {
        id: row.get(0)?,
        business_id: row.get(1)?,
        name: row.get(2)?,
        display_name: row.get(3)?,
        display_type: row.get(4)?,
        min_select: row.get(5)?,
        max_select: row.get(6)?,
        sort_order: row.get(7)?,
        is_active: row.get(8)?,
        quantity_levels: json_column(row.get::<_, Option<String>>(9)?, 9)?,
        prices_by_size: json_column(row.get::<_, Option<String>>(10)?, 10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

const MODIFIER_GROUP_COLS: &str = "id, business_id, name, display_name, display_type, min_select, \
     max_select, sort_order, is_active, quantity_levels, prices_by_size, created_at, updated_at";

/// 按组名查找加料组（自然键忽略大小写；每行一次查询,组/项不做预取）
pub fn find_modifier_group_by_name(
    tx: &Transaction,
    business_id: &str,
    name: &str,
) -> RepositoryResult<Option<ModifierGroup>> {
    let sql = format!(
        "SELECT {} FROM modifier_group WHERE business_id = ?1 AND name = ?2 COLLATE NOCASE",
        MODIFIER_GROUP_COLS
    );
    let found = tx
        .query_row(&sql, params![business_id, name], modifier_group_from_row)
        .optional()?;
    Ok(found)
}

pub fn get_modifier_group(tx: &Transaction, id: &str) -> RepositoryResult<Option<ModifierGroup>> {
    let sql = format!(
        "SELECT {} FROM modifier_group WHERE id = ?1",
        MODIFIER_GROUP_COLS
    );
    let found = tx
        .query_row(&sql, params![id], modifier_group_from_row)
        .optional()?;
    Ok(found)
}

pub fn insert_modifier_group(tx: &Transaction, group: &ModifierGroup) -> RepositoryResult<()> {
    tx.execute(
        r#"
        INSERT INTO modifier_group (
            id, business_id, name, display_name, display_type, min_select, max_select,
            sort_order, is_active, quantity_levels, prices_by_size, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
        params![
            group.id,
            group.business_id,
            group.name,
            group.display_name,
            group.display_type,
            group.min_select,
            group.max_select,
            group.sort_order,
            group.is_active,
            group
                .quantity_levels
                .as_ref()
                .map(|v| v.to_string()),
            group
                .prices_by_size
                .as_ref()
                .map(|v| serde_json::to_string(v))
                .transpose()?,
            group.created_at,
            group.updated_at,
        ],
    )?;
    Ok(())
}

pub fn update_modifier_group(tx: &Transaction, group: &ModifierGroup) -> RepositoryResult<()> {
    tx.execute(
        r#"
        UPDATE modifier_group
        SET business_id = ?2, name = ?3, display_name = ?4, display_type = ?5,
            min_select = ?6, max_select = ?7, sort_order = ?8, is_active = ?9,
            quantity_levels = ?10, prices_by_size = ?11, created_at = ?12, updated_at = ?13
        WHERE id = ?1
        "#,
        params![
            group.id,
            group.business_id,
            group.name,
            group.display_name,
            group.display_type,
            group.min_select,
            group.max_select,
            group.sort_order,
            group.is_active,
            group
                .quantity_levels
                .as_ref()
                .map(|v| v.to_string()),
            group
                .prices_by_size
                .as_ref()
                .map(|v| serde_json::to_string(v))
                .transpose()?,
            group.created_at,
            group.updated_at,
        ],
    )?;
    Ok(())
}

pub fn delete_modifier_group(tx: &Transaction, id: &str) -> RepositoryResult<usize> {
    let rows = tx.execute("DELETE FROM modifier_group WHERE id = ?1", params![id])?;
    Ok(rows)
}

// ==========================================
// Modifier
// ==========================================

fn modifier_from_row(row: &Row) -> rusqlite::Result<Modifier> {
    Ok(Modifier {
        id: row.get(0)?,
        business_id: row.get(1)?,
        group_id: row.get(2)?,
        name: row.get(3)?,
        display_order: row.get(4)?,
        is_active: row.get(5)?,
        max_quantity: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

const MODIFIER_COLS: &str =
    "id, business_id, group_id, name, display_order, is_active, max_quantity, created_at, updated_at";

/// 按 (group_id, name) 复合自然键查找加料项（名称忽略大小写）
pub fn find_modifier_by_name(
    tx: &Transaction,
    group_id: &str,
    name: &str,
) -> RepositoryResult<Option<Modifier>> {
    let sql = format!(
        "SELECT {} FROM modifier WHERE group_id = ?1 AND name = ?2 COLLATE NOCASE",
        MODIFIER_COLS
    );
    let found = tx
        .query_row(&sql, params![group_id, name], modifier_from_row)
        .optional()?;
    Ok(found)
}

pub fn get_modifier(tx: &Transaction, id: &str) -> RepositoryResult<Option<Modifier>> {
    let sql = format!("SELECT {} FROM modifier WHERE id = ?1", MODIFIER_COLS);
    let found = tx
        .query_row(&sql, params![id], modifier_from_row)
        .optional()?;
    Ok(found)
}

pub fn insert_modifier(tx: &Transaction, modifier: &Modifier) -> RepositoryResult<()> {
    tx.execute(
        r#"
        INSERT INTO modifier (
            id, business_id, group_id, name, display_order, is_active, max_quantity,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            modifier.id,
            modifier.business_id,
            modifier.group_id,
            modifier.name,
            modifier.display_order,
            modifier.is_active,
            modifier.max_quantity,
            modifier.created_at,
            modifier.updated_at,
        ],
    )?;
    Ok(())
}

pub fn update_modifier(tx: &Transaction, modifier: &Modifier) -> RepositoryResult<()> {
    tx.execute(
        r#"
        UPDATE modifier
        SET business_id = ?2, group_id = ?3, name = ?4, display_order = ?5,
            is_active = ?6, max_quantity = ?7, created_at = ?8, updated_at = ?9
        WHERE id = ?1
        "#,
        params![
            modifier.id,
            modifier.business_id,
            modifier.group_id,
            modifier.name,
            modifier.display_order,
            modifier.is_active,
            modifier.max_quantity,
            modifier.created_at,
            modifier.updated_at,
        ],
    )?;
    Ok(())
}

pub fn delete_modifier(tx: &Transaction, id: &str) -> RepositoryResult<usize> {
    let rows = tx.execute("DELETE FROM modifier WHERE id = ?1", params![id])?;
    Ok(rows)
}

// ==========================================
// Item
// ==========================================

fn item_from_row(row: &Row) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        business_id: row.get(1)?,
        category_id: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        sort_order: row.get(5)?,
        is_active: row.get(6)?,
        base_price: row.get(7)?,
        is_sizeable: row.get(8)?,
        default_size_id: row.get(9)?,
        modifier_groups: json_column(row.get::<_, Option<String>>(10)?, 10)?.unwrap_or_default(),
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

const ITEM_COLS: &str = "id, business_id, category_id, name, description, sort_order, is_active, \
     base_price, is_sizeable, default_size_id, modifier_groups, created_at, updated_at";

/// 按 (name, category_id) 复合自然键查找菜品
pub fn find_item_by_name(
    tx: &Transaction,
    business_id: &str,
    category_id: &str,
    name: &str,
) -> RepositoryResult<Option<Item>> {
    let sql = format!(
        "SELECT {} FROM item WHERE business_id = ?1 AND category_id = ?2 AND name = ?3 COLLATE NOCASE",
        ITEM_COLS
    );
    let found = tx
        .query_row(&sql, params![business_id, category_id, name], item_from_row)
        .optional()?;
    Ok(found)
}

/// 仅按菜品名查找（覆盖行以 item_key=菜品名 引用菜品,不带分类维度）
///
/// 同名菜品跨分类时返回任意一个,与覆盖行自然键的歧义语义一致
pub fn find_item_by_plain_name(
    tx: &Transaction,
    business_id: &str,
    name: &str,
) -> RepositoryResult<Option<Item>> {
    let sql = format!(
        "SELECT {} FROM item WHERE business_id = ?1 AND name = ?2 COLLATE NOCASE LIMIT 1",
        ITEM_COLS
    );
    let found = tx
        .query_row(&sql, params![business_id, name], item_from_row)
        .optional()?;
    Ok(found)
}

pub fn get_item(tx: &Transaction, id: &str) -> RepositoryResult<Option<Item>> {
    let sql = format!("SELECT {} FROM item WHERE id = ?1", ITEM_COLS);
    let found = tx.query_row(&sql, params![id], item_from_row).optional()?;
    Ok(found)
}

pub fn insert_item(tx: &Transaction, item: &Item) -> RepositoryResult<()> {
    tx.execute(
        r#"
        INSERT INTO item (
            id, business_id, category_id, name, description, sort_order, is_active,
            base_price, is_sizeable, default_size_id, modifier_groups, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
        params![
            item.id,
            item.business_id,
            item.category_id,
            item.name,
            item.description,
            item.sort_order,
            item.is_active,
            item.base_price,
            item.is_sizeable,
            item.default_size_id,
            serde_json::to_string(&item.modifier_groups)?,
            item.created_at,
            item.updated_at,
        ],
    )?;
    Ok(())
}

pub fn update_item(tx: &Transaction, item: &Item) -> RepositoryResult<()> {
    tx.execute(
        r#"
        UPDATE item
        SET business_id = ?2, category_id = ?3, name = ?4, description = ?5,
            sort_order = ?6, is_active = ?7, base_price = ?8, is_sizeable = ?9,
            default_size_id = ?10, modifier_groups = ?11, created_at = ?12, updated_at = ?13
        WHERE id = ?1
        "#,
        params![
            item.id,
            item.business_id,
            item.category_id,
            item.name,
            item.description,
            item.sort_order,
            item.is_active,
            item.base_price,
            item.is_sizeable,
            item.default_size_id,
            serde_json::to_string(&item.modifier_groups)?,
            item.created_at,
            item.updated_at,
        ],
    )?;
    Ok(())
}

pub fn delete_item(tx: &Transaction, id: &str) -> RepositoryResult<usize> {
    let rows = tx.execute("DELETE FROM item WHERE id = ?1", params![id])?;
    Ok(rows)
}
