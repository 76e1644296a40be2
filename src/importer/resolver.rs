// ==========================================
// 菜单目录导入引擎 - 自然键求解与落库引擎
// ==========================================
// 处理顺序（严格,后续步骤依赖前序步骤产生的 id）:
// 1. 分类 → 2. 规格 → 3. 加料组 → 4. 加料项 → 5. 菜品
// → 6. 默认规格指派 → 7. 菜品-加料组-加料项 装配
//
// 红线:
// - 更新只碰各实体的"基础字段"枚举子集,未提及字段保留既有值
// - 菜品定价/规格字段一经设置不被导入覆盖（只在新建时写入）
// - item.modifier_groups 整体替换: 本次导入出现该菜品任一覆盖行
//   即整体重建,零覆盖行的菜品不动
// - 任何自然键无法解析/数据库错误 → 立即返回 Err,调用方 abort 事务
// - 每次落库变更追加一条补偿日志条目（更新带更新前快照）
// ==========================================

use crate::domain::catalog::{
    Category, Item, ItemSize, Modifier, ModifierGroup, ModifierGroupAssignment, ModifierOverride,
    PriceBySize, PriceBySizeCode,
};
use crate::domain::import_row::{
    CategoryRow, ItemModifierOverrideRow, ItemRow, ItemSizeRow, ModifierGroupRow, ModifierRow,
    ParsedImportData,
};
use crate::domain::rollback::RollbackOp;
use crate::domain::types::EntityKind;
use crate::importer::error::{
    ImportError, ImportResult, ERR_CATEGORY_NOT_FOUND, ERR_ITEM_NOT_FOUND,
    ERR_MODIFIER_GROUP_NOT_FOUND,
};
use crate::importer::key_index::{modifier_composite_key, normalize_key, NaturalKeyIndex};
use crate::repository::catalog_repo;
use chrono::Utc;
use rusqlite::Transaction;
use tracing::{debug, warn};
use uuid::Uuid;

// ==========================================
// CatalogResolver - 单次运行的求解器
// ==========================================
pub struct CatalogResolver<'a> {
    tx: &'a Transaction<'a>,
    business_id: &'a str,
    index: NaturalKeyIndex,
    rollback: Vec<RollbackOp>,
}

impl<'a> CatalogResolver<'a> {
    pub fn new(tx: &'a Transaction<'a>, business_id: &'a str, index: NaturalKeyIndex) -> Self {
        Self {
            tx,
            business_id,
            index,
            rollback: Vec::new(),
        }
    }

    /// 按依赖顺序执行七个步骤,返回补偿日志
    ///
    /// 任一步骤出错即返回 Err,调用方负责 abort 事务（日志随之作废）
    pub fn apply(mut self, data: &ParsedImportData) -> ImportResult<Vec<RollbackOp>> {
        debug!("步骤 1: 解析分类");
        self.resolve_categories(&data.categories)?;

        debug!("步骤 2: 解析规格");
        self.resolve_item_sizes(&data.item_sizes)?;

        debug!("步骤 3: 解析加料组");
        self.resolve_modifier_groups(&data.modifier_groups)?;

        debug!("步骤 4: 解析加料项");
        self.resolve_modifiers(&data.modifiers)?;

        debug!("步骤 5: 解析菜品");
        self.resolve_items(&data.items)?;

        debug!("步骤 6: 默认规格指派");
        self.assign_default_sizes()?;

        debug!("步骤 7: 菜品加料覆盖装配");
        self.assemble_item_overrides(&data.item_modifier_overrides)?;

        Ok(self.rollback)
    }

    // ==========================================
    // 步骤 1: 分类
    // ==========================================
    // 自然键: lowercase(name)（预取索引查找）
    // 更新字段: description / sort_order / is_active
    fn resolve_categories(&mut self, rows: &[CategoryRow]) -> ImportResult<()> {
        for row in rows {
            match self.index.category_id(&row.name).cloned() {
                Some(id) => {
                    let mut existing = self.load_category(&id)?;
                    let snapshot = serde_json::to_value(&existing)?;

                    if row.description.is_some() {
                        existing.description = row.description.clone();
                    }
                    existing.sort_order = row.sort_order.unwrap_or(existing.sort_order);
                    existing.is_active = row.is_active.unwrap_or(existing.is_active);
                    existing.updated_at = Utc::now();

                    catalog_repo::update_category(self.tx, &existing)?;
                    self.rollback
                        .push(RollbackOp::update(EntityKind::Category, id, snapshot));
                }
                None => {
                    let now = Utc::now();
                    let category = Category {
                        id: Uuid::new_v4().to_string(),
                        business_id: self.business_id.to_string(),
                        name: row.name.clone(),
                        description: row.description.clone(),
                        sort_order: row.sort_order.unwrap_or(0),
                        is_active: row.is_active.unwrap_or(true),
                        created_at: now,
                        updated_at: now,
                    };
                    catalog_repo::insert_category(self.tx, &category)?;

                    // 运行内新建对同批后续菜品行立即可见
                    self.index
                        .categories
                        .insert(normalize_key(&row.name), category.id.clone());
                    self.index.created_this_run.insert(category.id.clone());
                    self.rollback
                        .push(RollbackOp::create(EntityKind::Category, category.id));
                }
            }
        }
        debug!(count = rows.len(), "分类解析完成");
        Ok(())
    }

    // ==========================================
    // 步骤 2: 规格（商户级共享,按 code 解析）
    // ==========================================
    // 更新字段: name / display_order / is_active
    fn resolve_item_sizes(&mut self, rows: &[ItemSizeRow]) -> ImportResult<()> {
        for row in rows {
            match self.index.size_id(&row.code).cloned() {
                Some(id) => {
                    let mut existing = self.load_item_size(&id)?;
                    let snapshot = serde_json::to_value(&existing)?;

                    if row.name.is_some() {
                        existing.name = row.name.clone();
                    }
                    existing.display_order = row.display_order.unwrap_or(existing.display_order);
                    existing.is_active = row.is_active.unwrap_or(existing.is_active);
                    existing.updated_at = Utc::now();

                    catalog_repo::update_item_size(self.tx, &existing)?;
                    self.rollback
                        .push(RollbackOp::update(EntityKind::ItemSize, id, snapshot));
                }
                None => {
                    let now = Utc::now();
                    let size = ItemSize {
                        id: Uuid::new_v4().to_string(),
                        business_id: self.business_id.to_string(),
                        code: row.code.clone(),
                        name: row.name.clone(),
                        display_order: row.display_order.unwrap_or(0),
                        is_active: row.is_active.unwrap_or(true),
                        created_at: now,
                        updated_at: now,
                    };
                    catalog_repo::insert_item_size(self.tx, &size)?;

                    // sizeCode → id 供 prices_by_size 翻译与默认规格指派
                    self.index
                        .sizes
                        .insert(normalize_key(&row.code), size.id.clone());
                    self.index.created_this_run.insert(size.id.clone());
                    self.rollback
                        .push(RollbackOp::create(EntityKind::ItemSize, size.id));
                }
            }
        }
        debug!(count = rows.len(), "规格解析完成");
        Ok(())
    }

    // ==========================================
    // 步骤 3: 加料组（按组名精确匹配,逐行查库）
    // ==========================================
    // 更新字段: display_name / display_type / min_select / max_select /
    //           is_active / sort_order + quantity_levels（仅显式给出时）
    // prices_by_size: sizeCode → size_id 翻译,无法解析的条目静默丢弃
    fn resolve_modifier_groups(&mut self, rows: &[ModifierGroupRow]) -> ImportResult<()> {
        for row in rows {
            let existing =
                catalog_repo::find_modifier_group_by_name(self.tx, self.business_id, &row.name)?;

            match existing {
                Some(mut group) => {
                    let snapshot = serde_json::to_value(&group)?;

                    if row.display_name.is_some() {
                        group.display_name = row.display_name.clone();
                    }
                    if row.display_type.is_some() {
                        group.display_type = row.display_type.clone();
                    }
                    group.min_select = row.min_select.unwrap_or(group.min_select);
                    group.max_select = row.max_select.unwrap_or(group.max_select);
                    group.sort_order = row.sort_order.unwrap_or(group.sort_order);
                    group.is_active = row.is_active.unwrap_or(group.is_active);
                    // quantity_levels 只在导入行显式给出时覆盖
                    if let Some(levels) = &row.quantity_levels {
                        group.quantity_levels = Some(levels.clone());
                    }
                    if let Some(prices) = &row.prices_by_size {
                        group.prices_by_size = Some(self.translate_prices(prices, row.row_number));
                    }
                    group.updated_at = Utc::now();

                    catalog_repo::update_modifier_group(self.tx, &group)?;
                    self.index
                        .groups
                        .insert(normalize_key(&row.name), group.id.clone());
                    self.rollback
                        .push(RollbackOp::update(EntityKind::ModifierGroup, group.id, snapshot));
                }
                None => {
                    let now = Utc::now();
                    let group = ModifierGroup {
                        id: Uuid::new_v4().to_string(),
                        business_id: self.business_id.to_string(),
                        name: row.name.clone(),
                        display_name: row.display_name.clone(),
                        display_type: row.display_type.clone(),
                        min_select: row.min_select.unwrap_or(0),
                        max_select: row.max_select.unwrap_or(0),
                        sort_order: row.sort_order.unwrap_or(0),
                        is_active: row.is_active.unwrap_or(true),
                        quantity_levels: row.quantity_levels.clone(),
                        prices_by_size: row
                            .prices_by_size
                            .as_ref()
                            .map(|p| self.translate_prices(p, row.row_number)),
                        created_at: now,
                        updated_at: now,
                    };
                    catalog_repo::insert_modifier_group(self.tx, &group)?;

                    self.index
                        .groups
                        .insert(normalize_key(&row.name), group.id.clone());
                    self.index.created_this_run.insert(group.id.clone());
                    self.rollback
                        .push(RollbackOp::create(EntityKind::ModifierGroup, group.id));
                }
            }
        }
        debug!(count = rows.len(), "加料组解析完成");
        Ok(())
    }

    // ==========================================
    // 步骤 4: 加料项（按 (group_id, name) 解析）
    // ==========================================
    // 组无法解析 → 整批失败（单趟处理顺序契约）
    // 更新字段: display_order / is_active
    fn resolve_modifiers(&mut self, rows: &[ModifierRow]) -> ImportResult<()> {
        for row in rows {
            let group_id = self.resolve_group_id(&row.group_key)?.ok_or_else(|| {
                ImportError::ValidationError(ERR_MODIFIER_GROUP_NOT_FOUND.to_string())
            })?;

            let existing = catalog_repo::find_modifier_by_name(self.tx, &group_id, &row.name)?;
            let composite = modifier_composite_key(&row.group_key, row.key());

            match existing {
                Some(mut modifier) => {
                    let snapshot = serde_json::to_value(&modifier)?;

                    modifier.display_order = row.display_order.unwrap_or(modifier.display_order);
                    modifier.is_active = row.is_active.unwrap_or(modifier.is_active);
                    modifier.updated_at = Utc::now();

                    catalog_repo::update_modifier(self.tx, &modifier)?;
                    self.index.modifiers.insert(composite, modifier.id.clone());
                    self.rollback
                        .push(RollbackOp::update(EntityKind::Modifier, modifier.id, snapshot));
                }
                None => {
                    let now = Utc::now();
                    let modifier = Modifier {
                        id: Uuid::new_v4().to_string(),
                        business_id: self.business_id.to_string(),
                        group_id,
                        name: row.name.clone(),
                        display_order: row.display_order.unwrap_or(0),
                        is_active: row.is_active.unwrap_or(true),
                        max_quantity: row.max_quantity,
                        created_at: now,
                        updated_at: now,
                    };
                    catalog_repo::insert_modifier(self.tx, &modifier)?;

                    self.index.modifiers.insert(composite, modifier.id.clone());
                    self.index.created_this_run.insert(modifier.id.clone());
                    self.rollback
                        .push(RollbackOp::create(EntityKind::Modifier, modifier.id));
                }
            }
        }
        debug!(count = rows.len(), "加料项解析完成");
        Ok(())
    }

    // ==========================================
    // 步骤 5: 菜品（按 (name, category_id) 解析）
    // ==========================================
    // 分类无法解析 → 整批失败
    // 更新字段: description / is_active / sort_order
    // 红线: 定价/规格/默认规格/加料挂载在更新时一概不碰
    fn resolve_items(&mut self, rows: &[ItemRow]) -> ImportResult<()> {
        for row in rows {
            let category_id = match &row.category_id {
                Some(explicit) => explicit.clone(),
                None => row
                    .category_name
                    .as_deref()
                    .and_then(|name| self.index.category_id(name).cloned())
                    .ok_or_else(|| {
                        ImportError::ValidationError(ERR_CATEGORY_NOT_FOUND.to_string())
                    })?,
            };

            let existing = catalog_repo::find_item_by_name(
                self.tx,
                self.business_id,
                &category_id,
                &row.name,
            )?;

            let item_id = match existing {
                Some(mut item) => {
                    let snapshot = serde_json::to_value(&item)?;

                    if row.description.is_some() {
                        item.description = row.description.clone();
                    }
                    item.is_active = row.is_active.unwrap_or(item.is_active);
                    item.sort_order = row.sort_order.unwrap_or(item.sort_order);
                    item.updated_at = Utc::now();

                    catalog_repo::update_item(self.tx, &item)?;
                    let id = item.id.clone();
                    self.rollback
                        .push(RollbackOp::update(EntityKind::Item, item.id, snapshot));
                    id
                }
                None => {
                    let now = Utc::now();
                    let item = Item {
                        id: Uuid::new_v4().to_string(),
                        business_id: self.business_id.to_string(),
                        category_id,
                        name: row.name.clone(),
                        description: row.description.clone(),
                        sort_order: row.sort_order.unwrap_or(0),
                        is_active: row.is_active.unwrap_or(true),
                        base_price: row.base_price.unwrap_or(0.0),
                        is_sizeable: row.is_sizeable.unwrap_or(false),
                        default_size_id: None,
                        modifier_groups: Vec::new(),
                        created_at: now,
                        updated_at: now,
                    };
                    catalog_repo::insert_item(self.tx, &item)?;

                    let id = item.id.clone();
                    self.index.created_this_run.insert(id.clone());
                    self.rollback.push(RollbackOp::create(EntityKind::Item, item.id));
                    id
                }
            };

            // item_key → id 映射（步骤 7 覆盖装配消费,同名后出现者覆盖）
            self.index
                .items
                .insert(normalize_key(&row.name), item_id.clone());

            // 声明了默认规格的菜品,code 留给步骤 6 统一解析
            if let Some(code) = &row.default_size_code {
                self.index.item_default_sizes.push((item_id, code.clone()));
            }
        }
        debug!(count = rows.len(), "菜品解析完成");
        Ok(())
    }

    // ==========================================
    // 步骤 6: 默认规格指派
    // ==========================================
    // 消费步骤 5 收集的 (item_id, default_size_code) 列表,
    // 规格与菜品均已解析后统一赋值；code 无法解析的条目静默跳过
    fn assign_default_sizes(&mut self) -> ImportResult<()> {
        let pending = std::mem::take(&mut self.index.item_default_sizes);
        for (item_id, code) in &pending {
            let Some(size_id) = self.index.size_id(code).cloned() else {
                warn!(item_id = %item_id, size_code = %code, "默认规格 code 无法解析,跳过");
                continue;
            };

            let mut item = self.load_item(item_id)?;
            if item.default_size_id.as_deref() == Some(size_id.as_str()) {
                continue;
            }

            // 本次运行新建的菜品: create 日志已覆盖撤销语义,不再追加 update 条目
            let log_update = !self.index.created_this_run.contains(item_id);
            let snapshot = serde_json::to_value(&item)?;

            item.default_size_id = Some(size_id);
            item.updated_at = Utc::now();
            catalog_repo::update_item(self.tx, &item)?;

            if log_update {
                self.rollback
                    .push(RollbackOp::update(EntityKind::Item, item_id.clone(), snapshot));
            }
        }
        debug!(count = pending.len(), "默认规格指派完成");
        Ok(())
    }

    // ==========================================
    // 步骤 7: 菜品-加料组-加料项 装配
    // ==========================================
    // 按 item_key 归组覆盖行；有 ≥1 覆盖行的菜品,其 modifier_groups
    // 整体替换为本次装配结果（display_order = 组在该菜品内的出现位次）
    fn assemble_item_overrides(&mut self, rows: &[ItemModifierOverrideRow]) -> ImportResult<()> {
        // 按 item_key 归组,保留首次出现顺序
        let mut order: Vec<String> = Vec::new();
        let mut by_item: std::collections::HashMap<String, Vec<&ItemModifierOverrideRow>> =
            std::collections::HashMap::new();
        for row in rows {
            let key = normalize_key(&row.item_key);
            if !by_item.contains_key(&key) {
                order.push(key.clone());
            }
            by_item.entry(key).or_default().push(row);
        }

        for item_key in &order {
            let item_rows = &by_item[item_key];

            // 菜品解析: 优先本次运行映射,其次按名查库（覆盖既有菜品场景）
            // 仍无法解析 → 整批失败（与步骤 4 的组缺失同一契约）
            let item_id = match self.index.item_id(item_key).cloned() {
                Some(id) => id,
                None => {
                    catalog_repo::find_item_by_plain_name(self.tx, self.business_id, item_key)?
                        .map(|item| item.id)
                        .ok_or_else(|| {
                            ImportError::ValidationError(ERR_ITEM_NOT_FOUND.to_string())
                        })?
                }
            };

            let assignments = self.build_assignments(item_rows)?;

            let mut item = self.load_item(&item_id)?;
            let log_update = !self.index.created_this_run.contains(&item_id);
            let snapshot = serde_json::to_value(&item)?;

            // 整体替换,不与既有挂载合并
            item.modifier_groups = assignments;
            item.updated_at = Utc::now();
            catalog_repo::update_item(self.tx, &item)?;

            if log_update {
                self.rollback
                    .push(RollbackOp::update(EntityKind::Item, item_id, snapshot));
            }
        }
        debug!(items = order.len(), rows = rows.len(), "菜品加料覆盖装配完成");
        Ok(())
    }

    /// 单个菜品的覆盖行 → 加料组挂载列表
    fn build_assignments(
        &self,
        item_rows: &[&ItemModifierOverrideRow],
    ) -> ImportResult<Vec<ModifierGroupAssignment>> {
        // 按 group_key 归组,保留首次出现顺序（位次即 display_order）
        let mut group_order: Vec<String> = Vec::new();
        let mut by_group: std::collections::HashMap<String, Vec<&ItemModifierOverrideRow>> =
            std::collections::HashMap::new();
        for row in item_rows {
            let key = normalize_key(&row.group_key);
            if !by_group.contains_key(&key) {
                group_order.push(key.clone());
            }
            by_group.entry(key).or_default().push(row);
        }

        let mut assignments = Vec::new();
        for (position, group_key) in group_order.iter().enumerate() {
            let group_id = self.resolve_group_id(group_key)?.ok_or_else(|| {
                ImportError::ValidationError(ERR_MODIFIER_GROUP_NOT_FOUND.to_string())
            })?;

            let mut modifiers = Vec::new();
            for row in &by_group[group_key] {
                // 项解析: 步骤 4 映射优先,其次组内按名查库,仍无法解析则静默丢弃
                let modifier_id = match self
                    .index
                    .modifier_id(&row.group_key, &row.modifier_key)
                    .cloned()
                {
                    Some(id) => Some(id),
                    None => catalog_repo::find_modifier_by_name(
                        self.tx,
                        &group_id,
                        &row.modifier_key,
                    )?
                    .map(|m| m.id),
                };
                let Some(modifier_id) = modifier_id else {
                    warn!(
                        group_key = %row.group_key,
                        modifier_key = %row.modifier_key,
                        "覆盖行引用的加料项无法解析,丢弃该条目"
                    );
                    continue;
                };

                modifiers.push(ModifierOverride {
                    modifier_id,
                    prices_by_size: row
                        .prices_by_size
                        .as_ref()
                        .map(|p| self.translate_prices(p, row.row_number)),
                    quantity_levels: row.quantity_levels.clone(),
                });
            }

            assignments.push(ModifierGroupAssignment {
                group_id,
                display_order: position as i64,
                modifiers,
            });
        }
        Ok(assignments)
    }

    // ==========================================
    // 辅助
    // ==========================================

    /// 组 id 解析: 运行内映射优先,其次按组名查库（既有持久化组）
    fn resolve_group_id(&self, group_key: &str) -> ImportResult<Option<String>> {
        if let Some(id) = self.index.group_id(group_key) {
            return Ok(Some(id.clone()));
        }
        let found =
            catalog_repo::find_modifier_group_by_name(self.tx, self.business_id, group_key)?;
        Ok(found.map(|g| g.id))
    }

    /// prices_by_size 条目翻译: sizeCode → size_id,无法解析的条目静默丢弃
    fn translate_prices(&self, entries: &[PriceBySizeCode], row_number: usize) -> Vec<PriceBySize> {
        entries
            .iter()
            .filter_map(|entry| match self.index.size_id(&entry.size_code) {
                Some(id) => Some(PriceBySize {
                    size_id: id.clone(),
                    price: entry.price,
                }),
                None => {
                    warn!(
                        row_number,
                        size_code = %entry.size_code,
                        "prices_by_size 条目规格 code 无法解析,丢弃"
                    );
                    None
                }
            })
            .collect()
    }

    fn load_category(&self, id: &str) -> ImportResult<Category> {
        catalog_repo::get_category(self.tx, id)?.ok_or_else(|| {
            ImportError::InternalError(format!("索引中的分类在库中缺失: {}", id))
        })
    }

    fn load_item_size(&self, id: &str) -> ImportResult<ItemSize> {
        catalog_repo::get_item_size(self.tx, id)?.ok_or_else(|| {
            ImportError::InternalError(format!("索引中的规格在库中缺失: {}", id))
        })
    }

    fn load_item(&self, id: &str) -> ImportResult<Item> {
        catalog_repo::get_item(self.tx, id)?
            .ok_or_else(|| ImportError::InternalError(format!("菜品在库中缺失: {}", id)))
    }
}
