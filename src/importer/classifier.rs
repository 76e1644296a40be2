// ==========================================
// 菜单目录导入引擎 - 行分类器实现
// ==========================================
// 职责: 未类型化的表格行 → 六类实体之一
// 设计: 显式有序规则表（谓词 → 实体类别）,自上而下,首个命中生效
//       每条规则可独立单测,替代原嵌套三元判定
// 两条路径:
// - 通用快速路径: 表头同时含 type + name 时,按 type 列直接分发
// - 启发式路径: 无 type 列时,按规则表逐行判定
// 文件名提示(hint): 给定时短路规则表,只应用对应谓词,
//   不通过的行静默丢弃（Category/Item/Size 仅要求 name/规格标识非空）
// ==========================================

use crate::domain::import_row::ParsedImportData;
use crate::domain::types::EntityKind;
use crate::importer::error::ImportResult;
use crate::importer::row_parser::{
    parse_category_row, parse_item_row, parse_item_size_row, parse_modifier_group_row,
    parse_modifier_row, parse_override_row, RawRow, COLS_DISPLAY_TYPE, COLS_GROUP_REF,
    COLS_ITEM_KEY, COLS_MAX_QUANTITY, COLS_MAX_SELECT, COLS_MIN_SELECT, COLS_MODIFIER_KEY,
    COLS_NAME, COLS_SIZE_CODE,
};
use std::collections::HashMap;
use tracing::{debug, warn};

// ==========================================
// 分类谓词（每条规则独立可测）
// ==========================================

/// 规则 1: 存在规格识别列取值（code/size_code/sizecode）
pub fn has_size_identifier(row: &RawRow) -> bool {
    row.get(COLS_SIZE_CODE).is_some()
}

/// 覆盖行: 携带完整 (item_key, group_key, modifier_key) 三元键
pub fn looks_like_override(row: &RawRow) -> bool {
    row.get(COLS_ITEM_KEY).is_some()
        && row.get(COLS_GROUP_REF).is_some()
        && row.get(COLS_MODIFIER_KEY).is_some()
}

/// 规则 3: "像加料项" —— 组引用列非空 + name 非空 + (modifier_key 非空 或 max_quantity 为正数)
pub fn looks_like_modifier(row: &RawRow) -> bool {
    if row.get(COLS_GROUP_REF).is_none() || row.get(COLS_NAME).is_none() {
        return false;
    }
    if row.get(COLS_MODIFIER_KEY).is_some() {
        return true;
    }
    row.parse_i64(COLS_MAX_QUANTITY).is_some_and(|q| q > 0)
}

/// 规则 2: "像加料组" —— name 非空 + (存在 display_type 列 或 给出 min/max_select) + 不像加料项
pub fn looks_like_modifier_group(row: &RawRow) -> bool {
    if row.get(COLS_NAME).is_none() {
        return false;
    }
    let has_group_shape = row.has_column(COLS_DISPLAY_TYPE)
        || row.get(COLS_MIN_SELECT).is_some()
        || row.get(COLS_MAX_SELECT).is_some();
    has_group_shape && !looks_like_modifier(row)
}

/// 规则 4: name 非空且无组引用 → 菜品
pub fn looks_like_plain_item(row: &RawRow) -> bool {
    row.get(COLS_NAME).is_some() && row.get(COLS_GROUP_REF).is_none()
}

/// 规则 5 兜底: name 非空 → 分类
pub fn has_name(row: &RawRow) -> bool {
    row.get(COLS_NAME).is_some()
}

// ==========================================
// 有序规则表
// ==========================================
pub struct ClassifierRule {
    pub kind: EntityKind,
    pub matches: fn(&RawRow) -> bool,
}

/// 启发式规则表,自上而下首个命中生效
///
/// 注: ModifierGroup 在表尾重复出现,对应原逻辑的"兜底前复查组启发式"
pub const HEURISTIC_RULES: &[ClassifierRule] = &[
    ClassifierRule {
        kind: EntityKind::ItemSize,
        matches: has_size_identifier,
    },
    ClassifierRule {
        kind: EntityKind::ItemModifierOverride,
        matches: looks_like_override,
    },
    ClassifierRule {
        kind: EntityKind::ModifierGroup,
        matches: looks_like_modifier_group,
    },
    ClassifierRule {
        kind: EntityKind::Modifier,
        matches: looks_like_modifier,
    },
    ClassifierRule {
        kind: EntityKind::Item,
        matches: looks_like_plain_item,
    },
    ClassifierRule {
        kind: EntityKind::ModifierGroup,
        matches: looks_like_modifier_group,
    },
    ClassifierRule {
        kind: EntityKind::Category,
        matches: has_name,
    },
];

// ==========================================
// RowClassifier - 行分类器
// ==========================================
pub struct RowClassifier;

impl RowClassifier {
    /// 从文件名推断实体类别提示
    ///
    /// # 匹配顺序
    /// override → 组 → 项 → 规格 → 分类 → 菜品（子串包含,先长后短避免误判）
    pub fn detect_kind_from_filename(file_name: &str) -> Option<EntityKind> {
        let lower = file_name.to_lowercase();
        if lower.contains("override") {
            return Some(EntityKind::ItemModifierOverride);
        }
        if lower.contains("modifier_group") || lower.contains("modifier-group") || lower.contains("mod_group") || lower.contains("group")
        {
            return Some(EntityKind::ModifierGroup);
        }
        if lower.contains("modifier") {
            return Some(EntityKind::Modifier);
        }
        if lower.contains("size") {
            return Some(EntityKind::ItemSize);
        }
        if lower.contains("categor") {
            return Some(EntityKind::Category);
        }
        if lower.contains("item") || lower.contains("menu") {
            return Some(EntityKind::Item);
        }
        None
    }

    /// 分类 + 字段解析: 原始行记录 → 六类实体批次
    ///
    /// # 参数
    /// - records: 表头小写化的原始行记录
    /// - hint: 强制实体类别（文件名推断得出,给定时短路启发式）
    ///
    /// # 返回
    /// - Ok(ParsedImportData): 六个有序列表
    /// - Err: JSON 定价列解析失败
    pub fn classify(
        &self,
        records: &[HashMap<String, String>],
        hint: Option<EntityKind>,
    ) -> ImportResult<ParsedImportData> {
        let mut parsed = ParsedImportData::default();
        if records.is_empty() {
            return Ok(parsed);
        }

        // 通用快速路径: 表头同时含 type + name（且未给 hint）
        let generic = hint.is_none()
            && records[0].contains_key("type")
            && records[0].contains_key("name");

        for (idx, record) in records.iter().enumerate() {
            let row = RawRow::new(record, idx + 1);

            let kind = if generic {
                // type 列直接分发；name 为空或类型未知的行跳过
                if row.get(COLS_NAME).is_none() {
                    continue;
                }
                match row.get(&["type"]).and_then(EntityKind::from_type_column) {
                    Some(kind) => kind,
                    None => {
                        warn!(row_number = idx + 1, "未知 type 取值,跳过该行");
                        continue;
                    }
                }
            } else if let Some(forced) = hint {
                // hint 短路: 只应用对应谓词,不通过的行静默丢弃
                if !Self::hint_accepts(forced, &row) {
                    debug!(row_number = idx + 1, kind = %forced, "行不满足提示类别谓词,丢弃");
                    continue;
                }
                forced
            } else {
                // 启发式规则表,首个命中生效
                match HEURISTIC_RULES.iter().find(|rule| (rule.matches)(&row)) {
                    Some(rule) => rule.kind,
                    None => continue, // 无 name 无规格标识,无法归类
                }
            };

            self.push_row(kind, &row, &mut parsed)?;
        }

        debug!(
            categories = parsed.categories.len(),
            items = parsed.items.len(),
            sizes = parsed.item_sizes.len(),
            groups = parsed.modifier_groups.len(),
            modifiers = parsed.modifiers.len(),
            overrides = parsed.item_modifier_overrides.len(),
            "行分类完成"
        );
        Ok(parsed)
    }

    /// hint 路径的接收谓词
    ///
    /// Category/Item 仅要求 name 非空,Size 仅要求规格标识非空;
    /// 组/项/覆盖应用与启发式相同的形状谓词
    fn hint_accepts(kind: EntityKind, row: &RawRow) -> bool {
        match kind {
            EntityKind::Category | EntityKind::Item => has_name(row),
            EntityKind::ItemSize => has_size_identifier(row),
            EntityKind::ModifierGroup => looks_like_modifier_group(row),
            EntityKind::Modifier => looks_like_modifier(row),
            EntityKind::ItemModifierOverride => looks_like_override(row),
        }
    }

    /// 按类别解析字段并放入对应列表
    fn push_row(
        &self,
        kind: EntityKind,
        row: &RawRow,
        parsed: &mut ParsedImportData,
    ) -> ImportResult<()> {
        match kind {
            EntityKind::Category => {
                if let Some(r) = parse_category_row(row) {
                    parsed.categories.push(r);
                }
            }
            EntityKind::Item => {
                if let Some(r) = parse_item_row(row) {
                    parsed.items.push(r);
                }
            }
            EntityKind::ItemSize => {
                if let Some(r) = parse_item_size_row(row) {
                    parsed.item_sizes.push(r);
                }
            }
            EntityKind::ModifierGroup => {
                if let Some(r) = parse_modifier_group_row(row)? {
                    parsed.modifier_groups.push(r);
                }
            }
            EntityKind::Modifier => {
                if let Some(r) = parse_modifier_row(row) {
                    parsed.modifiers.push(r);
                }
            }
            EntityKind::ItemModifierOverride => {
                if let Some(r) = parse_override_row(row)? {
                    parsed.item_modifier_overrides.push(r);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_of(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn classify_one(pairs: &[(&str, &str)]) -> Option<EntityKind> {
        let map = row_of(pairs);
        let row = RawRow::new(&map, 1);
        HEURISTIC_RULES
            .iter()
            .find(|rule| (rule.matches)(&row))
            .map(|rule| rule.kind)
    }

    // ===== 规则级单测 =====

    #[test]
    fn test_rule_size_identifier_wins_first() {
        assert_eq!(
            classify_one(&[("code", "L"), ("name", "Large")]),
            Some(EntityKind::ItemSize)
        );
        assert_eq!(
            classify_one(&[("size_code", "M")]),
            Some(EntityKind::ItemSize)
        );
    }

    #[test]
    fn test_rule_modifier_group_shape() {
        assert_eq!(
            classify_one(&[("name", "Toppings"), ("display_type", "multi")]),
            Some(EntityKind::ModifierGroup)
        );
        assert_eq!(
            classify_one(&[("name", "Toppings"), ("min_select", "0"), ("max_select", "3")]),
            Some(EntityKind::ModifierGroup)
        );
        // display_type 列存在但为空,列存在性即满足组形状
        assert_eq!(
            classify_one(&[("name", "Toppings"), ("display_type", "")]),
            Some(EntityKind::ModifierGroup)
        );
    }

    #[test]
    fn test_rule_modifier_item_shape() {
        // modifier_key 非空
        assert_eq!(
            classify_one(&[("name", "Cheese"), ("group_key", "Toppings"), ("modifier_key", "cheese")]),
            Some(EntityKind::Modifier)
        );
        // 正数 max_quantity
        assert_eq!(
            classify_one(&[("name", "Cheese"), ("group_key", "Toppings"), ("max_quantity", "3")]),
            Some(EntityKind::Modifier)
        );
        // max_quantity 为 0 不满足
        assert_ne!(
            classify_one(&[("name", "Cheese"), ("group_key", "Toppings"), ("max_quantity", "0")]),
            Some(EntityKind::Modifier)
        );
    }

    #[test]
    fn test_modifier_item_beats_group_shape() {
        // 同时具备组形状列与项形状 → 项（组谓词排除"像项"的行）
        assert_eq!(
            classify_one(&[
                ("name", "Cheese"),
                ("display_type", "multi"),
                ("group_key", "Toppings"),
                ("modifier_key", "cheese"),
            ]),
            Some(EntityKind::Modifier)
        );
    }

    #[test]
    fn test_rule_plain_item() {
        assert_eq!(
            classify_one(&[("name", "Burger"), ("price", "12.5")]),
            Some(EntityKind::Item)
        );
    }

    #[test]
    fn test_rule_override_triple() {
        assert_eq!(
            classify_one(&[
                ("item_key", "Burger"),
                ("group_key", "Toppings"),
                ("modifier_key", "cheese"),
            ]),
            Some(EntityKind::ItemModifierOverride)
        );
    }

    #[test]
    fn test_rule_fallback_category() {
        // 有 group_key 但不满足项形状,且无组形状列 → 兜底前复查组失败 → 分类
        assert_eq!(
            classify_one(&[("name", "Drinks"), ("group_key", "x")]),
            Some(EntityKind::Category)
        );
    }

    #[test]
    fn test_no_rule_matches() {
        assert_eq!(classify_one(&[("description", "orphan")]), None);
    }

    // ===== 通用快速路径 =====

    #[test]
    fn test_generic_path_type_dispatch() {
        let records = vec![
            row_of(&[("type", "CATEGORY"), ("name", "Mains")]),
            row_of(&[("type", "ITEM"), ("name", "Burger"), ("parent", "Mains")]),
            row_of(&[("type", "SIZE"), ("name", "Large"), ("code", "L")]),
            row_of(&[("type", "MOD_GROUP"), ("name", "Toppings")]),
            row_of(&[("type", "MODIFIER"), ("name", "Cheese"), ("parent", "Toppings")]),
        ];
        let parsed = RowClassifier.classify(&records, None).unwrap();
        assert_eq!(parsed.categories.len(), 1);
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].category_name, Some("Mains".to_string()));
        assert_eq!(parsed.item_sizes.len(), 1);
        assert_eq!(parsed.modifier_groups.len(), 1);
        assert_eq!(parsed.modifiers.len(), 1);
        assert_eq!(parsed.modifiers[0].group_key, "Toppings");
    }

    #[test]
    fn test_generic_path_skips_empty_name_and_unknown_type() {
        let records = vec![
            row_of(&[("type", "CATEGORY"), ("name", "")]),
            row_of(&[("type", "COMBO"), ("name", "Lunch Set")]),
            row_of(&[("type", "CATEGORY"), ("name", "Mains")]),
        ];
        let parsed = RowClassifier.classify(&records, None).unwrap();
        assert_eq!(parsed.categories.len(), 1);
        assert_eq!(parsed.categories[0].name, "Mains");
    }

    // ===== 文件名提示路径 =====

    #[test]
    fn test_detect_kind_from_filename() {
        assert_eq!(
            RowClassifier::detect_kind_from_filename("categories.csv"),
            Some(EntityKind::Category)
        );
        assert_eq!(
            RowClassifier::detect_kind_from_filename("modifier_groups.csv"),
            Some(EntityKind::ModifierGroup)
        );
        assert_eq!(
            RowClassifier::detect_kind_from_filename("modifiers.csv"),
            Some(EntityKind::Modifier)
        );
        assert_eq!(
            RowClassifier::detect_kind_from_filename("item_sizes.csv"),
            Some(EntityKind::ItemSize)
        );
        assert_eq!(
            RowClassifier::detect_kind_from_filename("menu_items.csv"),
            Some(EntityKind::Item)
        );
        assert_eq!(
            RowClassifier::detect_kind_from_filename("item_modifier_overrides.csv"),
            Some(EntityKind::ItemModifierOverride)
        );
        assert_eq!(RowClassifier::detect_kind_from_filename("data.csv"), None);
    }

    #[test]
    fn test_hint_drops_non_matching_rows_silently() {
        // Modifier 提示: 缺组引用的行被丢弃
        let records = vec![
            row_of(&[("name", "Cheese"), ("group_key", "Toppings"), ("modifier_key", "cheese")]),
            row_of(&[("name", "Orphan")]),
        ];
        let parsed = RowClassifier
            .classify(&records, Some(EntityKind::Modifier))
            .unwrap();
        assert_eq!(parsed.modifiers.len(), 1);
        assert_eq!(parsed.total_rows(), 1);
    }

    #[test]
    fn test_hint_category_only_requires_name() {
        // Category 提示下,即便行里带着组形状列也按分类收
        let records = vec![row_of(&[("name", "Drinks"), ("display_type", "multi")])];
        let parsed = RowClassifier
            .classify(&records, Some(EntityKind::Category))
            .unwrap();
        assert_eq!(parsed.categories.len(), 1);
    }
}
