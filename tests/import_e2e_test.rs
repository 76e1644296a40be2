// ==========================================
// 端到端集成测试 - 目录导入完整流程
// ==========================================
// 测试目标: 验证从 CSV 到数据库的完整导入流程
// 覆盖范围: 分文件导入 / 通用混装文件 / 幂等重导 / 自然键大小写 /
//           基础字段更新红线 / 默认规格指派 / 定价条目规格过滤
// ==========================================


use menu_catalog_import::domain::{
    CategoryRow, ItemRow, ModifierGroupAssignment, ParsedImportData, RollbackAction,
};
use menu_catalog_import::importer::{CatalogImportCoordinator, CatalogImporter};
use menu_catalog_import::logging;
use test_helpers::*;

/// 按依赖顺序导入六个分文件,返回协调器与各批次 ID
async fn import_full_catalog(coordinator: &CatalogImportCoordinator) -> Vec<String> {
    let files: &[(&str, &str)] = &[
        ("categories.csv", CATEGORIES_CSV),
        ("item_sizes.csv", SIZES_CSV),
        ("modifier_groups.csv", GROUPS_CSV),
        ("modifiers.csv", MODIFIERS_CSV),
        ("menu_items.csv", ITEMS_CSV),
        ("item_modifier_overrides.csv", OVERRIDES_CSV),
    ];
    let mut batch_ids = Vec::new();
    for (name, content) in files {
        let outcome = coordinator
            .import_buffer(BUSINESS_ID, content.as_bytes(), name)
            .await
            .unwrap_or_else(|e| panic!("导入 {} 应该成功: {}", name, e));
        batch_ids.push(outcome.batch.batch_id);
    }
    batch_ids
}

#[tokio::test]
async fn test_e2e_per_file_import_full_catalog() {
    logging::init_test();
    let (_temp, conn) = create_test_db().unwrap();
    let coordinator = CatalogImportCoordinator::new(conn.clone());

    import_full_catalog(&coordinator).await;

    // 各实体落库数量
    assert_eq!(count_rows(&conn, "category"), 2);
    assert_eq!(count_rows(&conn, "item_size"), 3);
    assert_eq!(count_rows(&conn, "modifier_group"), 2);
    assert_eq!(count_rows(&conn, "modifier"), 3);
    assert_eq!(count_rows(&conn, "item"), 2);
    assert_eq!(count_rows(&conn, "import_batch"), 6);

    // 默认规格: Burger 声明 default_size_code=M
    let m_size_id = query_string(&conn, "SELECT id FROM item_size WHERE code = 'M'", &[]);
    let burger_default = query_string(
        &conn,
        "SELECT default_size_id FROM item WHERE name = 'Burger'",
        &[],
    );
    assert_eq!(burger_default, m_size_id);

    // 覆盖装配: Burger 挂载 2 组,组内出现位次即 display_order
    let raw = query_string(
        &conn,
        "SELECT modifier_groups FROM item WHERE name = 'Burger'",
        &[],
    );
    let assignments: Vec<ModifierGroupAssignment> = serde_json::from_str(&raw).unwrap();
    assert_eq!(assignments.len(), 2);
    assert_eq!(assignments[0].display_order, 0);
    assert_eq!(assignments[1].display_order, 1);
    assert_eq!(assignments[0].modifiers.len(), 2); // Toppings: Cheese + Bacon
    assert_eq!(assignments[1].modifiers.len(), 1); // Sauces: Ketchup

    // Cheese 覆盖条目: prices_by_size 的 size_code 已翻译为 size_id
    let l_size_id = query_string(&conn, "SELECT id FROM item_size WHERE code = 'L'", &[]);
    let cheese = &assignments[0].modifiers[0];
    let prices = cheese.prices_by_size.as_ref().unwrap();
    assert_eq!(prices.len(), 1);
    assert_eq!(prices[0].size_id, l_size_id);
    assert_eq!(prices[0].price, 2.5);

    // 未声明覆盖行的 Cola 不挂载任何组
    let cola_raw = query_string(
        &conn,
        "SELECT modifier_groups FROM item WHERE name = 'Cola'",
        &[],
    );
    let cola: Vec<ModifierGroupAssignment> = serde_json::from_str(&cola_raw).unwrap();
    assert!(cola.is_empty());
}

#[tokio::test]
async fn test_e2e_generic_single_file_import() {
    logging::init_test();
    let (_temp, conn) = create_test_db().unwrap();
    let coordinator = CatalogImportCoordinator::new(conn.clone());

    // "catalog.csv" 不含任何类别关键词 → 走 type 列通用路径
    let outcome = coordinator
        .import_buffer(BUSINESS_ID, GENERIC_CATALOG_CSV.as_bytes(), "catalog.csv")
        .await
        .expect("通用格式导入应该成功");

    assert_eq!(outcome.created(), 8);
    assert_eq!(outcome.updated(), 0);
    assert_eq!(count_rows(&conn, "category"), 2);
    assert_eq!(count_rows(&conn, "item_size"), 2);
    assert_eq!(count_rows(&conn, "modifier_group"), 1);
    assert_eq!(count_rows(&conn, "modifier"), 1);
    assert_eq!(count_rows(&conn, "item"), 2);

    // parent 列承载了菜品 → 分类、加料项 → 组的引用
    let mains_id = query_string(&conn, "SELECT id FROM category WHERE name = 'Mains'", &[]);
    let burger_cat = query_string(
        &conn,
        "SELECT category_id FROM item WHERE name = 'Burger'",
        &[],
    );
    assert_eq!(burger_cat, mains_id);
}

#[tokio::test]
async fn test_category_and_item_pair_creates_two_entities() {
    logging::init_test();
    let (_temp, conn) = create_test_db().unwrap();
    let coordinator = CatalogImportCoordinator::new(conn.clone());

    let csv = "\
type,name,parent
CATEGORY,Mains,
ITEM,Burger,Mains
";
    let outcome = coordinator
        .import_buffer(BUSINESS_ID, csv.as_bytes(), "catalog.csv")
        .await
        .unwrap();

    assert_eq!(outcome.created(), 2);
    assert_eq!(outcome.rollback_ops.len(), 2);
    assert_eq!(count_rows(&conn, "category"), 1);
    assert_eq!(count_rows(&conn, "item"), 1);

    let mains_id = query_string(&conn, "SELECT id FROM category WHERE name = 'Mains'", &[]);
    assert_eq!(
        query_string(&conn, "SELECT category_id FROM item WHERE name = 'Burger'", &[]),
        mains_id
    );
}

#[tokio::test]
async fn test_override_assignment_is_full_replace() {
    logging::init_test();
    let (_temp, conn) = create_test_db().unwrap();
    let coordinator = CatalogImportCoordinator::new(conn.clone());

    import_full_catalog(&coordinator).await;

    // Burger 目前挂载 Toppings + Sauces;只导入 Sauces 覆盖行 → 整体替换为仅 Sauces
    let overrides = "\
item_key,group_key,modifier_key
Burger,Sauces,Ketchup
";
    coordinator
        .import_buffer(
            BUSINESS_ID,
            overrides.as_bytes(),
            "item_modifier_overrides.csv",
        )
        .await
        .unwrap();

    let raw = query_string(
        &conn,
        "SELECT modifier_groups FROM item WHERE name = 'Burger'",
        &[],
    );
    let assignments: Vec<ModifierGroupAssignment> = serde_json::from_str(&raw).unwrap();
    let sauces_id = query_string(
        &conn,
        "SELECT id FROM modifier_group WHERE name = 'Sauces'",
        &[],
    );
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].group_id, sauces_id);
}

#[tokio::test]
async fn test_reimport_same_file_is_idempotent() {
    logging::init_test();
    let (_temp, conn) = create_test_db().unwrap();
    let coordinator = CatalogImportCoordinator::new(conn.clone());

    let first = coordinator
        .import_buffer(BUSINESS_ID, CATEGORIES_CSV.as_bytes(), "categories.csv")
        .await
        .unwrap();
    assert_eq!(first.created(), 2);
    assert_eq!(first.updated(), 0);

    // 同文件重导: 全部走更新路径,无重复创建
    let second = coordinator
        .import_buffer(BUSINESS_ID, CATEGORIES_CSV.as_bytes(), "categories.csv")
        .await
        .unwrap();
    assert_eq!(second.created(), 0);
    assert_eq!(second.updated(), 2);
    assert_eq!(count_rows(&conn, "category"), 2);
}

#[tokio::test]
async fn test_item_update_preserves_pricing_fields() {
    logging::init_test();
    let (_temp, conn) = create_test_db().unwrap();
    let coordinator = CatalogImportCoordinator::new(conn.clone());

    coordinator
        .import_buffer(BUSINESS_ID, CATEGORIES_CSV.as_bytes(), "categories.csv")
        .await
        .unwrap();
    coordinator
        .import_buffer(BUSINESS_ID, ITEMS_CSV.as_bytes(), "menu_items.csv")
        .await
        .unwrap();
    assert_eq!(
        query_f64(&conn, "SELECT base_price FROM item WHERE name = 'Burger'", &[]),
        12.5
    );

    // 重导同名菜品,改价格与描述: 描述属基础字段被更新,定价不可被导入覆盖
    let updated_items = "\
name,category_name,base_price,description
Burger,Mains,99.0,New description
";
    let outcome = coordinator
        .import_buffer(BUSINESS_ID, updated_items.as_bytes(), "menu_items.csv")
        .await
        .unwrap();
    assert_eq!(outcome.created(), 0);
    assert_eq!(outcome.updated(), 1);

    assert_eq!(
        query_f64(&conn, "SELECT base_price FROM item WHERE name = 'Burger'", &[]),
        12.5
    );
    assert_eq!(
        query_string(&conn, "SELECT description FROM item WHERE name = 'Burger'", &[]),
        "New description"
    );
}

#[tokio::test]
async fn test_natural_keys_are_case_insensitive() {
    logging::init_test();
    let (_temp, conn) = create_test_db().unwrap();
    let coordinator = CatalogImportCoordinator::new(conn.clone());

    coordinator
        .import_buffer(BUSINESS_ID, CATEGORIES_CSV.as_bytes(), "categories.csv")
        .await
        .unwrap();

    // 分类名大小写不同仍解析到同一分类,不重复创建
    let items = "\
name,category_name,base_price
Burger,MAINS,12.5
";
    coordinator
        .import_buffer(BUSINESS_ID, items.as_bytes(), "menu_items.csv")
        .await
        .unwrap();
    assert_eq!(count_rows(&conn, "category"), 2);

    let mains_id = query_string(&conn, "SELECT id FROM category WHERE name = 'Mains'", &[]);
    let burger_cat = query_string(
        &conn,
        "SELECT category_id FROM item WHERE name = 'Burger'",
        &[],
    );
    assert_eq!(burger_cat, mains_id);

    // 菜品名大小写不同 → 更新同一菜品
    let items_upper = "\
name,category_name,description
BURGER,Mains,Loud burger
";
    let outcome = coordinator
        .import_buffer(BUSINESS_ID, items_upper.as_bytes(), "menu_items.csv")
        .await
        .unwrap();
    assert_eq!(outcome.created(), 0);
    assert_eq!(outcome.updated(), 1);
    assert_eq!(count_rows(&conn, "item"), 1);
}

#[tokio::test]
async fn test_group_prices_drop_unresolved_size_codes() {
    logging::init_test();
    let (_temp, conn) = create_test_db().unwrap();
    let coordinator = CatalogImportCoordinator::new(conn.clone());

    coordinator
        .import_buffer(BUSINESS_ID, SIZES_CSV.as_bytes(), "item_sizes.csv")
        .await
        .unwrap();

    // XL 未导入 → 该条目静默丢弃,L 正常翻译
    let groups = "\
name,display_type,prices_by_size
Toppings,multi,\"[{\"\"size_code\"\":\"\"XL\"\",\"\"price\"\":9.9},{\"\"size_code\"\":\"\"L\"\",\"\"price\"\":2.0}]\"
";
    coordinator
        .import_buffer(BUSINESS_ID, groups.as_bytes(), "modifier_groups.csv")
        .await
        .expect("不可解析的规格条目不应让导入失败");

    let raw = query_string(
        &conn,
        "SELECT prices_by_size FROM modifier_group WHERE name = 'Toppings'",
        &[],
    );
    let prices: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
    assert_eq!(prices.len(), 1);
    assert_eq!(prices[0]["price"], 2.0);
}

#[tokio::test]
async fn test_unresolved_default_size_is_skipped() {
    logging::init_test();
    let (_temp, conn) = create_test_db().unwrap();
    let coordinator = CatalogImportCoordinator::new(conn.clone());

    coordinator
        .import_buffer(BUSINESS_ID, CATEGORIES_CSV.as_bytes(), "categories.csv")
        .await
        .unwrap();

    // 规格未导入: default_size_code 无法解析 → 跳过指派,导入本身成功
    let items = "\
name,category_name,base_price,default_size_code
Burger,Mains,12.5,XL
";
    coordinator
        .import_buffer(BUSINESS_ID, items.as_bytes(), "menu_items.csv")
        .await
        .expect("默认规格无法解析不应让导入失败");

    let conn_guard = conn.lock().unwrap();
    let default_size: Option<String> = conn_guard
        .query_row(
            "SELECT default_size_id FROM item WHERE name = 'Burger'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(default_size.is_none());
}

#[tokio::test]
async fn test_save_all_over_preparsed_rows() {
    logging::init_test();
    let (_temp, conn) = create_test_db().unwrap();
    let coordinator = CatalogImportCoordinator::new(conn.clone());

    // 调用方自行拆批的场景: 跳过文件解析,直接落库已分类数据
    let parsed = ParsedImportData {
        categories: vec![CategoryRow {
            name: "Mains".to_string(),
            description: Some("Main dishes".to_string()),
            sort_order: Some(1),
            is_active: None,
            row_number: 1,
        }],
        items: vec![ItemRow {
            name: "Burger".to_string(),
            category_id: None,
            category_name: Some("Mains".to_string()),
            description: None,
            sort_order: None,
            is_active: None,
            base_price: Some(12.5),
            is_sizeable: None,
            default_size_code: None,
            row_number: 2,
        }],
        ..Default::default()
    };

    let ops = coordinator
        .save_all(BUSINESS_ID, &parsed)
        .await
        .expect("已分类数据落库应成功");

    // 返回补偿日志,批次与目录写入同事务持久化
    assert_eq!(ops.len(), 2);
    assert!(ops
        .iter()
        .all(|op| matches!(op.action, RollbackAction::Create)));
    assert_eq!(count_rows(&conn, "category"), 1);
    assert_eq!(count_rows(&conn, "item"), 1);
    assert_eq!(count_rows(&conn, "import_batch"), 1);
    assert_eq!(count_rows(&conn, "rollback_op"), 2);
}
