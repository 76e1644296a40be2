// ==========================================
// 菜单目录导入引擎 - 数据库表结构
// ==========================================
// 说明:
// - SQLite 在此充当文档库角色: 主键为 UUID TEXT,
//   子文档（modifier_groups/prices_by_size/quantity_levels）以 JSON 文本列存储
// - 自然键不做唯一约束,自然键解析是应用层（导入引擎）职责
// ==========================================

use rusqlite::Connection;

/// 目录 + 补偿日志表 DDL（幂等,可重复执行）
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS category (
    id            TEXT PRIMARY KEY,
    business_id   TEXT NOT NULL,
    name          TEXT NOT NULL,
    description   TEXT,
    sort_order    INTEGER NOT NULL DEFAULT 0,
    is_active     INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_category_business ON category(business_id);

CREATE TABLE IF NOT EXISTS item_size (
    id            TEXT PRIMARY KEY,
    business_id   TEXT NOT NULL,
    code          TEXT NOT NULL,
    name          TEXT,
    display_order INTEGER NOT NULL DEFAULT 0,
    is_active     INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_item_size_business ON item_size(business_id);

CREATE TABLE IF NOT EXISTS modifier_group (
    id              TEXT PRIMARY KEY,
    business_id     TEXT NOT NULL,
    name            TEXT NOT NULL,
    display_name    TEXT,
    display_type    TEXT,
    min_select      INTEGER NOT NULL DEFAULT 0,
    max_select      INTEGER NOT NULL DEFAULT 0,
    sort_order      INTEGER NOT NULL DEFAULT 0,
    is_active       INTEGER NOT NULL DEFAULT 1,
    quantity_levels TEXT,
    prices_by_size  TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_modifier_group_business ON modifier_group(business_id);

CREATE TABLE IF NOT EXISTS modifier (
    id            TEXT PRIMARY KEY,
    business_id   TEXT NOT NULL,
    group_id      TEXT NOT NULL REFERENCES modifier_group(id),
    name          TEXT NOT NULL,
    display_order INTEGER NOT NULL DEFAULT 0,
    is_active     INTEGER NOT NULL DEFAULT 1,
    max_quantity  INTEGER,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_modifier_group_id ON modifier(group_id);

CREATE TABLE IF NOT EXISTS item (
    id              TEXT PRIMARY KEY,
    business_id     TEXT NOT NULL,
    category_id     TEXT NOT NULL REFERENCES category(id),
    name            TEXT NOT NULL,
    description     TEXT,
    sort_order      INTEGER NOT NULL DEFAULT 0,
    is_active       INTEGER NOT NULL DEFAULT 1,
    base_price      REAL NOT NULL DEFAULT 0,
    is_sizeable     INTEGER NOT NULL DEFAULT 0,
    default_size_id TEXT,
    modifier_groups TEXT NOT NULL DEFAULT '[]',
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_item_business ON item(business_id);
CREATE INDEX IF NOT EXISTS idx_item_category ON item(category_id);

CREATE TABLE IF NOT EXISTS import_batch (
    batch_id      TEXT PRIMARY KEY,
    business_id   TEXT NOT NULL,
    file_name     TEXT,
    total_rows    INTEGER NOT NULL DEFAULT 0,
    created_count INTEGER NOT NULL DEFAULT 0,
    updated_count INTEGER NOT NULL DEFAULT 0,
    undone        INTEGER NOT NULL DEFAULT 0,
    imported_at   TEXT NOT NULL,
    elapsed_ms    INTEGER
);
CREATE INDEX IF NOT EXISTS idx_import_batch_business ON import_batch(business_id);

CREATE TABLE IF NOT EXISTS rollback_op (
    batch_id      TEXT NOT NULL REFERENCES import_batch(batch_id),
    seq           INTEGER NOT NULL,
    entity_type   TEXT NOT NULL,
    action        TEXT NOT NULL,
    entity_id     TEXT NOT NULL,
    previous_data TEXT,
    PRIMARY KEY (batch_id, seq)
);
"#;

/// 初始化表结构（不存在则建表,存在则跳过）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
