// ==========================================
// 菜单目录导入引擎 - 命令行入口
// ==========================================
// 用法:
//   menu-catalog-import import <business_id> <file.csv> [db_path]
//   menu-catalog-import undo <batch_id> [db_path]
//   menu-catalog-import undo-last <business_id> [db_path]
//   menu-catalog-import recent <business_id> [db_path]
// ==========================================

use menu_catalog_import::db::open_sqlite_connection;
use menu_catalog_import::importer::{CatalogImportCoordinator, CatalogImporter};
use menu_catalog_import::repository::rollback_log_repo::RollbackLogRepository;
use menu_catalog_import::repository::schema::init_schema;
use std::sync::{Arc, Mutex};

const DEFAULT_DB_PATH: &str = "menu_catalog.db";

fn usage() -> ! {
    eprintln!("用法:");
    eprintln!("  menu-catalog-import import <business_id> <file.csv> [db_path]");
    eprintln!("  menu-catalog-import undo <batch_id> [db_path]");
    eprintln!("  menu-catalog-import undo-last <business_id> [db_path]");
    eprintln!("  menu-catalog-import recent <business_id> [db_path]");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    menu_catalog_import::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", menu_catalog_import::APP_NAME);
    tracing::info!("系统版本: {}", menu_catalog_import::VERSION);
    tracing::info!("==================================================");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(|s| s.as_str()).unwrap_or_else(|| usage());

    let open_db = |db_path: &str| -> anyhow::Result<Arc<Mutex<rusqlite::Connection>>> {
        tracing::info!("使用数据库: {}", db_path);
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;
        Ok(Arc::new(Mutex::new(conn)))
    };

    match command {
        "import" => {
            let (Some(business_id), Some(file_path)) = (args.get(1), args.get(2)) else {
                usage()
            };
            let db_path = args.get(3).map(|s| s.as_str()).unwrap_or(DEFAULT_DB_PATH);
            let conn = open_db(db_path)?;

            let coordinator = CatalogImportCoordinator::new(conn);
            let outcome = coordinator.import_from_csv(business_id, file_path).await?;
            println!(
                "batch_id={} total={} created={} updated={} elapsed_ms={}",
                outcome.batch.batch_id,
                outcome.batch.total_rows,
                outcome.created(),
                outcome.updated(),
                outcome.elapsed_time.as_millis()
            );
        }
        "undo" => {
            let Some(batch_id) = args.get(1) else { usage() };
            let db_path = args.get(2).map(|s| s.as_str()).unwrap_or(DEFAULT_DB_PATH);
            let conn = open_db(db_path)?;

            let coordinator = CatalogImportCoordinator::new(conn);
            let batch = coordinator.undo_import(batch_id).await?;
            println!("batch_id={} undone={}", batch.batch_id, batch.undone);
        }
        "undo-last" => {
            let Some(business_id) = args.get(1) else { usage() };
            let db_path = args.get(2).map(|s| s.as_str()).unwrap_or(DEFAULT_DB_PATH);
            let conn = open_db(db_path)?;

            let log_repo = RollbackLogRepository::new(conn.clone());
            let latest = log_repo
                .latest_active_batch(business_id)?
                .ok_or_else(|| anyhow::anyhow!("商户 {} 没有可撤销的导入批次", business_id))?;

            let coordinator = CatalogImportCoordinator::new(conn);
            let batch = coordinator.undo_import(&latest.batch_id).await?;
            println!("batch_id={} undone={}", batch.batch_id, batch.undone);
        }
        "recent" => {
            let Some(business_id) = args.get(1) else { usage() };
            let db_path = args.get(2).map(|s| s.as_str()).unwrap_or(DEFAULT_DB_PATH);
            let conn = open_db(db_path)?;

            let log_repo = RollbackLogRepository::new(conn);
            for batch in log_repo.list_recent_batches(business_id, 10)? {
                println!(
                    "{}  {}  total={} created={} updated={} undone={}",
                    batch.batch_id,
                    batch.imported_at.format("%Y-%m-%d %H:%M:%S"),
                    batch.total_rows,
                    batch.created_count,
                    batch.updated_count,
                    batch.undone
                );
            }
        }
        _ => usage(),
    }

    Ok(())
}
