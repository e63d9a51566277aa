// ==========================================
// 仓储 ERP 后台 - 命令行入口
// ==========================================
// 用法:
//   erp-backoffice allocate <订单号清单.csv|.xlsx>
//   erp-backoffice redistribute "<操作名>" <开始日期> <结束日期> [--commit]
//   erp-backoffice log [条数]
// 环境变量:
//   ERP_BACKOFFICE_DB_DIR       数据库目录（<schema>.db）
//   ERP_BACKOFFICE_STAGING_DIR  导出暂存目录
//   RUST_LOG                    日志级别
// ==========================================

use anyhow::{anyhow, Context};
use erp_backoffice::app::AppState;
use erp_backoffice::config::AppConfig;
use erp_backoffice::engine::RedistributionRequest;
use std::path::Path;

const USAGE: &str = "用法:
  erp-backoffice allocate <file>
  erp-backoffice redistribute <action> <start_date> <end_date> [--commit]
  erp-backoffice log [limit]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    erp_backoffice::logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match args.first() {
        Some(c) => c.as_str(),
        None => {
            eprintln!("{}", USAGE);
            return Ok(());
        }
    };

    tracing::info!("{} v{}", erp_backoffice::APP_NAME, erp_backoffice::VERSION);

    let state = AppState::new(AppConfig::from_env())
        .await
        .map_err(|e| anyhow!(e))?;
    let actor = std::env::var("USER").unwrap_or_else(|_| "cli".to_string());

    match command {
        "allocate" => {
            let file = args.get(1).ok_or_else(|| anyhow!("缺少文件参数\n{}", USAGE))?;
            let response = state
                .allocation_api
                .allocate_upload(Path::new(file), &actor)
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        "redistribute" => {
            if args.len() < 4 {
                return Err(anyhow!("参数不足\n{}", USAGE));
            }
            let request = RedistributionRequest {
                action: args[1].clone(),
                start_date: args[2].clone(),
                end_date: args[3].clone(),
                dry_run: !args.iter().skip(4).any(|a| a == "--commit"),
            };
            let response = state.redistribution_api.run(&request, &actor).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        "log" => {
            let limit = match args.get(1) {
                Some(v) => v.parse::<i64>().context("limit 必须为整数")?,
                None => 20,
            };
            let logs = state.action_log_repo.list_recent(limit)?;
            println!("{}", serde_json::to_string_pretty(&logs)?);
        }
        other => {
            return Err(anyhow!("未知命令: {}\n{}", other, USAGE));
        }
    }

    Ok(())
}
