// ==========================================
// 库存分配引擎 - 命令行入口
// ==========================================
// 用法:
//   inventory-assign waterfall    --settings FILE [--data-dir DIR] [--config FILE]
//   inventory-assign proportional --settings FILE --metrics FILE.csv [--data-dir DIR] [--config FILE]
//   inventory-assign models       [--data-dir DIR] [--config FILE]
//   inventory-assign structure    [--data-dir DIR] [--config FILE]
// 输出: stdout 打印统一响应 JSON；失败时退出码为 1
// ==========================================

use anyhow::{anyhow, bail, Context};
use inventory_assign::api::{ApiResponse, AssignmentApi};
use inventory_assign::config::EngineConfig;
use inventory_assign::engine::AssignmentOrchestrator;
use inventory_assign::feeds::{load_metrics_csv, JsonFileFeed};
use inventory_assign::{logging, perf};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

const USAGE: &str = "用法: inventory-assign <waterfall|proportional|models|structure> \
[--settings FILE] [--metrics FILE.csv] [--data-dir DIR] [--config FILE]";

#[derive(Debug, Default)]
struct CliArgs {
    command: String,
    settings: Option<PathBuf>,
    metrics: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut args = std::env::args().skip(1);
    let mut cli = CliArgs {
        command: args.next().ok_or_else(|| anyhow!(USAGE))?,
        ..Default::default()
    };

    while let Some(flag) = args.next() {
        let mut value = || {
            args.next()
                .map(PathBuf::from)
                .ok_or_else(|| anyhow!("{} 缺少参数值", flag))
        };
        match flag.as_str() {
            "--settings" => cli.settings = Some(value()?),
            "--metrics" => cli.metrics = Some(value()?),
            "--data-dir" => cli.data_dir = Some(value()?),
            "--config" => cli.config = Some(value()?),
            other => bail!("未知参数: {}\n{}", other, USAGE),
        }
    }

    Ok(cli)
}

fn print_json<T: Serialize>(response: &ApiResponse<T>) -> anyhow::Result<bool> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(response.success)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    perf::configure_from_env();

    let cli = parse_args()?;
    let config = EngineConfig::load(cli.config.as_deref()).context("加载引擎配置失败")?;

    let data_dir = cli
        .data_dir
        .clone()
        .or_else(|| config.feeds.data_dir.clone())
        .ok_or_else(|| anyhow!("未指定数据目录（--data-dir 或 INVENTORY_ASSIGN_DATA_DIR）"))?;

    tracing::info!(
        version = inventory_assign::VERSION,
        command = %cli.command,
        data_dir = %data_dir.display(),
        "库存分配引擎启动"
    );

    let feed = Arc::new(JsonFileFeed::new(data_dir));
    let orchestrator = AssignmentOrchestrator::new(feed, config.cache.clone());
    let sweeper = orchestrator.start_sweeper();
    let api = AssignmentApi::new(orchestrator);

    let read_settings = || -> anyhow::Result<String> {
        let path = cli
            .settings
            .as_ref()
            .ok_or_else(|| anyhow!("缺少 --settings\n{}", USAGE))?;
        std::fs::read_to_string(path).with_context(|| format!("读取设置文件失败: {}", path.display()))
    };

    let success = match cli.command.as_str() {
        "waterfall" => {
            let raw = read_settings()?;
            let response = match AssignmentApi::parse_settings(&raw) {
                Ok(settings) => api.calculate_waterfall(&settings).await,
                Err(e) => ApiResponse::fail(&e),
            };
            print_json(&response)?
        }
        "proportional" => {
            let raw = read_settings()?;
            let metrics_path = cli
                .metrics
                .as_ref()
                .ok_or_else(|| anyhow!("按比例分配需要 --metrics\n{}", USAGE))?;
            let metrics = load_metrics_csv(metrics_path)?;
            let response = match AssignmentApi::parse_settings(&raw) {
                Ok(settings) => api.calculate_ratio(&settings, &metrics).await,
                Err(e) => ApiResponse::fail(&e),
            };
            print_json(&response)?
        }
        "models" => print_json(&ApiResponse::from(api.available_models().await))?,
        "structure" => print_json(&ApiResponse::from(api.hierarchical_structure().await))?,
        other => bail!("未知命令: {}\n{}", other, USAGE),
    };

    sweeper.abort();
    if !success {
        std::process::exit(1);
    }
    Ok(())
}
