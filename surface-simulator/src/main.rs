mod config;
mod producer;
mod report;
mod sink;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use input_surface::{FrameDropper, FrameQueueThread};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{ConfigManager, EnvConfigOverride, SimulatorConfig};
use crate::producer::ProducerStats;
use crate::report::RunReport;
use crate::sink::RecordingSink;

/// 用合成生产者驱动输入面帧节奏控制
#[derive(Parser, Debug)]
#[command(name = "surface-simulator", version, about)]
struct Args {
    /// TOML 配置文件，不存在时写出默认配置
    #[arg(long)]
    config: Option<PathBuf>,

    /// 生产帧率
    #[arg(long)]
    fps: Option<f64>,

    /// 最大帧率，负数禁用丢帧
    #[arg(long, allow_hyphen_values = true)]
    max_fps: Option<f32>,

    /// 生产帧数
    #[arg(long)]
    frames: Option<u64>,

    /// 报告输出路径，缺省打印到标准输出
    #[arg(long)]
    report: Option<PathBuf>,

    /// 日志级别，RUST_LOG 优先
    #[arg(long)]
    log_level: Option<String>,
}

async fn load_config(args: &Args) -> Result<SimulatorConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let mut manager = ConfigManager::new(path.clone());
            manager
                .load()
                .await
                .with_context(|| format!("Loading {:?}", manager.path()))?;
            manager.into_config()
        }
        None => SimulatorConfig::default(),
    };

    EnvConfigOverride::apply_overrides(&mut config);

    if let Some(fps) = args.fps {
        config.producer.fps = fps;
    }
    if let Some(max_fps) = args.max_fps {
        config.pacing.max_fps = max_fps;
    }
    if let Some(frames) = args.frames {
        config.producer.frames = frames;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args).await?;

    // 初始化日志 - 使用环境变量 RUST_LOG 控制级别
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with_target(false)
        .init();

    info!("🎞️ Surface simulator starting...");
    info!(
        "✓ Configuration loaded: producer {:.2} fps x {} frame(s), max {:.2} fps, interval {:?}",
        config.producer.fps, config.producer.frames, config.pacing.max_fps, config.queue.interval
    );

    let sink = Arc::new(RecordingSink::new());
    let queue = FrameQueueThread::new(Arc::downgrade(&sink), config.queue.clone())?;
    let mut dropper = FrameDropper::new();
    dropper.set_max_frame_rate(config.pacing.max_fps);

    let started_at = Utc::now();
    let mut producer_stats = ProducerStats::default();
    tokio::select! {
        result = producer::run(&config.producer, &queue, &mut dropper, &mut producer_stats) => result?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping producer");
        }
    }

    let drain_timeout = config
        .queue
        .wait_after_forward()
        .saturating_mul(10)
        .saturating_add(config.producer.render_delay.saturating_mul(2));
    let drained = producer::drain(&queue, drain_timeout.max(Duration::from_secs(1))).await;
    let queue_stats = queue.stats();
    drop(queue);

    let report = RunReport {
        session_id: Uuid::new_v4(),
        started_at,
        finished_at: Utc::now(),
        producer_fps: config.producer.fps,
        max_fps: config.pacing.max_fps,
        min_interval_us: dropper.min_interval_us(),
        drained,
        producer: producer_stats,
        queue: queue_stats,
        sink: sink.ledger(),
    };

    match report.delivered_fps() {
        Some(fps) => info!("✓ Delivered {} frame(s) at {:.2} fps", report.sink.works, fps),
        None => info!("✓ Delivered {} frame(s)", report.sink.works),
    }
    report.write(args.report.as_deref()).await?;

    info!("✅ Surface simulator finished");
    Ok(())
}
