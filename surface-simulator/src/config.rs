use anyhow::{bail, Context, Result};
use input_surface::priority::PRIORITY_VIDEO;
use input_surface::FrameQueueConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 生产帧率下限
pub const MIN_PRODUCER_FPS: f64 = 0.001;

/// 生产帧率上限，保证帧周期至少 1 微秒
pub const MAX_PRODUCER_FPS: f64 = 1_000_000.0;

/// 模拟器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// 合成生产者
    pub producer: ProducerConfig,

    /// 丢帧控制
    pub pacing: PacingConfig,

    /// 帧队列线程
    pub queue: FrameQueueConfig,

    /// 日志
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// 生产帧率
    pub fps: f64,

    /// 生产帧数
    pub frames: u64,

    /// 每帧负载字节数
    pub payload_size: usize,

    /// 栅栏触发延迟（模拟渲染耗时）
    #[serde(serialize_with = "input_surface::serde_helpers::serialize_duration")]
    #[serde(deserialize_with = "input_surface::serde_helpers::deserialize_duration")]
    pub render_delay: Duration,

    /// 时间戳抖动上限（微秒）
    pub jitter_us: i64,

    /// 每隔多少帧切换一次数据空间
    pub dataspace_switch_every: Option<u64>,

    /// 抖动随机种子
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// 最大帧率，负数禁用丢帧
    pub max_fps: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别 (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            producer: ProducerConfig::default(),
            pacing: PacingConfig::default(),
            queue: FrameQueueConfig {
                initial_priority: Some(PRIORITY_VIDEO),
                ..Default::default()
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            fps: 60.0,
            frames: 300,
            payload_size: 4096,
            render_delay: Duration::from_millis(4),
            jitter_us: 500,
            dataspace_switch_every: Some(120),
            seed: 0x5eed,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self { max_fps: 30.0 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<()> {
        // 同时排除 NaN 与无穷大
        if !(MIN_PRODUCER_FPS..=MAX_PRODUCER_FPS).contains(&self.producer.fps) {
            bail!(
                "Producer frame rate {} out of range [{}, {}]",
                self.producer.fps,
                MIN_PRODUCER_FPS,
                MAX_PRODUCER_FPS
            );
        }

        if self.producer.frames == 0 {
            bail!("Producer frame count must be greater than 0");
        }

        if self.producer.payload_size == 0 {
            bail!("Payload size must be greater than 0");
        }

        if self.producer.jitter_us < 0 {
            bail!("Timestamp jitter must not be negative");
        }

        if self.pacing.max_fps == 0.0 {
            bail!("Max frame rate must be positive, or negative to disable dropping");
        }

        self.queue
            .validate()
            .context("Invalid frame queue configuration")?;

        Ok(())
    }
}

/// 配置管理器，负责加载、保存与校验
pub struct ConfigManager {
    config_path: PathBuf,
    config: SimulatorConfig,
}

impl ConfigManager {
    pub fn new(config_path: PathBuf) -> Self {
        Self {
            config_path,
            config: SimulatorConfig::default(),
        }
    }

    /// 从文件加载配置，文件不存在时写出默认配置
    pub async fn load(&mut self) -> Result<()> {
        if !self.config_path.exists() {
            self.save().await?;
            return Ok(());
        }

        let content = tokio::fs::read_to_string(&self.config_path)
            .await
            .with_context(|| format!("Failed to read config file {:?}", self.config_path))?;

        self.config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", self.config_path))?;

        self.config.validate()?;
        Ok(())
    }

    pub async fn save(&self) -> Result<()> {
        let content =
            toml::to_string_pretty(&self.config).context("Failed to serialize config")?;

        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context("Failed to create config directory")?;
            }
        }

        tokio::fs::write(&self.config_path, content)
            .await
            .with_context(|| format!("Failed to write config file {:?}", self.config_path))?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn into_config(self) -> SimulatorConfig {
        self.config
    }
}

/// 环境变量覆盖
pub struct EnvConfigOverride;

impl EnvConfigOverride {
    pub fn apply_overrides(config: &mut SimulatorConfig) {
        Self::apply_from(config, |key| std::env::var(key).ok());
    }

    pub fn apply_from(config: &mut SimulatorConfig, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(fps) = lookup("SURFACE_SIM_FPS").and_then(|v| v.parse::<f64>().ok()) {
            config.producer.fps = fps;
        }
        if let Some(max_fps) = lookup("SURFACE_SIM_MAX_FPS").and_then(|v| v.parse::<f32>().ok()) {
            config.pacing.max_fps = max_fps;
        }
        if let Some(frames) = lookup("SURFACE_SIM_FRAMES").and_then(|v| v.parse::<u64>().ok()) {
            config.producer.frames = frames;
        }
        if let Some(level) = lookup("SURFACE_SIM_LOG_LEVEL") {
            config.logging.level = level;
        }
    }
}
