//! 配置管理命令
//!
//! 配置文件默认位于 `<config_dir>/strider/config.toml`，可用全局参数 `--config` 覆盖。
//!
//! ```toml
//! address = "192.168.4.1"
//!
//! [link]
//! port = 5002
//! sonar_poll_interval_ms = 100
//!
//! [motion]
//! step_size = 25
//! angle_size = 10
//! speed = 2
//! head_center = 90
//! ```

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strider_sdk::{LinkConfig, MotionProfile};

/// 默认配置文件路径
pub fn default_config_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;
    path.push("strider");
    path.push("config.toml");
    Ok(path)
}

/// 解析配置文件路径（命令行参数优先）
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path(),
    }
}

/// CLI 配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// 机器人地址
    pub address: Option<String>,

    /// 链路配置
    pub link: LinkConfig,

    /// 运动参数
    pub motion: MotionProfile,
}

impl CliConfig {
    /// 加载配置（文件不存在时返回默认配置）
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("解析配置文件失败: {}", path.display()))
    }

    /// 保存配置
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir).context("创建配置目录失败")?;
        }

        let content = toml::to_string_pretty(self).context("序列化配置失败")?;
        fs::write(path, format!("# Strider CLI Configuration\n\n{content}"))
            .context("写入配置文件失败")?;
        Ok(())
    }

    /// 确定要连接的地址（命令行参数优先）
    pub fn resolve_address(&self, explicit: Option<&str>) -> Result<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.address.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "未指定机器人地址，请使用 --address 或 `strider-cli config set --address <ip>`"
                )
            })
    }

    /// 读取单个配置项
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "address" => return self.address.clone(),
            "port" => self.link.port.to_string(),
            "speed" => self.motion.speed.to_string(),
            "step" => self.motion.step_size.to_string(),
            "angle" => self.motion.angle_size.to_string(),
            "head_center" => self.motion.head_center.to_string(),
            "sonar_poll_ms" => return self.link.sonar_poll_interval_ms.map(|v| v.to_string()),
            "power_poll_ms" => return self.link.power_poll_interval_ms.map(|v| v.to_string()),
            _ => return None,
        };
        Some(value)
    }
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 设置配置项
    Set {
        /// 机器人地址（IP 或主机名）
        #[arg(short, long)]
        address: Option<String>,

        /// 控制端口
        #[arg(short, long)]
        port: Option<u16>,

        /// 速度档位
        #[arg(long)]
        speed: Option<i32>,

        /// 步长
        #[arg(long)]
        step: Option<i32>,

        /// 转向角增量
        #[arg(long)]
        angle: Option<i32>,

        /// 云台中位角
        #[arg(long)]
        head_center: Option<i32>,

        /// 超声波查询周期（毫秒，0 关闭）
        #[arg(long)]
        sonar_poll_ms: Option<u64>,

        /// 电量查询周期（毫秒，0 关闭）
        #[arg(long)]
        power_poll_ms: Option<u64>,
    },

    /// 获取配置项
    Get {
        /// 配置项名称（address, port, speed, step, angle, head_center,
        /// sonar_poll_ms, power_poll_ms, all）
        #[arg(default_value = "all")]
        key: String,
    },

    /// 检查配置
    Check,
}

impl ConfigCommand {
    pub fn execute(self, path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Set {
                address,
                port,
                speed,
                step,
                angle,
                head_center,
                sonar_poll_ms,
                power_poll_ms,
            } => {
                let mut config = CliConfig::load(path)?;
                if let Some(address) = address {
                    println!("✅ 设置机器人地址: {}", address);
                    config.address = Some(address);
                }
                if let Some(port) = port {
                    println!("✅ 设置控制端口: {}", port);
                    config.link.port = port;
                }
                if let Some(speed) = speed {
                    println!("✅ 设置速度: {}", speed);
                    config.motion.speed = speed;
                }
                if let Some(step) = step {
                    println!("✅ 设置步长: {}", step);
                    config.motion.step_size = step;
                }
                if let Some(angle) = angle {
                    println!("✅ 设置转向角: {}", angle);
                    config.motion.angle_size = angle;
                }
                if let Some(center) = head_center {
                    println!("✅ 设置云台中位角: {}", center);
                    config.motion.head_center = center;
                }
                if let Some(ms) = sonar_poll_ms {
                    println!("✅ 设置超声波查询周期: {} ms", ms);
                    config.link.sonar_poll_interval_ms = Some(ms);
                }
                if let Some(ms) = power_poll_ms {
                    println!("✅ 设置电量查询周期: {} ms", ms);
                    config.link.power_poll_interval_ms = Some(ms);
                }
                config.save(path)
            },

            ConfigCommand::Get { key } => {
                let config = CliConfig::load(path)?;
                if key == "all" {
                    print!("{}", toml::to_string_pretty(&config).context("序列化配置失败")?);
                } else {
                    match config.get(&key) {
                        Some(value) => println!("{}", value),
                        None => println!("(未设置)"),
                    }
                }
                Ok(())
            },

            ConfigCommand::Check => {
                println!("配置文件: {}", path.display());
                if !path.exists() {
                    println!("  (不存在，使用默认配置)");
                }
                let config = CliConfig::load(path)?;
                println!("  地址: {}", config.address.as_deref().unwrap_or("(未设置)"));
                println!("  端口: {}", config.link.port);
                println!(
                    "  运动参数: step={} angle={} speed={} head_center={}",
                    config.motion.step_size,
                    config.motion.angle_size,
                    config.motion.speed,
                    config.motion.head_center
                );
                Ok(())
            },
        }
    }
}
