//! 状态命令
//!
//! 连接后等待一段时间收集遥测，然后打印快照。

use super::ConnectArgs;
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::time::Duration;
use strider_sdk::{MetricsSnapshot, PowerReading, RobotClient, TelemetrySnapshot};

/// 状态命令参数
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// 收集遥测的时间（毫秒）
    #[arg(short, long, default_value_t = 500)]
    pub wait_ms: u64,

    /// 同时查询一次电量
    #[arg(long)]
    pub power: bool,

    /// 以 JSON 输出
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub connect: ConnectArgs,
}

/// 打印用的状态报告
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub address: Option<String>,
    pub state: String,
    pub sonar_cm: Option<u32>,
    pub power: Option<(String, String)>,
    pub frames_received: u64,
    pub telemetry_age_ms: Option<u128>,
    pub feedback_fresh: bool,
    pub connection_age_ms: Option<u128>,
    pub tx_commands: u64,
    pub rx_malformed: u64,
    pub last_error: Option<String>,
}

impl StatusReport {
    pub fn new(
        address: Option<String>,
        state: String,
        telemetry: &TelemetrySnapshot,
        metrics: &MetricsSnapshot,
        last_error: Option<String>,
    ) -> Self {
        Self {
            address,
            state,
            sonar_cm: telemetry.sonar_cm,
            power: telemetry
                .power
                .clone()
                .map(|PowerReading { first, second }| (first, second)),
            frames_received: telemetry.frames_received,
            telemetry_age_ms: telemetry.age().map(|age| age.as_millis()),
            feedback_fresh: false,
            connection_age_ms: None,
            tx_commands: metrics.tx_commands,
            rx_malformed: metrics.rx_malformed,
            last_error,
        }
    }

    pub fn from_client(robot: &RobotClient) -> Self {
        Self {
            feedback_fresh: robot.is_feedback_fresh(),
            connection_age_ms: robot.connection_age().map(|age| age.as_millis()),
            ..Self::new(
                robot.address(),
                robot.state().to_string(),
                &robot.telemetry(),
                &robot.metrics(),
                robot.last_error(),
            )
        }
    }

    /// 人类可读输出
    pub fn print(&self) {
        println!("📊 状态: {}", self.state);
        if let Some(address) = &self.address {
            println!("  地址: {}", address);
        }
        match self.sonar_cm {
            Some(cm) => println!("  超声波: {} cm", cm),
            None => println!("  超声波: (无数据)"),
        }
        match &self.power {
            Some((first, second)) => println!("  电量: {} / {}", first, second),
            None => println!("  电量: (无数据)"),
        }
        println!("  已接收帧: {}", self.frames_received);
        if let Some(age) = self.telemetry_age_ms {
            let freshness = if self.feedback_fresh { "新鲜" } else { "过期" };
            println!("  遥测延迟: {} ms ({})", age, freshness);
        }
        if let Some(age) = self.connection_age_ms {
            println!("  连接时长: {} ms", age);
        }
        if let Some(err) = &self.last_error {
            println!("  最近错误: {}", err);
        }
    }
}

impl StatusCommand {
    pub fn execute(&self, robot: &RobotClient) -> Result<()> {
        // 失败会记录到 last_error，随报告输出
        robot.request_sonar();
        if self.power {
            robot.request_power();
        }
        std::thread::sleep(Duration::from_millis(self.wait_ms));

        let report = StatusReport::from_client(robot);
        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            report.print();
        }
        Ok(())
    }
}
