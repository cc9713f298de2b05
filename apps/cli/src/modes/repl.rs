//! REPL 模式（交互式 Shell）
//!
//! 专用输入线程运行 rustyline（保留历史记录），通过 crossbeam 通道把每一行交给主线程。
//! 主线程同时监听 Ctrl+C：任何时候按下都会立即发送 stop。

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, bounded};
use rustyline::DefaultEditor;
use std::thread;
use strider_sdk::{ClientBuilder, Direction, RobotClient};

use crate::commands::CliConfig;
use crate::commands::status::StatusReport;

/// 解析后的 REPL 命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Connect(Option<String>),
    Disconnect,
    Move(Direction),
    Head(i32),
    HeadOffset(i32),
    Servo(bool),
    SetSpeed(i32),
    SetAngle(i32),
    SetStep(i32),
    Status,
    Help,
    Exit,
}

impl ReplCommand {
    /// 解析一行输入
    ///
    /// `speed_N` / `angle_N` / `step_N` 也接受空格分隔写法（`speed 3`）。
    pub fn parse(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&head) = parts.first() else {
            anyhow::bail!("空命令");
        };
        let arg = parts.get(1).copied();

        if let Some((name, value)) = head.split_once('_')
            && let Ok(value) = value.parse::<i32>()
        {
            return Self::setting(name, value);
        }

        let command = match head {
            "connect" => ReplCommand::Connect(arg.map(str::to_string)),
            "disconnect" => ReplCommand::Disconnect,
            "head" => ReplCommand::Head(parse_int(arg, "head <angle>")?),
            "head_offset" => ReplCommand::HeadOffset(parse_int(arg, "head_offset <degrees>")?),
            "servo" => match arg {
                Some("on") => ReplCommand::Servo(true),
                Some("off") => ReplCommand::Servo(false),
                _ => anyhow::bail!("用法: servo on|off"),
            },
            "speed" | "angle" | "step" => Self::setting(head, parse_int(arg, head)?)?,
            "status" => ReplCommand::Status,
            "help" => ReplCommand::Help,
            "exit" | "quit" => ReplCommand::Exit,
            other => match other.parse::<Direction>() {
                Ok(direction) => ReplCommand::Move(direction),
                Err(_) => anyhow::bail!("未知命令: {}", other),
            },
        };
        Ok(command)
    }

    fn setting(name: &str, value: i32) -> Result<Self> {
        match name {
            "speed" => Ok(ReplCommand::SetSpeed(value)),
            "angle" => Ok(ReplCommand::SetAngle(value)),
            "step" => Ok(ReplCommand::SetStep(value)),
            _ => anyhow::bail!("未知设置: {}", name),
        }
    }
}

fn parse_int(arg: Option<&str>, usage: &str) -> Result<i32> {
    let arg = arg.ok_or_else(|| anyhow::anyhow!("用法: {}", usage))?;
    arg.parse::<i32>().with_context(|| format!("无效的数值: {}", arg))
}

/// REPL 会话（保持机器人连接）
pub struct ReplSession {
    robot: RobotClient,
    default_address: Option<String>,
}

impl ReplSession {
    pub fn new(config: &CliConfig, address: Option<String>) -> Self {
        let robot = ClientBuilder::new()
            .link_config(config.link.clone())
            .motion_profile(config.motion)
            .build();
        Self {
            robot,
            default_address: address.or_else(|| config.address.clone()),
        }
    }

    fn require_connected(&self) -> Result<()> {
        if !self.robot.is_connected() {
            anyhow::bail!("未连接，请先使用 connect 命令");
        }
        Ok(())
    }

    /// 执行一条命令，返回 false 表示退出
    pub fn execute(&mut self, command: ReplCommand) -> Result<bool> {
        match command {
            ReplCommand::Connect(address) => {
                let address = address
                    .or_else(|| self.default_address.clone())
                    .ok_or_else(|| anyhow::anyhow!("未指定地址，用法: connect <ip>"))?;
                if self.robot.is_connected() {
                    println!("⚠️  已经连接");
                    return Ok(true);
                }
                println!("⏳ 连接到 {}...", address);
                self.robot.try_connect(&address)?;
                self.default_address = Some(address);
                println!("✅ 已连接");
            },
            ReplCommand::Disconnect => {
                if !self.robot.is_connected() {
                    println!("⚠️  未连接");
                    return Ok(true);
                }
                println!("⏳ 断开连接...");
                self.robot.disconnect();
                println!("✅ 已断开");
            },
            ReplCommand::Move(direction) => {
                self.require_connected()?;
                let intent = self.robot.profile().intent(direction);
                self.robot.try_send(intent.into())?;
            },
            ReplCommand::Head(angle) => {
                self.require_connected()?;
                self.robot.turn_head(angle);
            },
            ReplCommand::HeadOffset(offset) => {
                self.require_connected()?;
                self.robot.turn_head_offset(offset);
            },
            ReplCommand::Servo(on) => {
                self.require_connected()?;
                self.robot.set_servo_power(on);
            },
            ReplCommand::SetSpeed(speed) => {
                self.robot.set_speed(speed);
                println!("speed = {}", speed);
            },
            ReplCommand::SetAngle(angle) => {
                self.robot.set_angle_size(angle);
                println!("angle = {}", angle);
            },
            ReplCommand::SetStep(step) => {
                self.robot.set_step_size(step);
                println!("step = {}", step);
            },
            ReplCommand::Status => {
                StatusReport::from_client(&self.robot).print();
                let profile = self.robot.profile();
                println!(
                    "  运动参数: step={} angle={} speed={} head_center={}",
                    profile.step_size, profile.angle_size, profile.speed, profile.head_center
                );
            },
            ReplCommand::Help => print_help(),
            ReplCommand::Exit => {
                if self.robot.is_connected() {
                    self.robot.stop();
                    self.robot.disconnect();
                }
                println!("👋 再见！");
                return Ok(false);
            },
        }
        Ok(true)
    }

    /// Ctrl+C：立即停止
    pub fn emergency_stop(&self) {
        if self.robot.is_connected() {
            eprintln!("\n🛑 收到 Ctrl+C，发送 stop");
            self.robot.stop();
        } else {
            eprintln!("\n🛑 收到 Ctrl+C（未连接），输入 exit 退出");
        }
    }
}

/// REPL 输入（专用输入线程）
pub struct ReplInput {
    command_rx: Receiver<String>,
    _input_thread: thread::JoinHandle<Result<()>>,
}

/// 输入线程上报的 Ctrl+C
const SIGINT_LINE: &str = "\u{3}";

impl ReplInput {
    /// 创建专用输入线程（保留历史记录）
    pub fn new() -> Self {
        let (command_tx, command_rx) = bounded::<String>(10);

        let input_thread = thread::spawn(move || {
            let mut rl = DefaultEditor::new()
                .map_err(|e| anyhow::anyhow!("Failed to initialize readline: {}", e))?;

            let history_path = ".strider_history";
            rl.load_history(history_path).ok(); // 首次运行没有历史文件

            println!("Strider CLI v{} - 交互式 Shell", env!("CARGO_PKG_VERSION"));
            println!("输入 'help' 查看帮助，'exit' 退出");
            println!();

            loop {
                match rl.readline("strider> ") {
                    Ok(line) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            continue;
                        }

                        let _ = rl.add_history_entry(line.as_str());
                        let exit = line == "exit" || line == "quit";
                        if command_tx.send(line).is_err() || exit {
                            break;
                        }
                    },

                    Err(rustyline::error::ReadlineError::Interrupted) => {
                        let _ = command_tx.send(SIGINT_LINE.to_string());
                    },

                    Err(rustyline::error::ReadlineError::Eof) => {
                        let _ = command_tx.send("exit".to_string());
                        break;
                    },

                    Err(err) => {
                        eprintln!("Error: {:?}", err);
                        break;
                    },
                }
            }

            rl.save_history(history_path).ok();
            Ok(())
        });

        Self {
            command_rx,
            _input_thread: input_thread,
        }
    }
}

/// 运行 REPL 模式
pub fn run_repl(config: &CliConfig, address: Option<String>) -> Result<()> {
    let mut session = ReplSession::new(config, address);
    let input = ReplInput::new();

    // 执行命令期间的 Ctrl+C（不在 readline 中）
    let (sigint_tx, sigint_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = sigint_tx.try_send(());
    })
    .context("安装 Ctrl+C 处理器失败")?;

    println!();
    println!("💡 提示: 使用 'connect <ip>' 连接到机器人，然后 'forward' / 'stop'");
    println!();

    loop {
        crossbeam_channel::select! {
            recv(input.command_rx) -> msg => {
                let Ok(line) = msg else {
                    // 输入线程已退出
                    session.execute(ReplCommand::Exit)?;
                    break;
                };

                if line == SIGINT_LINE {
                    session.emergency_stop();
                    continue;
                }

                let outcome = ReplCommand::parse(&line).and_then(|cmd| session.execute(cmd));
                match outcome {
                    Ok(true) => {},
                    Ok(false) => break,
                    Err(err) => {
                        eprintln!("❌ Error: {}", err);
                        print_help_hint(&line);
                    },
                }
            },
            recv(sigint_rx) -> _ => session.emergency_stop(),
        }
    }

    Ok(())
}

/// 打印帮助信息
fn print_help() {
    println!("可用命令:");
    println!("  connect [address]             连接到机器人（默认使用配置中的地址）");
    println!("  disconnect                    断开连接");
    println!("  forward | backward            前进 / 后退一步");
    println!("  left | right                  左 / 右平移一步");
    println!("  turn_left | turn_right        左 / 右倾斜转向");
    println!("  stop                          停止");
    println!("  head <angle>                  云台转到绝对角度");
    println!("  head_offset <degrees>         云台相对中位角偏移（正 = 右）");
    println!("  servo on|off                  舵机上电 / 断电");
    println!("  speed_N | angle_N | step_N    设置速度 / 转向角 / 步长");
    println!("  status                        显示连接状态和遥测");
    println!("  help                          显示帮助");
    println!("  exit / quit                   退出");
    println!();
    println!("快捷键:");
    println!("  Ctrl+C                        停止");
    println!("  Ctrl+D                        退出");
    println!();
}

/// 提供基于错误的帮助提示
fn print_help_hint(command: &str) {
    if command.starts_with("connect") {
        eprintln!("💡 提示: 使用 'connect 192.168.4.1' 连接到机器人");
    } else if command.starts_with("head") {
        eprintln!("💡 提示: 使用 'head 90' 或 'head_offset -30'");
    } else if command.starts_with("servo") {
        eprintln!("💡 提示: 使用 'servo on' 或 'servo off'");
    } else {
        eprintln!("💡 提示: 输入 'help' 查看所有命令");
    }
}
