//! 本地 TCP 假机器人
//!
//! 监听 `127.0.0.1:0`，记录收到的每一行命令，可选地对 `SONIC` 查询自动应答，
//! 并允许测试代码主动下发任意字节或关闭连接。

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use strider_sdk::prelude::*;

#[derive(Default)]
struct Shared {
    accepted: AtomicUsize,
    lines: Mutex<Vec<String>>,
    peers: Mutex<Vec<TcpStream>>,
    sonar_reply: Mutex<Option<String>>,
}

pub struct FakeRobot {
    pub port: u16,
    shared: Arc<Shared>,
}

impl FakeRobot {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake robot");
        let port = listener.local_addr().unwrap().port();
        let shared = Arc::new(Shared::default());

        let accept_shared = shared.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                accept_shared.accepted.fetch_add(1, Ordering::SeqCst);
                accept_shared
                    .peers
                    .lock()
                    .unwrap()
                    .push(stream.try_clone().unwrap());

                let conn_shared = accept_shared.clone();
                thread::spawn(move || serve(stream, conn_shared));
            }
        });

        Self { port, shared }
    }

    /// 对每个 `SONIC` 查询回复 `SONIC#<cm>`
    pub fn reply_to_sonar(&self, distance_cm: u32) {
        *self.shared.sonar_reply.lock().unwrap() = Some(format!("SONIC#{distance_cm}\n"));
    }

    pub fn accepted(&self) -> usize {
        self.shared.accepted.load(Ordering::SeqCst)
    }

    pub fn lines(&self) -> Vec<String> {
        self.shared.lines.lock().unwrap().clone()
    }

    /// 收到的命令中满足条件的行数
    pub fn count(&self, verb: &str) -> usize {
        self.lines()
            .iter()
            .filter(|line| line.split('#').next() == Some(verb))
            .count()
    }

    /// 解码后的非查询命令
    pub fn commands(&self) -> Vec<Command> {
        self.lines()
            .iter()
            .filter_map(|line| Command::from_str(line).ok())
            .filter(|command| !command.is_poll())
            .collect()
    }

    /// 向最近一个连接写入原始字节
    pub fn send(&self, bytes: &[u8]) {
        let mut peers = self.shared.peers.lock().unwrap();
        if let Some(peer) = peers.last_mut() {
            let _ = peer.write_all(bytes);
        }
    }

    /// 关闭最近一个连接（模拟机器人断电）
    pub fn close_latest(&self) {
        if let Some(peer) = self.shared.peers.lock().unwrap().last() {
            let _ = peer.shutdown(Shutdown::Both);
        }
    }

    /// 指向本假机器人的客户端（只查询超声波，周期 `sonar_ms`）
    pub fn client(&self, sonar_ms: Option<u64>) -> RobotClient {
        ClientBuilder::new()
            .address("127.0.0.1")
            .port(self.port)
            .read_timeout_ms(20)
            .sonar_poll_interval_ms(sonar_ms)
            .build()
    }
}

fn serve(stream: TcpStream, shared: Arc<Shared>) {
    let mut writer = stream.try_clone().unwrap();
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let Ok(line) = line else { break };
        let reply = if line == "SONIC" {
            shared.sonar_reply.lock().unwrap().clone()
        } else {
            None
        };
        shared.lines.lock().unwrap().push(line);
        if let Some(reply) = reply
            && writer.write_all(reply.as_bytes()).is_err()
        {
            break;
        }
    }
}

/// 轮询等待条件成立
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}
