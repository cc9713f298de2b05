//! 本地假机器人集成测试
//!
//! 通过真实的 TCP 连接验证连接生命周期、轮询节奏、遥测解析和命令编码。

mod common;

use common::{FakeRobot, wait_until};
use std::time::{Duration, Instant};
use strider_sdk::prelude::*;

const WAIT: Duration = Duration::from_secs(2);

#[test]
fn test_connect_twice_opens_one_connection() {
    let robot = FakeRobot::start();
    let client = robot.client(Some(40));

    client.connect("127.0.0.1");
    client.connect("127.0.0.1");
    assert!(client.is_connected());

    std::thread::sleep(Duration::from_millis(400));
    assert_eq!(robot.accepted(), 1);

    // 单个轮询线程：40ms 周期，400ms 内大约 10 次，两个线程会翻倍
    let polls = robot.count("SONIC");
    assert!((3..=15).contains(&polls), "unexpected SONIC count: {polls}");

    client.disconnect();
}

#[test]
fn test_sonar_telemetry_from_poll_replies() {
    let robot = FakeRobot::start();
    robot.reply_to_sonar(37);
    let client = robot.client(Some(20));

    client.connect("127.0.0.1");
    assert!(wait_until(WAIT, || client.sonar_distance() == Some(37)));
    assert!(client.telemetry().sonar_updates >= 1);
    assert!(client.telemetry_age().is_some());

    client.disconnect();
}

#[test]
fn test_power_reading_and_short_power_frame() {
    let robot = FakeRobot::start();
    let client = robot.client(None);
    client.connect("127.0.0.1");
    assert!(wait_until(WAIT, || robot.accepted() == 1));

    robot.send(b"POWER#1#5#6\n");
    assert!(wait_until(WAIT, || client.power_reading().is_some()));

    robot.send(b"POWER#1#5\nSONIC#9\n");
    assert!(wait_until(WAIT, || client.sonar_distance() == Some(9)));

    let power = client.power_reading().unwrap();
    assert_eq!((power.first.as_str(), power.second.as_str()), ("5", "6"));
    client.disconnect();
}

#[test]
fn test_malformed_frame_keeps_loop_alive() {
    let robot = FakeRobot::start();
    let client = robot.client(None);
    client.connect("127.0.0.1");
    assert!(wait_until(WAIT, || robot.accepted() == 1));

    robot.send(b"SONIC#37\n");
    assert!(wait_until(WAIT, || client.sonar_distance() == Some(37)));

    robot.send(b"SONIC#abc\n");
    assert!(wait_until(WAIT, || client.last_error().is_some()));
    assert_eq!(client.sonar_distance(), Some(37));
    assert!(client.is_connected());

    robot.send(b"UNKNOWN#1\r\nSONIC#12\r\n");
    assert!(wait_until(WAIT, || client.sonar_distance() == Some(12)));
    assert_eq!(client.metrics().rx_malformed, 1);
    client.disconnect();
}

#[test]
fn test_disconnect_then_connect_resets_telemetry() {
    let robot = FakeRobot::start();
    let client = robot.client(None);

    client.connect("127.0.0.1");
    assert!(wait_until(WAIT, || robot.accepted() == 1));
    robot.send(b"SONIC#55\n");
    assert!(wait_until(WAIT, || client.sonar_distance() == Some(55)));

    client.disconnect();
    assert_eq!(client.state(), LinkState::Idle);

    client.connect("127.0.0.1");
    assert!(client.is_connected());
    assert_eq!(client.sonar_distance(), None);
    assert!(wait_until(WAIT, || robot.accepted() == 2));
    client.disconnect();
}

#[test]
fn test_remote_close_is_silent_disconnect() {
    let robot = FakeRobot::start();
    let client = robot.client(Some(20));
    client.connect("127.0.0.1");
    assert!(wait_until(WAIT, || robot.accepted() == 1));

    robot.close_latest();

    // 没有任何调用，状态自行回到 Idle
    assert!(wait_until(WAIT, || client.state() == LinkState::Idle));
    assert!(!client.is_connected());
    assert!(client.last_error().is_some());

    // 之后的命令只记录错误
    client.clear_last_error();
    client.move_forward();
    assert!(client.last_error().unwrap().contains("MOVE"));
}

#[test]
fn test_disconnect_is_bounded() {
    let robot = FakeRobot::start();
    let client = ClientBuilder::new()
        .address("127.0.0.1")
        .port(robot.port)
        .build();
    client.reconnect();
    assert!(client.is_connected());

    let start = Instant::now();
    client.disconnect();
    // 默认读超时 100ms，join 超时 2s
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(client.state(), LinkState::Idle);
}

#[test]
fn test_commands_decode_on_robot_side() {
    let robot = FakeRobot::start();
    let client = robot.client(None);
    client.connect("127.0.0.1");

    client.send_move(25, 0, 4, 0);
    client.turn_right();
    client.stop();
    client.turn_head(30);
    client.set_servo_power(false);

    assert!(wait_until(WAIT, || robot.commands().len() == 5));
    assert_eq!(
        robot.commands(),
        vec![
            Command::Move(MotionIntent::new(25, 0, 4, 0)),
            Command::Move(MotionIntent::new(25, 0, 4, 10)),
            Command::Move(MotionIntent::stop()),
            Command::Head(HeadAngle::absolute(30).unwrap()),
            Command::ServoPower(false),
        ]
    );
    assert!(robot.lines().contains(&"MOVE#1#25#0#4#0".to_string()));
    assert!(robot.lines().contains(&"HEAD#1#150".to_string()));
    client.disconnect();
}

#[test]
fn test_connect_refused_stays_idle() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let client = ClientBuilder::new().port(port).build();

    client.connect("127.0.0.1");
    assert_eq!(client.state(), LinkState::Idle);
    assert!(!client.is_handshake_complete());
    assert!(client.last_error().is_some());

    // 命令被吞掉，不会 panic
    client.stop();
}
