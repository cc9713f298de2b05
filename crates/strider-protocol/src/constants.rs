//! 协议常量定义
//!
//! 端口号、分隔符和命令动词。动词字符串区分大小写，与机器人端固件保持一致。

/// 控制通道 TCP 端口（固定）
pub const CONTROL_PORT: u16 = 5002;

/// 帧分隔符
pub const FRAME_SEPARATOR: char = '\n';

/// 字段分隔符
pub const FIELD_SEPARATOR: char = '#';

// ============================================================================
// 命令动词
// ============================================================================

/// 运动命令：`MOVE#1#<x>#<y>#<speed>#<angle>`
pub const CMD_MOVE: &str = "MOVE";

/// 云台（头部）转动：`HEAD#1#<angle>`
pub const CMD_HEAD: &str = "HEAD";

/// 舵机上电/断电：`SERVOPOWER#<0|1>`
pub const CMD_SERVO_POWER: &str = "SERVOPOWER";

/// 超声波测距（请求与应答共用）：`SONIC` / `SONIC#<cm>`
pub const CMD_SONIC: &str = "SONIC";

/// 电量查询（请求与应答共用）：`POWER` / `POWER#<v1>#<v2>`
pub const CMD_POWER: &str = "POWER";

/// MOVE / HEAD 命令的模式字段（固件只接受 1）
pub const MODE_FIELD: i32 = 1;

/// 云台角度镜像基准：发送值 = `HEAD_MIRROR_DEG - 请求角度`
pub const HEAD_MIRROR_DEG: i32 = 180;

/// 云台舵机可达的最小角度
pub const HEAD_MIN_DEG: i32 = 0;

/// 云台舵机可达的最大角度
pub const HEAD_MAX_DEG: i32 = 180;

// ============================================================================
// 运动参数默认值
// ============================================================================

/// 默认步长（每条命令的线位移）
pub const DEFAULT_STEP_SIZE: i32 = 25;

/// 默认转角增量（每条转向命令的角度）
pub const DEFAULT_ANGLE_SIZE: i32 = 10;

/// 默认速度档位
pub const DEFAULT_SPEED: i32 = 2;

/// 默认云台中位角
pub const DEFAULT_HEAD_CENTER: i32 = 90;
