//! Builder 模式实现
//!
//! 提供链式构造 `RobotClient` 实例的便捷方式。

use crate::client::RobotClient;
use crate::error::DriverError;
use crate::pipeline::LinkConfig;
use crate::transport::{Connector, TcpConnector};
use strider_protocol::MotionProfile;

/// RobotClient Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use strider_driver::ClientBuilder;
///
/// // 默认配置，只构造不连接
/// let robot = ClientBuilder::new().address("192.168.4.1").build();
/// robot.reconnect();
///
/// // 每 500ms 查询一次电量，并立即连接
/// let robot = ClientBuilder::new()
///     .address("192.168.4.1")
///     .power_poll_interval_ms(Some(500))
///     .connect()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ClientBuilder<C: Connector = TcpConnector> {
    /// 机器人地址（可选，`connect(address)` 时也可以再指定）
    address: Option<String>,
    link_config: LinkConfig,
    motion_profile: MotionProfile,
    connector: C,
}

impl ClientBuilder<TcpConnector> {
    /// 创建新的 Builder（TCP 传输）
    pub fn new() -> Self {
        Self {
            address: None,
            link_config: LinkConfig::default(),
            motion_profile: MotionProfile::default(),
            connector: TcpConnector,
        }
    }
}

impl Default for ClientBuilder<TcpConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> ClientBuilder<C> {
    /// 设置机器人地址（IP、主机名或 `host:port`）
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// 设置控制端口（默认 5002）
    pub fn port(mut self, port: u16) -> Self {
        self.link_config.port = port;
        self
    }

    /// 整体替换链路配置
    pub fn link_config(mut self, config: LinkConfig) -> Self {
        self.link_config = config;
        self
    }

    /// 设置运动参数
    pub fn motion_profile(mut self, profile: MotionProfile) -> Self {
        self.motion_profile = profile;
        self
    }

    /// 超声波查询周期，`None` 关闭
    pub fn sonar_poll_interval_ms(mut self, interval_ms: Option<u64>) -> Self {
        self.link_config.sonar_poll_interval_ms = interval_ms;
        self
    }

    /// 电量查询周期，`None` 关闭（默认）
    pub fn power_poll_interval_ms(mut self, interval_ms: Option<u64>) -> Self {
        self.link_config.power_poll_interval_ms = interval_ms;
        self
    }

    /// 读超时（毫秒）
    pub fn read_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.link_config.read_timeout_ms = timeout_ms;
        self
    }

    /// 替换传输实现
    pub fn connector<D: Connector>(self, connector: D) -> ClientBuilder<D> {
        ClientBuilder {
            address: self.address,
            link_config: self.link_config,
            motion_profile: self.motion_profile,
            connector,
        }
    }

    /// 构造空闲状态的客户端（不连接）
    pub fn build(self) -> RobotClient<C> {
        RobotClient::with_connector(self.connector, self.link_config, self.motion_profile)
            .with_address(self.address)
    }

    /// 构造并立即连接到配置的地址
    ///
    /// 与 `RobotClient::connect` 不同，失败时返回错误。
    pub fn connect(self) -> Result<RobotClient<C>, DriverError> {
        let address = self.address.clone().ok_or(DriverError::NotConnected)?;
        let client = self.build();
        client.try_connect(&address)?;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link_state::LinkState;
    use crate::transport::mock::MockConnector;

    #[test]
    fn test_builder_defaults() {
        let client = ClientBuilder::new().build();
        assert_eq!(client.link_config(), &LinkConfig::default());
        assert_eq!(client.profile(), MotionProfile::default());
        assert_eq!(client.address(), None);
        assert_eq!(client.state(), LinkState::Idle);
    }

    #[test]
    fn test_builder_chain() {
        let client = ClientBuilder::new()
            .address("10.0.0.7")
            .port(6002)
            .sonar_poll_interval_ms(None)
            .power_poll_interval_ms(Some(500))
            .read_timeout_ms(20)
            .motion_profile(MotionProfile {
                speed: 3,
                ..MotionProfile::default()
            })
            .build();

        assert_eq!(client.address().as_deref(), Some("10.0.0.7"));
        let config = client.link_config();
        assert_eq!(config.port, 6002);
        assert_eq!(config.sonar_poll_interval_ms, None);
        assert_eq!(config.power_poll_interval_ms, Some(500));
        assert_eq!(config.read_timeout_ms, 20);
        assert_eq!(client.profile().speed, 3);
    }

    #[test]
    fn test_builder_connect_with_mock() {
        let connector = MockConnector::new();
        let client = ClientBuilder::new()
            .address("robot")
            .read_timeout_ms(10)
            .sonar_poll_interval_ms(None)
            .connector(connector.clone())
            .connect()
            .unwrap();

        assert!(client.is_connected());
        assert_eq!(connector.open_count(), 1);
        client.disconnect();
        assert!(!client.is_connected());
    }

    #[test]
    fn test_builder_connect_failure() {
        let connector = MockConnector::new();
        connector.set_fail_open(true);
        let result = ClientBuilder::new().address("robot").connector(connector).connect();
        assert!(matches!(result, Err(DriverError::ConnectFailed { .. })));
    }

    #[test]
    fn test_builder_connect_without_address() {
        let result = ClientBuilder::new().connector(MockConnector::new()).connect();
        assert!(matches!(result, Err(DriverError::NotConnected)));
    }
}
