//! 上行遥测帧解析
//!
//! 按第一个字段（动词）分发：
//! - `SONIC#<cm>`：超声波距离，解析为整数（厘米）
//! - `POWER#<mode>#<v1>#<v2>`：三个载荷字段，后两个是两路电量原始值，
//!   按字符串原样保存，不解析
//! - 其他动词：忽略（向前兼容）

use crate::ProtocolError;
use crate::constants::*;
use crate::framing::split_fields;

/// 遥测反馈
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Feedback {
    /// 超声波测距结果（厘米）
    Sonic { distance_cm: u32 },
    /// 两路电量读数（原始字符串）
    Power { first: String, second: String },
}

impl Feedback {
    /// 对应的动词
    pub fn verb(&self) -> &'static str {
        match self {
            Feedback::Sonic { .. } => CMD_SONIC,
            Feedback::Power { .. } => CMD_POWER,
        }
    }
}

/// 解析一帧（不含 `\n`）
///
/// # 返回
/// - `Ok(Some(feedback))`: 识别的遥测帧
/// - `Ok(None)`: 可以安全忽略的帧（未知动词、POWER 载荷字段数不为 3）
/// - `Err(_)`: SONIC 帧缺少距离字段或距离不是整数
pub fn parse_frame(frame: &str) -> Result<Option<Feedback>, ProtocolError> {
    let fields = split_fields(frame);
    let verb = fields[0].trim();
    if verb.is_empty() {
        return Err(ProtocolError::EmptyFrame);
    }

    match verb {
        CMD_SONIC => {
            let raw = fields.get(1).ok_or_else(|| ProtocolError::InvalidFieldCount {
                verb: CMD_SONIC.to_string(),
                expected: 2,
                actual: fields.len(),
            })?;
            let distance_cm =
                raw.trim().parse::<u32>().map_err(|_| ProtocolError::InvalidValue {
                    field: "sonar_cm".to_string(),
                    value: raw.to_string(),
                })?;
            Ok(Some(Feedback::Sonic { distance_cm }))
        },
        CMD_POWER => {
            // 动词 + 3 个载荷字段
            if fields.len() != 4 {
                return Ok(None);
            }
            Ok(Some(Feedback::Power {
                first: fields[2].to_string(),
                second: fields[3].to_string(),
            }))
        },
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sonic() {
        assert_eq!(
            parse_frame("SONIC#37").unwrap(),
            Some(Feedback::Sonic { distance_cm: 37 })
        );
        assert_eq!(
            parse_frame("SONIC# 120 ").unwrap(),
            Some(Feedback::Sonic { distance_cm: 120 })
        );
    }

    #[test]
    fn test_parse_sonic_malformed() {
        assert!(matches!(
            parse_frame("SONIC#abc"),
            Err(ProtocolError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_frame("SONIC"),
            Err(ProtocolError::InvalidFieldCount { actual: 1, .. })
        ));
        assert!(matches!(
            parse_frame("SONIC#-4"),
            Err(ProtocolError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_parse_power_three_payload_fields() {
        assert_eq!(
            parse_frame("POWER#1#5#6").unwrap(),
            Some(Feedback::Power {
                first: "5".to_string(),
                second: "6".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_power_keeps_raw_strings() {
        assert_eq!(
            parse_frame("POWER#1#7.92#7.85").unwrap(),
            Some(Feedback::Power {
                first: "7.92".to_string(),
                second: "7.85".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_power_wrong_arity_ignored() {
        assert_eq!(parse_frame("POWER").unwrap(), None);
        assert_eq!(parse_frame("POWER#1#5").unwrap(), None);
        assert_eq!(parse_frame("POWER#1#5#6#7").unwrap(), None);
    }

    #[test]
    fn test_unknown_verb_ignored() {
        assert_eq!(parse_frame("CMD_LED#1#255#0#0").unwrap(), None);
        assert_eq!(parse_frame("HELLO").unwrap(), None);
    }

    #[test]
    fn test_empty_frame() {
        assert_eq!(parse_frame(""), Err(ProtocolError::EmptyFrame));
        assert_eq!(parse_frame("#5"), Err(ProtocolError::EmptyFrame));
    }

    #[test]
    fn test_feedback_verb() {
        assert_eq!(Feedback::Sonic { distance_cm: 1 }.verb(), "SONIC");
        assert_eq!(
            Feedback::Power {
                first: String::new(),
                second: String::new(),
            }
            .verb(),
            "POWER"
        );
    }
}
