//! Message types and outbound flows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// X12 transaction-set codes handled by this system.
///
/// 850 purchase order, 855 order acknowledgment, 856 ship notice,
/// 832 catalog, 846 inventory advice, 940/945 warehouse shipping
/// order/advice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MessageType {
    X832,
    X846,
    X850,
    X855,
    X856,
    X940,
    X945,
}

impl MessageType {
    /// All supported message types, in numeric order.
    pub const ALL: [MessageType; 7] = [
        MessageType::X832,
        MessageType::X846,
        MessageType::X850,
        MessageType::X855,
        MessageType::X856,
        MessageType::X940,
        MessageType::X945,
    ];

    /// The 3-digit transaction-set code as it appears on the wire.
    pub fn as_code(self) -> &'static str {
        match self {
            MessageType::X832 => "832",
            MessageType::X846 => "846",
            MessageType::X850 => "850",
            MessageType::X855 => "855",
            MessageType::X856 => "856",
            MessageType::X940 => "940",
            MessageType::X945 => "945",
        }
    }

    /// Whether the encoder emits a trailing CTT row-count segment.
    ///
    /// Order-like messages (850/855/940/945) carry the trailer; catalog,
    /// inventory and ship-notice feeds do not.
    pub fn has_ctt_trailer(self) -> bool {
        matches!(
            self,
            MessageType::X850 | MessageType::X855 | MessageType::X940 | MessageType::X945
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

impl FromStr for MessageType {
    type Err = Error;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "832" => Ok(MessageType::X832),
            "846" => Ok(MessageType::X846),
            "850" => Ok(MessageType::X850),
            "855" => Ok(MessageType::X855),
            "856" => Ok(MessageType::X856),
            "940" => Ok(MessageType::X940),
            "945" => Ok(MessageType::X945),
            other => Err(Error::UnknownMessageType {
                code: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for MessageType {
    type Error = Error;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        code.parse()
    }
}

impl From<MessageType> for String {
    fn from(message_type: MessageType) -> Self {
        message_type.as_code().to_string()
    }
}

/// Outbound data flows the encoder can be fed from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    Items,
    Stock,
    Orders,
}

impl Flow {
    /// Lowercase flow name used in logs and persisted rows.
    pub fn as_str(self) -> &'static str {
        match self {
            Flow::Items => "items",
            Flow::Stock => "stock",
            Flow::Orders => "orders",
        }
    }

    /// Default message type for the flow when the caller does not pick one.
    pub fn default_message_type(self) -> MessageType {
        match self {
            Flow::Items => MessageType::X832,
            Flow::Stock => MessageType::X846,
            Flow::Orders => MessageType::X940,
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flow {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "items" => Ok(Flow::Items),
            "stock" => Ok(Flow::Stock),
            "orders" => Ok(Flow::Orders),
            other => Err(Error::UnknownFlow {
                name: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_round_trip() {
        for message_type in MessageType::ALL {
            let parsed: MessageType = message_type.as_code().parse().unwrap();
            assert_eq!(parsed, message_type);
        }
    }

    #[test]
    fn test_unknown_message_type() {
        let err = "810".parse::<MessageType>().unwrap_err();
        assert!(matches!(err, Error::UnknownMessageType { code } if code == "810"));
    }

    #[test]
    fn test_ctt_trailer_types() {
        assert!(MessageType::X850.has_ctt_trailer());
        assert!(MessageType::X940.has_ctt_trailer());
        assert!(!MessageType::X856.has_ctt_trailer());
        assert!(!MessageType::X846.has_ctt_trailer());
    }

    #[test]
    fn test_message_type_serde_as_code() {
        let json = serde_json::to_string(&MessageType::X850).unwrap();
        assert_eq!(json, "\"850\"");
        let back: MessageType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MessageType::X850);
    }

    #[test]
    fn test_flow_defaults() {
        assert_eq!(Flow::Items.default_message_type(), MessageType::X832);
        assert_eq!(Flow::Stock.default_message_type(), MessageType::X846);
        assert_eq!(Flow::Orders.default_message_type(), MessageType::X940);
    }
}
