use serde::{Deserialize, Serialize};

/// Delivery channel the provider routes a notification through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Sms,
    Email,
    Whatsapp,
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelType::Sms => write!(f, "sms"),
            ChannelType::Email => write!(f, "email"),
            ChannelType::Whatsapp => write!(f, "whatsapp"),
        }
    }
}

/// Final delivery status of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStatus::Sent => write!(f, "sent"),
            DeliveryStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A transactional message (one-time code, receipt, verification result).
///
/// The dispatch queue treats this as an opaque payload; only the provider
/// transport serializes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Phone number or email address, depending on `channel`.
    pub to: String,
    pub channel: ChannelType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
    /// Caller-side identifier (order number, registration id) echoed in logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_deserialize_minimal() {
        let n: Notification = serde_json::from_str(
            r#"{"to":"+15550100","channel":"sms","body":"Your code is 481516"}"#,
        )
        .unwrap();
        assert_eq!(n.channel, ChannelType::Sms);
        assert_eq!(n.subject, None);
        assert_eq!(n.reference, None);
    }

    #[test]
    fn test_notification_serialize_skips_empty_optionals() {
        let n = Notification {
            to: "owner@example.com".to_string(),
            channel: ChannelType::Email,
            subject: None,
            body: "Receipt #1042".to_string(),
            reference: Some("order-1042".to_string()),
        };
        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["channel"], "email");
        assert_eq!(value["reference"], "order-1042");
        assert!(value.get("subject").is_none());
    }

    #[test]
    fn test_channel_display_matches_serde() {
        for channel in [ChannelType::Sms, ChannelType::Email, ChannelType::Whatsapp] {
            let json = serde_json::to_value(channel).unwrap();
            assert_eq!(json, channel.to_string());
        }
    }

    #[test]
    fn test_unknown_channel_rejected() {
        let result: Result<Notification, _> =
            serde_json::from_str(r#"{"to":"x","channel":"pager","body":"hi"}"#);
        assert!(result.is_err());
    }
}
