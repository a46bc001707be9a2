use crate::domain::model::{
    AddressDuration, CommuteAddress, MaxDurations, TrackedKey, TrackedValue,
};
use crate::utils::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    FetchAddresses,
    FetchMaxDurations,
    SaveAddresses {
        addresses: Vec<CommuteAddress>,
    },
    SaveMaxDurations {
        #[serde(rename = "maxDurations")]
        max_durations: MaxDurations,
    },
    ClearAll,
    ComputeDurations {
        addresses: Vec<CommuteAddress>,
    },
}

impl Request {
    pub fn fetch(key: TrackedKey) -> Self {
        match key {
            TrackedKey::CommuteAddresses => Request::FetchAddresses,
            TrackedKey::MaxDurations => Request::FetchMaxDurations,
        }
    }

    pub fn save(value: TrackedValue) -> Self {
        match value {
            TrackedValue::CommuteAddresses(addresses) => Request::SaveAddresses { addresses },
            TrackedValue::MaxDurations(max_durations) => Request::SaveMaxDurations { max_durations },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Request::FetchAddresses => "FETCH_ADDRESSES",
            Request::FetchMaxDurations => "FETCH_MAX_DURATIONS",
            Request::SaveAddresses { .. } => "SAVE_ADDRESSES",
            Request::SaveMaxDurations { .. } => "SAVE_MAX_DURATIONS",
            Request::ClearAll => "CLEAR_ALL",
            Request::ComputeDurations { .. } => "COMPUTE_DURATIONS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Response {
    Addresses {
        addresses: Vec<CommuteAddress>,
    },
    MaxDurations {
        #[serde(rename = "maxDurations")]
        max_durations: MaxDurations,
    },
    Ack,
    AddressDurations {
        #[serde(rename = "addressDurations")]
        address_durations: Vec<AddressDuration>,
    },
}

impl Response {
    pub fn from_tracked(value: TrackedValue) -> Self {
        match value {
            TrackedValue::CommuteAddresses(addresses) => Response::Addresses { addresses },
            TrackedValue::MaxDurations(max_durations) => Response::MaxDurations { max_durations },
        }
    }

    pub fn into_tracked(self) -> Option<TrackedValue> {
        match self {
            Response::Addresses { addresses } => Some(TrackedValue::CommuteAddresses(addresses)),
            Response::MaxDurations { max_durations } => {
                Some(TrackedValue::MaxDurations(max_durations))
            }
            Response::Ack | Response::AddressDurations { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Response::Addresses { .. } => "ADDRESSES",
            Response::MaxDurations { .. } => "MAX_DURATIONS",
            Response::Ack => "ACK",
            Response::AddressDurations { .. } => "ADDRESS_DURATIONS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub result: Option<Response>,
    pub error: Option<String>,
}

impl Reply {
    pub fn ok(response: Response) -> Self {
        Self {
            result: Some(response),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(message.into()),
        }
    }

    pub fn into_result(self) -> Result<Response> {
        match (self.result, self.error) {
            (_, Some(message)) => Err(SyncError::RemoteError { message }),
            (Some(response), None) => Ok(response),
            (None, None) => Err(SyncError::UnexpectedReply {
                expected: "result or error".to_string(),
                got: "empty reply".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNotification {
    pub key: TrackedKey,
    #[serde(rename = "newValue")]
    pub new_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.data.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request = Request::save(TrackedValue::MaxDurations(MaxDurations {
            driving: Some(20),
            ..MaxDurations::default()
        }));

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"type": "SAVE_MAX_DURATIONS", "payload": {"maxDurations": {"driving": 20}}})
        );
        assert_eq!(
            serde_json::to_value(Request::ClearAll).unwrap(),
            json!({"type": "CLEAR_ALL"})
        );
    }

    #[test]
    fn test_unknown_request_kind_is_rejected() {
        let raw = json!({"type": "DELETE_EVERYTHING"});
        assert!(serde_json::from_value::<Request>(raw).is_err());
    }

    #[test]
    fn test_reply_error_wins_over_result() {
        let reply = Reply {
            result: Some(Response::Ack),
            error: Some("quota exceeded".to_string()),
        };
        match reply.into_result() {
            Err(SyncError::RemoteError { message }) => assert_eq!(message, "quota exceeded"),
            other => panic!("unexpected: {:?}", other),
        }

        let empty = Reply {
            result: None,
            error: None,
        };
        assert!(matches!(
            empty.into_result(),
            Err(SyncError::UnexpectedReply { .. })
        ));
    }

    #[test]
    fn test_change_notification_wire_shape() {
        let raw = json!({"key": "uprent:commute-addresses", "newValue": [{"id": "a"}]});
        let notification: ChangeNotification = serde_json::from_value(raw).unwrap();

        assert_eq!(notification.key, TrackedKey::CommuteAddresses);
        assert_eq!(notification.new_value, Some(json!([{"id": "a"}])));
    }
}
