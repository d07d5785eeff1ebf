//! Response bodies of the gateway API.

use serde::Serialize;

/// `{"message": ...}`, used by every route that reports an outcome in prose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `{"Id": ...}`, returned by the create routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdResponse {
    #[serde(rename = "Id")]
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub engine: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_response_field_name() {
        let body = serde_json::to_value(IdResponse {
            id: "abc".to_string(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "Id": "abc" }));
    }
}
