//! Request and response bodies exchanged with the sync server.
//!
//! Field names use camelCase on the wire:
//!
//! ```text
//! POST /sync  {"collection": "products", "data": [...], "lastSyncTime": 1700000000000}
//!          -> {"data": [...], "syncTime": 1700000004000}
//! POST /data  {"collection": "products", "lastSyncTime": null}
//!          -> {"data": [...], "syncTime": 1700000004000}
//! ```

use serde::{Deserialize, Serialize};

use crate::record::{Payload, Record};

/// Push-and-pull request: the client's records plus its checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncDataRequest<P = Payload> {
    pub collection: String,
    #[serde(default = "Vec::new")]
    pub data: Vec<Record<P>>,
    #[serde(default)]
    pub last_sync_time: Option<i64>,
}

/// Pull-only request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDataRequest {
    pub collection: String,
    #[serde(default)]
    pub last_sync_time: Option<i64>,
}

/// Records changed since the request's checkpoint, and the server time to
/// use as the next checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse<P = Payload> {
    pub data: Vec<Record<P>>,
    pub sync_time: i64,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Response from the /health endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sync_request_wire_names() {
        let request: SyncDataRequest = serde_json::from_value(json!({
            "collection": "products",
            "data": [{"id": "p1", "updatedAt": 100, "name": "Flour"}],
            "lastSyncTime": 42
        }))
        .unwrap();

        assert_eq!(request.collection, "products");
        assert_eq!(request.data[0].updated_at, 100);
        assert_eq!(request.last_sync_time, Some(42));
    }

    #[test]
    fn test_missing_last_sync_time_is_absent() {
        let request: GetDataRequest =
            serde_json::from_value(json!({"collection": "products"})).unwrap();
        assert_eq!(request.last_sync_time, None);

        let request: SyncDataRequest =
            serde_json::from_value(json!({"collection": "products", "lastSyncTime": null}))
                .unwrap();
        assert!(request.data.is_empty());
        assert_eq!(request.last_sync_time, None);
    }

    #[test]
    fn test_response_serializes_sync_time() {
        let response: SyncResponse = SyncResponse {
            data: Vec::new(),
            sync_time: 7,
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"data": [], "syncTime": 7})
        );
    }
}
