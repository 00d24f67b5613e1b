//! JSON-RPC 2.0 message types and method parameters.

use kin_core::{MemberPatch, MemberQuery, NewMember, RelationKind};
use kin_graph::Algorithm;
use kin_store::FamilyPatch;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC error codes returned by the server.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const NOT_FOUND: i32 = -32001;
    pub const CONFLICT: i32 = -32002;
    pub const STORAGE: i32 = -32003;
}

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl Response {
    pub fn success<T: Serialize>(id: Option<Value>, result: T) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self {
                jsonrpc: "2.0",
                id,
                result: Some(value),
                error: None,
            },
            Err(e) => Self::error(id, codes::INTERNAL_ERROR, e.to_string()),
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }

    pub fn parse_error() -> Self {
        Self::error(None, codes::PARSE_ERROR, "Parse error")
    }

    pub fn method_not_found(id: Option<Value>, method: &str) -> Self {
        Self::error(id, codes::METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }

    pub fn invalid_params(id: Option<Value>, message: impl Into<String>) -> Self {
        Self::error(id, codes::INVALID_PARAMS, message)
    }

    pub fn not_found(id: Option<Value>, message: impl Into<String>) -> Self {
        Self::error(id, codes::NOT_FOUND, message)
    }

    pub fn error_code(&self) -> Option<i32> {
        self.error.as_ref().map(|e| e.code)
    }
}

// ----- Params -----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyParams {
    /// Family id, or its name for `family.get`.
    pub family_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberLookupParams {
    pub member_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFamilyParams {
    pub family_id: String,
    #[serde(flatten)]
    pub patch: FamilyPatch,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberParams {
    pub family_id: String,
    pub member_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberParams {
    pub family_id: String,
    #[serde(flatten)]
    pub member: NewMember,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberParams {
    pub family_id: String,
    pub member_id: String,
    #[serde(flatten)]
    pub patch: MemberPatch,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub family_id: String,
    #[serde(flatten)]
    pub query: MemberQuery,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationParams {
    pub family_id: String,
    pub from_id: String,
    pub to_id: String,
    pub kind: RelationKind,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairParams {
    pub family_id: String,
    pub from_id: String,
    pub to_id: String,
    #[serde(default)]
    pub algorithm: Algorithm,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageParams {
    pub family_id: String,
    pub member_id: String,
    /// Generations to walk; unbounded when absent.
    #[serde(default)]
    pub depth: Option<usize>,
}
