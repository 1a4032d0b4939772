//! Response bodies

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TasksResponse {
    pub tasks: Vec<Value>,
}
