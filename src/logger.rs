use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::warn;

use crate::diff::diff_json;

/// How response bodies are written to the message log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLogMode {
    /// Every response body in full.
    Full,
    /// The first body per endpoint in full, then only the changed paths.
    Diffed,
}

/// Append-only NDJSON record of the traffic with the cloud service.
pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
    previous: HashMap<String, Value>,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            mode,
            file,
            previous: HashMap::new(),
        })
    }

    pub fn log_request(&mut self, method: &str, endpoint: &str, query: &[(&str, String)], body: Option<&Value>) {
        let query: serde_json::Map<String, Value> = query
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
            .collect();
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "req",
            "method": method,
            "endpoint": endpoint,
            "query": query,
            "body": body,
        });
        self.write_line(&entry);
    }

    pub fn log_response(&mut self, endpoint: &str, status: u16, body: &str) {
        let body: Value = serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()));

        let diffed_against = match self.mode {
            MessageLogMode::Diffed if (200..300).contains(&status) => {
                self.previous.insert(endpoint.to_string(), body.clone())
            }
            _ => None,
        };

        let entry = match diffed_against {
            Some(prev) => {
                let mut changes = Vec::new();
                diff_json(&prev, &body, "", &mut changes);
                let changes: Vec<Value> = changes
                    .into_iter()
                    .map(|(path, old, new)| json!({ "path": path, "old": old, "new": new }))
                    .collect();
                json!({
                    "ts": Utc::now().to_rfc3339(),
                    "dir": "resp",
                    "endpoint": endpoint,
                    "status": status,
                    "changes": changes,
                })
            }
            None => json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "resp",
                "endpoint": endpoint,
                "status": status,
                "body": body,
            }),
        };
        self.write_line(&entry);
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write message log entry: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn read_lines(path: &str) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn request_line_carries_query() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        logger.log_request(
            "GET",
            "GetTStatInfoList",
            &[("gatewaysn", "GW1".to_string()), ("TempUnit", "0".to_string())],
            None,
        );

        let lines = read_lines(path);
        assert_eq!(lines[0]["dir"], "req");
        assert_eq!(lines[0]["method"], "GET");
        assert_eq!(lines[0]["query"]["gatewaysn"], "GW1");
        assert!(lines[0]["ts"].as_str().is_some());
    }

    #[test]
    fn full_mode_keeps_every_body() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        logger.log_response("GetSystemsInfo", 200, r#"{"Systems": []}"#);
        logger.log_response("GetSystemsInfo", 200, r#"{"Systems": []}"#);

        let lines = read_lines(path);
        assert_eq!(lines.len(), 2);
        assert!(lines[1]["body"]["Systems"].is_array());
    }

    #[test]
    fn diffed_mode_tracks_each_endpoint() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Diffed, path).unwrap();
        logger.log_response("GetTStatInfoList", 200, r#"{"tStatInfo": [{"Indoor_Temp": "70"}]}"#);
        logger.log_response("SetTStatInfo", 200, r#"{"ReturnStatus": "SUCCESS"}"#);
        logger.log_response("GetTStatInfoList", 200, r#"{"tStatInfo": [{"Indoor_Temp": "71"}]}"#);

        let lines = read_lines(path);
        assert!(lines[0]["body"].is_object());
        assert!(lines[1]["body"].is_object());
        let changes = lines[2]["changes"].as_array().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0]["path"], "tStatInfo.0.Indoor_Temp");
    }

    #[test]
    fn error_bodies_are_logged_verbatim() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Diffed, path).unwrap();
        logger.log_response("GetSystemsInfo", 401, "Unauthorized");

        let lines = read_lines(path);
        assert_eq!(lines[0]["status"], 401);
        assert_eq!(lines[0]["body"], "Unauthorized");
    }
}
