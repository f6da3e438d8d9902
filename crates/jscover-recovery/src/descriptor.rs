//! The coverage descriptor shared by fresh instrumentation and recovery

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::MAGIC_KEY;

/// Everything a report needs to find and interpret one file's counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageDescriptor {
    /// Path of the instrumented file
    pub path: String,
    /// Hash of the coverage data the file was instrumented with
    pub hash: String,
    /// Global variable the counters are stored under at runtime
    pub global_variable_name: String,
    /// File coverage object (`statementMap`, `s`, ...)
    pub coverage_data: Map<String, JsonValue>,
}

impl CoverageDescriptor {
    /// Build a descriptor, dropping the marker and the embedded hash from
    /// the coverage data
    pub fn new(
        path: impl Into<String>,
        hash: impl Into<String>,
        global_variable_name: impl Into<String>,
        mut coverage_data: Map<String, JsonValue>,
    ) -> Self {
        sanitize(&mut coverage_data);
        Self {
            path: path.into(),
            hash: hash.into(),
            global_variable_name: global_variable_name.into(),
            coverage_data,
        }
    }
}

/// Remove the keys instrumentation adds to the embedded object that are not
/// part of the file coverage itself
pub fn sanitize(coverage_data: &mut Map<String, JsonValue>) {
    coverage_data.remove(MAGIC_KEY);
    coverage_data.remove("hash");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_sanitizes() {
        let data = json!({ "__cov__marker": 12648430, "hash": "abc", "s": {} });
        let JsonValue::Object(data) = data else { unreachable!() };
        let descriptor = CoverageDescriptor::new("a.js", "abc", "__coverage__", data);
        assert_eq!(JsonValue::Object(descriptor.coverage_data), json!({ "s": {} }));
    }

    #[test]
    fn test_serializes_camel_case() {
        let descriptor = CoverageDescriptor::new("a.js", "abc", "__coverage__", Map::new());
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(
            json,
            json!({
                "path": "a.js",
                "hash": "abc",
                "globalVariableName": "__coverage__",
                "coverageData": {}
            })
        );
    }
}
