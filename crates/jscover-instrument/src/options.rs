//! Instrumenter configuration

use jscover_ast::SourceType;
use jscover_parser::ParseOptions;
use serde::{Deserialize, Serialize};

/// Options accepted by [`Instrumenter`](crate::Instrumenter).
///
/// Deserializes from camelCase JSON; every field has a default, so `{}` is a
/// valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstrumenterOptions {
    /// Global variable the counters are stored under
    pub coverage_variable: String,
    /// Keep comments in the output
    pub preserve_comments: bool,
    /// Emit code without optional whitespace
    pub compact: bool,
    /// Parse input as an ES module
    pub es_modules: bool,
    /// Accept top-level `return`
    pub auto_wrap: bool,
    /// Produce a source map for the instrumented output
    pub produce_source_map: bool,
    /// Class method names left uninstrumented
    pub ignore_class_methods: Vec<String>,
    /// Log generated code
    pub debug: bool,
    /// Extra parser plugins
    pub plugins: Vec<String>,
    /// Expression naming the global object
    pub coverage_global_scope: String,
    /// Resolve the global object through `new Function`, which also works
    /// in strict mode
    pub coverage_global_scope_func: bool,
}

impl Default for InstrumenterOptions {
    fn default() -> Self {
        Self {
            coverage_variable: "__coverage__".to_string(),
            preserve_comments: false,
            compact: true,
            es_modules: true,
            auto_wrap: true,
            produce_source_map: false,
            ignore_class_methods: Vec::new(),
            debug: false,
            plugins: Vec::new(),
            coverage_global_scope: "this".to_string(),
            coverage_global_scope_func: true,
        }
    }
}

impl InstrumenterOptions {
    /// The lenient parser configuration used for instrumentation input
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            source_type: if self.es_modules {
                SourceType::Module
            } else {
                SourceType::Script
            },
            allow_return_outside_function: self.auto_wrap,
            allow_import_export_everywhere: true,
            allow_super_outside_method: true,
            plugins: self.plugins.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_json_gives_defaults() {
        let options: InstrumenterOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, InstrumenterOptions::default());
        assert_eq!(options.coverage_variable, "__coverage__");
        assert!(options.compact);
        assert!(options.coverage_global_scope_func);
    }

    #[test]
    fn test_camel_case_fields() {
        let options: InstrumenterOptions = serde_json::from_str(
            r#"{ "coverageVariable": "__cov", "esModules": false, "ignoreClassMethods": ["render"] }"#,
        )
        .unwrap();
        assert_eq!(options.coverage_variable, "__cov");
        assert!(!options.es_modules);
        assert_eq!(options.ignore_class_methods, vec!["render".to_string()]);
    }

    #[test]
    fn test_parse_options_are_lenient() {
        let options = InstrumenterOptions {
            es_modules: false,
            auto_wrap: false,
            plugins: vec!["decorators".to_string()],
            ..InstrumenterOptions::default()
        };
        let parse = options.parse_options();
        assert_eq!(parse.source_type, SourceType::Script);
        assert!(!parse.allow_return_outside_function);
        assert!(parse.allow_import_export_everywhere);
        assert!(parse.allow_super_outside_method);
        assert!(parse.has_plugin("decorators"));
    }
}
