//! Instrumentation entry points

use jscover_ast::{generate, GenerateOptions, Program, SourceMap};
use jscover_parser::parse;
use jscover_recovery::{read_initial_coverage, CoverageDescriptor};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::error::InstrumentError;
use crate::options::InstrumenterOptions;
use crate::visitor::{ProgramVisitor, VisitorOptions};

/// Code to instrument: source text or an already parsed program
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentInput {
    Text(String),
    Ast(Box<Program>),
}

impl InstrumentInput {
    /// Accept a JSON string as source text or a JSON object as a serialized
    /// program
    pub fn from_json(value: JsonValue) -> Result<Self, InstrumentError> {
        match value {
            JsonValue::String(text) => Ok(InstrumentInput::Text(text)),
            JsonValue::Object(_) => {
                let program: Program = serde_json::from_value(value)?;
                Ok(InstrumentInput::Ast(Box::new(program)))
            }
            other => Err(InstrumentError::InvalidInput(format!(
                "code must be a string or a program object, found {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

impl From<String> for InstrumentInput {
    fn from(text: String) -> Self {
        InstrumentInput::Text(text)
    }
}

impl From<&str> for InstrumentInput {
    fn from(text: &str) -> Self {
        InstrumentInput::Text(text.to_string())
    }
}

impl From<Program> for InstrumentInput {
    fn from(program: Program) -> Self {
        InstrumentInput::Ast(Box::new(program))
    }
}

type SourceMapUrlCallback = Box<dyn FnMut(&str, &str)>;

/// Instruments one file per call and keeps the coverage descriptor and
/// source map of the latest call.
///
/// Code that was already instrumented is not instrumented again; its
/// descriptor is recovered from the embedded coverage object instead.
pub struct Instrumenter {
    options: InstrumenterOptions,
    file_coverage: Option<CoverageDescriptor>,
    source_map: Option<SourceMap>,
    source_map_url_callback: Option<SourceMapUrlCallback>,
}

impl Instrumenter {
    pub fn new(options: InstrumenterOptions) -> Self {
        Self {
            options,
            file_coverage: None,
            source_map: None,
            source_map_url_callback: None,
        }
    }

    /// Called with the file name and URL when the input carries a
    /// `sourceMappingURL` comment and an input source map was given
    pub fn with_source_map_url_callback(
        mut self,
        callback: impl FnMut(&str, &str) + 'static,
    ) -> Self {
        self.source_map_url_callback = Some(Box::new(callback));
        self
    }

    pub fn options(&self) -> &InstrumenterOptions {
        &self.options
    }

    /// Instrument `input` and return the generated code
    pub fn instrument_sync(
        &mut self,
        input: impl Into<InstrumentInput>,
        filename: &str,
        input_source_map: Option<JsonValue>,
    ) -> Result<String, InstrumentError> {
        self.file_coverage = None;
        self.source_map = None;

        let (mut program, source) = match input.into() {
            InstrumentInput::Text(text) => (parse(&text, &self.options.parse_options())?, text),
            InstrumentInput::Ast(program) => (*program, String::new()),
        };

        let has_input_source_map = input_source_map.is_some();
        let mut visitor = ProgramVisitor::new(
            filename,
            &source,
            VisitorOptions {
                coverage_variable: self.options.coverage_variable.clone(),
                coverage_global_scope: self.options.coverage_global_scope.clone(),
                coverage_global_scope_func: self.options.coverage_global_scope_func,
                ignore_class_methods: self.options.ignore_class_methods.clone(),
                input_source_map,
            },
        );
        visitor.enter(&mut program);
        let output = visitor.exit(&mut program);

        self.file_coverage = match output.file_coverage {
            Some(coverage) => Some(coverage),
            None => {
                let recovered = read_initial_coverage(&program);
                debug!(
                    filename,
                    recovered = recovered.is_some(),
                    "no fresh coverage, tried recovery"
                );
                recovered
            }
        };

        let generated = generate(
            &program,
            &GenerateOptions {
                compact: self.options.compact,
                comments: self.options.preserve_comments,
                source_maps: self.options.produce_source_map,
                source_file_name: Some(filename.to_string()),
            },
            &source,
        );

        if has_input_source_map {
            if let (Some(url), Some(callback)) =
                (&output.source_mapping_url, &mut self.source_map_url_callback)
            {
                callback(filename, url.as_str());
            }
        }

        if self.options.debug {
            info!(filename, code = %generated.code, "instrumented");
        }

        self.source_map = generated.map;
        Ok(generated.code)
    }

    /// Instrument `input` and hand the result to `callback`
    pub fn instrument<F>(
        &mut self,
        input: impl Into<InstrumentInput>,
        filename: &str,
        input_source_map: Option<JsonValue>,
        callback: F,
    ) where
        F: FnOnce(Result<String, InstrumentError>),
    {
        callback(self.instrument_sync(input, filename, input_source_map));
    }

    /// Coverage descriptor of the last call, fresh or recovered
    pub fn last_file_coverage(&self) -> Option<&CoverageDescriptor> {
        self.file_coverage.as_ref()
    }

    /// Source map of the last call, when `produceSourceMap` is on
    pub fn last_source_map(&self) -> Option<&SourceMap> {
        self.source_map.as_ref()
    }
}

impl Default for Instrumenter {
    fn default() -> Self {
        Self::new(InstrumenterOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use jscover_parser::ParseError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_instrument_text() {
        let mut instrumenter = Instrumenter::default();
        let code = instrumenter
            .instrument_sync("var x = 1;\nfoo(x);", "a.js", None)
            .unwrap();
        assert!(code.contains("__cov__marker"), "{}", code);
        let coverage = instrumenter.last_file_coverage().unwrap();
        assert_eq!(coverage.path, "a.js");
        assert_eq!(coverage.global_variable_name, "__coverage__");
        assert_eq!(coverage.coverage_data["s"], json!({ "0": 0, "1": 0 }));
        assert!(instrumenter.last_source_map().is_none());
    }

    #[test]
    fn test_reinstrument_recovers_descriptor() {
        let mut instrumenter = Instrumenter::default();
        let first = instrumenter
            .instrument_sync("function f(a) { return a || 1; }", "lib/f.js", None)
            .unwrap();
        let fresh = instrumenter.last_file_coverage().cloned().unwrap();

        instrumenter.instrument_sync(first.as_str(), "lib/f.js", None).unwrap();
        assert_eq!(instrumenter.last_file_coverage(), Some(&fresh));
    }

    #[test]
    fn test_uninstrumented_ignored_file_has_no_coverage() {
        let mut instrumenter = Instrumenter::default();
        instrumenter
            .instrument_sync("// jscover ignore file\nfoo();", "a.js", None)
            .unwrap();
        assert!(instrumenter.last_file_coverage().is_none());
    }

    #[test]
    fn test_parse_error_clears_last_result() {
        let mut instrumenter = Instrumenter::default();
        instrumenter.instrument_sync("foo();", "a.js", None).unwrap();
        assert!(instrumenter.last_file_coverage().is_some());

        let err = instrumenter.instrument_sync("var = ;", "b.js", None).unwrap_err();
        assert!(err.parse_error().is_some());
        assert!(instrumenter.last_file_coverage().is_none());
    }

    #[test]
    fn test_unknown_plugin_is_parse_error() {
        let options = InstrumenterOptions {
            plugins: vec!["jsx".to_string()],
            ..InstrumenterOptions::default()
        };
        let err = Instrumenter::new(options)
            .instrument_sync("foo();", "a.js", None)
            .unwrap_err();
        assert!(matches!(
            err,
            InstrumentError::Parse(ParseError::UnknownPlugin { .. })
        ));
    }

    #[test]
    fn test_top_level_return_follows_auto_wrap() {
        let mut lenient = Instrumenter::default();
        assert!(lenient.instrument_sync("return 1;", "a.js", None).is_ok());

        let mut strict = Instrumenter::new(InstrumenterOptions {
            auto_wrap: false,
            ..InstrumenterOptions::default()
        });
        assert!(strict.instrument_sync("return 1;", "a.js", None).is_err());
    }

    #[test]
    fn test_input_from_json() {
        assert_eq!(
            InstrumentInput::from_json(json!("foo();")).unwrap(),
            InstrumentInput::Text("foo();".to_string())
        );
        let err = InstrumentInput::from_json(json!(42)).unwrap_err();
        assert!(matches!(err, InstrumentError::InvalidInput(_)));
        assert!(err.to_string().contains("a number"));
        assert!(matches!(
            InstrumentInput::from_json(json!({ "body": 1 })),
            Err(InstrumentError::Json(_))
        ));
    }

    #[test]
    fn test_ast_input() {
        let program = parse("foo();", &InstrumenterOptions::default().parse_options()).unwrap();
        let json = serde_json::to_value(&program).unwrap();
        let input = InstrumentInput::from_json(json).unwrap();

        let mut instrumenter = Instrumenter::default();
        let code = instrumenter.instrument_sync(input, "a.js", None).unwrap();
        assert!(code.ends_with("foo();"), "{}", code);
        assert!(instrumenter.last_file_coverage().is_some());
    }

    #[test]
    fn test_callback_receives_result() {
        let mut instrumenter = Instrumenter::default();
        let mut seen = None;
        instrumenter.instrument("foo(", "a.js", None, |result| seen = Some(result.is_err()));
        assert_eq!(seen, Some(true));

        instrumenter.instrument("foo();", "a.js", None, |result| {
            assert!(result.unwrap().contains("foo()"));
        });
    }

    #[test]
    fn test_source_map_is_produced() {
        let mut instrumenter = Instrumenter::new(InstrumenterOptions {
            produce_source_map: true,
            ..InstrumenterOptions::default()
        });
        instrumenter.instrument_sync("foo();", "a.js", None).unwrap();
        let map = instrumenter.last_source_map().unwrap();
        assert_eq!(map.version, 3);
        assert_eq!(map.sources, vec!["a.js".to_string()]);
    }

    #[test]
    fn test_source_map_url_callback() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&calls);
        let mut instrumenter = Instrumenter::default().with_source_map_url_callback(
            move |file, url| sink.borrow_mut().push((file.to_string(), url.to_string())),
        );
        let source = "foo();\n//# sourceMappingURL=a.js.map";

        // Without an input map the comment is only recorded
        instrumenter.instrument_sync(source, "a.js", None).unwrap();
        assert!(calls.borrow().is_empty());

        let map = json!({ "version": 3, "sources": ["a.ts"], "mappings": "" });
        instrumenter.instrument_sync(source, "a.js", Some(map)).unwrap();
        assert_eq!(
            *calls.borrow(),
            vec![("a.js".to_string(), "a.js.map".to_string())]
        );
        let coverage = instrumenter.last_file_coverage().unwrap();
        assert_eq!(coverage.coverage_data["inputSourceMap"]["sources"], json!(["a.ts"]));
    }

    #[test]
    fn test_custom_coverage_variable() {
        let mut instrumenter = Instrumenter::new(InstrumenterOptions {
            coverage_variable: "__jscov".to_string(),
            ..InstrumenterOptions::default()
        });
        let code = instrumenter.instrument_sync("foo();", "a.js", None).unwrap();
        assert!(code.contains("\"__jscov\""), "{}", code);
        assert_eq!(
            instrumenter.last_file_coverage().unwrap().global_variable_name,
            "__jscov"
        );
    }
}
