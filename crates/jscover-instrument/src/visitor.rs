//! Program-level instrumentation visitor
//!
//! `enter` decides whether the program should be instrumented at all and
//! rewrites it; `exit` prepends the coverage preamble and hands back the
//! fresh descriptor. A program is left alone when it already declares its
//! coverage function (it was instrumented before) or when a comment asks
//! for the whole file to be ignored.

use jscover_ast::*;
use jscover_recovery::{CoverageDescriptor, MAGIC_KEY, MAGIC_VALUE};
use jscover_scope::{ScopeId, ScopeTree};
use serde_json::{json, Map, Value as JsonValue};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::coverage::FileCoverage;
use crate::rewrite::Rewriter;
use crate::template::{assign, call, index, marked_object_literal, member, var};

/// Comment text that excludes a file from instrumentation
pub const IGNORE_FILE_HINT: &str = "jscover ignore file";

/// Name of the per-file coverage function, derived from the file path
pub fn coverage_function_name(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("cov_{}", &digest[..10])
}

/// SHA-256 hex digest of the serialized coverage data
pub fn coverage_hash(data: &Map<String, JsonValue>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(JsonValue::Object(data.clone()).to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Extract the URL from a `# sourceMappingURL=` comment
fn source_mapping_url(comment: &Comment) -> Option<String> {
    let text = comment.text.trim();
    let rest = text
        .strip_prefix("# sourceMappingURL=")
        .or_else(|| text.strip_prefix("@ sourceMappingURL="))?;
    let url = rest.trim();
    (!url.is_empty()).then(|| url.to_string())
}

#[derive(Debug, Clone, Default)]
pub struct VisitorOptions {
    pub coverage_variable: String,
    pub coverage_global_scope: String,
    pub coverage_global_scope_func: bool,
    pub ignore_class_methods: Vec<String>,
    /// Source map of the input, embedded in the coverage data
    pub input_source_map: Option<JsonValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    AlreadyInstrumented,
    IgnoreHint,
}

/// Result of a visit
#[derive(Debug, Clone, Default)]
pub struct VisitorOutput {
    /// `None` when the program was left unchanged
    pub file_coverage: Option<CoverageDescriptor>,
    /// URL from a `sourceMappingURL` comment in the input
    pub source_mapping_url: Option<String>,
}

pub struct ProgramVisitor {
    file_path: String,
    cov_name: String,
    options: VisitorOptions,
    lines: LineIndex,
    coverage: FileCoverage,
    skip: Option<Skip>,
    source_mapping_url: Option<String>,
}

impl ProgramVisitor {
    /// `source` is the text the program was parsed from, used to turn spans
    /// into line/column locations
    pub fn new(file_path: impl Into<String>, source: &str, options: VisitorOptions) -> Self {
        let file_path = file_path.into();
        let mut coverage = FileCoverage::new(file_path.clone());
        if let Some(map) = &options.input_source_map {
            coverage.set_input_source_map(map.clone());
        }
        Self {
            cov_name: coverage_function_name(&file_path),
            file_path,
            options,
            lines: LineIndex::new(source),
            coverage,
            skip: None,
            source_mapping_url: None,
        }
    }

    pub fn coverage_function_name(&self) -> &str {
        &self.cov_name
    }

    pub fn enter(&mut self, program: &mut Program) {
        self.source_mapping_url = program.comments.iter().find_map(source_mapping_url);

        if program
            .comments
            .iter()
            .any(|comment| comment.text.trim() == IGNORE_FILE_HINT)
        {
            debug!(path = %self.file_path, "file ignored by comment hint");
            self.skip = Some(Skip::IgnoreHint);
            return;
        }
        if ScopeTree::build(program)
            .own_binding(ScopeId::ROOT, &self.cov_name)
            .is_some()
        {
            debug!(path = %self.file_path, function = %self.cov_name, "already instrumented");
            self.skip = Some(Skip::AlreadyInstrumented);
            return;
        }

        Rewriter {
            coverage: &mut self.coverage,
            lines: &self.lines,
            cov_name: &self.cov_name,
            ignore_class_methods: &self.options.ignore_class_methods,
        }
        .program(program);
    }

    pub fn exit(self, program: &mut Program) -> VisitorOutput {
        if self.skip.is_some() {
            return VisitorOutput {
                file_coverage: None,
                source_mapping_url: self.source_mapping_url,
            };
        }

        let data = self.coverage.to_json();
        let mut marked = data.clone();
        marked.insert(MAGIC_KEY.to_string(), json!(MAGIC_VALUE as u64));
        let hash = coverage_hash(&marked);
        // The literal gets the marker prepended by `marked_object_literal`
        let mut embedded = data.clone();
        embedded.insert("hash".to_string(), json!(hash));

        debug!(
            path = %self.file_path,
            statements = self.coverage.statement_count(),
            functions = self.coverage.function_count(),
            branches = self.coverage.branch_count(),
            "instrumented"
        );

        let preamble = self.preamble(&hash, &embedded);
        let directives = program
            .body
            .iter()
            .take_while(|stmt| {
                matches!(
                    &stmt.kind,
                    StmtKind::Expr(Expr {
                        kind: ExprKind::Literal(Literal::String(_)),
                        ..
                    })
                )
            })
            .count();
        program.body.splice(directives..directives, preamble);

        VisitorOutput {
            file_coverage: Some(CoverageDescriptor::new(
                self.file_path,
                hash,
                self.options.coverage_variable,
                data,
            )),
            source_mapping_url: self.source_mapping_url,
        }
    }

    /// The global object expression: `new Function("return this")()` or the
    /// configured scope as is
    fn global_expr(&self) -> Expr {
        let scope = &self.options.coverage_global_scope;
        if self.options.coverage_global_scope_func {
            let function = Expr::synthetic(ExprKind::New {
                callee: Box::new(Expr::ident("Function")),
                args: vec![Expr::string(format!("return {}", scope))],
            });
            call(function, vec![])
        } else if scope == "this" {
            Expr::synthetic(ExprKind::This)
        } else {
            Expr::ident(scope.as_str())
        }
    }

    /// ```text
    /// function cov_xxx() {
    ///   var path = "...";
    ///   var hash = "...";
    ///   var global = new Function("return this")();
    ///   var gcv = "__coverage__";
    ///   var coverageData = { __cov__marker: 12648430, ... };
    ///   var coverage = global[gcv] || (global[gcv] = {});
    ///   if (!coverage[path] || coverage[path].hash !== hash) {
    ///     coverage[path] = coverageData;
    ///   }
    ///   var actualCoverage = coverage[path];
    ///   cov_xxx = function () { return actualCoverage; };
    ///   return actualCoverage;
    /// }
    /// cov_xxx();
    /// ```
    fn preamble(&self, hash: &str, embedded: &Map<String, JsonValue>) -> Vec<Stmt> {
        let ident = |name: &str| Expr::ident(name);
        let global_gcv = || index(ident("global"), ident("gcv"));
        let coverage_path = || index(ident("coverage"), ident("path"));

        let coverage_init = Expr::synthetic(ExprKind::Logical {
            op: LogicalOp::Or,
            left: Box::new(global_gcv()),
            right: Box::new(assign(global_gcv(), Expr::synthetic(ExprKind::Object(vec![])))),
        });
        let stale = Expr::synthetic(ExprKind::Logical {
            op: LogicalOp::Or,
            left: Box::new(Expr::synthetic(ExprKind::Unary {
                op: UnaryOp::Not,
                operand: Box::new(coverage_path()),
            })),
            right: Box::new(Expr::synthetic(ExprKind::Binary {
                op: BinaryOp::StrictNe,
                left: Box::new(member(coverage_path(), "hash")),
                right: Box::new(ident("hash")),
            })),
        });
        let refresh = Stmt::synthetic(StmtKind::If {
            test: stale,
            consequent: Box::new(Stmt::synthetic(StmtKind::Block(vec![Stmt::expr(assign(
                coverage_path(),
                ident("coverageData"),
            ))]))),
            alternate: None,
        });
        let getter = Function::synthetic(vec![Stmt::synthetic(StmtKind::Return(Some(ident(
            "actualCoverage",
        ))))]);
        let replace_self = Stmt::expr(assign(
            ident(&self.cov_name),
            Expr::synthetic(ExprKind::Function(Box::new(getter))),
        ));

        let body = vec![
            var("path", Expr::string(self.file_path.as_str())),
            var("hash", Expr::string(hash)),
            var("global", self.global_expr()),
            var("gcv", Expr::string(self.options.coverage_variable.as_str())),
            var("coverageData", marked_object_literal(embedded)),
            var("coverage", coverage_init),
            refresh,
            var("actualCoverage", coverage_path()),
            replace_self,
            Stmt::synthetic(StmtKind::Return(Some(ident("actualCoverage")))),
        ];

        let mut function = Function::synthetic(body);
        function.name = Some(self.cov_name.clone());
        vec![
            Stmt::synthetic(StmtKind::Function(Box::new(function))),
            Stmt::expr(call(ident(&self.cov_name), vec![])),
        ]
    }
}

#[cfg(test)]
mod tests {
    use jscover_parser::{parse, ParseOptions};
    use pretty_assertions::assert_eq;

    use super::*;

    fn options() -> VisitorOptions {
        VisitorOptions {
            coverage_variable: "__coverage__".to_string(),
            coverage_global_scope: "this".to_string(),
            coverage_global_scope_func: true,
            ..VisitorOptions::default()
        }
    }

    fn visit(source: &str, options: VisitorOptions) -> (Program, VisitorOutput) {
        let mut program = parse(source, &ParseOptions::module()).expect("parse failed");
        let mut visitor = ProgramVisitor::new("src/a.js", source, options);
        visitor.enter(&mut program);
        let output = visitor.exit(&mut program);
        (program, output)
    }

    fn data(output: &VisitorOutput) -> &Map<String, JsonValue> {
        &output.file_coverage.as_ref().expect("instrumented").coverage_data
    }

    #[test]
    fn test_function_name_is_stable() {
        let name = coverage_function_name("src/a.js");
        assert_eq!(name.len(), "cov_".len() + 10);
        assert_eq!(name, coverage_function_name("src/a.js"));
        assert_ne!(name, coverage_function_name("src/b.js"));
    }

    #[test]
    fn test_counts() {
        let source = "var a = 1;\n\
                      function f(x = 2) { return x ? a : b; }\n\
                      if (a && b || c) { f(); } else { g(); }\n\
                      switch (a) { case 1: break; default: h(); }\n\
                      const k = () => a;";
        let (_, output) = visit(source, options());
        let data = data(&output);

        // var, return, if, f(), g(), switch, break, h(), const, arrow body
        assert_eq!(data["s"].as_object().unwrap().len(), 10);
        assert_eq!(data["f"].as_object().unwrap().len(), 2);
        assert_eq!(data["fnMap"]["0"]["name"], json!("f"));
        assert_eq!(data["fnMap"]["1"]["name"], json!("(anonymous_1)"));

        let kinds: Vec<&str> = data["branchMap"]
            .as_object()
            .unwrap()
            .values()
            .map(|b| b["type"].as_str().unwrap())
            .collect();
        assert!(kinds.contains(&"default-arg"));
        assert!(kinds.contains(&"cond-expr"));
        assert!(kinds.contains(&"if"));
        assert!(kinds.contains(&"binary-expr"));
        assert!(kinds.contains(&"switch"));

        // Logical chains collapse into one branch with a path per operand
        let b = data["b"].as_object().unwrap();
        assert!(b.values().any(|paths| paths == &json!([0, 0, 0])));
    }

    #[test]
    fn test_locations_are_one_based_lines() {
        let (_, output) = visit("\n  foo();", options());
        assert_eq!(
            data(&output)["statementMap"]["0"],
            json!({ "start": { "line": 2, "column": 2 }, "end": { "line": 2, "column": 8 } })
        );
    }

    #[test]
    fn test_preamble_is_inserted_after_directives() {
        let (program, output) = visit("'use strict';\nfoo();", options());
        let cov_name = coverage_function_name("src/a.js");
        assert!(matches!(program.body[0].kind, StmtKind::Expr(_)));
        match &program.body[1].kind {
            StmtKind::Function(function) => {
                assert_eq!(function.name.as_deref(), Some(cov_name.as_str()))
            }
            other => panic!("expected preamble function, found {:?}", other),
        }
        let descriptor = output.file_coverage.unwrap();
        assert_eq!(descriptor.path, "src/a.js");
        assert_eq!(descriptor.global_variable_name, "__coverage__");
        assert_eq!(descriptor.hash.len(), 64);
        assert!(!descriptor.coverage_data.contains_key(MAGIC_KEY));
        assert!(!descriptor.coverage_data.contains_key("hash"));
    }

    #[test]
    fn test_ignore_hint_skips_file() {
        let (program, output) = visit("/* jscover ignore file */\nfoo();", options());
        assert!(output.file_coverage.is_none());
        assert_eq!(program.body.len(), 1);
    }

    #[test]
    fn test_second_pass_is_skipped() {
        let source = "foo();";
        let (mut program, first) = visit(source, options());
        assert!(first.file_coverage.is_some());

        let mut visitor = ProgramVisitor::new("src/a.js", source, options());
        visitor.enter(&mut program);
        let before = program.body.len();
        let second = visitor.exit(&mut program);
        assert!(second.file_coverage.is_none());
        assert_eq!(program.body.len(), before);
    }

    #[test]
    fn test_ignore_class_methods() {
        let source = "class A { render() { return 1; } update() { return 2; } }";
        let options = VisitorOptions {
            ignore_class_methods: vec!["render".to_string()],
            ..options()
        };
        let (_, output) = visit(source, options);
        let data = data(&output);
        assert_eq!(data["f"].as_object().unwrap().len(), 1);
        assert_eq!(data["fnMap"]["0"]["name"], json!("update"));
    }

    #[test]
    fn test_source_mapping_url_is_collected() {
        let (_, output) = visit("foo();\n//# sourceMappingURL=a.js.map", options());
        assert_eq!(output.source_mapping_url.as_deref(), Some("a.js.map"));
    }

    #[test]
    fn test_input_source_map_is_embedded() {
        let options = VisitorOptions {
            input_source_map: Some(json!({ "version": 3, "mappings": "" })),
            ..options()
        };
        let (_, output) = visit("foo();", options);
        assert_eq!(data(&output)["inputSourceMap"]["version"], json!(3));
    }

    #[test]
    fn test_global_scope_without_function() {
        let options = VisitorOptions {
            coverage_global_scope: "window".to_string(),
            coverage_global_scope_func: false,
            ..options()
        };
        let (program, _) = visit("foo();", options);
        let options = GenerateOptions {
            compact: true,
            ..GenerateOptions::default()
        };
        let code = generate(&program, &options, "").code;
        assert!(code.contains("var global=window;"), "{}", code);
    }
}
