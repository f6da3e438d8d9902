//! The file coverage object built up while instrumenting

use jscover_ast::Location;
use serde::Serialize;
use serde_json::{json, Map, Value as JsonValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BranchKind {
    If,
    CondExpr,
    BinaryExpr,
    Switch,
    DefaultArg,
}

#[derive(Debug, Clone, Serialize)]
struct FunctionEntry {
    name: String,
    decl: Location,
    loc: Location,
    line: u32,
}

#[derive(Debug, Clone, Serialize)]
struct BranchEntry {
    loc: Location,
    #[serde(rename = "type")]
    kind: BranchKind,
    locations: Vec<Location>,
    line: u32,
}

/// Statement, function and branch maps for one file. Counters start at zero.
#[derive(Debug, Clone)]
pub struct FileCoverage {
    path: String,
    statements: Vec<Location>,
    functions: Vec<FunctionEntry>,
    branches: Vec<BranchEntry>,
    input_source_map: Option<JsonValue>,
}

impl FileCoverage {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            statements: Vec::new(),
            functions: Vec::new(),
            branches: Vec::new(),
            input_source_map: None,
        }
    }

    pub fn set_input_source_map(&mut self, map: JsonValue) {
        self.input_source_map = Some(map);
    }

    pub fn new_statement(&mut self, loc: Location) -> usize {
        self.statements.push(loc);
        self.statements.len() - 1
    }

    pub fn new_function(&mut self, name: impl Into<String>, decl: Location, loc: Location) -> usize {
        self.functions.push(FunctionEntry {
            name: name.into(),
            decl,
            loc,
            line: loc.start.line,
        });
        self.functions.len() - 1
    }

    pub fn new_branch(&mut self, kind: BranchKind, loc: Location) -> usize {
        self.branches.push(BranchEntry {
            loc,
            kind,
            locations: Vec::new(),
            line: loc.start.line,
        });
        self.branches.len() - 1
    }

    /// Add a path to a branch and return its index within the branch
    pub fn add_branch_path(&mut self, branch: usize, loc: Location) -> usize {
        match self.branches.get_mut(branch) {
            Some(entry) => {
                entry.locations.push(loc);
                entry.locations.len() - 1
            }
            None => 0,
        }
    }

    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// The JSON object embedded in instrumented code
    pub fn to_json(&self) -> Map<String, JsonValue> {
        let mut data = Map::new();
        data.insert("path".to_string(), json!(self.path));
        data.insert("statementMap".to_string(), indexed(&self.statements));
        data.insert("fnMap".to_string(), indexed(&self.functions));
        data.insert("branchMap".to_string(), indexed(&self.branches));
        data.insert("s".to_string(), zeros(self.statements.len(), |_| json!(0)));
        data.insert("f".to_string(), zeros(self.functions.len(), |_| json!(0)));
        data.insert(
            "b".to_string(),
            zeros(self.branches.len(), |i| json!(vec![0; self.branches[i].locations.len()])),
        );
        if let Some(map) = &self.input_source_map {
            data.insert("inputSourceMap".to_string(), map.clone());
        }
        data
    }
}

/// `{"0": items[0], "1": items[1], ...}`
fn indexed<T: Serialize>(items: &[T]) -> JsonValue {
    let map = items
        .iter()
        .enumerate()
        .map(|(i, item)| (i.to_string(), json!(item)))
        .collect::<Map<_, _>>();
    JsonValue::Object(map)
}

fn zeros(len: usize, value: impl Fn(usize) -> JsonValue) -> JsonValue {
    JsonValue::Object((0..len).map(|i| (i.to_string(), value(i))).collect())
}
