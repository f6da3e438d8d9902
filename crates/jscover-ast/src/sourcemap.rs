//! Version 3 source maps

use serde::{Deserialize, Serialize};

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// A version 3 source map as serialized to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub names: Vec<String>,
    pub mappings: String,
}

/// One generated-to-original position pair. All values are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub generated_line: u32,
    pub generated_column: u32,
    pub original_line: u32,
    pub original_column: u32,
}

/// Collects mappings for a single source file while code is generated
#[derive(Debug, Clone)]
pub struct SourceMapBuilder {
    file: Option<String>,
    source: String,
    source_content: Option<String>,
    mappings: Vec<Mapping>,
}

impl SourceMapBuilder {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            file: None,
            source: source.into(),
            source_content: None,
            mappings: Vec::new(),
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_source_content(mut self, content: impl Into<String>) -> Self {
        self.source_content = Some(content.into());
        self
    }

    pub fn add(&mut self, mapping: Mapping) {
        // Skip repeats of the same generated position
        if let Some(last) = self.mappings.last() {
            if last.generated_line == mapping.generated_line
                && last.generated_column == mapping.generated_column
            {
                return;
            }
        }
        self.mappings.push(mapping);
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn build(self) -> SourceMap {
        SourceMap {
            version: 3,
            file: self.file,
            source_root: None,
            sources: vec![self.source],
            sources_content: self.source_content.map(|c| vec![Some(c)]),
            names: Vec::new(),
            mappings: encode_mappings(&self.mappings),
        }
    }
}

/// Encode mappings (sorted by generated position) into the `mappings` field
pub fn encode_mappings(mappings: &[Mapping]) -> String {
    let mut out = String::new();
    let mut line = 0;
    let mut prev_column = 0i64;
    let mut prev_original_line = 0i64;
    let mut prev_original_column = 0i64;
    let mut first_in_line = true;

    for mapping in mappings {
        while line < mapping.generated_line {
            out.push(';');
            line += 1;
            prev_column = 0;
            first_in_line = true;
        }
        if !first_in_line {
            out.push(',');
        }
        first_in_line = false;

        encode_vlq(&mut out, mapping.generated_column as i64 - prev_column);
        // Single source, index delta is always zero
        encode_vlq(&mut out, 0);
        encode_vlq(&mut out, mapping.original_line as i64 - prev_original_line);
        encode_vlq(&mut out, mapping.original_column as i64 - prev_original_column);

        prev_column = mapping.generated_column as i64;
        prev_original_line = mapping.original_line as i64;
        prev_original_column = mapping.original_column as i64;
    }
    out
}

fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    loop {
        let mut digit = vlq & 0b1_1111;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b10_0000;
        }
        out.push(BASE64[digit as usize] as char);
        if vlq == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(gl: u32, gc: u32, ol: u32, oc: u32) -> Mapping {
        Mapping {
            generated_line: gl,
            generated_column: gc,
            original_line: ol,
            original_column: oc,
        }
    }

    #[test]
    fn test_vlq_values() {
        let mut out = String::new();
        encode_vlq(&mut out, 0);
        encode_vlq(&mut out, 1);
        encode_vlq(&mut out, -1);
        encode_vlq(&mut out, 16);
        assert_eq!(out, "ACDgB");
    }

    #[test]
    fn test_encode_mappings_across_lines() {
        let encoded = encode_mappings(&[
            mapping(0, 0, 0, 0),
            mapping(0, 4, 0, 4),
            mapping(2, 2, 1, 0),
        ]);
        assert_eq!(encoded, "AAAA,IAAI;;EACJ");
    }

    #[test]
    fn test_builder_serializes_camel_case() {
        let mut builder = SourceMapBuilder::new("a.js").with_source_content("x;");
        builder.add(mapping(0, 0, 0, 0));
        builder.add(mapping(0, 0, 0, 1));
        assert_eq!(builder.len(), 1);

        let json = serde_json::to_value(builder.build()).unwrap();
        assert_eq!(json["version"], 3);
        assert_eq!(json["sources"][0], "a.js");
        assert_eq!(json["sourcesContent"][0], "x;");
        assert_eq!(json["mappings"], "AAAA");
    }
}
