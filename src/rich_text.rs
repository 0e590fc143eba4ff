// 📝 Rich-Text Flattener - Node tree → reading-order text
// Paragraphs, headings, lists, tables and hyperlinks become plain text with
// light structural markup so both CMS sides can be compared as strings.

use crate::error::{Diagnostic, FlattenError};
use serde_json::{Map, Value};
use tracing::warn;

/// Marker some exported text values start with; not part of the content
const EXPORT_TEXT_PREFIX: &str = "Contentful - ";

// ============================================================================
// CONTENT NODE
// ============================================================================

/// One node of a rich-text document
///
/// Leaves carry text, containers carry children, tables carry rows of cells.
/// Anything that does not fit is kept as `Unknown` with its raw JSON so its
/// text can still be recovered.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentNode {
    Text(String),
    Paragraph(Vec<ContentNode>),
    Heading { level: u8, children: Vec<ContentNode> },
    UnorderedList(Vec<ContentNode>),
    OrderedList(Vec<ContentNode>),
    ListItem(Vec<ContentNode>),
    Table(Vec<TableRow>),
    Hyperlink { uri: Option<String>, children: Vec<ContentNode> },
    Unknown { node_type: Option<String>, raw: Value },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableRow {
    pub cells: Vec<Vec<ContentNode>>,
}

impl ContentNode {
    pub fn text(value: &str) -> Self {
        ContentNode::Text(value.to_string())
    }

    pub fn paragraph(texts: &[&str]) -> Self {
        ContentNode::Paragraph(texts.iter().map(|t| ContentNode::text(t)).collect())
    }

    /// Render this node (and its subtree) as text
    pub fn render(&self) -> String {
        match self {
            ContentNode::Text(value) => value.trim().to_string(),
            ContentNode::Paragraph(children) | ContentNode::Hyperlink { children, .. } => {
                join_inline(children)
            }
            ContentNode::ListItem(children) => render_list_item(children),
            ContentNode::Heading { children, .. } => {
                let text = join_inline(children);
                if text.is_empty() {
                    String::new()
                } else {
                    format!("\n{}\n", text.to_uppercase())
                }
            }
            ContentNode::UnorderedList(items) => render_list(items, |_| "• ".to_string()),
            ContentNode::OrderedList(items) => render_list(items, |n| format!("{}. ", n)),
            ContentNode::Table(rows) => {
                let lines: Vec<String> = rows
                    .iter()
                    .map(|row| {
                        row.cells
                            .iter()
                            .map(|cell| join_inline(cell))
                            .collect::<Vec<_>>()
                            .join(" | ")
                    })
                    .filter(|line| !line.replace('|', "").trim().is_empty())
                    .collect();

                if lines.is_empty() {
                    String::new()
                } else {
                    format!("TABLE:\n{}", lines.join("\n"))
                }
            }
            ContentNode::Unknown { raw, .. } => leaf_texts(raw).join(" "),
        }
    }
}

fn join_inline(children: &[ContentNode]) -> String {
    children
        .iter()
        .map(ContentNode::render)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Inline children on the item's line, nested lists indented below it
fn render_list_item(children: &[ContentNode]) -> String {
    let mut inline = Vec::new();
    let mut nested = Vec::new();

    for child in children {
        let text = child.render();
        if text.is_empty() {
            continue;
        }
        match child {
            ContentNode::UnorderedList(_) | ContentNode::OrderedList(_) => nested.extend(
                text.lines().map(|line| format!("  {}", line)),
            ),
            _ => inline.push(text),
        }
    }

    let mut lines = Vec::with_capacity(nested.len() + 1);
    if !inline.is_empty() {
        lines.push(inline.join(" "));
    }
    lines.extend(nested);
    lines.join("\n")
}

fn render_list(items: &[ContentNode], prefix: impl Fn(usize) -> String) -> String {
    items
        .iter()
        .map(ContentNode::render)
        .filter(|text| !text.is_empty())
        .enumerate()
        .map(|(idx, text)| format!("{}{}", prefix(idx + 1), text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Every descendant leaf text of an opaque JSON subtree, in document order
fn leaf_texts(value: &Value) -> Vec<String> {
    let mut texts = Vec::new();
    collect_leaf_texts(value, &mut texts);
    texts
}

fn collect_leaf_texts(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_leaf_texts(item, out);
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                match key.as_str() {
                    // Link targets and formatting marks are not content
                    "data" | "marks" | "nodeType" | "type" => {}
                    "value" | "text" | "content" | "children" | "items" => {
                        collect_leaf_texts(child, out)
                    }
                    _ if child.is_object() || child.is_array() => collect_leaf_texts(child, out),
                    _ => {}
                }
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

// ============================================================================
// FLATTENER
// ============================================================================

/// Flattened text plus the malformed subtrees that were skipped
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlattenOutcome {
    pub text: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parses rich-text JSON into `ContentNode`s, capturing malformed subtrees
#[derive(Debug, Default)]
pub struct Flattener {
    diagnostics: Vec<Diagnostic>,
}

impl Flattener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and flatten a document, a node, or a list of nodes
    pub fn flatten_value(mut self, value: &Value) -> FlattenOutcome {
        let blocks = self.parse_blocks(value);
        FlattenOutcome {
            text: flatten(&blocks),
            diagnostics: self.diagnostics,
        }
    }

    /// Top-level blocks of a rich-text value
    pub fn parse_blocks(&mut self, value: &Value) -> Vec<ContentNode> {
        match value {
            Value::Null => Vec::new(),
            Value::Array(items) => self.parse_children(items, "$"),
            Value::Object(map) if node_type(map).as_deref() == Some("document") => {
                match children_of(map) {
                    Some(Value::Array(items)) => self.parse_children(items, "$.content"),
                    _ => vec![self.opaque(map, Some("document".to_string()))],
                }
            }
            other => self.parse_node(other, "$").map_or_else(
                |err| {
                    self.record(&err);
                    Vec::new()
                },
                |node| vec![node],
            ),
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    fn record(&mut self, err: &FlattenError) {
        warn!("skipping rich-text subtree: {}", err);
        self.diagnostics.push(Diagnostic::from(err));
    }

    fn parse_children(&mut self, items: &[Value], path: &str) -> Vec<ContentNode> {
        let mut nodes = Vec::with_capacity(items.len());

        for (idx, item) in items.iter().enumerate() {
            let child_path = format!("{}[{}]", path, idx);
            match self.parse_node(item, &child_path) {
                Ok(node) => nodes.push(node),
                Err(err) => self.record(&err),
            }
        }

        nodes
    }

    fn parse_node(&mut self, value: &Value, path: &str) -> Result<ContentNode, FlattenError> {
        let map = match value {
            Value::String(s) => return Ok(ContentNode::Text(s.clone())),
            Value::Object(map) => map,
            Value::Array(_) => {
                return Ok(ContentNode::Unknown {
                    node_type: None,
                    raw: value.clone(),
                })
            }
            other => {
                return Err(FlattenError::MalformedNode {
                    path: path.to_string(),
                    reason: format!("expected object or string, got {}", json_kind(other)),
                })
            }
        };

        let kind = match node_type(map) {
            Some(kind) => kind,
            None => return Ok(self.opaque(map, None)),
        };

        if kind == "text" {
            let text = ["value", "text"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .unwrap_or_default();
            let text = text.strip_prefix(EXPORT_TEXT_PREFIX).unwrap_or(text);
            return Ok(ContentNode::Text(text.to_string()));
        }

        // Containers need a list of children; anything else is opaque
        let children = match children_of(map) {
            Some(Value::Array(items)) => items.as_slice(),
            None => &[],
            Some(_) => return Ok(self.opaque(map, Some(kind))),
        };
        let child_path = format!("{}.content", path);

        let node = match kind.as_str() {
            "paragraph" => ContentNode::Paragraph(self.parse_children(children, &child_path)),
            "unordered-list" => ContentNode::UnorderedList(self.parse_children(children, &child_path)),
            "ordered-list" => ContentNode::OrderedList(self.parse_children(children, &child_path)),
            "list-item" => ContentNode::ListItem(self.parse_children(children, &child_path)),
            "table" => ContentNode::Table(self.parse_rows(children, &child_path)),
            "hyperlink" | "entry-hyperlink" | "asset-hyperlink" => ContentNode::Hyperlink {
                uri: map
                    .get("data")
                    .and_then(|data| data.get("uri"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                children: self.parse_children(children, &child_path),
            },
            heading if heading.starts_with("heading-") => match heading_level(heading) {
                Some(level) => ContentNode::Heading {
                    level,
                    children: self.parse_children(children, &child_path),
                },
                None => self.opaque(map, Some(kind.clone())),
            },
            _ => self.opaque(map, Some(kind.clone())),
        };

        Ok(node)
    }

    fn parse_rows(&mut self, rows: &[Value], path: &str) -> Vec<TableRow> {
        let mut parsed = Vec::with_capacity(rows.len());

        for (idx, row) in rows.iter().enumerate() {
            let row_path = format!("{}[{}]", path, idx);
            let cells = match row.as_object().map(children_of) {
                Some(Some(Value::Array(cells))) => cells,
                Some(None) => {
                    parsed.push(TableRow::default());
                    continue;
                }
                _ => {
                    self.record(&FlattenError::MalformedNode {
                        path: row_path,
                        reason: "table row must be an object with a list of cells".to_string(),
                    });
                    continue;
                }
            };

            let mut row_cells = Vec::with_capacity(cells.len());
            for (cell_idx, cell) in cells.iter().enumerate() {
                let cell_path = format!("{}.content[{}]", row_path, cell_idx);
                match cell {
                    Value::String(s) => row_cells.push(vec![ContentNode::Text(s.clone())]),
                    Value::Object(map) => match children_of(map) {
                        Some(Value::Array(items)) => {
                            row_cells.push(self.parse_children(items, &format!("{}.content", cell_path)))
                        }
                        _ => row_cells.push(vec![self.opaque(map, node_type(map))]),
                    },
                    other => self.record(&FlattenError::MalformedNode {
                        path: cell_path,
                        reason: format!("expected table cell, got {}", json_kind(other)),
                    }),
                }
            }

            parsed.push(TableRow { cells: row_cells });
        }

        parsed
    }

    fn opaque(&self, map: &Map<String, Value>, node_type: Option<String>) -> ContentNode {
        ContentNode::Unknown {
            node_type,
            raw: Value::Object(map.clone()),
        }
    }
}

fn node_type(map: &Map<String, Value>) -> Option<String> {
    ["nodeType", "type"]
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_str))
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
}

fn children_of(map: &Map<String, Value>) -> Option<&Value> {
    ["content", "children", "items"]
        .iter()
        .find_map(|key| map.get(*key))
}

fn heading_level(kind: &str) -> Option<u8> {
    kind.strip_prefix("heading-")
        .and_then(|level| level.parse::<u8>().ok())
        .filter(|level| (1..=6).contains(level))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Join top-level blocks with a blank line, dropping empty ones
pub fn flatten(nodes: &[ContentNode]) -> String {
    nodes
        .iter()
        .map(ContentNode::render)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Flatten rich-text JSON, logging and skipping malformed subtrees
pub fn flatten_value(value: &Value) -> String {
    Flattener::new().flatten_value(value).text
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;
    use serde_json::json;

    fn create_test_text(value: &str) -> Value {
        json!({ "nodeType": "text", "value": value, "marks": [], "data": {} })
    }

    fn create_test_paragraph(values: &[&str]) -> Value {
        json!({
            "nodeType": "paragraph",
            "data": {},
            "content": values.iter().map(|v| create_test_text(v)).collect::<Vec<_>>(),
        })
    }

    fn create_test_list(kind: &str, items: &[&str]) -> Value {
        json!({
            "nodeType": kind,
            "content": items
                .iter()
                .map(|item| json!({
                    "nodeType": "list-item",
                    "content": [create_test_paragraph(&[*item])],
                }))
                .collect::<Vec<_>>(),
        })
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(flatten(&[]), "");
        assert_eq!(flatten_value(&json!([])), "");
        assert_eq!(flatten_value(&Value::Null), "");
    }

    #[test]
    fn test_single_text_leaf() {
        assert_eq!(flatten(&[ContentNode::text("  Hello there \n")]), "Hello there");
        assert_eq!(flatten_value(&create_test_text("  Hello there ")), "Hello there");
    }

    #[test]
    fn test_paragraph_joins_children() {
        let para = create_test_paragraph(&["Apply for ", "", "a loan", " today."]);
        assert_eq!(flatten_value(&json!([para])), "Apply for a loan today.");
    }

    #[test]
    fn test_heading_is_uppercased_and_wrapped() {
        let doc = json!([
            { "nodeType": "heading-2", "content": [create_test_text("Eligibility")] },
            create_test_paragraph(&["Body"]),
        ]);
        assert_eq!(flatten_value(&doc), "\nELIGIBILITY\n\n\nBody");
    }

    #[test]
    fn test_unordered_list_with_bare_items() {
        let doc = json!([{ "type": "unordered-list", "items": ["A", "B"] }]);
        assert_eq!(flatten_value(&doc), "• A\n• B");
    }

    #[test]
    fn test_ordered_list() {
        let doc = json!([create_test_list("ordered-list", &["A", "B"])]);
        assert_eq!(flatten_value(&doc), "1. A\n2. B");
    }

    #[test]
    fn test_list_numbering_skips_empty_items() {
        let doc = json!([create_test_list("ordered-list", &["A", "  ", "C"])]);
        assert_eq!(flatten_value(&doc), "1. A\n2. C");
    }

    #[test]
    fn test_nested_list_is_indented_under_its_item() {
        let doc = json!([{
            "nodeType": "unordered-list",
            "content": [
                {
                    "nodeType": "list-item",
                    "content": [
                        create_test_paragraph(&["Parent"]),
                        create_test_list("ordered-list", &["x", "y"]),
                    ],
                },
                { "nodeType": "list-item", "content": [create_test_paragraph(&["Sibling"])] },
            ],
        }]);
        assert_eq!(flatten_value(&doc), "• Parent\n  1. x\n  2. y\n• Sibling");
    }

    #[test]
    fn test_item_holding_only_a_nested_list() {
        let item = ContentNode::ListItem(vec![ContentNode::UnorderedList(vec![ContentNode::text("deep")])]);
        assert_eq!(item.render(), "  • deep");
    }

    #[test]
    fn test_export_prefix_is_stripped_from_text_values() {
        let para = create_test_paragraph(&["Contentful - Apply for a loan", "today"]);
        assert_eq!(flatten_value(&para), "Apply for a loan today");
        assert_eq!(
            flatten_value(&create_test_text("About Contentful - the CMS")),
            "About Contentful - the CMS"
        );
    }

    #[test]
    fn test_table() {
        let cell = |text: &str| json!({ "nodeType": "table-cell", "content": [create_test_paragraph(&[text])] });
        let doc = json!([{
            "nodeType": "table",
            "content": [
                { "nodeType": "table-row", "content": [cell("Plan"), cell("Rate")] },
                { "nodeType": "table-row", "content": [cell("Basic"), cell("9%")] },
            ],
        }]);
        assert_eq!(flatten_value(&doc), "TABLE:\nPlan | Rate\nBasic | 9%");
    }

    #[test]
    fn test_hyperlink_drops_target() {
        let doc = json!([{
            "nodeType": "paragraph",
            "content": [
                create_test_text("Read the "),
                {
                    "nodeType": "hyperlink",
                    "data": { "uri": "https://example.com/guide" },
                    "content": [create_test_text("guide")],
                },
                create_test_text("."),
            ],
        }]);
        let text = flatten_value(&doc);
        assert_eq!(text, "Read the guide .");
        assert!(!text.contains("example.com"));
    }

    #[test]
    fn test_document_root_and_block_join() {
        let doc = json!({
            "nodeType": "document",
            "content": [
                create_test_paragraph(&["First"]),
                create_test_paragraph(&[""]),
                create_test_paragraph(&["Second"]),
            ],
        });
        assert_eq!(flatten_value(&doc), "First\n\nSecond");
    }

    #[test]
    fn test_unknown_node_falls_back_to_leaf_text() {
        let doc = json!([{
            "nodeType": "blockquote",
            "content": [create_test_paragraph(&["Quoted", "words"])],
        }]);
        assert_eq!(flatten_value(&doc), "Quoted words");
    }

    #[test]
    fn test_missing_type_tag_does_not_fail() {
        let doc = json!([
            { "content": [create_test_text("orphan text")] },
            create_test_paragraph(&["after"]),
        ]);
        let outcome = Flattener::new().flatten_value(&doc);
        assert_eq!(outcome.text, "orphan text\n\nafter");
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_non_list_children_are_opaque() {
        let doc = json!([{ "nodeType": "paragraph", "content": { "value": "nested" } }]);
        assert_eq!(flatten_value(&doc), "nested");
    }

    #[test]
    fn test_malformed_subtree_is_skipped_and_reported() {
        let doc = json!([
            create_test_paragraph(&["kept"]),
            42,
            { "nodeType": "paragraph", "content": [create_test_text("also"), null, create_test_text("kept")] },
        ]);
        let outcome = Flattener::new().flatten_value(&doc);

        assert_eq!(outcome.text, "kept\n\nalso kept");
        assert_eq!(outcome.diagnostics.len(), 2);
        assert!(outcome
            .diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::MalformedNode));
        assert!(outcome.diagnostics[0].message.contains("$[1]"));
    }

    #[test]
    fn test_malformed_table_row() {
        let doc = json!([{
            "nodeType": "table",
            "content": [
                "not a row",
                { "nodeType": "table-row", "content": ["x", "y"] },
            ],
        }]);
        let outcome = Flattener::new().flatten_value(&doc);
        assert_eq!(outcome.text, "TABLE:\nx | y");
        assert_eq!(outcome.diagnostics.len(), 1);
    }

    #[test]
    fn test_invalid_heading_level_is_opaque() {
        let doc = json!([{ "nodeType": "heading-9", "content": [create_test_text("Deep")] }]);
        assert_eq!(flatten_value(&doc), "Deep");
    }

    #[test]
    fn test_typed_nodes_render() {
        let nodes = vec![
            ContentNode::Heading { level: 1, children: vec![ContentNode::text("Title")] },
            ContentNode::UnorderedList(vec![
                ContentNode::ListItem(vec![ContentNode::paragraph(&["one"])]),
                ContentNode::ListItem(vec![ContentNode::paragraph(&["two"])]),
            ]),
        ];
        assert_eq!(flatten(&nodes), "\nTITLE\n\n\n• one\n• two");
    }
}
