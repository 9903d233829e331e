use crate::model::ledger::{Ledger, LedgerBlock, LedgerNode, Month, SectionItem};
use crate::parse::ledger_parser::parse_ledger;
use crate::parse::task_serializer::serialize_block;

/// Serialize a ledger back to text. Untouched blocks are emitted verbatim.
pub fn serialize_ledger(ledger: &Ledger) -> String {
    let mut lines: Vec<String> = Vec::new();

    for node in &ledger.nodes {
        match node {
            LedgerNode::Literal(text) => lines.extend(text.iter().cloned()),
            LedgerNode::Section {
                header_line, items, ..
            } => {
                lines.push(header_line.clone());
                for item in items {
                    match item {
                        SectionItem::Delimiter(d) => lines.push(d.clone()),
                        SectionItem::Block(LedgerBlock::Raw(raw)) => {
                            lines.extend(raw.iter().cloned())
                        }
                        SectionItem::Block(LedgerBlock::Task(task)) => {
                            lines.extend(serialize_block(task))
                        }
                    }
                }
            }
        }
    }

    lines.join("\n")
}

/// Text of a fresh ledger with both sections and no tasks
pub fn empty_ledger_text(project_name: &str, month: Month) -> String {
    format!(
        "# {} - {}\n\n## Active Tasks\n\n---\n\n## Completed Tasks\n\n---\n",
        project_name,
        month.long_name()
    )
}

/// A fresh, parsed ledger for a project and month
pub fn empty_ledger(project_name: &str, month: Month) -> Ledger {
    parse_ledger(&empty_ledger_text(project_name, month))
}
