use crate::model::ledger::{Ledger, LedgerNode, ParseIssue, SectionItem, SectionKind};
use crate::parse::task_parser::parse_block;

/// Parser position at file level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Title, prose, unknown sections: kept as literal text
    Preamble,
    /// Inside `## Active Tasks` or `## Completed Tasks`
    InSection,
}

/// Parse a monthly ledger from its source text.
///
/// Never fails: anything unrecognized is kept verbatim and reported in
/// `issues`, so `serialize_ledger(parse_ledger(s)) == s` for any input.
pub fn parse_ledger(source: &str) -> Ledger {
    let lines: Vec<String> = source.split('\n').map(|l| l.to_string()).collect();
    let mut nodes: Vec<LedgerNode> = Vec::new();
    let mut issues: Vec<ParseIssue> = Vec::new();
    let mut title = String::new();

    let mut state = State::Preamble;
    let mut literal_buf: Vec<String> = Vec::new();
    // Current section under construction
    let mut section: Option<(SectionKind, String, Vec<SectionItem>)> = None;
    let mut chunk: Vec<String> = Vec::new();
    let mut chunk_start = 0;

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_end();

        if let Some(name) = trimmed.strip_prefix("## ") {
            close_section(&mut section, &mut chunk, chunk_start, &mut nodes, &mut issues);
            match SectionKind::from_name(name) {
                Some(kind) => {
                    flush_literal(&mut literal_buf, &mut nodes);
                    if nodes
                        .iter()
                        .any(|n| matches!(n, LedgerNode::Section { kind: k, .. } if *k == kind))
                    {
                        issues.push(ParseIssue::new(
                            idx + 1,
                            format!("duplicate {} section; tasks here are not used", kind),
                        ));
                    }
                    section = Some((kind, line.clone(), Vec::new()));
                    chunk_start = idx + 1;
                    state = State::InSection;
                }
                None => {
                    literal_buf.push(line.clone());
                    state = State::Preamble;
                }
            }
            continue;
        }

        if trimmed.starts_with("# ") {
            close_section(&mut section, &mut chunk, chunk_start, &mut nodes, &mut issues);
            if title.is_empty() {
                title = trimmed[2..].trim().to_string();
            }
            literal_buf.push(line.clone());
            state = State::Preamble;
            continue;
        }

        match state {
            State::Preamble => literal_buf.push(line.clone()),
            State::InSection => {
                if trimmed.trim_start() == "---" {
                    if let Some((_, _, items)) = section.as_mut() {
                        push_chunk(items, &mut chunk, chunk_start, &mut issues);
                        items.push(SectionItem::Delimiter(line.clone()));
                    }
                    chunk_start = idx + 1;
                } else {
                    chunk.push(line.clone());
                }
            }
        }
    }

    close_section(&mut section, &mut chunk, chunk_start, &mut nodes, &mut issues);
    flush_literal(&mut literal_buf, &mut nodes);

    Ledger {
        title,
        nodes,
        issues,
    }
}

fn push_chunk(
    items: &mut Vec<SectionItem>,
    chunk: &mut Vec<String>,
    chunk_start: usize,
    issues: &mut Vec<ParseIssue>,
) {
    if chunk.is_empty() {
        return;
    }
    let (block, mut block_issues) = parse_block(chunk, chunk_start);
    issues.append(&mut block_issues);
    items.push(SectionItem::Block(block));
    chunk.clear();
}

fn close_section(
    section: &mut Option<(SectionKind, String, Vec<SectionItem>)>,
    chunk: &mut Vec<String>,
    chunk_start: usize,
    nodes: &mut Vec<LedgerNode>,
    issues: &mut Vec<ParseIssue>,
) {
    if let Some((kind, header_line, mut items)) = section.take() {
        push_chunk(&mut items, chunk, chunk_start, issues);
        nodes.push(LedgerNode::Section {
            kind,
            header_line,
            items,
        });
    }
}

fn flush_literal(buf: &mut Vec<String>, nodes: &mut Vec<LedgerNode>) {
    if !buf.is_empty() {
        nodes.push(LedgerNode::Literal(std::mem::take(buf)));
    }
}
