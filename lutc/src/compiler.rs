//! The compilation pipeline.
//!
//! `compile` goes records → tree → validation gates → estimators → page size
//! → serializer → reachability check. Every gate runs before any byte of
//! output exists, and each reports all of its violations at once.

use std::collections::BTreeSet;

use crate::config::{LutConfig, PageSizeMode};
use crate::duplicates::find_duplicates;
use crate::error::{CompileError, PayloadSizes, ShapeMismatch};
use crate::layout::{LutReader, LutWriter};
use crate::optimize::{self, PageChoice, build_estimators, get_bounds, total_pages};
use crate::record::{KeyShape, Record, encode_object};
use crate::tree::LutTree;

/// A serialized table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledLut {
    pub bytes: Vec<u8>,
    pub page_size: u16,
    pub page_count: usize,
}

/// Compile records into a table.
///
/// # Errors
///
/// Fails on the first gate with violations: key shape, duplicate paths,
/// sentinel keys, mixed payload sizes, then page size.
pub fn compile(records: Vec<Record>, config: &LutConfig) -> Result<CompiledLut, CompileError> {
    let shape = &config.shape;
    check_shapes(&records, shape)?;

    let tree = LutTree::from_records(shape.clone(), records)
        .map_err(|mismatch| {
            CompileError::KeyWidthMismatch(vec![ShapeMismatch {
                index: 0,
                path: None,
                mismatch,
            }])
        })?;
    tracing::debug!(
        records = tree.len(),
        nodes = tree.node_count(),
        "key tree built"
    );

    let duplicates = find_duplicates(&tree);
    if !duplicates.is_empty() {
        return Err(CompileError::DuplicateKey(duplicates));
    }
    check_sentinels(&tree)?;
    check_payload_sizes(&tree)?;

    let estimators = build_estimators(&tree);
    let bounds = get_bounds(&estimators);
    tracing::debug!(
        estimators = estimators.len(),
        min = bounds.min,
        max = bounds.max,
        "page size bounds"
    );

    let choice = match config.page_size {
        PageSizeMode::Auto => optimize::optimize(&estimators).ok_or_else(|| {
            CompileError::TableTooLarge(format!(
                "the smallest valid page size is {} bytes, above the 16-bit limit",
                bounds.min
            ))
        })?,
        PageSizeMode::Fixed(page_size) => {
            let total = total_pages(&estimators, usize::from(page_size)).ok_or(
                CompileError::PageSizeTooSmall {
                    page_size,
                    required: bounds.min,
                },
            )?;
            // Finding the optimum costs a full search; only debug runs pay for it.
            let better = tracing::enabled!(tracing::Level::DEBUG)
                .then(|| optimize::optimize(&estimators))
                .flatten()
                .filter(|best| best.total_pages < total);
            if let Some(best) = better {
                tracing::debug!(
                    page_size,
                    pages = total,
                    best_page_size = best.page_size,
                    best_pages = best.total_pages,
                    "fixed page size uses more pages than necessary"
                );
            }
            PageChoice {
                page_size,
                total_pages: total,
            }
        }
    };

    let bytes = LutWriter::new(&tree, choice.page_size).write()?;
    let page_count = bytes.len() / usize::from(choice.page_size);
    debug_assert_eq!(page_count, choice.total_pages, "estimate disagrees with layout");

    verify_reachable(&tree, &bytes)?;
    tracing::info!(
        page_size = choice.page_size,
        pages = page_count,
        bytes = bytes.len(),
        "table compiled"
    );

    Ok(CompiledLut {
        bytes,
        page_size: choice.page_size,
        page_count,
    })
}

/// Encode each record as a compiled object, validating shapes first.
///
/// # Errors
///
/// Fails if any record does not match `shape` or does not fit the object
/// format.
pub fn compile_objects(records: &[Record], shape: &KeyShape) -> Result<Vec<Vec<u8>>, CompileError> {
    check_shapes(records, shape)?;
    records
        .iter()
        .map(|record| {
            encode_object(record)
                .map_err(|source| CompileError::MalformedObject { path: None, source })
        })
        .collect()
}

fn check_shapes(records: &[Record], shape: &KeyShape) -> Result<(), CompileError> {
    let mismatches: Vec<_> = records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            shape.validate(record).err().map(|mismatch| ShapeMismatch {
                index,
                path: None,
                mismatch,
            })
        })
        .collect();
    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(CompileError::KeyWidthMismatch(mismatches))
    }
}

/// Reject index and structure keys that a reader would take for the
/// end-of-header sentinel. Discriminators are exempt.
fn check_sentinels(tree: &LutTree) -> Result<(), CompileError> {
    let structure_level = tree.shape().structure_level();
    let mut paths = BTreeSet::new();
    for record in tree.records() {
        let mut prefix = Vec::new();
        for key in &record.keys[..=structure_level] {
            prefix.extend_from_slice(key.as_bytes());
            if key.is_sentinel() {
                paths.insert(prefix.clone());
                break;
            }
        }
    }
    if paths.is_empty() {
        Ok(())
    } else {
        Err(CompileError::SentinelKey(paths))
    }
}

fn check_payload_sizes(tree: &LutTree) -> Result<(), CompileError> {
    let mut groups = Vec::new();
    for structure in tree.structure_nodes() {
        let sizes: BTreeSet<usize> = tree
            .children(structure)
            .iter()
            .filter_map(|&leaf| tree.record(leaf))
            .map(|record| record.payload.len())
            .collect();
        if sizes.len() > 1 {
            groups.push(PayloadSizes {
                path: tree.full_path(structure),
                sizes,
            });
        }
    }
    if groups.is_empty() {
        Ok(())
    } else {
        Err(CompileError::PayloadSizeMismatch(groups))
    }
}

/// Look every record up through the reader and compare what comes back.
fn verify_reachable(tree: &LutTree, bytes: &[u8]) -> Result<(), CompileError> {
    let reader = LutReader::open(bytes).map_err(|e| CompileError::Unreachable {
        path: Vec::new(),
        reason: e.to_string(),
    })?;

    for record in tree.records() {
        let path = record.full_path();
        let found = reader
            .lookup(&record.keys, record.payload.len())
            .map_err(|e| CompileError::Unreachable {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        let reason = match found {
            None => "lookup found nothing",
            Some(entry) if entry.payload != record.payload.as_slice() => "payload differs",
            Some(entry) if entry.checksum != record.checksum => "checksum differs",
            Some(_) => continue,
        };
        return Err(CompileError::Unreachable {
            path,
            reason: reason.to_string(),
        });
    }
    tracing::debug!(records = tree.len(), "every record reachable");
    Ok(())
}
