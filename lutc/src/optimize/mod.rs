//! Page-size selection.
//!
//! Every page size between the largest minimum and the largest maximum of a
//! table's parts is tried; the one yielding the fewest total pages wins, and
//! the smallest such size wins ties.

mod estimator;

use std::collections::BTreeMap;

pub use estimator::Estimator;

use crate::layout::LeafGeometry;
use crate::tree::{LutTree, NodeId, NodeKind};

/// Range of page sizes worth considering for a set of estimators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    /// Largest `min_size`: no smaller page can hold every part.
    pub min: usize,
    /// Largest `max_size`: no larger page reduces any part's page count.
    pub max: usize,
}

/// A chosen page size and the table size it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageChoice {
    pub page_size: u16,
    pub total_pages: usize,
}

/// Bounds of the page-size search space.
#[must_use]
pub fn get_bounds(estimators: &[Estimator]) -> Bounds {
    Bounds {
        min: estimators.iter().map(Estimator::min_size).max().unwrap_or(0),
        max: estimators.iter().map(Estimator::max_size).max().unwrap_or(0),
    }
}

/// Sum of every estimator's page count at `page_size`, or `None` if any part
/// does not fit.
#[must_use]
pub fn total_pages(estimators: &[Estimator], page_size: usize) -> Option<usize> {
    estimators
        .iter()
        .map(|estimator| estimator.page_count(page_size))
        .sum()
}

/// Pick the page size that minimizes the total page count.
///
/// Returns `None` if even the smallest valid page size does not fit the
/// 16-bit page size field.
#[must_use]
pub fn optimize(estimators: &[Estimator]) -> Option<PageChoice> {
    let bounds = get_bounds(estimators);
    let ceiling = usize::from(u16::MAX);
    if bounds.min > ceiling {
        return None;
    }
    let upper = bounds.max.max(bounds.min).min(ceiling);

    // Tables repeat the same few part shapes many times over.
    let mut counts: BTreeMap<Estimator, usize> = BTreeMap::new();
    for &estimator in estimators {
        *counts.entry(estimator).or_default() += 1;
    }
    let groups: Vec<(Estimator, usize)> = counts.into_iter().collect();

    let mut best: Option<PageChoice> = None;
    for candidate in bounds.min..=upper {
        let Some(total) = grouped_total_pages(&groups, candidate) else {
            continue;
        };
        if best.is_none_or(|b| total < b.total_pages) {
            best = Some(PageChoice {
                page_size: u16::try_from(candidate).ok()?,
                total_pages: total,
            });
        }
    }

    if let Some(choice) = best {
        tracing::debug!(
            min = bounds.min,
            max = bounds.max,
            distinct = groups.len(),
            page_size = choice.page_size,
            total_pages = choice.total_pages,
            "page size search finished"
        );
    }
    best
}

fn grouped_total_pages(groups: &[(Estimator, usize)], page_size: usize) -> Option<usize> {
    groups
        .iter()
        .map(|&(estimator, count)| estimator.page_count(page_size).map(|pages| pages * count))
        .sum()
}

/// Derive the estimators for a tree: the global header, one level header per
/// root or index node, and one leaf group per structure node.
///
/// Structure groups are sized by their first leaf's payload; mixed payload
/// sizes are rejected before estimation.
#[must_use]
pub fn build_estimators(tree: &LutTree) -> Vec<Estimator> {
    let shape = tree.shape();
    let mut estimators = vec![Estimator::GlobalHeader {
        levels: shape.height(),
    }];

    let mut stack: Vec<NodeId> = vec![LutTree::ROOT];
    while let Some(id) = stack.pop() {
        let node = tree.node(id);
        match node.kind() {
            NodeKind::Root | NodeKind::Index => {
                estimators.push(Estimator::LevelHeader {
                    key_width: shape.width(node.depth()),
                    child_count: node.children().len(),
                });
                stack.extend(node.children().iter().rev());
            }
            NodeKind::Structure => {
                let payload_len = node
                    .children()
                    .first()
                    .and_then(|&leaf| tree.record(leaf))
                    .map_or(0, |record| record.payload.len());
                estimators.push(Estimator::LeafGroup {
                    entry_size: LeafGeometry::entry_size(shape.discriminator_width(), payload_len),
                    entry_count: node.children().len(),
                });
            }
            NodeKind::Leaf { .. } => {}
        }
    }
    estimators
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Key, KeyShape, Record};

    fn scenario_tree() -> LutTree {
        let w = [4, 4];
        let shape = KeyShape::new(w.to_vec()).expect("valid shape");
        let records = [(1, 0x0A, 0x11), (1, 0x0B, 0x22), (2, 0x0A, 0x33)]
            .into_iter()
            .map(|(s, d, p)| {
                Record::new(vec![Key::from_uint(s, 4), Key::from_uint(d, 4)], vec![p], 0)
            });
        LutTree::from_records(shape, records).expect("build")
    }

    #[test]
    fn test_build_estimators_for_scenario() {
        let estimators = build_estimators(&scenario_tree());
        assert_eq!(
            estimators,
            vec![
                Estimator::GlobalHeader { levels: 2 },
                Estimator::LevelHeader {
                    key_width: 4,
                    child_count: 2
                },
                Estimator::LeafGroup {
                    entry_size: 6,
                    entry_count: 2
                },
                Estimator::LeafGroup {
                    entry_size: 6,
                    entry_count: 1
                },
            ]
        );
        assert_eq!(get_bounds(&estimators), Bounds { min: 16, max: 22 });
    }

    #[test]
    fn test_optimize_scenario() {
        let estimators = build_estimators(&scenario_tree());
        // At 16 bytes the header wraps to two pages; from 22 on it fits one.
        assert_eq!(total_pages(&estimators, 16), Some(5));
        assert_eq!(
            optimize(&estimators),
            Some(PageChoice {
                page_size: 22,
                total_pages: 4
            })
        );
    }

    #[test]
    fn test_total_pages_invalid_below_any_min() {
        let estimators = build_estimators(&scenario_tree());
        assert_eq!(total_pages(&estimators, 15), None);
    }

    #[test]
    fn test_optimize_stays_within_bounds() {
        let sets = [
            vec![Estimator::GlobalHeader { levels: 3 }],
            vec![
                Estimator::GlobalHeader { levels: 2 },
                Estimator::LevelHeader {
                    key_width: 1,
                    child_count: 0,
                },
            ],
            vec![
                Estimator::GlobalHeader { levels: 4 },
                Estimator::LevelHeader {
                    key_width: 2,
                    child_count: 90,
                },
                Estimator::LeafGroup {
                    entry_size: 40,
                    entry_count: 7,
                },
                Estimator::LeafGroup {
                    entry_size: 3,
                    entry_count: 300,
                },
            ],
        ];
        for estimators in sets {
            let bounds = get_bounds(&estimators);
            let choice = optimize(&estimators).expect("representable");
            let size = usize::from(choice.page_size);
            assert!(size >= bounds.min, "{estimators:?}");
            assert!(size <= bounds.max.max(bounds.min), "{estimators:?}");
            assert_eq!(total_pages(&estimators, size), Some(choice.total_pages));
        }
    }

    #[test]
    fn test_optimize_first_minimum_wins() {
        // Both parts fit one page from their minimum on, so the minimum wins.
        let estimators = [
            Estimator::GlobalHeader { levels: 2 },
            Estimator::LeafGroup {
                entry_size: 4,
                entry_count: 1,
            },
        ];
        assert_eq!(optimize(&estimators).map(|c| c.page_size), Some(6));
    }

    #[test]
    fn test_optimize_matches_scan_over_every_size() {
        let mut estimators = vec![Estimator::GlobalHeader { levels: 3 }];
        for count in [1, 1, 2, 5, 5, 5, 9] {
            estimators.push(Estimator::LeafGroup {
                entry_size: 4,
                entry_count: count,
            });
        }
        estimators.push(Estimator::LevelHeader {
            key_width: 2,
            child_count: 7,
        });

        let bounds = get_bounds(&estimators);
        let mut expected: Option<(usize, usize)> = None;
        for size in bounds.min..=bounds.max {
            let total = total_pages(&estimators, size).expect("within bounds");
            if expected.is_none_or(|(_, best)| total < best) {
                expected = Some((size, total));
            }
        }

        let choice = optimize(&estimators).expect("representable");
        assert_eq!(
            Some((usize::from(choice.page_size), choice.total_pages)),
            expected
        );
    }

    #[test]
    fn test_optimize_rejects_unrepresentable_page() {
        let estimators = [Estimator::LeafGroup {
            entry_size: 70_000,
            entry_count: 1,
        }];
        assert_eq!(optimize(&estimators), None);
    }
}
