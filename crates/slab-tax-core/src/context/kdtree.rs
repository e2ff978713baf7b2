use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ContextSearch;
use crate::error::SlabTaxError;
use crate::types::Rate;
use crate::SlabTaxResult;

/// A rate observed at a point in (income, param_1, .., param_k-1) space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextPoint {
    /// Income first, then the auxiliary parameters.
    pub coordinates: Vec<Decimal>,
    pub rate: Rate,
}

impl ContextPoint {
    pub fn new(coordinates: Vec<Decimal>, rate: Rate) -> Self {
        Self { coordinates, rate }
    }
}

#[derive(Debug, Clone)]
struct KdNode {
    point: ContextPoint,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// k-d tree over context points, stored as an arena of nodes.
///
/// Children are addressed by index into `nodes`; each node owns its point and no
/// node is referenced by more than one parent.
#[derive(Debug, Clone, Default)]
pub struct ContextRateIndex {
    nodes: Vec<KdNode>,
    root: Option<usize>,
    dimensions: usize,
}

impl ContextRateIndex {
    pub fn build(points: Vec<ContextPoint>) -> SlabTaxResult<Self> {
        let Some(first) = points.first() else {
            return Ok(Self::default());
        };
        let dimensions = first.coordinates.len();
        if dimensions == 0 {
            return Err(SlabTaxError::InvalidInput {
                field: "context_points[0].coordinates".into(),
                reason: "Context points need at least the income coordinate".into(),
            });
        }
        for (i, point) in points.iter().enumerate() {
            if point.coordinates.len() != dimensions {
                return Err(SlabTaxError::DimensionMismatch {
                    expected: dimensions,
                    actual: point.coordinates.len(),
                });
            }
            if point.rate < Decimal::ZERO || point.rate > Decimal::ONE {
                return Err(SlabTaxError::InvalidInput {
                    field: format!("context_points[{i}].rate"),
                    reason: "Rate must be between 0 and 1".into(),
                });
            }
        }

        let mut points = points;
        let mut nodes = Vec::with_capacity(points.len());
        let root = build_subtree(&mut nodes, &mut points, 0, dimensions);
        debug!(points = nodes.len(), dimensions, "built context rate index");
        Ok(Self {
            nodes,
            root,
            dimensions,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Closest stored point by Euclidean distance over the coordinates.
    pub fn nearest(&self, target: &[Decimal]) -> SlabTaxResult<Option<&ContextPoint>> {
        self.check_target(target)?;
        let mut best = None;
        self.search_exact(self.root, target, &mut best);
        Ok(best.map(|(idx, _)| &self.nodes[idx].point))
    }

    /// Follows the splitting planes toward `target` and never visits the sibling
    /// subtree, so the answer can miss a closer point across a plane.
    pub fn nearest_descent_only(
        &self,
        target: &[Decimal],
    ) -> SlabTaxResult<Option<&ContextPoint>> {
        self.check_target(target)?;
        Ok(self
            .search_descent(self.root, target)
            .map(|(idx, _)| &self.nodes[idx].point))
    }

    pub fn nearest_with(
        &self,
        target: &[Decimal],
        search: ContextSearch,
    ) -> SlabTaxResult<Option<&ContextPoint>> {
        match search {
            ContextSearch::Exact => self.nearest(target),
            ContextSearch::DescentOnly => self.nearest_descent_only(target),
        }
    }

    fn check_target(&self, target: &[Decimal]) -> SlabTaxResult<()> {
        if !self.is_empty() && target.len() != self.dimensions {
            return Err(SlabTaxError::DimensionMismatch {
                expected: self.dimensions,
                actual: target.len(),
            });
        }
        Ok(())
    }

    fn search_exact(
        &self,
        idx: Option<usize>,
        target: &[Decimal],
        best: &mut Option<(usize, Decimal)>,
    ) {
        let Some(i) = idx else {
            return;
        };
        let node = &self.nodes[i];
        let split = node.point.coordinates[node.axis];
        let (near, far) = if target[node.axis] < split {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        self.search_exact(near, target, best);

        let dist = squared_distance(&node.point.coordinates, target);
        if best.map_or(true, |(_, best_dist)| dist < best_dist) {
            *best = Some((i, dist));
        }

        let plane_dist = target[node.axis]
            .checked_sub(split)
            .and_then(|gap| gap.checked_mul(gap))
            .unwrap_or(Decimal::MAX);
        if best.map_or(true, |(_, best_dist)| plane_dist < best_dist) {
            self.search_exact(far, target, best);
        }
    }

    fn search_descent(&self, idx: Option<usize>, target: &[Decimal]) -> Option<(usize, Decimal)> {
        let i = idx?;
        let node = &self.nodes[i];
        let next = if target[node.axis] < node.point.coordinates[node.axis] {
            node.left
        } else {
            node.right
        };
        let here = squared_distance(&node.point.coordinates, target);
        match self.search_descent(next, target) {
            Some((below, dist)) if dist <= here => Some((below, dist)),
            _ => Some((i, here)),
        }
    }
}

fn build_subtree(
    nodes: &mut Vec<KdNode>,
    points: &mut [ContextPoint],
    depth: usize,
    dimensions: usize,
) -> Option<usize> {
    if points.is_empty() {
        return None;
    }
    let axis = depth % dimensions;
    let mid = points.len() / 2;
    points.select_nth_unstable_by(mid, |a, b| a.coordinates[axis].cmp(&b.coordinates[axis]));

    let (below, rest) = points.split_at_mut(mid);
    let (median, above) = rest.split_first_mut()?;

    let slot = nodes.len();
    nodes.push(KdNode {
        point: median.clone(),
        axis,
        left: None,
        right: None,
    });
    let left = build_subtree(nodes, below, depth + 1, dimensions);
    let right = build_subtree(nodes, above, depth + 1, dimensions);
    nodes[slot].left = left;
    nodes[slot].right = right;
    Some(slot)
}

/// Saturates at `Decimal::MAX` instead of overflowing.
fn squared_distance(a: &[Decimal], b: &[Decimal]) -> Decimal {
    a.iter()
        .zip(b)
        .try_fold(Decimal::ZERO, |acc, (x, y)| {
            x.checked_sub(*y)
                .and_then(|d| d.checked_mul(d))
                .and_then(|sq| acc.checked_add(sq))
        })
        .unwrap_or(Decimal::MAX)
}
