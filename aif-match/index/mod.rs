//! Nearest-neighbour indices over reference descriptor rows

mod kdtree;
mod lsh;

pub use kdtree::KdTree;
pub use lsh::{hamming_distance, LshIndex, KEY_BITS, TABLE_COUNT};

use aif_core::{DescriptorMatrix, DistanceMetric};
use rayon::prelude::*;

use crate::error::{MatchError, MatchResult};

/// Reference row and its distance to a query row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

/// Insert into a list kept sorted by `(distance, index)` and capped at `k`
pub(crate) fn push_neighbor(best: &mut Vec<Neighbor>, k: usize, candidate: Neighbor) {
    let pos = best.partition_point(|n| {
        n.distance < candidate.distance
            || (n.distance == candidate.distance && n.index < candidate.index)
    });
    if pos < k {
        best.insert(pos, candidate);
        best.truncate(k);
    }
}

/// Index chosen by the reference descriptors' metric
#[derive(Debug, Clone)]
pub enum DescriptorIndex {
    KdTree(KdTree),
    Lsh(LshIndex),
}

impl DescriptorIndex {
    /// Build an index for `metric`. An empty matrix gives an empty index.
    pub fn build(descriptors: &DescriptorMatrix, metric: DistanceMetric) -> MatchResult<Self> {
        let mismatch = || MatchError::MetricTypeMismatch {
            metric,
            actual: descriptors.element_type(),
        };
        match metric {
            DistanceMetric::L2 => {
                let data = match descriptors.element_type() {
                    None => &[][..],
                    Some(_) => descriptors.as_f32().ok_or_else(mismatch)?,
                };
                Ok(DescriptorIndex::KdTree(KdTree::new(data, descriptors.cols())))
            }
            DistanceMetric::Hamming => {
                let data = match descriptors.element_type() {
                    None => &[][..],
                    Some(_) => descriptors.as_u8().ok_or_else(mismatch)?,
                };
                Ok(DescriptorIndex::Lsh(LshIndex::new(data, descriptors.cols())))
            }
        }
    }

    /// Build from a metric name such as `"L2"` or `"NORM_HAMMING"`
    pub fn build_named(descriptors: &DescriptorMatrix, metric: &str) -> MatchResult<Self> {
        let metric: DistanceMetric = metric.parse()?;
        Self::build(descriptors, metric)
    }

    pub fn metric(&self) -> DistanceMetric {
        match self {
            DescriptorIndex::KdTree(_) => DistanceMetric::L2,
            DescriptorIndex::Lsh(_) => DistanceMetric::Hamming,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DescriptorIndex::KdTree(tree) => tree.len(),
            DescriptorIndex::Lsh(lsh) => lsh.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `k` neighbours for every query row, in query row order.
    ///
    /// The caller checks that `query` has the reference width and element type.
    pub fn knn(&self, query: &DescriptorMatrix, k: usize) -> Vec<Vec<Neighbor>> {
        match self {
            DescriptorIndex::KdTree(tree) => (0..query.rows())
                .into_par_iter()
                .map(|i| query.row_f32(i).map(|row| tree.knn(row, k)).unwrap_or_default())
                .collect(),
            DescriptorIndex::Lsh(lsh) => (0..query.rows())
                .into_par_iter()
                .map(|i| query.row_u8(i).map(|row| lsh.knn(row, k)).unwrap_or_default())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_neighbor_keeps_order() {
        let mut best = Vec::new();
        for (index, distance) in [(3, 5.0), (1, 2.0), (2, 2.0), (0, 9.0)] {
            push_neighbor(&mut best, 2, Neighbor { index, distance });
        }
        assert_eq!(
            best,
            vec![Neighbor { index: 1, distance: 2.0 }, Neighbor { index: 2, distance: 2.0 }]
        );
    }

    #[test]
    fn test_build_checks_element_type() {
        let bytes = DescriptorMatrix::from_u8(2, vec![1, 2, 3, 4]).unwrap();
        assert!(matches!(
            DescriptorIndex::build(&bytes, DistanceMetric::L2),
            Err(MatchError::MetricTypeMismatch { .. })
        ));
        let index = DescriptorIndex::build_named(&bytes, "NORM_HAMMING").unwrap();
        assert_eq!(index.metric(), DistanceMetric::Hamming);
        assert_eq!(index.len(), 2);
        assert!(matches!(
            DescriptorIndex::build_named(&bytes, "cosine"),
            Err(MatchError::UnknownMetric(_))
        ));
    }

    #[test]
    fn test_empty_reference() {
        let index = DescriptorIndex::build(&DescriptorMatrix::empty(), DistanceMetric::L2).unwrap();
        assert!(index.is_empty());
        let query = DescriptorMatrix::from_f32(2, vec![1.0, 2.0]).unwrap();
        assert_eq!(index.knn(&query, 2), vec![Vec::<Neighbor>::new()]);
    }
}
