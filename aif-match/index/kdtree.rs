use super::{push_neighbor, Neighbor};

const LEAF_SIZE: usize = 8;

#[derive(Debug, Clone)]
enum Node {
    Leaf { start: usize, end: usize },
    Split { dim: usize, value: f32, left: usize, right: usize },
}

/// Exact k-d tree over `f32` rows with Euclidean distance.
///
/// Nodes split at the median of the dimension with the largest spread;
/// buckets of at most `LEAF_SIZE` rows are scanned linearly.
#[derive(Debug, Clone)]
pub struct KdTree {
    data: Vec<f32>,
    dim: usize,
    order: Vec<usize>,
    nodes: Vec<Node>,
}

impl KdTree {
    /// Build over row-major `data` with `dim` values per row
    pub fn new(data: &[f32], dim: usize) -> Self {
        let rows = if dim == 0 { 0 } else { data.len() / dim };
        let mut tree = Self {
            data: data.to_vec(),
            dim,
            order: (0..rows).collect(),
            nodes: Vec::new(),
        };
        if rows > 0 {
            tree.build(0, rows);
        }
        tree
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    fn build(&mut self, start: usize, end: usize) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { start, end });
        if end - start <= LEAF_SIZE {
            return id;
        }

        let (dim, spread) = self.widest_dimension(start, end);
        if spread <= 0.0 {
            return id;
        }

        let mid = start + (end - start) / 2;
        let (data, d) = (&self.data, self.dim);
        self.order[start..end].select_nth_unstable_by(mid - start, |&a, &b| {
            data[a * d + dim]
                .partial_cmp(&data[b * d + dim])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let value = self.data[self.order[mid] * d + dim];

        let left = self.build(start, mid);
        let right = self.build(mid, end);
        self.nodes[id] = Node::Split { dim, value, left, right };
        id
    }

    fn widest_dimension(&self, start: usize, end: usize) -> (usize, f32) {
        (0..self.dim)
            .map(|k| {
                let (lo, hi) = self.order[start..end].iter().fold(
                    (f32::INFINITY, f32::NEG_INFINITY),
                    |(lo, hi), &i| {
                        let v = self.data[i * self.dim + k];
                        (lo.min(v), hi.max(v))
                    },
                );
                (k, hi - lo)
            })
            .fold((0, f32::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best })
    }

    /// `k` nearest rows to `query`, closest first; ties go to the lower row index
    pub fn knn(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        let mut best: Vec<Neighbor> = Vec::with_capacity(k + 1);
        if !self.nodes.is_empty() && k > 0 {
            self.search(0, query, k, &mut best);
        }
        for n in best.iter_mut() {
            n.distance = n.distance.sqrt();
        }
        best
    }

    // Distances in `best` are squared until the search finishes
    fn search(&self, node: usize, query: &[f32], k: usize, best: &mut Vec<Neighbor>) {
        match self.nodes[node] {
            Node::Leaf { start, end } => {
                for &i in &self.order[start..end] {
                    let d2 = squared_l2(self.row(i), query);
                    push_neighbor(best, k, Neighbor { index: i, distance: d2 });
                }
            }
            Node::Split { dim, value, left, right } => {
                let diff = query[dim] - value;
                let (near, far) = if diff < 0.0 { (left, right) } else { (right, left) };
                self.search(near, query, k, best);
                let worst = if best.len() < k { f32::INFINITY } else { best[k - 1].distance };
                if diff * diff <= worst {
                    self.search(far, query, k, best);
                }
            }
        }
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn brute_force(data: &[f32], dim: usize, query: &[f32], k: usize) -> Vec<Neighbor> {
        let mut all: Vec<Neighbor> = data
            .chunks(dim)
            .enumerate()
            .map(|(index, row)| Neighbor { index, distance: squared_l2(row, query).sqrt() })
            .collect();
        all.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap().then(a.index.cmp(&b.index)));
        all.truncate(k);
        all
    }

    #[test]
    fn test_exact_distances() {
        let tree = KdTree::new(&[0.0, 7.0, 10.0], 1);
        let found = tree.knn(&[3.0], 2);
        assert_eq!(found[0], Neighbor { index: 0, distance: 3.0 });
        assert_eq!(found[1], Neighbor { index: 1, distance: 4.0 });
    }

    #[test]
    fn test_duplicates_tie_on_index() {
        let data = vec![1.0f32; 40];
        let tree = KdTree::new(&data, 2);
        let found = tree.knn(&[1.0, 1.0], 2);
        assert_eq!(found.iter().map(|n| n.index).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::new(&[], 4);
        assert!(tree.is_empty());
        assert!(tree.knn(&[0.0; 4], 2).is_empty());
    }

    proptest! {
        #[test]
        fn prop_matches_brute_force(
            data in proptest::collection::vec(-100i32..100, 3..300),
            query in proptest::collection::vec(-100i32..100, 3),
        ) {
            let dim = 3;
            let data: Vec<f32> = data[..data.len() / dim * dim].iter().map(|&v| v as f32).collect();
            let query: Vec<f32> = query.iter().map(|&v| v as f32).collect();
            let tree = KdTree::new(&data, dim);
            let found = tree.knn(&query, 2);
            let expected = brute_force(&data, dim, &query, 2);
            prop_assert_eq!(found.len(), expected.len());
            for (f, e) in found.iter().zip(&expected) {
                prop_assert!((f.distance - e.distance).abs() < 1e-4);
            }
        }
    }
}
