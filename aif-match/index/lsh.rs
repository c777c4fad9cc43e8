use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{push_neighbor, Neighbor};

pub const TABLE_COUNT: usize = 6;
pub const KEY_BITS: usize = 12;
const TABLE_SEED: u64 = 0x5eed_15b0;

#[derive(Debug, Clone)]
struct LshTable {
    bits: Vec<usize>,
    buckets: HashMap<u32, Vec<usize>>,
}

impl LshTable {
    fn key(&self, row: &[u8]) -> u32 {
        self.bits.iter().enumerate().fold(0u32, |key, (j, &bit)| {
            if row[bit / 8] >> (bit % 8) & 1 == 1 {
                key | (1 << j)
            } else {
                key
            }
        })
    }
}

/// Locality sensitive hashing over packed binary rows.
///
/// Each table keys rows on a fixed random subset of bits. Queries probe
/// their own bucket and every bucket one bit flip away, then rank the
/// candidates by exact Hamming distance.
#[derive(Debug, Clone)]
pub struct LshIndex {
    data: Vec<u8>,
    cols: usize,
    tables: Vec<LshTable>,
}

impl LshIndex {
    pub fn new(data: &[u8], cols: usize) -> Self {
        let rows = if cols == 0 { 0 } else { data.len() / cols };
        let total_bits = cols * 8;
        let key_bits = KEY_BITS.min(total_bits);
        let mut rng = StdRng::seed_from_u64(TABLE_SEED);

        let tables = (0..TABLE_COUNT)
            .map(|_| {
                let mut table = LshTable {
                    bits: rand::seq::index::sample(&mut rng, total_bits, key_bits).into_vec(),
                    buckets: HashMap::new(),
                };
                for i in 0..rows {
                    let key = table.key(&data[i * cols..(i + 1) * cols]);
                    table.buckets.entry(key).or_default().push(i);
                }
                table
            })
            .collect();

        Self { data: data.to_vec(), cols, tables }
    }

    pub fn len(&self) -> usize {
        if self.cols == 0 {
            0
        } else {
            self.data.len() / self.cols
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `k` nearest candidates, closest first; ties go to the lower row index
    pub fn knn(&self, query: &[u8], k: usize) -> Vec<Neighbor> {
        let mut candidates = Vec::new();
        for table in &self.tables {
            let key = table.key(query);
            let probes = std::iter::once(key).chain((0..table.bits.len()).map(|j| key ^ (1 << j)));
            for probe in probes {
                if let Some(rows) = table.buckets.get(&probe) {
                    candidates.extend_from_slice(rows);
                }
            }
        }
        candidates.sort_unstable();
        candidates.dedup();

        let mut best = Vec::with_capacity(k + 1);
        for i in candidates {
            let row = &self.data[i * self.cols..(i + 1) * self.cols];
            let distance = hamming_distance(row, query) as f32;
            push_neighbor(&mut best, k, Neighbor { index: i, distance });
        }
        best
    }
}

/// Number of differing bits between two packed rows
pub fn hamming_distance(a: &[u8], b: &[u8]) -> u32 {
    a.iter().zip(b).map(|(&x, &y)| (x ^ y).count_ones()).sum()
}
