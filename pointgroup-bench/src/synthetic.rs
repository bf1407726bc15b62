use pointgroup_core::{PointMask, Proposal};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Synthetic scan: overlapping proposals over a line of points
pub struct SyntheticScan {
    pub num_points: usize,
    pub proposals: Vec<Proposal>,
    /// Ground-truth ids, one instance per block of `num_points / instances`
    pub gt_ids: Vec<u32>,
}

impl SyntheticScan {
    pub fn generate(seed: u64, num_points: usize, num_proposals: usize, instances: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let instances = instances.max(1);
        let block = (num_points / instances).max(1);

        let proposals = (0..num_proposals)
            .map(|_| {
                // jittered copy of one ground-truth block
                let inst = rng.gen_range(0..instances);
                let jitter = block / 4 + 1;
                let start = (inst * block).saturating_sub(rng.gen_range(0..jitter));
                let end = ((inst + 1) * block + rng.gen_range(0..jitter)).min(num_points);
                let mut mask = PointMask::new(num_points);
                for i in start..end {
                    mask.insert(i);
                }
                Proposal::new(mask, rng.gen_range(0.0..1.0), 5)
            })
            .collect();

        let gt_ids = (0..num_points)
            .map(|i| 5000 + ((i / block).min(instances - 1) as u32 + 1))
            .collect();

        Self {
            num_points,
            proposals,
            gt_ids,
        }
    }
}
