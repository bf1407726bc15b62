//! Per-point membership masks

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

const WORD_BITS: usize = 64;

/// Fixed-length bitset over the points of one scan
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointMask {
    len: usize,
    words: Vec<u64>,
}

impl PointMask {
    /// Empty mask over `len` points
    pub fn new(len: usize) -> Self {
        Self {
            len,
            words: vec![0; len.div_ceil(WORD_BITS)],
        }
    }

    /// Mask with the given point indices set
    pub fn from_indices<I>(len: usize, indices: I) -> Result<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut mask = Self::new(len);
        for idx in indices {
            if idx >= len {
                return Err(Error::InvalidData(format!(
                    "point index {} out of range for {} points",
                    idx, len
                )));
            }
            mask.insert(idx);
        }
        Ok(mask)
    }

    /// Mask from a dense `0`/non-zero vector
    pub fn from_values<T>(values: &[T]) -> Self
    where
        T: Copy + PartialEq + Default,
    {
        let zero = T::default();
        let mut mask = Self::new(values.len());
        for (i, v) in values.iter().enumerate() {
            if *v != zero {
                mask.insert(i);
            }
        }
        mask
    }

    pub fn from_bools(values: &[bool]) -> Self {
        Self::from_values(values)
    }

    /// Number of points the mask ranges over
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Panics if `idx` is out of range.
    pub fn insert(&mut self, idx: usize) {
        assert!(idx < self.len, "index {} out of range for {}", idx, self.len);
        self.words[idx / WORD_BITS] |= 1u64 << (idx % WORD_BITS);
    }

    pub fn contains(&self, idx: usize) -> bool {
        idx < self.len && self.words[idx / WORD_BITS] & (1u64 << (idx % WORD_BITS)) != 0
    }

    /// Number of set points
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Number of points set in both masks.
    ///
    /// Masks over different point counts only share their common prefix.
    pub fn intersection_count(&self, other: &PointMask) -> usize {
        self.words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| (a & b).count_ones() as usize)
            .sum()
    }

    /// Intersection-over-union of two masks; two empty masks have IoU 0.
    pub fn iou(&self, other: &PointMask) -> f32 {
        let inter = self.intersection_count(other);
        let union = self.count() + other.count() - inter;
        if union == 0 {
            return 0.0;
        }
        inter as f32 / union as f32
    }

    /// Indices of set points in ascending order
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &word)| {
            let mut w = word;
            std::iter::from_fn(move || {
                if w == 0 {
                    return None;
                }
                let bit = w.trailing_zeros() as usize;
                w &= w - 1;
                Some(wi * WORD_BITS + bit)
            })
        })
    }

    /// Dense `0`/`1` representation
    pub fn to_values(&self) -> Vec<u8> {
        (0..self.len).map(|i| self.contains(i) as u8).collect()
    }

    /// Points set in `self` and not in `other`
    pub fn difference(&self, other: &PointMask) -> PointMask {
        let mut out = self.clone();
        for (w, o) in out.words.iter_mut().zip(&other.words) {
            *w &= !o;
        }
        out
    }

    /// Points set in both masks
    pub fn intersection(&self, other: &PointMask) -> PointMask {
        let mut out = self.clone();
        for (i, w) in out.words.iter_mut().enumerate() {
            *w &= other.words.get(i).copied().unwrap_or(0);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_indices_and_count() {
        let mask = PointMask::from_indices(130, [0, 64, 65, 129]).unwrap();
        assert_eq!(mask.len(), 130);
        assert_eq!(mask.count(), 4);
        assert!(mask.contains(64));
        assert!(!mask.contains(63));
        assert!(!mask.contains(500));
    }

    #[test]
    fn test_from_indices_out_of_range() {
        assert!(PointMask::from_indices(10, [10]).is_err());
    }

    #[test]
    fn test_duplicate_indices_count_once() {
        let mask = PointMask::from_indices(8, [3, 3, 3]).unwrap();
        assert_eq!(mask.count(), 1);
    }

    #[test]
    fn test_iou_basic() {
        let a = PointMask::from_indices(10, 0..6).unwrap();
        let b = PointMask::from_indices(10, 3..9).unwrap();
        // |a∩b| = 3, |a∪b| = 9
        assert!((a.iou(&b) - 3.0 / 9.0).abs() < 1e-6);
        assert_eq!(a.iou(&b), b.iou(&a));
        assert_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_empty_guard() {
        let a = PointMask::new(10);
        let b = PointMask::new(10);
        assert_eq!(a.iou(&b), 0.0);

        let c = PointMask::from_indices(10, [1]).unwrap();
        assert_eq!(a.iou(&c), 0.0);
    }

    #[test]
    fn test_iter_ones() {
        let idx = vec![1, 63, 64, 127, 128, 200];
        let mask = PointMask::from_indices(201, idx.clone()).unwrap();
        assert_eq!(mask.iter_ones().collect::<Vec<_>>(), idx);
    }

    #[test]
    fn test_values_roundtrip() {
        let values = vec![0u8, 1, 1, 0, 1];
        let mask = PointMask::from_values(&values);
        assert_eq!(mask.to_values(), values);
        assert_eq!(PointMask::from_bools(&[true, false]).count(), 1);
    }

    #[test]
    fn test_difference_and_intersection() {
        let a = PointMask::from_indices(70, [1, 2, 65]).unwrap();
        let b = PointMask::from_indices(70, [2, 65, 66]).unwrap();
        assert_eq!(a.difference(&b).iter_ones().collect::<Vec<_>>(), vec![1]);
        assert_eq!(a.intersection(&b).iter_ones().collect::<Vec<_>>(), vec![2, 65]);
    }
}
