//! The three-tier result returned by `analyse`
//!
//! ```text
//! [
//!   [focus],                                  // the analysed region, echoed
//!   [type[p0.b], type[p0.bb], type[p1.b], ..], // every candidate pair, flattened
//!   [type[0], type[1], ..],                   // every detected region
//! ]
//! ```
//!
//! The host consumer indexes the outer list positionally, so all three lists
//! are always present, empty or not.

use crate::engine::{MatrixElement, Rect};
use crate::error::TreeError;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultTree {
    pub focus: Vec<Rect>,
    pub matched: Vec<Rect>,
    pub regions: Vec<Rect>,
}

impl ResultTree {
    /// Assemble the tree from one call's engine output.
    ///
    /// Pair order is preserved and duplicates are kept. A pair that points
    /// outside `regions` is rejected rather than read.
    pub fn build(
        input: Rect,
        pairs: &[MatrixElement],
        regions: &[Rect],
    ) -> Result<Self, TreeError> {
        let region = |pair: usize, index: usize| {
            regions
                .get(index)
                .copied()
                .ok_or(TreeError::PairIndexOutOfRange {
                    pair,
                    index,
                    len: regions.len(),
                })
        };

        let mut matched = Vec::with_capacity(pairs.len() * 2);
        for (n, el) in pairs.iter().enumerate() {
            matched.push(region(n, el.b)?);
            matched.push(region(n, el.bb)?);
        }

        Ok(Self {
            focus: vec![input],
            matched,
            regions: regions.to_vec(),
        })
    }

    /// Nothing detected in `input`
    pub fn empty(input: Rect) -> Self {
        Self {
            focus: vec![input],
            matched: Vec::new(),
            regions: Vec::new(),
        }
    }

    /// Three empty lists, used when not even the input region is available
    pub fn hollow() -> Self {
        Self {
            focus: Vec::new(),
            matched: Vec::new(),
            regions: Vec::new(),
        }
    }

    /// The three lists in wire order
    pub fn groups(&self) -> [&[Rect]; 3] {
        [self.focus.as_slice(), self.matched.as_slice(), self.regions.as_slice()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: Rect = Rect::new(0, 0, 640, 480);
    const R0: Rect = Rect::new(10, 10, 20, 30);
    const R1: Rect = Rect::new(50, 12, 18, 29);

    #[test]
    fn test_build_without_detections() {
        let tree = ResultTree::build(INPUT, &[], &[]).unwrap();
        assert_eq!(tree.groups(), [&[INPUT][..], &[][..], &[][..]]);
        assert_eq!(tree, ResultTree::empty(INPUT));
    }

    #[test]
    fn test_build_single_pair() {
        let tree = ResultTree::build(INPUT, &[MatrixElement::new(0, 1)], &[R0, R1]).unwrap();
        assert_eq!(tree.focus, vec![INPUT]);
        assert_eq!(tree.matched, vec![R0, R1]);
        assert_eq!(tree.regions, vec![R0, R1]);
    }

    #[test]
    fn test_build_keeps_pair_order_and_duplicates() {
        let pairs = [MatrixElement::new(1, 0), MatrixElement::new(0, 0)];
        let tree = ResultTree::build(INPUT, &pairs, &[R0, R1]).unwrap();
        assert_eq!(tree.matched, vec![R1, R0, R0, R0]);
    }

    #[test]
    fn test_regions_without_pairs() {
        let tree = ResultTree::build(INPUT, &[], &[R1, R0]).unwrap();
        assert!(tree.matched.is_empty());
        assert_eq!(tree.regions, vec![R1, R0]);
    }

    #[test]
    fn test_out_of_range_pair_is_rejected() {
        let pairs = [MatrixElement::new(0, 1), MatrixElement::new(1, 2)];
        let err = ResultTree::build(INPUT, &pairs, &[R0, R1]).unwrap_err();
        assert_eq!(
            err,
            TreeError::PairIndexOutOfRange {
                pair: 1,
                index: 2,
                len: 2
            }
        );
    }

    #[test]
    fn test_hollow_still_has_three_groups() {
        let tree = ResultTree::hollow();
        assert!(tree.groups().iter().all(|g| g.is_empty()));
    }

    #[test]
    fn test_serializes_as_named_groups() {
        let json = serde_json::to_value(ResultTree::empty(R0)).unwrap();
        assert_eq!(json["focus"][0]["width"], 20);
        assert_eq!(json["matched"].as_array().unwrap().len(), 0);
    }
}
