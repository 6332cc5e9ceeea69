use std::ops::Range;

use derive_getters::{Dissolve, Getters};
use derive_more::{Constructor, From, Into};
use eyre::{ensure, Result};

use crate::Score;

use super::op::Op;
use super::step::Step;

/// Symbol used to render gaps in aligned sequences.
pub const GAP: u8 = b'-';

/// A pairwise alignment between two sequences.
#[derive(Clone, Eq, PartialEq, Debug, Getters, Constructor, Dissolve, From, Into)]
pub struct Alignment<S: Score> {
    score: S,
    steps: Vec<Step>,
    seq1: Range<usize>,
    seq2: Range<usize>,
}

impl<S: Score> Alignment<S> {
    /// Checks if the alignment is empty, i.e. has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns the total length of the alignment - the sum of all step lengths.
    pub fn len(&self) -> usize {
        self.steps.iter().map(|x| *x.len()).sum()
    }

    /// Returns the RLE representation of the alignment.
    pub fn rle(&self) -> String {
        Step::rle_string(self.steps.iter())
    }

    /// Renders both aligned sequences with [GAP] symbols inserted. The sequences must be the
    /// ones the alignment was computed for.
    pub fn render(&self, seq1: &[u8], seq2: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        ensure!(
            self.seq1.end <= seq1.len() && self.seq2.end <= seq2.len(),
            "Alignment {:?}x{:?} is out of bounds for sequences of length {} and {}",
            self.seq1,
            self.seq2,
            seq1.len(),
            seq2.len()
        );

        let total = self.len();
        let (mut row1, mut row2) = (Vec::with_capacity(total), Vec::with_capacity(total));
        let (mut i, mut j) = (self.seq1.start, self.seq2.start);
        for step in &self.steps {
            let len = *step.len();
            let (di, dj) = step.op().consumes(len);
            ensure!(
                i + di <= self.seq1.end && j + dj <= self.seq2.end,
                "Alignment steps overrun the aligned ranges"
            );
            match step.op() {
                Op::Match | Op::Mismatch => {
                    row1.extend_from_slice(&seq1[i..i + len]);
                    row2.extend_from_slice(&seq2[j..j + len]);
                }
                Op::GapSecond => {
                    row1.extend_from_slice(&seq1[i..i + len]);
                    row2.extend(std::iter::repeat_n(GAP, len));
                }
                Op::GapFirst => {
                    row1.extend(std::iter::repeat_n(GAP, len));
                    row2.extend_from_slice(&seq2[j..j + len]);
                }
            }
            i += di;
            j += dj;
        }
        Ok((row1, row2))
    }
}
