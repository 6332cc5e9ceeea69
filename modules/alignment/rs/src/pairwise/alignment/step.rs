use std::borrow::Borrow;

use derive_getters::{Dissolve, Getters};
use eyre::{ensure, Result};

use super::op::Op;

/// A run of identical operations in the alignment
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Getters, Dissolve)]
pub struct Step {
    /// The length of the operation, e.g. the number of consequent matches or gaps.
    /// Guaranteed to be greater than zero.
    len: usize,
    op: Op,
}

impl Step {
    pub fn new(op: Op, len: usize) -> Result<Self> {
        ensure!(len > 0, "Step length must be greater than zero");
        Ok(Self { len, op })
    }

    /// Run-length encodes a sequence of single operations.
    pub fn encode(ops: impl IntoIterator<Item = Op>) -> Vec<Step> {
        let mut steps: Vec<Step> = Vec::new();
        for op in ops {
            match steps.last_mut() {
                Some(last) if last.op == op => last.len += 1,
                _ => steps.push(Step { len: 1, op }),
            }
        }
        steps
    }

    pub fn rle_string(steps: impl Iterator<Item: Borrow<Step>>) -> String {
        let mut result = String::with_capacity(steps.size_hint().0 * 3);
        for step in steps {
            let step = step.borrow();
            result.push_str(&step.len.to_string());
            result.push(step.op.symbol());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_length_step() {
        assert!(Step::new(Op::Match, 0).is_err());
        assert!(Step::new(Op::Match, 1).is_ok());
    }

    #[test]
    fn test_encode() -> Result<()> {
        let ops = [
            Op::Match,
            Op::Match,
            Op::GapFirst,
            Op::Match,
            Op::Mismatch,
            Op::Mismatch,
        ];
        let steps = Step::encode(ops);
        assert_eq!(
            steps,
            vec![
                Step::new(Op::Match, 2)?,
                Step::new(Op::GapFirst, 1)?,
                Step::new(Op::Match, 1)?,
                Step::new(Op::Mismatch, 2)?,
            ]
        );
        assert_eq!(Step::rle_string(steps.iter()), "2=1v1=2X");
        assert!(Step::encode([]).is_empty());
        Ok(())
    }
}
