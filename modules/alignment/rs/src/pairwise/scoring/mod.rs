use derive_getters::Getters;
use derive_more::Constructor;

pub use delegate::Delegate;

pub use crate::Score;

mod delegate;
pub mod gaps;
pub mod symbols;

pub trait Scheme:
    gaps::Scorer<Score = <Self as Scheme>::Score>
    + symbols::Scorer<Score = <Self as Scheme>::Score, Symbol = <Self as Scheme>::Symbol>
{
    type Score: Score;
    type Symbol;
}

pub fn compose<ScoreType, Symbol, S, G>(symbols: S, gaps: G) -> Delegate<ScoreType, Symbol, S, G>
where
    ScoreType: Score,
    S: symbols::Scorer<Symbol = Symbol, Score = ScoreType>,
    G: gaps::Scorer<Score = ScoreType>,
{
    Delegate::new(symbols, gaps)
}

/// Nucleotide scoring scheme used by the alignment service: symbol equality plus affine gaps.
///
/// The defaults (match = 1, everything else = 0) count identical positions in the best global
/// alignment. Penalties are expressed as negative scores.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Getters, Constructor)]
pub struct Scoring {
    matched: i32,
    mismatched: i32,
    gap_open: i32,
    gap_extend: i32,
}

impl Default for Scoring {
    fn default() -> Self {
        Self {
            matched: 1,
            mismatched: 0,
            gap_open: 0,
            gap_extend: 0,
        }
    }
}

/// The concrete scheme produced by [Scoring::scheme].
pub type NucleotideScheme = Delegate<i32, u8, symbols::Equality<i32, u8>, gaps::Affine<i32>>;

impl Scoring {
    pub fn scheme(&self) -> NucleotideScheme {
        compose(
            symbols::Equality::new(self.matched, self.mismatched),
            gaps::Affine {
                open: self.gap_open,
                extend: self.gap_extend,
            },
        )
    }
}
