use derive_getters::Getters;
use eyre::{ensure, Result};

use crate::pairwise::alignment::{Alignment, Op, Step};
use crate::pairwise::scoring::{self, NucleotideScheme, Scheme, Scoring};
use crate::Score;

/// Pairwise alignment capability: returns the best alignment of two sequences.
///
/// Engines are shared between worker threads, hence `&self` and the `Sync` bound. An error means
/// that the pair couldn't be aligned at all (e.g. it exceeds the engine limits).
pub trait Engine: Send + Sync {
    fn align(&self, seq1: &[u8], seq2: &[u8]) -> Result<Alignment<i32>>;
}

// Traceback states, packed as 2-bit predecessor codes for each state of a cell
const DIAG: u8 = 0;
const UP: u8 = 1; // GapSecond: consumes a symbol of seq1
const LEFT: u8 = 2; // GapFirst: consumes a symbol of seq2

const DIAG_SHIFT: u8 = 0;
const UP_SHIFT: u8 = 2;
const LEFT_SHIFT: u8 = 4;

/// Global (end-to-end) aligner with affine gaps, the Gotoh algorithm.
///
/// Scores are kept for two rows only, while the traceback matrix stores a single byte per cell.
/// Ties are resolved in favor of diagonal moves, then gaps in the second sequence, then gaps in
/// the first sequence, which makes the output deterministic.
#[derive(Clone, Debug, Getters)]
pub struct Global<Sch> {
    scheme: Sch,
    /// Upper bound on the traceback matrix size, (len1 + 1) * (len2 + 1).
    max_cells: usize,
}

impl<Sch> Global<Sch> {
    pub const DEFAULT_MAX_CELLS: usize = 1 << 28;

    pub fn new(scheme: Sch, max_cells: usize) -> Self {
        Self { scheme, max_cells }
    }
}

impl Global<NucleotideScheme> {
    pub fn with_scoring(scoring: &Scoring) -> Self {
        Self::new(scoring.scheme(), Self::DEFAULT_MAX_CELLS)
    }
}

impl Default for Global<NucleotideScheme> {
    fn default() -> Self {
        Self::with_scoring(&Scoring::default())
    }
}

#[inline(always)]
fn best3<S: Score>(diag: S, up: S, left: S) -> (S, u8) {
    let mut best = (diag, DIAG);
    if up > best.0 {
        best = (up, UP);
    }
    if left > best.0 {
        best = (left, LEFT);
    }
    best
}

impl<S, Sch> Global<Sch>
where
    S: Score,
    Sch: Scheme<Score = S, Symbol = u8>,
{
    pub fn scan(&self, seq1: &[u8], seq2: &[u8]) -> Result<Alignment<S>> {
        let (n, m) = (seq1.len(), seq2.len());
        let cells = (n + 1)
            .checked_mul(m + 1)
            .filter(|x| *x <= self.max_cells);
        ensure!(
            cells.is_some(),
            "Alignment matrix {}x{} exceeds the limit of {} cells",
            n + 1,
            m + 1,
            self.max_cells
        );

        // Far enough from the type limits to survive the addition of a few penalties
        let neg = S::min_value() >> 2;
        let width = m + 1;
        let mut trace = vec![0u8; (n + 1) * width];

        // diag / up / left scores for the previous and the current row
        let (mut pdiag, mut pup, mut pleft) = (vec![neg; width], vec![neg; width], vec![neg; width]);
        let (mut cdiag, mut cup, mut cleft) = (vec![neg; width], vec![neg; width], vec![neg; width]);

        // First row: only gaps in the first sequence are possible
        pdiag[0] = S::zero();
        for j in 1..width {
            let open = pdiag[j - 1] + self.scheme.seq1_gap_open(j - 1);
            let extend = pleft[j - 1] + self.scheme.seq1_gap_extend(j - 1);
            let (score, from) = if j == 1 { (open, DIAG) } else { (extend, LEFT) };
            pleft[j] = score;
            trace[j] = from << LEFT_SHIFT;
        }

        for i in 1..=n {
            let row = i * width;

            // First column: only gaps in the second sequence are possible
            cdiag[0] = neg;
            cleft[0] = neg;
            let (score, from) = if i == 1 {
                (pdiag[0] + self.scheme.seq2_gap_open(0), DIAG)
            } else {
                (pup[0] + self.scheme.seq2_gap_extend(0), UP)
            };
            cup[0] = score;
            trace[row] = from << UP_SHIFT;

            for j in 1..width {
                let (best, diag_from) = best3(pdiag[j - 1], pup[j - 1], pleft[j - 1]);
                cdiag[j] = best + self.scheme.score(i - 1, &seq1[i - 1], j - 1, &seq2[j - 1]);

                let open = self.scheme.seq2_gap_open(j - 1);
                let (up, up_from) = best3(
                    pdiag[j] + open,
                    pup[j] + self.scheme.seq2_gap_extend(j - 1),
                    pleft[j] + open,
                );
                cup[j] = up;

                let open = self.scheme.seq1_gap_open(i - 1);
                let (left, left_from) = best3(
                    cdiag[j - 1] + open,
                    cup[j - 1] + open,
                    cleft[j - 1] + self.scheme.seq1_gap_extend(i - 1),
                );
                cleft[j] = left;

                trace[row + j] =
                    (diag_from << DIAG_SHIFT) | (up_from << UP_SHIFT) | (left_from << LEFT_SHIFT);
            }

            std::mem::swap(&mut pdiag, &mut cdiag);
            std::mem::swap(&mut pup, &mut cup);
            std::mem::swap(&mut pleft, &mut cleft);
        }

        let (score, mut state) = best3(pdiag[m], pup[m], pleft[m]);

        // Traceback from the bottom-right corner
        let mut ops = Vec::with_capacity(n + m);
        let (mut i, mut j) = (n, m);
        while i > 0 || j > 0 {
            let cell = trace[i * width + j];
            state = match state {
                DIAG => {
                    ops.push(if seq1[i - 1] == seq2[j - 1] {
                        Op::Match
                    } else {
                        Op::Mismatch
                    });
                    i -= 1;
                    j -= 1;
                    (cell >> DIAG_SHIFT) & 0b11
                }
                UP => {
                    ops.push(Op::GapSecond);
                    i -= 1;
                    (cell >> UP_SHIFT) & 0b11
                }
                _ => {
                    ops.push(Op::GapFirst);
                    j -= 1;
                    (cell >> LEFT_SHIFT) & 0b11
                }
            };
        }
        ops.reverse();

        Ok(Alignment::new(score, Step::encode(ops), 0..n, 0..m))
    }
}

impl<Sch> Engine for Global<Sch>
where
    Sch: scoring::Scheme<Score = i32, Symbol = u8> + Send + Sync,
{
    fn align(&self, seq1: &[u8], seq2: &[u8]) -> Result<Alignment<i32>> {
        self.scan(seq1, seq2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aligner(matched: i32, mismatched: i32, open: i32, extend: i32) -> Global<NucleotideScheme> {
        Global::with_scoring(&Scoring::new(matched, mismatched, open, extend))
    }

    fn rendered(engine: &impl Engine, seq1: &[u8], seq2: &[u8]) -> Result<(String, String)> {
        let (row1, row2) = engine.align(seq1, seq2)?.render(seq1, seq2)?;
        Ok((String::from_utf8(row1)?, String::from_utf8(row2)?))
    }

    #[test]
    fn test_identical() -> Result<()> {
        let engine = aligner(1, -1, -2, -1);
        let alignment = engine.align(b"ACGTACGT", b"ACGTACGT")?;
        assert_eq!(*alignment.score(), 8);
        assert_eq!(alignment.rle(), "8=");
        Ok(())
    }

    #[test]
    fn test_single_gap() -> Result<()> {
        let engine = aligner(2, -1, -3, -1);
        let alignment = engine.align(b"ACGTTACG", b"ACGTACG")?;
        // 7 matches and a single opened gap
        assert_eq!(*alignment.score(), 7 * 2 - 3);
        assert_eq!(alignment.len(), 8);
        let (row1, row2) = rendered(&engine, b"ACGTTACG", b"ACGTACG")?;
        assert_eq!(row1, "ACGTTACG");
        assert_eq!(row2.replace('-', ""), "ACGTACG");
        assert_eq!(row2.matches('-').count(), 1);
        Ok(())
    }

    #[test]
    fn test_affine_prefers_single_long_gap() -> Result<()> {
        let engine = aligner(2, -2, -5, -1);
        let alignment = engine.align(b"AAACCCCGGG", b"AAAGGG")?;
        assert_eq!(*alignment.score(), 6 * 2 - 5 - 3);
        assert_eq!(alignment.rle(), "3=4^3=");
        Ok(())
    }

    #[test]
    fn test_mismatch() -> Result<()> {
        let engine = aligner(1, -1, -4, -4);
        let alignment = engine.align(b"ACGT", b"AGGT")?;
        assert_eq!(*alignment.score(), 2);
        assert_eq!(alignment.rle(), "1=1X2=");
        Ok(())
    }

    #[test]
    fn test_default_scoring_counts_identities() -> Result<()> {
        let engine = Global::<NucleotideScheme>::default();
        let alignment = engine.align(b"GATTACA", b"GCATGCT")?;
        assert_eq!(*alignment.score(), 4);
        let (row1, row2) = rendered(&engine, b"GATTACA", b"GCATGCT")?;
        assert_eq!(row1.len(), row2.len());
        assert_eq!(row1.replace('-', ""), "GATTACA");
        assert_eq!(row2.replace('-', ""), "GCATGCT");
        Ok(())
    }

    #[test]
    fn test_empty_sequences() -> Result<()> {
        let engine = aligner(1, -1, -2, -1);

        let alignment = engine.align(b"", b"")?;
        assert!(alignment.is_empty());
        assert_eq!(*alignment.score(), 0);

        let alignment = engine.align(b"ACG", b"")?;
        assert_eq!(alignment.rle(), "3^");
        assert_eq!(*alignment.score(), -2 - 1 - 1);

        let alignment = engine.align(b"", b"AC")?;
        assert_eq!(alignment.rle(), "2v");
        assert_eq!(*alignment.score(), -2 - 1);
        Ok(())
    }

    #[test]
    fn test_symmetry() -> Result<()> {
        let engine = aligner(2, -1, -3, -1);
        for (seq1, seq2) in [
            (&b"ACGTTGCA"[..], &b"ACGTGCA"[..]),
            (b"TTTT", b"AAAA"),
            (b"ACGTACGTAC", b"CGTAC"),
        ] {
            let forward = engine.align(seq1, seq2)?;
            let backward = engine.align(seq2, seq1)?;
            assert_eq!(forward.score(), backward.score());
        }
        Ok(())
    }

    #[test]
    fn test_matrix_limit() {
        let engine = Global::new(Scoring::default().scheme(), 100);
        assert!(engine.align(&[b'A'; 9], &[b'A'; 9]).is_ok());
        assert!(engine.align(&[b'A'; 10], &[b'A'; 10]).is_err());
    }
}
