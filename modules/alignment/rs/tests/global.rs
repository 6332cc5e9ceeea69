use alignfarm_alignment_rs::pairwise::alignment::Op;
use alignfarm_alignment_rs::pairwise::{Engine, Global, Scoring};
use eyre::Result;

/// Swaps gap operations, i.e. turns the RLE of seq1 vs seq2 into the RLE of seq2 vs seq1.
pub fn invrle(rle: &str) -> String {
    let gapfirst = Op::symbol(&Op::GapFirst);
    let gapsecond = Op::symbol(&Op::GapSecond);
    rle.chars()
        .map(|x| {
            if x == gapfirst {
                gapsecond
            } else if x == gapsecond {
                gapfirst
            } else {
                x
            }
        })
        .collect::<String>()
}

struct Workload<'a> {
    seq1: &'a [u8],
    seq2: &'a [u8],
    score: i32,
    rle: &'a str,
}

fn ensure(engine: &impl Engine, w: Workload<'_>) -> Result<()> {
    let invrle = invrle(w.rle);

    for (seq1, seq2, rle) in [(w.seq1, w.seq2, w.rle), (w.seq2, w.seq1, &invrle)] {
        let result = engine.align(seq1, seq2)?;
        assert_eq!(result.seq1(), &(0..seq1.len()));
        assert_eq!(result.seq2(), &(0..seq2.len()));
        assert_eq!(*result.score(), w.score);
        assert_eq!(result.rle(), rle);

        // Rendered rows have equal length and spell the original sequences once gaps are dropped
        let (row1, row2) = result.render(seq1, seq2)?;
        assert_eq!(row1.len(), row2.len());
        assert_eq!(row1.iter().filter(|x| **x != b'-').count(), seq1.len());
        assert_eq!(row2.iter().filter(|x| **x != b'-').count(), seq2.len());
    }
    Ok(())
}

#[test]
fn test_linear_scoring() -> Result<()> {
    let engine = Global::with_scoring(&Scoring::new(1, -1, -2, -1));
    for w in [
        Workload {
            seq1: b"ACGT",
            seq2: b"ACGT",
            score: 4,
            rle: "4=",
        },
        Workload {
            seq1: b"TTTT",
            seq2: b"AAAA",
            score: -4,
            rle: "4X",
        },
        Workload {
            seq1: b"ACGTACGT",
            seq2: b"",
            score: -2 - 7,
            rle: "8^",
        },
    ] {
        ensure(&engine, w)?;
    }
    Ok(())
}

#[test]
fn test_affine_scoring() -> Result<()> {
    let engine = Global::with_scoring(&Scoring::new(2, -2, -5, -1));
    ensure(
        &engine,
        Workload {
            seq1: b"AAACCCCGGG",
            seq2: b"AAAGGG",
            score: 6 * 2 - 5 - 3,
            rle: "3=4^3=",
        },
    )?;

    let engine = Global::with_scoring(&Scoring::new(1, -1, -4, -4));
    ensure(
        &engine,
        Workload {
            seq1: b"ACGT",
            seq2: b"AGGT",
            score: 2,
            rle: "1=1X2=",
        },
    )
}
