use std::fmt;

/// How the predicted label set of a pixel relates to its ground-truth set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelRelation {
    /// Both sets carry the same labels.
    Equal,
    /// The prediction adds labels on top of every ground-truth label.
    StrictSuperset,
    /// The prediction is missing some ground-truth labels and adds none.
    StrictSubset,
    /// Each side has labels the other one lacks.
    Incomparable,
}

impl LabelRelation {
    /// Classifies the pair of pixel words `(g, p)`.
    ///
    /// An empty side is a subset of anything, so `(g, 0)` with `g != 0` is a
    /// [`LabelRelation::StrictSubset`] and `(0, p)` with `p != 0` is a
    /// [`LabelRelation::StrictSuperset`].
    pub fn classify(g: u64, p: u64) -> Self {
        let common = g & p;
        if g == p {
            Self::Equal
        } else if common == g {
            Self::StrictSuperset
        } else if common == p {
            Self::StrictSubset
        } else {
            Self::Incomparable
        }
    }
}

impl fmt::Display for LabelRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Equal => "equal label sets",
            Self::StrictSuperset => "prediction superset",
            Self::StrictSubset => "prediction subset",
            Self::Incomparable => "incomparable label sets",
        };
        f.write_str(name)
    }
}

/// Iterator over the indices of the set bits of a pixel word, lowest first.
#[derive(Debug, Clone)]
pub struct SetBits(u64);

impl Iterator for SetBits {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let bit = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(bit)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for SetBits {}

pub fn set_bits(word: u64) -> SetBits {
    SetBits(word)
}
