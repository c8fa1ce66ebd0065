//! Positions and hyperslabs used for putting and getting data
//! from a variable

use crate::error::{self, Error};

/// Per-dimension coordinates into a variable. A plain `usize`
/// addresses a one-dimensional (or scalar) variable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index(Vec<usize>);

impl Index {
    /// Coordinates along each dimension
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

impl From<usize> for Index {
    fn from(i: usize) -> Self {
        Self(vec![i])
    }
}

impl<const N: usize> From<[usize; N]> for Index {
    fn from(i: [usize; N]) -> Self {
        Self(i.to_vec())
    }
}

impl From<&[usize]> for Index {
    fn from(i: &[usize]) -> Self {
        Self(i.to_vec())
    }
}

impl From<Vec<usize>> for Index {
    fn from(i: Vec<usize>) -> Self {
        Self(i)
    }
}

/// Brings `idx` to `rank` coordinates. A scalar variable accepts the
/// single coordinate `neutral` in place of an empty list
fn fit_rank(idx: Index, rank: usize, what: &str, neutral: usize) -> error::Result<Vec<usize>> {
    let Index(idx) = idx;
    if idx.len() == rank {
        return Ok(idx);
    }
    if rank == 0 && idx == [neutral] {
        return Ok(Vec::new());
    }
    Err(Error::validation(format!(
        "Expected {rank} {what} value(s), got {}",
        idx.len()
    )))
}

/// Position of a single element
pub(crate) fn point(index: Index, rank: usize) -> error::Result<Vec<usize>> {
    fit_rank(index, rank, "index", 0)
}

/// Start, count and stride along every dimension of a variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Hyperslab {
    pub(crate) start: Vec<usize>,
    pub(crate) count: Vec<usize>,
    pub(crate) stride: Vec<isize>,
}

impl Hyperslab {
    pub(crate) fn new(
        start: Index,
        count: Index,
        stride: Option<Index>,
        rank: usize,
    ) -> error::Result<Self> {
        let start = fit_rank(start, rank, "start", 0)?;
        let count = fit_rank(count, rank, "count", 1)?;
        let stride = match stride {
            None => vec![1; rank],
            Some(stride) => {
                let stride = fit_rank(stride, rank, "stride", 1)?;
                if stride.contains(&0) {
                    return Err(Error::validation("Stride must be positive"));
                }
                stride
                    .into_iter()
                    .map(isize::try_from)
                    .collect::<Result<_, _>>()?
            }
        };
        Ok(Self {
            start,
            count,
            stride,
        })
    }

    /// Number of elements covered by the hyperslab
    pub(crate) fn len(&self) -> usize {
        self.count.iter().copied().fold(1_usize, usize::saturating_mul)
    }

    /// Checks that every selected element lies inside dimensions of the
    /// given current lengths
    pub(crate) fn check_within(&self, lens: &[usize]) -> error::Result<()> {
        if lens.len() != self.count.len() {
            return Err(Error::validation(format!(
                "Expected {} dimension length(s), got {}",
                self.count.len(),
                lens.len()
            )));
        }
        for (dim, &len) in lens.iter().enumerate() {
            let (start, count) = (self.start[dim], self.count[dim]);
            if count == 0 {
                continue;
            }
            let stride = self.stride[dim].unsigned_abs();
            let last = (count - 1)
                .checked_mul(stride)
                .and_then(|offset| offset.checked_add(start));
            match last {
                Some(last) if last < len => {}
                _ => {
                    return Err(Error::validation(format!(
                        "Selection of {count} element(s) from {start} exceeds dimension {dim} of length {len}"
                    )))
                }
            }
        }
        Ok(())
    }
}
