use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("order source returned {got} indices, expected a permutation of {expected}")]
    WrongLength { expected: usize, got: usize },

    #[error("order source output is not a permutation of 0..{len}")]
    NotAPermutation { len: usize },
}

/// Supplier of a uniform permutation. The engine never rolls its own PRNG;
/// the host runner decides where randomness comes from.
pub trait OrderSource {
    fn permutation(&mut self, n: usize) -> Vec<usize>;
}

/// Identity source, for hosts that want deterministic presentation even when
/// a trial asks for randomization.
#[derive(Debug, Clone, Copy, Default)]
pub struct InOrder;

impl OrderSource for InOrder {
    fn permutation(&mut self, n: usize) -> Vec<usize> {
        (0..n).collect()
    }
}

/// Fisher-Yates shuffle over a host-supplied RNG.
#[derive(Debug, Clone)]
pub struct Shuffled<R: Rng>(pub R);

impl<R: Rng> OrderSource for Shuffled<R> {
    fn permutation(&mut self, n: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut self.0);
        order
    }
}

/// The order questions are displayed in, drawn exactly once per trial and
/// held fixed for its lifetime. Index `i` of the permutation gives the
/// original index of the question shown in display slot `i`, so responses
/// stay keyed by original question identity regardless of display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationOrder(Vec<usize>);

impl PresentationOrder {
    pub fn identity(n: usize) -> Self {
        Self((0..n).collect())
    }

    /// Draws a permutation from `source` and checks it really is one; a
    /// misbehaving host source is a contract violation, not a silent
    /// reordering of somebody's data.
    pub fn randomized(n: usize, source: &mut dyn OrderSource) -> Result<Self, OrderError> {
        Self::from_permutation(n, source.permutation(n))
    }

    pub fn from_permutation(n: usize, order: Vec<usize>) -> Result<Self, OrderError> {
        if order.len() != n {
            return Err(OrderError::WrongLength {
                expected: n,
                got: order.len(),
            });
        }
        let mut seen = vec![false; n];
        for &idx in &order {
            if idx >= n || seen[idx] {
                return Err(OrderError::NotAPermutation { len: n });
            }
            seen[idx] = true;
        }
        Ok(Self(order))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Original question index shown at display slot `position`.
    pub fn original_index(&self, position: usize) -> usize {
        self.0[position]
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn identity_for_every_length() {
        for n in 0..16 {
            let order = PresentationOrder::identity(n);
            assert_eq!(order.as_slice(), (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn randomized_is_always_a_bijection() {
        for seed in 0..50 {
            let mut source = Shuffled(StdRng::seed_from_u64(seed));
            let order = PresentationOrder::randomized(7, &mut source).unwrap();
            let mut sorted = order.as_slice().to_vec();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..7).collect::<Vec<_>>());
        }
    }

    #[test]
    fn bad_source_output_is_rejected() {
        assert_eq!(
            PresentationOrder::from_permutation(3, vec![0, 1]),
            Err(OrderError::WrongLength {
                expected: 3,
                got: 2
            })
        );
        assert_eq!(
            PresentationOrder::from_permutation(3, vec![0, 1, 1]),
            Err(OrderError::NotAPermutation { len: 3 })
        );
        assert_eq!(
            PresentationOrder::from_permutation(3, vec![0, 1, 3]),
            Err(OrderError::NotAPermutation { len: 3 })
        );
    }
}
