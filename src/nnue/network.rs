use std::{fs::File, path::Path};

use anyhow::{bail, Context};
use memmap2::Mmap;

use crate::{
    nnue::{INPUT, L1},
    shogi::piece::Colour,
    util::MINIMUM_MATE_SCORE,
};

const QA: i32 = 255;
const QB: i32 = 64;
const SCALE: i32 = 400;

/// The quantized affine network: a single feature-transformer layer into
/// per-perspective accumulators, clipped ReLU, and one output neuron.
///
/// Weights live in a plain little-endian `i16` dump, feature-major:
/// `ft_weights[INPUT * L1]`, `ft_bias[L1]`, `out_weights[2 * L1]`,
/// `out_bias`. The file is memory-mapped and copied out once at load.
pub struct Network {
    ft_weights: Vec<i16>,
    ft_bias: Vec<i16>,
    out_weights: Vec<i16>,
    out_bias: i16,
}

const EXPECTED_LEN: usize = INPUT * L1 + L1 + 2 * L1 + 1;

impl Network {
    pub fn load(path: &Path) -> anyhow::Result<Box<Self>> {
        let file = File::open(path)
            .with_context(|| format!("failed to open EvalFile {}", path.display()))?;
        // SAFETY: the mapping is read-only and dropped before this function
        // returns; we never hold references into it afterwards.
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("failed to map EvalFile {}", path.display()))?;

        if mmap.len() != EXPECTED_LEN * 2 {
            bail!(
                "EvalFile {} has {} bytes, expected {}",
                path.display(),
                mmap.len(),
                EXPECTED_LEN * 2
            );
        }

        let mut values = mmap
            .chunks_exact(2)
            .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]));

        let ft_weights: Vec<i16> = values.by_ref().take(INPUT * L1).collect();
        let ft_bias: Vec<i16> = values.by_ref().take(L1).collect();
        let out_weights: Vec<i16> = values.by_ref().take(2 * L1).collect();
        let out_bias = values.next().expect("length checked above");

        Ok(Box::new(Self {
            ft_weights,
            ft_bias,
            out_weights,
            out_bias,
        }))
    }

    pub fn ft_bias(&self) -> &[i16] {
        &self.ft_bias
    }

    /// The L1 weight column for one input feature.
    pub fn feature_column(&self, feature: usize) -> &[i16] {
        &self.ft_weights[feature * L1..(feature + 1) * L1]
    }

    /// Forward pass over the two finished accumulator halves.
    pub fn evaluate(&self, values: &[[i16; L1]; 2], stm: Colour) -> i32 {
        let us = &values[stm];
        let them = &values[stm.flip()];

        let mut sum: i32 = 0;
        for (&v, &w) in us.iter().zip(&self.out_weights[..L1]) {
            sum += i32::from(v.clamp(0, QA as i16)) * i32::from(w);
        }
        for (&v, &w) in them.iter().zip(&self.out_weights[L1..]) {
            sum += i32::from(v.clamp(0, QA as i16)) * i32::from(w);
        }

        let raw = (sum + i32::from(self.out_bias)) * SCALE / (QA * QB);
        raw.clamp(-MINIMUM_MATE_SCORE + 1, MINIMUM_MATE_SCORE - 1)
    }

    /// A deterministic small-weight network for accumulator tests.
    #[cfg(test)]
    pub fn test_network() -> Box<Self> {
        let mut state = crate::rng::XorShiftState::new();
        let mut next_small = move || {
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            {
                (state.next() % 17) as i16 - 8
            }
        };
        let ft_weights = (0..INPUT * L1).map(|_| next_small()).collect();
        let ft_bias = (0..L1).map(|_| next_small()).collect();
        let out_weights = (0..2 * L1).map(|_| next_small()).collect();
        Box::new(Self {
            ft_weights,
            ft_bias,
            out_weights,
            out_bias: 7,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_columns_are_l1_wide() {
        let net = Network::test_network();
        assert_eq!(net.feature_column(0).len(), L1);
        assert_eq!(net.feature_column(INPUT - 1).len(), L1);
    }

    #[test]
    fn evaluation_is_side_relative() {
        let net = Network::test_network();
        let mut values = [[0i16; L1]; 2];
        values[0].fill(100);
        values[1].fill(3);
        let black_view = net.evaluate(&values, Colour::Black);
        let white_view = net.evaluate(&values, Colour::White);
        // swapping the perspective swaps which half feeds which weights.
        assert_ne!(black_view, white_view);
    }
}
