//! Symbol histograms and their normalization to a power-of-two total, which
//! is what the tANS tables are built from.

use std::fmt;

pub struct Histogram<const BINS: usize> {
    values: [u32; BINS],
}

impl<const BINS: usize> Histogram<BINS> {
    pub fn from_data<Ty: Into<usize> + Copy>(values: &[Ty]) -> Histogram<BINS> {
        // Count into four banks to allow instruction-level parallelism.
        let mut banks = [[0u32; BINS]; 4];
        let mut chunks = values.chunks_exact(4);
        for chunk in &mut chunks {
            for (bank, val) in banks.iter_mut().zip(chunk) {
                bank[Into::<usize>::into(*val)] += 1;
            }
        }
        for val in chunks.remainder() {
            banks[0][Into::<usize>::into(*val)] += 1;
        }

        let mut hist = [0; BINS];
        for (i, bin) in hist.iter_mut().enumerate() {
            *bin = banks.iter().map(|bank| bank[i]).sum();
        }
        Histogram { values: hist }
    }

    pub fn get_bins(&self) -> &[u32; BINS] {
        &self.values
    }

    /// The number of distinct symbols that occur at least once.
    pub fn used_symbols(&self) -> usize {
        self.values.iter().filter(|v| **v != 0).count()
    }

    pub fn normalize(&mut self, total_sum: usize) {
        normalize_to_total_sum(&mut self.values, total_sum as u32);
    }
}

/// Renders the non-empty range of the histogram as a bar chart.
impl<const BINS: usize> fmt::Display for Histogram<BINS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self.values.iter().enumerate().filter(|(_, v)| **v != 0);
        let first = used.clone().map(|(i, _)| i).next();
        let last = used.clone().map(|(i, _)| i).last();
        let max = self.values.iter().copied().max().unwrap_or(0);

        let (first, last) = match (first, last) {
            (Some(first), Some(last)) => (first, last),
            _ => return writeln!(f, "-- empty --"),
        };

        for i in first..=last {
            let bar = 40 * self.values[i] as u64 / max as u64;
            writeln!(
                f,
                "{}) {} - {}",
                i,
                "#".repeat(bar as usize),
                self.values[i]
            )?;
        }
        Ok(())
    }
}

/// Returns the number of bits needed to represent the word 'num'.
pub fn num_bits(num: u32) -> u32 {
    32 - num.leading_zeros()
}

/// Normalize 'values' to make the sum of the values equal to 'total'.
/// This keeps non-zero values as non zero.
/// The value of 'total' must be greater than the number of bins in 'values'.
/// Reference: FSE_normalizeCount and FSE_normalizeM2
pub fn normalize_to_total_sum(values: &mut [u32], total: u32) {
    assert!(total > values.len() as u32);

    // Reserve one slot for every used symbol, and spread the rest of the
    // budget proportionally.
    let non_zeros = values.iter().filter(|&n| *n != 0).count() as u32;
    let sum: u64 = values.iter().map(|v| *v as u64).sum();
    let budget = (total - non_zeros) as u64;

    let mut max_value_idx = 0;
    let mut new_values: Vec<u32> = vec![0; values.len()];
    if sum > 0 {
        for (i, val) in values.iter().enumerate() {
            new_values[i] = (*val as u64 * budget / sum) as u32;
            if *val > values[max_value_idx] {
                max_value_idx = i;
            }
        }
    }

    let rounded: u32 = new_values.iter().sum();
    debug_assert!(total >= rounded, "Rounding down can't exceed the total");
    let mut gap = total - rounded;

    // Every symbol that occurs must keep a non-zero frequency.
    for (new, old) in new_values.iter_mut().zip(values.iter()) {
        if gap == 0 {
            break;
        }
        if *new == 0 && *old != 0 {
            *new += 1;
            gap -= 1;
        }
    }

    // Give the remainder to the most frequent symbol.
    new_values[max_value_idx] += gap;
    values.copy_from_slice(&new_values);
    debug_assert_eq!(values.iter().sum::<u32>(), total);
}
