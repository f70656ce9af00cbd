// Adaptive frequency tables
// Symbol counts kept in a Fenwick tree so cumulative lookups stay logarithmic
// even for the large position and variant alphabets. The arithmetic coder
// reads them through its `Model` view; adaptation happens here.

/// Count added to a symbol each time it is observed
const ADAPT_INCREMENT: u32 = 32;

/// Once the total passes this, every count is halved.
/// Must stay well below 2^30 so each symbol keeps a non-empty coding interval.
const MAX_TOTAL: u32 = 1 << 20;

/// Largest total a table can reach: halving keeps every live symbol at a
/// count of at least 1, so a full position alphabet can sit above `MAX_TOTAL`
pub const MAX_DENOMINATOR: u64 = 1 << 22;

/// Initial probability mass of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableInit {
    /// Every symbol starts with count 1
    Uniform,
    /// Only symbol 0 (the escape) starts with count 1; the rest are learned
    EscapeOnly,
}

/// Adaptive frequency table over `0..alphabet_size`
#[derive(Debug, Clone)]
pub struct FrequencyTable {
    counts: Vec<u32>,
    // 1-based Fenwick tree over `counts`
    tree: Vec<u32>,
    total: u32,
}

impl FrequencyTable {
    /// Create a table with the given alphabet size and initial mass
    pub fn new(alphabet_size: u32, init: TableInit) -> Self {
        let n = alphabet_size.max(1) as usize;
        let counts = match init {
            TableInit::Uniform => vec![1u32; n],
            TableInit::EscapeOnly => {
                let mut counts = vec![0u32; n];
                counts[0] = 1;
                counts
            }
        };

        let mut table = FrequencyTable {
            counts,
            tree: vec![0; n + 1],
            total: 0,
        };
        table.rebuild();
        table
    }

    /// Number of symbols in the alphabet
    #[inline]
    pub fn alphabet_size(&self) -> u32 {
        self.counts.len() as u32
    }

    /// Sum of all counts
    #[inline]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Current count of a symbol (0 when outside the alphabet)
    #[inline]
    pub fn frequency(&self, symbol: u32) -> u32 {
        self.counts.get(symbol as usize).copied().unwrap_or(0)
    }

    /// Sum of the counts of all symbols below `symbol`
    pub fn cumulative(&self, symbol: u32) -> u32 {
        let mut i = (symbol as usize).min(self.counts.len());
        let mut sum = 0;
        while i > 0 {
            sum += self.tree[i];
            i &= i - 1;
        }
        sum
    }

    /// Coding interval `(cum_low, freq)` of a symbol, if it has any mass
    pub fn interval(&self, symbol: u32) -> Option<(u32, u32)> {
        let freq = self.frequency(symbol);
        if freq == 0 {
            return None;
        }
        Some((self.cumulative(symbol), freq))
    }

    /// Symbol whose interval contains `target` (`target < total`)
    pub fn find(&self, target: u32) -> Option<u32> {
        if target >= self.total {
            return None;
        }

        let n = self.counts.len();
        let mut pos = 0usize;
        let mut rem = target;
        let mut step = 1usize << (usize::BITS - 1 - n.leading_zeros());
        while step > 0 {
            let next = pos + step;
            if next <= n && self.tree[next] <= rem {
                pos = next;
                rem -= self.tree[next];
            }
            step >>= 1;
        }

        // `pos` symbols have cumulative mass <= target, so symbol `pos` holds it
        Some(pos as u32)
    }

    /// Record an observation of `symbol`. Returns `None` outside the alphabet.
    pub fn update(&mut self, symbol: u32) -> Option<()> {
        let idx = symbol as usize;
        if idx >= self.counts.len() {
            return None;
        }

        self.counts[idx] += ADAPT_INCREMENT;
        self.total += ADAPT_INCREMENT;
        let mut i = idx + 1;
        while i < self.tree.len() {
            self.tree[i] += ADAPT_INCREMENT;
            i += i & i.wrapping_neg();
        }

        if self.total > MAX_TOTAL {
            self.rescale();
        }
        Some(())
    }

    /// Halve every count, rounding up so observed symbols keep some mass
    fn rescale(&mut self) {
        for c in self.counts.iter_mut() {
            *c = (*c + 1) / 2;
        }
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let n = self.counts.len();
        self.tree.iter_mut().for_each(|t| *t = 0);
        for i in 1..=n {
            self.tree[i] += self.counts[i - 1];
            let parent = i + (i & i.wrapping_neg());
            if parent <= n {
                self.tree[parent] += self.tree[i];
            }
        }
        self.total = self.counts.iter().sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_intervals() {
        let table = FrequencyTable::new(5, TableInit::Uniform);
        assert_eq!(table.total(), 5);
        for s in 0..5 {
            assert_eq!(table.interval(s), Some((s, 1)));
            assert_eq!(table.find(s), Some(s));
        }
        assert_eq!(table.find(5), None);
        assert_eq!(table.interval(5), None);
    }

    #[test]
    fn test_escape_only_skips_unlearned_symbols() {
        let mut table = FrequencyTable::new(8, TableInit::EscapeOnly);
        assert_eq!(table.total(), 1);
        assert_eq!(table.interval(3), None);

        table.update(3).unwrap();
        assert_eq!(table.interval(3), Some((1, ADAPT_INCREMENT)));
        // Every target inside symbol 3's interval maps back to it
        for target in 1..table.total() {
            assert_eq!(table.find(target), Some(3));
        }
        assert_eq!(table.find(0), Some(0));
    }

    #[test]
    fn test_find_matches_cumulative() {
        let mut table = FrequencyTable::new(37, TableInit::Uniform);
        for (i, s) in [4u32, 4, 9, 36, 0, 17, 17, 17].iter().enumerate() {
            table.update(*s).unwrap();
            if i % 3 == 0 {
                table.update(20).unwrap();
            }
        }

        for target in 0..table.total() {
            let s = table.find(target).unwrap();
            let (low, freq) = table.interval(s).unwrap();
            assert!(low <= target && target < low + freq, "target {target} symbol {s}");
        }
    }

    #[test]
    fn test_rescale_keeps_observed_symbols() {
        let mut table = FrequencyTable::new(4, TableInit::EscapeOnly);
        for _ in 0..(MAX_TOTAL / ADAPT_INCREMENT + 10) {
            table.update(2).unwrap();
        }
        assert!(table.total() <= MAX_TOTAL);
        assert!(u64::from(table.total()) <= MAX_DENOMINATOR);
        assert!(table.frequency(0) >= 1);
        assert!(table.frequency(2) > 1);
        assert_eq!(table.frequency(1), 0);
        assert_eq!(table.total(), table.cumulative(4));
    }

    #[test]
    fn test_update_out_of_range() {
        let mut table = FrequencyTable::new(2, TableInit::Uniform);
        assert!(table.update(2).is_none());
        assert_eq!(table.total(), 2);
    }
}
