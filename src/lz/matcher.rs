//! This module implements a reusable Lempel–Ziv matcher. The matcher works on
//! a buffer whose first part is history: those bytes are indexed so that
//! matches can point at them, but no literals or matches are produced for
//! them.
use crate::error::{Error, Result};
use std::fmt;
use std::ops::Range;

/// Used to mark empty cells.
const EMPTY_CELL: u32 = 0xffffffff;
/// The minimum size of the match word.
pub const MIN_MATCH: usize = 4;
/// The optimal parser searches again, and tries every length, only for
/// matches up to this long.
const LONG_MATCH: usize = 128;

/// A literal region followed by a match region. Both are absolute indices
/// into the matcher input; an empty match ends the stream.
pub type Sequence = (Range<usize>, Range<usize>);

/// Input positions are re-based once this many bytes were evicted.
const REBASE_LIMIT: usize = 1 << 30;

/// The hash table of a matcher. A compression session keeps one table for
/// all of its blocks, so only the new bytes of each block get hashed.
///
/// A cell holds 'position + shift', where 'shift' counts the bytes that were
/// dropped from the front of the input since the last rebase. Cells below
/// 'shift' point at evicted bytes.
#[derive(Default)]
pub struct MatchTable {
    cells: Vec<u32>,
    /// The (DICT_SIZE_BITS, DICT_BANKS) shape of 'cells'.
    shape: (usize, usize),
    shift: usize,
    /// Input positions below this one were already considered for the table.
    indexed: usize,
}

impl MatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the cells on first use, or when the shape changes.
    fn prepare(&mut self, bits: usize, banks: usize) {
        if self.shape != (bits, banks) || self.cells.is_empty() {
            self.cells = vec![EMPTY_CELL; (1 << bits) * banks];
            self.shape = (bits, banks);
            self.shift = 0;
            self.indexed = 0;
        }
    }

    /// Forget every position. The cells are reallocated on the next use.
    pub fn reset(&mut self) {
        self.cells = Vec::new();
        self.shift = 0;
        self.indexed = 0;
    }

    /// Record that the first 'count' bytes of the input were dropped.
    pub fn consume(&mut self, count: usize) {
        self.indexed = self.indexed.saturating_sub(count);
        self.shift += count;
        if self.shift < REBASE_LIMIT {
            return;
        }
        let shift = self.shift;
        for cell in self.cells.iter_mut() {
            if *cell != EMPTY_CELL {
                *cell = match (*cell as usize).checked_sub(shift) {
                    Some(pos) => pos as u32,
                    None => EMPTY_CELL,
                };
            }
        }
        self.shift = 0;
    }
}

impl fmt::Debug for MatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchTable")
            .field("shape", &self.shape)
            .field("shift", &self.shift)
            .field("indexed", &self.indexed)
            .finish()
    }
}

/// A Lempel–Ziv dictionary. Parameters:
/// MAX_MATCH controls the maximum length of matches.
/// DICT_SIZE_BITS Controls the size of the cache (1<<x).
/// DICT_BANKS number of ways in the LRU cache.
struct LzDictionary<
    'a,
    const MAX_MATCH: usize,
    const DICT_SIZE_BITS: usize,
    const DICT_BANKS: usize,
> {
    /// The input to tokenize.
    input: &'a [u8],
    /// Maps a sequence of bytes to their index in the sequence.
    /// The match could be a hash collision or an uninitialized value.
    /// Matches may reside in one of the rotating LRU banks.
    table: &'a mut MatchTable,
    /// Matches may not reach back further than this.
    max_offset: usize,
}

impl<
        'a,
        const MAX_MATCH: usize,
        const DICT_SIZE_BITS: usize,
        const DICT_BANKS: usize,
    > LzDictionary<'a, MAX_MATCH, DICT_SIZE_BITS, DICT_BANKS>
{
    pub fn new(
        input: &'a [u8],
        table: &'a mut MatchTable,
        max_offset: usize,
    ) -> Self {
        table.prepare(DICT_SIZE_BITS, DICT_BANKS);
        Self {
            input,
            table,
            max_offset,
        }
    }

    /// Index the history that precedes 'start' and is not in the table yet.
    pub fn prime(&mut self, start: usize) {
        let last = self.input.len().saturating_sub(MIN_MATCH - 1);
        for idx in self.table.indexed..start.min(last) {
            self.save_match(idx);
        }
    }

    /// Returns the length of the input string
    pub fn len(&self) -> usize {
        self.input.len()
    }

    fn get_bytes_at(&self, idx: usize) -> u32 {
        let bytes = &self.input[idx..idx + 4];
        u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn hash_to_index(val: u32) -> usize {
        let val = val.wrapping_mul(0x797124e5);
        let val = val >> (32 - DICT_SIZE_BITS);
        val as usize
    }

    /// Return True if we can prove that this match is not longer than the best
    /// match.
    fn early_disqualify(&self, a: usize, b: usize, best_size: usize) -> bool {
        debug_assert!(a < b, "Pointer b must come after pointer a");
        b + best_size < self.input.len()
            && self.input[a + best_size] != self.input[b + best_size]
    }

    /// Return the size of a string that starts at 'a' and 'b' indices.
    /// The index 'a' must come before 'b'.
    fn get_match_length(&self, a: usize, b: usize) -> usize {
        debug_assert!(a < b, "Pointer b must come after pointer a");
        let end = self.input.len().min(b + MAX_MATCH);
        let limit = end - b;
        self.input[a..a + limit]
            .iter()
            .zip(&self.input[b..end])
            .take_while(|(x, y)| x == y)
            .count()
    }

    /// Return a match to a previous string that matches a string that starts at
    /// 'idx'.
    fn get_match(&self, idx: usize) -> Range<usize> {
        let dic_idx = self.get_match_candidate(idx);
        let mut best = 0..0;

        for i in 0..DICT_BANKS {
            let cell = self.table.cells[dic_idx * DICT_BANKS + i];
            // The banks are ordered by age, so every later entry is evicted
            // or too far.
            if cell == EMPTY_CELL || (cell as usize) < self.table.shift {
                break;
            }
            let loc = cell as usize - self.table.shift;
            if loc >= idx {
                continue;
            }
            let offset = idx - loc;
            if offset > self.max_offset {
                break;
            }
            if self.early_disqualify(loc, idx, best.len()) {
                continue;
            }
            let len = self.get_match_length(loc, idx);
            if best.len() < len {
                best = loc..loc + len;
            }
        }

        if best.len() >= MIN_MATCH {
            best
        } else {
            0..0
        }
    }

    /// Return a possible match candidate for a string that starts at 'idx'.
    fn get_match_candidate(&self, idx: usize) -> usize {
        Self::hash_to_index(self.get_bytes_at(idx))
    }

    /// Save the value at index 'idx' to the LRU dictionary.
    fn save_match(&mut self, idx: usize) {
        let dic_idx = self.get_match_candidate(idx);
        let base = dic_idx * DICT_BANKS;
        let cells = &mut self.table.cells;
        cells.copy_within(base..base + DICT_BANKS - 1, base + 1);
        cells[base] = (idx + self.table.shift) as u32;
        self.table.indexed = self.table.indexed.max(idx + 1);
    }

    /// Grow the match region backwards into the literal section.
    /// This is necessary because an earlier match may fail because
    /// of a hash collision or a match that's too short.
    /// Returns the number of bytes that can be removed from the literal region.
    /// The grown match stays within MAX_MATCH.
    fn grow_match_backwards(
        &self,
        lit: &Range<usize>,
        mat: &Range<usize>,
    ) -> usize {
        if mat.start <= lit.len() || mat.is_empty() || lit.is_empty() {
            return 0;
        }
        let mut match_ptr = mat.start - 1;
        let mut lit_ptr = lit.end - 1;
        let mut i = 0;
        let limit = lit.len().min(MAX_MATCH.saturating_sub(mat.len()));

        while i < limit && self.input[match_ptr] == self.input[lit_ptr] {
            match_ptr -= 1;
            lit_ptr -= 1;
            i += 1;
        }
        i
    }
}

/// A Lempel–Ziv based matcher. It performs parsing with a lookahead window of
/// 'PARSE_SEARCH' items.
pub struct Matcher<
    'a,
    const MAX_MATCH: usize,
    const DICT_SIZE_BITS: usize,
    const DICT_BANKS: usize,
    const PARSE_SEARCH: usize,
> {
    dict: LzDictionary<'a, MAX_MATCH, DICT_SIZE_BITS, DICT_BANKS>,
    /// The iterator location in the input.
    cursor: usize,
}

impl<
        'a,
        const MAX_MATCH: usize,
        const DICT_SIZE_BITS: usize,
        const DICT_BANKS: usize,
        const PARSE_SEARCH: usize,
    > Matcher<'a, MAX_MATCH, DICT_SIZE_BITS, DICT_BANKS, PARSE_SEARCH>
{
    /// Tokenize all of 'input'.
    pub fn new(
        input: &'a [u8],
        table: &'a mut MatchTable,
        max_offset: usize,
    ) -> Self {
        Self::with_history(input, 0, table, max_offset)
    }

    /// Tokenize 'input[start..]', allowing matches into 'input[..start]'.
    /// 'table' may already index a prefix of the history.
    pub fn with_history(
        input: &'a [u8],
        start: usize,
        table: &'a mut MatchTable,
        max_offset: usize,
    ) -> Self {
        let mut dict = LzDictionary::new(input, table, max_offset);
        dict.prime(start);
        Self {
            dict,
            cursor: start,
        }
    }

    /// Return the next literal and match regions, which could be empty.
    fn get_next_match_region(&mut self) -> Option<Sequence> {
        let mut lit = self.cursor..self.cursor;
        let input_len = self.dict.len();
        if self.cursor == input_len {
            return None;
        }

        'outer: while self.cursor + MIN_MATCH < input_len {
            let mat = self.dict.get_match(self.cursor);
            self.dict.save_match(self.cursor);

            if !mat.is_empty() {
                // Non-greedy parsing: check if one of the next few positions
                // starts a longer match.
                // http://fastcompression.blogspot.com/2011/12/advanced-parsing-strategies.html
                let end_of_buffer = self.cursor + MIN_MATCH * 2 > input_len;
                if !end_of_buffer {
                    for i in 1..PARSE_SEARCH {
                        let mat2 = self.dict.get_match(self.cursor + i);
                        if !mat2.is_empty() && mat2.len() >= mat.len() + i {
                            self.cursor += i;
                            lit = lit.start..lit.end + i;
                            continue 'outer;
                        }
                    }
                }

                let reduce = self.dict.grow_match_backwards(&lit, &mat);

                // Index the positions covered by the match, except the one
                // that the next iteration starts at.
                let start = self.cursor + 1;
                let stop = (start + mat.len()).min(input_len - MIN_MATCH) - 1;
                for i in start..stop {
                    self.dict.save_match(i);
                }

                self.cursor += mat.len();
                let mat = mat.start - reduce..mat.end;
                lit = lit.start..lit.end - reduce;
                return Some((lit, mat));
            }

            self.cursor += 1;
            lit = lit.start..lit.end + 1;
        }

        // Too close to the end of the buffer for another match.
        self.cursor = input_len;
        lit = lit.start..input_len;
        Some((lit, 0..0))
    }
}

/// A Lempel–Ziv matcher that picks the cheapest parse of the whole input
/// instead of the locally best match.
pub struct OptimalMatcher<
    const MAX_MATCH: usize,
    const DICT_SIZE_BITS: usize,
    const DICT_BANKS: usize,
> {
    matches: std::vec::IntoIter<Sequence>,
}

impl<
        'a,
        const MAX_MATCH: usize,
        const DICT_SIZE_BITS: usize,
        const DICT_BANKS: usize,
    > OptimalMatcher<MAX_MATCH, DICT_SIZE_BITS, DICT_BANKS>
{
    pub fn new(input: &'a [u8], table: &mut MatchTable, max_offset: usize) -> Self {
        Self::with_history(input, 0, table, max_offset)
    }

    pub fn with_history(
        input: &'a [u8],
        start: usize,
        table: &mut MatchTable,
        max_offset: usize,
    ) -> Self {
        Self {
            matches: Self::get_matches(input, start, table, max_offset).into_iter(),
        }
    }

    fn get_matches(
        input: &[u8],
        start: usize,
        table: &mut MatchTable,
        max_offset: usize,
    ) -> Vec<Sequence> {
        let mut dict = LzDictionary::<MAX_MATCH, DICT_SIZE_BITS, DICT_BANKS>::new(
            input, table, max_offset,
        );
        let input_len = dict.len();
        let n = input_len - start;
        if n == 0 {
            return Vec::new();
        }
        if n <= MIN_MATCH {
            return vec![(start..input_len, 0..0)];
        }
        dict.prime(start);

        // First, collect the longest match at every position.
        // Inside a long match the next position matches one byte less from
        // the same distance.
        let mut all_matches: Vec<Range<usize>> = Vec::with_capacity(n);
        let mut prev = 0..0;
        for cursor in start..input_len - MIN_MATCH {
            let mat = if prev.len() > LONG_MATCH {
                prev.start + 1..prev.end
            } else {
                dict.get_match(cursor)
            };
            dict.save_match(cursor);
            prev = mat.clone();
            all_matches.push(mat);
        }
        all_matches.resize(n, 0..0);

        // Next, walk backwards and compute the cheapest cost to the end of the
        // buffer from every position. This drops unprofitable matches and
        // shortens the rest. Positions are relative to 'start'.
        let match_cost = 3;
        let mut distance_to_end: Vec<usize> = vec![usize::MAX; n + 1];
        distance_to_end[n] = 0;
        for i in (0..n).rev() {
            let mat = all_matches[i].clone();
            let no_match_cost = distance_to_end[i + 1] + 1;
            if mat.is_empty() {
                distance_to_end[i] = no_match_cost;
                continue;
            }

            // Long matches only try their full length and the short ones.
            let short = mat.len().min(LONG_MATCH);
            let lengths = std::iter::once(mat.len())
                .filter(|len| *len > short)
                .chain((MIN_MATCH..short + 1).rev());
            let mut lowest = no_match_cost;
            for len in lengths {
                let taken_match_cost = match_cost + distance_to_end[i + len];
                if lowest >= taken_match_cost {
                    lowest = taken_match_cost;
                    all_matches[i] = mat.start..mat.start + len;
                }
            }
            if lowest == no_match_cost || all_matches[i].len() < MIN_MATCH {
                all_matches[i] = 0..0;
            }
            distance_to_end[i] = lowest;
        }

        // Finally, construct the list of selected matches and literal ranges.
        let mut lit = start..start;
        let mut curr = start;
        let mut selected_matches = Vec::new();

        while curr < input_len {
            let mat = all_matches[curr - start].clone();
            if mat.is_empty() {
                lit = lit.start..lit.end + 1;
                curr += 1;
                continue;
            }
            let reduce = dict.grow_match_backwards(&lit, &mat);
            curr += mat.len();
            selected_matches
                .push((lit.start..lit.end - reduce, mat.start - reduce..mat.end));
            lit = curr..curr;
        }
        selected_matches.push((lit, 0..0));

        selected_matches
    }
}

/// Implement the iterator trait for the matcher.
impl<
        'a,
        const MAX_MATCH: usize,
        const DICT_SIZE_BITS: usize,
        const DICT_BANKS: usize,
        const PARSE_SEARCH: usize,
    > Iterator
    for Matcher<'a, MAX_MATCH, DICT_SIZE_BITS, DICT_BANKS, PARSE_SEARCH>
{
    type Item = Sequence;

    fn next(&mut self) -> Option<Sequence> {
        self.get_next_match_region()
    }
}

/// Implement the iterator trait for the optimal matcher.
impl<const MAX_MATCH: usize, const DICT_SIZE_BITS: usize, const DICT_BANKS: usize>
    Iterator for OptimalMatcher<MAX_MATCH, DICT_SIZE_BITS, DICT_BANKS>
{
    type Item = Sequence;

    fn next(&mut self) -> Option<Self::Item> {
        self.matches.next()
    }
}

/// Select the LZ matcher and matcher parameters based on the compression
/// 'level'. The matcher tokenizes 'input[start..]' and may refer back into
/// 'input[..start]' up to 'max_offset' bytes. 'table' carries the hashed
/// history between calls.
/// 'MAX_LEN' specifies the maximum length of matches.
pub fn select_matcher<'a, const MAX_LEN: usize>(
    level: u8,
    input: &'a [u8],
    start: usize,
    table: &'a mut MatchTable,
    max_offset: usize,
) -> Result<Box<dyn Iterator<Item = Sequence> + 'a>> {
    let (s, t, o) = (start, table, max_offset);
    Ok(match level {
        1 => Box::new(Matcher::<'a, MAX_LEN, 14, 1, 1>::with_history(input, s, t, o)),
        2 => Box::new(Matcher::<'a, MAX_LEN, 15, 2, 1>::with_history(input, s, t, o)),
        3 => Box::new(Matcher::<'a, MAX_LEN, 16, 2, 1>::with_history(input, s, t, o)),
        4 => Box::new(Matcher::<'a, MAX_LEN, 16, 4, 2>::with_history(input, s, t, o)),
        5 => Box::new(Matcher::<'a, MAX_LEN, 16, 8, 2>::with_history(input, s, t, o)),
        6 => Box::new(Matcher::<'a, MAX_LEN, 17, 8, 2>::with_history(input, s, t, o)),
        7 => Box::new(Matcher::<'a, MAX_LEN, 17, 12, 2>::with_history(input, s, t, o)),
        8 => Box::new(Matcher::<'a, MAX_LEN, 17, 16, 2>::with_history(input, s, t, o)),
        9 => Box::new(Matcher::<'a, MAX_LEN, 18, 16, 4>::with_history(input, s, t, o)),
        10 => Box::new(OptimalMatcher::<MAX_LEN, 17, 16>::with_history(input, s, t, o)),
        11 => Box::new(OptimalMatcher::<MAX_LEN, 18, 32>::with_history(input, s, t, o)),
        12 => Box::new(OptimalMatcher::<MAX_LEN, 18, 64>::with_history(input, s, t, o)),
        _ => {
            return Err(Error::InvalidParameter(format!(
                "no matcher for level {}",
                level
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_rebase_drops_evicted_positions() {
        let input = b"0123456789abcdef0123456789abcdef";
        let mut table = MatchTable::new();
        let seqs: Vec<_> = Matcher::<256, 10, 4, 1>::new(input, &mut table, 1024).collect();
        assert_eq!(seqs[0].1, 0..16);
        assert!(table.indexed > 16 && table.indexed <= input.len());

        // Evicting everything before a rebase hides the old positions.
        table.consume(16);
        assert_eq!(table.shift, 16);
        table.consume(REBASE_LIMIT);
        assert_eq!(table.shift, 0);
        assert!(table.cells.iter().all(|c| *c == EMPTY_CELL));
    }

    #[test]
    fn test_table_is_reused_across_calls() {
        let first = b"the quick brown fox jumps over the lazy dog. ".to_vec();
        let mut both = first.clone();
        both.extend_from_slice(&first);

        let mut table = MatchTable::new();
        Matcher::<256, 12, 4, 2>::new(&first, &mut table, 1 << 16).for_each(drop);
        let indexed = table.indexed;

        // The second call only hashes the bytes that were not seen yet.
        let seqs: Vec<_> =
            Matcher::<256, 12, 4, 2>::with_history(&both, first.len(), &mut table, 1 << 16)
                .collect();
        assert!(indexed > 0 && table.indexed > indexed);
        assert_eq!(seqs[0], (first.len()..first.len(), 0..first.len()));
    }
}
