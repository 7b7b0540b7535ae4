//! Co-occurrence triples, batches, and chunked streaming.
//!
//! Triples are validated before they enter a batch: a non-positive count
//! would make `ln(count)` undefined and an out-of-range index can never
//! select a parameter column, so either aborts the run immediately rather
//! than propagating NaN into the parameters.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{GloveError, GloveResult};

/// One co-occurrence observation: vocabulary items `row` and `column`
/// appeared together `count` times. Consumed exactly once per training pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CooccurrenceTriple {
    /// Row index in `[0, V)`; selects the context parameters.
    pub row: u32,
    /// Column index in `[0, V)`; selects the main parameters.
    pub column: u32,
    /// Co-occurrence count, strictly positive.
    pub count: f32,
}

impl CooccurrenceTriple {
    /// Check this triple against the vocabulary and the `count > 0`
    /// precondition. `position` is the triple's offset in the stream, for
    /// the error message only.
    pub fn validate(&self, vocabulary_size: usize, position: usize) -> GloveResult<()> {
        let reason = if !(self.count > 0.0) {
            Some("count must be > 0 (the loss takes ln(count))")
        } else if self.row as usize >= vocabulary_size {
            Some("row index out of vocabulary range")
        } else if self.column as usize >= vocabulary_size {
            Some("column index out of vocabulary range")
        } else {
            None
        };

        match reason {
            None => Ok(()),
            Some(reason) => Err(GloveError::InvalidTriple {
                position,
                row: self.row,
                column: self.column,
                count: self.count,
                reason: reason.to_string(),
            }),
        }
    }
}

/// A chunk of triples as three position-aligned columns, ready to become
/// the graph's input tensors. Exists only for the duration of one step.
#[derive(Debug, Clone, Default)]
pub struct TripleBatch {
    /// Co-occurrence counts, one per sample.
    pub counts: Vec<f32>,
    /// Column indices (select the main parameters).
    pub columns: Vec<u32>,
    /// Row indices (select the context parameters).
    pub rows: Vec<u32>,
}

impl TripleBatch {
    /// Build a batch from validated triples. `stream_offset` is the position
    /// of the first triple within the overall stream, for error reporting.
    pub fn from_triples(
        triples: &[CooccurrenceTriple],
        vocabulary_size: usize,
        stream_offset: usize,
    ) -> GloveResult<Self> {
        let mut batch = TripleBatch {
            counts: Vec::with_capacity(triples.len()),
            columns: Vec::with_capacity(triples.len()),
            rows: Vec::with_capacity(triples.len()),
        };
        for (offset, triple) in triples.iter().enumerate() {
            triple.validate(vocabulary_size, stream_offset + offset)?;
            batch.push(*triple);
        }
        Ok(batch)
    }

    fn push(&mut self, triple: CooccurrenceTriple) {
        self.counts.push(triple.count);
        self.columns.push(triple.column);
        self.rows.push(triple.row);
    }

    /// Number of samples in the batch.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether the batch holds no samples.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Defensive check that the three columns are position-aligned.
    pub fn check_aligned(&self) -> GloveResult<()> {
        for (context, actual) in [
            ("batch columns", self.columns.len()),
            ("batch rows", self.rows.len()),
        ] {
            if actual != self.counts.len() {
                return Err(GloveError::ShapeMismatch {
                    context,
                    expected: self.counts.len(),
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// A restartable, finite, lazy producer of co-occurrence triples.
///
/// `triples()` may be called once per epoch; each call restarts the
/// sequence from the beginning.
pub trait TripleSource {
    /// Iterator type produced per pass.
    type Iter: Iterator<Item = CooccurrenceTriple>;

    /// Start a fresh pass over the triples.
    fn triples(&self) -> Self::Iter;
}

/// Chunked pull over a triple iterator with fail-fast validation.
///
/// Yields batches of exactly `chunk_size` triples; the final batch of a
/// pass may be partial. The first invalid triple aborts the pass.
pub struct TripleLoader<I> {
    triples: I,
    chunk_size: usize,
    vocabulary_size: usize,
    consumed: usize,
}

impl<I: Iterator<Item = CooccurrenceTriple>> TripleLoader<I> {
    /// Wrap an iterator for chunked consumption.
    pub fn new(triples: I, chunk_size: usize, vocabulary_size: usize) -> Self {
        Self {
            triples,
            chunk_size,
            vocabulary_size,
            consumed: 0,
        }
    }

    /// Pull the next chunk, or `None` once the stream is exhausted.
    pub fn next_chunk(&mut self) -> GloveResult<Option<TripleBatch>> {
        let mut batch = TripleBatch::default();
        while batch.len() < self.chunk_size {
            match self.triples.next() {
                Some(triple) => {
                    triple.validate(self.vocabulary_size, self.consumed)?;
                    batch.push(triple);
                    self.consumed += 1;
                }
                None => break,
            }
        }
        if batch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }

    /// Triples consumed so far in this pass.
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

/// Seeded random triple producer, the driver used by the training binary.
///
/// Counts are uniform in `(0, 1]` (strictly positive) and indices uniform
/// over the vocabulary. The same seed is replayed on every pass, so the
/// source is restartable.
#[derive(Debug, Clone)]
pub struct RandomTripleSource {
    vocabulary_size: usize,
    len: usize,
    seed: u64,
}

impl RandomTripleSource {
    /// Create a source of `len` random triples over `vocabulary_size`.
    pub fn new(vocabulary_size: usize, len: usize, seed: u64) -> Self {
        Self {
            vocabulary_size,
            len,
            seed,
        }
    }

    /// Number of triples per pass.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the source yields no triples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl TripleSource for RandomTripleSource {
    type Iter = RandomTriples;

    fn triples(&self) -> RandomTriples {
        RandomTriples {
            rng: StdRng::seed_from_u64(self.seed),
            vocabulary_size: self.vocabulary_size as u32,
            remaining: self.len,
        }
    }
}

/// One lazy pass of a [`RandomTripleSource`].
pub struct RandomTriples {
    rng: StdRng,
    vocabulary_size: u32,
    remaining: usize,
}

impl Iterator for RandomTriples {
    type Item = CooccurrenceTriple;

    fn next(&mut self) -> Option<CooccurrenceTriple> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(CooccurrenceTriple {
            row: self.rng.gen_range(0..self.vocabulary_size),
            column: self.rng.gen_range(0..self.vocabulary_size),
            count: self.rng.gen_range(f32::EPSILON..=1.0),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(row: u32, column: u32, count: f32) -> CooccurrenceTriple {
        CooccurrenceTriple { row, column, count }
    }

    #[test]
    fn test_validate_rejects_non_positive_count() {
        for count in [0.0f32, -1.0, f32::NAN] {
            let err = triple(0, 1, count).validate(4, 7).unwrap_err();
            match err {
                GloveError::InvalidTriple { position, .. } => assert_eq!(position, 7),
                other => panic!("expected InvalidTriple, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_validate_rejects_out_of_range_indices() {
        assert!(triple(4, 0, 1.0).validate(4, 0).is_err());
        assert!(triple(0, 4, 1.0).validate(4, 0).is_err());
        assert!(triple(3, 3, 1.0).validate(4, 0).is_ok());
    }

    #[test]
    fn test_from_triples_keeps_positional_alignment() {
        let batch = TripleBatch::from_triples(
            &[triple(1, 2, 3.0), triple(4, 5, 6.0)],
            8,
            0,
        )
        .unwrap();
        assert_eq!(batch.rows, vec![1, 4]);
        assert_eq!(batch.columns, vec![2, 5]);
        assert_eq!(batch.counts, vec![3.0, 6.0]);
        assert!(batch.check_aligned().is_ok());
    }

    #[test]
    fn test_loader_chunks_exactly() {
        // 2 * chunk_size triples produce exactly 2 full chunks.
        let triples: Vec<CooccurrenceTriple> =
            (0..20).map(|i| triple(i % 4, (i + 1) % 4, 1.0)).collect();
        let mut loader = TripleLoader::new(triples.into_iter(), 10, 4);

        let first = loader.next_chunk().unwrap().unwrap();
        assert_eq!(first.len(), 10);
        let second = loader.next_chunk().unwrap().unwrap();
        assert_eq!(second.len(), 10);
        assert!(loader.next_chunk().unwrap().is_none());
        assert_eq!(loader.consumed(), 20);
    }

    #[test]
    fn test_loader_final_chunk_may_be_partial() {
        let triples: Vec<CooccurrenceTriple> =
            (0..7).map(|i| triple(i % 4, i % 4, 1.0)).collect();
        let mut loader = TripleLoader::new(triples.into_iter(), 5, 4);

        assert_eq!(loader.next_chunk().unwrap().unwrap().len(), 5);
        assert_eq!(loader.next_chunk().unwrap().unwrap().len(), 2);
        assert!(loader.next_chunk().unwrap().is_none());
    }

    #[test]
    fn test_loader_aborts_on_first_invalid_triple() {
        let triples = vec![triple(0, 1, 1.0), triple(2, 3, 0.0), triple(1, 1, 1.0)];
        let mut loader = TripleLoader::new(triples.into_iter(), 10, 4);

        let err = loader.next_chunk().unwrap_err();
        match err {
            GloveError::InvalidTriple { position, .. } => assert_eq!(position, 1),
            other => panic!("expected InvalidTriple, got {:?}", other),
        }
    }

    #[test]
    fn test_random_source_is_restartable() {
        let source = RandomTripleSource::new(16, 50, 42);
        let first: Vec<CooccurrenceTriple> = source.triples().collect();
        let second: Vec<CooccurrenceTriple> = source.triples().collect();
        assert_eq!(first.len(), 50);
        assert_eq!(first, second);
    }

    #[test]
    fn test_random_source_yields_valid_triples() {
        let source = RandomTripleSource::new(16, 200, 7);
        for (position, triple) in source.triples().enumerate() {
            triple.validate(16, position).unwrap();
        }
    }
}
