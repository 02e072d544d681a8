// Batch splitting for size-limited API calls
//
// DescribeServices accepts at most 10 service ARNs per call, so larger
// lists are split into ordered chunks and one call is issued per chunk.

/// Per-call cardinality limit of the describe surface.
pub const DESCRIBE_BATCH_LIMIT: usize = 10;

/// Splits `items` into ordered chunks of at most `limit` elements.
///
/// Concatenating the chunks in order reproduces the input exactly. An
/// empty input yields no chunks; an input of exactly `limit` elements
/// yields one full chunk and no empty trailing chunk.
pub fn chunked<T>(items: &[T], limit: usize) -> Vec<&[T]> {
    debug_assert!(limit > 0);
    items.chunks(limit).collect()
}
