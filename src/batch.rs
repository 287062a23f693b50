/// Split `records` into contiguous slices of `size`; the last one may be
/// shorter.
///
/// # Panics
///
/// If `size` is zero. `ImporterConfig::validate` rules this out for the
/// importer's batch and chunk sizes.
pub fn partition<T>(records: &[T], size: usize) -> impl Iterator<Item = &[T]> {
    assert!(size > 0, "batch size must be non-zero");
    records.chunks(size)
}
