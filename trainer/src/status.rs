/// Whether epoch-level status logging is active for `epoch`.
#[inline]
pub(crate) fn epoch_status_enabled(every: usize, epoch: usize) -> bool {
    every > 0 && epoch % every == 0
}

/// Whether the batch starting at sample `batch * batch_size` crosses a
/// status boundary. Fires for the batch containing every `every`-th sample.
#[inline]
pub(crate) fn sample_status_enabled(every: usize, batch: usize, batch_size: usize) -> bool {
    every > 0 && batch * batch_size % every < batch_size
}
