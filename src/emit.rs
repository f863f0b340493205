//! Producer loop: drive an emitter from a sample source.

use std::future::Future;

use retro_exporter_sdk::Emitter;

use crate::source::SampleSource;

/// Push every sample from `source` into `emitter` until the source is
/// exhausted or `stop` resolves. Returns the number of samples pushed.
///
/// The emitter is left as is: the caller decides between `shutdown` (send
/// what is buffered) and `dispose`.
pub async fn pump<S, F>(emitter: &mut Emitter, mut source: S, stop: F) -> u64
where
    S: SampleSource,
    F: Future,
{
    tokio::pin!(stop);
    let mut pushed = 0;

    tracing::info!(source = source.description(), "reading samples");
    loop {
        tokio::select! {
            biased;
            _ = &mut stop => {
                tracing::info!("interrupted");
                break;
            }
            next = source.next_sample() => match next {
                Some(sample) => {
                    emitter.push_sample(&sample);
                    pushed += 1;
                }
                None => break,
            },
        }
    }

    pushed
}
