//! Raw delta streaming without the controller.

use bytes::Bytes;
use chatwire_types::{Delta, StreamError, TransportError};
use futures::{Stream, StreamExt};

use crate::pipeline::ChunkPipeline;

/// Turn a response body into a stream of [`Delta`]s.
///
/// The stream ends after the first error, after a delta with `is_end`, or
/// when the body ends. Unparseable frames are skipped.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use chatwire::stream_deltas;
/// use futures::StreamExt;
///
/// # futures::executor::block_on(async {
/// let body = futures::stream::iter(vec![Ok(Bytes::from_static(
///     b"data: {\"result\":\"Hi\",\"is_end\":true}\n",
/// ))]);
/// let deltas: Vec<_> = stream_deltas(body, 1024).collect().await;
/// assert_eq!(deltas.len(), 1);
/// # });
/// ```
pub fn stream_deltas(
    byte_stream: impl Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
    max_frame_bytes: usize,
) -> impl Stream<Item = Result<Delta, StreamError>> + Send + 'static {
    async_stream::stream! {
        let mut pipeline = ChunkPipeline::new(max_frame_bytes);
        let mut byte_stream = std::pin::pin!(byte_stream);

        while let Some(chunk_result) = byte_stream.next().await {
            let chunk = match chunk_result {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(StreamError::Transport(e));
                    return;
                }
            };
            tracing::trace!(len = chunk.len(), "chunk received");

            match pipeline.ingest(&chunk) {
                Ok(deltas) => {
                    for delta in deltas {
                        let is_end = delta.is_end;
                        yield Ok(delta);
                        if is_end {
                            return;
                        }
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        match pipeline.finish() {
            Ok(deltas) => {
                for delta in deltas {
                    let is_end = delta.is_end;
                    yield Ok(delta);
                    if is_end {
                        return;
                    }
                }
            }
            Err(e) => yield Err(e),
        }
    }
}
