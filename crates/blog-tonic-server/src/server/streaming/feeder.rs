use crate::server::{model::BlogItem, store::BlogCursor, telemetry::increment_blogs_streamed};
use blog_tonic_core::{Error, proto::ListBlogResponse};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::Status;

type ResponseTx = mpsc::Sender<Result<ListBlogResponse, Status>>;

/// Forwards every blog yielded by `cursor` to the client stream.
///
/// This is the producer half of `ListBlog`. It owns the cursor, so the cursor
/// is released on every exit path: normal completion, a decode or cursor
/// fault, client disconnect, or shutdown.
///
/// # Behavior
///
/// - Each stored blog becomes one `ListBlogResponse`, in cursor order.
/// - The first cursor error is forwarded to the client and ends the stream.
///   Blogs already sent are not retracted.
/// - If the client disconnects, returns [`Error::RequestCancelled`] without
///   reading further.
/// - If `shutdown` fires, the client receives `unavailable` and the stream
///   ends.
///
/// Returns the number of blogs delivered to the response channel.
pub async fn feed_blogs(
    mut cursor: BlogCursor,
    resp_tx: ResponseTx,
    shutdown: CancellationToken,
) -> blog_tonic_core::Result<u64> {
    let mut sent = 0;

    loop {
        let next = tokio::select! {
            biased;
            () = shutdown.cancelled() => return abort_now(&resp_tx, Error::ServiceShutdown),
            () = resp_tx.closed() => return Err(Error::RequestCancelled),
            next = cursor.next() => next,
        };

        let item: BlogItem = match next {
            None => return Ok(sent),
            Some(Ok(item)) => item,
            Some(Err(e)) => return abort(&resp_tx, e).await,
        };

        let msg = Ok(ListBlogResponse {
            blog: Some(item.into()),
        });

        tokio::select! {
            biased;
            () = shutdown.cancelled() => return abort_now(&resp_tx, Error::ServiceShutdown),
            res = resp_tx.send(msg) => {
                if res.is_err() {
                    return Err(Error::RequestCancelled);
                }
            }
        }

        sent += 1;
        increment_blogs_streamed(1);
    }
}

/// Makes a best effort to surface `err` to the client, then returns it so it
/// can be tracked upstream. The client may already be gone, in which case the
/// forward failure is only logged.
async fn abort(resp_tx: &ResponseTx, err: Error) -> blog_tonic_core::Result<u64> {
    if let Err(_e) = resp_tx.send(Err(err.clone().into())).await {
        #[cfg(feature = "tracing")]
        tracing::warn!("Failed to forward err: {}", _e);
    }
    Err(err)
}

/// Like [`abort`], but never waits on a full channel: during shutdown a slow
/// client must not hold up the drain.
fn abort_now(resp_tx: &ResponseTx, err: Error) -> blog_tonic_core::Result<u64> {
    if let Err(_e) = resp_tx.try_send(Err(err.clone().into())) {
        #[cfg(feature = "tracing")]
        tracing::warn!("Failed to forward err: {}", _e);
    }
    Err(err)
}
