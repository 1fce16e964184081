//! Bounded parallel map.

use futures::future::try_join_all;
use ripple_core::{Error, Result};
use std::fmt::Display;
use std::future::Future;
use tokio::sync::Semaphore;
use tracing::trace;

/// Runs `selector` over every item with at most `max_concurrency` calls in
/// flight, returning the results in input order.
///
/// The first failing call fails the whole operation with
/// [`Error::Selector`] naming the item's position; the calls still pending
/// are dropped together with their permits. A `max_concurrency` of zero is
/// rejected with [`Error::InvalidArgument`] before any call is made.
///
/// ```rust
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> ripple_core::Result<()> {
/// use ripple_reactive::select_parallel;
///
/// let doubled = select_parallel(vec![1, 2, 3], |x| async move { Ok::<_, String>(x * 2) }, 2).await?;
/// assert_eq!(doubled, vec![2, 4, 6]);
/// # Ok(())
/// # }
/// ```
pub async fn select_parallel<T, U, E, F, Fut>(
    items: impl IntoIterator<Item = T>,
    selector: F,
    max_concurrency: usize,
) -> Result<Vec<U>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = std::result::Result<U, E>>,
    E: Display,
{
    if max_concurrency == 0 {
        return Err(Error::invalid_argument(
            "max_concurrency",
            "at least one call must be allowed in flight",
        ));
    }

    let items: Vec<T> = items.into_iter().collect();
    trace!(items = items.len(), max_concurrency, "select_parallel started");

    let permits = Semaphore::new(max_concurrency.min(Semaphore::MAX_PERMITS));
    let (permits, selector) = (&permits, &selector);
    let calls = items.into_iter().enumerate().map(|(index, item)| async move {
        let _permit = permits.acquire().await.map_err(|_| Error::Disposed)?;
        selector(item)
            .await
            .map_err(|error| Error::selector(index, error))
    });

    try_join_all(calls).await
}
