//! Popup scoping.
//!
//! Sub-forms of the admin UI open in their own window. Every read or write
//! inside one follows the same shape: open, run the body, close, and put the
//! main window back in focus whatever the body returned.
//!
//! ```rust,ignore
//! driver.open_popup(script).await?;
//! let outcome = read_form(driver).await;
//! close_after(driver, outcome).await
//! ```

use tracing::warn;

use crate::{Driver, Error};

/// Close the focused popup and hand back `outcome`.
///
/// If the body failed, its error wins over a failure to close.
pub async fn close_after<D, T, E>(driver: &mut D, outcome: Result<T, E>) -> Result<T, E>
where
    D: Driver,
    E: From<Error>,
{
    let closed = driver.close_popup().await;
    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            warn!("popup close failed after error: {}", close_err);
            Err(e)
        }
    }
}
