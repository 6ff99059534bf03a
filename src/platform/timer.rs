//! Sleeping and repeating timers

/// Yield for `ms` milliseconds; zero returns immediately
#[cfg(target_arch = "wasm32")]
pub async fn sleep_ms(ms: u32) {
    if ms > 0 {
        gloo_timers::future::TimeoutFuture::new(ms).await;
    }
}

/// No timer natively: completes immediately rather than blocking the
/// executor thread
#[cfg(not(target_arch = "wasm32"))]
pub async fn sleep_ms(_ms: u32) {}

/// Repeating browser timer, cancelled when dropped
#[cfg(target_arch = "wasm32")]
pub struct Interval {
    _inner: gloo_timers::callback::Interval,
}

#[cfg(target_arch = "wasm32")]
impl Interval {
    pub fn every(ms: u32, callback: impl FnMut() + 'static) -> Self {
        Self {
            _inner: gloo_timers::callback::Interval::new(ms, callback),
        }
    }
}
