use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounds how many work items may execute at once
///
/// One counting gate serves every execution model: cooperative tasks await
/// [`acquire`](Self::acquire), OS threads park in
/// [`acquire_blocking`](Self::acquire_blocking). Both hand out an
/// [`AdmissionPermit`] that frees its slot when dropped, so release happens
/// on the failure path and on cancellation without any explicit call.
///
/// The cap is fixed at construction. Admission order is not FIFO-guaranteed.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    semaphore: Arc<Semaphore>,
    max_concurrency: usize,
    in_flight: AtomicUsize,
    high_water_mark: AtomicUsize,
}

impl AdmissionController {
    pub fn new(max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            inner: Arc::new(Inner {
                semaphore: Arc::new(Semaphore::new(max_concurrency)),
                max_concurrency,
                in_flight: AtomicUsize::new(0),
                high_water_mark: AtomicUsize::new(0),
            }),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.inner.max_concurrency
    }

    /// Items currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Largest number of permits ever held at the same time
    pub fn high_water_mark(&self) -> usize {
        self.inner.high_water_mark.load(Ordering::Acquire)
    }

    /// Wait for a slot without blocking the scheduler thread
    pub async fn acquire(&self) -> AdmissionPermit {
        let permit = self
            .inner
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("admission semaphore is never closed");
        self.admit(permit)
    }

    /// Park the calling OS thread until a slot frees up
    ///
    /// Must not be called from a thread that is driving the async runtime.
    pub fn acquire_blocking(&self) -> AdmissionPermit {
        let permit = futures::executor::block_on(self.inner.semaphore.clone().acquire_owned())
            .expect("admission semaphore is never closed");
        self.admit(permit)
    }

    fn admit(&self, permit: OwnedSemaphorePermit) -> AdmissionPermit {
        let now = self.inner.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.inner.high_water_mark.fetch_max(now, Ordering::AcqRel);
        AdmissionPermit {
            _permit: permit,
            inner: self.inner.clone(),
        }
    }
}

/// A held admission slot, released on drop
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
    inner: Arc<Inner>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.inner.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
