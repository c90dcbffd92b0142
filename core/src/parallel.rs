//! Scoped fork/join helpers.
//!
//! [`ThreadPool::scope`] spawns borrowed tasks that are all joined before the
//! call returns. [`ThreadPool::parallel_for`] builds on it to split a slice
//! into contiguous chunks, one per worker.
//!
//! On WASM every task runs inline on the calling thread.

/// A fork/join executor with a fixed worker count.
///
/// # Example
///
/// ```
/// use vesper_core::parallel::ThreadPool;
///
/// let pool = ThreadPool::new(4);
///
/// let mut results = vec![0u32; 4];
/// pool.scope(|s| {
///     for (i, slot) in results.iter_mut().enumerate() {
///         s.spawn(move || {
///             *slot = (i as u32) * 10;
///         });
///     }
/// });
/// assert_eq!(results, vec![0, 10, 20, 30]);
/// ```
#[derive(Debug, Clone)]
pub struct ThreadPool {
    num_threads: usize,
}

impl ThreadPool {
    /// Creates a pool that splits work across `num_threads` workers.
    pub fn new(num_threads: usize) -> Self {
        Self {
            num_threads: num_threads.max(1),
        }
    }

    /// Creates a pool sized to the number of available CPU cores.
    pub fn default_threads() -> Self {
        Self::new(std::thread::available_parallelism().map_or(1, |n| n.get()))
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Executes tasks within a scoped context.
    ///
    /// All tasks spawned within the closure complete before this method
    /// returns, so they may borrow from the caller's stack.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn scope<'env, F, R>(&self, f: F) -> R
    where
        F: for<'scope> FnOnce(&Scope<'scope, 'env>) -> R,
    {
        std::thread::scope(|s| {
            let scope = Scope { inner: s };
            f(&scope)
        })
    }

    /// Executes tasks within a scoped context (WASM: sequential).
    #[cfg(target_arch = "wasm32")]
    pub fn scope<'env, F, R>(&self, f: F) -> R
    where
        F: for<'scope> FnOnce(&Scope<'scope, 'env>) -> R,
    {
        let scope = Scope {
            _marker: std::marker::PhantomData,
        };
        f(&scope)
    }

    /// Calls `f(index, item)` for every element of `items`, in parallel.
    ///
    /// The slice is cut into at most [`num_threads`](Self::num_threads)
    /// contiguous chunks. Returns once every call has finished.
    pub fn parallel_for<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync,
    {
        if items.is_empty() {
            return;
        }
        let chunk_size = items.len().div_ceil(self.num_threads);
        if chunk_size == items.len() {
            for (index, item) in items.iter_mut().enumerate() {
                f(index, item);
            }
            return;
        }

        let f = &f;
        self.scope(|s| {
            for (chunk_index, chunk) in items.chunks_mut(chunk_size).enumerate() {
                let base = chunk_index * chunk_size;
                s.spawn(move || {
                    for (offset, item) in chunk.iter_mut().enumerate() {
                        f(base + offset, item);
                    }
                });
            }
        });
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::default_threads()
    }
}

/// A scope for spawning tasks that must complete before the scope exits.
#[cfg(not(target_arch = "wasm32"))]
pub struct Scope<'scope, 'env: 'scope> {
    inner: &'scope std::thread::Scope<'scope, 'env>,
}

#[cfg(not(target_arch = "wasm32"))]
impl<'scope, 'env> Scope<'scope, 'env> {
    /// Spawns a task on a new scoped thread.
    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'scope,
    {
        self.inner.spawn(f);
    }

    /// Spawns a task and returns a handle to its result.
    pub fn spawn_with_result<F, R>(&self, f: F) -> TaskHandle<'scope, R>
    where
        F: FnOnce() -> R + Send + 'scope,
        R: Send + 'scope,
    {
        TaskHandle {
            inner: self.inner.spawn(f),
        }
    }
}

/// Result of a task spawned with [`Scope::spawn_with_result`].
#[cfg(not(target_arch = "wasm32"))]
pub struct TaskHandle<'scope, R> {
    inner: std::thread::ScopedJoinHandle<'scope, R>,
}

#[cfg(not(target_arch = "wasm32"))]
impl<R> TaskHandle<'_, R> {
    /// Waits for the task and returns its result.
    ///
    /// A panic inside the task is resumed on the joining thread.
    pub fn join(self) -> R {
        match self.inner.join() {
            Ok(value) => value,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }
}

/// A scope for spawning tasks (WASM: sequential execution).
#[cfg(target_arch = "wasm32")]
pub struct Scope<'scope, 'env: 'scope> {
    _marker: std::marker::PhantomData<(&'scope (), &'env ())>,
}

#[cfg(target_arch = "wasm32")]
impl<'scope, 'env> Scope<'scope, 'env> {
    /// Spawns a task within this scope (WASM: executes immediately).
    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'scope,
    {
        f();
    }

    /// Runs the task immediately and stores its result.
    pub fn spawn_with_result<F, R>(&self, f: F) -> TaskHandle<'scope, R>
    where
        F: FnOnce() -> R + Send + 'scope,
        R: Send + 'scope,
    {
        TaskHandle {
            value: f(),
            _marker: std::marker::PhantomData,
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub struct TaskHandle<'scope, R> {
    value: R,
    _marker: std::marker::PhantomData<&'scope ()>,
}

#[cfg(target_arch = "wasm32")]
impl<R> TaskHandle<'_, R> {
    pub fn join(self) -> R {
        self.value
    }
}
