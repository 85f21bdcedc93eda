//! Process environment abstractions for the qmatmul engine.

pub mod guard;
pub mod qmm;
pub mod value;

use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use qmm::QmmEnvVar;

/// Namespaced environment variable identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnvVar {
    /// Variables read by the quantized matmul engine.
    Qmm(QmmEnvVar),
}

impl From<QmmEnvVar> for EnvVar {
    fn from(value: QmmEnvVar) -> Self {
        Self::Qmm(value)
    }
}

impl EnvVar {
    /// Retrieve the canonical environment variable key for the identifier.
    pub const fn key(self) -> &'static str {
        match self {
            EnvVar::Qmm(inner) => inner.key(),
        }
    }
}

/// Process environment facade that centralises access and synchronisation.
pub struct Environment;

impl Environment {
    /// Acquire the global environment mutex, ensuring serialised mutations.
    ///
    /// A poisoned mutex is recovered rather than propagated; the guarded data is `()`.
    pub fn lock() -> MutexGuard<'static, ()> {
        static ENV_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_MUTEX.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read the environment variable as a UTF-8 string if present.
    pub fn get(var: impl Into<EnvVar>) -> Option<String> {
        let var = var.into();
        std::env::var(var.key()).ok()
    }

    /// Set the environment variable using the provided UTF-8 value.
    ///
    /// Acquires the global mutex internally. Use [`Environment::lock`] when several
    /// mutations need to share one critical section.
    pub fn set(var: impl Into<EnvVar>, value: &str) {
        let var = var.into();
        let mut guard = Self::lock();
        Self::set_locked(var, value, &mut guard);
    }

    /// Remove the environment variable from the process environment.
    pub fn remove(var: impl Into<EnvVar>) {
        let var = var.into();
        let mut guard = Self::lock();
        Self::remove_locked(var, &mut guard);
    }

    /// Set the environment variable while reusing an existing environment lock.
    ///
    /// # Safety
    ///
    /// `std::env::set_var` is `unsafe` because concurrent mutation of the process
    /// environment is undefined behaviour. The guard parameter proves the caller
    /// holds the global environment mutex.
    pub(crate) fn set_locked(var: EnvVar, value: &str, _guard: &mut MutexGuard<'static, ()>) {
        // SAFETY: the caller holds the global environment mutex.
        unsafe { std::env::set_var(var.key(), value) };
    }

    /// Remove the environment variable while reusing an existing environment lock.
    ///
    /// # Safety
    ///
    /// Same requirements as [`Environment::set_locked`].
    pub(crate) fn remove_locked(var: EnvVar, _guard: &mut MutexGuard<'static, ()>) {
        // SAFETY: the caller holds the global environment mutex.
        unsafe { std::env::remove_var(var.key()) };
    }
}
