//! Typed environment variable descriptors and guard helpers.
//!
//! [`TypedEnvVar`] wraps an [`EnvVar`] with parse and format callbacks and
//! exposes getters, setters, and scoped guards that restore the previous
//! process environment state.
//!
//! # Examples
//!
//! ```
//! use qmatmul_env::LOG_LEVEL;
//! use tracing::Level;
//!
//! let guard = LOG_LEVEL.set_guard(Level::DEBUG).expect("set log level");
//! assert_eq!(*guard, Level::DEBUG);
//! ```

use std::{fmt, ops::Deref, sync::OnceLock};

use super::{EnvVar, Environment, guard::EnvVarGuard};

/// Errors emitted when interacting with typed environment variables.
#[derive(Debug, thiserror::Error)]
pub enum EnvVarError {
    /// The environment value could not be parsed into the desired type.
    #[error("failed to parse environment variable {name} from '{value}': {source}")]
    Parse {
        /// The canonical environment variable name.
        name: &'static str,
        /// The raw value retrieved from the process environment.
        value: String,
        /// The underlying parse error.
        source: EnvVarParseError,
    },
    /// The provided value could not be formatted for storage.
    #[error("failed to format environment variable {name}: {source}")]
    Format {
        /// The canonical environment variable name.
        name: &'static str,
        /// The underlying formatting error.
        source: EnvVarFormatError,
    },
}

/// Error produced by a [`TypedEnvVar`] parsing callback.
#[derive(Debug, Clone)]
pub struct EnvVarParseError {
    message: String,
}

impl EnvVarParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for EnvVarParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for EnvVarParseError {}

/// Error produced by a [`TypedEnvVar`] formatting callback.
#[derive(Debug, Clone)]
pub struct EnvVarFormatError {
    message: String,
}

impl EnvVarFormatError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for EnvVarFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for EnvVarFormatError {}

/// Callback used to parse an environment string into a concrete value.
pub type ParseFn<T> = fn(&str) -> Result<T, EnvVarParseError>;
/// Callback used to format a typed value before storing it in the environment.
pub type FormatFn<T> = fn(&T) -> Result<String, EnvVarFormatError>;

/// Descriptor for a strongly-typed environment variable.
pub struct TypedEnvVar<T> {
    var: EnvVar,
    parse: ParseFn<T>,
    format: FormatFn<T>,
}

impl<T> Clone for TypedEnvVar<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TypedEnvVar<T> {}

impl<T> TypedEnvVar<T> {
    fn format_value(&self, value: &T) -> Result<String, EnvVarError> {
        (self.format)(value).map_err(|source| EnvVarError::Format { name: self.key(), source })
    }

    /// Create a new typed descriptor using the provided callbacks.
    pub const fn new(var: EnvVar, parse: ParseFn<T>, format: FormatFn<T>) -> Self {
        Self { var, parse, format }
    }

    /// Canonical environment variable key.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.var.key()
    }

    #[must_use]
    pub const fn var(&self) -> EnvVar {
        self.var
    }

    /// Read the environment variable and parse it into the typed value.
    pub fn get(&self) -> Result<Option<T>, EnvVarError> {
        match Environment::get(self.var) {
            Some(raw) => (self.parse)(&raw).map(Some).map_err(|source| EnvVarError::Parse {
                name: self.key(),
                value: raw,
                source,
            }),
            None => Ok(None),
        }
    }

    /// Read the variable, treating a malformed value as absent.
    ///
    /// The parse failure is logged at `warn` so misconfiguration stays visible.
    #[must_use]
    pub fn get_or_warn(&self) -> Option<T> {
        match self.get() {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(variable = self.key(), error = %err, "ignoring malformed environment value");
                None
            }
        }
    }

    /// Read and cache the first value observed for this descriptor.
    ///
    /// Once cached, later process-environment mutations are not observed.
    #[must_use]
    pub fn get_cached(&self, cache: &'static OnceLock<Option<T>>) -> Option<T>
    where
        T: Clone,
    {
        cache.get_or_init(|| self.get_or_warn()).clone()
    }

    /// Set the environment variable to the provided typed value.
    pub fn set(&self, value: T) -> Result<(), EnvVarError> {
        let formatted = self.format_value(&value)?;
        Environment::set(self.var, &formatted);
        Ok(())
    }

    /// Remove the environment variable from the process environment.
    pub fn unset(&self) {
        Environment::remove(self.var);
    }

    /// Set the environment variable for the lifetime of the returned guard.
    pub fn set_guard(&self, value: T) -> Result<TypedEnvVarGuard<T>, EnvVarError> {
        let formatted = self.format_value(&value)?;
        let restore = EnvVarGuard::set(self.var, &formatted);
        Ok(TypedEnvVarGuard { value, _restore: restore })
    }

    /// Unset the environment variable for the lifetime of the guard.
    #[must_use]
    pub fn unset_guard(&self) -> EnvVarGuard {
        EnvVarGuard::unset(self.var)
    }
}

/// Guard that restores the previous state of a typed environment variable.
///
/// Restoration is delegated to an inner [`EnvVarGuard`], so the typed value can
/// be moved out with [`TypedEnvVarGuard::into_parts`] while the override stays
/// active until the returned restore guard is dropped.
pub struct TypedEnvVarGuard<T> {
    value: T,
    _restore: EnvVarGuard,
}

impl<T> TypedEnvVarGuard<T> {
    /// Split the guard into the typed value and the guard restoring the environment.
    pub fn into_parts(self) -> (T, EnvVarGuard) {
        (self.value, self._restore)
    }
}

impl<T> Deref for TypedEnvVarGuard<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
