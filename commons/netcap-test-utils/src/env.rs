//! Environment variable test helpers.
//!
//! Guards restore the previous value on drop. Every [`Env`] also holds a
//! process-wide lock so tests touching the environment never interleave.

use std::sync::{Mutex, MutexGuard};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// RAII guard that restores (or unsets) the original value when dropped.
pub struct EnvGuard {
    key: String,
    prev: Option<String>,
}

impl EnvGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        unsafe {
            match self.prev {
                Some(ref v) => std::env::set_var(&self.key, v),
                None => std::env::remove_var(&self.key),
            }
        }
    }
}

fn guard_for(key: &str) -> EnvGuard {
    EnvGuard {
        key: key.to_string(),
        prev: std::env::var(key).ok(),
    }
}

/// Set a variable, returning a guard that restores the previous value.
pub fn set_env_guarded(key: &str, val: &str) -> EnvGuard {
    let guard = guard_for(key);
    unsafe { std::env::set_var(key, val) }
    guard
}

/// Unset a variable, returning a guard that restores it.
pub fn remove_env_guarded(key: &str) -> EnvGuard {
    let guard = guard_for(key);
    unsafe { std::env::remove_var(key) }
    guard
}

/// Serialised set of environment overrides. Dropping restores all keys in
/// reverse order, then releases the lock.
pub struct Env {
    guards: Vec<EnvGuard>,
    _lock: MutexGuard<'static, ()>,
}

impl Env {
    pub fn new() -> Self {
        Self {
            guards: Vec::new(),
            _lock: ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner()),
        }
    }

    pub fn set(mut self, key: &str, val: &str) -> Self {
        self.guards.push(set_env_guarded(key, val));
        self
    }

    pub fn unset(mut self, key: &str) -> Self {
        self.guards.push(remove_env_guarded(key));
        self
    }

    /// Clears every variable starting with `prefix`, e.g. `NETCAP_`, so a
    /// developer shell cannot leak into the test.
    pub fn clear_prefixed(mut self, prefix: &str) -> Self {
        let keys: Vec<String> = std::env::vars()
            .map(|(k, _)| k)
            .filter(|k| k.starts_with(prefix))
            .collect();
        for k in keys {
            self.guards.push(remove_env_guarded(&k));
        }
        self
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Env {
    fn drop(&mut self) {
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restores_previous_values() {
        {
            let _env = Env::new().set("NETCAP_TEST_UTILS_A", "1");
            assert_eq!(std::env::var("NETCAP_TEST_UTILS_A").as_deref(), Ok("1"));
        }
        assert!(std::env::var("NETCAP_TEST_UTILS_A").is_err());
    }

    #[test]
    fn nested_overrides_unwind_in_reverse() {
        let _env = Env::new()
            .set("NETCAP_TEST_UTILS_B", "outer")
            .set("NETCAP_TEST_UTILS_B", "inner");
        assert_eq!(
            std::env::var("NETCAP_TEST_UTILS_B").as_deref(),
            Ok("inner")
        );
        drop(_env);
        assert!(std::env::var("NETCAP_TEST_UTILS_B").is_err());
    }
}
