//! Before/after hooks around a callable
//!
//! [`wrap`] builds a replacement for a function that first runs a `before` hook, then
//! the original, then an `after` hook. Both hooks receive a fixed context value bound at
//! wrap time ahead of the call's own arguments. A `before` hook can short-circuit the
//! call by returning [`HookOutcome::Skip`]: neither the original nor `after` runs and the
//! caller gets the "no result" value, `R::default()`.
//!
//! Hooks observe the call; they must not change the arguments in ways that affect the
//! original's execution. The shared borrow they receive enforces this for the arguments
//! themselves but not for anything reachable through interior mutability.

use crate::error::Result;

/// What a `before` hook asks the wrapper to do with the call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    /// Run the original and then the `after` hook
    Proceed,
    /// Skip the original and the `after` hook and return the "no result" value
    Skip,
}

/// Hook run before the original: `before(custom, args)`
pub type BeforeHook<C, A> = Box<dyn Fn(&C, &A) -> Result<HookOutcome> + Send + Sync>;

/// Hook run after the original: `after(custom, result, args)`
pub type AfterHook<C, A, R> = Box<dyn Fn(&C, &R, &A) -> Result<()> + Send + Sync>;

/// Wrap `original` with optional `before` and `after` hooks
///
/// Errors from the original propagate unchanged, and so do errors from either hook; an
/// error from `before` means neither the original nor `after` runs.
///
/// # Arguments
///
/// * `original` - The callable being wrapped
/// * `custom` - Context passed to both hooks on every call
/// * `before` - Hook run before the original; may skip the call
/// * `after` - Hook run with the original's result
pub fn wrap<C, A, R, F>(
    original: F,
    custom: C,
    before: Option<BeforeHook<C, A>>,
    after: Option<AfterHook<C, A, R>>,
) -> impl Fn(&A) -> Result<R> + Send + Sync
where
    C: Send + Sync,
    A: ?Sized,
    R: Default,
    F: Fn(&A) -> Result<R> + Send + Sync,
{
    move |args: &A| {
        if let Some(before) = &before {
            if before(&custom, args)? == HookOutcome::Skip {
                return Ok(R::default());
            }
        }

        let result = original(args)?;

        if let Some(after) = &after {
            after(&custom, &result, args)?;
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MongodogError;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    fn original(log: &Log) -> impl Fn(&i64) -> Result<Option<i64>> + Send + Sync {
        let log = Arc::clone(log);
        move |x: &i64| {
            log.lock().unwrap().push(format!("original {}", x));
            Ok(Some(*x))
        }
    }

    fn before(log: &Log, outcome: HookOutcome) -> BeforeHook<&'static str, i64> {
        let log = Arc::clone(log);
        Box::new(move |custom: &&'static str, x: &i64| {
            log.lock().unwrap().push(format!("before {} {}", custom, x));
            Ok(outcome)
        })
    }

    fn after(log: &Log) -> AfterHook<&'static str, i64, Option<i64>> {
        let log = Arc::clone(log);
        Box::new(move |custom: &&'static str, result: &Option<i64>, x: &i64| {
            log.lock().unwrap().push(format!("after {} {:?} {}", custom, result, x));
            Ok(())
        })
    }

    #[test]
    fn test_hooks_run_in_order() {
        let log: Log = Arc::default();
        let wrapped = wrap(original(&log), "ctx", Some(before(&log, HookOutcome::Proceed)), Some(after(&log)));

        assert_eq!(wrapped(&5).unwrap(), Some(5));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["before ctx 5", "original 5", "after ctx Some(5) 5"]
        );
    }

    #[test]
    fn test_skip_returns_no_result() {
        let log: Log = Arc::default();
        let wrapped = wrap(original(&log), "ctx", Some(before(&log, HookOutcome::Skip)), Some(after(&log)));

        assert_eq!(wrapped(&5).unwrap(), None);
        assert_eq!(*log.lock().unwrap(), vec!["before ctx 5"]);
    }

    #[test]
    fn test_skip_then_proceed_calls_original_once() {
        let log: Log = Arc::default();
        let skipping = wrap(original(&log), "skip", Some(before(&log, HookOutcome::Skip)), None);
        let proceeding = wrap(original(&log), "go", Some(before(&log, HookOutcome::Proceed)), None);

        assert_eq!(skipping(&1).unwrap(), None);
        assert_eq!(proceeding(&1).unwrap(), Some(1));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["before skip 1", "before go 1", "original 1"]
        );
    }

    #[test]
    fn test_no_hooks_is_transparent() {
        let log: Log = Arc::default();
        let wrapped = wrap(original(&log), (), None, None);
        assert_eq!(wrapped(&9).unwrap(), Some(9));
    }

    #[test]
    fn test_before_error_aborts_call() {
        let log: Log = Arc::default();
        let failing: BeforeHook<(), i64> =
            Box::new(|_: &(), _: &i64| Err(MongodogError::OperationFailure("hook failed".to_string())));
        let wrapped = wrap(original(&log), (), Some(failing), None);

        let err = wrapped(&1).unwrap_err();
        assert_eq!(err.to_string(), "Operation failure: hook failed");
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_original_error_propagates_and_skips_after() {
        let log: Log = Arc::default();
        let failing = |_: &i64| -> Result<Option<i64>> { Err(MongodogError::Unsupported("nope".to_string())) };
        let wrapped = wrap(failing, "ctx", None, Some(after(&log)));

        assert!(matches!(wrapped(&1), Err(MongodogError::Unsupported(_))));
        assert!(log.lock().unwrap().is_empty());
    }
}
