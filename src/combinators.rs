//! Folding multicast results.
//!
//! Each helper takes anything iterable, so it works with the `Vec` returned by
//! [`Object::call_all`](crate::Object::call_all). The boolean helpers also come
//! as sinks for [`Object::call_all_with`](crate::Object::call_all_with), which
//! stop calling implementers as soon as the answer is known.

use std::cmp::Ordering;
use std::iter::Sum;

/// True if every result is true. Vacuously true for no implementers.
pub fn all(results: impl IntoIterator<Item = bool>) -> bool {
    results.into_iter().all(|result| result)
}

/// True if any result is true.
pub fn any(results: impl IntoIterator<Item = bool>) -> bool {
    results.into_iter().any(|result| result)
}

pub fn sum<T: Sum<T>>(results: impl IntoIterator<Item = T>) -> T {
    results.into_iter().sum()
}

/// Largest result by `PartialOrd`, so floats work. Ties keep the earlier result.
pub fn max<T: PartialOrd>(results: impl IntoIterator<Item = T>) -> Option<T> {
    results.into_iter().fold(None, |best, result| match best {
        Some(best) if result.partial_cmp(&best) != Some(Ordering::Greater) => Some(best),
        _ => Some(result),
    })
}

/// Smallest result by `PartialOrd`.
pub fn min<T: PartialOrd>(results: impl IntoIterator<Item = T>) -> Option<T> {
    results.into_iter().fold(None, |best, result| match best {
        Some(best) if result.partial_cmp(&best) != Some(Ordering::Less) => Some(best),
        _ => Some(result),
    })
}

/// Sink computing [`all`] that stops at the first `false`.
///
/// ```ignore
/// let mut ready = true;
/// object.call_all_with(&IS_READY, (), combinators::all_sink(&mut ready))?;
/// ```
pub fn all_sink(out: &mut bool) -> impl FnMut(bool) -> bool + '_ {
    *out = true;
    move |result| {
        *out &= result;
        *out
    }
}

/// Sink computing [`any`] that stops at the first `true`.
pub fn any_sink(out: &mut bool) -> impl FnMut(bool) -> bool + '_ {
    *out = false;
    move |result| {
        *out |= result;
        !*out
    }
}
