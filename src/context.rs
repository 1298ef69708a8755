//! Thread-local [`Context`] propagation, so call sites can attach
//! correlation/trace fields once per request and have every subsequent log
//! call on that thread pick them up automatically.

use std::cell::RefCell;

use crate::level::Context;

thread_local! {
    static CURRENT: RefCell<Option<Context>> = const { RefCell::new(None) };
}

/// Replace the thread's current context.
pub fn set(context: Context) {
    CURRENT.with(|cell| *cell.borrow_mut() = Some(context));
}

/// Clone the thread's current context, if any.
pub fn get() -> Option<Context> {
    CURRENT.with(|cell| cell.borrow().clone())
}

/// Remove the thread's current context.
pub fn clear() {
    CURRENT.with(|cell| *cell.borrow_mut() = None);
}

/// Attach a correlation id to the thread's current context, creating one if
/// absent.
pub fn add_correlation(correlation_id: impl Into<String>) {
    CURRENT.with(|cell| {
        let mut slot = cell.borrow_mut();
        let ctx = slot.get_or_insert_with(Context::new);
        ctx.add_correlation(correlation_id);
    });
}
