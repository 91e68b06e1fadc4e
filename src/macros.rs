#![allow(unused_macros)]

/// Helper macro for locking items
///
/// ```rust, ignore
///  let _guard = lock!(self.build_lock);
///  // build and publish the shadow match
/// ```
macro_rules! lock {
    ($lock:expr) => {
        $lock.lock().expect("Failed to acquire lock")
    };
}

/// Helper macro for reading locked items
///
/// ```rust, ignore
///  let state = read_lock!(self.state);
///  println!("{}", state.expression);
/// ```
macro_rules! read_lock {
    ($rwlock:expr) => {
        $rwlock.read().expect("Failed to acquire read lock")
    };
}

/// Helper macro for writing to locked items
///
/// ```rust, ignore
///  let mut compiled = write_lock!(self.compiled);
///  *compiled = None;
/// ```
macro_rules! write_lock {
    ($rwlock:expr) => {
        $rwlock.write().expect("Failed to acquire write lock")
    };
}

/// Helper macro for reading a value out of locked state
///
/// ```rust, ignore
///  let text = with_read!(self.state, |state: &PointcutState| state.expression.clone());
/// ```
macro_rules! with_read {
    ($rwlock:expr, $closure:expr) => {{
        let guard = $rwlock.read().expect("Failed to acquire read lock");
        $closure(&*guard)
    }};
}

/// Helper macro for modifying locked state in place
///
/// ```rust, ignore
///  with_write!(instance.fields, |fields: &mut HashMap<_, _>| fields.clear());
/// ```
macro_rules! with_write {
    ($rwlock:expr, $closure:expr) => {{
        let mut guard = $rwlock.write().expect("Failed to acquire write lock");
        $closure(&mut *guard)
    }};
}
