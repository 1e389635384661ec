use core::cell::{RefCell, RefMut};

/// Interior mutability for data that is only ever touched by one hart.
///
/// Borrowing twice panics instead of corrupting state, so callers must drop
/// the guard before switching to another kernel stack.
pub struct UPSafeCell<T> {
    inner: RefCell<T>,
}

unsafe impl<T> Sync for UPSafeCell<T> {}

impl<T> UPSafeCell<T> {
    /// # Safety
    /// The value must only be used on a uniprocessor.
    pub unsafe fn new(value: T) -> Self {
        Self {
            inner: RefCell::new(value),
        }
    }

    pub fn exclusive_access(&self) -> RefMut<'_, T> {
        self.inner.borrow_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_access_mutates() {
        let cell = unsafe { UPSafeCell::new(1usize) };
        *cell.exclusive_access() += 41;
        assert_eq!(*cell.exclusive_access(), 42);
    }

    #[test]
    #[should_panic]
    fn test_double_borrow_panics() {
        let cell = unsafe { UPSafeCell::new(0usize) };
        let _first = cell.exclusive_access();
        let _second = cell.exclusive_access();
    }
}
