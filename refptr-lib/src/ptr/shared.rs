use core::{fmt, ops::Deref, ptr::NonNull};

use super::{
    counter::{release, Counter},
    counter_update::RefCounterUpdate,
    direct::Direct,
    weak::Weak,
};

/// A strong handle to a reference counted object.
///
/// The managed object is alive as long as at least one strong handle
/// refers to its block. A handle is either empty or it contributes exactly
/// one to the strong count of its block.
pub struct Shared<T: ?Sized> {
    inner: Option<Inner<T>>,
}

struct Inner<T: ?Sized> {
    counter: NonNull<dyn Counter>,
    /// Cached address of the managed object: the same object the block
    /// owns, possibly through an unsizing conversion.
    ptr: NonNull<T>,
}

impl<T: ?Sized> Clone for Inner<T> {
    #[inline(always)]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Inner<T> {}

/// The strong half of the two-phase protocol: the object is destroyed on
/// the `1 -> 0` strong transition, the block storage is released only if
/// no weak handle is left to observe it.
unsafe fn strong_release(counter: NonNull<dyn Counter>) {
    let header = counter.as_ref().header();
    if header.strong_update(RefCounterUpdate::Release) == 1 {
        counter.as_ref().destroy();
        if header.weak_update(RefCounterUpdate::Read) == 0 {
            release(counter);
        }
    }
}

impl<T: ?Sized> Shared<T> {
    /// An empty handle, referring to no block.
    pub const fn new() -> Self {
        Self { inner: None }
    }
    /// Adopts an object allocated independently of its control block.
    ///
    /// An unsizing conversion of the box at the call site creates a handle
    /// to a related type, `Shared::<dyn Any>::from_box(Box::new(42))`. The
    /// adopted allocation is still deallocated with the layout of the
    /// concrete pointee.
    pub fn from_box(object: Box<T>) -> Self
    where
        T: 'static,
    {
        let ptr = NonNull::from(Box::leak(object));
        let counter: &mut dyn Counter = Box::leak(Box::new(Direct::new(ptr)));
        unsafe { Self::from_counter(NonNull::from(counter), ptr) }
    }
    /// Shares ownership of an existing block, incrementing its strong
    /// count. `ptr` must address the object owned by `counter`.
    pub unsafe fn from_counter(counter: NonNull<dyn Counter>, ptr: NonNull<T>) -> Self {
        counter.as_ref().header().strong_update(RefCounterUpdate::AddRef);
        Self {
            inner: Some(Inner { counter, ptr }),
        }
    }
    pub fn get(&self) -> Option<&T> {
        self.inner.as_ref().map(|i| unsafe { i.ptr.as_ref() })
    }
    /// The strong count of the block, or zero for an empty handle.
    pub fn use_count(&self) -> isize {
        match &self.inner {
            Some(i) => unsafe { i.counter.as_ref() }
                .header()
                .strong_update(RefCounterUpdate::Read),
            None => 0,
        }
    }
    /// The weak count of the block, or zero for an empty handle.
    pub fn weak_count(&self) -> isize {
        match &self.inner {
            Some(i) => unsafe { i.counter.as_ref() }
                .header()
                .weak_update(RefCounterUpdate::Read),
            None => 0,
        }
    }
    /// Releases the referenced block and leaves the handle empty.
    pub fn reset(&mut self) {
        if let Some(i) = self.inner.take() {
            unsafe { strong_release(i.counter) };
        }
    }
    /// Unique access to the managed object: available only while this is
    /// the single strong handle and no weak handle observes the block.
    pub fn try_to_mut(&mut self) -> Option<&mut T> {
        let i = self.inner?;
        let header = unsafe { i.counter.as_ref() }.header();
        if header.strong_update(RefCounterUpdate::Read) == 1
            && header.weak_update(RefCounterUpdate::Read) == 0
        {
            Some(unsafe { &mut *i.ptr.as_ptr() })
        } else {
            None
        }
    }
    /// A handle to a related type, sharing the same block.
    ///
    /// `f` converts the object address and must return the same object,
    /// typically through an unsizing cast:
    /// `Shared::cast(&x, |p| p as *mut dyn Any)`. A conversion between
    /// unrelated types does not compile.
    pub fn cast<U: ?Sized>(this: &Self, f: impl FnOnce(*mut T) -> *mut U) -> Shared<U> {
        match &this.inner {
            Some(i) => {
                let ptr = f(i.ptr.as_ptr());
                assert_eq!(
                    ptr.cast::<()>(),
                    i.ptr.as_ptr().cast::<()>(),
                    "cast changed the object address"
                );
                unsafe { Shared::from_counter(i.counter, NonNull::new_unchecked(ptr)) }
            }
            None => Shared::new(),
        }
    }
    /// Observes the handle without owning the object.
    ///
    /// Observing an empty handle is a contract violation.
    pub fn downgrade(this: &Self) -> Weak<T> {
        match &this.inner {
            Some(i) => unsafe { Weak::from_counter(i.counter, i.ptr) },
            None => panic!("observing an empty handle"),
        }
    }
    /// `true` iff both handles refer to the same block, or both are empty.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        match (&this.inner, &other.inner) {
            (Some(a), Some(b)) => {
                a.counter.as_ptr().cast::<()>() == b.counter.as_ptr().cast::<()>()
            }
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: ?Sized> Default for Shared<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + 'static> From<Box<T>> for Shared<T> {
    fn from(object: Box<T>) -> Self {
        Self::from_box(object)
    }
}

impl<T: ?Sized> Clone for Shared<T> {
    fn clone(&self) -> Self {
        match &self.inner {
            Some(i) => unsafe { Self::from_counter(i.counter, i.ptr) },
            None => Self::new(),
        }
    }
}

impl<T: ?Sized> Drop for Shared<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: ?Sized> Deref for Shared<T> {
    type Target = T;
    fn deref(&self) -> &T {
        match self.get() {
            Some(object) => object,
            None => panic!("dereferenced an empty handle"),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("use_count", &self.use_count())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use core::sync::atomic::{AtomicIsize, Ordering};

    use wasm_bindgen_test::wasm_bindgen_test;

    use super::Shared;

    #[test]
    #[wasm_bindgen_test]
    fn test_empty() {
        let x = Shared::<i32>::new();
        assert_eq!(x.get(), None);
        assert_eq!(x.use_count(), 0);
        assert_eq!(x.weak_count(), 0);
        let y = x.clone();
        assert_eq!(y.use_count(), 0);
        assert!(Shared::ptr_eq(&x, &y));
        assert!(Shared::ptr_eq(&x, &Shared::default()));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_use_count() {
        let a = Shared::from_box(Box::new(5));
        assert_eq!(a.use_count(), 1);
        assert_eq!(*a, 5);
        {
            let b = a.clone();
            assert_eq!(a.use_count(), 2);
            assert_eq!(b.use_count(), 2);
            assert!(Shared::ptr_eq(&a, &b));
        }
        assert_eq!(a.use_count(), 1);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_destroyed_once() {
        static DROPPED: AtomicIsize = AtomicIsize::new(0);

        struct A();

        impl Drop for A {
            fn drop(&mut self) {
                DROPPED.fetch_add(1, Ordering::Relaxed);
            }
        }

        {
            let a = Shared::from_box(Box::new(A()));
            let b = a.clone();
            let c = b.clone();
            assert_eq!(c.use_count(), 3);
            assert_eq!(DROPPED.load(Ordering::Relaxed), 0);
        }
        assert_eq!(DROPPED.load(Ordering::Relaxed), 1);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_move() {
        let a = Shared::from_box(Box::new(7));
        let b = a;
        assert_eq!(b.use_count(), 1);
        assert_eq!(*b, 7);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_self_assignment() {
        let mut a = Shared::from_box(Box::new(7));
        #[allow(clippy::redundant_clone)]
        {
            a = a.clone();
        }
        assert_eq!(a.use_count(), 1);
        assert_eq!(*a, 7);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_reset() {
        static DROPPED: AtomicIsize = AtomicIsize::new(0);

        #[derive(Debug, PartialEq)]
        struct A();

        impl Drop for A {
            fn drop(&mut self) {
                DROPPED.fetch_add(1, Ordering::Relaxed);
            }
        }

        let mut a = Shared::from_box(Box::new(A()));
        let b = a.clone();
        a.reset();
        assert_eq!(a.get(), None);
        assert_eq!(a.use_count(), 0);
        assert_eq!(b.use_count(), 1);
        assert_eq!(DROPPED.load(Ordering::Relaxed), 0);
        a.reset();
        assert_eq!(DROPPED.load(Ordering::Relaxed), 0);
        drop(b);
        assert_eq!(DROPPED.load(Ordering::Relaxed), 1);
    }

    #[test]
    #[should_panic]
    #[wasm_bindgen_test]
    fn test_deref_empty() {
        let x = Shared::<i32>::new();
        let _ = *x;
    }

    trait Shape {
        fn area(&self) -> i32;
    }

    struct Square(i32);

    impl Shape for Square {
        fn area(&self) -> i32 {
            self.0 * self.0
        }
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_cast() {
        let a = Shared::from_box(Box::new(Square(3)));
        let b: Shared<dyn Shape> = Shared::cast(&a, |p| p as *mut dyn Shape);
        assert_eq!(a.use_count(), 2);
        assert_eq!(b.use_count(), 2);
        assert_eq!(b.area(), 9);
        assert_eq!(
            a.get().unwrap() as *const Square as *const (),
            b.get().unwrap() as *const dyn Shape as *const ()
        );
        drop(a);
        assert_eq!(b.use_count(), 1);
        assert_eq!(b.area(), 9);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_cast_empty() {
        let a = Shared::<Square>::new();
        let b: Shared<dyn Shape> = Shared::cast(&a, |p| p as *mut dyn Shape);
        assert_eq!(b.use_count(), 0);
        assert_eq!(b.get().map(|s| s.area()), None);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_from_unsized_box() {
        let a: Shared<dyn Shape> = Shared::from_box(Box::new(Square(4)));
        assert_eq!(a.use_count(), 1);
        assert_eq!(a.area(), 16);
        let b = Shared::from(Box::new(Square(5)));
        assert_eq!(b.area(), 25);
        assert!(!Shared::ptr_eq(&a, &Shared::cast(&b, |p| p as *mut dyn Shape)));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_try_to_mut() {
        let mut a = Shared::from_box(Box::new(5));
        *a.try_to_mut().unwrap() = 6;
        assert_eq!(*a, 6);
        let b = a.clone();
        assert!(a.try_to_mut().is_none());
        drop(b);
        assert!(a.try_to_mut().is_some());
        let w = Shared::downgrade(&a);
        assert!(a.try_to_mut().is_none());
        drop(w);
        assert!(a.try_to_mut().is_some());
        assert!(Shared::<i32>::new().try_to_mut().is_none());
    }
}
