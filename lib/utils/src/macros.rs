//! Macros for defining newtype wrappers with conversion and dereference behaviors.

/// Implement `From`, `Into`, `Deref` and `DerefMut` between a newtype `$name { inner }` and `$type`.
#[macro_export]
macro_rules! impl_basic {
    ($name: ident, $type: ty) => {
        impl core::convert::From<$type> for $name {
            fn from(value: $type) -> Self {
                $name { inner: value }
            }
        }
        #[allow(clippy::from_over_into)]
        impl core::convert::Into<$type> for $name {
            fn into(self) -> $type {
                self.inner
            }
        }

        impl core::ops::Deref for $name {
            type Target = $type;

            fn deref(&self) -> &Self::Target {
                &self.inner
            }
        }

        impl core::ops::DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.inner
            }
        }
    };
}

/// Implement only `From` and read-only `Deref`, for wrappers whose inner value must not be
/// mutated in place.
#[macro_export]
macro_rules! impl_readonly {
    ($name: ident, $type: ty) => {
        impl core::convert::From<$type> for $name {
            fn from(value: $type) -> Self {
                $name { inner: value }
            }
        }

        impl core::ops::Deref for $name {
            type Target = $type;

            fn deref(&self) -> &Self::Target {
                &self.inner
            }
        }
    };
}

/// Defines a newtype struct with [core::ops::Deref] and conversions.
/// Supports variants: handle, copy, or default.
///
/// `handle` declares an opaque, copyable identifier: it can be compared, ordered and used as a
/// map key, but not mutated after creation.
#[macro_export]
macro_rules! define_struct {
    (handle, $(#[$meta: meta])* $name: ident, $type: ty) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[repr(transparent)]
        pub struct $name {
            inner: $type,
        }

        $crate::impl_readonly!($name, $type);
    };

    (copy, $(#[$meta: meta])* $name: ident, $type: ty) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone)]
        #[repr(C)]
        pub struct $name {
            inner: $type,
        }

        $crate::impl_basic!($name, $type);
    };

    ($(#[$meta: meta])* $name: ident, $type: ty) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name {
            inner: $type,
        }

        $crate::impl_basic!($name, $type);
    };
}

#[cfg(test)]
mod tests {
    define_struct!(handle, Token, usize);
    define_struct!(Bag, alloc::vec::Vec<u32>);

    extern crate alloc;

    #[test]
    fn test_handle_is_comparable_and_readable() {
        let a = Token::from(3);
        let b = Token::from(3);
        assert_eq!(a, b);
        assert_eq!(*a, 3);
        assert!(Token::from(2) < a);
    }

    #[test]
    fn test_default_variant_derefs_mutably() {
        let mut bag = Bag::from(alloc::vec![1, 2]);
        bag.push(3);
        assert_eq!(bag.len(), 3);
        let inner: alloc::vec::Vec<u32> = bag.into();
        assert_eq!(inner, [1, 2, 3]);
    }
}
