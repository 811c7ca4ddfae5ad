mod macros;

/// Version string reported by the CLI and sent as part of the `User-Agent`
/// header of outgoing requests.
pub const fn folio_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub trait Apply {
    /// Applies the function `f` with a mutable reference to `self`.
    fn with<X>(mut self, f: impl FnOnce(&mut Self) -> X) -> Self
    where
        Self: Sized,
    {
        f(&mut self);
        self
    }

    /// Passes `self` through `f`, which allows chaining free functions like
    /// methods.
    fn apply<U>(self, f: impl FnOnce(Self) -> U) -> U
    where
        Self: Sized,
    {
        f(self)
    }

    /// Applies the function `f` only if `value` is `Some(...)` and provides the
    /// contained value to `f`.
    ///
    /// #### Example
    /// ```rust
    /// # use folio_utils::Apply;
    /// fn add_option(a: i32, b: Option<i32>) -> i32 {
    ///     a.apply_map(b, |slf, arg| slf + arg)
    /// }
    /// assert_eq!(add_option(1, None), 1);
    /// assert_eq!(add_option(1, Some(2)), 3);
    /// ```
    fn apply_map<U>(self, value: Option<U>, f: impl FnOnce(Self, U) -> Self) -> Self
    where
        Self: Sized,
    {
        if let Some(value) = value {
            f(self, value)
        } else {
            self
        }
    }

    /// Applies the function `f` only if `condition` is `true`.
    fn apply_if(self, condition: bool, f: impl FnOnce(Self) -> Self) -> Self
    where
        Self: Sized,
    {
        if condition {
            f(self)
        } else {
            self
        }
    }
}

impl<T> Apply for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_if() {
        assert_eq!(1.apply_if(true, |x| x + 1), 2);
        assert_eq!(1.apply_if(false, |x| x + 1), 1);
    }

    #[test]
    fn apply() {
        assert_eq!(2.apply(|x| x * 3), 6);
    }

    #[test]
    fn with() {
        let result = Vec::new().with(|v| v.push(7));
        assert_eq!(result, [7]);
    }
}
