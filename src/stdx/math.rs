pub(crate) trait MathExt {
    /// Returns how many buckets of `size` are needed to hold `self` items.
    ///
    /// Used to turn a total item count into a page ceiling: a partially filled
    /// last bucket still counts as a bucket. Zero items need zero buckets.
    ///
    /// If `size` is `0`, the method returns `0`, as no bucket could ever hold
    /// anything.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// assert_eq!(0u32.buckets_of(20), 0);
    /// assert_eq!(20u32.buckets_of(20), 1);
    /// assert_eq!(45u32.buckets_of(20), 3);
    /// ```
    fn buckets_of(self, size: Self) -> Self;
}

macro_rules! impl_math_ext {
    ($($t:ty),*) => {
        $(
            impl MathExt for $t {
                fn buckets_of(self, size: Self) -> Self {
                    if size == 0 {
                        return 0;
                    }
                    self.div_ceil(size)
                }
            }
        )*
    };
}

impl_math_ext!(u8, u16, u32, u64, usize);
