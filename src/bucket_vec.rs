use std::slice;

/// A simple bucketed grow-only container.
/// Optimized for many appends followed by one or more full passes, which is
/// exactly how arcs are staged before the forward-star layout is built.
/// Growing never moves already-pushed elements.
pub struct BucketVec<T, const BUCKET_SIZE: usize = 4096> {
    buckets: Vec<Vec<T>>,
    len: usize,
}

impl<T, const BUCKET_SIZE: usize> Default for BucketVec<T, BUCKET_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const BUCKET_SIZE: usize> BucketVec<T, BUCKET_SIZE> {
    pub fn new() -> Self {
        Self {
            buckets: Vec::new(),
            len: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, value: T) {
        if self
            .buckets
            .last()
            .map_or(true, |b| b.len() == BUCKET_SIZE)
        {
            self.buckets.push(Vec::with_capacity(BUCKET_SIZE));
        }

        // A bucket was just pushed if the last one was full or missing.
        if let Some(bucket) = self.buckets.last_mut() {
            bucket.push(value);
        }
        self.len += 1;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<&T> {
        self.buckets.get(i / BUCKET_SIZE)?.get(i % BUCKET_SIZE)
    }

    /// Drops every element and releases the bucket storage.
    pub fn clear(&mut self) {
        self.buckets = Vec::new();
        self.len = 0;
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            bucket_iter: self.buckets.iter(),
            elem_iter: None,
            remaining: self.len,
        }
    }
}

impl<'a, T, const BUCKET_SIZE: usize> IntoIterator for &'a BucketVec<T, BUCKET_SIZE> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'a, T> {
    bucket_iter: slice::Iter<'a, Vec<T>>,
    elem_iter: Option<slice::Iter<'a, T>>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(ref mut elems) = self.elem_iter {
                if let Some(item) = elems.next() {
                    self.remaining -= 1;
                    return Some(item);
                }
            }

            let bucket = self.bucket_iter.next()?;
            self.elem_iter = Some(bucket.iter());
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_spans_buckets_in_push_order() {
        let mut bv = BucketVec::<u32, 4>::new();
        for i in 0..10 {
            bv.push(i);
        }
        assert_eq!(bv.len(), 10);
        assert_eq!(bv.iter().len(), 10);
        assert_eq!(bv.iter().copied().collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());
        assert_eq!(bv.get(5), Some(&5));
        assert_eq!(bv.get(10), None);
    }

    #[test]
    fn clear_releases_everything() {
        let mut bv = BucketVec::<u8, 2>::new();
        bv.push(1);
        bv.push(2);
        bv.push(3);
        bv.clear();
        assert!(bv.is_empty());
        assert_eq!(bv.iter().next(), None);
        bv.push(7);
        assert_eq!(bv.get(0), Some(&7));
    }
}
