use std::sync::Arc;

/// ByteCursor is a reference-counted, sliceable view over immutable bytes.
///
/// It holds an `Arc<Vec<u8>>` plus a (start, len) window, allowing cheap
/// zero-copy slicing and advancing that still dereferences to `&[u8]`.
/// Asynchronous socket writes hold a cursor, so the bytes stay alive for
/// as long as a transmission is in flight regardless of what happens to
/// the message they came from.
#[derive(Clone, PartialEq, Eq)]
pub struct ByteCursor {
    data: Arc<Vec<u8>>,
    start: usize,
    len: usize,
}

impl ByteCursor {
    /// Creates a new cursor from a Vec by taking ownership.
    pub fn from_vec(vec: Vec<u8>) -> Self {
        let len = vec.len();
        Self { data: Arc::new(vec), start: 0, len }
    }

    /// Creates a new cursor covering a shared buffer in full.
    pub fn from_arc(data: Arc<Vec<u8>>) -> Self {
        let len = data.len();
        Self { data, start: 0, len }
    }

    /// Creates a sub-view into the current window without copying.
    /// Panics if the requested range is out of bounds.
    pub fn slice(&self, start: usize, len: usize) -> Self {
        assert!(start <= self.len, "slice start out of bounds");
        assert!(start + len <= self.len, "slice end out of bounds");
        Self { data: self.data.clone(), start: self.start + start, len }
    }

    /// Consumes `count` bytes from the front of the view.
    /// Panics if `count` exceeds the remaining length.
    pub fn advance(&mut self, count: usize) {
        assert!(count <= self.len, "advance past end of cursor");
        self.start += count;
        self.len -= count;
    }

    /// Returns the current view as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.start..self.start + self.len]
    }

    /// Returns the length of the current view.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the view is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the reference count of the underlying buffer.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.data)
    }

    /// Converts the cursor into owned bytes if this is the only reference.
    /// Otherwise, clones the viewed range.
    pub fn into_owned(self) -> Vec<u8> {
        match Arc::try_unwrap(self.data) {
            Ok(mut vec) => {
                if self.start == 0 && self.len == vec.len() {
                    vec
                } else {
                    vec.drain(self.start..self.start + self.len).collect()
                }
            }
            Err(arc) => arc[self.start..self.start + self.len].to_vec(),
        }
    }
}

impl From<Vec<u8>> for ByteCursor {
    fn from(v: Vec<u8>) -> Self {
        Self::from_vec(v)
    }
}

impl AsRef<[u8]> for ByteCursor {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::fmt::Debug for ByteCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteCursor")
            .field("len", &self.len)
            .field("ref_count", &self.ref_count())
            .finish()
    }
}
