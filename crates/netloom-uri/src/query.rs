use crate::uri::Uri;

/// A single key/value pair from a URI query string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryParam<'a> {
    /// Key bytes, borrowed from the source.
    pub key: &'a [u8],
    /// Value bytes, borrowed from the source. Empty when the pair had no
    /// `=`.
    pub value: &'a [u8],
}

impl Uri {
    /// Splits the query string on `&` and appends one [`QueryParam`] per
    /// piece to `out`.
    ///
    /// Within a piece, the first `=` separates key from value; a piece
    /// without `=` becomes a key with an empty value. The views borrow
    /// from this URI's buffer.
    pub fn query_params<'a>(&'a self, out: &mut Vec<QueryParam<'a>>) {
        let query = self.query_string();
        if query.is_empty() {
            return;
        }

        for piece in query.split(|&b| b == b'&') {
            match piece.iter().position(|&b| b == b'=') {
                Some(at) => out.push(QueryParam {
                    key: &piece[..at],
                    value: &piece[at + 1..],
                }),
                None => out.push(QueryParam { key: piece, value: &[] }),
            }
        }
    }
}
