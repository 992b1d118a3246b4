use netloom_core::error::{ErrorKind, Result};

use crate::{parser, query::QueryParam, uri::Uri};

/// Options for synthesizing a URI.
///
/// All fields are borrowed; empty means absent. Either `query_string` or
/// `query_params` may be set, never both.
#[derive(Clone, Copy, Debug, Default)]
pub struct UriBuilder<'a> {
    /// Scheme, emitted with a `://` suffix when non-empty.
    pub scheme: &'a [u8],
    /// Host name portion of the authority.
    pub host_name: &'a [u8],
    /// Port; 0 means unspecified and nothing is emitted.
    pub port: u16,
    /// Path, emitted verbatim.
    pub path: &'a [u8],
    /// Pre-encoded query string, emitted after a `?`.
    pub query_string: &'a [u8],
    /// Key/value pairs, joined with `=` and `&` and emitted after a `?`.
    pub query_params: &'a [QueryParam<'a>],
}

impl Uri {
    /// Synthesizes a URI from builder options.
    ///
    /// The output buffer is sized from an upper bound over the options, so
    /// emission never reallocates, and the result is reparsed so the
    /// record's views always reflect a round-tripped parse.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when both query forms are given; `MalformedUri`
    /// when the synthesized text does not parse.
    pub fn from_builder(options: &UriBuilder<'_>) -> Result<Uri> {
        if !options.query_string.is_empty() && !options.query_params.is_empty() {
            return Err(ErrorKind::InvalidArgument(
                "query_string and query_params are mutually exclusive",
            ));
        }

        let mut buffer_size = 0;
        if !options.scheme.is_empty() {
            // 3 for "://"
            buffer_size += options.scheme.len() + 3;
        }
        buffer_size += options.host_name.len();
        if options.port != 0 {
            // ':' plus at most 5 digits of a 16 bit integer
            buffer_size += 6;
        }
        buffer_size += options.path.len();
        if !options.query_params.is_empty() {
            // 1 for the '?', then 2 per param for '=' and '&'; slightly
            // over for the last param, which is fine for an upper bound
            buffer_size += 1;
            for param in options.query_params {
                buffer_size += param.key.len() + param.value.len() + 2;
            }
        } else if !options.query_string.is_empty() {
            buffer_size += 1 + options.query_string.len();
        }

        let mut buffer = Vec::with_capacity(buffer_size);
        if !options.scheme.is_empty() {
            buffer.extend_from_slice(options.scheme);
            buffer.extend_from_slice(b"://");
        }
        buffer.extend_from_slice(options.host_name);
        if options.port != 0 {
            buffer.push(b':');
            buffer.extend_from_slice(options.port.to_string().as_bytes());
        }
        buffer.extend_from_slice(options.path);
        if !options.query_params.is_empty() {
            buffer.push(b'?');
            for (index, param) in options.query_params.iter().enumerate() {
                if index > 0 {
                    buffer.push(b'&');
                }
                buffer.extend_from_slice(param.key);
                buffer.push(b'=');
                buffer.extend_from_slice(param.value);
            }
        } else if !options.query_string.is_empty() {
            buffer.push(b'?');
            buffer.extend_from_slice(options.query_string);
        }

        parser::parse(buffer)
    }
}
