use netloom_core::error::{ErrorKind, Result};

use crate::uri::{Span, Uri};

/// Parser states, entered in order. Failure at any point abandons the
/// buffer and surfaces `MalformedUri`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ParserState {
    Scheme,
    Authority,
    Path,
    QueryString,
    Finished,
}

fn find(haystack: &[u8], needle: u8) -> Option<usize> {
    haystack.iter().position(|&b| b == needle)
}

/// Runs the state machine over `buffer`, consuming it into a [`Uri`].
pub(crate) fn parse(buffer: Vec<u8>) -> Result<Uri> {
    let mut uri = Uri {
        buffer,
        scheme: Span::default(),
        authority: Span::default(),
        host_name: Span::default(),
        port: 0,
        path: Span::default(),
        path_and_query: Span::default(),
        query_string: Span::default(),
        synthetic_root: false,
    };

    let mut state = ParserState::Scheme;
    let mut pos = 0;
    while state != ParserState::Finished {
        state = match state {
            ParserState::Scheme => parse_scheme(&mut uri, &mut pos)?,
            ParserState::Authority => parse_authority(&mut uri, &mut pos)?,
            ParserState::Path => parse_path(&mut uri, &mut pos)?,
            ParserState::QueryString => parse_query_string(&mut uri, &mut pos)?,
            ParserState::Finished => unreachable!(),
        };
    }

    Ok(uri)
}

fn parse_scheme(uri: &mut Uri, pos: &mut usize) -> Result<ParserState> {
    let rest = &uri.buffer[*pos..];

    let colon = match find(rest, b':') {
        Some(at) => at,
        None => return Ok(ParserState::Authority),
    };

    // Make sure we didn't just pick up an authority port by mistake.
    if colon + 1 >= rest.len() || rest[colon + 1] != b'/' {
        return Ok(ParserState::Authority);
    }

    // The scheme must be followed by the literal "://".
    if rest.len() < colon + 3 || rest[colon + 2] != b'/' {
        return Err(ErrorKind::MalformedUri);
    }

    uri.scheme = Span::new(*pos, colon);
    *pos += colon + 3;
    Ok(ParserState::Authority)
}

fn parse_authority(uri: &mut Uri, pos: &mut usize) -> Result<ParserState> {
    let rest = &uri.buffer[*pos..];
    if rest.is_empty() {
        return Err(ErrorKind::MalformedUri);
    }

    let slash = find(rest, b'/');
    let qmark = find(rest, b'?');

    let next = match (slash, qmark) {
        (None, None) => {
            // The whole remainder is the authority; the path is
            // synthesized as "/" by the accessors.
            uri.authority = Span::new(*pos, rest.len());
            uri.synthetic_root = true;
            *pos += rest.len();
            ParserState::Finished
        }
        _ => {
            // The authority runs up to whichever delimiter comes first.
            let (end, next) = match (slash, qmark) {
                (Some(s), Some(q)) if q < s => (q, ParserState::QueryString),
                (Some(s), _) => (s, ParserState::Path),
                (None, Some(q)) => (q, ParserState::QueryString),
                (None, None) => unreachable!(),
            };
            uri.authority = Span::new(*pos, end);
            *pos += end;
            next
        }
    };

    parse_host_and_port(uri)?;
    Ok(next)
}

/// Sub-parses the already-recorded authority into host name and port.
fn parse_host_and_port(uri: &mut Uri) -> Result<()> {
    let authority = uri.authority;
    let bytes = authority.slice(&uri.buffer);
    if bytes.is_empty() {
        return Ok(());
    }

    let delim = match find(bytes, b':') {
        None => {
            uri.port = 0;
            uri.host_name = authority;
            return Ok(());
        }
        Some(at) => at,
    };

    uri.host_name = Span::new(authority.start, delim);

    // 1 to 5 decimal digits, interpreting to at most 65535.
    let digits = &bytes[delim + 1..];
    if digits.is_empty() || digits.len() > 5 || !digits.iter().all(|b| b.is_ascii_digit()) {
        return Err(ErrorKind::MalformedUri);
    }

    let mut port = 0u32;
    for &digit in digits {
        port = port * 10 + u32::from(digit - b'0');
    }
    if port > u32::from(u16::MAX) {
        return Err(ErrorKind::MalformedUri);
    }

    uri.port = port as u16;
    Ok(())
}

fn parse_path(uri: &mut Uri, pos: &mut usize) -> Result<ParserState> {
    let remaining = uri.buffer.len() - *pos;
    if remaining == 0 {
        return Err(ErrorKind::MalformedUri);
    }

    uri.path_and_query = Span::new(*pos, remaining);

    let rest = &uri.buffer[*pos..];
    match find(rest, b'?') {
        None => {
            uri.path = Span::new(*pos, remaining);
            *pos += remaining;
            Ok(ParserState::Finished)
        }
        Some(at) => {
            uri.path = Span::new(*pos, at);
            *pos += at;
            Ok(ParserState::QueryString)
        }
    }
}

fn parse_query_string(uri: &mut Uri, pos: &mut usize) -> Result<ParserState> {
    // Entered straight from the authority: path and query is the whole
    // remainder, including the leading '?'.
    if uri.path_and_query.len == 0 {
        uri.path_and_query = Span::new(*pos, uri.buffer.len() - *pos);
    }

    // The '?' itself is not part of the query string.
    let remaining = uri.buffer.len() - *pos;
    if remaining > 0 {
        uri.query_string = Span::new(*pos + 1, remaining - 1);
    }

    *pos = uri.buffer.len();
    Ok(ParserState::Finished)
}
