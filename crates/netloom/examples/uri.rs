//! Parse a URI from the command line and print its components, then
//! rebuild it through the builder.
//!
//! ```text
//! cargo run --example uri -- "https://example.com:8443/a/b?x=1&y="
//! ```

use netloom::{Uri, UriBuilder};

fn main() {
    let input = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com:8443/a/b?x=1&y=".to_string());

    let uri = match Uri::parse(&input) {
        Ok(uri) => uri,
        Err(err) => {
            eprintln!("failed to parse {:?}: {}", input, err);
            std::process::exit(1);
        }
    };

    println!("scheme:         {}", String::from_utf8_lossy(uri.scheme()));
    println!("authority:      {}", String::from_utf8_lossy(uri.authority()));
    println!("host name:      {}", String::from_utf8_lossy(uri.host_name()));
    println!("port:           {}", uri.port());
    println!("path:           {}", String::from_utf8_lossy(uri.path()));
    println!("path and query: {}", String::from_utf8_lossy(uri.path_and_query()));
    println!("query string:   {}", String::from_utf8_lossy(uri.query_string()));

    let mut params = Vec::new();
    uri.query_params(&mut params);
    for param in &params {
        println!(
            "param:          {} = {}",
            String::from_utf8_lossy(param.key),
            String::from_utf8_lossy(param.value)
        );
    }

    // Round-trip the components through the builder.
    let rebuilt = Uri::from_builder(&UriBuilder {
        scheme: uri.scheme(),
        host_name: uri.host_name(),
        port: uri.port(),
        path: uri.path(),
        query_params: &params,
        ..Default::default()
    })
    .unwrap();

    println!("rebuilt:        {}", rebuilt);
}
