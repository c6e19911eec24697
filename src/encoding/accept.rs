//! `Accept-Encoding` parsing.

use http::header::ACCEPT_ENCODING;
use http::HeaderMap;

use super::Encoding;

/// The set of codings a client is willing to receive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcceptEncoding {
    brotli: bool,
    gzip: bool,
    deflate: bool,
}

impl AcceptEncoding {
    /// Accept nothing but identity.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Accept exactly the listed codings.
    pub fn of(encodings: &[Encoding]) -> Self {
        let mut accept = Self::default();
        for &encoding in encodings {
            accept.set(encoding, true);
        }
        accept
    }

    /// Collect every `Accept-Encoding` header of a request.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let values: Vec<&str> = headers
            .get_all(ACCEPT_ENCODING)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        Self::parse(&values.join(","))
    }

    /// Parse a header value such as `gzip, deflate;q=0.5, br;q=0`.
    ///
    /// A coding with weight zero is refused. A `*` with non-zero weight
    /// accepts every coding not explicitly listed.
    pub fn parse(value: &str) -> Self {
        let mut accept = Self::default();
        let mut listed = Self::default();
        let mut wildcard = false;

        for item in value.split(',') {
            let mut parts = item.split(';');
            let token = parts.next().unwrap_or("").trim();
            if token.is_empty() {
                continue;
            }
            let acceptable = parts.all(|param| !is_zero_weight(param));

            if token == "*" {
                wildcard = acceptable;
            } else if let Some(encoding) = Encoding::from_label(token) {
                listed.set(encoding, true);
                accept.set(encoding, acceptable);
            }
        }

        if wildcard {
            for encoding in Encoding::PRIORITY {
                if !listed.accepts(encoding) {
                    accept.set(encoding, true);
                }
            }
        }

        accept
    }

    pub fn accepts(&self, encoding: Encoding) -> bool {
        match encoding {
            Encoding::Brotli => self.brotli,
            Encoding::Gzip => self.gzip,
            Encoding::Deflate => self.deflate,
        }
    }

    /// Whether any non-identity coding is acceptable.
    pub fn any(&self) -> bool {
        self.brotli || self.gzip || self.deflate
    }

    fn set(&mut self, encoding: Encoding, value: bool) {
        match encoding {
            Encoding::Brotli => self.brotli = value,
            Encoding::Gzip => self.gzip = value,
            Encoding::Deflate => self.deflate = value,
        }
    }
}

fn is_zero_weight(param: &str) -> bool {
    let Some((name, value)) = param.split_once('=') else {
        return false;
    };
    if !name.trim().eq_ignore_ascii_case("q") {
        return false;
    }
    value
        .trim()
        .parse::<f32>()
        .map(|q| q <= 0.0)
        .unwrap_or(false)
}
