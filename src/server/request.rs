//! Extraction of expressions from request shapes.

use crate::artifact::OutputKind;

/// Extract the `tex=` value from a query string or form body.
///
/// The value of the first field named exactly `tex` runs up to the next `&`
/// (or the end) and is percent-decoded. `+` is kept literally: TeX uses it
/// and clients are expected to send `%20` for spaces.
pub fn tex_param(input: &str) -> Option<String> {
    let value = input
        .split('&')
        .find_map(|field| field.strip_prefix("tex="))?;

    urlencoding::decode(value).ok().map(|decoded| decoded.into_owned())
}

/// Interpret a path such as `/x%5E2.svg` as a path-style request.
///
/// Browsers rewrite `\` to `/` in URL paths, so every literal `/` in the
/// stem is turned back into `\` before percent-decoding. Returns `None` for
/// paths without an `.svg` or `.png` suffix, an empty stem, or an encoding
/// that does not decode to UTF-8.
pub fn expression_from_path(path: &str) -> Option<(String, OutputKind)> {
    let kind = OutputKind::from_suffix(path)?;
    let stem = path
        .strip_prefix('/')
        .unwrap_or(path)
        .strip_suffix(kind.suffix())?;
    if stem.is_empty() {
        return None;
    }

    let restored = stem.replace('/', "\\");
    let expression = urlencoding::decode(&restored).ok()?.into_owned();
    Some((expression, kind))
}
