//! Zone name derivation
//!
//! Record names are handled in fully-qualified form, ending with the root
//! separator (`home.example.com.`). The hosted zone that should contain a
//! record is taken to be its last two labels: `a.b.example.com.` lives in
//! `example.com.`.
//!
//! Multi-part public suffixes are not recognized. `www.example.co.uk.`
//! resolves to `co.uk.`, which will normally not match any hosted zone and
//! reconciliation stops with [`Outcome::ZoneNotFound`].
//!
//! [`Outcome::ZoneNotFound`]: crate::reconciler::Outcome::ZoneNotFound

/// Root-zone separator
pub const ROOT: char = '.';

/// Append the root separator to `name` unless it is already present
pub fn normalize_name(name: &str) -> String {
    if name.ends_with(ROOT) {
        name.to_string()
    } else {
        format!("{name}{ROOT}")
    }
}

/// Derive the hosted zone name for a record name
///
/// Pure and infallible. Names with fewer than three labels resolve to
/// themselves, so `example.com` → `example.com.` and `com` → `com.`.
pub fn resolve_zone(name: &str) -> String {
    let name = normalize_name(name);
    // Everything before the root separator
    let body = &name[..name.len() - ROOT.len_utf8()];

    let Some(tld_boundary) = body.rfind(ROOT) else {
        return name;
    };

    match body[..tld_boundary].rfind(ROOT) {
        Some(sld_boundary) => name[sld_boundary + ROOT.len_utf8()..].to_string(),
        None => name,
    }
}
