//! Preview URL of a content file

/// URL of the rendered page for a content-relative `path`.
///
/// `posts/a.md` → `{base}posts/a/`, `posts/a/index.md` → `{base}posts/a/`,
/// `_index.md` → `{base}`.
pub fn preview_url(path: &str, base: &str) -> String {
    let path = path.trim_start_matches('/');
    let stem = path.strip_suffix(".md").unwrap_or(path);

    let page = if stem == "index" || stem == "_index" {
        ""
    } else {
        stem.strip_suffix("/_index")
            .or_else(|| stem.strip_suffix("/index"))
            .unwrap_or(stem)
    };

    let base = base.trim_end_matches('/');
    if page.is_empty() {
        format!("{}/", base)
    } else {
        format!("{}/{}/", base, page)
    }
}
