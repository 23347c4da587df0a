use axum::{extract::State, http::header, response::IntoResponse};
use time::macros::format_description;
use tracing::instrument;

use crate::{error::ApiError, projects::repo::Project, state::AppState};

/// Static site pages listed ahead of the per-project entries.
const STATIC_PAGES: &[&str] = &["", "/login", "/blogs"];

/// Slugs are admin-entered text; escape them before they land in `<loc>`.
fn xml_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// `lastmod` entries are `YYYY-MM-DD` dates.
pub fn render_sitemap(base_url: &str, projects: &[(String, String)]) -> String {
    let base = base_url.trim_end_matches('/');
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");

    for page in STATIC_PAGES {
        xml.push_str(&format!(
            "  <url>\n    <loc>{base}{page}</loc>\n    <changefreq>weekly</changefreq>\n    <priority>1.0</priority>\n  </url>\n"
        ));
    }

    for (slug, lastmod) in projects {
        let slug = xml_escape(slug);
        xml.push_str(&format!(
            "  <url>\n    <loc>{base}/project/{slug}</loc>\n    <lastmod>{lastmod}</lastmod>\n    <changefreq>monthly</changefreq>\n    <priority>0.8</priority>\n  </url>\n"
        ));
    }

    xml.push_str("</urlset>");
    xml
}

#[instrument(skip(state))]
pub async fn sitemap(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let date_format = format_description!("[year]-[month]-[day]");
    let mut entries = Vec::new();
    for (slug, created_at) in Project::published_slugs(&state.db)
        .await
        .map_err(ApiError::Dependency)?
    {
        let lastmod = created_at
            .date()
            .format(date_format)
            .map_err(|e| ApiError::Dependency(e.into()))?;
        entries.push((slug, lastmod));
    }

    let xml = render_sitemap(&state.config.public_base_url, &entries);
    Ok(([(header::CONTENT_TYPE, "application/xml")], xml))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_static_pages() {
        let xml = render_sitemap("https://abimantra.my.id", &[]);
        assert!(xml.starts_with("<?xml version=\"1.0\""));
        assert!(xml.contains("<loc>https://abimantra.my.id</loc>"));
        assert!(xml.contains("<loc>https://abimantra.my.id/login</loc>"));
        assert!(xml.contains("<loc>https://abimantra.my.id/blogs</loc>"));
        assert!(xml.ends_with("</urlset>"));
    }

    #[test]
    fn lists_published_projects_with_lastmod() {
        let xml = render_sitemap(
            "https://abimantra.my.id",
            &[("portfolio-site".into(), "2024-11-03".into())],
        );
        assert!(xml.contains("<loc>https://abimantra.my.id/project/portfolio-site</loc>"));
        assert!(xml.contains("<lastmod>2024-11-03</lastmod>"));
        assert!(xml.contains("<changefreq>monthly</changefreq>"));
    }

    #[test]
    fn slugs_with_markup_characters_are_escaped() {
        let xml = render_sitemap(
            "https://abimantra.my.id",
            &[("tools&toys".into(), "2024-01-01".into())],
        );
        assert!(xml.contains("<loc>https://abimantra.my.id/project/tools&amp;toys</loc>"));
        assert!(!xml.contains("tools&toys"));
    }

    #[test]
    fn trailing_slash_on_base_is_normalized() {
        let xml = render_sitemap(
            "https://abimantra.my.id/",
            &[("a".into(), "2024-01-01".into())],
        );
        assert!(xml.contains("<loc>https://abimantra.my.id/project/a</loc>"));
        assert!(!xml.contains(".my.id//"));
    }
}
