use actix_web::HttpRequest;

/// Absolute base for links sent to customers: the configured public URL,
/// else the scheme and host the request came in on.
pub fn public_base_url(req: &HttpRequest, configured: Option<&str>) -> String {
    match configured.map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => url.trim_end_matches('/').to_string(),
        None => {
            let info = req.connection_info();
            format!("{}://{}", info.scheme(), info.host())
        }
    }
}

pub fn queue_page_url(base: &str, slug: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), slug)
}

pub fn ticket_url(base: &str, slug: &str, ticket_id: i64) -> String {
    format!("{}?ticket_id={}", queue_page_url(base, slug), ticket_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_public_base_url_prefers_config() {
        let req = TestRequest::default()
            .insert_header(("Host", "10.0.0.5:8080"))
            .to_http_request();
        assert_eq!(
            public_base_url(&req, Some("https://antri.id/")),
            "https://antri.id"
        );
        assert_eq!(public_base_url(&req, Some("  ")), "http://10.0.0.5:8080");
        assert_eq!(public_base_url(&req, None), "http://10.0.0.5:8080");
    }

    #[test]
    fn test_ticket_url() {
        assert_eq!(
            ticket_url("https://antri.id/", "warung-budi", 12),
            "https://antri.id/warung-budi?ticket_id=12"
        );
    }
}
