//! HTML pages around the upload flow.

use crate::html::escape_html;
use slidepost_core::UploadDocumentOperationResult;

const HEAD: &str = "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>slidepost</title>\n</head>\n<body>\n";
const FOOT: &str = "</body>\n</html>\n";

pub(crate) fn index_page(max_file_size: u64, max_hours: u64) -> String {
    format!(
        "{HEAD}<h1>slidepost</h1>\n\
         <p>Upload a slide deck (up to {} KB). It stays online for {} hours after its last upload.</p>\n\
         <form action=\"/upload\" method=\"post\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"filename\">\n\
         <input type=\"submit\" value=\"Upload\">\n\
         </form>\n{FOOT}",
        max_file_size / 1_000,
        max_hours
    )
}

pub(crate) fn upload_page(result: &UploadDocumentOperationResult) -> String {
    let url = escape_html(&result.url);
    format!(
        "{HEAD}<h1>Uploaded</h1>\n\
         <p>Your slides are at <a href=\"{url}\">{url}</a>.</p>\n\
         <p>They will be removed {} hours after the last upload of the same file.</p>\n{FOOT}",
        result.ttl_hours
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_page_links_url_and_ttl() {
        let page = upload_page(&UploadDocumentOperationResult {
            key: "abc".to_string(),
            url: "http://localhost:8080/slide/abc".to_string(),
            ttl_hours: 48,
            size_bytes: 3,
            replaced: false,
        });
        assert!(page.contains(
            "<a href=\"http://localhost:8080/slide/abc\">http://localhost:8080/slide/abc</a>"
        ));
        assert!(page.contains("48 hours"));
    }

    #[test]
    fn index_page_has_upload_form() {
        let page = index_page(100_000, 48);
        assert!(page.contains("name=\"filename\""));
        assert!(page.contains("up to 100 KB"));
    }
}
