//! OGC exception report documents.

/// Escape text for inclusion in XML content or attribute values.
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// WMS-style ServiceExceptionReport document.
pub fn wms_exception_xml(code: &str, message: &str) -> String {
    format!(
        r#"<?xml version="1.0"?><ServiceExceptionReport><ServiceException code="{}">{}</ServiceException></ServiceExceptionReport>"#,
        xml_escape(code),
        xml_escape(message)
    )
}

/// OWS ExceptionReport document (WMTS and WFS).
pub fn ows_exception_xml(code: &str, message: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><ows:ExceptionReport xmlns:ows="http://www.opengis.net/ows/1.1" version="1.0.0"><ows:Exception exceptionCode="{}"><ows:ExceptionText>{}</ows:ExceptionText></ows:Exception></ows:ExceptionReport>"#,
        xml_escape(code),
        xml_escape(message)
    )
}

/// OWS ExceptionReport with a locator attribute, used by WFS for
/// parameter-specific failures.
pub fn ows_exception_xml_with_locator(code: &str, message: &str, locator: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><ows:ExceptionReport xmlns:ows="http://www.opengis.net/ows/1.1" version="1.0.0"><ows:Exception exceptionCode="{}" locator="{}"><ows:ExceptionText>{}</ows:ExceptionText></ows:Exception></ows:ExceptionReport>"#,
        xml_escape(code),
        xml_escape(locator),
        xml_escape(message)
    )
}
