//! Response envelope helpers shared across protocol handlers.

use axum::{
    http::{header, StatusCode},
    response::Response,
};

use mapview_common::MapsError;
use mapview_protocol::{ows_exception_xml, wms_exception_xml};

fn status_of(err: &MapsError) -> StatusCode {
    StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// WMS error envelope: a ServiceExceptionReport document.
///
/// In-protocol failures (a render that died mid-request) answer HTTP 200
/// with the exception body, per WMS convention; malformed requests keep
/// their 4xx status.
pub fn wms_error(err: &MapsError) -> Response {
    let status = match err {
        MapsError::RenderFailure(_) | MapsError::RenderTimeout => StatusCode::OK,
        _ => status_of(err),
    };
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/xml; charset=utf-8")
        .body(wms_exception_xml(err.ogc_exception_code(), &err.to_string()).into())
        .unwrap()
}

/// WMTS/WFS error envelope: an OWS ExceptionReport document.
pub fn ows_error(err: &MapsError) -> Response {
    Response::builder()
        .status(status_of(err))
        .header(header::CONTENT_TYPE, "text/xml; charset=utf-8")
        .body(ows_exception_xml(err.ogc_exception_code(), &err.to_string()).into())
        .unwrap()
}

/// OWS ExceptionReport naming the offending parameter.
pub fn ows_error_with_locator(err: &MapsError, locator: &str) -> Response {
    Response::builder()
        .status(status_of(err))
        .header(header::CONTENT_TYPE, "text/xml; charset=utf-8")
        .body(
            mapview_protocol::exceptions::ows_exception_xml_with_locator(
                err.ogc_exception_code(),
                &err.to_string(),
                locator,
            )
            .into(),
        )
        .unwrap()
}

/// Navigation error envelope: plain text with a conventional status code.
pub fn plain_error(err: &MapsError) -> Response {
    Response::builder()
        .status(status_of(err))
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(err.to_string().into())
        .unwrap()
}

pub fn png_response(bytes: Vec<u8>) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/png")
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .body(bytes.into())
        .unwrap()
}

pub fn xml_response(body: String) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/xml; charset=utf-8")
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .body(body.into())
        .unwrap()
}

pub fn json_response(body: String) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .body(body.into())
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wms_render_failure_is_http_200() {
        let resp = wms_error(&MapsError::RenderFailure("boom".into()));
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_wms_malformed_keeps_400() {
        let resp = wms_error(&MapsError::MissingParameter("BBOX".into()));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_plain_error_status() {
        let resp = plain_error(&MapsError::MalformedRequest("x".into()));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
