//! Photo encoding tests
//!
//! The listing flow downloads collected photos from Telegram before
//! submission; a broken Telegram side must come back as an error value the
//! flow can turn into a re-prompt, never as a panic.

use wiremock::matchers::any;
use wiremock::{Mock, MockServer, ResponseTemplate};

use swipebot::utils::images::encode_photo_to_base64;

#[tokio::test]
async fn telegram_failure_surfaces_as_error() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let url = url::Url::parse(&server.uri()).expect("mock server uri");
    let bot = teloxide::Bot::new("123456:TEST").set_api_url(url);

    let result = encode_photo_to_base64(&bot, "some-file-id").await;
    assert!(result.is_err());
}
