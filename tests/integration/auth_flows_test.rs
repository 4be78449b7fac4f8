//! Sign-in flow integration tests
//!
//! Social login callback and email OTP confirmation, both answered by the
//! middleware before any user lookup.

use axum::{extract::Request, http::header};
use supaguard_auth::{mock::RecordedCall, AuthContext, OtpType, PathOverrides};

use crate::common::{assert_redirect, set_cookies, test_config, TestApp};

fn app() -> TestApp {
    TestApp::new(|_: &AuthContext, _: &Request| panic!("sign-in flows never reach the callback"))
}

mod test_social_login_callback {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_code_exchange_redirects_to_next() {
        let app = app();
        app.provider
            .behavior()
            .set_cookie("sb-proj-auth-token", "new-session");

        let response = app.get("/auth/callback?code=abc&next=/dashboard").await;

        assert_redirect(&response, "http://app.test/dashboard");
        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].starts_with("sb-proj-auth-token=new-session"));
        assert_eq!(
            app.provider.recorded_calls(),
            vec![RecordedCall::ExchangeCode {
                code: "abc".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_next_defaults_to_home() {
        let app = app();

        let response = app.get("/auth/callback?code=abc").await;
        assert_redirect(&response, "http://app.test/");
    }

    #[tokio::test]
    async fn test_site_url_wins_over_request_origin() {
        let app = TestApp::with_config(
            test_config().with_site_url("https://www.example.com"),
            |_, _| Ok(None),
        );

        let response = app.get("/auth/callback?code=abc&next=/welcome").await;
        assert_redirect(&response, "https://www.example.com/welcome");
    }

    #[tokio::test]
    async fn test_forwarded_host_used_behind_proxy() {
        let app = app();
        let request = Request::builder()
            .uri("/auth/callback?code=abc&next=/welcome")
            .header(header::HOST, "10.0.0.5:3000")
            .header("x-forwarded-host", "app.example.com")
            .header("x-forwarded-proto", "https")
            .body(axum::body::Body::empty())
            .unwrap();

        let response = app.send(request).await;
        assert_redirect(&response, "https://app.example.com/welcome");
    }

    #[tokio::test]
    async fn test_missing_code_redirects_to_sign_in() {
        let app = app();

        let response = app.get("/auth/callback?next=/dashboard").await;

        assert_redirect(&response, "http://app.test/sign-in");
        assert!(app.provider.recorded_calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_exchange_redirects_to_error_page() {
        let app = TestApp::with_paths(
            PathOverrides {
                error: Some("/auth/error".to_string()),
                ..Default::default()
            },
            |_, _| Ok(None),
        );
        app.provider.behavior().fail_flows("invalid flow state");

        let response = app.get("/auth/callback?code=expired").await;
        assert_redirect(&response, "http://app.test/auth/error");
    }

    #[tokio::test]
    async fn test_offsite_next_is_ignored() {
        let app = app();

        let response = app
            .get("/auth/callback?code=abc&next=//evil.example.com/")
            .await;
        assert_redirect(&response, "http://app.test/");
    }

    #[tokio::test]
    async fn test_callback_path_prefix_matches() {
        let app = app();

        let response = app.get("/auth/callback/github?code=abc").await;
        assert_redirect(&response, "http://app.test/");
    }
}

mod test_auth_confirm {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_verified_otp_redirects_home() {
        let app = app();
        app.provider
            .behavior()
            .set_cookie("sb-proj-auth-token", "confirmed");

        let response = app
            .get("/auth/confirm?token_hash=hash-1&type=email")
            .await;

        assert_redirect(&response, "http://app.test/");
        assert_eq!(set_cookies(&response).len(), 1);
        assert_eq!(
            app.provider.recorded_calls(),
            vec![RecordedCall::VerifyOtp {
                otp_type: OtpType::Email,
                token_hash: "hash-1".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_home_override_drops_otp_params() {
        let app = TestApp::with_paths(
            PathOverrides {
                home: Some("/welcome?token_hash=x&type=email&tour=1".to_string()),
                ..Default::default()
            },
            |_, _| Ok(None),
        );

        let response = app
            .get("/auth/confirm?token_hash=hash-1&type=recovery")
            .await;
        assert_redirect(&response, "http://app.test/welcome?tour=1");
    }

    #[tokio::test]
    async fn test_rejected_otp_redirects_to_sign_in() {
        let app = app();
        app.provider.behavior().fail_flows("Token has expired or is invalid");

        let response = app
            .get("/auth/confirm?token_hash=hash-1&type=magiclink")
            .await;
        assert_redirect(&response, "http://app.test/sign-in");
        assert!(set_cookies(&response).is_empty());
    }

    #[tokio::test]
    async fn test_missing_or_unknown_params_redirect_to_error() {
        let app = TestApp::with_paths(
            PathOverrides {
                error: Some("/oops".to_string()),
                ..Default::default()
            },
            |_, _| Ok(None),
        );

        for uri in [
            "/auth/confirm",
            "/auth/confirm?token_hash=hash-1",
            "/auth/confirm?type=email",
            "/auth/confirm?token_hash=hash-1&type=sms",
        ] {
            let response = app.get(uri).await;
            assert_redirect(&response, "http://app.test/oops");
        }
        assert!(app.provider.recorded_calls().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_path_override() {
        let app = TestApp::with_paths(
            PathOverrides {
                auth_confirm: Some("/verify".to_string()),
                ..Default::default()
            },
            |_, _| Ok(None),
        );

        let response = app.get("/verify?token_hash=hash-1&type=signup").await;
        assert_redirect(&response, "http://app.test/");

        // The default confirm path is now an ordinary page
        let response = app.get("/auth/confirm?token_hash=hash-1&type=signup").await;
        assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
    }
}

mod common;
