//! Callback URLs handed to the provider at session creation.
//!
//! The provider substitutes `{CHECKOUT_SESSION_ID}` in `success_url` and
//! `cancel_url` with the real session id, but only if the braces arrive
//! unescaped. Any URL builder will percent-encode them, so the codec either
//! undoes exactly that encoding or appends the pair after building.

use std::str::FromStr;
use std::sync::Arc;

use url::Url;

use crate::error::CheckoutError;

/// Template token the provider replaces with the session id.
pub const CHECKOUT_SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// `CHECKOUT_SESSION_ID_PLACEHOLDER` as a query-string encoder emits it.
pub const ESCAPED_CHECKOUT_SESSION_ID_PLACEHOLDER: &str = "%7BCHECKOUT_SESSION_ID%7D";

/// Query parameter carrying the session id back to the show action.
pub const CHECKOUT_SESSION_ID_KEY: &str = "checkout_session_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    New,
    Show,
}

impl Action {
    fn segment(self) -> &'static str {
        match self {
            Action::New => "new",
            Action::Show => "show",
        }
    }
}

/// Route-building options, in the spirit of a framework `url_for`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlOptions {
    pub action: Action,
    /// Emit only path and query when true.
    pub only_path: bool,
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub query: Vec<(String, String)>,
}

impl UrlOptions {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            only_path: false,
            protocol: None,
            host: None,
            port: None,
            query: Vec::new(),
        }
    }

    pub fn show() -> Self {
        Self::new(Action::Show)
    }

    pub fn only_path(mut self, only_path: bool) -> Self {
        self.only_path = only_path;
        self
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// URL-building capability of the host application.
pub trait UrlBuilder: Send + Sync {
    fn url_for(&self, options: &UrlOptions) -> Result<String, CheckoutError>;
}

/// Builds `<base><mount>/<action>?<query>` URLs for the checkout routes.
#[derive(Debug, Clone)]
pub struct RouteUrlBuilder {
    base: Url,
    mount: String,
}

impl RouteUrlBuilder {
    pub fn new(base: Url, mount: impl Into<String>) -> Self {
        Self {
            base,
            mount: mount.into(),
        }
    }
}

impl UrlBuilder for RouteUrlBuilder {
    fn url_for(&self, options: &UrlOptions) -> Result<String, CheckoutError> {
        let mut url = self.base.clone();

        if let Some(protocol) = &options.protocol {
            url.set_scheme(protocol)
                .map_err(|_| CheckoutError::Url(format!("unsupported protocol '{protocol}'")))?;
        }
        if let Some(host) = &options.host {
            url.set_host(Some(host.as_str()))?;
        }
        if let Some(port) = options.port {
            url.set_port(Some(port))
                .map_err(|_| CheckoutError::Url(format!("cannot set port on {url}")))?;
        }

        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| CheckoutError::Url(format!("{} cannot be a base", self.base)))?;
            path.pop_if_empty();
            path.extend(self.mount.split('/').filter(|s| !s.is_empty()));
            path.push(options.action.segment());
        }

        url.set_query(None);
        url.set_fragment(None);
        if !options.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&options.query);
        }

        if options.only_path {
            let mut relative = url.path().to_string();
            if let Some(query) = url.query() {
                relative.push('?');
                relative.push_str(query);
            }
            return Ok(relative);
        }
        Ok(url.into())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallbackStrategy {
    /// Build with the placeholder as a query value, then unescape it.
    #[default]
    Unescape,
    /// Build without it and append `checkout_session_id={CHECKOUT_SESSION_ID}`.
    Append,
}

impl FromStr for CallbackStrategy {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unescape" => Ok(Self::Unescape),
            "append" => Ok(Self::Append),
            other => Err(CheckoutError::Config(format!(
                "CALLBACK_STRATEGY must be 'unescape' or 'append', got '{other}'"
            ))),
        }
    }
}

/// Replaces the encoded placeholder with the literal one and touches nothing
/// else in the URL.
pub fn unescape_placeholder(url: &str) -> String {
    url.replace(
        ESCAPED_CHECKOUT_SESSION_ID_PLACEHOLDER,
        CHECKOUT_SESSION_ID_PLACEHOLDER,
    )
}

/// Appends `checkout_session_id={CHECKOUT_SESSION_ID}` to the query without
/// encoding it. A fragment stays last.
pub fn append_placeholder(url: String) -> Result<String, CheckoutError> {
    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url.as_str(), None),
    };
    let separator = if has_query(base)? { '&' } else { '?' };

    let mut appended = format!(
        "{base}{separator}{CHECKOUT_SESSION_ID_KEY}={CHECKOUT_SESSION_ID_PLACEHOLDER}"
    );
    if let Some(fragment) = fragment {
        appended.push('#');
        appended.push_str(fragment);
    }
    Ok(appended)
}

fn has_query(url: &str) -> Result<bool, CheckoutError> {
    match Url::parse(url) {
        Ok(parsed) => Ok(parsed.query().is_some()),
        // Path-only URLs from `only_path` builds.
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(url.contains('?')),
        Err(err) => Err(err.into()),
    }
}

/// Produces callback URLs that carry a literal session-id placeholder.
#[derive(Clone)]
pub struct CallbackCodec {
    builder: Arc<dyn UrlBuilder>,
    strategy: CallbackStrategy,
}

impl CallbackCodec {
    pub fn new(builder: Arc<dyn UrlBuilder>, strategy: CallbackStrategy) -> Self {
        Self { builder, strategy }
    }

    /// Absolute URL for `options`, with the placeholder in its query string.
    pub fn callback_url(&self, options: UrlOptions) -> Result<String, CheckoutError> {
        match self.strategy {
            CallbackStrategy::Unescape => {
                let options = options.query(CHECKOUT_SESSION_ID_KEY, CHECKOUT_SESSION_ID_PLACEHOLDER);
                let url = self.builder.url_for(&options)?;
                Ok(unescape_placeholder(&url))
            }
            CallbackStrategy::Append => append_placeholder(self.builder.url_for(&options)?),
        }
    }

    pub fn success_url(&self) -> Result<String, CheckoutError> {
        self.callback_url(UrlOptions::show().query("state", "success"))
    }

    pub fn cancel_url(&self) -> Result<String, CheckoutError> {
        self.callback_url(UrlOptions::show().query("state", "cancel"))
    }

    /// Absolute show URL for a known session, no placeholder involved.
    pub fn show_url(&self, session_id: &str) -> Result<String, CheckoutError> {
        self.builder
            .url_for(&UrlOptions::show().query(CHECKOUT_SESSION_ID_KEY, session_id))
    }
}

impl std::fmt::Debug for CallbackCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackCodec")
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn builder() -> Arc<RouteUrlBuilder> {
        Arc::new(RouteUrlBuilder::new(
            Url::parse("https://app.example.com").unwrap(),
            "/checkout_sessions",
        ))
    }

    /// Records the options it was asked for and returns a canned URL.
    struct RecordingBuilder {
        seen: Mutex<Vec<UrlOptions>>,
        url: String,
    }

    impl UrlBuilder for RecordingBuilder {
        fn url_for(&self, options: &UrlOptions) -> Result<String, CheckoutError> {
            self.seen.lock().unwrap().push(options.clone());
            Ok(self.url.clone())
        }
    }

    struct FailingBuilder;

    impl UrlBuilder for FailingBuilder {
        fn url_for(&self, _options: &UrlOptions) -> Result<String, CheckoutError> {
            Err(CheckoutError::Url("no route matches".into()))
        }
    }

    #[test]
    fn escaped_constant_matches_query_encoding() {
        let encoded: String =
            url::form_urlencoded::byte_serialize(CHECKOUT_SESSION_ID_PLACEHOLDER.as_bytes())
                .collect();
        assert_eq!(encoded, ESCAPED_CHECKOUT_SESSION_ID_PLACEHOLDER);
    }

    #[test]
    fn route_builder_encodes_braces() {
        let url = builder()
            .url_for(&UrlOptions::show().query("id", CHECKOUT_SESSION_ID_PLACEHOLDER))
            .unwrap();
        assert_eq!(
            url,
            "https://app.example.com/checkout_sessions/show?id=%7BCHECKOUT_SESSION_ID%7D"
        );
    }

    #[test]
    fn route_builder_applies_overrides() {
        let url = builder()
            .url_for(
                &UrlOptions::new(Action::New)
                    .protocol("http")
                    .host("custom.example.com")
                    .port(8080),
            )
            .unwrap();
        assert_eq!(url, "http://custom.example.com:8080/checkout_sessions/new");

        let path = builder()
            .url_for(&UrlOptions::show().only_path(true).query("state", "cancel"))
            .unwrap();
        assert_eq!(path, "/checkout_sessions/show?state=cancel");
    }

    #[test]
    fn unescape_strategy_yields_literal_placeholder() {
        let codec = CallbackCodec::new(builder(), CallbackStrategy::Unescape);
        let url = codec.callback_url(UrlOptions::show()).unwrap();

        assert_eq!(
            url,
            "https://app.example.com/checkout_sessions/show?checkout_session_id={CHECKOUT_SESSION_ID}"
        );
        assert!(!url.contains(ESCAPED_CHECKOUT_SESSION_ID_PLACEHOLDER));
    }

    #[test]
    fn append_strategy_yields_literal_placeholder() {
        let codec = CallbackCodec::new(builder(), CallbackStrategy::Append);
        let url = codec.success_url().unwrap();

        assert_eq!(
            url,
            "https://app.example.com/checkout_sessions/show?state=success&checkout_session_id={CHECKOUT_SESSION_ID}"
        );
    }

    #[test]
    fn both_strategies_keep_other_encoded_characters() {
        for strategy in [CallbackStrategy::Unescape, CallbackStrategy::Append] {
            let codec = CallbackCodec::new(builder(), strategy);
            let url = codec
                .callback_url(UrlOptions::show().query("next", "/plans?tier=pro&seats=2"))
                .unwrap();
            assert!(url.contains("next=%2Fplans%3Ftier%3Dpro%26seats%3D2"), "{url}");
            assert!(url.contains(CHECKOUT_SESSION_ID_PLACEHOLDER), "{url}");
            assert!(!url.contains(ESCAPED_CHECKOUT_SESSION_ID_PLACEHOLDER), "{url}");
        }
    }

    #[test]
    fn success_and_cancel_urls_carry_state() {
        let codec = CallbackCodec::new(builder(), CallbackStrategy::Unescape);
        assert_eq!(
            codec.success_url().unwrap(),
            "https://app.example.com/checkout_sessions/show?state=success&checkout_session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(
            codec.cancel_url().unwrap(),
            "https://app.example.com/checkout_sessions/show?state=cancel&checkout_session_id={CHECKOUT_SESSION_ID}"
        );
    }

    #[test]
    fn append_picks_separator_from_existing_query() {
        assert_eq!(
            append_placeholder("https://example.com/success".into()).unwrap(),
            "https://example.com/success?checkout_session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(
            append_placeholder("https://example.com/success?plan=pro".into()).unwrap(),
            "https://example.com/success?plan=pro&checkout_session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(
            append_placeholder("/success?plan=pro".into()).unwrap(),
            "/success?plan=pro&checkout_session_id={CHECKOUT_SESSION_ID}"
        );
    }

    #[test]
    fn append_keeps_the_fragment_after_the_query() {
        assert_eq!(
            append_placeholder("https://example.com/success#receipt".into()).unwrap(),
            "https://example.com/success?checkout_session_id={CHECKOUT_SESSION_ID}#receipt"
        );
        assert_eq!(
            append_placeholder("https://example.com/success?plan=pro#receipt".into()).unwrap(),
            "https://example.com/success?plan=pro&checkout_session_id={CHECKOUT_SESSION_ID}#receipt"
        );
        assert_eq!(
            append_placeholder("/success#top".into()).unwrap(),
            "/success?checkout_session_id={CHECKOUT_SESSION_ID}#top"
        );
    }

    #[test]
    fn show_url_carries_the_real_session_id() {
        let codec = CallbackCodec::new(builder(), CallbackStrategy::Append);
        assert_eq!(
            codec.show_url("cs_test_done").unwrap(),
            "https://app.example.com/checkout_sessions/show?checkout_session_id=cs_test_done"
        );
    }

    #[test]
    fn unescape_only_touches_the_placeholder() {
        let url = "https://example.com/callback?foo=a%20b&session_id=%7BCHECKOUT_SESSION_ID%7D&baz=%7Bqux%7D";
        assert_eq!(
            unescape_placeholder(url),
            "https://example.com/callback?foo=a%20b&session_id={CHECKOUT_SESSION_ID}&baz=%7Bqux%7D"
        );
    }

    #[test]
    fn codec_asks_for_an_absolute_show_url_and_passes_overrides() {
        let recorder = Arc::new(RecordingBuilder {
            seen: Mutex::new(Vec::new()),
            url: "https://custom.example.com/show?checkout_session_id=%7BCHECKOUT_SESSION_ID%7D"
                .to_string(),
        });
        let codec = CallbackCodec::new(recorder.clone(), CallbackStrategy::Unescape);

        let url = codec
            .callback_url(UrlOptions::show().protocol("https").host("custom.example.com"))
            .unwrap();
        assert_eq!(
            url,
            "https://custom.example.com/show?checkout_session_id={CHECKOUT_SESSION_ID}"
        );

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].action, Action::Show);
        assert!(!seen[0].only_path);
        assert_eq!(seen[0].host.as_deref(), Some("custom.example.com"));
        assert_eq!(seen[0].protocol.as_deref(), Some("https"));
        assert!(seen[0].query.contains(&(
            CHECKOUT_SESSION_ID_KEY.to_string(),
            CHECKOUT_SESSION_ID_PLACEHOLDER.to_string()
        )));
    }

    #[test]
    fn builder_failures_propagate() {
        for strategy in [CallbackStrategy::Unescape, CallbackStrategy::Append] {
            let codec = CallbackCodec::new(Arc::new(FailingBuilder), strategy);
            assert!(matches!(codec.success_url(), Err(CheckoutError::Url(_))));
        }
    }

    #[test]
    fn strategy_parses_from_config_values() {
        assert_eq!(
            "Append".parse::<CallbackStrategy>().unwrap(),
            CallbackStrategy::Append
        );
        assert_eq!(
            " unescape ".parse::<CallbackStrategy>().unwrap(),
            CallbackStrategy::Unescape
        );
        assert!("gsub".parse::<CallbackStrategy>().is_err());
    }
}
