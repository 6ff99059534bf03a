//! JSON over HTTP
//!
//! Non-2xx responses become errors carrying the body's `error` string when
//! there is one (the relayer's failure shape).

use anyhow::anyhow;
use serde_json::Value;

/// Minimal JSON HTTP client
#[allow(async_fn_in_trait)]
pub trait HttpTransport {
    async fn get_json(&self, url: &str) -> anyhow::Result<Value>;
    async fn post_json(&self, url: &str, body: &Value) -> anyhow::Result<Value>;
}

/// Error for a non-2xx response
pub fn error_from_body(status: u16, body: &str) -> anyhow::Error {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string));
    match message {
        Some(msg) => anyhow!("{msg}"),
        None => anyhow!("HTTP {status}"),
    }
}

#[cfg(target_arch = "wasm32")]
pub use fetch::FetchTransport;

#[cfg(target_arch = "wasm32")]
pub(crate) mod fetch {
    use anyhow::{Context, Result, anyhow};
    use serde_json::Value;
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Request, RequestInit, RequestMode, Response};

    use super::{HttpTransport, error_from_body};

    /// `window.fetch` transport
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FetchTransport;

    pub(crate) fn js_error(e: JsValue) -> anyhow::Error {
        let message = js_sys::Reflect::get(&e, &JsValue::from_str("message"))
            .ok()
            .and_then(|m| m.as_string())
            .or_else(|| e.as_string())
            .unwrap_or_else(|| format!("{e:?}"));
        anyhow!("{message}")
    }

    impl FetchTransport {
        async fn send(&self, method: &str, url: &str, body: Option<&Value>) -> Result<Value> {
            let window = web_sys::window().ok_or_else(|| anyhow!("no window"))?;

            let opts = RequestInit::new();
            opts.set_method(method);
            opts.set_mode(RequestMode::Cors);
            if let Some(body) = body {
                opts.set_body(&JsValue::from_str(&body.to_string()));
            }
            let request = Request::new_with_str_and_init(url, &opts).map_err(js_error)?;
            if body.is_some() {
                request
                    .headers()
                    .set("Content-Type", "application/json")
                    .map_err(js_error)?;
            }

            let response: Response = JsFuture::from(window.fetch_with_request(&request))
                .await
                .map_err(js_error)?
                .dyn_into()
                .map_err(js_error)?;
            let text = JsFuture::from(response.text().map_err(js_error)?)
                .await
                .map_err(js_error)?
                .as_string()
                .unwrap_or_default();

            if !response.ok() {
                return Err(error_from_body(response.status(), &text));
            }
            serde_json::from_str(&text).with_context(|| format!("{method} {url}: invalid JSON"))
        }
    }

    impl HttpTransport for FetchTransport {
        async fn get_json(&self, url: &str) -> Result<Value> {
            self.send("GET", url, None).await
        }

        async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
            self.send("POST", url, Some(body)).await
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted HTTP transport for tests

    use std::cell::RefCell;
    use std::collections::HashMap;

    use anyhow::{Result, bail};
    use serde_json::Value;

    use super::HttpTransport;

    /// Responses keyed by URL; a string value starting with "ERR:" fails
    #[derive(Default)]
    pub struct ScriptedHttp {
        pub gets: RefCell<HashMap<String, Value>>,
        pub post_responses: RefCell<HashMap<String, Value>>,
        pub posts: RefCell<Vec<(String, Value)>>,
    }

    impl ScriptedHttp {
        pub fn on_get(&self, url: &str, value: Value) {
            self.gets.borrow_mut().insert(url.to_string(), value);
        }

        pub fn on_post(&self, url: &str, value: Value) {
            self.post_responses.borrow_mut().insert(url.to_string(), value);
        }

        fn answer(map: &HashMap<String, Value>, url: &str) -> Result<Value> {
            match map.get(url) {
                Some(Value::String(s)) if s.starts_with("ERR:") => bail!("{}", &s[4..]),
                Some(v) => Ok(v.clone()),
                None => bail!("HTTP 404"),
            }
        }
    }

    impl HttpTransport for ScriptedHttp {
        async fn get_json(&self, url: &str) -> Result<Value> {
            Self::answer(&self.gets.borrow(), url)
        }

        async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
            self.posts.borrow_mut().push((url.to_string(), body.clone()));
            Self::answer(&self.post_responses.borrow(), url)
        }
    }
}
