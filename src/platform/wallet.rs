//! Injected browser wallet (EIP-1193 `window.ethereum`)
//!
//! Signing stays in the wallet; this only forwards JSON-RPC requests to it.

use anyhow::{Context, Result, anyhow};
use js_sys::{Function, JSON, Object, Promise, Reflect};
use serde_json::Value;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use super::http::fetch::js_error;
use crate::Address;
use crate::chain::JsonRpcProvider;

pub struct InjectedWallet {
    ethereum: JsValue,
}

impl InjectedWallet {
    /// `window.ethereum`, if a wallet extension injected one
    pub fn detect() -> Option<Self> {
        let window = web_sys::window()?;
        let ethereum = Reflect::get(window.as_ref(), &JsValue::from_str("ethereum")).ok()?;
        if ethereum.is_undefined() || ethereum.is_null() {
            return None;
        }
        Some(Self { ethereum })
    }

    /// Ask the wallet for the user's account (prompts on first use)
    pub async fn connect(&self) -> Result<Address> {
        let accounts = self
            .request("eth_requestAccounts", serde_json::json!([]))
            .await?;
        accounts
            .get(0)
            .and_then(Value::as_str)
            .map(Address::new)
            .ok_or_else(|| anyhow!("wallet returned no accounts"))
    }
}

impl JsonRpcProvider for InjectedWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let args = Object::new();
        Reflect::set(&args, &JsValue::from_str("method"), &JsValue::from_str(method)).map_err(js_error)?;
        let params = JSON::parse(&params.to_string()).map_err(js_error)?;
        Reflect::set(&args, &JsValue::from_str("params"), &params).map_err(js_error)?;

        let request: Function = Reflect::get(&self.ethereum, &JsValue::from_str("request"))
            .map_err(js_error)?
            .dyn_into()
            .map_err(js_error)?;
        let promise: Promise = request
            .call1(&self.ethereum, &args)
            .map_err(js_error)?
            .dyn_into()
            .map_err(js_error)?;
        let result = JsFuture::from(promise).await.map_err(js_error)?;

        if result.is_undefined() || result.is_null() {
            return Ok(Value::Null);
        }
        let text: String = JSON::stringify(&result).map_err(js_error)?.into();
        serde_json::from_str(&text).with_context(|| format!("{method}: invalid wallet response"))
    }
}
