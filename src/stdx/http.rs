use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

pub static DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// A request that is sent once and expected to answer with a JSON body.
///
/// Every failure, be it transport, a non-success status, or a body that does not
/// match `T`, surfaces as the same `reqwest::Error`.
pub struct Fetch(RequestBuilder);

impl Fetch {
    pub async fn json<T>(self) -> Result<T, reqwest::Error>
    where
        T: DeserializeOwned,
    {
        let response = self.0.send().await?.error_for_status()?;
        response.json::<T>().await
    }
}

pub trait IFetch {
    fn fetch(self) -> Fetch;
}

impl IFetch for RequestBuilder {
    fn fetch(self) -> Fetch {
        Fetch(self)
    }
}
