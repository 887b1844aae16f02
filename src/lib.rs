//! Implements a VK API client and a browser-emulating implicit-grant login flow.

#![forbid(unsafe_code)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod api;
mod endpoint_url;
mod error;
pub mod html;
pub mod http;
pub mod login;
pub mod observe;
pub mod token;

#[cfg(test)]
mod test_support;

pub use endpoint_url::{EndpointUrl, EndpointUrlError, IntoEndpointUrl};
pub use error::Error;

/// Documentation
pub mod _documentation {
    #[doc = include_str!("../README.md")]
    mod readme {}
    #[doc = include_str!("../CHANGELOG.md")]
    pub mod changelog {}
}

/// Re-export of parts of the `secrecy` crate.
pub mod secrecy {
    pub use ::secrecy::{ExposeSecret, SecretString};
}

pub use bytes::Bytes;
pub use url::Url;
