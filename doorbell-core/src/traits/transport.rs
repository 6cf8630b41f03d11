//! HTTP transport used by the content cache

use alloc::string::String;
use alloc::vec::Vec;

/// Errors from a remote fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// No network link
    Offline,
    /// Could not resolve or connect to the server
    Connect,
    /// Request or response timed out
    Timeout,
    /// Server answered with a status other than 200 or 304
    Status(u16),
    /// Response larger than the transport will buffer
    TooLarge,
    /// Response could not be parsed
    Protocol,
}

/// Successful outcome of a conditional GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResponse {
    /// 200 with the full body
    Ok(Vec<u8>),
    /// 304, the cached copy is still current
    NotModified,
}

/// Link diagnostics shown on the status banner
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkInfo {
    pub ssid: String,
    pub channel: u8,
    pub rssi: i16,
    /// Dotted quad, empty when unassigned
    pub ipv4: String,
    /// One entry per configured address
    pub ipv6: Vec<String>,
}

/// Network transport
///
/// `get` must run to completion or to its own timeout; the caller never
/// cancels it.
pub trait Transport {
    /// Whether the link is up
    fn is_online(&self) -> bool;

    /// Current link diagnostics
    fn link_info(&self) -> LinkInfo;

    /// Conditional GET
    ///
    /// `if_modified_since` is an HTTP-date to send as `If-Modified-Since`.
    fn get(
        &mut self,
        url: &str,
        if_modified_since: Option<&str>,
    ) -> impl core::future::Future<Output = Result<FetchResponse, TransportError>>;
}
