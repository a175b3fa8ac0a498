use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditAddRequest {
    pub namespace: String,
    /// Whole US dollars
    pub credits: i64,
    /// Port of the local listener the payment page calls back to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditAddResponse {
    /// Payment page to open in the browser
    pub url: String,
}
