use std::time::{Duration, SystemTime};

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::token::AccessToken;

/// The credentials obtained from a completed login flow.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct TokenBundle {
    /// The access token.
    #[builder(into)]
    pub access_token: AccessToken,
    /// The numeric id of the account the token belongs to.
    #[builder(default)]
    pub user_id: u64,
    /// Token lifetime in seconds; `0` means the token does not expire.
    #[builder(default)]
    pub expires_in: u64,
    /// A synthetic field set when the bundle is created.
    #[builder(skip = SystemTime::now())]
    #[serde(default = "SystemTime::now")]
    pub received_at: SystemTime,
}

impl TokenBundle {
    /// The absolute expiry instant, or `None` for a non-expiring token.
    ///
    /// A lifetime too large to represent as an instant is treated as
    /// non-expiring.
    #[must_use]
    pub fn expires_at(&self) -> Option<SystemTime> {
        if self.expires_in == 0 {
            return None;
        }
        self.received_at
            .checked_add(Duration::from_secs(self.expires_in))
    }

    /// Returns `true` if the token expires within `margin` from now.
    #[must_use]
    pub fn is_expired(&self, margin: Duration) -> bool {
        self.expires_at().is_some_and(|expires_at| {
            SystemTime::now()
                .checked_add(margin)
                .is_none_or(|deadline| deadline >= expires_at)
        })
    }
}
