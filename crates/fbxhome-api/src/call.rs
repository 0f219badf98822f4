// Telephony endpoints.

use crate::client::FreeboxClient;
use crate::error::Error;
use crate::models::CallEntry;

impl FreeboxClient {
    /// Call history of the fixed line, newest first.
    ///
    /// `GET /api/v6/call/log/`
    pub async fn call_log(&self) -> Result<Vec<CallEntry>, Error> {
        self.get_list("call/log/").await
    }
}
